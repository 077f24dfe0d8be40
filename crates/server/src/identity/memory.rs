//! Token table provider for tests and local development.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Identity, IdentityError, IdentityProvider};

#[derive(Default)]
pub struct InMemoryIdentityProvider {
    tokens: RwLock<HashMap<String, Identity>>,
}

impl InMemoryIdentityProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `token` as proof of `identity`.
    pub async fn register(&self, token: impl Into<String>, identity: Identity) {
        self.tokens.write().await.insert(token.into(), identity);
    }

    /// Stop accepting `token`.
    pub async fn revoke(&self, token: &str) {
        self.tokens.write().await.remove(token);
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn resolve(&self, access_token: &str) -> Result<Option<Identity>, IdentityError> {
        Ok(self.tokens.read().await.get(access_token).cloned())
    }
}
