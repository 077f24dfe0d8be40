//! Hosted auth service provider (`GET {PROJECT_URL}/auth/v1/user`).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, header};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::instrument;
use url::Url;

use washday_core::{Email, IdentityId, Role};

use super::{Identity, IdentityError, IdentityProvider};
use crate::config::StoreConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Resolves tokens against the hosted auth API.
#[derive(Clone)]
pub struct HostedIdentityProvider {
    client: reqwest::Client,
    user_url: Url,
    api_key: SecretString,
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: String,
    email: Option<String>,
    #[serde(default)]
    user_metadata: UserMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct UserMetadata {
    role: Option<String>,
    full_name: Option<String>,
}

impl HostedIdentityProvider {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the project
    /// URL cannot be joined.
    pub fn new(store: &StoreConfig) -> Result<Self, IdentityError> {
        let user_url = store
            .url
            .join("auth/v1/user")
            .map_err(|e| IdentityError::Malformed(e.to_string()))?;
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| IdentityError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            user_url,
            api_key: store.service_role_key.clone(),
        })
    }
}

#[async_trait]
impl IdentityProvider for HostedIdentityProvider {
    #[instrument(skip_all)]
    async fn resolve(&self, access_token: &str) -> Result<Option<Identity>, IdentityError> {
        let response = self
            .client
            .get(self.user_url.clone())
            .header("apikey", self.api_key.expose_secret())
            .header(header::AUTHORIZATION, format!("Bearer {access_token}"))
            .send()
            .await
            .map_err(|e| IdentityError::Unavailable(e.to_string()))?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => return Ok(None),
            status if !status.is_success() => {
                return Err(IdentityError::Unavailable(format!(
                    "auth service returned {status}"
                )));
            }
            _ => {}
        }

        let user: AuthUser = response
            .json()
            .await
            .map_err(|e| IdentityError::Malformed(e.to_string()))?;
        identity_from_user(user).map(Some)
    }
}

fn identity_from_user(user: AuthUser) -> Result<Identity, IdentityError> {
    let id = IdentityId::parse(&user.id).map_err(|e| IdentityError::Malformed(e.to_string()))?;
    let email = user
        .email
        .as_deref()
        .map(Email::parse)
        .transpose()
        .map_err(|e| IdentityError::Malformed(e.to_string()))?
        .ok_or_else(|| IdentityError::Malformed("user has no email".into()))?;

    Ok(Identity {
        id,
        email,
        role: Role::from_metadata(user.user_metadata.role.as_deref()),
        full_name: user
            .user_metadata
            .full_name
            .filter(|name| !name.trim().is_empty()),
    })
}
