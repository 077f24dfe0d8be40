//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::config::ServerConfig;
use crate::error::AppError;
use crate::gateway::DataGateway;
use crate::gateway::postgrest::{PostgrestGateway, PostgrestSetupError};
use crate::identity::hosted::HostedIdentityProvider;
use crate::identity::{IdentityChange, IdentityError, IdentityEvents, IdentityProvider};
use crate::services::ProfileBootstrapper;

/// Error building the hosted collaborators.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("data gateway: {0}")]
    Gateway(#[from] PostgrestSetupError),
    #[error("identity provider: {0}")]
    Identity(#[from] IdentityError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. The store and identity
/// provider are absent when the hosted backend is not configured;
/// handlers that need them answer with [`AppError::StoreUnconfigured`].
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    pool: Option<PgPool>,
    store: Option<Arc<dyn DataGateway>>,
    identity: Option<Arc<dyn IdentityProvider>>,
    events: IdentityEvents,
}

impl AppState {
    /// Create the production state: hosted gateway and identity provider
    /// from the configured project, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if a hosted client cannot be built.
    pub fn new(config: ServerConfig, pool: PgPool) -> Result<Self, StateError> {
        let (store, identity) = match &config.store {
            Some(store_config) => {
                let store: Arc<dyn DataGateway> = Arc::new(PostgrestGateway::new(store_config)?);
                let identity: Arc<dyn IdentityProvider> =
                    Arc::new(HostedIdentityProvider::new(store_config)?);
                (Some(store), Some(identity))
            }
            None => (None, None),
        };
        Ok(Self::from_parts(config, Some(pool), store, identity))
    }

    /// Assemble state from explicit collaborators.
    #[must_use]
    pub fn from_parts(
        config: ServerConfig,
        pool: Option<PgPool>,
        store: Option<Arc<dyn DataGateway>>,
        identity: Option<Arc<dyn IdentityProvider>>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                store,
                identity,
                events: IdentityEvents::new(),
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// The session-store pool, when running against Postgres.
    #[must_use]
    pub fn pool(&self) -> Option<&PgPool> {
        self.inner.pool.as_ref()
    }

    /// The data gateway.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::StoreUnconfigured`] if no store is configured.
    pub fn store(&self) -> Result<&dyn DataGateway, AppError> {
        self.inner
            .store
            .as_deref()
            .ok_or(AppError::StoreUnconfigured)
    }

    /// Whether a data gateway is configured.
    #[must_use]
    pub fn has_store(&self) -> bool {
        self.inner.store.is_some()
    }

    /// The identity provider.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::StoreUnconfigured`] if no provider is configured.
    pub fn identity(&self) -> Result<&dyn IdentityProvider, AppError> {
        self.inner
            .identity
            .as_deref()
            .ok_or(AppError::StoreUnconfigured)
    }

    #[must_use]
    pub fn events(&self) -> &IdentityEvents {
        &self.inner.events
    }

    /// Ensure a profile exists for every identity that signs in.
    ///
    /// Runs off the request path; failures are logged and the next sign-in
    /// retries.
    pub fn start_identity_listener(&self) -> JoinHandle<()> {
        let store = self.inner.store.clone();
        self.inner.events.on_identity_change(move |change| {
            let store = store.clone();
            async move {
                match change {
                    IdentityChange::SignedIn(session) => {
                        let Some(store) = store else {
                            debug!("No store configured; skipping profile bootstrap");
                            return;
                        };
                        match ProfileBootstrapper::new(store.as_ref())
                            .ensure_profile(&session)
                            .await
                        {
                            Ok(profile) => {
                                debug!(identity_id = %profile.id, "Profile ensured on sign-in");
                            }
                            Err(err) => {
                                error!(
                                    identity_id = %session.identity_id,
                                    error = %err,
                                    "Profile bootstrap on sign-in failed"
                                );
                            }
                        }
                    }
                    IdentityChange::SignedOut(identity_id) => {
                        info!(%identity_id, "Signed out");
                    }
                }
            }
        })
    }
}
