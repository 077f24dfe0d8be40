//! Identity: who the caller is, and when that changes.
//!
//! The hosted auth service issues access tokens; [`IdentityProvider`]
//! turns one into an [`Identity`]. Sign-in and sign-out transitions are
//! broadcast through [`IdentityEvents`] so side effects (profile bootstrap)
//! run once per transition, off the request path.

pub mod hosted;
pub mod memory;

use std::future::Future;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::warn;

use washday_core::{Email, IdentityId, Role};

use crate::models::SessionContext;

/// An authenticated principal as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: IdentityId,
    pub email: Email,
    pub role: Role,
    /// Name given at sign-up, if any.
    pub full_name: Option<String>,
}

impl From<Identity> for SessionContext {
    fn from(identity: Identity) -> Self {
        Self::new(identity.id, identity.email, identity.role)
    }
}

/// Provider failures. A rejected token is not an error: `resolve` returns
/// `Ok(None)`.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
    #[error("malformed identity response: {0}")]
    Malformed(String),
}

/// Resolves access tokens to identities.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The identity behind `access_token`, or `None` if the token is not valid.
    async fn resolve(&self, access_token: &str) -> Result<Option<Identity>, IdentityError>;
}

/// A session transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityChange {
    SignedIn(SessionContext),
    SignedOut(IdentityId),
}

const EVENT_CAPACITY: usize = 256;

/// Fan-out of identity transitions to registered listeners.
#[derive(Clone)]
pub struct IdentityEvents {
    sender: broadcast::Sender<IdentityChange>,
}

impl Default for IdentityEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityEvents {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    /// Publish a transition; returns how many listeners will see it.
    pub fn publish(&self, change: IdentityChange) -> usize {
        self.sender.send(change).unwrap_or(0)
    }

    /// A raw receiver, for callers that drive their own loop.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<IdentityChange> {
        self.sender.subscribe()
    }

    /// Run `callback` for every transition published after this call.
    ///
    /// Each transition is delivered at most once, in publish order. A
    /// listener that falls more than the channel capacity behind skips
    /// the oldest transitions. The task ends when every
    /// [`IdentityEvents`] clone has been dropped.
    pub fn on_identity_change<F, Fut>(&self, callback: F) -> JoinHandle<()>
    where
        F: Fn(IdentityChange) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let mut receiver = self.sender.subscribe();
        tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(change) => callback(change).await,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Identity listener lagged; transitions dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::sync::Mutex;

    use super::*;

    fn context() -> SessionContext {
        SessionContext::new(
            IdentityId::generate(),
            Email::parse("driver@example.com").unwrap(),
            Role::Customer,
        )
    }

    #[tokio::test]
    async fn test_publish_without_listeners() {
        let events = IdentityEvents::new();
        assert_eq!(events.publish(IdentityChange::SignedIn(context())), 0);
    }

    #[tokio::test]
    async fn test_listener_sees_each_transition_once() {
        let events = IdentityEvents::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        let handle = events.on_identity_change(move |change| {
            let sink = Arc::clone(&sink);
            async move {
                sink.lock().await.push(change);
            }
        });

        let ctx = context();
        events.publish(IdentityChange::SignedIn(ctx.clone()));
        events.publish(IdentityChange::SignedOut(ctx.identity_id));
        drop(events);

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();

        let seen = seen.lock().await;
        assert_eq!(
            *seen,
            vec![
                IdentityChange::SignedIn(ctx.clone()),
                IdentityChange::SignedOut(ctx.identity_id),
            ]
        );
    }

    #[tokio::test]
    async fn test_lagging_listener_skips_oldest_transitions() {
        let events = IdentityEvents::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        let handle = events.on_identity_change(move |change| {
            let sink = Arc::clone(&sink);
            async move {
                sink.lock().await.push(change);
            }
        });

        let published: Vec<IdentityId> = (0..EVENT_CAPACITY + 10)
            .map(|_| IdentityId::generate())
            .collect();
        for id in &published {
            events.publish(IdentityChange::SignedOut(*id));
        }
        drop(events);

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();

        let seen = seen.lock().await;
        let expected: Vec<IdentityChange> = published[10..]
            .iter()
            .map(|id| IdentityChange::SignedOut(*id))
            .collect();
        assert_eq!(*seen, expected);
    }

    #[test]
    fn test_identity_into_session_context() {
        let identity = Identity {
            id: IdentityId::generate(),
            email: Email::parse("shop@example.com").unwrap(),
            role: Role::Vendor,
            full_name: Some("Sparkle".into()),
        };
        let ctx: SessionContext = identity.clone().into();
        assert_eq!(ctx.identity_id, identity.id);
        assert!(ctx.is_vendor());
    }
}
