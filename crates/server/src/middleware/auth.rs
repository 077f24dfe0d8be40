//! Session extractors.
//!
//! The signed-in [`SessionContext`] is stored in the tower-sessions session
//! at sign-in. Handlers take it explicitly through these extractors and
//! pass it down to the workflows.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use crate::error::AppError;
use crate::models::{SessionContext, keys};

/// Extractor that requires a signed-in caller.
///
/// Rejects with 401 and a login redirect hint otherwise.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(RequireSession(session): RequireSession) -> String {
///     session.email.to_string()
/// }
/// ```
pub struct RequireSession(pub SessionContext);

impl<S> FromRequestParts<S> for RequireSession
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Ok(OptionalSession(session)) =
            OptionalSession::from_request_parts(parts, state).await;
        session
            .map(Self)
            .ok_or_else(AppError::authentication_required)
    }
}

/// Extractor that optionally gets the signed-in caller.
pub struct OptionalSession(pub Option<SessionContext>);

impl<S> FromRequestParts<S> for OptionalSession
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = match parts.extensions.get::<Session>() {
            Some(session) => session
                .get::<SessionContext>(keys::SESSION_CONTEXT)
                .await
                .ok()
                .flatten(),
            None => None,
        };

        Ok(Self(session))
    }
}

/// Store the signed-in caller in the session.
///
/// The session id is cycled so a pre-login id cannot be fixed.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_session_context(
    session: &Session,
    context: &SessionContext,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(keys::SESSION_CONTEXT, context).await
}

/// Remove the signed-in caller (sign-out), returning who it was.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_session_context(
    session: &Session,
) -> Result<Option<SessionContext>, tower_sessions::session::Error> {
    let previous = session
        .remove::<SessionContext>(keys::SESSION_CONTEXT)
        .await?;
    session.flush().await?;
    Ok(previous)
}
