//! Session sign-in and sign-out.
//!
//! The client authenticates with the hosted identity service directly and
//! hands the resulting access token to `POST /auth/session`. The resolved
//! identity is kept in the session; the token itself is not stored.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use crate::error::{AppError, Result, add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::identity::IdentityChange;
use crate::middleware::{RequireSession, clear_session_context, set_session_context};
use crate::models::SessionContext;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub access_token: String,
}

fn session_error(err: &tower_sessions::session::Error) -> AppError {
    AppError::Internal(format!("session: {err}"))
}

/// Sign in with a provider access token.
#[instrument(skip_all)]
pub async fn sign_in(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<SignInRequest>,
) -> Result<Json<SessionContext>> {
    let token = request.access_token.trim();
    if token.is_empty() {
        return Err(AppError::BadRequest("access_token is required".into()));
    }

    let Some(identity) = state.identity()?.resolve(token).await? else {
        warn!("Rejected access token");
        return Err(AppError::Unauthorized("invalid or expired access token".into()));
    };

    let context = SessionContext::from(identity);
    set_session_context(&session, &context)
        .await
        .map_err(|e| session_error(&e))?;

    set_sentry_user(&context.identity_id, Some(context.email.as_str()));
    add_breadcrumb("auth", "Signed in", None);
    info!(identity_id = %context.identity_id, role = %context.role, "Signed in");

    state
        .events()
        .publish(IdentityChange::SignedIn(context.clone()));
    Ok(Json(context))
}

/// Sign out. Signing out without a session is a no-op.
pub async fn sign_out(State(state): State<AppState>, session: Session) -> Result<Response> {
    let previous = clear_session_context(&session)
        .await
        .map_err(|e| session_error(&e))?;
    clear_sentry_user();

    if let Some(context) = previous {
        state
            .events()
            .publish(IdentityChange::SignedOut(context.identity_id));
    }
    Ok(StatusCode::NO_CONTENT.into_response())
}

/// The current session context.
pub async fn current_session(RequireSession(session): RequireSession) -> Json<SessionContext> {
    Json(session)
}
