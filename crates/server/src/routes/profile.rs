//! Profile route handlers.

use axum::{Json, extract::State};

use crate::error::Result;
use crate::middleware::RequireSession;
use crate::models::{Profile, ProfileForm};
use crate::services::ProfileBootstrapper;
use crate::state::AppState;

/// The caller's profile, created blank on first sight.
pub async fn show(
    State(state): State<AppState>,
    RequireSession(session): RequireSession,
) -> Result<Json<Profile>> {
    let profile = ProfileBootstrapper::new(state.store()?)
        .ensure_profile(&session)
        .await?;
    Ok(Json(profile))
}

pub async fn update(
    State(state): State<AppState>,
    RequireSession(session): RequireSession,
    Json(form): Json<ProfileForm>,
) -> Result<Json<Profile>> {
    let profile = ProfileBootstrapper::new(state.store()?)
        .update_profile(&session, &form)
        .await?;
    Ok(Json(profile))
}
