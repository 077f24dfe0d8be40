//! Vehicle route handlers.
//!
//! All routes require a signed-in caller and only ever see the caller's
//! own vehicles.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use washday_core::VehicleId;

use super::{ConfirmQuery, path_id};
use crate::error::Result;
use crate::middleware::RequireSession;
use crate::models::{Vehicle, VehicleForm};
use crate::services::VehicleRegistry;
use crate::state::AppState;

pub async fn index(
    State(state): State<AppState>,
    RequireSession(session): RequireSession,
) -> Result<Json<Vec<Vehicle>>> {
    let vehicles = VehicleRegistry::new(state.store()?).list(&session).await?;
    Ok(Json(vehicles))
}

pub async fn create(
    State(state): State<AppState>,
    RequireSession(session): RequireSession,
    Json(form): Json<VehicleForm>,
) -> Result<(StatusCode, Json<Vehicle>)> {
    let vehicle = VehicleRegistry::new(state.store()?)
        .create(&session, &form)
        .await?;
    Ok((StatusCode::CREATED, Json(vehicle)))
}

pub async fn show(
    State(state): State<AppState>,
    RequireSession(session): RequireSession,
    Path(id): Path<String>,
) -> Result<Json<Vehicle>> {
    let id: VehicleId = path_id(&id, "vehicle")?;
    let vehicle = VehicleRegistry::new(state.store()?).get(&session, id).await?;
    Ok(Json(vehicle))
}

pub async fn update(
    State(state): State<AppState>,
    RequireSession(session): RequireSession,
    Path(id): Path<String>,
    Json(form): Json<VehicleForm>,
) -> Result<Json<Vehicle>> {
    let id: VehicleId = path_id(&id, "vehicle")?;
    let vehicle = VehicleRegistry::new(state.store()?)
        .update(&session, id, &form)
        .await?;
    Ok(Json(vehicle))
}

/// Delete a vehicle. Without `?confirm=true` nothing is attempted.
pub async fn destroy(
    State(state): State<AppState>,
    RequireSession(session): RequireSession,
    Path(id): Path<String>,
    Query(confirm): Query<ConfirmQuery>,
) -> Result<StatusCode> {
    let id: VehicleId = path_id(&id, "vehicle")?;
    VehicleRegistry::new(state.store()?)
        .delete(&session, id, confirm.confirmation())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
