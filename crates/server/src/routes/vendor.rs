//! Vendor dashboard route handlers.
//!
//! Every handler requires a signed-in caller; the workflows reject
//! non-vendors with 403.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use washday_core::{BookingId, BookingStatus, ServiceId};

use super::{ConfirmQuery, path_id};
use crate::error::Result;
use crate::middleware::RequireSession;
use crate::models::{Booking, ServiceArea, ServiceForm, ServiceListing, VendorProfile, VendorProfileForm};
use crate::services::{BookingOrchestrator, VendorListings};
use crate::state::AppState;

// =============================================================================
// Business profile
// =============================================================================

pub async fn profile(
    State(state): State<AppState>,
    RequireSession(session): RequireSession,
) -> Result<Json<VendorProfile>> {
    let profile = VendorListings::new(state.store()?)
        .vendor_profile(&session)
        .await?;
    Ok(Json(profile))
}

pub async fn update_profile(
    State(state): State<AppState>,
    RequireSession(session): RequireSession,
    Json(form): Json<VendorProfileForm>,
) -> Result<Json<VendorProfile>> {
    let profile = VendorListings::new(state.store()?)
        .update_vendor_profile(&session, &form)
        .await?;
    Ok(Json(profile))
}

// =============================================================================
// Service listings
// =============================================================================

pub async fn list_services(
    State(state): State<AppState>,
    RequireSession(session): RequireSession,
) -> Result<Json<Vec<ServiceListing>>> {
    let listings = VendorListings::new(state.store()?)
        .list_services(&session)
        .await?;
    Ok(Json(listings))
}

pub async fn create_service(
    State(state): State<AppState>,
    RequireSession(session): RequireSession,
    Json(form): Json<ServiceForm>,
) -> Result<(StatusCode, Json<ServiceListing>)> {
    let listing = VendorListings::new(state.store()?)
        .create_service(&session, &form)
        .await?;
    Ok((StatusCode::CREATED, Json(listing)))
}

pub async fn update_service(
    State(state): State<AppState>,
    RequireSession(session): RequireSession,
    Path(id): Path<String>,
    Json(form): Json<ServiceForm>,
) -> Result<Json<ServiceListing>> {
    let id: ServiceId = path_id(&id, "service")?;
    let listing = VendorListings::new(state.store()?)
        .update_service(&session, id, &form)
        .await?;
    Ok(Json(listing))
}

pub async fn toggle_service(
    State(state): State<AppState>,
    RequireSession(session): RequireSession,
    Path(id): Path<String>,
) -> Result<Json<ServiceListing>> {
    let id: ServiceId = path_id(&id, "service")?;
    let listing = VendorListings::new(state.store()?)
        .toggle_service(&session, id)
        .await?;
    Ok(Json(listing))
}

pub async fn delete_service(
    State(state): State<AppState>,
    RequireSession(session): RequireSession,
    Path(id): Path<String>,
    Query(confirm): Query<ConfirmQuery>,
) -> Result<StatusCode> {
    let id: ServiceId = path_id(&id, "service")?;
    VendorListings::new(state.store()?)
        .delete_service(&session, id, confirm.confirmation())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Service areas
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AreaForm {
    pub postal_code: String,
}

pub async fn list_areas(
    State(state): State<AppState>,
    RequireSession(session): RequireSession,
) -> Result<Json<Vec<ServiceArea>>> {
    let areas = VendorListings::new(state.store()?)
        .list_areas(&session)
        .await?;
    Ok(Json(areas))
}

pub async fn add_area(
    State(state): State<AppState>,
    RequireSession(session): RequireSession,
    Json(form): Json<AreaForm>,
) -> Result<(StatusCode, Json<ServiceArea>)> {
    let area = VendorListings::new(state.store()?)
        .add_area(&session, &form.postal_code)
        .await?;
    Ok((StatusCode::CREATED, Json(area)))
}

pub async fn remove_area(
    State(state): State<AppState>,
    RequireSession(session): RequireSession,
    Path(postal_code): Path<String>,
) -> Result<StatusCode> {
    VendorListings::new(state.store()?)
        .remove_area(&session, &postal_code)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Incoming bookings
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BookingListQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: BookingStatus,
}

pub async fn list_bookings(
    State(state): State<AppState>,
    RequireSession(session): RequireSession,
    Query(query): Query<BookingListQuery>,
) -> Result<Json<Vec<Booking>>> {
    let bookings = BookingOrchestrator::new(state.store()?)
        .list_for_vendor(&session, query.limit)
        .await?;
    Ok(Json(bookings))
}

pub async fn update_booking_status(
    State(state): State<AppState>,
    RequireSession(session): RequireSession,
    Path(id): Path<String>,
    Json(form): Json<StatusForm>,
) -> Result<Json<Booking>> {
    let id: BookingId = path_id(&id, "booking")?;
    let booking = BookingOrchestrator::new(state.store()?)
        .transition_status(&session, id, form.status)
        .await?;
    Ok(Json(booking))
}
