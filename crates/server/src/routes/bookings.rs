//! Customer booking route handlers.

use axum::{Json, extract::State, http::StatusCode};
use washday_core::ServiceId;

use crate::error::Result;
use crate::middleware::{OptionalSession, RequireSession};
use crate::models::{Booking, BookingForm};
use crate::services::{BookingOrchestrator, VendorCatalog, WorkflowError};
use crate::state::AppState;

pub async fn index(
    State(state): State<AppState>,
    RequireSession(session): RequireSession,
) -> Result<Json<Vec<Booking>>> {
    let bookings = BookingOrchestrator::new(state.store()?)
        .list_for_customer(&session)
        .await?;
    Ok(Json(bookings))
}

/// Request a booking.
///
/// The selected listing is loaded here, as the booking page would have
/// loaded it, and handed to the orchestrator. Unauthenticated callers are
/// refused before anything is read.
pub async fn create(
    State(state): State<AppState>,
    OptionalSession(session): OptionalSession,
    Json(form): Json<BookingForm>,
) -> Result<(StatusCode, Json<Booking>)> {
    let store = state.store()?;

    let selection = match (&session, ServiceId::parse(&form.service_id)) {
        (Some(_), Ok(service_id)) => {
            match VendorCatalog::new(store).active_listing(service_id).await {
                Ok(listing) => Some(listing),
                Err(WorkflowError::NotFound(_)) => None,
                Err(err) => return Err(err.into()),
            }
        }
        _ => None,
    };

    let booking = BookingOrchestrator::new(store)
        .create_booking(session.as_ref(), &form, selection.as_ref())
        .await?;
    Ok((StatusCode::CREATED, Json(booking)))
}
