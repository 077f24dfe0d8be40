//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                          - Liveness
//! GET    /health/ready                    - Readiness (db pool + store)
//!
//! # Session
//! POST   /auth/session                    - Sign in with a provider access token
//! DELETE /auth/session                    - Sign out
//! GET    /api/session                     - Current session context
//!
//! # Customer (requires auth)
//! GET    /api/profile                     - Profile (created on first sight)
//! PUT    /api/profile                     - Update profile
//! GET    /api/vehicles                    - Vehicle list, newest first
//! POST   /api/vehicles                    - Register a vehicle
//! GET    /api/vehicles/{id}               - Vehicle detail
//! PUT    /api/vehicles/{id}               - Update a vehicle
//! DELETE /api/vehicles/{id}?confirm=true  - Delete a vehicle
//! GET    /api/bookings                    - Own bookings
//! POST   /api/bookings                    - Request a booking
//!
//! # Vendor (requires vendor role)
//! GET    /api/vendor/profile              - Business profile
//! PUT    /api/vendor/profile              - Update business profile
//! GET    /api/vendor/services             - Own listings
//! POST   /api/vendor/services             - Create a listing
//! PUT    /api/vendor/services/{id}        - Update a listing
//! DELETE /api/vendor/services/{id}?confirm=true - Delete a listing
//! POST   /api/vendor/services/{id}/toggle - Flip the active flag
//! GET    /api/vendor/service-areas        - Served postal codes
//! POST   /api/vendor/service-areas        - Add a postal code
//! DELETE /api/vendor/service-areas/{postal_code} - Remove a postal code
//! GET    /api/vendor/bookings?limit=n     - Incoming bookings
//! POST   /api/vendor/bookings/{id}/status - Move a booking to a new status
//!
//! # Public
//! GET    /api/search?postal_code=&category= - Vendors serving a postal code
//! GET    /api/vendors/{id}                - Vendor page
//! GET    /api/reference/years             - Vehicle year picker values
//!
//! # Webhooks
//! POST   /webhooks/new-identity           - Identity provider account-created hook
//! ```

pub mod auth;
pub mod bookings;
pub mod catalog;
pub mod health;
pub mod profile;
pub mod reference;
pub mod vehicles;
pub mod vendor;
pub mod webhook;

use std::str::FromStr;

use axum::{
    Router,
    routing::{get, post, put},
};
use serde::Deserialize;

use crate::error::AppError;
use crate::services::{Confirmation, WorkflowError};
use crate::state::AppState;

/// `?confirm=true` on destructive requests.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ConfirmQuery {
    pub confirm: bool,
}

impl ConfirmQuery {
    #[must_use]
    pub const fn confirmation(&self) -> Confirmation {
        Confirmation::from_flag(self.confirm)
    }
}

/// Parse an id from a path segment; a malformed id is simply not found.
pub(crate) fn path_id<T: FromStr>(raw: &str, what: &'static str) -> Result<T, AppError> {
    raw.parse()
        .map_err(|_| AppError::Workflow(WorkflowError::NotFound(what)))
}

/// Create the vendor routes router.
pub fn vendor_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/profile",
            get(vendor::profile).put(vendor::update_profile),
        )
        .route(
            "/services",
            get(vendor::list_services).post(vendor::create_service),
        )
        .route(
            "/services/{id}",
            put(vendor::update_service).delete(vendor::delete_service),
        )
        .route("/services/{id}/toggle", post(vendor::toggle_service))
        .route(
            "/service-areas",
            get(vendor::list_areas).post(vendor::add_area),
        )
        .route(
            "/service-areas/{postal_code}",
            axum::routing::delete(vendor::remove_area),
        )
        .route("/bookings", get(vendor::list_bookings))
        .route("/bookings/{id}/status", post(vendor::update_booking_status))
}

/// Create the customer and public API router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/session", get(auth::current_session))
        .route(
            "/profile",
            get(profile::show).put(profile::update),
        )
        .route(
            "/vehicles",
            get(vehicles::index).post(vehicles::create),
        )
        .route(
            "/vehicles/{id}",
            get(vehicles::show)
                .put(vehicles::update)
                .delete(vehicles::destroy),
        )
        .route(
            "/bookings",
            get(bookings::index).post(bookings::create),
        )
        .route("/search", get(catalog::search))
        .route("/vendors/{id}", get(catalog::vendor))
        .route("/reference/years", get(reference::years))
        .nest("/vendor", vendor_routes())
}

/// Create all routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .route(
            "/auth/session",
            post(auth::sign_in).delete(auth::sign_out),
        )
        .route("/webhooks/new-identity", post(webhook::new_identity))
        .nest("/api", api_routes())
}
