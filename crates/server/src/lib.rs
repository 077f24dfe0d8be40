//! Washday server library.
//!
//! A marketplace for mobile car-wash services. Customers register
//! vehicles, search vendors by postal code and request bookings; vendors
//! publish service listings and manage incoming bookings. Persistence and
//! authentication are delegated to a hosted backend reached through
//! [`gateway::DataGateway`] and [`identity::IdentityProvider`].
//!
//! This crate provides the server as a library so the router can be
//! driven in tests with in-memory collaborators.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod identity;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::{Router, extract::Request, middleware::from_fn};
use tower_http::trace::TraceLayer;
use tower_sessions::SessionStore;

use state::AppState;

/// Build the full application router over `session_store`.
///
/// Layers, outermost first: Sentry, request tracing, request id,
/// sessions.
pub fn app<S>(state: AppState, session_store: S) -> Router
where
    S: SessionStore + Clone,
{
    let session_layer = middleware::create_session_layer(session_store, state.config());

    routes::routes()
        .layer(session_layer)
        .with_state(state)
        .layer(from_fn(middleware::request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}
