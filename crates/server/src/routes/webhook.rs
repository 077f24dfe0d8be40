//! New-identity webhook.
//!
//! The identity provider posts its database-webhook payload here when an
//! account is created:
//!
//! ```json
//! { "type": "INSERT", "table": "users",
//!   "record": { "id": "...", "email": "...",
//!               "raw_user_meta_data": { "full_name": "...", "role": "vendor" } } }
//! ```
//!
//! Responses carry `{"message": ...}` on success and `{"error": ...}`
//! (plus `details` for store failures) otherwise.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{error, info, instrument, warn};

use washday_core::{Email, IdentityId, Role};

use crate::config::webhook_token_matches;
use crate::services::{NewIdentity, OnboardingOutcome, handle_new_identity};
use crate::state::AppState;

type WebhookResponse = (StatusCode, Json<Value>);

#[derive(Debug, Deserialize)]
struct Payload {
    record: Option<UserRecord>,
}

#[derive(Debug, Deserialize)]
struct UserRecord {
    id: Option<String>,
    email: Option<String>,
    #[serde(default, alias = "user_metadata")]
    raw_user_meta_data: Metadata,
}

#[derive(Debug, Default, Deserialize)]
struct Metadata {
    full_name: Option<String>,
    role: Option<String>,
}

fn reply(status: StatusCode, body: Value) -> WebhookResponse {
    (status, Json(body))
}

fn invalid_user_data() -> WebhookResponse {
    reply(StatusCode::BAD_REQUEST, json!({ "error": "Invalid user data" }))
}

/// Decode the payload into a new identity, or `None` if `record`, its id or
/// its email is missing or malformed.
fn parse_identity(body: &[u8]) -> Option<NewIdentity> {
    let payload: Payload = serde_json::from_slice(body).ok()?;
    let record = payload.record?;
    let id = IdentityId::parse(record.id.as_deref()?).ok()?;
    let email = Email::parse(record.email.as_deref()?).ok()?;
    Some(NewIdentity {
        id,
        email,
        full_name: record.raw_user_meta_data.full_name,
        role: Role::from_metadata(record.raw_user_meta_data.role.as_deref()),
    })
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
}

#[instrument(skip_all)]
pub async fn new_identity(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> WebhookResponse {
    if let Some(secret) = &state.config().webhook_secret {
        let authorized = bearer(&headers).is_some_and(|token| webhook_token_matches(secret, token));
        if !authorized {
            warn!("Webhook call without a valid bearer token");
            return reply(StatusCode::UNAUTHORIZED, json!({ "error": "Unauthorized" }));
        }
    }

    let Some(identity) = parse_identity(&body) else {
        warn!(body_len = body.len(), "Webhook payload missing user data");
        return invalid_user_data();
    };
    info!(identity_id = %identity.id, role = %identity.role, "Processing new identity");

    let Ok(store) = state.store() else {
        error!("Webhook received but backend credentials are missing");
        return reply(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "error": "Backend credentials are missing" }),
        );
    };

    match handle_new_identity(store, &identity).await {
        Ok(OnboardingOutcome::Created) => {
            reply(StatusCode::OK, json!({ "message": "Profile created successfully" }))
        }
        Ok(OnboardingOutcome::AlreadyExists) => {
            reply(StatusCode::OK, json!({ "message": "Profile already exists" }))
        }
        Err(err) => {
            let event_id = sentry::capture_error(&err);
            error!(error = %err, sentry_event_id = %event_id, "Failed to insert profile");
            reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Failed to insert profile", "details": err.to_string() }),
            )
        }
    }
}
