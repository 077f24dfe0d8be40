//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server-side errors to
//! Sentry before responding to the client. All route handlers return
//! `Result<T, AppError>`; the body is always `{"error": "..."}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::gateway::{GatewayError, GatewayErrorKind};
use crate::identity::IdentityError;
use crate::services::{ValidationError, WorkflowError};

/// Where unauthenticated callers are sent.
pub const LOGIN_PATH: &str = "/auth/login";

/// Application-level error type for the server.
#[derive(Debug, Error)]
pub enum AppError {
    /// A workflow rejected or failed the operation.
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    /// The hosted store credentials are not configured.
    #[error("Backend credentials are missing")]
    StoreUnconfigured,

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The request is not authenticated for this endpoint.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The identity provider could not be reached.
    #[error("Identity provider error: {0}")]
    Identity(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        Self::Workflow(err.into())
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        Self::Workflow(err.into())
    }
}

impl From<IdentityError> for AppError {
    fn from(err: IdentityError) -> Self {
        Self::Identity(err.to_string())
    }
}

impl AppError {
    /// Shortcut for handlers that need a signed-in caller.
    #[must_use]
    pub const fn authentication_required() -> Self {
        Self::Workflow(WorkflowError::AuthenticationRequired)
    }

    const fn status(&self) -> StatusCode {
        match self {
            Self::Workflow(err) => match err {
                WorkflowError::Validation(_) => StatusCode::BAD_REQUEST,
                WorkflowError::NotFound(_) => StatusCode::NOT_FOUND,
                WorkflowError::AuthenticationRequired => StatusCode::UNAUTHORIZED,
                WorkflowError::Forbidden(_) => StatusCode::FORBIDDEN,
                WorkflowError::Conflict(_) => StatusCode::CONFLICT,
                WorkflowError::ConfirmationRequired(_) => StatusCode::PRECONDITION_REQUIRED,
                WorkflowError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Identity(_) => StatusCode::BAD_GATEWAY,
            Self::StoreUnconfigured | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Workflow(WorkflowError::Persistence(_))
                | Self::StoreUnconfigured
                | Self::Identity(_)
                | Self::Internal(_)
        )
    }

    /// Client-facing message.
    fn public_message(&self) -> String {
        match self {
            Self::Workflow(WorkflowError::Persistence(err)) => persistence_message(err),
            Self::Workflow(WorkflowError::AuthenticationRequired) => {
                "Please sign in to continue".to_string()
            }
            Self::Identity(_) => "Identity provider unavailable".to_string(),
            Self::Internal(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

fn persistence_message(err: &GatewayError) -> String {
    match err.kind {
        GatewayErrorKind::SchemaMissing => format!(
            "Database table \"{}\" does not exist. Run `washday-cli migrate` to set up the schema.",
            err.relation
        ),
        GatewayErrorKind::Unavailable => "The data store is unavailable, please retry".to_string(),
        _ => format!("Could not save changes to \"{}\"", err.relation),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = self.status();
        let body = if status == StatusCode::UNAUTHORIZED {
            json!({ "error": self.public_message(), "redirect": LOGIN_PATH })
        } else if let Self::Workflow(WorkflowError::Persistence(err)) = &self {
            json!({ "error": self.public_message(), "details": err.message })
        } else {
            json!({ "error": self.public_message() })
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context.
///
/// Call this after successful sign-in to associate errors with identities.
pub fn set_sentry_user(identity_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(identity_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("booking", "Booking created", Some(&[("booking_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
