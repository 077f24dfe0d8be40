//! Workflow error types.

use thiserror::Error;

use washday_core::BookingStatus;

use crate::gateway::{GatewayError, GatewayErrorKind};

/// Caller input that fails a precondition. Always raised before any write.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// One or more required fields are blank.
    #[error("please fill in all required fields")]
    MissingFields(Vec<&'static str>),

    #[error("year must be between {min} and {max}")]
    InvalidYear { min: i32, max: i32 },

    #[error("Please enter a valid price.")]
    InvalidPrice,

    #[error("Please enter a valid duration.")]
    InvalidDuration,

    #[error("invalid date {0:?}, expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("invalid start time {0:?}, expected HH:MM")]
    InvalidTime(String),

    #[error("invalid {field}: {value:?}")]
    InvalidId { field: &'static str, value: String },

    /// The loaded listing is not the one the form names.
    #[error("the selected service does not match the submitted service")]
    SelectionMismatch,

    /// The listing belongs to a different vendor than the form names.
    #[error("the selected service is not offered by this vendor")]
    VendorMismatch,

    #[error("Please enter a ZIP code to search.")]
    MissingPostalCode,

    #[error("service radius cannot be negative")]
    NegativeRadius,

    #[error("cannot move a {from} booking to {to}")]
    InvalidStatusTransition {
        from: BookingStatus,
        to: BookingStatus,
    },
}

/// Failure of one workflow operation.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Nothing matched the id and ownership filters.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// No signed-in identity.
    #[error("authentication required")]
    AuthenticationRequired,

    /// Signed in, but the role does not allow this.
    #[error("{0}")]
    Forbidden(&'static str),

    /// The operation conflicts with existing data.
    #[error("{0}")]
    Conflict(String),

    /// A destructive operation was attempted without explicit confirmation.
    #[error("deleting this {0} requires confirmation")]
    ConfirmationRequired(&'static str),

    #[error(transparent)]
    Persistence(#[from] GatewayError),
}

impl WorkflowError {
    /// Map a single-row lookup failure, turning `NotFound` into a
    /// [`WorkflowError::NotFound`] for `what`.
    pub(crate) fn lookup(what: &'static str) -> impl FnOnce(GatewayError) -> Self {
        move |err| {
            if err.kind == GatewayErrorKind::NotFound {
                Self::NotFound(what)
            } else {
                Self::Persistence(err)
            }
        }
    }
}

/// Whether the caller has explicitly confirmed a destructive action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Unconfirmed,
}

impl Confirmation {
    #[must_use]
    pub const fn from_flag(confirmed: bool) -> Self {
        if confirmed {
            Self::Confirmed
        } else {
            Self::Unconfirmed
        }
    }

    pub(crate) fn require(self, what: &'static str) -> Result<(), WorkflowError> {
        match self {
            Self::Confirmed => Ok(()),
            Self::Unconfirmed => Err(WorkflowError::ConfirmationRequired(what)),
        }
    }
}

/// Collect the names of blank required fields.
pub(crate) fn missing_fields<'a>(
    fields: impl IntoIterator<Item = (&'static str, &'a str)>,
) -> Result<(), ValidationError> {
    let missing: Vec<&'static str> = fields
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::MissingFields(missing))
    }
}
