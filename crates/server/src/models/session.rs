//! Session-related types.

use serde::{Deserialize, Serialize};

use washday_core::{Email, IdentityId, Role};

/// The authenticated caller, passed explicitly into every identity-scoped
/// operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub identity_id: IdentityId,
    pub email: Email,
    pub role: Role,
}

impl SessionContext {
    #[must_use]
    pub const fn new(identity_id: IdentityId, email: Email, role: Role) -> Self {
        Self {
            identity_id,
            email,
            role,
        }
    }

    #[must_use]
    pub fn is_vendor(&self) -> bool {
        self.role == Role::Vendor
    }
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for the signed-in [`super::SessionContext`].
    pub const SESSION_CONTEXT: &str = "session_context";
}
