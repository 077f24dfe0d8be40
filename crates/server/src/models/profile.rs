//! Profiles: one per identity, keyed by the identity id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use washday_core::{IdentityId, Role};

/// Personal details for an identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: IdentityId,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub avatar_url: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub zip_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert shape for a profile.
#[derive(Debug, Clone, Serialize)]
pub struct NewProfile {
    pub id: IdentityId,
    pub full_name: String,
    pub avatar_url: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NewProfile {
    /// A profile with an empty name and avatar, stamped `now`.
    #[must_use]
    pub fn blank(id: IdentityId, role: Role, now: DateTime<Utc>) -> Self {
        Self::named(id, String::new(), role, now)
    }

    #[must_use]
    pub const fn named(id: IdentityId, full_name: String, role: Role, now: DateTime<Utc>) -> Self {
        Self {
            id,
            full_name,
            avatar_url: String::new(),
            role,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Profile/settings form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProfileForm {
    pub full_name: String,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
}
