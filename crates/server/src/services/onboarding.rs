//! Bootstrap records for a newly created identity.
//!
//! This is the authoritative creation path, driven by the identity
//! provider's account-created event. Client sessions only fall back to
//! [`ProfileBootstrapper::ensure_profile`](super::ProfileBootstrapper::ensure_profile)
//! for identities that predate the hook.

use chrono::Utc;
use serde_json::json;
use tracing::{info, instrument};

use washday_core::{Email, IdentityId, Role};

use crate::gateway::{DataGateway, OnConflict, Relation, to_row};
use crate::models::{NewProfile, VendorProfile};

use super::error::WorkflowError;

/// A freshly created identity as described by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIdentity {
    pub id: IdentityId,
    pub email: Email,
    pub full_name: Option<String>,
    pub role: Role,
}

impl NewIdentity {
    /// Metadata name, or the email's local part when none was given.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.full_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| self.email.default_display_name())
            .to_string()
    }
}

/// Whether onboarding created anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnboardingOutcome {
    Created,
    AlreadyExists,
}

/// Create the profile (and, for vendors, the vendor profile) for `identity`.
///
/// Both writes ignore existing rows, so redelivery of the same event is
/// harmless.
///
/// # Errors
///
/// Returns `Persistence` if either write fails.
#[instrument(skip(gateway, identity), fields(identity_id = %identity.id, role = %identity.role))]
pub async fn handle_new_identity(
    gateway: &dyn DataGateway,
    identity: &NewIdentity,
) -> Result<OnboardingOutcome, WorkflowError> {
    let now = Utc::now();
    let name = identity.display_name();

    let profile = NewProfile::named(identity.id, name.clone(), identity.role, now);
    let created = gateway
        .upsert(
            Relation::Profiles,
            to_row(Relation::Profiles, &profile)?,
            OnConflict::ignore("id"),
        )
        .await?
        .is_some();

    if identity.role == Role::Vendor {
        let vendor = json!({
            "id": identity.id,
            "business_name": VendorProfile::default_business_name(&name),
            "description": "",
            "is_mobile": true,
            "created_at": now,
            "updated_at": now,
        });
        gateway
            .upsert(
                Relation::VendorProfiles,
                to_row(Relation::VendorProfiles, &vendor)?,
                OnConflict::ignore("id"),
            )
            .await?;
    }

    if created {
        info!("Onboarded new identity");
        Ok(OnboardingOutcome::Created)
    } else {
        info!("Identity already onboarded");
        Ok(OnboardingOutcome::AlreadyExists)
    }
}
