//! Profile bootstrap and settings.

use chrono::Utc;
use serde_json::json;
use tracing::{info, instrument};

use crate::gateway::{
    DataGateway, OnConflict, Query, Relation, from_row, select_one_as, to_row,
};
use crate::models::{NewProfile, Profile, ProfileForm, SessionContext, optional_text};

use super::error::{WorkflowError, missing_fields};

/// Ensures every identity has exactly one profile.
pub struct ProfileBootstrapper<'a> {
    gateway: &'a dyn DataGateway,
}

impl<'a> ProfileBootstrapper<'a> {
    #[must_use]
    pub const fn new(gateway: &'a dyn DataGateway) -> Self {
        Self { gateway }
    }

    /// Return the caller's profile, creating a blank one on first sight.
    ///
    /// Creation is an insert that ignores an existing row with the same
    /// identity id, so concurrent first sightings converge on one profile.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the store fails.
    #[instrument(skip(self, session), fields(identity_id = %session.identity_id))]
    pub async fn ensure_profile(&self, session: &SessionContext) -> Result<Profile, WorkflowError> {
        let by_id = Query::new().eq("id", session.identity_id);
        match select_one_as::<Profile>(self.gateway, Relation::Profiles, &by_id).await {
            Ok(profile) => return Ok(profile),
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(err.into()),
        }

        let record = NewProfile::blank(session.identity_id, session.role, Utc::now());
        let inserted = self
            .gateway
            .upsert(
                Relation::Profiles,
                to_row(Relation::Profiles, &record)?,
                OnConflict::ignore("id"),
            )
            .await?;

        match inserted {
            Some(row) => {
                info!("Created profile on first sight");
                Ok(from_row(Relation::Profiles, row)?)
            }
            // Another path created it between our read and write.
            None => select_one_as(self.gateway, Relation::Profiles, &by_id)
                .await
                .map_err(WorkflowError::lookup("profile")),
        }
    }

    /// Update the caller's contact details.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the full name is blank, or
    /// `Persistence` if the store fails.
    #[instrument(skip(self, session, form), fields(identity_id = %session.identity_id))]
    pub async fn update_profile(
        &self,
        session: &SessionContext,
        form: &ProfileForm,
    ) -> Result<Profile, WorkflowError> {
        missing_fields([("full_name", form.full_name.as_str())])?;

        let record = json!({
            "id": session.identity_id,
            "full_name": form.full_name.trim(),
            "role": session.role,
            "phone_number": optional_text(form.phone_number.as_deref()),
            "address": optional_text(form.address.as_deref()),
            "city": optional_text(form.city.as_deref()),
            "state": optional_text(form.state.as_deref()),
            "zip_code": optional_text(form.zip_code.as_deref()),
            "updated_at": Utc::now(),
        });

        let row = self
            .gateway
            .upsert(
                Relation::Profiles,
                to_row(Relation::Profiles, &record)?,
                OnConflict::merge("id"),
            )
            .await?;

        info!("Profile updated");
        match row {
            Some(row) => Ok(from_row(Relation::Profiles, row)?),
            None => self.ensure_profile(session).await,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use washday_core::{Email, IdentityId, Role};

    use super::*;
    use crate::gateway::GatewayErrorKind;
    use crate::gateway::memory::MemoryGateway;

    fn session() -> SessionContext {
        SessionContext::new(
            IdentityId::generate(),
            Email::parse("driver@example.com").unwrap(),
            Role::Customer,
        )
    }

    #[tokio::test]
    async fn test_ensure_profile_creates_blank_profile() {
        let gateway = MemoryGateway::new();
        let session = session();
        let profile = ProfileBootstrapper::new(&gateway)
            .ensure_profile(&session)
            .await
            .unwrap();

        assert_eq!(profile.id, session.identity_id);
        assert_eq!(profile.full_name, "");
        assert_eq!(profile.avatar_url, "");
        assert_eq!(gateway.count(Relation::Profiles).await, 1);
    }

    #[tokio::test]
    async fn test_ensure_profile_twice_keeps_one_row() {
        let gateway = MemoryGateway::new();
        let session = session();
        let bootstrapper = ProfileBootstrapper::new(&gateway);

        let first = bootstrapper.ensure_profile(&session).await.unwrap();
        let second = bootstrapper.ensure_profile(&session).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(gateway.count(Relation::Profiles).await, 1);
    }

    #[tokio::test]
    async fn test_ensure_profile_concurrent_first_sightings() {
        let gateway = MemoryGateway::new();
        let session = session();
        let bootstrapper = ProfileBootstrapper::new(&gateway);

        let (a, b) = tokio::join!(
            bootstrapper.ensure_profile(&session),
            bootstrapper.ensure_profile(&session)
        );
        assert_eq!(a.unwrap().id, b.unwrap().id);
        assert_eq!(gateway.count(Relation::Profiles).await, 1);
    }

    #[tokio::test]
    async fn test_ensure_profile_returns_existing_unchanged() {
        let gateway = MemoryGateway::new();
        let session = session();
        let bootstrapper = ProfileBootstrapper::new(&gateway);
        bootstrapper
            .update_profile(
                &session,
                &ProfileForm {
                    full_name: "Jordan Lee".into(),
                    city: Some("Austin".into()),
                    ..ProfileForm::default()
                },
            )
            .await
            .unwrap();

        let profile = bootstrapper.ensure_profile(&session).await.unwrap();
        assert_eq!(profile.full_name, "Jordan Lee");
        assert_eq!(profile.city.as_deref(), Some("Austin"));
    }

    #[tokio::test]
    async fn test_update_requires_full_name() {
        let gateway = MemoryGateway::new();
        let err = ProfileBootstrapper::new(&gateway)
            .update_profile(&session(), &ProfileForm::default())
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));
        assert_eq!(gateway.count(Relation::Profiles).await, 0);
    }

    #[tokio::test]
    async fn test_update_blank_optional_fields_clear() {
        let gateway = MemoryGateway::new();
        let session = session();
        let bootstrapper = ProfileBootstrapper::new(&gateway);
        let profile = bootstrapper
            .update_profile(
                &session,
                &ProfileForm {
                    full_name: "  Casey  ".into(),
                    phone_number: Some("   ".into()),
                    ..ProfileForm::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(profile.full_name, "Casey");
        assert!(profile.phone_number.is_none());
    }

    #[tokio::test]
    async fn test_missing_relation_surfaces_schema_error() {
        let gateway = MemoryGateway::new().without_relation(Relation::Profiles);
        let err = ProfileBootstrapper::new(&gateway)
            .ensure_profile(&session())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::Persistence(ref e) if e.kind == GatewayErrorKind::SchemaMissing
        ));
    }
}
