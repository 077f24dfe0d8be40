//! Owner-scoped vehicle registry.
//!
//! Every read and write carries both the vehicle id and the caller's
//! identity id, so a vehicle that belongs to someone else behaves exactly
//! like one that does not exist.

use chrono::{NaiveDate, Utc};
use serde_json::json;
use tracing::{info, instrument, warn};

use washday_core::{MIN_VEHICLE_YEAR, VehicleId, VehicleType, is_plausible_year, max_vehicle_year};

use crate::gateway::{
    DataGateway, Direction, GatewayErrorKind, Query, Relation, insert_as, select_as,
    select_one_as, to_row,
};
use crate::models::{NewVehicle, SessionContext, Vehicle, VehicleForm};

use super::error::{Confirmation, ValidationError, WorkflowError, missing_fields};

/// Vehicle fields after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleDetails {
    pub make: String,
    pub model: String,
    pub year: i32,
    pub color: String,
    pub license_plate: String,
    pub vehicle_type: VehicleType,
}

impl VehicleForm {
    /// Check required fields and the model year against `today`.
    ///
    /// # Errors
    ///
    /// Returns `MissingFields` for blank make, model, year, color or plate,
    /// and `InvalidYear` outside `[1900, today.year() + 1]`.
    pub fn validate(&self, today: NaiveDate) -> Result<VehicleDetails, ValidationError> {
        let year_text = self.year.map(|y| y.to_string()).unwrap_or_default();
        missing_fields([
            ("make", self.make.as_str()),
            ("model", self.model.as_str()),
            ("year", year_text.as_str()),
            ("color", self.color.as_str()),
            ("license_plate", self.license_plate.as_str()),
        ])?;

        let year = self.year.unwrap_or_default();
        if !is_plausible_year(year, today) {
            return Err(ValidationError::InvalidYear {
                min: MIN_VEHICLE_YEAR,
                max: max_vehicle_year(today),
            });
        }

        Ok(VehicleDetails {
            make: self.make.trim().to_string(),
            model: self.model.trim().to_string(),
            year,
            color: self.color.trim().to_string(),
            license_plate: self.license_plate.trim().to_string(),
            vehicle_type: self.vehicle_type.unwrap_or_default(),
        })
    }
}

/// CRUD over the caller's vehicles.
pub struct VehicleRegistry<'a> {
    gateway: &'a dyn DataGateway,
    today: NaiveDate,
}

impl<'a> VehicleRegistry<'a> {
    #[must_use]
    pub fn new(gateway: &'a dyn DataGateway) -> Self {
        Self::as_of(gateway, Utc::now().date_naive())
    }

    /// A registry that validates years as if today were `today`.
    #[must_use]
    pub const fn as_of(gateway: &'a dyn DataGateway, today: NaiveDate) -> Self {
        Self { gateway, today }
    }

    fn owned(session: &SessionContext, id: VehicleId) -> Query {
        Query::new()
            .eq("id", id)
            .eq("user_id", session.identity_id)
    }

    /// The caller's vehicles, most recently created first.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the store fails.
    #[instrument(skip(self, session), fields(identity_id = %session.identity_id))]
    pub async fn list(&self, session: &SessionContext) -> Result<Vec<Vehicle>, WorkflowError> {
        let query = Query::new()
            .eq("user_id", session.identity_id)
            .order_by("created_at", Direction::Descending);
        Ok(select_as(self.gateway, Relation::Vehicles, &query).await?)
    }

    /// One of the caller's vehicles.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the vehicle does not exist or is not the caller's.
    pub async fn get(
        &self,
        session: &SessionContext,
        id: VehicleId,
    ) -> Result<Vehicle, WorkflowError> {
        select_one_as(self.gateway, Relation::Vehicles, &Self::owned(session, id))
            .await
            .map_err(WorkflowError::lookup("vehicle"))
    }

    /// Register a vehicle for the caller.
    ///
    /// # Errors
    ///
    /// Returns a validation error before any write, or `Persistence`.
    #[instrument(skip(self, session, form), fields(identity_id = %session.identity_id))]
    pub async fn create(
        &self,
        session: &SessionContext,
        form: &VehicleForm,
    ) -> Result<Vehicle, WorkflowError> {
        let details = form.validate(self.today)?;
        let record = NewVehicle {
            owner_id: session.identity_id,
            make: details.make,
            model: details.model,
            year: details.year,
            color: details.color,
            license_plate: details.license_plate,
            vehicle_type: details.vehicle_type,
        };
        let vehicle: Vehicle = insert_as(self.gateway, Relation::Vehicles, &record).await?;
        info!(vehicle_id = %vehicle.id, "Vehicle registered");
        Ok(vehicle)
    }

    /// Replace a vehicle's details.
    ///
    /// # Errors
    ///
    /// Returns a validation error, `NotFound` if nothing matched the id and
    /// owner, or `Persistence`.
    #[instrument(skip(self, session, form), fields(identity_id = %session.identity_id, vehicle_id = %id))]
    pub async fn update(
        &self,
        session: &SessionContext,
        id: VehicleId,
        form: &VehicleForm,
    ) -> Result<Vehicle, WorkflowError> {
        let details = form.validate(self.today)?;
        let patch = json!({
            "make": details.make,
            "model": details.model,
            "year": details.year,
            "color": details.color,
            "license_plate": details.license_plate,
            "vehicle_type": details.vehicle_type,
            "updated_at": Utc::now(),
        });

        let affected = self
            .gateway
            .update(
                Relation::Vehicles,
                to_row(Relation::Vehicles, &patch)?,
                &Self::owned(session, id),
            )
            .await?;
        if affected == 0 {
            warn!("Vehicle update matched no owned row");
            return Err(WorkflowError::NotFound("vehicle"));
        }
        self.get(session, id).await
    }

    /// Delete one of the caller's vehicles.
    ///
    /// Requires explicit confirmation. Vehicles referenced by any booking
    /// are kept so booking history stays intact.
    ///
    /// # Errors
    ///
    /// Returns `ConfirmationRequired`, `NotFound`, `Conflict` for a booked
    /// vehicle, or `Persistence`.
    #[instrument(skip(self, session), fields(identity_id = %session.identity_id, vehicle_id = %id))]
    pub async fn delete(
        &self,
        session: &SessionContext,
        id: VehicleId,
        confirmation: Confirmation,
    ) -> Result<(), WorkflowError> {
        confirmation.require("vehicle")?;
        self.get(session, id).await?;

        let bookings = self
            .gateway
            .select(Relation::Bookings, &Query::new().eq("vehicle_id", id).limit(1))
            .await?;
        if !bookings.is_empty() {
            return Err(WorkflowError::Conflict(
                "this vehicle has bookings and cannot be deleted".into(),
            ));
        }

        let affected = self
            .gateway
            .delete(Relation::Vehicles, &Self::owned(session, id))
            .await
            .map_err(|err| {
                if err.kind == GatewayErrorKind::Constraint {
                    WorkflowError::Conflict("this vehicle has bookings and cannot be deleted".into())
                } else {
                    err.into()
                }
            })?;
        if affected == 0 {
            return Err(WorkflowError::NotFound("vehicle"));
        }
        info!("Vehicle deleted");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use washday_core::{Email, IdentityId, Role};

    use super::*;
    use crate::gateway::memory::MemoryGateway;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 14).unwrap()
    }

    fn session() -> SessionContext {
        SessionContext::new(
            IdentityId::generate(),
            Email::parse("owner@example.com").unwrap(),
            Role::Customer,
        )
    }

    fn camry() -> VehicleForm {
        VehicleForm {
            make: "Toyota".into(),
            model: "Camry".into(),
            year: Some(2024),
            color: "Blue".into(),
            license_plate: "ABC123".into(),
            vehicle_type: None,
        }
    }

    #[test]
    fn test_validate_required_fields() {
        let form = VehicleForm {
            make: "Honda".into(),
            ..VehicleForm::default()
        };
        let err = form.validate(today()).unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingFields(vec!["model", "year", "color", "license_plate"])
        );
    }

    #[test]
    fn test_validate_year_range() {
        let mut form = camry();
        form.year = Some(1899);
        assert!(matches!(
            form.validate(today()),
            Err(ValidationError::InvalidYear { min: 1900, max: 2027 })
        ));
        form.year = Some(2028);
        assert!(form.validate(today()).is_err());
        form.year = Some(2027);
        assert!(form.validate(today()).is_ok());
    }

    #[tokio::test]
    async fn test_created_vehicle_is_retrievable_and_listed_first() {
        let gateway = MemoryGateway::new();
        let registry = VehicleRegistry::as_of(&gateway, today());
        let owner = session();

        let older = registry
            .create(
                &owner,
                &VehicleForm {
                    make: "Ford".into(),
                    model: "F-150".into(),
                    year: Some(2019),
                    color: "Black".into(),
                    license_plate: "TRK001".into(),
                    vehicle_type: Some(VehicleType::Truck),
                },
            )
            .await
            .unwrap();
        let camry = registry.create(&owner, &camry()).await.unwrap();

        let fetched = registry.get(&owner, camry.id).await.unwrap();
        assert_eq!(fetched.make, "Toyota");
        assert_eq!(fetched.model, "Camry");
        assert_eq!(fetched.year, 2024);
        assert_eq!(fetched.color, "Blue");
        assert_eq!(fetched.license_plate, "ABC123");
        assert_eq!(fetched.vehicle_type, VehicleType::Sedan);

        let ids: Vec<_> = registry.list(&owner).await.unwrap().iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![camry.id, older.id]);
    }

    #[tokio::test]
    async fn test_other_owner_cannot_see_update_or_delete() {
        let gateway = MemoryGateway::new();
        let registry = VehicleRegistry::as_of(&gateway, today());
        let owner = session();
        let intruder = session();
        let vehicle = registry.create(&owner, &camry()).await.unwrap();

        assert!(matches!(
            registry.get(&intruder, vehicle.id).await,
            Err(WorkflowError::NotFound("vehicle"))
        ));

        let mut repaint = camry();
        repaint.color = "Red".into();
        assert!(matches!(
            registry.update(&intruder, vehicle.id, &repaint).await,
            Err(WorkflowError::NotFound("vehicle"))
        ));
        assert!(matches!(
            registry
                .delete(&intruder, vehicle.id, Confirmation::Confirmed)
                .await,
            Err(WorkflowError::NotFound("vehicle"))
        ));

        let untouched = registry.get(&owner, vehicle.id).await.unwrap();
        assert_eq!(untouched.color, "Blue");
        assert_eq!(gateway.count(Relation::Vehicles).await, 1);
    }

    #[tokio::test]
    async fn test_update_by_owner() {
        let gateway = MemoryGateway::new();
        let registry = VehicleRegistry::as_of(&gateway, today());
        let owner = session();
        let vehicle = registry.create(&owner, &camry()).await.unwrap();

        let mut repaint = camry();
        repaint.color = "Silver".into();
        let updated = registry.update(&owner, vehicle.id, &repaint).await.unwrap();
        assert_eq!(updated.color, "Silver");
        assert_eq!(updated.created_at, vehicle.created_at);
    }

    #[tokio::test]
    async fn test_delete_requires_confirmation() {
        let gateway = MemoryGateway::new();
        let registry = VehicleRegistry::as_of(&gateway, today());
        let owner = session();
        let vehicle = registry.create(&owner, &camry()).await.unwrap();

        assert!(matches!(
            registry
                .delete(&owner, vehicle.id, Confirmation::Unconfirmed)
                .await,
            Err(WorkflowError::ConfirmationRequired("vehicle"))
        ));
        assert_eq!(gateway.count(Relation::Vehicles).await, 1);

        registry
            .delete(&owner, vehicle.id, Confirmation::Confirmed)
            .await
            .unwrap();
        assert_eq!(gateway.count(Relation::Vehicles).await, 0);
    }

    #[tokio::test]
    async fn test_booked_vehicle_cannot_be_deleted() {
        let gateway = MemoryGateway::new();
        let registry = VehicleRegistry::as_of(&gateway, today());
        let owner = session();
        let vehicle = registry.create(&owner, &camry()).await.unwrap();
        gateway
            .insert(
                Relation::Bookings,
                to_row(Relation::Bookings, &json!({"vehicle_id": vehicle.id})).unwrap(),
            )
            .await
            .unwrap();

        assert!(matches!(
            registry
                .delete(&owner, vehicle.id, Confirmation::Confirmed)
                .await,
            Err(WorkflowError::Conflict(_))
        ));
        assert_eq!(gateway.count(Relation::Vehicles).await, 1);
    }
}
