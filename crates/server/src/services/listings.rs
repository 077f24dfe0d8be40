//! Vendor-side management: listings, service areas and business profile.
//!
//! Every operation requires the vendor role and is scoped by the caller's
//! identity id as `vendor_id`.

use chrono::Utc;
use serde_json::json;
use tracing::{info, instrument};

use washday_core::{Price, ServiceCategory, ServiceDuration, ServiceId, VendorId};

use crate::gateway::{
    DataGateway, Direction, GatewayErrorKind, OnConflict, Query, Relation, from_row, insert_as,
    select_as, select_one_as, to_row,
};
use crate::models::{
    NewServiceArea, NewServiceListing, ServiceArea, ServiceForm, ServiceListing, SessionContext,
    VendorProfile, VendorProfileForm, non_blank, optional_text,
};

use super::error::{Confirmation, ValidationError, WorkflowError, missing_fields};

/// Listing fields after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingDetails {
    pub name: String,
    pub description: String,
    pub category: ServiceCategory,
    pub price: Price,
    pub duration: ServiceDuration,
    pub is_active: bool,
}

impl ServiceForm {
    /// # Errors
    ///
    /// Returns `MissingFields` for blank name, description, type, price or
    /// duration; `InvalidPrice` for a non-positive price; `InvalidDuration`
    /// for a non-positive or over-long duration.
    pub fn validate(&self) -> Result<ListingDetails, ValidationError> {
        let present = |set: bool| if set { "set" } else { "" };
        missing_fields([
            ("name", self.name.as_str()),
            ("description", self.description.as_str()),
            ("service_type", present(self.service_type.is_some())),
            ("price", present(self.price.is_some())),
            ("duration", present(self.duration.is_some())),
        ])?;

        let price = self
            .price
            .and_then(|amount| Price::new(amount).ok())
            .ok_or(ValidationError::InvalidPrice)?;
        let duration = self
            .duration
            .and_then(|minutes| ServiceDuration::from_minutes(minutes).ok())
            .ok_or(ValidationError::InvalidDuration)?;

        Ok(ListingDetails {
            name: self.name.trim().to_string(),
            description: self.description.trim().to_string(),
            category: self.service_type.unwrap_or(ServiceCategory::Custom),
            price,
            duration,
            is_active: self.is_active.unwrap_or(true),
        })
    }
}

pub struct VendorListings<'a> {
    gateway: &'a dyn DataGateway,
}

fn require_vendor(session: &SessionContext) -> Result<VendorId, WorkflowError> {
    if session.is_vendor() {
        Ok(session.identity_id)
    } else {
        Err(WorkflowError::Forbidden("vendor account required"))
    }
}

fn owned(vendor_id: VendorId, id: ServiceId) -> Query {
    Query::new().eq("id", id).eq("vendor_id", vendor_id)
}

impl<'a> VendorListings<'a> {
    #[must_use]
    pub const fn new(gateway: &'a dyn DataGateway) -> Self {
        Self { gateway }
    }

    // =========================================================================
    // Service listings
    // =========================================================================

    /// The caller's listings, newest first, active or not.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` for non-vendors, or `Persistence`.
    pub async fn list_services(
        &self,
        session: &SessionContext,
    ) -> Result<Vec<ServiceListing>, WorkflowError> {
        let vendor_id = require_vendor(session)?;
        let query = Query::new()
            .eq("vendor_id", vendor_id)
            .order_by("created_at", Direction::Descending);
        Ok(select_as(self.gateway, Relation::Services, &query).await?)
    }

    /// # Errors
    ///
    /// Returns `Forbidden`, `NotFound`, or `Persistence`.
    pub async fn get_service(
        &self,
        session: &SessionContext,
        id: ServiceId,
    ) -> Result<ServiceListing, WorkflowError> {
        let vendor_id = require_vendor(session)?;
        select_one_as(self.gateway, Relation::Services, &owned(vendor_id, id))
            .await
            .map_err(WorkflowError::lookup("service"))
    }

    /// # Errors
    ///
    /// Returns `Forbidden`, a validation error, or `Persistence`.
    #[instrument(skip(self, session, form), fields(vendor_id = %session.identity_id))]
    pub async fn create_service(
        &self,
        session: &SessionContext,
        form: &ServiceForm,
    ) -> Result<ServiceListing, WorkflowError> {
        let vendor_id = require_vendor(session)?;
        let details = form.validate()?;
        let record = NewServiceListing {
            vendor_id,
            name: details.name,
            description: details.description,
            category: details.category,
            price: details.price,
            duration: details.duration,
            is_active: details.is_active,
        };
        let listing: ServiceListing = insert_as(self.gateway, Relation::Services, &record).await?;
        info!(service_id = %listing.id, "Service listing created");
        Ok(listing)
    }

    /// Replace a listing's details. Existing bookings keep their own
    /// price and end time.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden`, a validation error, `NotFound`, or `Persistence`.
    #[instrument(skip(self, session, form), fields(vendor_id = %session.identity_id, service_id = %id))]
    pub async fn update_service(
        &self,
        session: &SessionContext,
        id: ServiceId,
        form: &ServiceForm,
    ) -> Result<ServiceListing, WorkflowError> {
        let vendor_id = require_vendor(session)?;
        let details = form.validate()?;
        let patch = json!({
            "name": details.name,
            "description": details.description,
            "service_type": details.category,
            "price": details.price,
            "duration": details.duration,
            "is_active": details.is_active,
            "updated_at": Utc::now(),
        });
        let affected = self
            .gateway
            .update(
                Relation::Services,
                to_row(Relation::Services, &patch)?,
                &owned(vendor_id, id),
            )
            .await?;
        if affected == 0 {
            return Err(WorkflowError::NotFound("service"));
        }
        self.get_service(session, id).await
    }

    /// Flip a listing's active flag.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden`, `NotFound`, `Conflict` if the flag changed
    /// concurrently, or `Persistence`.
    #[instrument(skip(self, session), fields(vendor_id = %session.identity_id, service_id = %id))]
    pub async fn toggle_service(
        &self,
        session: &SessionContext,
        id: ServiceId,
    ) -> Result<ServiceListing, WorkflowError> {
        let current = self.get_service(session, id).await?;
        let patch = json!({
            "is_active": !current.is_active,
            "updated_at": Utc::now(),
        });
        let affected = self
            .gateway
            .update(
                Relation::Services,
                to_row(Relation::Services, &patch)?,
                &owned(current.vendor_id, id).eq("is_active", current.is_active),
            )
            .await?;
        if affected == 0 {
            return Err(WorkflowError::Conflict(
                "listing changed while toggling; reload and retry".into(),
            ));
        }
        info!(is_active = !current.is_active, "Service listing toggled");
        self.get_service(session, id).await
    }

    /// Delete a listing after explicit confirmation. Listings with bookings
    /// are kept; deactivate them instead.
    ///
    /// # Errors
    ///
    /// Returns `ConfirmationRequired`, `Forbidden`, `NotFound`, `Conflict`,
    /// or `Persistence`.
    #[instrument(skip(self, session), fields(vendor_id = %session.identity_id, service_id = %id))]
    pub async fn delete_service(
        &self,
        session: &SessionContext,
        id: ServiceId,
        confirmation: Confirmation,
    ) -> Result<(), WorkflowError> {
        let vendor_id = require_vendor(session)?;
        confirmation.require("service")?;
        self.get_service(session, id).await?;

        let conflict = || {
            WorkflowError::Conflict(
                "this service has bookings and cannot be deleted; deactivate it instead".into(),
            )
        };
        let booked = self
            .gateway
            .select(Relation::Bookings, &Query::new().eq("service_id", id).limit(1))
            .await?;
        if !booked.is_empty() {
            return Err(conflict());
        }

        let affected = self
            .gateway
            .delete(Relation::Services, &owned(vendor_id, id))
            .await
            .map_err(|err| match err.kind {
                GatewayErrorKind::Constraint => conflict(),
                _ => err.into(),
            })?;
        if affected == 0 {
            return Err(WorkflowError::NotFound("service"));
        }
        info!("Service listing deleted");
        Ok(())
    }

    // =========================================================================
    // Service areas
    // =========================================================================

    /// # Errors
    ///
    /// Returns `Forbidden` or `Persistence`.
    pub async fn list_areas(
        &self,
        session: &SessionContext,
    ) -> Result<Vec<ServiceArea>, WorkflowError> {
        let vendor_id = require_vendor(session)?;
        let query = Query::new()
            .eq("vendor_id", vendor_id)
            .order_by("zip_code", Direction::Ascending);
        Ok(select_as(self.gateway, Relation::VendorServiceAreas, &query).await?)
    }

    /// Declare a postal code as served. Adding one twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden`, `MissingPostalCode`, or `Persistence`.
    #[instrument(skip(self, session), fields(vendor_id = %session.identity_id))]
    pub async fn add_area(
        &self,
        session: &SessionContext,
        postal_code: &str,
    ) -> Result<ServiceArea, WorkflowError> {
        let vendor_id = require_vendor(session)?;
        let postal_code = non_blank(postal_code).ok_or(ValidationError::MissingPostalCode)?;

        let record = NewServiceArea {
            vendor_id,
            postal_code: postal_code.to_string(),
        };
        let added = self
            .gateway
            .upsert(
                Relation::VendorServiceAreas,
                to_row(Relation::VendorServiceAreas, &record)?,
                OnConflict::ignore("vendor_id,zip_code"),
            )
            .await?;
        match added {
            Some(row) => {
                info!(postal_code, "Service area added");
                Ok(from_row(Relation::VendorServiceAreas, row)?)
            }
            None => select_one_as(
                self.gateway,
                Relation::VendorServiceAreas,
                &Query::new()
                    .eq("vendor_id", vendor_id)
                    .eq("zip_code", postal_code),
            )
            .await
            .map_err(WorkflowError::lookup("service area")),
        }
    }

    /// # Errors
    ///
    /// Returns `Forbidden`, `NotFound` if the code was not served, or
    /// `Persistence`.
    pub async fn remove_area(
        &self,
        session: &SessionContext,
        postal_code: &str,
    ) -> Result<(), WorkflowError> {
        let vendor_id = require_vendor(session)?;
        let affected = self
            .gateway
            .delete(
                Relation::VendorServiceAreas,
                &Query::new()
                    .eq("vendor_id", vendor_id)
                    .eq("zip_code", postal_code.trim()),
            )
            .await?;
        if affected == 0 {
            return Err(WorkflowError::NotFound("service area"));
        }
        Ok(())
    }

    // =========================================================================
    // Vendor profile
    // =========================================================================

    /// The caller's business profile, created with defaults if sign-up never
    /// made one.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` or `Persistence`.
    pub async fn vendor_profile(
        &self,
        session: &SessionContext,
    ) -> Result<VendorProfile, WorkflowError> {
        let vendor_id = require_vendor(session)?;
        let by_id = Query::new().eq("id", vendor_id);
        match select_one_as(self.gateway, Relation::VendorProfiles, &by_id).await {
            Ok(profile) => return Ok(profile),
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(err.into()),
        }

        let now = Utc::now();
        let record = json!({
            "id": vendor_id,
            "business_name": VendorProfile::default_business_name(session.email.default_display_name()),
            "description": "",
            "is_mobile": true,
            "created_at": now,
            "updated_at": now,
        });
        let created = self
            .gateway
            .upsert(
                Relation::VendorProfiles,
                to_row(Relation::VendorProfiles, &record)?,
                OnConflict::ignore("id"),
            )
            .await?;
        match created {
            Some(row) => Ok(from_row(Relation::VendorProfiles, row)?),
            None => select_one_as(self.gateway, Relation::VendorProfiles, &by_id)
                .await
                .map_err(WorkflowError::lookup("vendor profile")),
        }
    }

    /// # Errors
    ///
    /// Returns `Forbidden`, a validation error, or `Persistence`.
    #[instrument(skip(self, session, form), fields(vendor_id = %session.identity_id))]
    pub async fn update_vendor_profile(
        &self,
        session: &SessionContext,
        form: &VendorProfileForm,
    ) -> Result<VendorProfile, WorkflowError> {
        let vendor_id = require_vendor(session)?;
        missing_fields([("business_name", form.business_name.as_str())])?;
        if form.service_radius.is_some_and(|r| r < 0) {
            return Err(ValidationError::NegativeRadius.into());
        }

        let record = json!({
            "id": vendor_id,
            "business_name": form.business_name.trim(),
            "description": form.description.trim(),
            "is_mobile": form.is_mobile.unwrap_or(true),
            "service_radius": form.service_radius,
            "logo_url": optional_text(form.logo_url.as_deref()),
            "updated_at": Utc::now(),
        });
        let row = self
            .gateway
            .upsert(
                Relation::VendorProfiles,
                to_row(Relation::VendorProfiles, &record)?,
                OnConflict::merge("id"),
            )
            .await?;
        info!("Vendor profile updated");
        match row {
            Some(row) => Ok(from_row(Relation::VendorProfiles, row)?),
            None => self.vendor_profile(session).await,
        }
    }
}
