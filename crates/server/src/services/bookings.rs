//! Booking orchestration.
//!
//! A booking is built from the customer's form plus the listing the caller
//! loaded for the selection. Duration and price are read from that loaded
//! listing, never re-fetched, so the booking reflects exactly what the
//! customer was shown. No overlap check is made: two customers may book
//! the same vendor, date and window and both succeed.

use chrono::{NaiveDate, NaiveTime, Utc};
use serde_json::json;
use tracing::{info, instrument, warn};

use washday_core::{
    BookingId, BookingStatus, IdentityId, ServiceId, VehicleId, VendorId, end_time, parse_time,
    wraps_midnight,
};

use crate::gateway::{
    DataGateway, Direction, Query, Relation, insert_as, select_as, select_one_as, to_row,
};
use crate::models::{Booking, BookingForm, NewBooking, ServiceListing, SessionContext, Vehicle};

use super::error::{ValidationError, WorkflowError, missing_fields};

/// Bookings shown on the vendor dashboard when no limit is given.
pub const DEFAULT_VENDOR_BOOKINGS: usize = 5;
/// Largest vendor booking page.
pub const MAX_VENDOR_BOOKINGS: usize = 100;

/// A booking form with every field parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingRequest {
    pub service_id: ServiceId,
    pub vendor_id: VendorId,
    pub vehicle_id: VehicleId,
    pub booking_date: NaiveDate,
    pub start_time: NaiveTime,
    pub notes: String,
}

fn parse_id<T: std::str::FromStr>(field: &'static str, value: &str) -> Result<T, ValidationError> {
    value
        .trim()
        .parse()
        .map_err(|_| ValidationError::InvalidId {
            field,
            value: value.trim().to_string(),
        })
}

impl BookingRequest {
    /// # Errors
    ///
    /// Returns `MissingFields` if any of service, vendor, vehicle, date or
    /// start time is blank; otherwise a parse error for the first malformed
    /// field.
    pub fn parse(form: &BookingForm) -> Result<Self, ValidationError> {
        missing_fields([
            ("service_id", form.service_id.as_str()),
            ("vendor_id", form.vendor_id.as_str()),
            ("vehicle_id", form.vehicle_id.as_str()),
            ("booking_date", form.booking_date.as_str()),
            ("start_time", form.start_time.as_str()),
        ])?;

        let booking_date = NaiveDate::parse_from_str(form.booking_date.trim(), "%Y-%m-%d")
            .map_err(|_| ValidationError::InvalidDate(form.booking_date.trim().to_string()))?;
        let start_time = parse_time(&form.start_time)
            .map_err(|_| ValidationError::InvalidTime(form.start_time.trim().to_string()))?;

        Ok(Self {
            service_id: parse_id("service_id", &form.service_id)?,
            vendor_id: parse_id("vendor_id", &form.vendor_id)?,
            vehicle_id: parse_id("vehicle_id", &form.vehicle_id)?,
            booking_date,
            start_time,
            notes: form.notes.as_deref().map(str::trim).unwrap_or_default().to_string(),
        })
    }

    /// The pending booking this request makes for `customer` against the
    /// loaded `listing`.
    ///
    /// # Errors
    ///
    /// Returns `SelectionMismatch` if `listing` is not the requested
    /// service, or `VendorMismatch` if it is not offered by the requested
    /// vendor.
    pub fn price_booking(
        &self,
        customer: IdentityId,
        listing: &ServiceListing,
    ) -> Result<NewBooking, ValidationError> {
        if listing.id != self.service_id {
            return Err(ValidationError::SelectionMismatch);
        }
        if listing.vendor_id != self.vendor_id {
            return Err(ValidationError::VendorMismatch);
        }

        Ok(NewBooking {
            customer_id: customer,
            vendor_id: self.vendor_id,
            service_id: self.service_id,
            vehicle_id: self.vehicle_id,
            booking_date: self.booking_date,
            start_time: self.start_time,
            end_time: end_time(self.start_time, listing.duration),
            status: BookingStatus::Pending,
            notes: self.notes.clone(),
            total_price: listing.price,
        })
    }
}

/// Creates bookings and moves them through their lifecycle.
pub struct BookingOrchestrator<'a> {
    gateway: &'a dyn DataGateway,
}

impl<'a> BookingOrchestrator<'a> {
    #[must_use]
    pub const fn new(gateway: &'a dyn DataGateway) -> Self {
        Self { gateway }
    }

    /// Persist a pending booking.
    ///
    /// Checks run in order and nothing is written unless all pass: a
    /// signed-in caller, a complete form, a loaded selection matching the
    /// form, and a vehicle the caller owns.
    ///
    /// # Errors
    ///
    /// Returns `AuthenticationRequired`, a validation error, `NotFound`
    /// for a missing selection or vehicle, or `Persistence` if the insert
    /// fails.
    #[instrument(skip_all)]
    pub async fn create_booking(
        &self,
        session: Option<&SessionContext>,
        form: &BookingForm,
        selection: Option<&ServiceListing>,
    ) -> Result<Booking, WorkflowError> {
        let session = session.ok_or(WorkflowError::AuthenticationRequired)?;
        let request = BookingRequest::parse(form).inspect_err(|err| {
            warn!(error = %err, "Rejected booking form");
        })?;
        let listing = selection.ok_or(WorkflowError::NotFound("service"))?;
        let record = request.price_booking(session.identity_id, listing)?;

        select_one_as::<Vehicle>(
            self.gateway,
            Relation::Vehicles,
            &Query::new()
                .eq("id", request.vehicle_id)
                .eq("user_id", session.identity_id),
        )
        .await
        .map_err(WorkflowError::lookup("vehicle"))?;

        if wraps_midnight(request.start_time, listing.duration) {
            warn!(
                start_time = %request.start_time,
                duration = listing.duration.minutes(),
                "Booking window runs past midnight"
            );
        }

        let booking: Booking = insert_as(self.gateway, Relation::Bookings, &record).await?;
        info!(booking_id = %booking.id, vendor_id = %booking.vendor_id, "Booking created");
        Ok(booking)
    }

    /// The caller's bookings, latest date first.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the store fails.
    pub async fn list_for_customer(
        &self,
        session: &SessionContext,
    ) -> Result<Vec<Booking>, WorkflowError> {
        let query = Query::new()
            .eq("user_id", session.identity_id)
            .order_by("booking_date", Direction::Descending)
            .order_by("start_time", Direction::Descending);
        Ok(select_as(self.gateway, Relation::Bookings, &query).await?)
    }

    /// Bookings made with the calling vendor, latest date first.
    ///
    /// `limit` defaults to [`DEFAULT_VENDOR_BOOKINGS`] and is clamped to
    /// `1..=MAX_VENDOR_BOOKINGS`.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` for non-vendors, or `Persistence`.
    pub async fn list_for_vendor(
        &self,
        session: &SessionContext,
        limit: Option<usize>,
    ) -> Result<Vec<Booking>, WorkflowError> {
        if !session.is_vendor() {
            return Err(WorkflowError::Forbidden("vendor account required"));
        }
        let limit = limit
            .unwrap_or(DEFAULT_VENDOR_BOOKINGS)
            .clamp(1, MAX_VENDOR_BOOKINGS);
        let query = Query::new()
            .eq("vendor_id", session.identity_id)
            .order_by("booking_date", Direction::Descending)
            .order_by("start_time", Direction::Descending)
            .limit(limit);
        Ok(select_as(self.gateway, Relation::Bookings, &query).await?)
    }

    /// Move one of the calling vendor's bookings to `next`.
    ///
    /// The update only applies while the booking still has the status it
    /// was read with, so two racing transitions cannot both win.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden`, `NotFound`, `InvalidStatusTransition`,
    /// `Conflict` if the status changed concurrently, or `Persistence`.
    #[instrument(skip(self, session), fields(vendor_id = %session.identity_id))]
    pub async fn transition_status(
        &self,
        session: &SessionContext,
        id: BookingId,
        next: BookingStatus,
    ) -> Result<Booking, WorkflowError> {
        if !session.is_vendor() {
            return Err(WorkflowError::Forbidden("vendor account required"));
        }
        let scoped = Query::new()
            .eq("id", id)
            .eq("vendor_id", session.identity_id);
        let current: Booking = select_one_as(self.gateway, Relation::Bookings, &scoped)
            .await
            .map_err(WorkflowError::lookup("booking"))?;

        if !current.status.can_transition_to(next) {
            return Err(ValidationError::InvalidStatusTransition {
                from: current.status,
                to: next,
            }
            .into());
        }

        let patch = json!({ "status": next, "updated_at": Utc::now() });
        let affected = self
            .gateway
            .update(
                Relation::Bookings,
                to_row(Relation::Bookings, &patch)?,
                &scoped.clone().eq("status", current.status.as_str()),
            )
            .await?;
        if affected == 0 {
            return Err(WorkflowError::Conflict(
                "booking status changed; reload and retry".into(),
            ));
        }

        info!(from = %current.status, to = %next, "Booking status changed");
        select_one_as(self.gateway, Relation::Bookings, &scoped)
            .await
            .map_err(WorkflowError::lookup("booking"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use washday_core::{Email, Role, ServiceCategory};

    use super::*;
    use crate::gateway::memory::MemoryGateway;
    use crate::models::{ServiceForm, VehicleForm};
    use crate::services::{VehicleRegistry, VendorListings};

    fn session(email: &str, role: Role) -> SessionContext {
        SessionContext::new(IdentityId::generate(), Email::parse(email).unwrap(), role)
    }

    struct Fixture {
        gateway: MemoryGateway,
        vendor: SessionContext,
        customer: SessionContext,
        listing: ServiceListing,
        vehicle: Vehicle,
    }

    async fn fixture(duration: i64, price: Decimal) -> Fixture {
        let gateway = MemoryGateway::new();
        let vendor = session("suds@example.com", Role::Vendor);
        let customer = session("driver@example.com", Role::Customer);
        let listing = VendorListings::new(&gateway)
            .create_service(
                &vendor,
                &ServiceForm {
                    name: "Full Detail".into(),
                    description: "Inside and out".into(),
                    service_type: Some(ServiceCategory::FullDetail),
                    price: Some(price),
                    duration: Some(duration),
                    is_active: None,
                },
            )
            .await
            .unwrap();
        let vehicle = add_vehicle(&gateway, &customer).await;
        Fixture {
            gateway,
            vendor,
            customer,
            listing,
            vehicle,
        }
    }

    async fn add_vehicle(gateway: &MemoryGateway, owner: &SessionContext) -> Vehicle {
        VehicleRegistry::new(gateway)
            .create(
                owner,
                &VehicleForm {
                    make: "Toyota".into(),
                    model: "Camry".into(),
                    year: Some(2020),
                    color: "Blue".into(),
                    license_plate: "ABC123".into(),
                    vehicle_type: None,
                },
            )
            .await
            .unwrap()
    }

    fn form(listing: &ServiceListing, vehicle: &Vehicle, start: &str) -> BookingForm {
        BookingForm {
            service_id: listing.id.to_string(),
            vendor_id: listing.vendor_id.to_string(),
            vehicle_id: vehicle.id.to_string(),
            booking_date: "2026-03-14".into(),
            start_time: start.into(),
            notes: Some("Gate code 1234".into()),
        }
    }

    #[tokio::test]
    async fn test_end_time_wraps_past_midnight() {
        let f = fixture(90, Decimal::new(15000, 2)).await;
        let booking = BookingOrchestrator::new(&f.gateway)
            .create_booking(
                Some(&f.customer),
                &form(&f.listing, &f.vehicle, "23:00"),
                Some(&f.listing),
            )
            .await
            .unwrap();

        assert_eq!(booking.start_time, NaiveTime::from_hms_opt(23, 0, 0).unwrap());
        assert_eq!(booking.end_time, NaiveTime::from_hms_opt(0, 30, 0).unwrap());
        assert_eq!(booking.booking_date, NaiveDate::from_ymd_opt(2026, 3, 14).unwrap());
        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.notes, "Gate code 1234");
        assert_eq!(booking.customer_id, f.customer.identity_id);
    }

    #[tokio::test]
    async fn test_end_time_carries_hours() {
        let f = fixture(45, Decimal::new(2500, 2)).await;
        let booking = BookingOrchestrator::new(&f.gateway)
            .create_booking(
                Some(&f.customer),
                &form(&f.listing, &f.vehicle, "09:30"),
                Some(&f.listing),
            )
            .await
            .unwrap();
        assert_eq!(booking.end_time, NaiveTime::from_hms_opt(10, 15, 0).unwrap());
    }

    #[tokio::test]
    async fn test_blank_required_field_writes_nothing() {
        let f = fixture(60, Decimal::new(2500, 2)).await;
        let orchestrator = BookingOrchestrator::new(&f.gateway);
        let blanks: [fn(&mut BookingForm); 5] = [
            |form| form.service_id.clear(),
            |form| form.vendor_id.clear(),
            |form| form.vehicle_id = "  ".into(),
            |form| form.booking_date.clear(),
            |form| form.start_time.clear(),
        ];

        for blank in blanks {
            let mut submitted = form(&f.listing, &f.vehicle, "10:00");
            blank(&mut submitted);
            let err = orchestrator
                .create_booking(Some(&f.customer), &submitted, Some(&f.listing))
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                WorkflowError::Validation(ValidationError::MissingFields(_))
            ));
        }
        assert_eq!(f.gateway.count(Relation::Bookings).await, 0);
    }

    #[tokio::test]
    async fn test_signed_out_caller_writes_nothing() {
        let f = fixture(60, Decimal::new(2500, 2)).await;
        let err = BookingOrchestrator::new(&f.gateway)
            .create_booking(None, &form(&f.listing, &f.vehicle, "10:00"), Some(&f.listing))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::AuthenticationRequired));
        assert_eq!(f.gateway.count(Relation::Bookings).await, 0);
    }

    #[tokio::test]
    async fn test_total_price_is_snapshot() {
        let f = fixture(60, Decimal::new(2500, 2)).await;
        let booking = BookingOrchestrator::new(&f.gateway)
            .create_booking(
                Some(&f.customer),
                &form(&f.listing, &f.vehicle, "10:00"),
                Some(&f.listing),
            )
            .await
            .unwrap();
        assert_eq!(booking.total_price.display(), "$25.00");

        VendorListings::new(&f.gateway)
            .update_service(
                &f.vendor,
                f.listing.id,
                &ServiceForm {
                    name: "Full Detail".into(),
                    description: "Inside and out".into(),
                    service_type: Some(ServiceCategory::FullDetail),
                    price: Some(Decimal::new(4000, 2)),
                    duration: Some(120),
                    is_active: Some(true),
                },
            )
            .await
            .unwrap();

        let stored = BookingOrchestrator::new(&f.gateway)
            .list_for_customer(&f.customer)
            .await
            .unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].total_price.display(), "$25.00");
        assert_eq!(stored[0].end_time, NaiveTime::from_hms_opt(11, 0, 0).unwrap());
    }

    #[tokio::test]
    async fn test_overlapping_bookings_both_succeed() {
        let f = fixture(60, Decimal::new(2500, 2)).await;
        let other = session("other@example.com", Role::Customer);
        let other_vehicle = add_vehicle(&f.gateway, &other).await;
        let orchestrator = BookingOrchestrator::new(&f.gateway);

        orchestrator
            .create_booking(
                Some(&f.customer),
                &form(&f.listing, &f.vehicle, "10:00"),
                Some(&f.listing),
            )
            .await
            .unwrap();
        orchestrator
            .create_booking(
                Some(&other),
                &form(&f.listing, &other_vehicle, "10:30"),
                Some(&f.listing),
            )
            .await
            .unwrap();

        assert_eq!(f.gateway.count(Relation::Bookings).await, 2);
        let vendor_view = orchestrator
            .list_for_vendor(&f.vendor, None)
            .await
            .unwrap();
        assert_eq!(vendor_view.len(), 2);
    }

    #[tokio::test]
    async fn test_selection_must_match_form() {
        let f = fixture(60, Decimal::new(2500, 2)).await;
        let orchestrator = BookingOrchestrator::new(&f.gateway);

        let mut other_vendor = form(&f.listing, &f.vehicle, "10:00");
        other_vendor.vendor_id = IdentityId::generate().to_string();
        assert!(matches!(
            orchestrator
                .create_booking(Some(&f.customer), &other_vendor, Some(&f.listing))
                .await,
            Err(WorkflowError::Validation(ValidationError::VendorMismatch))
        ));

        let mut other_service = form(&f.listing, &f.vehicle, "10:00");
        other_service.service_id = ServiceId::generate().to_string();
        assert!(matches!(
            orchestrator
                .create_booking(Some(&f.customer), &other_service, Some(&f.listing))
                .await,
            Err(WorkflowError::Validation(ValidationError::SelectionMismatch))
        ));

        assert!(matches!(
            orchestrator
                .create_booking(Some(&f.customer), &form(&f.listing, &f.vehicle, "10:00"), None)
                .await,
            Err(WorkflowError::NotFound("service"))
        ));
        assert_eq!(f.gateway.count(Relation::Bookings).await, 0);
    }

    #[tokio::test]
    async fn test_vehicle_must_belong_to_customer() {
        let f = fixture(60, Decimal::new(2500, 2)).await;
        let stranger = session("stranger@example.com", Role::Customer);
        let err = BookingOrchestrator::new(&f.gateway)
            .create_booking(
                Some(&stranger),
                &form(&f.listing, &f.vehicle, "10:00"),
                Some(&f.listing),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound("vehicle")));
        assert_eq!(f.gateway.count(Relation::Bookings).await, 0);
    }

    #[test]
    fn test_parse_rejects_malformed_values() {
        let valid = BookingForm {
            service_id: ServiceId::generate().to_string(),
            vendor_id: IdentityId::generate().to_string(),
            vehicle_id: VehicleId::generate().to_string(),
            booking_date: "2026-03-14".into(),
            start_time: "10:00".into(),
            notes: None,
        };
        assert_eq!(BookingRequest::parse(&valid).unwrap().notes, "");

        let mut bad = valid.clone();
        bad.booking_date = "14/03/2026".into();
        assert!(matches!(
            BookingRequest::parse(&bad),
            Err(ValidationError::InvalidDate(_))
        ));

        let mut bad = valid.clone();
        bad.start_time = "25:00".into();
        assert!(matches!(
            BookingRequest::parse(&bad),
            Err(ValidationError::InvalidTime(_))
        ));

        let mut bad = valid;
        bad.vehicle_id = "my-car".into();
        assert!(matches!(
            BookingRequest::parse(&bad),
            Err(ValidationError::InvalidId { field: "vehicle_id", .. })
        ));
    }

    #[tokio::test]
    async fn test_status_transitions() {
        let f = fixture(60, Decimal::new(2500, 2)).await;
        let orchestrator = BookingOrchestrator::new(&f.gateway);
        let booking = orchestrator
            .create_booking(
                Some(&f.customer),
                &form(&f.listing, &f.vehicle, "10:00"),
                Some(&f.listing),
            )
            .await
            .unwrap();

        assert!(matches!(
            orchestrator
                .transition_status(&f.customer, booking.id, BookingStatus::Confirmed)
                .await,
            Err(WorkflowError::Forbidden(_))
        ));
        assert!(matches!(
            orchestrator
                .transition_status(
                    &session("rival@example.com", Role::Vendor),
                    booking.id,
                    BookingStatus::Confirmed
                )
                .await,
            Err(WorkflowError::NotFound("booking"))
        ));

        let confirmed = orchestrator
            .transition_status(&f.vendor, booking.id, BookingStatus::Confirmed)
            .await
            .unwrap();
        assert_eq!(confirmed.status, BookingStatus::Confirmed);
        assert_eq!(confirmed.total_price, booking.total_price);

        let completed = orchestrator
            .transition_status(&f.vendor, booking.id, BookingStatus::Completed)
            .await
            .unwrap();
        assert_eq!(completed.status, BookingStatus::Completed);

        assert!(matches!(
            orchestrator
                .transition_status(&f.vendor, booking.id, BookingStatus::Cancelled)
                .await,
            Err(WorkflowError::Validation(
                ValidationError::InvalidStatusTransition { .. }
            ))
        ));
    }

    #[tokio::test]
    async fn test_vendor_list_is_limited() {
        let f = fixture(30, Decimal::new(2000, 2)).await;
        let orchestrator = BookingOrchestrator::new(&f.gateway);
        for hour in 8..15 {
            orchestrator
                .create_booking(
                    Some(&f.customer),
                    &form(&f.listing, &f.vehicle, &format!("{hour:02}:00")),
                    Some(&f.listing),
                )
                .await
                .unwrap();
        }

        let recent = orchestrator.list_for_vendor(&f.vendor, None).await.unwrap();
        assert_eq!(recent.len(), DEFAULT_VENDOR_BOOKINGS);
        assert_eq!(recent[0].start_time, NaiveTime::from_hms_opt(14, 0, 0).unwrap());
        assert_eq!(
            orchestrator.list_for_vendor(&f.vendor, Some(2)).await.unwrap().len(),
            2
        );
        assert!(matches!(
            orchestrator.list_for_vendor(&f.customer, None).await,
            Err(WorkflowError::Forbidden(_))
        ));
    }
}
