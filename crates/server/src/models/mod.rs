//! Domain records and request forms.
//!
//! Record types mirror the store's columns through serde so they round-trip
//! through the gateway unchanged. Form types are what clients submit; every
//! text field defaults to empty so "missing" and "blank" are validated the
//! same way.

pub mod booking;
pub mod catalog;
pub mod profile;
pub mod session;
pub mod vehicle;

pub use booking::{Booking, BookingForm, NewBooking};
pub use catalog::{
    NewServiceArea, NewServiceListing, Review, ServiceArea, ServiceForm, ServiceListing,
    VendorProfile, VendorProfileForm,
};
pub use profile::{NewProfile, Profile, ProfileForm};
pub use session::{SessionContext, keys};
pub use vehicle::{NewVehicle, Vehicle, VehicleForm};

/// Trim a submitted text field, mapping blank to `None`.
#[must_use]
pub fn non_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Optional text column from an optional form field.
#[must_use]
pub fn optional_text(value: Option<&str>) -> Option<String> {
    value.and_then(non_blank).map(str::to_owned)
}
