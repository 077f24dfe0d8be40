//! Marketplace workflows.
//!
//! Each service borrows a [`DataGateway`](crate::gateway::DataGateway) for
//! the duration of one request and takes the caller's
//! [`SessionContext`](crate::models::SessionContext) explicitly.
//!
//! # Services
//!
//! - [`profiles`] - Profile bootstrap, read and update
//! - [`onboarding`] - New-identity bootstrap (webhook path)
//! - [`vehicles`] - Owner-scoped vehicle registry
//! - [`catalog`] - Public vendor search and vendor detail
//! - [`listings`] - Vendor-side listings, service areas and business profile
//! - [`bookings`] - Booking creation, lists and status transitions

pub mod bookings;
pub mod catalog;
mod error;
pub mod listings;
pub mod onboarding;
pub mod profiles;
pub mod vehicles;

pub use bookings::{BookingOrchestrator, BookingRequest};
pub use catalog::{VendorCatalog, VendorDetail, VendorMatch};
pub use error::{Confirmation, ValidationError, WorkflowError};
pub use listings::VendorListings;
pub use onboarding::{NewIdentity, OnboardingOutcome, handle_new_identity};
pub use profiles::ProfileBootstrapper;
pub use vehicles::VehicleRegistry;
