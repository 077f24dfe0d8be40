//! Booking requests.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use washday_core::{BookingId, BookingStatus, IdentityId, Price, ServiceId, VehicleId, VendorId};

/// A reservation of a listing for one vehicle on one date.
///
/// `end_time` and `total_price` are fixed at creation and never follow
/// later edits to the listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    #[serde(rename = "user_id")]
    pub customer_id: IdentityId,
    pub vendor_id: VendorId,
    pub service_id: ServiceId,
    pub vehicle_id: VehicleId,
    pub booking_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: BookingStatus,
    #[serde(default)]
    pub notes: String,
    pub total_price: Price,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert shape for a booking.
#[derive(Debug, Clone, Serialize)]
pub struct NewBooking {
    #[serde(rename = "user_id")]
    pub customer_id: IdentityId,
    pub vendor_id: VendorId,
    pub service_id: ServiceId,
    pub vehicle_id: VehicleId,
    pub booking_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: BookingStatus,
    pub notes: String,
    pub total_price: Price,
}

/// Booking form as submitted; every field is text so blanks are caught
/// by validation rather than by deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BookingForm {
    pub service_id: String,
    pub vendor_id: String,
    pub vehicle_id: String,
    pub booking_date: String,
    pub start_time: String,
    pub notes: Option<String>,
}
