//! Vendor-side records: vendor profiles, service listings, service areas
//! and reviews.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use washday_core::{
    IdentityId, Price, ReviewId, ServiceAreaId, ServiceCategory, ServiceDuration, ServiceId,
    VendorId,
};

/// Business details for a vendor identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorProfile {
    pub id: VendorId,
    pub business_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_mobile: bool,
    #[serde(default)]
    pub service_radius: Option<i32>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub average_rating: Option<Decimal>,
    #[serde(default)]
    pub logo_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VendorProfile {
    /// Business name given to a vendor at sign-up.
    #[must_use]
    pub fn default_business_name(full_name: &str) -> String {
        format!("{full_name}'s Car Wash Service")
    }
}

/// A bookable offering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceListing {
    pub id: ServiceId,
    pub vendor_id: VendorId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "service_type")]
    pub category: ServiceCategory,
    pub price: Price,
    pub duration: ServiceDuration,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert/update shape for a listing.
#[derive(Debug, Clone, Serialize)]
pub struct NewServiceListing {
    pub vendor_id: VendorId,
    pub name: String,
    pub description: String,
    #[serde(rename = "service_type")]
    pub category: ServiceCategory,
    pub price: Price,
    pub duration: ServiceDuration,
    pub is_active: bool,
}

/// A postal code a vendor serves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceArea {
    pub id: ServiceAreaId,
    pub vendor_id: VendorId,
    #[serde(rename = "zip_code")]
    pub postal_code: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewServiceArea {
    pub vendor_id: VendorId,
    #[serde(rename = "zip_code")]
    pub postal_code: String,
}

/// A customer's rating of a vendor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub vendor_id: VendorId,
    #[serde(rename = "user_id")]
    pub reviewer_id: IdentityId,
    pub rating: i16,
    #[serde(default)]
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Vendor service create/edit form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServiceForm {
    pub name: String,
    pub description: String,
    pub service_type: Option<ServiceCategory>,
    pub price: Option<Decimal>,
    pub duration: Option<i64>,
    pub is_active: Option<bool>,
}

/// Vendor business profile form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VendorProfileForm {
    pub business_name: String,
    pub description: String,
    pub is_mobile: Option<bool>,
    pub service_radius: Option<i32>,
    pub logo_url: Option<String>,
}
