//! Customer vehicles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use washday_core::{IdentityId, VehicleId, VehicleType};

/// A vehicle owned by exactly one identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: VehicleId,
    #[serde(rename = "user_id")]
    pub owner_id: IdentityId,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub color: String,
    pub license_plate: String,
    #[serde(default)]
    pub vehicle_type: VehicleType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert shape for a vehicle; the store generates `id` and timestamps.
#[derive(Debug, Clone, Serialize)]
pub struct NewVehicle {
    #[serde(rename = "user_id")]
    pub owner_id: IdentityId,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub color: String,
    pub license_plate: String,
    pub vehicle_type: VehicleType,
}

/// Vehicle create/edit form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VehicleForm {
    pub make: String,
    pub model: String,
    pub year: Option<i32>,
    pub color: String,
    pub license_plate: String,
    pub vehicle_type: Option<VehicleType>,
}
