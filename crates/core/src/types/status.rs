//! Status and category enums for marketplace entities.
//!
//! Each enum serializes as the `snake_case` string stored in the database
//! enum of the same name.

use serde::{Deserialize, Serialize};

/// Lifecycle of a booking request.
///
/// ```text
/// pending ──► confirmed ──► completed
///    │            │
///    └────────────┴──► cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    /// Created by a customer, awaiting the vendor.
    #[default]
    Pending,
    /// Accepted by the vendor.
    Confirmed,
    /// Service delivered.
    Completed,
    /// Withdrawn before completion.
    Cancelled,
}

impl BookingStatus {
    /// Whether no further transitions are allowed.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Whether a booking in `self` may move to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Confirmed | Self::Cancelled)
                | (Self::Confirmed, Self::Completed | Self::Cancelled)
        )
    }

    /// Database/wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("invalid booking status: {s}")),
        }
    }
}

/// Kind of service a vendor offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceCategory {
    BasicWash,
    PremiumWash,
    InteriorCleaning,
    FullDetail,
    Custom,
}

impl ServiceCategory {
    /// All categories, in display order.
    pub const ALL: [Self; 5] = [
        Self::BasicWash,
        Self::PremiumWash,
        Self::InteriorCleaning,
        Self::FullDetail,
        Self::Custom,
    ];

    /// Database/wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BasicWash => "basic_wash",
            Self::PremiumWash => "premium_wash",
            Self::InteriorCleaning => "interior_cleaning",
            Self::FullDetail => "full_detail",
            Self::Custom => "custom",
        }
    }
}

impl std::fmt::Display for ServiceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ServiceCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| format!("invalid service category: {s}"))
    }
}

/// Body style of a customer vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VehicleType {
    #[default]
    Sedan,
    Suv,
    Truck,
    Van,
    Coupe,
    Convertible,
    Hatchback,
    Wagon,
    Other,
}

impl VehicleType {
    /// Database/wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sedan => "sedan",
            Self::Suv => "suv",
            Self::Truck => "truck",
            Self::Van => "van",
            Self::Coupe => "coupe",
            Self::Convertible => "convertible",
            Self::Hatchback => "hatchback",
            Self::Wagon => "wagon",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for VehicleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Marketplace role of an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Books services for their own vehicles.
    #[default]
    Customer,
    /// Lists services and handles incoming bookings.
    Vendor,
}

impl Role {
    /// Database/wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Vendor => "vendor",
        }
    }

    /// Lenient parse of provider metadata; anything unrecognised is a customer.
    #[must_use]
    pub fn from_metadata(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(s) if s.eq_ignore_ascii_case("vendor") => Self::Vendor,
            _ => Self::Customer,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
