//! Core types for Washday.
//!
//! This module provides type-safe wrappers for marketplace domain concepts.

pub mod email;
pub mod id;
pub mod price;
pub mod schedule;
pub mod status;
pub mod vehicle_year;

pub use email::{Email, EmailError};
pub use id::*;
pub use price::{Price, PriceError};
pub use schedule::{
    ScheduleError, ServiceDuration, end_time, format_time, parse_time, wraps_midnight,
};
pub use status::*;
pub use vehicle_year::{
    DEFAULT_PICKER_FROM, MIN_VEHICLE_YEAR, is_plausible_year, max_vehicle_year, years_descending,
};
