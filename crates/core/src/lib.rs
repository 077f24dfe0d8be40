//! Washday Core - domain types for the car-wash marketplace.
//!
//! This crate provides the value types shared by every Washday component:
//! - `server` - HTTP service, orchestration and data-access gateway
//! - `cli` - Schema migrations and setup checks
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no
//! database access, no HTTP clients. Validation that can be decided from a
//! value alone (email shape, positive price, time-of-day arithmetic, year
//! range) lives here so every caller gets the same answer.
//!
//! # Modules
//!
//! - [`types`] - Typed ids, email, price, statuses, scheduling and vehicle years

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
