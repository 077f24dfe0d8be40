//! Static reference data.

use axum::Json;
use chrono::Utc;
use washday_core::{DEFAULT_PICKER_FROM, max_vehicle_year, years_descending};

/// Vehicle year picker values, newest first.
pub async fn years() -> Json<Vec<i32>> {
    let today = Utc::now().date_naive();
    Json(years_descending(DEFAULT_PICKER_FROM, max_vehicle_year(today)))
}
