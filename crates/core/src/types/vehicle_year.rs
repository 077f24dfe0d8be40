//! Model-year reference data for vehicles.

use chrono::{Datelike, NaiveDate};

/// Oldest model year a vehicle record may carry.
pub const MIN_VEHICLE_YEAR: i32 = 1900;

/// Oldest year offered by the year picker.
pub const DEFAULT_PICKER_FROM: i32 = 1990;

/// Newest plausible model year as of `today` (next year's models ship early).
#[must_use]
pub fn max_vehicle_year(today: NaiveDate) -> i32 {
    today.year() + 1
}

/// Whether `year` falls in `[1900, today.year() + 1]`.
#[must_use]
pub fn is_plausible_year(year: i32, today: NaiveDate) -> bool {
    (MIN_VEHICLE_YEAR..=max_vehicle_year(today)).contains(&year)
}

/// Years from `to_year` down to `from_year`, inclusive.
///
/// Empty when `from_year > to_year`.
#[must_use]
pub fn years_descending(from_year: i32, to_year: i32) -> Vec<i32> {
    (from_year..=to_year).rev().collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn day(y: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, 6, 15).unwrap()
    }

    #[test]
    fn test_plausible_range() {
        let today = day(2026);
        assert!(is_plausible_year(1900, today));
        assert!(is_plausible_year(2027, today));
        assert!(!is_plausible_year(1899, today));
        assert!(!is_plausible_year(2028, today));
    }

    #[test]
    fn test_years_descending() {
        let years = years_descending(DEFAULT_PICKER_FROM, max_vehicle_year(day(2026)));
        assert_eq!(years.first(), Some(&2027));
        assert_eq!(years.last(), Some(&1990));
        assert_eq!(years.len(), 38);
        assert!(years.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn test_years_descending_empty() {
        assert!(years_descending(2030, 2020).is_empty());
        assert_eq!(years_descending(2020, 2020), vec![2020]);
    }
}
