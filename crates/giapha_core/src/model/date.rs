//! Partial Gregorian date validation.
//!
//! Family records rarely carry complete dates: a grandparent may only have a
//! birth year, or a death anniversary may only have day and month. Each part
//! is therefore independently optional.
//!
//! # Invariants
//! - `day` is in `1..=31`, `month` in `1..=12`, `year >= 1` when present.
//! - When both `day` and `month` are present, `day` fits the month. A missing
//!   year is checked against [`DEFAULT_REFERENCE_YEAR`], a leap year, so
//!   February 29 is accepted without a year.

/// Year used for days-in-month checks when the year part is unknown.
pub const DEFAULT_REFERENCE_YEAR: i64 = 2000;

/// Returns whether `year` is a Gregorian leap year.
pub fn is_leap_year(year: i64) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Returns the number of days in `month` (1-based) of `year`.
///
/// Returns `None` for months outside `1..=12`.
pub fn days_in_month(year: i64, month: i64) -> Option<i64> {
    let days = match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => return None,
    };
    Some(days)
}

/// Validates one partial date triple.
pub fn validate_date_parts(day: Option<i64>, month: Option<i64>, year: Option<i64>) -> bool {
    if day.is_some_and(|day| !(1..=31).contains(&day)) {
        return false;
    }
    if month.is_some_and(|month| !(1..=12).contains(&month)) {
        return false;
    }
    if year.is_some_and(|year| year < 1) {
        return false;
    }

    if let (Some(day), Some(month)) = (day, month) {
        let reference_year = year.unwrap_or(DEFAULT_REFERENCE_YEAR);
        match days_in_month(reference_year, month) {
            Some(limit) if day <= limit => {}
            _ => return false,
        }
    }
    true
}
