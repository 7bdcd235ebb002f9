//! Helper functions and utilities
//!
//! Date arithmetic and small numeric helpers shared by the services and
//! the reporting layer.

use chrono::{Datelike, NaiveDate};

/// Current local date
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Full years elapsed between `born` and `on`
pub fn age_on(born: NaiveDate, on: NaiveDate) -> i32 {
    let mut years = on.year() - born.year();
    if (on.month(), on.day()) < (born.month(), born.day()) {
        years -= 1;
    }
    years
}

/// Round to a fixed number of decimal places
pub fn round_to(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (value * factor).round() / factor
}

/// Share of `part` in `whole` as a percentage, 0 when `whole` is 0
pub fn percentage(part: i64, whole: i64, digits: i32) -> f64 {
    if whole <= 0 {
        return 0.0;
    }
    round_to(part as f64 / whole as f64 * 100.0, digits)
}

/// Calculate pagination offset; saturates instead of overflowing on
/// absurd page numbers
pub fn calculate_offset(page: i64, page_size: i64) -> i64 {
    (page.max(1) - 1).saturating_mul(page_size)
}

/// Number of pages needed for `total` items
pub fn page_count(total: i64, page_size: i64) -> i64 {
    if page_size <= 0 {
        return 0;
    }
    (total + page_size - 1) / page_size
}

/// Wrap a search term for `ILIKE` matching
pub fn like_pattern(term: &str) -> String {
    let escaped = term
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// First and last day of a calendar month
pub fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((first, next.pred_opt()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_age_on_birthday_boundary() {
        assert_eq!(age_on(d(2020, 5, 10), d(2023, 5, 9)), 2);
        assert_eq!(age_on(d(2020, 5, 10), d(2023, 5, 10)), 3);
        assert_eq!(age_on(d(2020, 2, 29), d(2024, 2, 28)), 3);
    }

    #[test]
    fn test_percentage() {
        assert_eq!(percentage(1, 3, 1), 33.3);
        assert_eq!(percentage(2, 3, 2), 66.67);
        assert_eq!(percentage(5, 0, 1), 0.0);
    }

    #[test]
    fn test_pagination() {
        assert_eq!(calculate_offset(1, 25), 0);
        assert_eq!(calculate_offset(3, 25), 50);
        assert_eq!(calculate_offset(0, 25), 0);
        assert_eq!(calculate_offset(i64::MAX, 100), i64::MAX);
        assert_eq!(page_count(51, 25), 3);
        assert_eq!(page_count(0, 25), 0);
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(" Ann "), "%Ann%");
        assert_eq!(like_pattern("50%_"), "%50\\%\\_%");
    }

    #[test]
    fn test_month_bounds() {
        assert_eq!(month_bounds(2024, 2), Some((d(2024, 2, 1), d(2024, 2, 29))));
        assert_eq!(month_bounds(2024, 12), Some((d(2024, 12, 1), d(2024, 12, 31))));
        assert_eq!(month_bounds(2024, 13), None);
    }
}
