//! Attendance and occupancy arithmetic shared by reports and dashboards

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::database::repositories::reports::{AttendanceTotals, DailyTotals, MonthlyTotals};
use crate::utils::helpers::{age_on, percentage};

/// Age ranges used by the age distribution charts
pub const AGE_BUCKETS: [&str; 5] = ["2-3", "3-4", "4-5", "5-6", "6-7"];

const MONTH_NAMES: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];

/// `present / (present + absent) * 100`, 0 when nothing was recorded
pub fn attendance_rate(totals: &AttendanceTotals, digits: i32) -> f64 {
    percentage(totals.present, totals.total(), digits)
}

/// `current / capacity * 100` to one decimal, 0 for a zero capacity
pub fn fill_percentage(current: i64, capacity: i32) -> f64 {
    percentage(current, i64::from(capacity), 1)
}

pub fn month_name(month: u32) -> &'static str {
    month
        .checked_sub(1)
        .and_then(|i| MONTH_NAMES.get(i as usize))
        .copied()
        .unwrap_or("Unknown")
}

/// One day of an attendance chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayPoint {
    pub date: NaiveDate,
    /// `dd.mm`
    pub label: String,
    pub present: i64,
    pub absent: i64,
    pub rate: f64,
}

/// The `days` days ending with `end`, oldest first; days without records
/// are filled with zeros
pub fn daily_series(rows: &[DailyTotals], end: NaiveDate, days: i64) -> Vec<DayPoint> {
    let by_day: HashMap<NaiveDate, AttendanceTotals> = rows.iter().map(|r| (r.day, r.totals)).collect();

    (0..days.max(0))
        .rev()
        .map(|back| {
            let date = end - Duration::days(back);
            let totals = by_day.get(&date).copied().unwrap_or_default();
            DayPoint {
                date,
                label: date.format("%d.%m").to_string(),
                present: totals.present,
                absent: totals.absent,
                rate: attendance_rate(&totals, 1),
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgeBucket {
    pub label: &'static str,
    pub count: i64,
}

/// Count children per age range as of `today`.
///
/// Ages below 3 fall in the first bucket and 6 or above in the last.
pub fn age_buckets(birthdays: &[NaiveDate], today: NaiveDate) -> Vec<AgeBucket> {
    let mut counts = [0i64; AGE_BUCKETS.len()];
    for birthday in birthdays {
        let index = (age_on(*birthday, today) - 2).clamp(0, AGE_BUCKETS.len() as i32 - 1);
        counts[index as usize] += 1;
    }

    AGE_BUCKETS
        .iter()
        .zip(counts)
        .map(|(label, count)| AgeBucket { label, count })
        .collect()
}

/// One month of the monthly statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthRate {
    pub month: i32,
    pub label: &'static str,
    pub present: i64,
    pub absent: i64,
    pub attendance_rate: f64,
}

/// Monthly rates, leaving out months without records
pub fn monthly_rates(rows: &[MonthlyTotals]) -> Vec<MonthRate> {
    rows.iter()
        .filter(|r| r.totals.total() > 0)
        .map(|r| MonthRate {
            month: r.month,
            label: month_name(r.month as u32),
            present: r.totals.present,
            absent: r.totals.absent,
            attendance_rate: attendance_rate(&r.totals, 1),
        })
        .collect()
}
