//! Attendance model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AbsenceReason {
    #[default]
    Unspecified,
    Illness,
    Vacation,
    Family,
    Other,
}

impl AbsenceReason {
    pub fn label(&self) -> &'static str {
        match self {
            AbsenceReason::Unspecified => "Not specified",
            AbsenceReason::Illness => "Illness",
            AbsenceReason::Vacation => "Vacation",
            AbsenceReason::Family => "Family circumstances",
            AbsenceReason::Other => "Other",
        }
    }
}

/// One record per student per day
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Attendance {
    pub id: i64,
    pub attendance_date: NaiveDate,
    pub student_id: i64,
    /// `true` when the student was present
    pub status: bool,
    pub reason: AbsenceReason,
    pub noted_by: Option<i64>,
}

/// Attendance row joined with the student and group names
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AttendanceEntry {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub attendance: Attendance,
    pub student_fio: String,
    pub group_id: Option<i64>,
    pub group_name: Option<String>,
    pub noted_by_fio: Option<String>,
}

/// A student on the daily roster with their record for that day, if any
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RosterEntry {
    pub student_id: i64,
    pub student_fio: String,
    pub group_id: Option<i64>,
    pub attendance_id: Option<i64>,
    pub status: Option<bool>,
    pub reason: Option<AbsenceReason>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkAttendanceRequest {
    pub student_id: i64,
    pub attendance_date: NaiveDate,
    pub status: bool,
    #[serde(default)]
    pub reason: AbsenceReason,
}

impl MarkAttendanceRequest {
    /// Reason stored for the record; present students never carry one
    pub fn effective_reason(&self) -> AbsenceReason {
        effective_reason(self.status, self.reason)
    }
}

pub fn effective_reason(status: bool, reason: AbsenceReason) -> AbsenceReason {
    if status {
        AbsenceReason::Unspecified
    } else {
        reason
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkMarkEntry {
    pub student_id: i64,
    pub status: bool,
    #[serde(default)]
    pub reason: AbsenceReason,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkMarkRequest {
    pub group_id: i64,
    pub attendance_date: NaiveDate,
    pub entries: Vec<BulkMarkEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BulkMarkOutcome {
    pub marked: usize,
    pub skipped: Vec<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAttendanceRequest {
    pub status: Option<bool>,
    pub reason: Option<AbsenceReason>,
}

/// Filters accepted by the attendance list
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttendanceFilter {
    pub date: Option<NaiveDate>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub group: Option<i64>,
    pub student: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_present_clears_reason() {
        assert_eq!(effective_reason(true, AbsenceReason::Illness), AbsenceReason::Unspecified);
        assert_eq!(effective_reason(false, AbsenceReason::Illness), AbsenceReason::Illness);
    }

    #[test]
    fn test_reason_defaults_when_missing() {
        let req: MarkAttendanceRequest = serde_json::from_str(
            r#"{"student_id": 4, "attendance_date": "2024-03-01", "status": false}"#,
        )
        .unwrap();
        assert_eq!(req.reason, AbsenceReason::Unspecified);
    }
}
