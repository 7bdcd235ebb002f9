//! Report definitions and rendering
//!
//! A report is produced by `services::reports` as one of three bodies:
//! a table, a chart dataset, or a summary object. The `export` module
//! turns it into JSON, CSV or HTML.

pub mod export;
pub mod stats;

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::access::ReportAudience;
use crate::utils::errors::{KindergartenError, Result};

pub use export::{csv_filename, render, RenderedReport};
pub use stats::{AgeBucket, DayPoint, MonthRate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    StudentsCsv,
    AttendanceMonth,
    GroupAttendance,
    MonthlyStats,
    OverallStats,
    DetailedAttendance,
    AttendanceByMonth,
    ChildInfo,
}

impl ReportKind {
    pub const ALL: [ReportKind; 8] = [
        ReportKind::StudentsCsv,
        ReportKind::AttendanceMonth,
        ReportKind::GroupAttendance,
        ReportKind::MonthlyStats,
        ReportKind::OverallStats,
        ReportKind::DetailedAttendance,
        ReportKind::AttendanceByMonth,
        ReportKind::ChildInfo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::StudentsCsv => "students_csv",
            ReportKind::AttendanceMonth => "attendance_month",
            ReportKind::GroupAttendance => "group_attendance",
            ReportKind::MonthlyStats => "monthly_stats",
            ReportKind::OverallStats => "overall_stats",
            ReportKind::DetailedAttendance => "detailed_attendance",
            ReportKind::AttendanceByMonth => "attendance_by_month",
            ReportKind::ChildInfo => "child_info",
        }
    }

    pub fn audience(&self) -> ReportAudience {
        match self {
            ReportKind::StudentsCsv
            | ReportKind::AttendanceMonth
            | ReportKind::GroupAttendance
            | ReportKind::MonthlyStats => ReportAudience::Staff,
            ReportKind::OverallStats | ReportKind::DetailedAttendance => ReportAudience::Admin,
            ReportKind::AttendanceByMonth | ReportKind::ChildInfo => ReportAudience::Parent,
        }
    }

    /// Format used regardless of what the caller asked for
    pub fn forced_format(&self) -> Option<ReportFormat> {
        match self {
            ReportKind::StudentsCsv => Some(ReportFormat::Csv),
            _ => None,
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportKind {
    type Err = KindergartenError;

    fn from_str(s: &str) -> Result<Self> {
        ReportKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| KindergartenError::invalid(format!("Unknown report type '{}'", s)))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Json,
    Csv,
    Html,
}

impl ReportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportFormat::Json => "json",
            ReportFormat::Csv => "csv",
            ReportFormat::Html => "html",
        }
    }
}

/// Rows of loosely typed cells under a header
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportTable {
    pub title: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl ReportTable {
    pub fn new(title: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            title: title.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<Value>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub title: String,
    pub points: Vec<MonthRate>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReportBody {
    Table(ReportTable),
    ChartData(ChartData),
    /// Free-form summary, always a JSON object
    DashboardData { title: String, data: Map<String, Value> },
}

impl ReportBody {
    /// Number of rows or entries, for logging
    pub fn len(&self) -> usize {
        match self {
            ReportBody::Table(table) => table.rows.len(),
            ReportBody::ChartData(chart) => chart.points.len(),
            ReportBody::DashboardData { data, .. } => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn title(&self) -> &str {
        match self {
            ReportBody::Table(table) => &table.title,
            ReportBody::ChartData(chart) => &chart.title,
            ReportBody::DashboardData { title, .. } => title,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub kind: ReportKind,
    pub generated_on: NaiveDate,
    #[serde(flatten)]
    pub body: ReportBody,
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn test_kind_parsing() {
        for kind in ReportKind::ALL {
            assert_eq!(kind.as_str().parse::<ReportKind>().unwrap(), kind);
        }
        assert_matches!(
            "financial".parse::<ReportKind>(),
            Err(KindergartenError::InvalidInput(_))
        );
    }

    #[test]
    fn test_audiences() {
        assert_eq!(ReportKind::StudentsCsv.audience(), ReportAudience::Staff);
        assert_eq!(ReportKind::OverallStats.audience(), ReportAudience::Admin);
        assert_eq!(ReportKind::ChildInfo.audience(), ReportAudience::Parent);
        assert_eq!(ReportKind::StudentsCsv.forced_format(), Some(ReportFormat::Csv));
        assert_eq!(ReportKind::MonthlyStats.forced_format(), None);
    }

    #[test]
    fn test_report_serializes_with_type_tag() {
        let mut table = ReportTable::new("Children", &["FIO"]);
        table.push_row(vec![json!("Ann")]);
        let report = Report {
            kind: ReportKind::ChildInfo,
            generated_on: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            body: ReportBody::Table(table),
        };

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["kind"], "child_info");
        assert_eq!(value["type"], "table");
        assert_eq!(value["rows"][0][0], "Ann");
        assert_eq!(value["generated_on"], "2024-05-01");
    }
}
