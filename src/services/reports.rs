//! Report generation service
//!
//! Builds the report kinds listed in `reports::ReportKind` from the
//! aggregation queries, checking the audience of each kind against the
//! caller's role and narrowing staff and parent reports to their scope.

use chrono::{Datelike, Duration, NaiveDate};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::access::policy;
use crate::access::Principal;
use crate::config::ReportsConfig;
use crate::database::repositories::reports::{
    ChildMonthTotals, DetailedAttendanceFilter, GroupDayStats, HomeTotals, StudentTotals, TeacherLoad,
};
use crate::database::DatabaseService;
use crate::models::{AttendanceEntry, StudentFilter, StudentWithGroup};
use crate::reports::stats::{self, attendance_rate, fill_percentage, month_name, AgeBucket};
use crate::reports::{
    render, ChartData, RenderedReport, Report, ReportBody, ReportFormat, ReportKind, ReportTable,
};
use crate::utils::errors::{KindergartenError, Result};
use crate::utils::helpers::{month_bounds, today};
use crate::utils::logging::log_report_generated;

/// Query parameters shared by all report kinds; each kind reads the ones it needs
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportParams {
    pub format: Option<ReportFormat>,
    pub month: Option<u32>,
    pub year: Option<i32>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub group_id: Option<i64>,
    pub teacher_id: Option<i64>,
}

impl ReportParams {
    fn detailed_filter(&self) -> DetailedAttendanceFilter {
        DetailedAttendanceFilter {
            start_date: self.start_date,
            end_date: self.end_date,
            group_id: self.group_id,
            teacher_id: self.teacher_id,
        }
    }
}

#[derive(Clone)]
pub struct ReportService {
    db: DatabaseService,
    config: ReportsConfig,
}

impl ReportService {
    pub fn new(db: DatabaseService, config: ReportsConfig) -> Self {
        Self { db, config }
    }

    /// Generate and render a report in the requested (or forced) format
    pub async fn export(&self, principal: &Principal, kind: ReportKind, params: &ReportParams) -> Result<RenderedReport> {
        let format = kind
            .forced_format()
            .or(params.format)
            .unwrap_or_default();

        let report = self.generate(principal, kind, params).await?;
        let rendered = render(&report, format, self.config.csv_delimiter)?;

        log_report_generated(principal.account_id, kind.as_str(), format.as_str(), report.body.len());
        Ok(rendered)
    }

    pub async fn generate(&self, principal: &Principal, kind: ReportKind, params: &ReportParams) -> Result<Report> {
        if !kind.audience().allows(principal.role) {
            return policy::deny(principal, &format!("view_{}", kind));
        }

        let on = today();
        debug!(kind = %kind, account_id = principal.account_id, "Generating report");

        let body = match kind {
            ReportKind::StudentsCsv => {
                let students = self
                    .db
                    .students
                    .all_in_scope(principal.scope(), &StudentFilter::default())
                    .await?;
                ReportBody::Table(students_table(&students, on))
            }
            ReportKind::AttendanceMonth => self.attendance_month(principal, params, on).await?,
            ReportKind::GroupAttendance => {
                let from = on - Duration::days(self.config.recent_days);
                let rows = self.db.reports.per_student(principal.scope(), from, on, true).await?;
                ReportBody::Table(group_attendance_table(&rows, self.config.recent_days))
            }
            ReportKind::MonthlyStats => {
                let (from, to) = year_bounds(on.year())?;
                let rows = self.db.reports.monthly(principal.scope(), from, to).await?;
                ReportBody::ChartData(ChartData {
                    title: format!("Monthly attendance {}", on.year()),
                    points: stats::monthly_rates(&rows),
                })
            }
            ReportKind::OverallStats => self.overall_stats(principal, on).await?,
            ReportKind::DetailedAttendance => {
                let rows = self
                    .db
                    .reports
                    .detailed(&params.detailed_filter(), self.config.detailed_attendance_limit)
                    .await?;
                ReportBody::Table(detailed_table(&rows))
            }
            ReportKind::AttendanceByMonth => {
                let rows = match principal.parent_id {
                    Some(parent_id) => {
                        let (from, to) = year_bounds(on.year())?;
                        self.db.reports.child_months(parent_id, from, to).await?
                    }
                    None => Vec::new(),
                };
                ReportBody::Table(child_months_table(&rows))
            }
            ReportKind::ChildInfo => {
                let children = match principal.parent_id {
                    Some(parent_id) => self.db.parents.children(parent_id).await?,
                    None => Vec::new(),
                };
                ReportBody::Table(child_info_table(&children, on))
            }
        };

        Ok(Report { kind, generated_on: on, body })
    }

    async fn attendance_month(&self, principal: &Principal, params: &ReportParams, on: NaiveDate) -> Result<ReportBody> {
        let month = params.month.unwrap_or_else(|| on.month());
        let year = params.year.unwrap_or_else(|| on.year());
        let (from, to) = month_bounds(year, month)
            .ok_or_else(|| KindergartenError::invalid(format!("Invalid month {}/{}", month, year)))?;

        let totals = self.db.reports.totals(principal.scope(), from, to).await?;

        let mut data = Map::new();
        data.insert("month".into(), json!(month));
        data.insert("month_name".into(), json!(month_name(month)));
        data.insert("year".into(), json!(year));
        data.insert("present".into(), json!(totals.present));
        data.insert("absent".into(), json!(totals.absent));
        data.insert("total".into(), json!(totals.total()));
        data.insert("attendance_rate".into(), json!(attendance_rate(&totals, 2)));

        Ok(ReportBody::DashboardData {
            title: format!("Attendance for {} {}", month_name(month), year),
            data,
        })
    }

    async fn overall_stats(&self, principal: &Principal, on: NaiveDate) -> Result<ReportBody> {
        let scope = principal.scope();
        let groups = self.db.reports.groups_on(scope, on).await?;
        let birthdays = self.db.students.active_birthdays(scope).await?;
        let teachers = self.db.reports.teacher_loads().await?;
        let totals = self.db.reports.home_totals(on).await?;

        Ok(ReportBody::DashboardData {
            title: "Overall statistics".to_string(),
            data: overall_summary(&groups, &stats::age_buckets(&birthdays, on), &teachers, &totals),
        })
    }
}

fn year_bounds(year: i32) -> Result<(NaiveDate, NaiveDate)> {
    let first = month_bounds(year, 1).map(|(first, _)| first);
    let last = month_bounds(year, 12).map(|(_, last)| last);
    first
        .zip(last)
        .ok_or_else(|| KindergartenError::invalid(format!("Invalid year {}", year)))
}

fn date_cell(date: Option<NaiveDate>) -> Value {
    date.map(|d| json!(d.format("%Y-%m-%d").to_string())).unwrap_or(Value::Null)
}

fn students_table(students: &[StudentWithGroup], on: NaiveDate) -> ReportTable {
    let mut table = ReportTable::new(
        "Students",
        &["ID", "FIO", "Birthday", "Age", "Gender", "Group", "Date in", "Date out", "Status"],
    );
    for row in students {
        let s = &row.student;
        table.push_row(vec![
            json!(s.id),
            json!(s.fio),
            date_cell(Some(s.birthday)),
            json!(s.age(on)),
            json!(s.gender.label()),
            json!(row.group_name),
            date_cell(Some(s.date_in)),
            date_cell(s.date_out),
            json!(s.status_label()),
        ]);
    }
    table
}

fn group_attendance_table(rows: &[StudentTotals], days: i64) -> ReportTable {
    let mut table = ReportTable::new(
        format!("Group attendance, last {} days", days),
        &["Student", "Group", "Present", "Absent", "Attendance rate"],
    );
    for row in rows {
        table.push_row(vec![
            json!(row.student_fio),
            json!(row.group_name),
            json!(row.totals.present),
            json!(row.totals.absent),
            json!(attendance_rate(&row.totals, 1)),
        ]);
    }
    table
}

fn detailed_table(rows: &[AttendanceEntry]) -> ReportTable {
    let mut table = ReportTable::new(
        "Detailed attendance",
        &["Date", "Student", "Group", "Status", "Reason", "Noted by"],
    );
    for row in rows {
        let a = &row.attendance;
        table.push_row(vec![
            date_cell(Some(a.attendance_date)),
            json!(row.student_fio),
            json!(row.group_name),
            json!(if a.status { "Present" } else { "Absent" }),
            json!(a.reason.label()),
            json!(row.noted_by_fio),
        ]);
    }
    table
}

fn child_months_table(rows: &[ChildMonthTotals]) -> ReportTable {
    let mut table = ReportTable::new(
        "Attendance by month",
        &["Child", "Month", "Present", "Absent", "Attendance rate"],
    );
    for row in rows {
        table.push_row(vec![
            json!(row.student_fio),
            json!(month_name(row.month as u32)),
            json!(row.totals.present),
            json!(row.totals.absent),
            json!(attendance_rate(&row.totals, 1)),
        ]);
    }
    table
}

fn child_info_table(children: &[StudentWithGroup], on: NaiveDate) -> ReportTable {
    let mut table = ReportTable::new(
        "Children",
        &["FIO", "Birthday", "Age", "Group", "Date in", "Status"],
    );
    for row in children {
        let s = &row.student;
        table.push_row(vec![
            json!(s.fio),
            date_cell(Some(s.birthday)),
            json!(s.age(on)),
            json!(row.group_name),
            date_cell(Some(s.date_in)),
            json!(s.status_label()),
        ]);
    }
    table
}

/// Per-group occupancy and attendance on the day, as JSON objects
pub(crate) fn group_stats_json(groups: &[GroupDayStats]) -> Vec<Value> {
    groups
        .iter()
        .map(|g| {
            json!({
                "group_id": g.group_id,
                "group_name": g.group_name,
                "teacher_fio": g.teacher_fio,
                "max_capacity": g.max_capacity,
                "current_students_count": g.current_students_count,
                "fill_percentage": fill_percentage(g.current_students_count, g.max_capacity),
                "present_today": g.totals.present,
                "absent_today": g.totals.absent,
                "attendance_rate": attendance_rate(&g.totals, 1),
            })
        })
        .collect()
}

fn overall_summary(
    groups: &[GroupDayStats],
    ages: &[AgeBucket],
    teachers: &[TeacherLoad],
    totals: &HomeTotals,
) -> Map<String, Value> {
    let mut data = Map::new();
    data.insert("group_stats".into(), Value::Array(group_stats_json(groups)));
    data.insert("age_stats".into(), json!(ages));
    data.insert("teacher_stats".into(), json!(teachers));
    data.insert("total_students".into(), json!(totals.student_count));
    data.insert("total_teachers".into(), json!(totals.teacher_count));
    data.insert("total_groups".into(), json!(totals.group_count));
    data.insert("total_parents".into(), json!(totals.parent_count));
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::repositories::reports::AttendanceTotals;
    use crate::models::{AbsenceReason, Attendance, Gender, Student};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn student(id: i64, date_out: Option<NaiveDate>) -> StudentWithGroup {
        StudentWithGroup {
            student: Student {
                id,
                fio: format!("Child {}", id),
                birthday: d(2019, 3, 10),
                gender: Gender::Female,
                address: "Main st. 1".to_string(),
                date_in: d(2022, 9, 1),
                date_out,
                group_id: Some(1),
            },
            group_name: Some("Sunflowers".to_string()),
        }
    }

    #[test]
    fn test_students_table_columns() {
        let table = students_table(&[student(1, None), student(2, Some(d(2024, 5, 31)))], d(2024, 6, 1));

        assert_eq!(table.columns.len(), 9);
        assert_eq!(table.rows[0][3], json!(5));
        assert_eq!(table.rows[0][4], json!("Female"));
        assert_eq!(table.rows[0][7], Value::Null);
        assert_eq!(table.rows[0][8], json!("Active"));
        assert_eq!(table.rows[1][7], json!("2024-05-31"));
        assert_eq!(table.rows[1][8], json!("Graduated"));
    }

    #[test]
    fn test_group_attendance_rate_has_one_decimal() {
        let rows = vec![StudentTotals {
            student_id: 1,
            student_fio: "Ann".into(),
            group_name: Some("Sun".into()),
            totals: AttendanceTotals { present: 2, absent: 1 },
        }];
        let table = group_attendance_table(&rows, 30);
        assert_eq!(table.rows[0][4], json!(66.7));
        assert_eq!(table.title, "Group attendance, last 30 days");
    }

    #[test]
    fn test_detailed_table_labels() {
        let entry = AttendanceEntry {
            attendance: Attendance {
                id: 1,
                attendance_date: d(2024, 2, 1),
                student_id: 1,
                status: false,
                reason: AbsenceReason::Illness,
                noted_by: None,
            },
            student_fio: "Ann".into(),
            group_id: None,
            group_name: None,
            noted_by_fio: None,
        };
        let table = detailed_table(&[entry]);
        assert_eq!(table.rows[0][3], json!("Absent"));
        assert_eq!(table.rows[0][4], json!(AbsenceReason::Illness.label()));
    }

    #[test]
    fn test_overall_summary_fill_percentage() {
        let groups = vec![GroupDayStats {
            group_id: 1,
            group_name: "Sun".into(),
            teacher_fio: None,
            max_capacity: 20,
            current_students_count: 15,
            totals: AttendanceTotals { present: 12, absent: 3 },
        }];
        let data = overall_summary(&groups, &[], &[], &HomeTotals::default());

        assert_eq!(data["group_stats"][0]["fill_percentage"], json!(75.0));
        assert_eq!(data["group_stats"][0]["attendance_rate"], json!(80.0));
        assert_eq!(data["total_students"], json!(0));
    }

    #[test]
    fn test_year_bounds() {
        assert_eq!(year_bounds(2024).unwrap(), (d(2024, 1, 1), d(2024, 12, 31)));
    }
}
