//! Aggregate queries behind the dashboards and reports

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};

use crate::access::{AccessScope, ScopedEntity};
use crate::models::attendance::AttendanceEntry;
use crate::utils::errors::Result;

/// Present and absent record counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct AttendanceTotals {
    pub present: i64,
    pub absent: i64,
}

impl AttendanceTotals {
    pub fn total(&self) -> i64 {
        self.present + self.absent
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DailyTotals {
    pub day: NaiveDate,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub totals: AttendanceTotals,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MonthlyTotals {
    pub month: i32,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub totals: AttendanceTotals,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StudentTotals {
    pub student_id: i64,
    pub student_fio: String,
    pub group_name: Option<String>,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub totals: AttendanceTotals,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ChildMonthTotals {
    pub student_id: i64,
    pub student_fio: String,
    pub month: i32,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub totals: AttendanceTotals,
}

/// One group's occupancy and attendance for a single day
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GroupDayStats {
    pub group_id: i64,
    pub group_name: String,
    pub teacher_fio: Option<String>,
    pub max_capacity: i32,
    pub current_students_count: i64,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub totals: AttendanceTotals,
}

/// Groups and active students per teacher
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TeacherLoad {
    pub teacher_id: i64,
    pub teacher_fio: String,
    pub group_count: i64,
    pub student_count: i64,
}

/// Kindergarten-wide counters
#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow)]
pub struct HomeTotals {
    pub student_count: i64,
    pub teacher_count: i64,
    pub group_count: i64,
    pub parent_count: i64,
    pub upcoming_events: i64,
}

/// Filters for the detailed attendance report
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DetailedAttendanceFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub group_id: Option<i64>,
    pub teacher_id: Option<i64>,
}

const PRESENT_ABSENT: &str =
    "COUNT(a.id) FILTER (WHERE a.status) AS present, COUNT(a.id) FILTER (WHERE NOT a.status) AS absent";

#[derive(Clone)]
pub struct ReportRepository {
    pool: PgPool,
}

impl ReportRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Present/absent counts over `from..=to` for records in `scope`
    pub async fn totals(&self, scope: AccessScope, from: NaiveDate, to: NaiveDate) -> Result<AttendanceTotals> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {PRESENT_ABSENT} FROM attendance a"));
        push_range(&mut qb, scope, from, to);

        let totals = qb.build_query_as::<AttendanceTotals>().fetch_one(&self.pool).await?;
        Ok(totals)
    }

    /// Per-day counts over `from..=to`; days without records are absent
    pub async fn daily(&self, scope: AccessScope, from: NaiveDate, to: NaiveDate) -> Result<Vec<DailyTotals>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT a.attendance_date AS day, {PRESENT_ABSENT} FROM attendance a"
        ));
        push_range(&mut qb, scope, from, to);
        qb.push(" GROUP BY a.attendance_date ORDER BY a.attendance_date");

        let rows = qb.build_query_as::<DailyTotals>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    /// Per-month counts over `from..=to`, only months with records
    pub async fn monthly(&self, scope: AccessScope, from: NaiveDate, to: NaiveDate) -> Result<Vec<MonthlyTotals>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT EXTRACT(MONTH FROM a.attendance_date)::INT AS month, {PRESENT_ABSENT} FROM attendance a"
        ));
        push_range(&mut qb, scope, from, to);
        qb.push(" GROUP BY 1 ORDER BY 1");

        let rows = qb.build_query_as::<MonthlyTotals>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    /// Per-student counts over `from..=to` for active students in `scope`.
    ///
    /// With `grouped_only`, students without a group are left out.
    pub async fn per_student(
        &self,
        scope: AccessScope,
        from: NaiveDate,
        to: NaiveDate,
        grouped_only: bool,
    ) -> Result<Vec<StudentTotals>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT s.id AS student_id, s.fio AS student_fio, g.name AS group_name, {PRESENT_ABSENT} \
             FROM students s \
             LEFT JOIN groups g ON g.id = s.group_id \
             LEFT JOIN attendance a ON a.student_id = s.id AND a.attendance_date BETWEEN "
        ));
        qb.push_bind(from);
        qb.push(" AND ");
        qb.push_bind(to);
        scope.where_clause(&mut qb, ScopedEntity::Student, "s");
        qb.push(" AND s.date_out IS NULL");
        if grouped_only {
            qb.push(" AND s.group_id IS NOT NULL");
        }
        qb.push(" GROUP BY s.id, s.fio, g.name ORDER BY g.name NULLS LAST, s.fio");

        let rows = qb.build_query_as::<StudentTotals>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    /// Per-child, per-month counts for one parent's children
    pub async fn child_months(&self, parent_id: i64, from: NaiveDate, to: NaiveDate) -> Result<Vec<ChildMonthTotals>> {
        let rows = sqlx::query_as::<_, ChildMonthTotals>(
            r#"
            SELECT s.id AS student_id, s.fio AS student_fio,
                   EXTRACT(MONTH FROM a.attendance_date)::INT AS month,
                   COUNT(a.id) FILTER (WHERE a.status) AS present,
                   COUNT(a.id) FILTER (WHERE NOT a.status) AS absent
            FROM attendance a
            JOIN students s ON s.id = a.student_id
            JOIN student_parents sp ON sp.student_id = s.id
            WHERE sp.parent_id = $1 AND a.attendance_date BETWEEN $2 AND $3
            GROUP BY s.id, s.fio, 3
            ORDER BY s.fio, 3
            "#,
        )
        .bind(parent_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Occupancy and attendance on `day` for each group in `scope`
    pub async fn groups_on(&self, scope: AccessScope, day: NaiveDate) -> Result<Vec<GroupDayStats>> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT g.id AS group_id, g.name AS group_name, t.fio AS teacher_fio, g.max_capacity, \
             (SELECT COUNT(*) FROM students s WHERE s.group_id = g.id AND s.date_out IS NULL) AS current_students_count, \
             COALESCE(dt.present, 0) AS present, COALESCE(dt.absent, 0) AS absent \
             FROM groups g \
             LEFT JOIN teachers t ON t.id = g.teacher_id \
             LEFT JOIN (SELECT s.group_id, \
                        COUNT(*) FILTER (WHERE a.status) AS present, \
                        COUNT(*) FILTER (WHERE NOT a.status) AS absent \
                        FROM attendance a JOIN students s ON s.id = a.student_id \
                        WHERE a.attendance_date = ",
        );
        qb.push_bind(day);
        qb.push(" GROUP BY s.group_id) dt ON dt.group_id = g.id");
        scope.where_clause(&mut qb, ScopedEntity::Group, "g");
        qb.push(" ORDER BY g.name");

        let rows = qb.build_query_as::<GroupDayStats>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    /// Groups and active students per teacher
    pub async fn teacher_loads(&self) -> Result<Vec<TeacherLoad>> {
        let rows = sqlx::query_as::<_, TeacherLoad>(
            r#"
            SELECT t.id AS teacher_id, t.fio AS teacher_fio,
                   COUNT(DISTINCT g.id) AS group_count,
                   COUNT(s.id) AS student_count
            FROM teachers t
            LEFT JOIN groups g ON g.teacher_id = t.id
            LEFT JOIN students s ON s.group_id = g.id AND s.date_out IS NULL
            GROUP BY t.id, t.fio
            ORDER BY t.fio
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Attendance records, newest first, narrowed by the detailed-report filters
    pub async fn detailed(&self, filter: &DetailedAttendanceFilter, limit: i64) -> Result<Vec<AttendanceEntry>> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT a.id, a.attendance_date, a.student_id, a.status, a.reason, a.noted_by, \
             s.fio AS student_fio, s.group_id, g.name AS group_name, t.fio AS noted_by_fio \
             FROM attendance a \
             JOIN students s ON s.id = a.student_id \
             LEFT JOIN groups g ON g.id = s.group_id \
             LEFT JOIN teachers t ON t.id = a.noted_by \
             WHERE TRUE",
        );
        if let Some(start) = filter.start_date {
            qb.push(" AND a.attendance_date >= ");
            qb.push_bind(start);
        }
        if let Some(end) = filter.end_date {
            qb.push(" AND a.attendance_date <= ");
            qb.push_bind(end);
        }
        if let Some(group_id) = filter.group_id {
            qb.push(" AND s.group_id = ");
            qb.push_bind(group_id);
        }
        if let Some(teacher_id) = filter.teacher_id {
            qb.push(" AND g.teacher_id = ");
            qb.push_bind(teacher_id);
        }
        qb.push(" ORDER BY a.attendance_date DESC, s.fio LIMIT ");
        qb.push_bind(limit);

        let rows = qb.build_query_as::<AttendanceEntry>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    /// Kindergarten-wide counters as of `today`
    pub async fn home_totals(&self, today: NaiveDate) -> Result<HomeTotals> {
        let totals = sqlx::query_as::<_, HomeTotals>(
            r#"
            SELECT (SELECT COUNT(*) FROM students WHERE date_out IS NULL) AS student_count,
                   (SELECT COUNT(*) FROM teachers) AS teacher_count,
                   (SELECT COUNT(*) FROM groups) AS group_count,
                   (SELECT COUNT(*) FROM parents) AS parent_count,
                   (SELECT COUNT(*) FROM events WHERE event_date >= $1) AS upcoming_events
            "#,
        )
        .bind(today)
        .fetch_one(&self.pool)
        .await?;

        Ok(totals)
    }
}

fn push_range(qb: &mut QueryBuilder<'_, Postgres>, scope: AccessScope, from: NaiveDate, to: NaiveDate) {
    scope.where_clause(qb, ScopedEntity::Attendance, "a");
    qb.push(" AND a.attendance_date BETWEEN ");
    qb.push_bind(from);
    qb.push(" AND ");
    qb.push_bind(to);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_after_scope() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM attendance a");
        push_range(&mut qb, AccessScope::Parent(3), d, d);

        let sql = qb.sql();
        assert!(sql.contains("sc_sp.parent_id = $1"));
        assert!(sql.ends_with("a.attendance_date BETWEEN $2 AND $3"));
    }

    #[test]
    fn test_totals_sum() {
        let totals = AttendanceTotals { present: 7, absent: 3 };
        assert_eq!(totals.total(), 10);
    }
}
