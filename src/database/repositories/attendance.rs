//! Attendance repository implementation

use std::collections::HashSet;

use chrono::NaiveDate;
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};

use crate::access::{AccessScope, ScopedEntity};
use crate::database::repositories::push_limits;
use crate::models::attendance::{
    effective_reason, AbsenceReason, Attendance, AttendanceEntry, AttendanceFilter, BulkMarkEntry,
    BulkMarkOutcome, RosterEntry,
};
use crate::utils::errors::Result;

const ENTRY_SELECT: &str = r#"
    SELECT a.id, a.attendance_date, a.student_id, a.status, a.reason, a.noted_by,
           s.fio AS student_fio, s.group_id, g.name AS group_name, t.fio AS noted_by_fio
    FROM attendance a
    JOIN students s ON s.id = a.student_id
    LEFT JOIN groups g ON g.id = s.group_id
    LEFT JOIN teachers t ON t.id = a.noted_by
"#;

#[derive(Clone)]
pub struct AttendanceRepository {
    pool: PgPool,
}

impl AttendanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create or overwrite the record for (date, student)
    pub async fn upsert(
        &self,
        student_id: i64,
        date: NaiveDate,
        status: bool,
        reason: AbsenceReason,
        noted_by: Option<i64>,
    ) -> Result<Attendance> {
        upsert_with(&self.pool, student_id, date, status, reason, noted_by).await
    }

    /// Mark a whole group for one day in a single transaction.
    ///
    /// Entries for students that are not active members of the group are
    /// not written and come back in `skipped`. A student listed twice is
    /// written once, with the last entry winning.
    pub async fn bulk_mark(
        &self,
        group_id: i64,
        date: NaiveDate,
        entries: &[BulkMarkEntry],
        noted_by: Option<i64>,
    ) -> Result<BulkMarkOutcome> {
        let mut tx = self.pool.begin().await?;

        let members: HashSet<i64> = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM students WHERE group_id = $1 AND date_out IS NULL",
        )
        .bind(group_id)
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .collect();

        let (entries, skipped) = partition_entries(entries, &members);
        for entry in &entries {
            upsert_with(&mut *tx, entry.student_id, date, entry.status, entry.reason, noted_by).await?;
        }
        let outcome = BulkMarkOutcome {
            marked: entries.len(),
            skipped,
        };

        tx.commit().await?;
        Ok(outcome)
    }

    /// Find record by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Attendance>> {
        let record = sqlx::query_as::<_, Attendance>(
            "SELECT id, attendance_date, student_id, status, reason, noted_by FROM attendance WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Find record by ID with student and group names
    pub async fn find_entry(&self, id: i64) -> Result<Option<AttendanceEntry>> {
        let mut qb = QueryBuilder::<Postgres>::new(ENTRY_SELECT);
        qb.push(" WHERE a.id = ");
        qb.push_bind(id);

        let entry = qb.build_query_as::<AttendanceEntry>().fetch_optional(&self.pool).await?;
        Ok(entry)
    }

    /// Change status and reason of an existing record
    pub async fn update(&self, id: i64, status: bool, reason: AbsenceReason, noted_by: Option<i64>) -> Result<Option<Attendance>> {
        let record = sqlx::query_as::<_, Attendance>(
            r#"
            UPDATE attendance
            SET status = $2, reason = $3, noted_by = COALESCE($4, noted_by)
            WHERE id = $1
            RETURNING id, attendance_date, student_id, status, reason, noted_by
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(effective_reason(status, reason))
        .bind(noted_by)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Delete record
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM attendance WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// List records visible in `scope`, newest first
    pub async fn list(&self, scope: AccessScope, filter: &AttendanceFilter, limit: i64, offset: i64) -> Result<Vec<AttendanceEntry>> {
        let mut qb = QueryBuilder::<Postgres>::new(ENTRY_SELECT);
        push_filters(&mut qb, scope, filter);
        qb.push(" ORDER BY a.attendance_date DESC, s.fio");
        push_limits(&mut qb, limit, offset);

        let entries = qb.build_query_as::<AttendanceEntry>().fetch_all(&self.pool).await?;
        Ok(entries)
    }

    /// Count records matching the list filters
    pub async fn count(&self, scope: AccessScope, filter: &AttendanceFilter) -> Result<i64> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM attendance a JOIN students s ON s.id = a.student_id");
        push_filters(&mut qb, scope, filter);

        let count: i64 = qb.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(count)
    }

    /// Active students in `scope` with their record for `date`, if any
    pub async fn roster(&self, scope: AccessScope, date: NaiveDate, group_id: Option<i64>) -> Result<Vec<RosterEntry>> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT s.id AS student_id, s.fio AS student_fio, s.group_id, \
             a.id AS attendance_id, a.status, a.reason \
             FROM students s LEFT JOIN attendance a ON a.student_id = s.id AND a.attendance_date = ",
        );
        qb.push_bind(date);
        scope.where_clause(&mut qb, ScopedEntity::Student, "s");
        qb.push(" AND s.date_out IS NULL");
        if let Some(group_id) = group_id {
            qb.push(" AND s.group_id = ");
            qb.push_bind(group_id);
        }
        qb.push(" ORDER BY s.fio, s.id");

        let roster = qb.build_query_as::<RosterEntry>().fetch_all(&self.pool).await?;
        Ok(roster)
    }

    /// Latest records of a student
    pub async fn recent_for_student(&self, student_id: i64, limit: i64) -> Result<Vec<Attendance>> {
        let records = sqlx::query_as::<_, Attendance>(
            r#"
            SELECT id, attendance_date, student_id, status, reason, noted_by
            FROM attendance
            WHERE student_id = $1
            ORDER BY attendance_date DESC
            LIMIT $2
            "#,
        )
        .bind(student_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}

/// Upsert through any executor so bulk marking can share a transaction
async fn upsert_with<'e, E>(
    executor: E,
    student_id: i64,
    date: NaiveDate,
    status: bool,
    reason: AbsenceReason,
    noted_by: Option<i64>,
) -> Result<Attendance>
where
    E: PgExecutor<'e>,
{
    let record = sqlx::query_as::<_, Attendance>(
        r#"
        INSERT INTO attendance (attendance_date, student_id, status, reason, noted_by)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (attendance_date, student_id)
        DO UPDATE SET status = EXCLUDED.status,
                      reason = EXCLUDED.reason,
                      noted_by = EXCLUDED.noted_by
        RETURNING id, attendance_date, student_id, status, reason, noted_by
        "#,
    )
    .bind(date)
    .bind(student_id)
    .bind(status)
    .bind(effective_reason(status, reason))
    .bind(noted_by)
    .fetch_one(executor)
    .await?;

    Ok(record)
}

/// Split bulk entries into members (one per student, last entry wins,
/// in first-seen order) and the ids that are not members
fn partition_entries<'a>(entries: &'a [BulkMarkEntry], members: &HashSet<i64>) -> (Vec<&'a BulkMarkEntry>, Vec<i64>) {
    let mut marked: Vec<&BulkMarkEntry> = Vec::new();
    let mut skipped = Vec::new();
    for entry in entries {
        if !members.contains(&entry.student_id) {
            if !skipped.contains(&entry.student_id) {
                skipped.push(entry.student_id);
            }
            continue;
        }
        match marked.iter_mut().find(|m| m.student_id == entry.student_id) {
            Some(slot) => *slot = entry,
            None => marked.push(entry),
        }
    }
    (marked, skipped)
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, scope: AccessScope, filter: &AttendanceFilter) {
    scope.where_clause(qb, ScopedEntity::Attendance, "a");
    if let Some(date) = filter.date {
        qb.push(" AND a.attendance_date = ");
        qb.push_bind(date);
    }
    if let Some(from) = filter.from {
        qb.push(" AND a.attendance_date >= ");
        qb.push_bind(from);
    }
    if let Some(to) = filter.to {
        qb.push(" AND a.attendance_date <= ");
        qb.push_bind(to);
    }
    if let Some(group_id) = filter.group {
        qb.push(" AND s.group_id = ");
        qb.push_bind(group_id);
    }
    if let Some(student_id) = filter.student {
        qb.push(" AND a.student_id = ");
        qb.push_bind(student_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_teacher_scope_is_applied_before_filters() {
        let filter = AttendanceFilter {
            date: NaiveDate::from_ymd_opt(2024, 3, 1),
            group: Some(2),
            ..Default::default()
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM attendance a");
        push_filters(&mut qb, AccessScope::Teacher(4), &filter);

        let sql = qb.sql();
        assert!(sql.contains("WHERE (a.student_id IN"));
        assert!(sql.contains("sc_g.teacher_id = $1"));
        assert!(sql.contains("AND a.attendance_date = $2"));
        assert!(sql.ends_with("AND s.group_id = $3"));
    }

    #[test]
    fn test_duplicate_bulk_entries_collapse_to_the_last_one() {
        let entry = |student_id, status| BulkMarkEntry {
            student_id,
            status,
            reason: AbsenceReason::Unspecified,
        };
        let entries = vec![entry(1, true), entry(7, true), entry(2, true), entry(1, false), entry(7, false)];
        let members: HashSet<i64> = [1, 2].into_iter().collect();

        let (marked, skipped) = partition_entries(&entries, &members);
        let marked: Vec<(i64, bool)> = marked.iter().map(|e| (e.student_id, e.status)).collect();
        assert_eq!(marked, vec![(1, false), (2, true)]);
        assert_eq!(skipped, vec![7]);
    }
}
