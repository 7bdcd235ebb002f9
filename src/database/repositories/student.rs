//! Student repository implementation

use chrono::NaiveDate;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::access::{AccessScope, ScopedEntity};
use crate::database::repositories::group::reserve_place;
use crate::database::repositories::{push_limits, push_search};
use crate::models::student::{CreateStudentRequest, Student, StudentFilter, StudentStatus, StudentWithGroup};
use crate::utils::errors::Result;

const STUDENT_WITH_GROUP_SELECT: &str = r#"
    SELECT s.id, s.fio, s.birthday, s.gender, s.address, s.date_in, s.date_out, s.group_id,
           g.name AS group_name
    FROM students s
    LEFT JOIN groups g ON g.id = s.group_id
"#;

#[derive(Clone)]
pub struct StudentRepository {
    pool: PgPool,
}

impl StudentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new student, taking a place in their group if one is given
    pub async fn create(&self, request: CreateStudentRequest) -> Result<Student> {
        let mut tx = self.pool.begin().await?;

        if let Some(group_id) = request.group_id {
            if request.date_out.is_none() {
                reserve_place(&mut tx, group_id).await?;
            }
        }

        let student = sqlx::query_as::<_, Student>(
            r#"
            INSERT INTO students (fio, birthday, gender, address, date_in, date_out, group_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, fio, birthday, gender, address, date_in, date_out, group_id
            "#,
        )
        .bind(request.fio.trim())
        .bind(request.birthday)
        .bind(request.gender)
        .bind(request.address.trim())
        .bind(request.date_in)
        .bind(request.date_out)
        .bind(request.group_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(student)
    }

    /// Find student by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Student>> {
        let student = sqlx::query_as::<_, Student>(
            "SELECT id, fio, birthday, gender, address, date_in, date_out, group_id FROM students WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(student)
    }

    /// Find student by ID together with the group name
    pub async fn find_with_group(&self, id: i64) -> Result<Option<StudentWithGroup>> {
        let mut qb = QueryBuilder::<Postgres>::new(STUDENT_WITH_GROUP_SELECT);
        qb.push(" WHERE s.id = ");
        qb.push_bind(id);

        let student = qb
            .build_query_as::<StudentWithGroup>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(student)
    }

    /// Write back a fully merged student.
    ///
    /// `reserve_in` names the group that must have a free place; it is
    /// checked under a row lock in the same transaction as the update.
    pub async fn save(&self, student: &Student, reserve_in: Option<i64>) -> Result<Option<Student>> {
        let mut tx = self.pool.begin().await?;

        if let Some(group_id) = reserve_in {
            reserve_place(&mut tx, group_id).await?;
        }

        let updated = sqlx::query_as::<_, Student>(
            r#"
            UPDATE students
            SET fio = $2, birthday = $3, gender = $4, address = $5,
                date_in = $6, date_out = $7, group_id = $8
            WHERE id = $1
            RETURNING id, fio, birthday, gender, address, date_in, date_out, group_id
            "#,
        )
        .bind(student.id)
        .bind(student.fio.trim())
        .bind(student.birthday)
        .bind(student.gender)
        .bind(student.address.trim())
        .bind(student.date_in)
        .bind(student.date_out)
        .bind(student.group_id)
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Delete student together with their attendance and parent links
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM students WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// List students visible in `scope`, ordered by name
    pub async fn list(&self, scope: AccessScope, filter: &StudentFilter, limit: i64, offset: i64) -> Result<Vec<StudentWithGroup>> {
        let mut qb = QueryBuilder::<Postgres>::new(STUDENT_WITH_GROUP_SELECT);
        push_filters(&mut qb, scope, filter);
        qb.push(" ORDER BY s.fio, s.id");
        push_limits(&mut qb, limit, offset);

        let students = qb.build_query_as::<StudentWithGroup>().fetch_all(&self.pool).await?;
        Ok(students)
    }

    /// Count students matching the list filters
    pub async fn count(&self, scope: AccessScope, filter: &StudentFilter) -> Result<i64> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM students s");
        push_filters(&mut qb, scope, filter);

        let count: i64 = qb.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(count)
    }

    /// Every student visible in `scope` matching the filters, without paging
    pub async fn all_in_scope(&self, scope: AccessScope, filter: &StudentFilter) -> Result<Vec<StudentWithGroup>> {
        let mut qb = QueryBuilder::<Postgres>::new(STUDENT_WITH_GROUP_SELECT);
        push_filters(&mut qb, scope, filter);
        qb.push(" ORDER BY s.fio, s.id");

        let students = qb.build_query_as::<StudentWithGroup>().fetch_all(&self.pool).await?;
        Ok(students)
    }

    /// Birthdays of the active students visible in `scope`
    pub async fn active_birthdays(&self, scope: AccessScope) -> Result<Vec<NaiveDate>> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT s.birthday FROM students s");
        scope.where_clause(&mut qb, ScopedEntity::Student, "s");
        qb.push(" AND s.date_out IS NULL");

        let birthdays: Vec<NaiveDate> = qb.build_query_scalar().fetch_all(&self.pool).await?;
        Ok(birthdays)
    }

    /// Number of active students visible in `scope`
    pub async fn count_active(&self, scope: AccessScope) -> Result<i64> {
        let filter = StudentFilter {
            status: Some(StudentStatus::Active),
            ..Default::default()
        };
        self.count(scope, &filter).await
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, scope: AccessScope, filter: &StudentFilter) {
    scope.where_clause(qb, ScopedEntity::Student, "s");
    push_search(qb, "s.fio", filter.search.as_deref());
    if let Some(group_id) = filter.group {
        qb.push(" AND s.group_id = ");
        qb.push_bind(group_id);
    }
    match filter.status {
        Some(StudentStatus::Active) => {
            qb.push(" AND s.date_out IS NULL");
        }
        Some(StudentStatus::Graduated) => {
            qb.push(" AND s.date_out IS NOT NULL");
        }
        None => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_filter() {
        let filter = StudentFilter {
            search: Some("  ".to_string()),
            group: None,
            status: Some(StudentStatus::Graduated),
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM students s");
        push_filters(&mut qb, AccessScope::All, &filter);

        assert_eq!(qb.sql(), "SELECT COUNT(*) FROM students s WHERE TRUE AND s.date_out IS NOT NULL");
    }

    #[test]
    fn test_parent_scope_with_group_filter() {
        let filter = StudentFilter {
            search: None,
            group: Some(3),
            status: None,
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM students s");
        push_filters(&mut qb, AccessScope::Parent(1), &filter);

        let sql = qb.sql();
        assert!(sql.contains("sc_sp.parent_id = $1"));
        assert!(sql.ends_with("AND s.group_id = $2"));
    }
}
