//! Teacher repository implementation

use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::access::{AccessScope, ScopedEntity};
use crate::database::repositories::{push_limits, push_search};
use crate::models::teacher::{CreateTeacherRequest, Teacher, TeacherFilter, UpdateTeacherRequest};
use crate::utils::errors::Result;

const TEACHER_COLUMNS: &str = "t.id, t.fio, t.position, t.phone, t.account_id";

#[derive(Clone)]
pub struct TeacherRepository {
    pool: PgPool,
}

impl TeacherRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new teacher
    pub async fn create(&self, request: CreateTeacherRequest) -> Result<Teacher> {
        let teacher = sqlx::query_as::<_, Teacher>(
            r#"
            INSERT INTO teachers (fio, position, phone, account_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, fio, position, phone, account_id
            "#,
        )
        .bind(request.fio)
        .bind(request.position)
        .bind(request.phone)
        .bind(request.account_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(teacher)
    }

    /// Find teacher by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Teacher>> {
        let teacher = sqlx::query_as::<_, Teacher>(
            "SELECT id, fio, position, phone, account_id FROM teachers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(teacher)
    }

    /// Find the teacher profile linked to an account
    pub async fn find_by_account(&self, account_id: i64) -> Result<Option<Teacher>> {
        let teacher = sqlx::query_as::<_, Teacher>(
            "SELECT id, fio, position, phone, account_id FROM teachers WHERE account_id = $1",
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(teacher)
    }

    /// Update teacher
    pub async fn update(&self, id: i64, request: UpdateTeacherRequest) -> Result<Option<Teacher>> {
        let teacher = sqlx::query_as::<_, Teacher>(
            r#"
            UPDATE teachers
            SET fio = COALESCE($2, fio),
                position = COALESCE($3, position),
                phone = COALESCE($4, phone),
                account_id = CASE WHEN $5 THEN $6 ELSE account_id END
            WHERE id = $1
            RETURNING id, fio, position, phone, account_id
            "#,
        )
        .bind(id)
        .bind(request.fio)
        .bind(request.position)
        .bind(request.phone)
        .bind(request.account_id.is_some())
        .bind(request.account_id.flatten())
        .fetch_optional(&self.pool)
        .await?;

        Ok(teacher)
    }

    /// Delete teacher; their groups are left without a teacher
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM teachers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// List teachers visible in `scope`, ordered by name
    pub async fn list(&self, scope: AccessScope, filter: &TeacherFilter, limit: i64, offset: i64) -> Result<Vec<Teacher>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {TEACHER_COLUMNS} FROM teachers t"));
        push_filters(&mut qb, scope, filter);
        qb.push(" ORDER BY t.fio, t.id");
        push_limits(&mut qb, limit, offset);

        let teachers = qb.build_query_as::<Teacher>().fetch_all(&self.pool).await?;
        Ok(teachers)
    }

    /// Count teachers matching the list filters
    pub async fn count(&self, scope: AccessScope, filter: &TeacherFilter) -> Result<i64> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM teachers t");
        push_filters(&mut qb, scope, filter);

        let count: i64 = qb.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(count)
    }

    /// Total number of teachers
    pub async fn count_all(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM teachers")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, scope: AccessScope, filter: &TeacherFilter) {
    scope.where_clause(qb, ScopedEntity::Teacher, "t");
    push_search(qb, "t.fio", filter.search.as_deref());
    if let Some(position) = filter.position {
        qb.push(" AND t.position = ");
        qb.push_bind(position);
    }
    if let Some(group_id) = filter.group {
        qb.push(" AND t.id IN (SELECT teacher_id FROM groups WHERE id = ");
        qb.push_bind(group_id);
        qb.push(")");
    }
}
