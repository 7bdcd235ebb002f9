//! Parent repository implementation, including student-parent links

use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::access::{AccessScope, ScopedEntity};
use crate::database::repositories::{push_limits, push_search};
use crate::models::parent::{
    CreateParentRequest, LinkStudentParentRequest, Parent, ParentFilter, StudentParent,
    StudentParentLink, UpdateParentRequest,
};
use crate::models::student::StudentWithGroup;
use crate::utils::errors::Result;

const LINK_SELECT: &str = r#"
    SELECT sp.id, sp.student_id, sp.parent_id, sp.relationship, sp.is_primary,
           s.fio AS student_fio, p.fio AS parent_fio, p.phone AS parent_phone
    FROM student_parents sp
    JOIN students s ON s.id = sp.student_id
    JOIN parents p ON p.id = sp.parent_id
"#;

#[derive(Clone)]
pub struct ParentRepository {
    pool: PgPool,
}

impl ParentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new parent
    pub async fn create(&self, request: CreateParentRequest) -> Result<Parent> {
        let parent = sqlx::query_as::<_, Parent>(
            r#"
            INSERT INTO parents (fio, phone, account_id)
            VALUES ($1, $2, $3)
            RETURNING id, fio, phone, account_id
            "#,
        )
        .bind(request.fio.trim())
        .bind(request.phone.trim())
        .bind(request.account_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(parent)
    }

    /// Find parent by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Parent>> {
        let parent = sqlx::query_as::<_, Parent>("SELECT id, fio, phone, account_id FROM parents WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(parent)
    }

    /// Find the parent profile linked to an account
    pub async fn find_by_account(&self, account_id: i64) -> Result<Option<Parent>> {
        let parent = sqlx::query_as::<_, Parent>(
            "SELECT id, fio, phone, account_id FROM parents WHERE account_id = $1",
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(parent)
    }

    /// Update parent
    pub async fn update(&self, id: i64, request: UpdateParentRequest) -> Result<Option<Parent>> {
        let parent = sqlx::query_as::<_, Parent>(
            r#"
            UPDATE parents
            SET fio = COALESCE($2, fio),
                phone = COALESCE($3, phone),
                account_id = CASE WHEN $4 THEN $5 ELSE account_id END
            WHERE id = $1
            RETURNING id, fio, phone, account_id
            "#,
        )
        .bind(id)
        .bind(request.fio)
        .bind(request.phone)
        .bind(request.account_id.is_some())
        .bind(request.account_id.flatten())
        .fetch_optional(&self.pool)
        .await?;

        Ok(parent)
    }

    /// Delete parent together with their links
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM parents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// List parents visible in `scope`, ordered by name
    pub async fn list(&self, scope: AccessScope, filter: &ParentFilter, limit: i64, offset: i64) -> Result<Vec<Parent>> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT p.id, p.fio, p.phone, p.account_id FROM parents p");
        push_filters(&mut qb, scope, filter);
        qb.push(" ORDER BY p.fio, p.id");
        push_limits(&mut qb, limit, offset);

        let parents = qb.build_query_as::<Parent>().fetch_all(&self.pool).await?;
        Ok(parents)
    }

    /// Count parents matching the list filters
    pub async fn count(&self, scope: AccessScope, filter: &ParentFilter) -> Result<i64> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM parents p");
        push_filters(&mut qb, scope, filter);

        let count: i64 = qb.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(count)
    }

    /// Total number of parents
    pub async fn count_all(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM parents")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Link a student to a parent
    pub async fn add_link(&self, request: LinkStudentParentRequest) -> Result<StudentParent> {
        let link = sqlx::query_as::<_, StudentParent>(
            r#"
            INSERT INTO student_parents (student_id, parent_id, relationship, is_primary)
            VALUES ($1, $2, $3, $4)
            RETURNING id, student_id, parent_id, relationship, is_primary
            "#,
        )
        .bind(request.student_id)
        .bind(request.parent_id)
        .bind(request.relationship)
        .bind(request.is_primary)
        .fetch_one(&self.pool)
        .await?;

        Ok(link)
    }

    /// Find a link by ID
    pub async fn find_link(&self, id: i64) -> Result<Option<StudentParent>> {
        let link = sqlx::query_as::<_, StudentParent>(
            "SELECT id, student_id, parent_id, relationship, is_primary FROM student_parents WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(link)
    }

    /// Remove a link
    pub async fn remove_link(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM student_parents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Parents of a student, as far as `scope` may see the links
    pub async fn links_for_student(&self, scope: AccessScope, student_id: i64) -> Result<Vec<StudentParentLink>> {
        let mut qb = link_query(scope, "sp.student_id", student_id);
        qb.push(" ORDER BY sp.is_primary DESC, p.fio");

        let links = qb.build_query_as::<StudentParentLink>().fetch_all(&self.pool).await?;
        Ok(links)
    }

    /// Children of a parent, as far as `scope` may see the links
    pub async fn links_for_parent(&self, scope: AccessScope, parent_id: i64) -> Result<Vec<StudentParentLink>> {
        let mut qb = link_query(scope, "sp.parent_id", parent_id);
        qb.push(" ORDER BY s.fio");

        let links = qb.build_query_as::<StudentParentLink>().fetch_all(&self.pool).await?;
        Ok(links)
    }

    /// Students linked to a parent, with their group names
    pub async fn children(&self, parent_id: i64) -> Result<Vec<StudentWithGroup>> {
        let children = sqlx::query_as::<_, StudentWithGroup>(
            r#"
            SELECT s.id, s.fio, s.birthday, s.gender, s.address, s.date_in, s.date_out, s.group_id,
                   g.name AS group_name
            FROM students s
            JOIN student_parents sp ON sp.student_id = s.id
            LEFT JOIN groups g ON g.id = s.group_id
            WHERE sp.parent_id = $1
            ORDER BY s.fio, s.id
            "#,
        )
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(children)
    }
}

fn link_query(scope: AccessScope, column: &str, id: i64) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::<Postgres>::new(LINK_SELECT);
    scope.where_clause(&mut qb, ScopedEntity::StudentParent, "sp");
    qb.push(format!(" AND {column} = "));
    qb.push_bind(id);
    qb
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, scope: AccessScope, filter: &ParentFilter) {
    scope.where_clause(qb, ScopedEntity::Parent, "p");
    push_search(qb, "p.fio", filter.search.as_deref());
    if let Some(group_id) = filter.group {
        qb.push(
            " AND p.id IN (SELECT f_sp.parent_id FROM student_parents f_sp \
             JOIN students f_s ON f_s.id = f_sp.student_id WHERE f_s.group_id = ",
        );
        qb.push_bind(group_id);
        qb.push(")");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_links_are_scoped_before_the_owner_filter() {
        let qb = link_query(AccessScope::Teacher(3), "sp.parent_id", 9);
        let sql = qb.sql();
        assert!(sql.contains("WHERE (sp.student_id IN (SELECT sc_s.id FROM students sc_s"));
        assert!(sql.contains("sc_g.teacher_id = $1"));
        assert!(sql.ends_with("AND sp.parent_id = $2"));

        let qb = link_query(AccessScope::Parent(4), "sp.student_id", 9);
        assert!(qb.sql().contains("WHERE (sp.parent_id = $1) AND sp.student_id = $2"));

        let qb = link_query(AccessScope::All, "sp.student_id", 9);
        assert!(qb.sql().ends_with("WHERE TRUE AND sp.student_id = $1"));
    }
}
