//! Group repository implementation

use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use crate::access::{AccessScope, ScopedEntity};
use crate::database::repositories::{push_limits, push_search};
use crate::models::group::{CreateGroupRequest, Group, GroupFilter, GroupOccupancy, UpdateGroupRequest};
use crate::utils::errors::{KindergartenError, Result};

const DEFAULT_CAPACITY: i32 = 20;

/// Group columns plus the teacher's name and the number of active students
const OCCUPANCY_SELECT: &str = r#"
    SELECT g.id, g.name, g.category, g.year, g.teacher_id, g.room, g.max_capacity,
           t.fio AS teacher_fio,
           (SELECT COUNT(*) FROM students s WHERE s.group_id = g.id AND s.date_out IS NULL) AS current_students_count
    FROM groups g
    LEFT JOIN teachers t ON t.id = g.teacher_id
"#;

#[derive(Clone)]
pub struct GroupRepository {
    pool: PgPool,
}

impl GroupRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new group
    pub async fn create(&self, request: CreateGroupRequest) -> Result<Group> {
        let group = sqlx::query_as::<_, Group>(
            r#"
            INSERT INTO groups (name, category, year, teacher_id, room, max_capacity)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, name, category, year, teacher_id, room, max_capacity
            "#,
        )
        .bind(request.name.trim())
        .bind(request.category)
        .bind(request.year)
        .bind(request.teacher_id)
        .bind(request.room.unwrap_or_default())
        .bind(request.max_capacity.unwrap_or(DEFAULT_CAPACITY))
        .fetch_one(&self.pool)
        .await?;

        Ok(group)
    }

    /// Find group by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Group>> {
        let group = sqlx::query_as::<_, Group>(
            "SELECT id, name, category, year, teacher_id, room, max_capacity FROM groups WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(group)
    }

    /// Find group by ID together with its occupancy
    pub async fn find_with_occupancy(&self, id: i64) -> Result<Option<GroupOccupancy>> {
        let mut qb = QueryBuilder::<Postgres>::new(OCCUPANCY_SELECT);
        qb.push(" WHERE g.id = ");
        qb.push_bind(id);

        let group = qb
            .build_query_as::<GroupOccupancy>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(group)
    }

    /// Update group.
    ///
    /// The row is locked first so a lowered capacity is checked against
    /// the same active count that concurrent enrolments see.
    pub async fn update(&self, id: i64, request: UpdateGroupRequest) -> Result<Option<Group>> {
        let mut tx = self.pool.begin().await?;

        let Some((name, _)) = lock_group(&mut tx, id).await? else {
            return Ok(None);
        };
        if let Some(capacity) = request.max_capacity {
            let current = count_active(&mut tx, id).await?;
            if i64::from(capacity) < current {
                return Err(KindergartenError::invalid(format!(
                    "Capacity {} of group '{}' is below the current number of students ({})",
                    capacity, name, current
                )));
            }
        }

        let group = sqlx::query_as::<_, Group>(
            r#"
            UPDATE groups
            SET name = COALESCE($2, name),
                category = COALESCE($3, category),
                year = COALESCE($4, year),
                teacher_id = CASE WHEN $5 THEN $6 ELSE teacher_id END,
                room = COALESCE($7, room),
                max_capacity = COALESCE($8, max_capacity)
            WHERE id = $1
            RETURNING id, name, category, year, teacher_id, room, max_capacity
            "#,
        )
        .bind(id)
        .bind(request.name.map(|n| n.trim().to_string()))
        .bind(request.category)
        .bind(request.year)
        .bind(request.teacher_id.is_some())
        .bind(request.teacher_id.flatten())
        .bind(request.room)
        .bind(request.max_capacity)
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(group)
    }

    /// Delete a group that has no active students.
    ///
    /// Graduated students keep their records and lose the group link.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        if lock_group(&mut tx, id).await?.is_none() {
            return Ok(false);
        }
        let active = count_active(&mut tx, id).await?;
        if active > 0 {
            return Err(KindergartenError::Conflict(format!(
                "Group still has {} student(s); move them first",
                active
            )));
        }

        let result = sqlx::query("DELETE FROM groups WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    /// List groups visible in `scope`, ordered by name
    pub async fn list(&self, scope: AccessScope, filter: &GroupFilter, limit: i64, offset: i64) -> Result<Vec<GroupOccupancy>> {
        let mut qb = QueryBuilder::<Postgres>::new(OCCUPANCY_SELECT);
        push_filters(&mut qb, scope, filter);
        qb.push(" ORDER BY g.name, g.id");
        push_limits(&mut qb, limit, offset);

        let groups = qb.build_query_as::<GroupOccupancy>().fetch_all(&self.pool).await?;
        Ok(groups)
    }

    /// Count groups matching the list filters
    pub async fn count(&self, scope: AccessScope, filter: &GroupFilter) -> Result<i64> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM groups g");
        push_filters(&mut qb, scope, filter);

        let count: i64 = qb.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(count)
    }

    /// Every group visible in `scope`, without paging
    pub async fn all_in_scope(&self, scope: AccessScope) -> Result<Vec<GroupOccupancy>> {
        let mut qb = QueryBuilder::<Postgres>::new(OCCUPANCY_SELECT);
        scope.where_clause(&mut qb, ScopedEntity::Group, "g");
        qb.push(" ORDER BY g.name, g.id");

        let groups = qb.build_query_as::<GroupOccupancy>().fetch_all(&self.pool).await?;
        Ok(groups)
    }

    /// Groups led by a teacher, limited to what `scope` may see
    pub async fn led_by(&self, scope: AccessScope, teacher_id: i64) -> Result<Vec<GroupOccupancy>> {
        let filter = GroupFilter {
            teacher: Some(teacher_id),
            ..Default::default()
        };
        let mut qb = QueryBuilder::<Postgres>::new(OCCUPANCY_SELECT);
        push_filters(&mut qb, scope, &filter);
        qb.push(" ORDER BY g.name, g.id");

        let groups = qb.build_query_as::<GroupOccupancy>().fetch_all(&self.pool).await?;
        Ok(groups)
    }

    /// Teacher of each of the given groups; missing groups are absent from the result
    pub async fn teachers_of(&self, group_ids: &[i64]) -> Result<Vec<(i64, Option<i64>)>> {
        let rows = sqlx::query_as::<_, (i64, Option<i64>)>(
            "SELECT id, teacher_id FROM groups WHERE id = ANY($1)",
        )
        .bind(group_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Total number of groups
    pub async fn count_all(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM groups")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

/// Lock the group row and make sure it can take one more active student.
///
/// Must run inside the transaction that assigns the student, so two
/// concurrent enrolments cannot both take the last place.
pub async fn reserve_place(conn: &mut PgConnection, group_id: i64) -> Result<()> {
    let (name, max_capacity) = lock_group(conn, group_id)
        .await?
        .ok_or_else(|| KindergartenError::not_found("Group", group_id))?;

    let current = count_active(conn, group_id).await?;
    if current >= i64::from(max_capacity) {
        return Err(KindergartenError::invalid(format!(
            "Group '{}' is full ({} of {} places taken)",
            name, current, max_capacity
        )));
    }

    Ok(())
}

/// `SELECT ... FOR UPDATE` on the group row; name and capacity
async fn lock_group(conn: &mut PgConnection, group_id: i64) -> Result<Option<(String, i32)>> {
    let row = sqlx::query_as::<_, (String, i32)>(
        "SELECT name, max_capacity FROM groups WHERE id = $1 FOR UPDATE",
    )
    .bind(group_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row)
}

/// Students in the group without an exit date
async fn count_active(conn: &mut PgConnection, group_id: i64) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM students WHERE group_id = $1 AND date_out IS NULL",
    )
    .bind(group_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(count)
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, scope: AccessScope, filter: &GroupFilter) {
    scope.where_clause(qb, ScopedEntity::Group, "g");
    push_search(qb, "g.name", filter.search.as_deref());
    if let Some(category) = filter.category {
        qb.push(" AND g.category = ");
        qb.push_bind(category);
    }
    if let Some(year) = filter.year {
        qb.push(" AND g.year = ");
        qb.push_bind(year);
    }
    if let Some(teacher_id) = filter.teacher {
        qb.push(" AND g.teacher_id = ");
        qb.push_bind(teacher_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AgeCategory;

    #[test]
    fn test_teacher_scope_and_filters() {
        let filter = GroupFilter {
            search: None,
            category: Some(AgeCategory::Middle),
            year: Some(2024),
            teacher: None,
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM groups g");
        push_filters(&mut qb, AccessScope::Teacher(8), &filter);

        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM groups g WHERE (g.teacher_id = $1) AND g.category = $2 AND g.year = $3"
        );
    }
}
