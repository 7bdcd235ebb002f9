//! Event repository implementation

use chrono::NaiveDate;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use crate::access::{AccessScope, ScopedEntity};
use crate::database::repositories::push_limits;
use crate::models::event::{CreateEventRequest, Event, EventFilter, UpdateEventRequest};
use crate::utils::errors::Result;

const EVENT_SELECT: &str = r#"
    SELECT e.id, e.title, e.description, e.event_date, e.event_time, e.event_type, e.created_at,
           COALESCE(
               (SELECT ARRAY_AGG(eg.group_id ORDER BY eg.group_id) FROM event_groups eg WHERE eg.event_id = e.id),
               ARRAY[]::BIGINT[]
           ) AS group_ids
    FROM events e
"#;

#[derive(Clone)]
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new event with its target groups
    pub async fn create(&self, request: CreateEventRequest) -> Result<Event> {
        let mut tx = self.pool.begin().await?;

        let event_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO events (title, description, event_date, event_time, event_type)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(request.title.trim())
        .bind(request.description)
        .bind(request.event_date)
        .bind(request.event_time)
        .bind(request.event_type)
        .fetch_one(&mut *tx)
        .await?;

        replace_groups(&mut tx, event_id, &request.group_ids).await?;
        let event = fetch_event(&mut tx, event_id).await?;

        tx.commit().await?;
        Ok(event)
    }

    /// Find event by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Event>> {
        let mut qb = QueryBuilder::<Postgres>::new(EVENT_SELECT);
        qb.push(" WHERE e.id = ");
        qb.push_bind(id);

        let event = qb.build_query_as::<Event>().fetch_optional(&self.pool).await?;
        Ok(event)
    }

    /// Update event; `group_ids`, when given, replaces the target groups
    pub async fn update(&self, id: i64, request: UpdateEventRequest) -> Result<Option<Event>> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE events
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                event_date = COALESCE($4, event_date),
                event_time = CASE WHEN $5 THEN $6 ELSE event_time END,
                event_type = COALESCE($7, event_type)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(request.title.map(|t| t.trim().to_string()))
        .bind(request.description)
        .bind(request.event_date)
        .bind(request.event_time.is_some())
        .bind(request.event_time.flatten())
        .bind(request.event_type)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        if let Some(group_ids) = request.group_ids.as_deref() {
            replace_groups(&mut tx, id, group_ids).await?;
        }
        let event = fetch_event(&mut tx, id).await?;

        tx.commit().await?;
        Ok(Some(event))
    }

    /// Delete event
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// List events visible in `scope`, ordered by date and time
    pub async fn list(&self, scope: AccessScope, filter: &EventFilter, limit: i64, offset: i64) -> Result<Vec<Event>> {
        let mut qb = QueryBuilder::<Postgres>::new(EVENT_SELECT);
        push_filters(&mut qb, scope, filter);
        qb.push(" ORDER BY e.event_date, e.event_time NULLS FIRST, e.id");
        push_limits(&mut qb, limit, offset);

        let events = qb.build_query_as::<Event>().fetch_all(&self.pool).await?;
        Ok(events)
    }

    /// Count events matching the list filters
    pub async fn count(&self, scope: AccessScope, filter: &EventFilter) -> Result<i64> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM events e");
        push_filters(&mut qb, scope, filter);

        let count: i64 = qb.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(count)
    }

    /// Next events visible in `scope` starting from `from`
    pub async fn upcoming(&self, scope: AccessScope, from: NaiveDate, limit: i64) -> Result<Vec<Event>> {
        let filter = EventFilter {
            from: Some(from),
            ..Default::default()
        };
        self.list(scope, &filter, limit, 0).await
    }
}

async fn replace_groups(conn: &mut PgConnection, event_id: i64, group_ids: &[i64]) -> Result<()> {
    sqlx::query("DELETE FROM event_groups WHERE event_id = $1")
        .bind(event_id)
        .execute(&mut *conn)
        .await?;

    if !group_ids.is_empty() {
        sqlx::query(
            r#"
            INSERT INTO event_groups (event_id, group_id)
            SELECT $1, UNNEST($2::BIGINT[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(event_id)
        .bind(group_ids)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

async fn fetch_event(conn: &mut PgConnection, id: i64) -> Result<Event> {
    let mut qb = QueryBuilder::<Postgres>::new(EVENT_SELECT);
    qb.push(" WHERE e.id = ");
    qb.push_bind(id);

    let event = qb.build_query_as::<Event>().fetch_one(&mut *conn).await?;
    Ok(event)
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, scope: AccessScope, filter: &EventFilter) {
    scope.where_clause(qb, ScopedEntity::Event, "e");
    if let Some(from) = filter.from {
        qb.push(" AND e.event_date >= ");
        qb.push_bind(from);
    }
    if let Some(to) = filter.to {
        qb.push(" AND e.event_date <= ");
        qb.push_bind(to);
    }
    if let Some(event_type) = filter.event_type {
        qb.push(" AND e.event_type = ");
        qb.push_bind(event_type);
    }
    if let Some(group_id) = filter.group {
        qb.push(" AND EXISTS (SELECT 1 FROM event_groups f_eg WHERE f_eg.event_id = e.id AND f_eg.group_id = ");
        qb.push_bind(group_id);
        qb.push(")");
    }
}
