//! Database repositories module
//!
//! This module contains all repository implementations for data access.
//! List queries take an [`AccessScope`] and append its predicate, so a
//! caller can never forget to filter.

pub mod account;
pub mod attendance;
pub mod event;
pub mod group;
pub mod parent;
pub mod reports;
pub mod student;
pub mod teacher;

// Re-export repositories
pub use account::AccountRepository;
pub use attendance::AttendanceRepository;
pub use event::EventRepository;
pub use group::GroupRepository;
pub use parent::ParentRepository;
pub use reports::ReportRepository;
pub use student::StudentRepository;
pub use teacher::TeacherRepository;

use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::access::{AccessScope, ScopedEntity};
use crate::utils::errors::Result;

/// Whether row `id` of `entity` falls inside `scope`
pub async fn row_visible(pool: &PgPool, scope: AccessScope, entity: ScopedEntity, id: i64) -> Result<bool> {
    if scope.is_all() {
        return Ok(true);
    }

    let mut qb = QueryBuilder::<Postgres>::new("SELECT EXISTS (SELECT 1 FROM ");
    qb.push(entity.table());
    qb.push(" x WHERE x.id = ");
    qb.push_bind(id);
    qb.push(" AND ");
    scope.push_predicate(&mut qb, entity, "x");
    qb.push(")");

    let visible: bool = qb.build_query_scalar().fetch_one(pool).await?;
    Ok(visible)
}

/// Append `AND <column> ILIKE '%term%'` when a non-empty term is given
pub(crate) fn push_search(qb: &mut QueryBuilder<'_, Postgres>, column: &str, term: Option<&str>) {
    if let Some(term) = term.map(str::trim).filter(|t| !t.is_empty()) {
        qb.push(format!(" AND {column} ILIKE "));
        qb.push_bind(crate::utils::helpers::like_pattern(term));
    }
}

/// Append `LIMIT` and `OFFSET`
pub(crate) fn push_limits(qb: &mut QueryBuilder<'_, Postgres>, limit: i64, offset: i64) {
    qb.push(" LIMIT ");
    qb.push_bind(limit);
    qb.push(" OFFSET ");
    qb.push_bind(offset);
}
