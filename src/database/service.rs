//! Database service layer
//!
//! This module provides a high-level interface to database operations

use crate::access::{AccessScope, ScopedEntity};
use crate::database::repositories::row_visible;
use crate::database::{
    AccountRepository, AttendanceRepository, DatabasePool, EventRepository, GroupRepository,
    ParentRepository, ReportRepository, StudentRepository, TeacherRepository,
};
use crate::utils::errors::{KindergartenError, Result};

#[derive(Clone)]
pub struct DatabaseService {
    pool: DatabasePool,
    pub accounts: AccountRepository,
    pub teachers: TeacherRepository,
    pub groups: GroupRepository,
    pub students: StudentRepository,
    pub parents: ParentRepository,
    pub attendance: AttendanceRepository,
    pub events: EventRepository,
    pub reports: ReportRepository,
}

impl DatabaseService {
    pub fn new(pool: DatabasePool) -> Self {
        Self {
            accounts: AccountRepository::new(pool.clone()),
            teachers: TeacherRepository::new(pool.clone()),
            groups: GroupRepository::new(pool.clone()),
            students: StudentRepository::new(pool.clone()),
            parents: ParentRepository::new(pool.clone()),
            attendance: AttendanceRepository::new(pool.clone()),
            events: EventRepository::new(pool.clone()),
            reports: ReportRepository::new(pool.clone()),
            pool,
        }
    }

    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }

    /// Check database health
    pub async fn health_check(&self) -> Result<()> {
        crate::database::health_check(&self.pool).await
    }

    /// Whether row `id` of `entity` is inside `scope`
    pub async fn is_visible(&self, scope: AccessScope, entity: ScopedEntity, id: i64) -> Result<bool> {
        row_visible(&self.pool, scope, entity, id).await
    }

    /// Fail with `PermissionDenied` when an existing row is outside `scope`
    pub async fn ensure_visible(&self, scope: AccessScope, entity: ScopedEntity, id: i64) -> Result<()> {
        if self.is_visible(scope, entity, id).await? {
            Ok(())
        } else {
            Err(KindergartenError::forbidden(format!(
                "No access to {} {}",
                entity.name(),
                id
            )))
        }
    }
}
