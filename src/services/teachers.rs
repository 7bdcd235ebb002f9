//! Teacher directory service

use serde::Serialize;
use tracing::info;

use crate::access::policy::{self, Action};
use crate::access::{Principal, ScopedEntity};
use crate::database::DatabaseService;
use crate::models::{
    CreateTeacherRequest, GroupOccupancy, Page, PageRequest, Teacher, TeacherFilter,
    UpdateTeacherRequest,
};
use crate::utils::errors::{KindergartenError, Result};

#[derive(Debug, Clone, Serialize)]
pub struct TeacherDetail {
    #[serde(flatten)]
    pub teacher: Teacher,
    pub position_label: &'static str,
    pub groups: Vec<GroupOccupancy>,
}

#[derive(Clone)]
pub struct TeacherService {
    db: DatabaseService,
    page_size: i64,
}

impl TeacherService {
    pub fn new(db: DatabaseService, page_size: i64) -> Self {
        Self { db, page_size }
    }

    pub async fn list(&self, principal: &Principal, filter: &TeacherFilter, page: &PageRequest) -> Result<Page<Teacher>> {
        let scope = principal.scope();
        let (limit, offset) = page.limits(self.page_size);

        let items = self.db.teachers.list(scope, filter, limit, offset).await?;
        let total = self.db.teachers.count(scope, filter).await?;
        Ok(Page::new(items, total, page, self.page_size))
    }

    /// Teacher with the groups they lead that the principal can see
    pub async fn get(&self, principal: &Principal, id: i64) -> Result<TeacherDetail> {
        let teacher = self
            .db
            .teachers
            .find_by_id(id)
            .await?
            .ok_or_else(|| KindergartenError::not_found("Teacher", id))?;
        let scope = principal.scope();
        self.db.ensure_visible(scope, ScopedEntity::Teacher, id).await?;

        let groups = self.db.groups.led_by(scope, id).await?;
        Ok(TeacherDetail {
            position_label: teacher.position.label(),
            teacher,
            groups,
        })
    }

    pub async fn create(&self, principal: &Principal, request: CreateTeacherRequest) -> Result<Teacher> {
        policy::require(principal, Action::ManageDirectory)?;
        if request.fio.trim().is_empty() {
            return Err(KindergartenError::invalid("Full name is required"));
        }

        let teacher = self.db.teachers.create(request).await?;
        info!(account_id = principal.account_id, teacher_id = teacher.id, "Teacher created");
        Ok(teacher)
    }

    pub async fn update(&self, principal: &Principal, id: i64, request: UpdateTeacherRequest) -> Result<Teacher> {
        policy::require(principal, Action::ManageDirectory)?;
        if request.fio.as_deref().is_some_and(|f| f.trim().is_empty()) {
            return Err(KindergartenError::invalid("Full name is required"));
        }

        let teacher = self
            .db
            .teachers
            .update(id, request)
            .await?
            .ok_or_else(|| KindergartenError::not_found("Teacher", id))?;
        info!(account_id = principal.account_id, teacher_id = id, "Teacher updated");
        Ok(teacher)
    }

    /// Delete a teacher; their groups stay without a teacher
    pub async fn delete(&self, principal: &Principal, id: i64) -> Result<()> {
        policy::require(principal, Action::ManageDirectory)?;

        if !self.db.teachers.delete(id).await? {
            return Err(KindergartenError::not_found("Teacher", id));
        }
        info!(account_id = principal.account_id, teacher_id = id, "Teacher deleted");
        Ok(())
    }
}
