//! Group management service

use serde::Serialize;
use tracing::info;

use crate::access::policy::{self, Action};
use crate::access::{Principal, ScopedEntity};
use crate::database::DatabaseService;
use crate::models::{
    CreateGroupRequest, Group, GroupFilter, GroupOccupancy, Page, PageRequest, RosterEntry,
    StudentFilter, StudentStatus, StudentWithGroup, UpdateGroupRequest, MAX_GROUP_CAPACITY,
};
use crate::utils::errors::{KindergartenError, Result};
use crate::utils::helpers::today;

/// Groups are shown as cards, nine per page
const GROUPS_PAGE_SIZE: i64 = 9;

#[derive(Debug, Clone, Serialize)]
pub struct GroupSummary {
    #[serde(flatten)]
    pub group: GroupOccupancy,
    pub category_label: &'static str,
    pub available_places: i64,
    pub is_full: bool,
}

impl From<GroupOccupancy> for GroupSummary {
    fn from(group: GroupOccupancy) -> Self {
        Self {
            category_label: group.group.category.label(),
            available_places: group.available_places(),
            is_full: group.is_full(),
            group,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupDetail {
    #[serde(flatten)]
    pub summary: GroupSummary,
    /// Active students the principal may see
    pub students: Vec<StudentWithGroup>,
    /// Today's roster for the group
    pub attendance_today: Vec<RosterEntry>,
}

#[derive(Clone)]
pub struct GroupService {
    db: DatabaseService,
}

impl GroupService {
    pub fn new(db: DatabaseService) -> Self {
        Self { db }
    }

    pub async fn list(&self, principal: &Principal, filter: &GroupFilter, page: &PageRequest) -> Result<Page<GroupSummary>> {
        let scope = principal.scope();
        let (limit, offset) = page.limits(GROUPS_PAGE_SIZE);

        let items = self.db.groups.list(scope, filter, limit, offset).await?;
        let total = self.db.groups.count(scope, filter).await?;
        Ok(Page::new(items, total, page, GROUPS_PAGE_SIZE).map(GroupSummary::from))
    }

    /// Group with its active students and today's attendance
    pub async fn get(&self, principal: &Principal, id: i64) -> Result<GroupDetail> {
        let group = self
            .db
            .groups
            .find_with_occupancy(id)
            .await?
            .ok_or_else(|| KindergartenError::not_found("Group", id))?;
        let scope = principal.scope();
        self.db.ensure_visible(scope, ScopedEntity::Group, id).await?;

        let members = StudentFilter {
            group: Some(id),
            status: Some(StudentStatus::Active),
            ..Default::default()
        };
        let students = self.db.students.all_in_scope(scope, &members).await?;
        let attendance_today = self.db.attendance.roster(scope, today(), Some(id)).await?;

        Ok(GroupDetail {
            summary: group.into(),
            students,
            attendance_today,
        })
    }

    pub async fn create(&self, principal: &Principal, request: CreateGroupRequest) -> Result<Group> {
        policy::require(principal, Action::ManageDirectory)?;
        if request.name.trim().is_empty() {
            return Err(KindergartenError::invalid("Group name is required"));
        }
        if let Some(capacity) = request.max_capacity {
            validate_capacity(capacity)?;
        }

        let group = self.db.groups.create(request).await.map_err(name_taken)?;
        info!(account_id = principal.account_id, group_id = group.id, name = %group.name, "Group created");
        Ok(group)
    }

    /// Edit a group; capacity cannot drop below the current active count
    pub async fn update(&self, principal: &Principal, id: i64, request: UpdateGroupRequest) -> Result<Group> {
        policy::require(principal, Action::ManageDirectory)?;
        if request.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(KindergartenError::invalid("Group name is required"));
        }
        if let Some(capacity) = request.max_capacity {
            validate_capacity(capacity)?;
        }

        let group = self
            .db
            .groups
            .update(id, request)
            .await
            .map_err(name_taken)?
            .ok_or_else(|| KindergartenError::not_found("Group", id))?;
        info!(account_id = principal.account_id, group_id = id, "Group updated");
        Ok(group)
    }

    /// Delete a group without active students; graduates lose the link
    pub async fn delete(&self, principal: &Principal, id: i64) -> Result<()> {
        policy::require(principal, Action::ManageDirectory)?;

        if !self.db.groups.delete(id).await? {
            return Err(KindergartenError::not_found("Group", id));
        }
        info!(account_id = principal.account_id, group_id = id, "Group deleted");
        Ok(())
    }
}

fn validate_capacity(capacity: i32) -> Result<()> {
    if !(1..=MAX_GROUP_CAPACITY).contains(&capacity) {
        return Err(KindergartenError::invalid(format!(
            "Capacity must be between 1 and {}",
            MAX_GROUP_CAPACITY
        )));
    }
    Ok(())
}

fn name_taken(err: KindergartenError) -> KindergartenError {
    match err {
        KindergartenError::Conflict(_) => KindergartenError::Conflict("A group with this name already exists".to_string()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AgeCategory;

    #[test]
    fn test_capacity_bounds() {
        assert!(validate_capacity(1).is_ok());
        assert!(validate_capacity(30).is_ok());
        assert!(validate_capacity(0).is_err());
        assert!(validate_capacity(31).is_err());
    }

    #[test]
    fn test_summary_flags() {
        let occupancy = GroupOccupancy {
            group: Group {
                id: 1,
                name: "Sunflowers".to_string(),
                category: AgeCategory::Junior,
                year: 2024,
                teacher_id: None,
                room: "12".to_string(),
                max_capacity: 20,
            },
            teacher_fio: None,
            current_students_count: 20,
        };
        let summary = GroupSummary::from(occupancy);
        assert!(summary.is_full);
        assert_eq!(summary.available_places, 0);
        assert_eq!(summary.category_label, "Junior (3-4 years)");
    }
}
