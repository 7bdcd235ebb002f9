//! Write and report permissions per role

use serde::{Deserialize, Serialize};

use crate::access::role::{Principal, Role};
use crate::utils::errors::{KindergartenError, Result};
use crate::utils::logging::log_permission_denied;

/// Role-gated operations that do not depend on a specific row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Create, edit or delete students, groups, teachers, parents and links
    ManageDirectory,
    /// Mark attendance for some group
    MarkAttendance,
    /// Create, edit or delete events
    ManageEvents,
    /// Account administration
    ManageAccounts,
    /// Staff dashboards and statistics
    ViewAdminStats,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::ManageDirectory => "manage_directory",
            Action::MarkAttendance => "mark_attendance",
            Action::ManageEvents => "manage_events",
            Action::ManageAccounts => "manage_accounts",
            Action::ViewAdminStats => "view_admin_stats",
        }
    }

    /// Whether `role` may perform this action at all
    pub fn allowed_for(&self, role: Role) -> bool {
        match self {
            Action::ManageDirectory | Action::ViewAdminStats => role.is_admin(),
            Action::MarkAttendance | Action::ManageEvents => role.is_staff(),
            Action::ManageAccounts => role == Role::Superuser,
        }
    }
}

/// Who a report is written for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportAudience {
    /// Any staff member, scoped
    Staff,
    /// Directors and superusers
    Admin,
    /// Parents, scoped to their children
    Parent,
}

impl ReportAudience {
    pub fn allows(&self, role: Role) -> bool {
        match self {
            ReportAudience::Staff => role.is_staff(),
            ReportAudience::Admin => role.is_admin(),
            ReportAudience::Parent => role == Role::Parent,
        }
    }
}

/// Fail with `PermissionDenied` unless `principal` may perform `action`
pub fn require(principal: &Principal, action: Action) -> Result<()> {
    if action.allowed_for(principal.role) {
        Ok(())
    } else {
        deny(principal, action.as_str())
    }
}

/// Log and build a permission error
pub fn deny<T>(principal: &Principal, action: &str) -> Result<T> {
    log_permission_denied(principal.account_id, principal.role.as_str(), action);
    Err(KindergartenError::PermissionDenied(format!(
        "Role '{}' may not {}",
        principal.role,
        action.replace('_', " ")
    )))
}

/// Attendance for a group may be written by admins or the group's own teacher
pub fn can_mark_for_group(principal: &Principal, group_teacher_id: Option<i64>) -> bool {
    match principal.role {
        Role::Superuser | Role::Director => true,
        Role::Teacher => principal.teacher_id.is_some() && principal.teacher_id == group_teacher_id,
        Role::Parent | Role::None => false,
    }
}

/// An event may be written by admins, or by a teacher when it targets at
/// least one group and every targeted group is led by that teacher.
///
/// `group_teachers` holds the teacher of each targeted group.
pub fn can_manage_event(principal: &Principal, group_teachers: &[Option<i64>]) -> bool {
    match principal.role {
        Role::Superuser | Role::Director => true,
        Role::Teacher => match principal.teacher_id {
            Some(own) => !group_teachers.is_empty() && group_teachers.iter().all(|t| *t == Some(own)),
            None => false,
        },
        Role::Parent | Role::None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn principal(role: Role, teacher_id: Option<i64>) -> Principal {
        Principal {
            account_id: 10,
            username: "someone".to_string(),
            role,
            teacher_id,
            parent_id: None,
        }
    }

    #[test]
    fn test_directory_is_admin_only() {
        assert!(require(&principal(Role::Director, None), Action::ManageDirectory).is_ok());
        assert!(require(&principal(Role::Superuser, None), Action::ManageDirectory).is_ok());
        assert_matches!(
            require(&principal(Role::Teacher, Some(1)), Action::ManageDirectory),
            Err(KindergartenError::PermissionDenied(_))
        );
        assert_matches!(
            require(&principal(Role::Parent, None), Action::ManageDirectory),
            Err(KindergartenError::PermissionDenied(_))
        );
    }

    #[test]
    fn test_accounts_are_superuser_only() {
        assert!(Action::ManageAccounts.allowed_for(Role::Superuser));
        assert!(!Action::ManageAccounts.allowed_for(Role::Director));
    }

    #[test]
    fn test_attendance_marking() {
        assert!(can_mark_for_group(&principal(Role::Director, None), None));
        assert!(can_mark_for_group(&principal(Role::Teacher, Some(3)), Some(3)));
        assert!(!can_mark_for_group(&principal(Role::Teacher, Some(3)), Some(4)));
        assert!(!can_mark_for_group(&principal(Role::Teacher, None), None));
        assert!(!can_mark_for_group(&principal(Role::Parent, None), Some(3)));
    }

    #[test]
    fn test_event_management() {
        let teacher = principal(Role::Teacher, Some(3));
        assert!(can_manage_event(&teacher, &[Some(3), Some(3)]));
        assert!(!can_manage_event(&teacher, &[Some(3), Some(4)]));
        assert!(!can_manage_event(&teacher, &[Some(3), None]));
        assert!(!can_manage_event(&teacher, &[]));
        assert!(can_manage_event(&principal(Role::Director, None), &[]));
        assert!(!can_manage_event(&principal(Role::Parent, None), &[Some(3)]));
    }

    #[test]
    fn test_report_audiences() {
        assert!(ReportAudience::Staff.allows(Role::Teacher));
        assert!(!ReportAudience::Staff.allows(Role::Parent));
        assert!(ReportAudience::Admin.allows(Role::Director));
        assert!(!ReportAudience::Admin.allows(Role::Teacher));
        assert!(ReportAudience::Parent.allows(Role::Parent));
        assert!(!ReportAudience::Parent.allows(Role::Director));
    }
}
