//! Data models module
//!
//! This module contains all data structures used throughout the application

pub mod account;
pub mod attendance;
pub mod event;
pub mod group;
pub mod page;
pub mod parent;
pub mod student;
pub mod teacher;

// Re-export commonly used models
pub use account::{
    Account, AccountCounts, AccountFilter, AccountRole, AccountRoleFilter, AccountStatus,
    AccountWithRoles, ChangePasswordRequest, CreateAccountRequest, UpdateAccountRequest,
};
pub use attendance::{
    AbsenceReason, Attendance, AttendanceEntry, AttendanceFilter, BulkMarkEntry, BulkMarkOutcome,
    BulkMarkRequest, MarkAttendanceRequest, RosterEntry, UpdateAttendanceRequest,
};
pub use event::{CreateEventRequest, Event, EventFilter, EventType, UpdateEventRequest};
pub use group::{
    AgeCategory, CreateGroupRequest, Group, GroupFilter, GroupOccupancy, UpdateGroupRequest,
    MAX_GROUP_CAPACITY,
};
pub use page::{Page, PageRequest, MAX_PAGE_SIZE};
pub use parent::{
    CreateParentRequest, LinkStudentParentRequest, Parent, ParentFilter, Relationship,
    StudentParent, StudentParentLink, UpdateParentRequest,
};
pub use student::{
    CreateStudentRequest, Gender, Student, StudentFilter, StudentStatus, StudentWithGroup,
    UpdateStudentRequest,
};
pub use teacher::{
    CreateTeacherRequest, Teacher, TeacherFilter, TeacherPosition, UpdateTeacherRequest,
};

/// Serde adapter for patch fields that distinguish "absent" from "null".
///
/// Used with `#[serde(default, with = "crate::models::nullable")]` on an
/// `Option<Option<T>>`: a missing key stays `None`, an explicit `null`
/// becomes `Some(None)`.
pub mod nullable {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }

    pub fn serialize<T, S>(value: &Option<Option<T>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Serialize,
        S: Serializer,
    {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nullable_patch_field() {
        let absent: UpdateGroupRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.teacher_id, None);

        let cleared: UpdateGroupRequest = serde_json::from_str(r#"{"teacher_id": null}"#).unwrap();
        assert_eq!(cleared.teacher_id, Some(None));

        let set: UpdateGroupRequest = serde_json::from_str(r#"{"teacher_id": 7}"#).unwrap();
        assert_eq!(set.teacher_id, Some(Some(7)));
    }
}
