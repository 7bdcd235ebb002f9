//! Student enrolment service
//!
//! Handles the student directory: scoped listing and details, enrolment
//! with age and capacity checks, edits, removal and parent links.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info};

use crate::access::policy::{self, Action};
use crate::access::{Principal, ScopedEntity};
use crate::database::DatabaseService;
use crate::models::student::{MAX_ENROLLMENT_AGE, MIN_ENROLLMENT_AGE};
use crate::models::{
    Attendance, CreateStudentRequest, LinkStudentParentRequest, Page, PageRequest, Student,
    StudentFilter, StudentParent, StudentParentLink, StudentWithGroup, UpdateStudentRequest,
};
use crate::utils::errors::{KindergartenError, Result};
use crate::utils::helpers::{age_on, today};

/// Attendance records shown on the student page
const RECENT_ATTENDANCE: i64 = 10;

#[derive(Debug, Clone, Serialize)]
pub struct StudentDetail {
    #[serde(flatten)]
    pub student: StudentWithGroup,
    pub age: i32,
    pub status: &'static str,
    pub parents: Vec<StudentParentLink>,
    pub recent_attendance: Vec<Attendance>,
}

#[derive(Clone)]
pub struct StudentService {
    db: DatabaseService,
    page_size: i64,
}

impl StudentService {
    pub fn new(db: DatabaseService, page_size: i64) -> Self {
        Self { db, page_size }
    }

    /// Students visible to the principal
    pub async fn list(&self, principal: &Principal, filter: &StudentFilter, page: &PageRequest) -> Result<Page<StudentWithGroup>> {
        let scope = principal.scope();
        let (limit, offset) = page.limits(self.page_size);

        let items = self.db.students.list(scope, filter, limit, offset).await?;
        let total = self.db.students.count(scope, filter).await?;
        Ok(Page::new(items, total, page, self.page_size))
    }

    /// Student page with parents and latest attendance
    pub async fn get(&self, principal: &Principal, id: i64) -> Result<StudentDetail> {
        let student = self
            .db
            .students
            .find_with_group(id)
            .await?
            .ok_or_else(|| KindergartenError::not_found("Student", id))?;
        let scope = principal.scope();
        self.db.ensure_visible(scope, ScopedEntity::Student, id).await?;

        let parents = self.db.parents.links_for_student(scope, id).await?;
        let recent_attendance = self.db.attendance.recent_for_student(id, RECENT_ATTENDANCE).await?;

        Ok(StudentDetail {
            age: student.student.age(today()),
            status: student.student.status_label(),
            student,
            parents,
            recent_attendance,
        })
    }

    /// Enrol a new student
    pub async fn create(&self, principal: &Principal, request: CreateStudentRequest) -> Result<Student> {
        policy::require(principal, Action::ManageDirectory)?;
        validate_student(&request.fio, request.birthday, request.date_in, request.date_out)?;

        let student = self.db.students.create(request).await?;
        info!(
            account_id = principal.account_id,
            student_id = student.id,
            group_id = ?student.group_id,
            "Student enrolled"
        );
        Ok(student)
    }

    /// Edit a student.
    ///
    /// Capacity is checked again when the student moves to another group
    /// or comes back from graduation.
    pub async fn update(&self, principal: &Principal, id: i64, request: UpdateStudentRequest) -> Result<Student> {
        policy::require(principal, Action::ManageDirectory)?;

        let current = self
            .db
            .students
            .find_by_id(id)
            .await?
            .ok_or_else(|| KindergartenError::not_found("Student", id))?;

        let merged = merge(&current, request);
        validate_student(&merged.fio, merged.birthday, merged.date_in, merged.date_out)?;

        let student = self
            .db
            .students
            .save(&merged, place_to_reserve(&current, &merged))
            .await?
            .ok_or_else(|| KindergartenError::not_found("Student", id))?;

        info!(account_id = principal.account_id, student_id = id, "Student updated");
        Ok(student)
    }

    /// Remove a student with their attendance and links
    pub async fn delete(&self, principal: &Principal, id: i64) -> Result<()> {
        policy::require(principal, Action::ManageDirectory)?;

        if !self.db.students.delete(id).await? {
            return Err(KindergartenError::not_found("Student", id));
        }
        info!(account_id = principal.account_id, student_id = id, "Student deleted");
        Ok(())
    }

    /// Link a parent to a student
    pub async fn add_parent(&self, principal: &Principal, request: LinkStudentParentRequest) -> Result<StudentParent> {
        policy::require(principal, Action::ManageDirectory)?;

        if self.db.students.find_by_id(request.student_id).await?.is_none() {
            return Err(KindergartenError::not_found("Student", request.student_id));
        }
        if self.db.parents.find_by_id(request.parent_id).await?.is_none() {
            return Err(KindergartenError::not_found("Parent", request.parent_id));
        }

        let link = self.db.parents.add_link(request).await.map_err(|e| match e {
            KindergartenError::Conflict(_) => {
                KindergartenError::Conflict("This parent is already linked to the student".to_string())
            }
            other => other,
        })?;

        debug!(link_id = link.id, student_id = link.student_id, parent_id = link.parent_id, "Parent linked");
        Ok(link)
    }

    /// Remove a student-parent link
    pub async fn remove_parent(&self, principal: &Principal, link_id: i64) -> Result<()> {
        policy::require(principal, Action::ManageDirectory)?;

        if !self.db.parents.remove_link(link_id).await? {
            return Err(KindergartenError::not_found("Student parent link", link_id));
        }
        Ok(())
    }
}

/// Apply a patch onto the stored student
fn merge(current: &Student, request: UpdateStudentRequest) -> Student {
    let mut merged = current.clone();
    if let Some(fio) = request.fio {
        merged.fio = fio;
    }
    if let Some(birthday) = request.birthday {
        merged.birthday = birthday;
    }
    if let Some(gender) = request.gender {
        merged.gender = gender;
    }
    if let Some(address) = request.address {
        merged.address = address;
    }
    if let Some(date_in) = request.date_in {
        merged.date_in = date_in;
    }
    if let Some(date_out) = request.date_out {
        merged.date_out = date_out;
    }
    if let Some(group_id) = request.group_id {
        merged.group_id = group_id;
    }
    merged
}

/// Group that must have a free place for the edit to go through
fn place_to_reserve(current: &Student, merged: &Student) -> Option<i64> {
    let group_id = merged.group_id?;
    if merged.date_out.is_some() {
        return None;
    }
    let joins_group = current.group_id != Some(group_id);
    let returns = current.date_out.is_some();
    (joins_group || returns).then_some(group_id)
}

/// Enrolment rules: a name, age 2-7 on the enrolment date, and an exit
/// date not before the enrolment date
pub fn validate_student(fio: &str, birthday: NaiveDate, date_in: NaiveDate, date_out: Option<NaiveDate>) -> Result<()> {
    if fio.trim().is_empty() {
        return Err(KindergartenError::invalid("Full name is required"));
    }

    let age = age_on(birthday, date_in);
    if !(MIN_ENROLLMENT_AGE..=MAX_ENROLLMENT_AGE).contains(&age) {
        return Err(KindergartenError::invalid(format!(
            "Age at enrolment must be between {} and {} years, got {}",
            MIN_ENROLLMENT_AGE, MAX_ENROLLMENT_AGE, age
        )));
    }

    if let Some(out) = date_out {
        if out < date_in {
            return Err(KindergartenError::invalid("Exit date cannot be before the enrolment date"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Gender;
    use assert_matches::assert_matches;
    use proptest::prelude::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn student(group_id: Option<i64>, date_out: Option<NaiveDate>) -> Student {
        Student {
            id: 1,
            fio: "Smirnov Ivan".to_string(),
            birthday: d(2020, 3, 15),
            gender: Gender::Male,
            address: "Lenina 1".to_string(),
            date_in: d(2023, 9, 1),
            date_out,
            group_id,
        }
    }

    #[test]
    fn test_age_boundaries() {
        assert!(validate_student("A", d(2021, 9, 1), d(2023, 9, 1), None).is_ok());
        assert!(validate_student("A", d(2016, 9, 2), d(2023, 9, 1), None).is_ok());
        assert_matches!(
            validate_student("A", d(2021, 9, 2), d(2023, 9, 1), None),
            Err(KindergartenError::InvalidInput(_))
        );
        assert_matches!(
            validate_student("A", d(2015, 9, 1), d(2023, 9, 1), None),
            Err(KindergartenError::InvalidInput(_))
        );
    }

    #[test]
    fn test_exit_before_entry_rejected() {
        assert!(validate_student("A", d(2020, 1, 1), d(2023, 9, 1), Some(d(2023, 8, 31))).is_err());
        assert!(validate_student("A", d(2020, 1, 1), d(2023, 9, 1), Some(d(2023, 9, 1))).is_ok());
        assert!(validate_student(" ", d(2020, 1, 1), d(2023, 9, 1), None).is_err());
    }

    #[test]
    fn test_merge_applies_nullable_fields() {
        let current = student(Some(2), None);
        let patch = UpdateStudentRequest {
            group_id: Some(None),
            address: Some("Mira 5".to_string()),
            ..Default::default()
        };
        let merged = merge(&current, patch);
        assert_eq!(merged.group_id, None);
        assert_eq!(merged.address, "Mira 5");
        assert_eq!(merged.fio, current.fio);
    }

    #[test]
    fn test_place_reserved_only_when_joining() {
        let current = student(Some(2), None);
        assert_eq!(place_to_reserve(&current, &student(Some(2), None)), None);
        assert_eq!(place_to_reserve(&current, &student(Some(3), None)), Some(3));
        assert_eq!(place_to_reserve(&current, &student(None, None)), None);
        assert_eq!(place_to_reserve(&current, &student(Some(3), Some(d(2024, 5, 31)))), None);

        let graduated = student(Some(2), Some(d(2024, 5, 31)));
        assert_eq!(place_to_reserve(&graduated, &student(Some(2), None)), Some(2));
    }

    proptest! {
        #[test]
        fn enrolment_age_is_accepted_iff_between_two_and_seven(age_days in 0i64..4000) {
            let date_in = d(2024, 9, 1);
            let birthday = date_in - chrono::Duration::days(age_days);
            let age = age_on(birthday, date_in);
            let accepted = validate_student("Child", birthday, date_in, None).is_ok();
            prop_assert_eq!(accepted, (2..=7).contains(&age));
        }
    }
}
