//! Attendance marking service
//!
//! Records are upserted per (student, date). Directors and superusers may
//! mark any student; a teacher only students of the groups they lead.

use chrono::NaiveDate;
use tracing::debug;

use crate::access::policy::{self, Action};
use crate::access::{Principal, ScopedEntity};
use crate::database::DatabaseService;
use crate::models::{
    Attendance, AttendanceEntry, AttendanceFilter, BulkMarkOutcome, BulkMarkRequest,
    MarkAttendanceRequest, Page, PageRequest, RosterEntry, UpdateAttendanceRequest,
};
use crate::utils::errors::{KindergartenError, Result};
use crate::utils::logging::log_attendance_marked;

#[derive(Clone)]
pub struct AttendanceService {
    db: DatabaseService,
    page_size: i64,
}

impl AttendanceService {
    pub fn new(db: DatabaseService, page_size: i64) -> Self {
        Self { db, page_size }
    }

    /// Records visible to the principal, newest first
    pub async fn list(&self, principal: &Principal, filter: &AttendanceFilter, page: &PageRequest) -> Result<Page<AttendanceEntry>> {
        let scope = principal.scope();
        let (limit, offset) = page.limits(self.page_size);

        let items = self.db.attendance.list(scope, filter, limit, offset).await?;
        let total = self.db.attendance.count(scope, filter).await?;
        Ok(Page::new(items, total, page, self.page_size))
    }

    pub async fn get(&self, principal: &Principal, id: i64) -> Result<AttendanceEntry> {
        let entry = self
            .db
            .attendance
            .find_entry(id)
            .await?
            .ok_or_else(|| KindergartenError::not_found("Attendance", id))?;
        self.db.ensure_visible(principal.scope(), ScopedEntity::Attendance, id).await?;
        Ok(entry)
    }

    /// Active students with their record for `date`, for staff marking a register
    pub async fn roster(&self, principal: &Principal, date: NaiveDate, group_id: Option<i64>) -> Result<Vec<RosterEntry>> {
        policy::require(principal, Action::MarkAttendance)?;
        let scope = principal.scope();

        if let Some(group_id) = group_id {
            if self.db.groups.find_by_id(group_id).await?.is_none() {
                return Err(KindergartenError::not_found("Group", group_id));
            }
            self.db.ensure_visible(scope, ScopedEntity::Group, group_id).await?;
        }

        self.db.attendance.roster(scope, date, group_id).await
    }

    /// Create or overwrite one student's record for a day
    pub async fn mark(&self, principal: &Principal, request: MarkAttendanceRequest) -> Result<Attendance> {
        policy::require(principal, Action::MarkAttendance)?;

        let student = self
            .db
            .students
            .find_by_id(request.student_id)
            .await?
            .ok_or_else(|| KindergartenError::not_found("Student", request.student_id))?;
        if !student.is_active() {
            return Err(KindergartenError::invalid("Attendance cannot be marked for a graduated student"));
        }
        self.ensure_can_mark_student(principal, student.group_id).await?;

        let record = self
            .db
            .attendance
            .upsert(
                student.id,
                request.attendance_date,
                request.status,
                request.effective_reason(),
                principal.teacher_id,
            )
            .await?;

        log_attendance_marked(principal.account_id, student.group_id, request.attendance_date, 1);
        Ok(record)
    }

    /// Mark a whole group for one day
    pub async fn bulk_mark(&self, principal: &Principal, request: BulkMarkRequest) -> Result<BulkMarkOutcome> {
        policy::require(principal, Action::MarkAttendance)?;

        let group = self
            .db
            .groups
            .find_by_id(request.group_id)
            .await?
            .ok_or_else(|| KindergartenError::not_found("Group", request.group_id))?;
        if !policy::can_mark_for_group(principal, group.teacher_id) {
            return policy::deny(principal, "mark attendance for this group");
        }

        let outcome = self
            .db
            .attendance
            .bulk_mark(group.id, request.attendance_date, &request.entries, principal.teacher_id)
            .await?;

        if !outcome.skipped.is_empty() {
            debug!(group_id = group.id, skipped = ?outcome.skipped, "Skipped students outside the group");
        }
        log_attendance_marked(principal.account_id, Some(group.id), request.attendance_date, outcome.marked);
        Ok(outcome)
    }

    /// Change status and/or reason of a record
    pub async fn update(&self, principal: &Principal, id: i64, request: UpdateAttendanceRequest) -> Result<Attendance> {
        policy::require(principal, Action::MarkAttendance)?;

        let current = self.find_writable(principal, id).await?;
        let status = request.status.unwrap_or(current.status);
        let reason = request.reason.unwrap_or(current.reason);

        self.db
            .attendance
            .update(id, status, reason, principal.teacher_id)
            .await?
            .ok_or_else(|| KindergartenError::not_found("Attendance", id))
    }

    /// Flip only the present/absent flag
    pub async fn set_status(&self, principal: &Principal, id: i64, status: bool) -> Result<Attendance> {
        self.update(
            principal,
            id,
            UpdateAttendanceRequest {
                status: Some(status),
                reason: None,
            },
        )
        .await
    }

    pub async fn delete(&self, principal: &Principal, id: i64) -> Result<()> {
        policy::require(principal, Action::MarkAttendance)?;

        self.find_writable(principal, id).await?;
        self.db.attendance.delete(id).await?;
        debug!(account_id = principal.account_id, attendance_id = id, "Attendance record deleted");
        Ok(())
    }

    async fn find_writable(&self, principal: &Principal, id: i64) -> Result<Attendance> {
        let record = self
            .db
            .attendance
            .find_by_id(id)
            .await?
            .ok_or_else(|| KindergartenError::not_found("Attendance", id))?;

        let group_id = self
            .db
            .students
            .find_by_id(record.student_id)
            .await?
            .and_then(|s| s.group_id);
        self.ensure_can_mark_student(principal, group_id).await?;

        Ok(record)
    }

    async fn ensure_can_mark_student(&self, principal: &Principal, group_id: Option<i64>) -> Result<()> {
        let group_teacher = match group_id {
            Some(group_id) => self.db.groups.find_by_id(group_id).await?.and_then(|g| g.teacher_id),
            None => None,
        };
        if policy::can_mark_for_group(principal, group_teacher) {
            Ok(())
        } else {
            policy::deny(principal, "mark attendance for this student")
        }
    }
}
