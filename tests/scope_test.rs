//! Role scoping, attendance and capacity against a real database
//!
//! Needs Docker or `TEST_DATABASE_URL`; run with `cargo test -- --ignored`.

mod helpers;

use assert_matches::assert_matches;
use serial_test::serial;

use helpers::{group_request, principal, seed, student_request, years_before, TestContext};
use kindergarten::models::{
    AbsenceReason, AccountRole, AttendanceFilter, BulkMarkEntry, BulkMarkRequest,
    CreateAccountRequest, LinkStudentParentRequest, MarkAttendanceRequest, PageRequest,
    Relationship, StudentFilter, UpdateAccountRequest, UpdateGroupRequest, UpdateStudentRequest,
};
use kindergarten::Role;
use kindergarten::reports::{ReportBody, ReportKind};
use kindergarten::services::ReportParams;
use kindergarten::utils::helpers::today;
use kindergarten::KindergartenError;

fn mark(student_id: i64, status: bool, reason: AbsenceReason) -> MarkAttendanceRequest {
    MarkAttendanceRequest {
        student_id,
        attendance_date: today(),
        status,
        reason,
    }
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL"]
async fn teacher_sees_only_students_of_own_groups() {
    let ctx = TestContext::new().await.expect("context");
    let fx = seed(&ctx.db).await;

    let page = ctx
        .services
        .students
        .list(&fx.teacher_a(), &StudentFilter::default(), &PageRequest::default())
        .await
        .unwrap();

    assert_eq!(page.total, 2);
    assert!(page.items.iter().all(|s| s.student.group_id == Some(fx.group_a.id)));

    let groups = ctx
        .services
        .groups
        .list(&fx.teacher_a(), &Default::default(), &PageRequest::default())
        .await
        .unwrap();
    assert_eq!(groups.total, 1);
    assert_eq!(groups.items[0].group.group.id, fx.group_a.id);
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL"]
async fn parent_sees_only_linked_children() {
    let ctx = TestContext::new().await.expect("context");
    let fx = seed(&ctx.db).await;
    let parent = fx.parent_a();

    let page = ctx
        .services
        .students
        .list(&parent, &StudentFilter::default(), &PageRequest::default())
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].student.id, fx.students_a[0].id);

    assert_matches!(
        ctx.services.students.get(&parent, fx.student_b.id).await,
        Err(KindergartenError::PermissionDenied(_))
    );
    assert_matches!(
        ctx.services.students.get(&parent, 9_999).await,
        Err(KindergartenError::NotFound { .. })
    );
    assert!(ctx.services.students.get(&parent, fx.students_a[0].id).await.is_ok());
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL"]
async fn attendance_lists_follow_student_scope() {
    let ctx = TestContext::new().await.expect("context");
    let fx = seed(&ctx.db).await;
    let director = fx.director();

    for student in fx.students_a.iter().chain(std::iter::once(&fx.student_b)) {
        ctx.services
            .attendance
            .mark(&director, mark(student.id, true, AbsenceReason::Unspecified))
            .await
            .unwrap();
    }

    let filter = AttendanceFilter::default();
    let page = PageRequest::default();
    let all = ctx.services.attendance.list(&director, &filter, &page).await.unwrap();
    let teacher = ctx.services.attendance.list(&fx.teacher_a(), &filter, &page).await.unwrap();
    let parent = ctx.services.attendance.list(&fx.parent_b(), &filter, &page).await.unwrap();

    assert_eq!(all.total, 3);
    assert_eq!(teacher.total, 2);
    assert_eq!(parent.total, 1);
    assert_eq!(parent.items[0].attendance.student_id, fx.student_b.id);
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL"]
async fn marking_twice_overwrites_the_days_record() {
    let ctx = TestContext::new().await.expect("context");
    let fx = seed(&ctx.db).await;
    let teacher = fx.teacher_a();
    let student_id = fx.students_a[0].id;

    let first = ctx
        .services
        .attendance
        .mark(&teacher, mark(student_id, false, AbsenceReason::Illness))
        .await
        .unwrap();
    let second = ctx
        .services
        .attendance
        .mark(&teacher, mark(student_id, true, AbsenceReason::Illness))
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert!(second.status);
    assert_eq!(second.reason, AbsenceReason::Unspecified);
    assert_eq!(second.noted_by, Some(fx.teacher_a.id));
    assert_eq!(ctx.database.count_records("attendance").await.unwrap(), 1);
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL"]
async fn teachers_and_parents_cannot_mark_foreign_students() {
    let ctx = TestContext::new().await.expect("context");
    let fx = seed(&ctx.db).await;

    assert_matches!(
        ctx.services
            .attendance
            .mark(&fx.teacher_b(), mark(fx.students_a[0].id, true, AbsenceReason::Unspecified))
            .await,
        Err(KindergartenError::PermissionDenied(_))
    );
    assert_matches!(
        ctx.services
            .attendance
            .mark(&fx.parent_a(), mark(fx.students_a[0].id, true, AbsenceReason::Unspecified))
            .await,
        Err(KindergartenError::PermissionDenied(_))
    );
    assert_eq!(ctx.database.count_records("attendance").await.unwrap(), 0);
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL"]
async fn bulk_mark_skips_students_outside_the_group() {
    let ctx = TestContext::new().await.expect("context");
    let fx = seed(&ctx.db).await;

    let entry = |student_id: i64| BulkMarkEntry {
        student_id,
        status: true,
        reason: AbsenceReason::Unspecified,
    };
    let request = BulkMarkRequest {
        group_id: fx.group_a.id,
        attendance_date: today(),
        entries: vec![entry(fx.students_a[0].id), entry(fx.students_a[1].id), entry(fx.student_b.id)],
    };

    let outcome = ctx.services.attendance.bulk_mark(&fx.teacher_a(), request.clone()).await.unwrap();
    assert_eq!(outcome.marked, 2);
    assert_eq!(outcome.skipped, vec![fx.student_b.id]);

    assert_matches!(
        ctx.services.attendance.bulk_mark(&fx.teacher_b(), request).await,
        Err(KindergartenError::PermissionDenied(_))
    );
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL"]
async fn bulk_mark_writes_a_repeated_student_once() {
    let ctx = TestContext::new().await.expect("context");
    let fx = seed(&ctx.db).await;
    let student_id = fx.students_a[0].id;

    let entry = |status: bool| BulkMarkEntry {
        student_id,
        status,
        reason: AbsenceReason::Illness,
    };
    let request = BulkMarkRequest {
        group_id: fx.group_a.id,
        attendance_date: today(),
        entries: vec![entry(true), entry(false)],
    };

    let outcome = ctx.services.attendance.bulk_mark(&fx.teacher_a(), request).await.unwrap();
    assert_eq!(outcome.marked, 1);
    assert!(outcome.skipped.is_empty());
    assert_eq!(ctx.database.count_records("attendance").await.unwrap(), 1);

    let roster = ctx.services.attendance.roster(&fx.teacher_a(), today(), Some(fx.group_a.id)).await.unwrap();
    let marked = roster.iter().find(|r| r.student_id == student_id).unwrap();
    assert_eq!(marked.status, Some(false));
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL"]
async fn full_group_rejects_new_students() {
    let ctx = TestContext::new().await.expect("context");
    let fx = seed(&ctx.db).await;
    let director = fx.director();

    let group = ctx
        .services
        .groups
        .create(&director, group_request("Tiny", None, Some(1)))
        .await
        .unwrap();
    ctx.services
        .students
        .create(&director, student_request("First Child", Some(group.id)))
        .await
        .unwrap();

    assert_matches!(
        ctx.services
            .students
            .create(&director, student_request("Second Child", Some(group.id)))
            .await,
        Err(KindergartenError::InvalidInput(_))
    );

    let occupancy = ctx.db.groups.find_with_occupancy(group.id).await.unwrap().unwrap();
    assert_eq!(occupancy.current_students_count, 1);
    assert!(occupancy.is_full());
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL"]
async fn group_rules_for_capacity_and_deletion() {
    let ctx = TestContext::new().await.expect("context");
    let fx = seed(&ctx.db).await;
    let director = fx.director();

    let shrink = UpdateGroupRequest {
        max_capacity: Some(1),
        ..Default::default()
    };
    assert_matches!(
        ctx.services.groups.update(&director, fx.group_a.id, shrink).await,
        Err(KindergartenError::InvalidInput(_))
    );
    let exact = UpdateGroupRequest {
        max_capacity: Some(2),
        ..Default::default()
    };
    let group = ctx.services.groups.update(&director, fx.group_a.id, exact).await.unwrap();
    assert_eq!(group.max_capacity, 2);

    assert_matches!(
        ctx.services.groups.delete(&director, fx.group_a.id).await,
        Err(KindergartenError::Conflict(_))
    );
    assert_matches!(
        ctx.services.groups.create(&director, group_request("Sunflowers", None, None)).await,
        Err(KindergartenError::Conflict(_))
    );
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL"]
async fn group_with_only_graduates_is_empty_and_deletable() {
    let ctx = TestContext::new().await.expect("context");
    let fx = seed(&ctx.db).await;
    let director = fx.director();
    let student_id = fx.student_b.id;

    let graduate = UpdateStudentRequest {
        date_out: Some(Some(today())),
        ..Default::default()
    };
    ctx.services.students.update(&director, student_id, graduate).await.unwrap();

    let occupancy = ctx.db.groups.find_with_occupancy(fx.group_b.id).await.unwrap().unwrap();
    assert_eq!(occupancy.current_students_count, 0);

    ctx.services.groups.delete(&director, fx.group_b.id).await.unwrap();

    let student = ctx.db.students.find_by_id(student_id).await.unwrap().unwrap();
    assert_eq!(student.group_id, None);
    assert_eq!(student.date_out, Some(today()));
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL"]
async fn failed_role_change_keeps_account_unchanged() {
    let ctx = TestContext::new().await.expect("context");
    let superuser = principal(900, Role::Superuser, None, None);

    let created = ctx
        .services
        .accounts
        .create(
            &superuser,
            CreateAccountRequest {
                username: "deputy".to_string(),
                email: "deputy@example.org".to_string(),
                password: "deputy-password-1".to_string(),
                role: None,
                full_name: None,
                phone: None,
            },
        )
        .await
        .unwrap();
    let id = created.account.id;

    sqlx::query("ALTER TABLE account_roles ADD CONSTRAINT no_directors CHECK (role <> 'director')")
        .execute(&ctx.database.pool)
        .await
        .unwrap();
    let update = UpdateAccountRequest {
        email: Some("changed@example.org".to_string()),
        is_active: Some(false),
        roles: Some(vec![AccountRole::Director]),
    };
    let result = ctx.services.accounts.update(&superuser, id, update).await;
    sqlx::query("ALTER TABLE account_roles DROP CONSTRAINT no_directors")
        .execute(&ctx.database.pool)
        .await
        .unwrap();

    assert!(result.is_err());
    let account = ctx.services.accounts.get(&superuser, id).await.unwrap();
    assert_eq!(account.account.email, "deputy@example.org");
    assert!(account.account.is_active);
    assert!(account.roles.is_empty());
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL"]
async fn directory_writes_are_director_only() {
    let ctx = TestContext::new().await.expect("context");
    let fx = seed(&ctx.db).await;

    assert_matches!(
        ctx.services
            .students
            .create(&fx.teacher_a(), student_request("New Child", Some(fx.group_a.id)))
            .await,
        Err(KindergartenError::PermissionDenied(_))
    );

    let mut too_young = student_request("Baby", None);
    too_young.birthday = years_before(today(), 1);
    assert_matches!(
        ctx.services.students.create(&fx.director(), too_young).await,
        Err(KindergartenError::InvalidInput(_))
    );

    let duplicate = LinkStudentParentRequest {
        student_id: fx.students_a[0].id,
        parent_id: fx.parent_a.id,
        relationship: Relationship::Father,
        is_primary: false,
    };
    assert_matches!(
        ctx.services.students.add_parent(&fx.director(), duplicate).await,
        Err(KindergartenError::Conflict(_))
    );
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL"]
async fn reports_respect_audience_and_scope() {
    let ctx = TestContext::new().await.expect("context");
    let fx = seed(&ctx.db).await;
    let params = ReportParams::default();

    assert_matches!(
        ctx.services.reports.generate(&fx.parent_a(), ReportKind::OverallStats, &params).await,
        Err(KindergartenError::PermissionDenied(_))
    );
    assert_matches!(
        ctx.services.reports.generate(&fx.teacher_a(), ReportKind::ChildInfo, &params).await,
        Err(KindergartenError::PermissionDenied(_))
    );

    let report = ctx
        .services
        .reports
        .generate(&fx.teacher_a(), ReportKind::GroupAttendance, &params)
        .await
        .unwrap();
    assert_matches!(&report.body, ReportBody::Table(table) if table.rows.len() == 2);

    let report = ctx
        .services
        .reports
        .generate(&fx.parent_b(), ReportKind::ChildInfo, &params)
        .await
        .unwrap();
    assert_matches!(&report.body, ReportBody::Table(table) if table.rows.len() == 1);

    let csv = ctx
        .services
        .reports
        .export(&fx.director(), ReportKind::StudentsCsv, &params)
        .await
        .unwrap();
    assert_eq!(csv.content_type, "text/csv; charset=utf-8");
    // BOM, header and one line per student
    assert_eq!(csv.body.trim_end().split("\r\n").count(), 4);
}
