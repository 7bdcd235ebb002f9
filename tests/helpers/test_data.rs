//! Seeded kindergarten used by the database tests
//!
//! Two groups, each led by its own teacher, with children linked to two
//! different parents, plus principals for every role.

use chrono::{Duration, NaiveDate};

use kindergarten::access::{Principal, Role};
use kindergarten::database::DatabaseService;
use kindergarten::models::{
    AgeCategory, CreateGroupRequest, CreateParentRequest, CreateStudentRequest,
    CreateTeacherRequest, Gender, Group, LinkStudentParentRequest, Parent, Relationship, Student,
    Teacher, TeacherPosition,
};
use kindergarten::utils::helpers::today;

pub struct Fixture {
    pub teacher_a: Teacher,
    pub teacher_b: Teacher,
    pub group_a: Group,
    pub group_b: Group,
    /// Two children in group A, one in group B
    pub students_a: Vec<Student>,
    pub student_b: Student,
    /// Parent of the first child in group A
    pub parent_a: Parent,
    /// Parent of the child in group B
    pub parent_b: Parent,
}

impl Fixture {
    pub fn director(&self) -> Principal {
        principal(1, Role::Director, None, None)
    }

    pub fn teacher_a(&self) -> Principal {
        principal(2, Role::Teacher, Some(self.teacher_a.id), None)
    }

    pub fn teacher_b(&self) -> Principal {
        principal(3, Role::Teacher, Some(self.teacher_b.id), None)
    }

    pub fn parent_a(&self) -> Principal {
        principal(4, Role::Parent, None, Some(self.parent_a.id))
    }

    pub fn parent_b(&self) -> Principal {
        principal(5, Role::Parent, None, Some(self.parent_b.id))
    }
}

pub fn principal(account_id: i64, role: Role, teacher_id: Option<i64>, parent_id: Option<i64>) -> Principal {
    Principal {
        account_id,
        username: format!("{}_{}", role, account_id),
        role,
        teacher_id,
        parent_id,
    }
}

/// A four-year-old who joined a year ago
pub fn student_request(fio: &str, group_id: Option<i64>) -> CreateStudentRequest {
    let now = today();
    CreateStudentRequest {
        fio: fio.to_string(),
        birthday: years_before(now, 4),
        gender: Gender::Female,
        address: "1 Garden Lane".to_string(),
        date_in: now - Duration::days(365),
        date_out: None,
        group_id,
    }
}

pub fn years_before(day: NaiveDate, years: i64) -> NaiveDate {
    day - Duration::days(365 * years + years / 4 + 1)
}

pub fn group_request(name: &str, teacher_id: Option<i64>, max_capacity: Option<i32>) -> CreateGroupRequest {
    CreateGroupRequest {
        name: name.to_string(),
        category: AgeCategory::Middle,
        year: 2024,
        teacher_id,
        room: Some("101".to_string()),
        max_capacity,
    }
}

pub async fn seed(db: &DatabaseService) -> Fixture {
    let teacher = |fio: &str| CreateTeacherRequest {
        fio: fio.to_string(),
        position: TeacherPosition::Teacher,
        phone: "+10000000000".to_string(),
        account_id: None,
    };
    let teacher_a = db.teachers.create(teacher("Anna Petrova")).await.expect("teacher a");
    let teacher_b = db.teachers.create(teacher("Boris Ivanov")).await.expect("teacher b");

    let group_a = db
        .groups
        .create(group_request("Sunflowers", Some(teacher_a.id), None))
        .await
        .expect("group a");
    let group_b = db
        .groups
        .create(group_request("Bluebells", Some(teacher_b.id), None))
        .await
        .expect("group b");

    let mut students_a = Vec::new();
    for fio in ["Alice Adams", "Arthur Allen"] {
        students_a.push(db.students.create(student_request(fio, Some(group_a.id))).await.expect("student a"));
    }
    let student_b = db
        .students
        .create(student_request("Bella Brown", Some(group_b.id)))
        .await
        .expect("student b");

    let parent = |fio: &str| CreateParentRequest {
        fio: fio.to_string(),
        phone: "+20000000000".to_string(),
        account_id: None,
    };
    let parent_a = db.parents.create(parent("Alan Adams")).await.expect("parent a");
    let parent_b = db.parents.create(parent("Betty Brown")).await.expect("parent b");

    for (student_id, parent_id) in [(students_a[0].id, parent_a.id), (student_b.id, parent_b.id)] {
        db.parents
            .add_link(LinkStudentParentRequest {
                student_id,
                parent_id,
                relationship: Relationship::Mother,
                is_primary: true,
            })
            .await
            .expect("link");
    }

    Fixture {
        teacher_a,
        teacher_b,
        group_a,
        group_b,
        students_a,
        student_b,
        parent_a,
        parent_b,
    }
}
