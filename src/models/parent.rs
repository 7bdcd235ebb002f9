//! Parent and student-parent link models

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// How a parent is related to a student
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Relationship {
    Mother,
    Father,
    Grandmother,
    Grandfather,
    Guardian,
    Other,
}

impl Relationship {
    pub fn label(&self) -> &'static str {
        match self {
            Relationship::Mother => "Mother",
            Relationship::Father => "Father",
            Relationship::Grandmother => "Grandmother",
            Relationship::Grandfather => "Grandfather",
            Relationship::Guardian => "Guardian",
            Relationship::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Parent {
    pub id: i64,
    pub fio: String,
    pub phone: String,
    pub account_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StudentParent {
    pub id: i64,
    pub student_id: i64,
    pub parent_id: i64,
    pub relationship: Relationship,
    pub is_primary: bool,
}

/// A link row joined with both sides' names
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StudentParentLink {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub link: StudentParent,
    pub student_fio: String,
    pub parent_fio: String,
    pub parent_phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateParentRequest {
    pub fio: String,
    pub phone: String,
    pub account_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateParentRequest {
    pub fio: Option<String>,
    pub phone: Option<String>,
    #[serde(default, with = "crate::models::nullable")]
    pub account_id: Option<Option<i64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkStudentParentRequest {
    pub student_id: i64,
    pub parent_id: i64,
    pub relationship: Relationship,
    #[serde(default = "default_primary")]
    pub is_primary: bool,
}

fn default_primary() -> bool {
    true
}

/// Filters accepted by the parent list
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParentFilter {
    pub search: Option<String>,
    pub group: Option<i64>,
}
