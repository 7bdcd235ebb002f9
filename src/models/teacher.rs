//! Teacher model

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Staff positions a teacher record can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TeacherPosition {
    JuniorTeacher,
    Teacher,
    SeniorTeacher,
    Head,
    Methodologist,
}

impl TeacherPosition {
    pub fn label(&self) -> &'static str {
        match self {
            TeacherPosition::JuniorTeacher => "Junior teacher",
            TeacherPosition::Teacher => "Teacher",
            TeacherPosition::SeniorTeacher => "Senior teacher",
            TeacherPosition::Head => "Head",
            TeacherPosition::Methodologist => "Methodologist",
        }
    }
}

impl Default for TeacherPosition {
    fn default() -> Self {
        TeacherPosition::Teacher
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Teacher {
    pub id: i64,
    pub fio: String,
    pub position: TeacherPosition,
    pub phone: String,
    pub account_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTeacherRequest {
    pub fio: String,
    #[serde(default)]
    pub position: TeacherPosition,
    pub phone: String,
    pub account_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTeacherRequest {
    pub fio: Option<String>,
    pub position: Option<TeacherPosition>,
    pub phone: Option<String>,
    #[serde(default, with = "crate::models::nullable")]
    pub account_id: Option<Option<i64>>,
}

/// Filters accepted by the teacher list
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TeacherFilter {
    pub search: Option<String>,
    pub position: Option<TeacherPosition>,
    pub group: Option<i64>,
}
