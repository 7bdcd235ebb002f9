//! Group model

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Hard upper bound for any group's capacity
pub const MAX_GROUP_CAPACITY: i32 = 30;

/// Age category of a kindergarten group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AgeCategory {
    /// 2-3 years
    Nursery,
    /// 3-4 years
    Junior,
    /// 4-5 years
    Middle,
    /// 5-7 years
    Preparatory,
}

impl AgeCategory {
    pub fn label(&self) -> &'static str {
        match self {
            AgeCategory::Nursery => "Nursery (2-3 years)",
            AgeCategory::Junior => "Junior (3-4 years)",
            AgeCategory::Middle => "Middle (4-5 years)",
            AgeCategory::Preparatory => "Preparatory (5-7 years)",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Group {
    pub id: i64,
    pub name: String,
    pub category: AgeCategory,
    pub year: i32,
    pub teacher_id: Option<i64>,
    pub room: String,
    pub max_capacity: i32,
}

/// A group together with its derived occupancy
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GroupOccupancy {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub group: Group,
    pub teacher_fio: Option<String>,
    pub current_students_count: i64,
}

impl GroupOccupancy {
    pub fn available_places(&self) -> i64 {
        (i64::from(self.group.max_capacity) - self.current_students_count).max(0)
    }

    pub fn is_full(&self) -> bool {
        self.current_students_count >= i64::from(self.group.max_capacity)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
    pub category: AgeCategory,
    pub year: i32,
    pub teacher_id: Option<i64>,
    pub room: Option<String>,
    pub max_capacity: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateGroupRequest {
    pub name: Option<String>,
    pub category: Option<AgeCategory>,
    pub year: Option<i32>,
    /// `Some(None)` detaches the teacher
    #[serde(default, with = "crate::models::nullable")]
    pub teacher_id: Option<Option<i64>>,
    pub room: Option<String>,
    pub max_capacity: Option<i32>,
}

/// Filters accepted by the group list
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroupFilter {
    pub search: Option<String>,
    pub category: Option<AgeCategory>,
    pub year: Option<i32>,
    pub teacher: Option<i64>,
}
