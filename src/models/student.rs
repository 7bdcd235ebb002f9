//! Student model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::utils::helpers::age_on;

/// Youngest age accepted at enrolment
pub const MIN_ENROLLMENT_AGE: i32 = 2;

/// Oldest age accepted at enrolment
pub const MAX_ENROLLMENT_AGE: i32 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn label(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Student {
    pub id: i64,
    pub fio: String,
    pub birthday: NaiveDate,
    pub gender: Gender,
    pub address: String,
    pub date_in: NaiveDate,
    pub date_out: Option<NaiveDate>,
    pub group_id: Option<i64>,
}

impl Student {
    /// Age in full years on the given day
    pub fn age(&self, today: NaiveDate) -> i32 {
        age_on(self.birthday, today)
    }

    /// Age in full years on the enrolment date
    pub fn age_at_entry(&self) -> i32 {
        age_on(self.birthday, self.date_in)
    }

    /// A student stays active until an exit date is recorded
    pub fn is_active(&self) -> bool {
        self.date_out.is_none()
    }

    pub fn status_label(&self) -> &'static str {
        if self.is_active() {
            "Active"
        } else {
            "Graduated"
        }
    }
}

/// A student row joined with the name of their group
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StudentWithGroup {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub student: Student,
    pub group_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateStudentRequest {
    pub fio: String,
    pub birthday: NaiveDate,
    pub gender: Gender,
    #[serde(default)]
    pub address: String,
    pub date_in: NaiveDate,
    pub date_out: Option<NaiveDate>,
    pub group_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateStudentRequest {
    pub fio: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub address: Option<String>,
    pub date_in: Option<NaiveDate>,
    #[serde(default, with = "crate::models::nullable")]
    pub date_out: Option<Option<NaiveDate>>,
    #[serde(default, with = "crate::models::nullable")]
    pub group_id: Option<Option<i64>>,
}

/// `active` students have no exit date, `graduated` ones do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudentStatus {
    Active,
    Graduated,
}

/// Filters accepted by the student list
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudentFilter {
    pub search: Option<String>,
    pub group: Option<i64>,
    pub status: Option<StudentStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn student(birthday: NaiveDate, date_in: NaiveDate) -> Student {
        Student {
            id: 1,
            fio: "Ivanova Anna".to_string(),
            birthday,
            gender: Gender::Female,
            address: String::new(),
            date_in,
            date_out: None,
            group_id: None,
        }
    }

    #[test]
    fn test_status_follows_exit_date() {
        let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap();
        let mut s = student(d(2019, 4, 1), d(2022, 9, 1));
        assert!(s.is_active());
        assert_eq!(s.status_label(), "Active");

        s.date_out = Some(d(2025, 6, 1));
        assert!(!s.is_active());
        assert_eq!(s.status_label(), "Graduated");
        assert_eq!(s.age_at_entry(), 3);
    }

    proptest! {
        #[test]
        fn age_never_decreases_over_time(days in 0i64..4000, extra in 0i64..800) {
            let born = NaiveDate::from_ymd_opt(2015, 1, 1).unwrap();
            let first = born + chrono::Duration::days(days);
            let later = first + chrono::Duration::days(extra);
            let s = student(born, first);
            prop_assert!(s.age(later) >= s.age(first));
        }
    }
}
