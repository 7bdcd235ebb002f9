//! Dashboards and chart datasets
//!
//! The landing dashboard depends on the role: parents see their children,
//! teachers see their groups, directors and superusers see the whole
//! kindergarten. Chart and statistics endpoints are admin-only.

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use serde_json::Value;

use crate::access::policy::{self, Action};
use crate::access::{AccessScope, Principal, Role};
use crate::config::ReportsConfig;
use crate::database::repositories::reports::{AttendanceTotals, GroupDayStats, HomeTotals, StudentTotals};
use crate::database::DatabaseService;
use crate::models::StudentWithGroup;
use crate::reports::stats::{self, attendance_rate, fill_percentage, AgeBucket, DayPoint};
use crate::services::groups::GroupSummary;
use crate::services::reports::group_stats_json;
use crate::utils::errors::Result;
use crate::utils::helpers::today;

#[derive(Debug, Clone, Serialize)]
pub struct ChildSummary {
    pub student_id: i64,
    pub fio: String,
    pub age: i32,
    pub group_name: Option<String>,
    pub status: &'static str,
    pub present: i64,
    pub absent: i64,
    pub attendance_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Dashboard {
    Parent {
        children: Vec<ChildSummary>,
    },
    Teacher {
        groups_count: usize,
        students_count: i64,
        #[serde(flatten)]
        recent: AttendanceTotals,
        attendance_rate: f64,
        groups: Vec<Value>,
    },
    Admin {
        #[serde(flatten)]
        totals: HomeTotals,
        attendance_trend: Vec<DayPoint>,
        age_distribution: Vec<AgeBucket>,
        group_capacity: Vec<CapacityPoint>,
        group_attendance_today: Vec<Value>,
    },
    /// Accounts without a role see nothing but the global counters
    Empty,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapacityPoint {
    pub group_name: String,
    pub current_students_count: i64,
    pub max_capacity: i32,
    pub fill_percentage: f64,
}

/// Label/value series ready for a chart widget
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset<T> {
    pub labels: Vec<String>,
    pub data: Vec<T>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttendanceChart {
    pub labels: Vec<String>,
    pub present: Vec<i64>,
    pub absent: Vec<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Charts {
    pub attendance_chart: AttendanceChart,
    pub age_chart: Dataset<i64>,
    pub capacity_chart: Dataset<f64>,
    pub group_stats: Vec<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Statistics {
    #[serde(flatten)]
    pub totals: HomeTotals,
    pub groups: Vec<GroupSummary>,
    pub attendance_rates: Dataset<f64>,
}

#[derive(Clone)]
pub struct DashboardService {
    db: DatabaseService,
    recent_days: i64,
    trend_days: i64,
}

impl DashboardService {
    pub fn new(db: DatabaseService, config: &ReportsConfig) -> Self {
        Self {
            db,
            recent_days: config.recent_days,
            trend_days: config.trend_days,
        }
    }

    pub async fn dashboard(&self, principal: &Principal) -> Result<Dashboard> {
        let on = today();
        let recent_from = on - Duration::days(self.recent_days);
        let scope = principal.scope();

        match principal.role {
            Role::Parent => {
                let Some(parent_id) = principal.parent_id else {
                    return Ok(Dashboard::Parent { children: Vec::new() });
                };
                let children = self.db.parents.children(parent_id).await?;
                let totals = self.db.reports.per_student(scope, recent_from, on, false).await?;
                Ok(Dashboard::Parent { children: child_summaries(&children, &totals, on) })
            }
            Role::Teacher => {
                let groups = self.db.reports.groups_on(scope, on).await?;
                let recent = self.db.reports.totals(scope, recent_from, on).await?;
                Ok(Dashboard::Teacher {
                    groups_count: groups.len(),
                    students_count: groups.iter().map(|g| g.current_students_count).sum(),
                    attendance_rate: attendance_rate(&recent, 1),
                    recent,
                    groups: group_stats_json(&groups),
                })
            }
            Role::Superuser | Role::Director => {
                let totals = self.db.reports.home_totals(on).await?;
                let trend = self.trend(AccessScope::All, on).await?;
                let birthdays = self.db.students.active_birthdays(AccessScope::All).await?;
                let groups = self.db.reports.groups_on(AccessScope::All, on).await?;
                Ok(Dashboard::Admin {
                    totals,
                    attendance_trend: trend,
                    age_distribution: stats::age_buckets(&birthdays, on),
                    group_capacity: capacity_points(&groups),
                    group_attendance_today: group_stats_json(&groups),
                })
            }
            Role::None => Ok(Dashboard::Empty),
        }
    }

    /// Chart datasets for the director dashboard
    pub async fn charts(&self, principal: &Principal) -> Result<Charts> {
        policy::require(principal, Action::ViewAdminStats)?;
        let on = today();

        let trend = self.trend(AccessScope::All, on).await?;
        let birthdays = self.db.students.active_birthdays(AccessScope::All).await?;
        let groups = self.db.reports.groups_on(AccessScope::All, on).await?;

        let ages = stats::age_buckets(&birthdays, on);
        let capacity = capacity_points(&groups);

        Ok(Charts {
            attendance_chart: AttendanceChart {
                labels: trend.iter().map(|p| p.label.clone()).collect(),
                present: trend.iter().map(|p| p.present).collect(),
                absent: trend.iter().map(|p| p.absent).collect(),
            },
            age_chart: Dataset {
                labels: ages.iter().map(|b| b.label.to_string()).collect(),
                data: ages.iter().map(|b| b.count).collect(),
            },
            capacity_chart: Dataset {
                labels: capacity.iter().map(|c| c.group_name.clone()).collect(),
                data: capacity.iter().map(|c| c.fill_percentage).collect(),
            },
            group_stats: group_stats_json(&groups),
        })
    }

    /// Totals, occupancy and the attendance-rate trend
    pub async fn statistics(&self, principal: &Principal) -> Result<Statistics> {
        policy::require(principal, Action::ViewAdminStats)?;
        let on = today();

        let totals = self.db.reports.home_totals(on).await?;
        let groups = self.db.groups.all_in_scope(AccessScope::All).await?;
        let trend = self.trend(AccessScope::All, on).await?;

        Ok(Statistics {
            totals,
            groups: groups.into_iter().map(GroupSummary::from).collect(),
            attendance_rates: Dataset {
                labels: trend.iter().map(|p| p.label.clone()).collect(),
                data: trend.iter().map(|p| p.rate).collect(),
            },
        })
    }

    /// Kindergarten-wide counters, available to every signed-in account
    pub async fn home(&self) -> Result<HomeTotals> {
        self.db.reports.home_totals(today()).await
    }

    async fn trend(&self, scope: AccessScope, on: NaiveDate) -> Result<Vec<DayPoint>> {
        let from = on - Duration::days(self.trend_days - 1);
        let rows = self.db.reports.daily(scope, from, on).await?;
        Ok(stats::daily_series(&rows, on, self.trend_days))
    }
}

fn capacity_points(groups: &[GroupDayStats]) -> Vec<CapacityPoint> {
    groups
        .iter()
        .map(|g| CapacityPoint {
            group_name: g.group_name.clone(),
            current_students_count: g.current_students_count,
            max_capacity: g.max_capacity,
            fill_percentage: fill_percentage(g.current_students_count, g.max_capacity),
        })
        .collect()
}

/// Children with their recent attendance; children without records get zeros
fn child_summaries(children: &[StudentWithGroup], totals: &[StudentTotals], on: NaiveDate) -> Vec<ChildSummary> {
    let by_student: HashMap<i64, AttendanceTotals> =
        totals.iter().map(|t| (t.student_id, t.totals)).collect();

    children
        .iter()
        .map(|child| {
            let recent = by_student.get(&child.student.id).copied().unwrap_or_default();
            ChildSummary {
                student_id: child.student.id,
                fio: child.student.fio.clone(),
                age: child.student.age(on),
                group_name: child.group_name.clone(),
                status: child.student.status_label(),
                present: recent.present,
                absent: recent.absent,
                attendance_rate: attendance_rate(&recent, 1),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Gender, Student};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_child_summaries_default_to_zero() {
        let child = |id: i64| StudentWithGroup {
            student: Student {
                id,
                fio: format!("Child {}", id),
                birthday: d(2020, 1, 15),
                gender: Gender::Male,
                address: String::new(),
                date_in: d(2023, 9, 1),
                date_out: None,
                group_id: None,
            },
            group_name: None,
        };
        let totals = vec![StudentTotals {
            student_id: 1,
            student_fio: "Child 1".into(),
            group_name: None,
            totals: AttendanceTotals { present: 18, absent: 2 },
        }];

        let summaries = child_summaries(&[child(1), child(2)], &totals, d(2024, 3, 1));
        assert_eq!(summaries[0].attendance_rate, 90.0);
        assert_eq!(summaries[0].age, 4);
        assert_eq!(summaries[1].present, 0);
        assert_eq!(summaries[1].attendance_rate, 0.0);
    }

    #[test]
    fn test_capacity_points() {
        let groups = vec![GroupDayStats {
            group_id: 4,
            group_name: "Stars".into(),
            teacher_fio: Some("Olga".into()),
            max_capacity: 25,
            current_students_count: 10,
            totals: AttendanceTotals::default(),
        }];
        let points = capacity_points(&groups);
        assert_eq!(points[0].fill_percentage, 40.0);
    }

    #[test]
    fn test_dashboard_is_tagged_by_role() {
        let value = serde_json::to_value(Dashboard::Parent { children: vec![] }).unwrap();
        assert_eq!(value["role"], "parent");
        assert!(value["children"].as_array().unwrap().is_empty());

        let value = serde_json::to_value(Dashboard::Empty).unwrap();
        assert_eq!(value["role"], "empty");
    }
}
