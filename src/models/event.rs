//! Event model

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Holiday,
    Meeting,
    Excursion,
    Medical,
    #[default]
    Other,
}

impl EventType {
    pub fn label(&self) -> &'static str {
        match self {
            EventType::Holiday => "Holiday",
            EventType::Meeting => "Parent meeting",
            EventType::Excursion => "Excursion",
            EventType::Medical => "Medical check",
            EventType::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub event_date: NaiveDate,
    pub event_time: Option<NaiveTime>,
    pub event_type: EventType,
    /// Groups the event is addressed to; empty for kindergarten-wide events
    pub group_ids: Vec<i64>,
    pub created_at: DateTime<Utc>,
}

impl Event {
    pub fn is_global(&self) -> bool {
        self.group_ids.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEventRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub event_date: NaiveDate,
    pub event_time: Option<NaiveTime>,
    #[serde(default)]
    pub event_type: EventType,
    #[serde(default)]
    pub group_ids: Vec<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub event_date: Option<NaiveDate>,
    #[serde(default, with = "crate::models::nullable")]
    pub event_time: Option<Option<NaiveTime>>,
    pub event_type: Option<EventType>,
    pub group_ids: Option<Vec<i64>>,
}

/// Filters accepted by the event list
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub event_type: Option<EventType>,
    pub group: Option<i64>,
}
