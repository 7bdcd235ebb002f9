//! Event calendar service

use std::collections::HashMap;

use tracing::info;

use crate::access::policy::{self, Action};
use crate::access::{Principal, ScopedEntity};
use crate::database::DatabaseService;
use crate::models::{CreateEventRequest, Event, EventFilter, Page, PageRequest, UpdateEventRequest};
use crate::utils::errors::{KindergartenError, Result};

#[derive(Clone)]
pub struct EventService {
    db: DatabaseService,
    page_size: i64,
}

impl EventService {
    pub fn new(db: DatabaseService, page_size: i64) -> Self {
        Self { db, page_size }
    }

    pub async fn list(&self, principal: &Principal, filter: &EventFilter, page: &PageRequest) -> Result<Page<Event>> {
        let scope = principal.scope();
        let (limit, offset) = page.limits(self.page_size);

        let items = self.db.events.list(scope, filter, limit, offset).await?;
        let total = self.db.events.count(scope, filter).await?;
        Ok(Page::new(items, total, page, self.page_size))
    }

    pub async fn get(&self, principal: &Principal, id: i64) -> Result<Event> {
        let event = self.find(id).await?;
        self.db.ensure_visible(principal.scope(), ScopedEntity::Event, id).await?;
        Ok(event)
    }

    pub async fn create(&self, principal: &Principal, mut request: CreateEventRequest) -> Result<Event> {
        policy::require(principal, Action::ManageEvents)?;
        if request.title.trim().is_empty() {
            return Err(KindergartenError::invalid("Event title is required"));
        }
        request.group_ids.sort_unstable();
        request.group_ids.dedup();
        self.ensure_can_target(principal, &request.group_ids).await?;

        let event = self.db.events.create(request).await?;
        info!(account_id = principal.account_id, event_id = event.id, "Event created");
        Ok(event)
    }

    /// Edit an event; a teacher must own both the current and the new target groups
    pub async fn update(&self, principal: &Principal, id: i64, mut request: UpdateEventRequest) -> Result<Event> {
        policy::require(principal, Action::ManageEvents)?;
        if request.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(KindergartenError::invalid("Event title is required"));
        }

        let current = self.find(id).await?;
        self.ensure_can_target(principal, &current.group_ids).await?;
        if let Some(group_ids) = request.group_ids.as_mut() {
            group_ids.sort_unstable();
            group_ids.dedup();
            self.ensure_can_target(principal, group_ids).await?;
        }

        let event = self
            .db
            .events
            .update(id, request)
            .await?
            .ok_or_else(|| KindergartenError::not_found("Event", id))?;
        info!(account_id = principal.account_id, event_id = id, "Event updated");
        Ok(event)
    }

    pub async fn delete(&self, principal: &Principal, id: i64) -> Result<()> {
        policy::require(principal, Action::ManageEvents)?;

        let current = self.find(id).await?;
        self.ensure_can_target(principal, &current.group_ids).await?;

        self.db.events.delete(id).await?;
        info!(account_id = principal.account_id, event_id = id, "Event deleted");
        Ok(())
    }

    async fn find(&self, id: i64) -> Result<Event> {
        self.db
            .events
            .find_by_id(id)
            .await?
            .ok_or_else(|| KindergartenError::not_found("Event", id))
    }

    /// All target groups must exist, and the principal must be allowed to
    /// address every one of them
    async fn ensure_can_target(&self, principal: &Principal, group_ids: &[i64]) -> Result<()> {
        let teachers: HashMap<i64, Option<i64>> = self.db.groups.teachers_of(group_ids).await?.into_iter().collect();
        if let Some(missing) = group_ids.iter().find(|id| !teachers.contains_key(id)) {
            return Err(KindergartenError::invalid(format!("Group {} does not exist", missing)));
        }

        let group_teachers: Vec<Option<i64>> = group_ids.iter().map(|id| teachers[id]).collect();
        if policy::can_manage_event(principal, &group_teachers) {
            Ok(())
        } else {
            policy::deny(principal, "manage events for these groups")
        }
    }
}
