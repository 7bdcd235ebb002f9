//! Parent directory service

use serde::Serialize;
use tracing::info;

use crate::access::policy::{self, Action};
use crate::access::{Principal, ScopedEntity};
use crate::database::DatabaseService;
use crate::models::{
    CreateParentRequest, Page, PageRequest, Parent, ParentFilter, StudentParentLink,
    UpdateParentRequest,
};
use crate::utils::errors::{KindergartenError, Result};

#[derive(Debug, Clone, Serialize)]
pub struct ParentDetail {
    #[serde(flatten)]
    pub parent: Parent,
    pub children: Vec<StudentParentLink>,
}

#[derive(Clone)]
pub struct ParentService {
    db: DatabaseService,
    page_size: i64,
}

impl ParentService {
    pub fn new(db: DatabaseService, page_size: i64) -> Self {
        Self { db, page_size }
    }

    pub async fn list(&self, principal: &Principal, filter: &ParentFilter, page: &PageRequest) -> Result<Page<Parent>> {
        let scope = principal.scope();
        let (limit, offset) = page.limits(self.page_size);

        let items = self.db.parents.list(scope, filter, limit, offset).await?;
        let total = self.db.parents.count(scope, filter).await?;
        Ok(Page::new(items, total, page, self.page_size))
    }

    /// Parent with the children linked to them
    pub async fn get(&self, principal: &Principal, id: i64) -> Result<ParentDetail> {
        let parent = self
            .db
            .parents
            .find_by_id(id)
            .await?
            .ok_or_else(|| KindergartenError::not_found("Parent", id))?;
        let scope = principal.scope();
        self.db.ensure_visible(scope, ScopedEntity::Parent, id).await?;

        let children = self.db.parents.links_for_parent(scope, id).await?;
        Ok(ParentDetail { parent, children })
    }

    pub async fn create(&self, principal: &Principal, request: CreateParentRequest) -> Result<Parent> {
        policy::require(principal, Action::ManageDirectory)?;
        if request.fio.trim().is_empty() {
            return Err(KindergartenError::invalid("Full name is required"));
        }

        let parent = self.db.parents.create(request).await?;
        info!(account_id = principal.account_id, parent_id = parent.id, "Parent created");
        Ok(parent)
    }

    pub async fn update(&self, principal: &Principal, id: i64, request: UpdateParentRequest) -> Result<Parent> {
        policy::require(principal, Action::ManageDirectory)?;
        if request.fio.as_deref().is_some_and(|f| f.trim().is_empty()) {
            return Err(KindergartenError::invalid("Full name is required"));
        }

        let parent = self
            .db
            .parents
            .update(id, request)
            .await?
            .ok_or_else(|| KindergartenError::not_found("Parent", id))?;
        info!(account_id = principal.account_id, parent_id = id, "Parent updated");
        Ok(parent)
    }

    pub async fn delete(&self, principal: &Principal, id: i64) -> Result<()> {
        policy::require(principal, Action::ManageDirectory)?;

        if !self.db.parents.delete(id).await? {
            return Err(KindergartenError::not_found("Parent", id));
        }
        info!(account_id = principal.account_id, parent_id = id, "Parent deleted");
        Ok(())
    }
}
