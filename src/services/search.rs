//! Scoped search across the directory

use serde::Serialize;

use crate::access::Principal;
use crate::database::DatabaseService;
use crate::models::{
    GroupFilter, GroupOccupancy, Parent, ParentFilter, StudentFilter, StudentWithGroup, Teacher,
    TeacherFilter,
};
use crate::utils::errors::Result;

/// Hits returned per entity
const SEARCH_LIMIT: i64 = 10;

/// Shorter terms return nothing
const MIN_TERM_LENGTH: usize = 2;

#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchResults {
    pub query: String,
    pub students: Vec<StudentWithGroup>,
    pub teachers: Vec<Teacher>,
    pub groups: Vec<GroupOccupancy>,
    pub parents: Vec<Parent>,
}

impl SearchResults {
    pub fn total(&self) -> usize {
        self.students.len() + self.teachers.len() + self.groups.len() + self.parents.len()
    }
}

#[derive(Clone)]
pub struct SearchService {
    db: DatabaseService,
}

impl SearchService {
    pub fn new(db: DatabaseService) -> Self {
        Self { db }
    }

    /// Search names of everything the principal can see
    pub async fn search(&self, principal: &Principal, query: &str) -> Result<SearchResults> {
        let term = query.trim();
        if term.chars().count() < MIN_TERM_LENGTH {
            return Ok(SearchResults {
                query: term.to_string(),
                ..Default::default()
            });
        }

        let scope = principal.scope();
        let search = Some(term.to_string());

        let students = self
            .db
            .students
            .list(scope, &StudentFilter { search: search.clone(), ..Default::default() }, SEARCH_LIMIT, 0)
            .await?;
        let teachers = self
            .db
            .teachers
            .list(scope, &TeacherFilter { search: search.clone(), ..Default::default() }, SEARCH_LIMIT, 0)
            .await?;
        let groups = self
            .db
            .groups
            .list(scope, &GroupFilter { search: search.clone(), ..Default::default() }, SEARCH_LIMIT, 0)
            .await?;
        let parents = self
            .db
            .parents
            .list(scope, &ParentFilter { search, ..Default::default() }, SEARCH_LIMIT, 0)
            .await?;

        tracing::debug!(account_id = principal.account_id, term = %term, "Directory search");
        Ok(SearchResults {
            query: term.to_string(),
            students,
            teachers,
            groups,
            parents,
        })
    }
}
