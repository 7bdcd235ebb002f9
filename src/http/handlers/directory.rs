//! Students, teachers, groups, parents and search

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use super::HandlerResult;
use crate::http::{AppState, CurrentUser};
use crate::models::{
    CreateGroupRequest, CreateParentRequest, CreateStudentRequest, CreateTeacherRequest, Group,
    GroupFilter, LinkStudentParentRequest, Page, PageRequest, Parent, ParentFilter, Student,
    StudentFilter, StudentParent, StudentWithGroup, Teacher, TeacherFilter, UpdateGroupRequest,
    UpdateParentRequest, UpdateStudentRequest, UpdateTeacherRequest,
};
use crate::services::groups::{GroupDetail, GroupSummary};
use crate::services::parents::ParentDetail;
use crate::services::search::SearchResults;
use crate::services::students::StudentDetail;
use crate::services::teachers::TeacherDetail;
use crate::utils::errors::KindergartenError;

type Created<T> = Result<(StatusCode, Json<T>), KindergartenError>;
type Deleted = Result<StatusCode, KindergartenError>;

// =============================================================================
// Students
// =============================================================================

pub async fn list_students(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Query(filter): Query<StudentFilter>,
    Query(page): Query<PageRequest>,
) -> HandlerResult<Page<StudentWithGroup>> {
    Ok(Json(state.services.students.list(&principal, &filter, &page).await?))
}

pub async fn get_student(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<i64>,
) -> HandlerResult<StudentDetail> {
    Ok(Json(state.services.students.get(&principal, id).await?))
}

pub async fn create_student(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Json(request): Json<CreateStudentRequest>,
) -> Created<Student> {
    let student = state.services.students.create(&principal, request).await?;
    Ok((StatusCode::CREATED, Json(student)))
}

pub async fn update_student(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<i64>,
    Json(request): Json<UpdateStudentRequest>,
) -> HandlerResult<Student> {
    Ok(Json(state.services.students.update(&principal, id, request).await?))
}

pub async fn delete_student(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<i64>,
) -> Deleted {
    state.services.students.delete(&principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Body of `POST /api/students/{id}/parents`; the student comes from the path
#[derive(Debug, Deserialize)]
pub struct AddParentBody {
    pub parent_id: i64,
    pub relationship: crate::models::Relationship,
    #[serde(default = "default_primary")]
    pub is_primary: bool,
}

fn default_primary() -> bool {
    true
}

pub async fn add_student_parent(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(student_id): Path<i64>,
    Json(body): Json<AddParentBody>,
) -> Created<StudentParent> {
    let request = LinkStudentParentRequest {
        student_id,
        parent_id: body.parent_id,
        relationship: body.relationship,
        is_primary: body.is_primary,
    };
    let link = state.services.students.add_parent(&principal, request).await?;
    Ok((StatusCode::CREATED, Json(link)))
}

pub async fn remove_student_parent(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(link_id): Path<i64>,
) -> Deleted {
    state.services.students.remove_parent(&principal, link_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Teachers
// =============================================================================

pub async fn list_teachers(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Query(filter): Query<TeacherFilter>,
    Query(page): Query<PageRequest>,
) -> HandlerResult<Page<Teacher>> {
    Ok(Json(state.services.teachers.list(&principal, &filter, &page).await?))
}

pub async fn get_teacher(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<i64>,
) -> HandlerResult<TeacherDetail> {
    Ok(Json(state.services.teachers.get(&principal, id).await?))
}

pub async fn create_teacher(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Json(request): Json<CreateTeacherRequest>,
) -> Created<Teacher> {
    let teacher = state.services.teachers.create(&principal, request).await?;
    Ok((StatusCode::CREATED, Json(teacher)))
}

pub async fn update_teacher(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<i64>,
    Json(request): Json<UpdateTeacherRequest>,
) -> HandlerResult<Teacher> {
    Ok(Json(state.services.teachers.update(&principal, id, request).await?))
}

pub async fn delete_teacher(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<i64>,
) -> Deleted {
    state.services.teachers.delete(&principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Groups
// =============================================================================

pub async fn list_groups(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Query(filter): Query<GroupFilter>,
    Query(page): Query<PageRequest>,
) -> HandlerResult<Page<GroupSummary>> {
    Ok(Json(state.services.groups.list(&principal, &filter, &page).await?))
}

pub async fn get_group(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<i64>,
) -> HandlerResult<GroupDetail> {
    Ok(Json(state.services.groups.get(&principal, id).await?))
}

pub async fn create_group(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Json(request): Json<CreateGroupRequest>,
) -> Created<Group> {
    let group = state.services.groups.create(&principal, request).await?;
    Ok((StatusCode::CREATED, Json(group)))
}

pub async fn update_group(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<i64>,
    Json(request): Json<UpdateGroupRequest>,
) -> HandlerResult<Group> {
    Ok(Json(state.services.groups.update(&principal, id, request).await?))
}

pub async fn delete_group(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<i64>,
) -> Deleted {
    state.services.groups.delete(&principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Parents
// =============================================================================

pub async fn list_parents(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Query(filter): Query<ParentFilter>,
    Query(page): Query<PageRequest>,
) -> HandlerResult<Page<Parent>> {
    Ok(Json(state.services.parents.list(&principal, &filter, &page).await?))
}

pub async fn get_parent(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<i64>,
) -> HandlerResult<ParentDetail> {
    Ok(Json(state.services.parents.get(&principal, id).await?))
}

pub async fn create_parent(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Json(request): Json<CreateParentRequest>,
) -> Created<Parent> {
    let parent = state.services.parents.create(&principal, request).await?;
    Ok((StatusCode::CREATED, Json(parent)))
}

pub async fn update_parent(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<i64>,
    Json(request): Json<UpdateParentRequest>,
) -> HandlerResult<Parent> {
    Ok(Json(state.services.parents.update(&principal, id, request).await?))
}

pub async fn delete_parent(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<i64>,
) -> Deleted {
    state.services.parents.delete(&principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Search
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

pub async fn search(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Query(query): Query<SearchQuery>,
) -> HandlerResult<SearchResults> {
    Ok(Json(state.services.search.search(&principal, &query.q).await?))
}
