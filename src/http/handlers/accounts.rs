//! Account administration (superuser only)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use super::HandlerResult;
use crate::http::{AppState, CurrentUser};
use crate::models::{
    AccountFilter, AccountWithRoles, ChangePasswordRequest, CreateAccountRequest, PageRequest,
    UpdateAccountRequest,
};
use crate::services::accounts::AccountList;
use crate::utils::errors::KindergartenError;

pub async fn list_accounts(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Query(filter): Query<AccountFilter>,
    Query(page): Query<PageRequest>,
) -> HandlerResult<AccountList> {
    Ok(Json(state.services.accounts.list(&principal, &filter, &page).await?))
}

pub async fn get_account(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<i64>,
) -> HandlerResult<AccountWithRoles> {
    Ok(Json(state.services.accounts.get(&principal, id).await?))
}

pub async fn create_account(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Json(request): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<AccountWithRoles>), KindergartenError> {
    let account = state.services.accounts.create(&principal, request).await?;
    Ok((StatusCode::CREATED, Json(account)))
}

pub async fn update_account(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<i64>,
    Json(request): Json<UpdateAccountRequest>,
) -> HandlerResult<AccountWithRoles> {
    Ok(Json(state.services.accounts.update(&principal, id, request).await?))
}

pub async fn change_password(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<i64>,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<StatusCode, KindergartenError> {
    state.services.accounts.change_password(&principal, id, request).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn activate_account(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<i64>,
) -> HandlerResult<AccountWithRoles> {
    Ok(Json(state.services.accounts.activate(&principal, id).await?))
}

pub async fn deactivate_account(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<i64>,
) -> HandlerResult<AccountWithRoles> {
    Ok(Json(state.services.accounts.deactivate(&principal, id).await?))
}

pub async fn delete_account(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, KindergartenError> {
    state.services.accounts.delete(&principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
