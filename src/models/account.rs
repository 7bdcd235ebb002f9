//! Account model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Role membership an account may hold besides the superuser flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AccountRole {
    Director,
    Teacher,
    Parent,
}

impl AccountRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountRole::Director => "director",
            AccountRole::Teacher => "teacher",
            AccountRole::Parent => "parent",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Account {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_superuser: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Account with its role memberships
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountWithRoles {
    #[serde(flatten)]
    pub account: Account,
    pub roles: Vec<AccountRole>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAccountRequest {
    pub username: String,
    #[serde(default)]
    pub email: String,
    pub password: String,
    pub role: Option<AccountRole>,
    /// Profile name for teacher and parent accounts
    pub full_name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAccountRequest {
    pub email: Option<String>,
    pub is_active: Option<bool>,
    pub roles: Option<Vec<AccountRole>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangePasswordRequest {
    pub password: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Active,
    Inactive,
}

/// Role filter for the account list; `superuser` is not a membership
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountRoleFilter {
    Superuser,
    Director,
    Teacher,
    Parent,
    None,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountFilter {
    pub search: Option<String>,
    pub role: Option<AccountRoleFilter>,
    pub status: Option<AccountStatus>,
}

/// Number of accounts per role
#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow)]
pub struct AccountCounts {
    pub total: i64,
    pub superusers: i64,
    pub directors: i64,
    pub teachers: i64,
    pub parents: i64,
    pub inactive: i64,
}
