//! Account administration service
//!
//! Superuser-only management of login accounts and their role
//! memberships. Teacher and parent accounts get a linked profile on
//! creation.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, info};

use crate::access::policy::{self, Action};
use crate::access::Principal;
use crate::database::repositories::account::NewAccount;
use crate::database::DatabaseService;
use crate::models::{
    Account, AccountCounts, AccountFilter, AccountRole, AccountWithRoles, ChangePasswordRequest,
    CreateAccountRequest, Page, PageRequest, UpdateAccountRequest,
};
use crate::services::auth::hash_password;
use crate::utils::errors::{KindergartenError, Result};
use crate::utils::logging::log_account_action;

/// Shortest password accepted
pub const MIN_PASSWORD_LENGTH: usize = 8;

const ACCOUNTS_PAGE_SIZE: i64 = 20;

#[derive(Debug, Clone, Serialize)]
pub struct AccountList {
    #[serde(flatten)]
    pub page: Page<AccountWithRoles>,
    pub counts: AccountCounts,
}

#[derive(Clone)]
pub struct AccountService {
    db: DatabaseService,
}

impl AccountService {
    pub fn new(db: DatabaseService) -> Self {
        Self { db }
    }

    /// List accounts with role counts
    pub async fn list(&self, principal: &Principal, filter: &AccountFilter, page: &PageRequest) -> Result<AccountList> {
        policy::require(principal, Action::ManageAccounts)?;

        let (limit, offset) = page.limits(ACCOUNTS_PAGE_SIZE);
        let accounts = self.db.accounts.list(filter, limit, offset).await?;
        let total = self.db.accounts.count(filter).await?;
        let counts = self.db.accounts.counts().await?;

        let ids: Vec<i64> = accounts.iter().map(|a| a.id).collect();
        let mut roles: HashMap<i64, Vec<AccountRole>> = HashMap::new();
        for (account_id, role) in self.db.accounts.roles_for(&ids).await? {
            roles.entry(account_id).or_default().push(role);
        }

        let items = accounts
            .into_iter()
            .map(|account| {
                let roles = roles.remove(&account.id).unwrap_or_default();
                AccountWithRoles { account, roles }
            })
            .collect();

        Ok(AccountList {
            page: Page::new(items, total, page, ACCOUNTS_PAGE_SIZE),
            counts,
        })
    }

    /// Get one account
    pub async fn get(&self, principal: &Principal, id: i64) -> Result<AccountWithRoles> {
        policy::require(principal, Action::ManageAccounts)?;
        self.with_roles(self.find(id).await?).await
    }

    /// Create an account, optionally with a role and profile
    pub async fn create(&self, principal: &Principal, request: CreateAccountRequest) -> Result<AccountWithRoles> {
        policy::require(principal, Action::ManageAccounts)?;
        validate_username(&request.username)?;
        validate_password(&request.password)?;

        let profile = match request.role {
            Some(AccountRole::Teacher) | Some(AccountRole::Parent) => {
                let full_name = request
                    .full_name
                    .as_deref()
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .ok_or_else(|| KindergartenError::invalid("Full name is required for teacher and parent accounts"))?;
                Some((full_name.to_string(), request.phone.clone().unwrap_or_default()))
            }
            _ => None,
        };

        let account = self
            .db
            .accounts
            .create(NewAccount {
                username: request.username,
                email: request.email,
                password_hash: hash_password(&request.password)?,
                is_superuser: false,
                role: request.role,
                profile,
            })
            .await?;

        log_account_action(principal.account_id, "create_account", Some(&account.username));
        self.with_roles(account).await
    }

    /// Create a superuser; used from the command line
    pub async fn create_superuser(&self, username: &str, password: &str, email: Option<&str>) -> Result<Account> {
        validate_username(username)?;
        validate_password(password)?;

        let account = self
            .db
            .accounts
            .create(NewAccount {
                username: username.to_string(),
                email: email.unwrap_or_default().to_string(),
                password_hash: hash_password(password)?,
                is_superuser: true,
                role: None,
                profile: None,
            })
            .await?;

        info!(account_id = account.id, username = %account.username, "Superuser created");
        Ok(account)
    }

    /// Edit e-mail, active flag and role memberships
    pub async fn update(&self, principal: &Principal, id: i64, request: UpdateAccountRequest) -> Result<AccountWithRoles> {
        policy::require(principal, Action::ManageAccounts)?;
        self.find(id).await?;

        if request.is_active == Some(false) && id == principal.account_id {
            return Err(KindergartenError::invalid("You cannot deactivate your own account"));
        }
        if let Some(roles) = &request.roles {
            validate_roles(roles)?;
        }

        let account = self
            .db
            .accounts
            .update(id, request.email, request.is_active, request.roles.as_deref())
            .await?
            .ok_or_else(|| KindergartenError::not_found("Account", id))?;

        log_account_action(principal.account_id, "update_account", Some(&account.username));
        self.with_roles(account).await
    }

    /// Set a new password
    pub async fn change_password(&self, principal: &Principal, id: i64, request: ChangePasswordRequest) -> Result<()> {
        policy::require(principal, Action::ManageAccounts)?;
        validate_password(&request.password)?;

        let account = self.find(id).await?;
        self.db.accounts.set_password(id, &hash_password(&request.password)?).await?;

        log_account_action(principal.account_id, "change_password", Some(&account.username));
        Ok(())
    }

    /// Allow the account to log in again
    pub async fn activate(&self, principal: &Principal, id: i64) -> Result<AccountWithRoles> {
        self.update(
            principal,
            id,
            UpdateAccountRequest {
                is_active: Some(true),
                ..Default::default()
            },
        )
        .await
    }

    /// Block the account from logging in
    pub async fn deactivate(&self, principal: &Principal, id: i64) -> Result<AccountWithRoles> {
        self.update(
            principal,
            id,
            UpdateAccountRequest {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
    }

    /// Delete an account; never oneself and never a superuser
    pub async fn delete(&self, principal: &Principal, id: i64) -> Result<()> {
        policy::require(principal, Action::ManageAccounts)?;

        if id == principal.account_id {
            return Err(KindergartenError::invalid("You cannot delete your own account"));
        }
        let account = self.find(id).await?;
        if account.is_superuser {
            return Err(KindergartenError::forbidden("Superuser accounts cannot be deleted"));
        }

        self.db.accounts.delete(id).await?;
        log_account_action(principal.account_id, "delete_account", Some(&account.username));
        Ok(())
    }

    async fn find(&self, id: i64) -> Result<Account> {
        self.db
            .accounts
            .find_by_id(id)
            .await?
            .ok_or_else(|| KindergartenError::not_found("Account", id))
    }

    async fn with_roles(&self, account: Account) -> Result<AccountWithRoles> {
        let roles = self.db.accounts.roles_of(account.id).await?;
        debug!(account_id = account.id, roles = ?roles, "Loaded account roles");
        Ok(AccountWithRoles { account, roles })
    }
}

fn validate_username(username: &str) -> Result<()> {
    let username = username.trim();
    if username.is_empty() {
        return Err(KindergartenError::invalid("Username is required"));
    }
    if username.len() > 150 || username.chars().any(char::is_whitespace) {
        return Err(KindergartenError::invalid("Username must be at most 150 characters without spaces"));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(KindergartenError::invalid(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

/// A parent cannot also be staff, and a teacher cannot also be a director
pub fn validate_roles(roles: &[AccountRole]) -> Result<()> {
    let has = |role| roles.contains(&role);

    if has(AccountRole::Parent) && (has(AccountRole::Teacher) || has(AccountRole::Director)) {
        return Err(KindergartenError::invalid("A parent account cannot also be a teacher or director"));
    }
    if has(AccountRole::Teacher) && has(AccountRole::Director) {
        return Err(KindergartenError::invalid("A teacher account cannot also be a director"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_role_conflicts() {
        use AccountRole::*;

        assert!(validate_roles(&[]).is_ok());
        assert!(validate_roles(&[Director]).is_ok());
        assert!(validate_roles(&[Teacher]).is_ok());
        assert!(validate_roles(&[Parent]).is_ok());
        assert_matches!(validate_roles(&[Parent, Teacher]), Err(KindergartenError::InvalidInput(_)));
        assert_matches!(validate_roles(&[Director, Parent]), Err(KindergartenError::InvalidInput(_)));
        assert_matches!(validate_roles(&[Teacher, Director]), Err(KindergartenError::InvalidInput(_)));
    }

    #[test]
    fn test_credentials_validation() {
        assert!(validate_username("director").is_ok());
        assert!(validate_username("  ").is_err());
        assert!(validate_username("two words").is_err());
        assert!(validate_password("short").is_err());
        assert!(validate_password("long enough").is_ok());
    }
}
