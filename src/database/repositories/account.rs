//! Account repository implementation

use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use crate::database::repositories::{push_limits, push_search};
use crate::models::account::{
    Account, AccountCounts, AccountFilter, AccountRole, AccountRoleFilter, AccountStatus,
};
use crate::models::teacher::TeacherPosition;
use crate::utils::errors::Result;

const ACCOUNT_COLUMNS: &str =
    "a.id, a.username, a.email, a.password_hash, a.is_superuser, a.is_active, a.created_at, a.updated_at";

/// Everything needed to insert an account in one go
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_superuser: bool,
    pub role: Option<AccountRole>,
    /// Name and phone for the teacher or parent profile created alongside
    pub profile: Option<(String, String)>,
}

#[derive(Clone)]
pub struct AccountRepository {
    pool: PgPool,
}

impl AccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create an account, its role membership and the matching profile
    pub async fn create(&self, new: NewAccount) -> Result<Account> {
        let mut tx = self.pool.begin().await?;

        let account = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (username, email, password_hash, is_superuser)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, email, password_hash, is_superuser, is_active, created_at, updated_at
            "#,
        )
        .bind(new.username.trim())
        .bind(new.email.trim())
        .bind(&new.password_hash)
        .bind(new.is_superuser)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(role) = new.role {
            insert_roles(&mut tx, account.id, &[role]).await?;

            if let Some((full_name, phone)) = new.profile {
                match role {
                    AccountRole::Teacher => {
                        sqlx::query("INSERT INTO teachers (fio, position, phone, account_id) VALUES ($1, $2, $3, $4)")
                            .bind(full_name)
                            .bind(TeacherPosition::Teacher)
                            .bind(phone)
                            .bind(account.id)
                            .execute(&mut *tx)
                            .await?;
                    }
                    AccountRole::Parent => {
                        sqlx::query("INSERT INTO parents (fio, phone, account_id) VALUES ($1, $2, $3)")
                            .bind(full_name)
                            .bind(phone)
                            .bind(account.id)
                            .execute(&mut *tx)
                            .await?;
                    }
                    AccountRole::Director => {}
                }
            }
        }

        tx.commit().await?;
        Ok(account)
    }

    /// Find account by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(&format!("SELECT {ACCOUNT_COLUMNS} FROM accounts a WHERE a.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(account)
    }

    /// Find account by username
    pub async fn find_by_username(&self, username: &str) -> Result<Option<Account>> {
        let account =
            sqlx::query_as::<_, Account>(&format!("SELECT {ACCOUNT_COLUMNS} FROM accounts a WHERE a.username = $1"))
                .bind(username)
                .fetch_optional(&self.pool)
                .await?;

        Ok(account)
    }

    /// Role memberships of an account
    pub async fn roles_of(&self, account_id: i64) -> Result<Vec<AccountRole>> {
        let roles = sqlx::query_scalar::<_, AccountRole>(
            "SELECT role FROM account_roles WHERE account_id = $1 ORDER BY role",
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(roles)
    }

    /// Role memberships of several accounts at once
    pub async fn roles_for(&self, account_ids: &[i64]) -> Result<Vec<(i64, AccountRole)>> {
        let rows = sqlx::query_as::<_, (i64, AccountRole)>(
            "SELECT account_id, role FROM account_roles WHERE account_id = ANY($1) ORDER BY account_id, role",
        )
        .bind(account_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Update e-mail, active flag and, when given, the role set in one
    /// transaction
    pub async fn update(
        &self,
        id: i64,
        email: Option<String>,
        is_active: Option<bool>,
        roles: Option<&[AccountRole]>,
    ) -> Result<Option<Account>> {
        let mut tx = self.pool.begin().await?;

        let account = sqlx::query_as::<_, Account>(
            r#"
            UPDATE accounts
            SET email = COALESCE($2, email),
                is_active = COALESCE($3, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, username, email, password_hash, is_superuser, is_active, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(email)
        .bind(is_active)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(account) = account else {
            return Ok(None);
        };

        if let Some(roles) = roles {
            sqlx::query("DELETE FROM account_roles WHERE account_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            insert_roles(&mut tx, id, roles).await?;
        }

        tx.commit().await?;
        Ok(Some(account))
    }

    /// Store a new password hash
    pub async fn set_password(&self, id: i64, password_hash: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE accounts SET password_hash = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete account; linked profiles stay and lose the link
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// List accounts, newest first
    pub async fn list(&self, filter: &AccountFilter, limit: i64, offset: i64) -> Result<Vec<Account>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {ACCOUNT_COLUMNS} FROM accounts a"));
        push_filters(&mut qb, filter);
        qb.push(" ORDER BY a.created_at DESC, a.id DESC");
        push_limits(&mut qb, limit, offset);

        let accounts = qb.build_query_as::<Account>().fetch_all(&self.pool).await?;
        Ok(accounts)
    }

    /// Count accounts matching the list filters
    pub async fn count(&self, filter: &AccountFilter) -> Result<i64> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM accounts a");
        push_filters(&mut qb, filter);

        let count: i64 = qb.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(count)
    }

    /// Number of accounts per role
    pub async fn counts(&self) -> Result<AccountCounts> {
        let counts = sqlx::query_as::<_, AccountCounts>(
            r#"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE a.is_superuser) AS superusers,
                   COUNT(*) FILTER (WHERE EXISTS (SELECT 1 FROM account_roles r WHERE r.account_id = a.id AND r.role = 'director')) AS directors,
                   COUNT(*) FILTER (WHERE EXISTS (SELECT 1 FROM account_roles r WHERE r.account_id = a.id AND r.role = 'teacher')) AS teachers,
                   COUNT(*) FILTER (WHERE EXISTS (SELECT 1 FROM account_roles r WHERE r.account_id = a.id AND r.role = 'parent')) AS parents,
                   COUNT(*) FILTER (WHERE NOT a.is_active) AS inactive
            FROM accounts a
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(counts)
    }
}

async fn insert_roles(conn: &mut PgConnection, account_id: i64, roles: &[AccountRole]) -> Result<()> {
    for role in roles {
        sqlx::query("INSERT INTO account_roles (account_id, role) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(account_id)
            .bind(*role)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &AccountFilter) {
    qb.push(" WHERE TRUE");
    if let Some(term) = filter.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        let pattern = crate::utils::helpers::like_pattern(term);
        qb.push(" AND (a.username ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR a.email ILIKE ");
        qb.push_bind(pattern);
        qb.push(")");
    }
    match filter.role {
        Some(AccountRoleFilter::Superuser) => {
            qb.push(" AND a.is_superuser");
        }
        Some(AccountRoleFilter::Director) => push_role(qb, AccountRole::Director),
        Some(AccountRoleFilter::Teacher) => push_role(qb, AccountRole::Teacher),
        Some(AccountRoleFilter::Parent) => push_role(qb, AccountRole::Parent),
        Some(AccountRoleFilter::None) => {
            qb.push(" AND NOT a.is_superuser AND NOT EXISTS (SELECT 1 FROM account_roles r WHERE r.account_id = a.id)");
        }
        None => {}
    }
    match filter.status {
        Some(AccountStatus::Active) => {
            qb.push(" AND a.is_active");
        }
        Some(AccountStatus::Inactive) => {
            qb.push(" AND NOT a.is_active");
        }
        None => {}
    }
}

fn push_role(qb: &mut QueryBuilder<'_, Postgres>, role: AccountRole) {
    qb.push(" AND EXISTS (SELECT 1 FROM account_roles r WHERE r.account_id = a.id AND r.role = ");
    qb.push_bind(role);
    qb.push(")");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_filters() {
        let filter = AccountFilter {
            search: Some("anna".to_string()),
            role: Some(AccountRoleFilter::Teacher),
            status: Some(AccountStatus::Inactive),
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM accounts a");
        push_filters(&mut qb, &filter);

        let sql = qb.sql();
        assert!(sql.contains("a.username ILIKE $1 OR a.email ILIKE $2"));
        assert!(sql.contains("r.role = $3"));
        assert!(sql.ends_with("AND NOT a.is_active"));
    }
}
