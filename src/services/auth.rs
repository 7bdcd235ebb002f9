//! Authentication service implementation
//!
//! This service handles password hashing, token issuing and verification,
//! and turning an account into the [`Principal`] a request runs as.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::access::{resolve_role, Principal, Role};
use crate::config::AuthConfig;
use crate::database::DatabaseService;
use crate::models::{Parent, Teacher};
use crate::utils::errors::{KindergartenError, Result};

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Account ID
    pub sub: i64,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub principal: Principal,
}

/// The principal plus whatever profile it is linked to
#[derive(Debug, Clone, Serialize)]
pub struct MeResponse {
    pub principal: Principal,
    pub teacher: Option<Teacher>,
    pub parent: Option<Parent>,
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    db: DatabaseService,
    token_ttl_hours: i64,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl AuthService {
    /// Create a new AuthService instance
    pub fn new(db: DatabaseService, config: &AuthConfig) -> Self {
        Self {
            db,
            token_ttl_hours: config.token_ttl_hours,
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        }
    }

    /// Check credentials and issue a token
    pub async fn login(&self, request: LoginRequest) -> Result<TokenResponse> {
        let username = request.username.trim();
        debug!(username = %username, "Login attempt");

        let account = match self.db.accounts.find_by_username(username).await? {
            Some(account) => account,
            None => {
                warn!(username = %username, "Login failed: unknown username");
                return Err(invalid_credentials());
            }
        };

        if !verify_password(&request.password, &account.password_hash)? {
            warn!(account_id = account.id, "Login failed: wrong password");
            return Err(invalid_credentials());
        }

        if !account.is_active {
            warn!(account_id = account.id, "Login failed: account is inactive");
            return Err(KindergartenError::Authentication("Account is inactive".to_string()));
        }

        let principal = self.load_principal(account.id).await?;
        let access_token = self.issue_token(account.id)?;

        info!(account_id = account.id, role = %principal.role, "User logged in");
        Ok(TokenResponse {
            access_token,
            token_type: "Bearer",
            expires_in: self.token_ttl_hours * 3600,
            principal,
        })
    }

    /// Resolve a bearer token to the principal it was issued for
    pub async fn authenticate(&self, token: &str) -> Result<Principal> {
        let claims = self.decode_token(token)?;
        let principal = self.load_principal(claims.sub).await?;

        if principal.role == Role::None {
            let inactive = self
                .db
                .accounts
                .find_by_id(principal.account_id)
                .await?
                .map_or(true, |account| !account.is_active);
            if inactive {
                return Err(KindergartenError::Authentication("Account is inactive".to_string()));
            }
        }

        Ok(principal)
    }

    /// Build the principal for an account
    pub async fn load_principal(&self, account_id: i64) -> Result<Principal> {
        let account = self
            .db
            .accounts
            .find_by_id(account_id)
            .await?
            .ok_or_else(|| KindergartenError::Authentication("Account no longer exists".to_string()))?;

        let memberships = self.db.accounts.roles_of(account.id).await?;
        let role = resolve_role(account.is_active, account.is_superuser, &memberships);

        let teacher_id = match role {
            Role::Teacher => self.db.teachers.find_by_account(account.id).await?.map(|t| t.id),
            _ => None,
        };
        let parent_id = match role {
            Role::Parent => self.db.parents.find_by_account(account.id).await?.map(|p| p.id),
            _ => None,
        };

        Ok(Principal {
            account_id: account.id,
            username: account.username,
            role,
            teacher_id,
            parent_id,
        })
    }

    /// The principal with its linked profile
    pub async fn me(&self, principal: &Principal) -> Result<MeResponse> {
        let teacher = match principal.teacher_id {
            Some(id) => self.db.teachers.find_by_id(id).await?,
            None => None,
        };
        let parent = match principal.parent_id {
            Some(id) => self.db.parents.find_by_id(id).await?,
            None => None,
        };

        Ok(MeResponse {
            principal: principal.clone(),
            teacher,
            parent,
        })
    }

    /// Sign a token for an account
    pub fn issue_token(&self, account_id: i64) -> Result<String> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: account_id,
            iat: now,
            exp: now + self.token_ttl_hours * 3600,
        };
        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)?;
        Ok(token)
    }

    /// Verify signature and expiry of a token
    pub fn decode_token(&self, token: &str) -> Result<Claims> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &Validation::default())?;
        Ok(data.claims)
    }
}

fn invalid_credentials() -> KindergartenError {
    KindergartenError::Authentication("Invalid username or password".to_string())
}

/// Hash a password into a PHC string
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| KindergartenError::PasswordHash(e.to_string()))?;
    Ok(hash.to_string())
}

/// Check a password against a stored PHC string
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| KindergartenError::PasswordHash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_round_trip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("wrong horse", &hash).unwrap());
    }

    #[tokio::test]
    async fn test_token_round_trip() {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/kindergarten_test")
            .unwrap();
        let config = AuthConfig {
            jwt_secret: "0123456789abcdef0123456789abcdef".to_string(),
            token_ttl_hours: 1,
        };
        let service = AuthService::new(DatabaseService::new(pool), &config);

        let token = service.issue_token(42).unwrap();
        let claims = service.decode_token(&token).unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.exp - claims.iat, 3600);
        assert!(service.decode_token("not.a.token").is_err());
    }

    #[test]
    fn test_malformed_hash_is_an_error() {
        assert!(verify_password("x", "not-a-hash").is_err());
    }
}
