//! Bearer tokens, password hashing and the request-level access gate.
//!
//! | Piece        | Purpose                                                   |
//! |--------------|-----------------------------------------------------------|
//! | `TokenKeys`  | HS256 issue/verify, keys built once from the config       |
//! | `AuthUser`   | Extractor for routes that require a signed-in caller      |
//! | `MaybeUser`  | Extractor for routes open to anonymous callers            |
//!
//! Both extractors re-load the account on every request, so a role change
//! applies to tokens that were issued before it.

use std::sync::Arc;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use fundraiser_core::{rbac, Operation, Role};

use crate::api::ApiState;
use crate::config::BootstrapAdmin;
use crate::db;
use crate::errors::{ApiError, Result};
use crate::models::User;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Signing and verification keys for session tokens.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: i64,
}

impl TokenKeys {
    pub fn new(secret: &str, ttl_secs: i64) -> Self {
        TokenKeys {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_secs,
        }
    }

    pub fn issue(&self, user: &User) -> Result<String> {
        let iat = Utc::now().timestamp();
        let claims = Claims {
            sub: user.id.clone(),
            role: user.role,
            iat,
            exp: iat + self.ttl_secs,
        };
        // Signing failures are server faults, not bad credentials.
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("token signing failed: {e}")))
    }

    /// Rejects tampered, foreign-keyed and expired tokens.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let validation = Validation::new(Algorithm::HS256);
        Ok(decode::<Claims>(token, &self.decoding, &validation)?.claims)
    }
}

// ─────────────────────────────────────────────────────────
// Passwords
// ─────────────────────────────────────────────────────────

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))
}

pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| ApiError::Internal(format!("stored password hash is invalid: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Create the configured super-admin unless that email is already taken.
pub async fn seed_superadmin(pool: &SqlitePool, admin: &BootstrapAdmin) -> Result<()> {
    if db::find_user_by_email(pool, &admin.email).await?.is_some() {
        debug!(email = %admin.email, "Super-admin already present");
        return Ok(());
    }

    let user = User {
        id: Uuid::new_v4().to_string(),
        name: admin.name.clone(),
        email: admin.email.clone(),
        password_hash: hash_password(&admin.password)?,
        role: Role::SuperAdmin,
        created_at: Utc::now(),
    };
    db::insert_user(pool, &user).await?;
    info!(user_id = %user.id, email = %user.email, "Seeded super-admin");
    Ok(())
}

// ─────────────────────────────────────────────────────────
// Extractors
// ─────────────────────────────────────────────────────────

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

async fn resolve(state: &ApiState, token: &str) -> Result<User> {
    let claims = state.tokens.verify(token)?;
    db::find_user_by_id(&state.pool, &claims.sub)
        .await?
        .ok_or_else(|| ApiError::Authentication("Account no longer exists".to_string()))
}

/// A signed-in caller.
pub struct AuthUser(pub User);

impl AuthUser {
    /// Fails with an authorization error unless the caller's role may
    /// perform `op`.
    pub fn require(&self, op: Operation) -> Result<()> {
        rbac::require(self.0.role, op).map_err(|e| {
            debug!(user_id = %self.0.id, role = %self.0.role, ?op, "Access denied");
            e.into()
        })
    }
}

#[axum::async_trait]
impl FromRequestParts<Arc<ApiState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<ApiState>,
    ) -> std::result::Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| ApiError::Authentication("Missing bearer token".to_string()))?;
        resolve(state, token).await.map(AuthUser)
    }
}

/// The caller, when a valid token was presented.
pub struct MaybeUser(pub Option<User>);

#[axum::async_trait]
impl FromRequestParts<Arc<ApiState>> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<ApiState>,
    ) -> std::result::Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(parts) else {
            return Ok(MaybeUser(None));
        };
        match resolve(state, token).await {
            Ok(user) => Ok(MaybeUser(Some(user))),
            Err(ApiError::Token(_)) | Err(ApiError::Authentication(_)) => {
                debug!("Ignoring unusable token on optional-auth route");
                Ok(MaybeUser(None))
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> User {
        User {
            id: "u1".to_string(),
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            password_hash: String::new(),
            role,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn issued_token_verifies() {
        let keys = TokenKeys::new("secret", 3600);
        let token = keys.issue(&user(Role::Admin)).unwrap();
        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.sub, "u1");
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn foreign_and_expired_tokens_are_rejected() {
        let token = TokenKeys::new("secret", 3600).issue(&user(Role::User)).unwrap();
        let err = TokenKeys::new("other", 3600).verify(&token).unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::UNAUTHORIZED);

        // Past the default 60s leeway.
        let stale = TokenKeys::new("secret", -600);
        let token = stale.issue(&user(Role::User)).unwrap();
        assert!(matches!(stale.verify(&token), Err(ApiError::Token(_))));

        assert!(TokenKeys::new("secret", 60).verify("not-a-jwt").is_err());
    }

    #[test]
    fn signing_failure_is_a_server_error() {
        let keys = TokenKeys {
            encoding: EncodingKey::from_ec_der(b"not-an-hmac-key"),
            decoding: DecodingKey::from_secret(b"secret"),
            ttl_secs: 60,
        };
        let err = keys.issue(&user(Role::User)).unwrap_err();
        assert!(matches!(err, ApiError::Internal(_)));
        assert_eq!(err.status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn password_hash_verifies_only_the_original() {
        let hash = hash_password("hunter22").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("hunter22", &hash).unwrap());
        assert!(!verify_password("hunter23", &hash).unwrap());
    }
}
