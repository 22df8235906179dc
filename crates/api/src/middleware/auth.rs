//! # Authentication Module
//!
//! Password hashing, token issuance, and per-request principal resolution for
//! the CareBook API.
//!
//! Passwords are stored as Argon2 PHC strings. A successful login issues an
//! opaque random bearer token recorded in the `AccountStore`; every request
//! resolves its `Authorization: Bearer` header against that store again, so a
//! revoked token stops working immediately.

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, SaltString},
    Argon2, PasswordHasher, PasswordVerifier,
};
use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use carebook_core::{
    errors::{CareError, CareResult},
    guard,
    models::principal::{AuthGrant, Credentials, Principal, Role},
    session::AuthBackend,
    store::AccountStore,
};
use eyre::Result;
use rand::{distributions::Alphanumeric, Rng};
use tracing::{debug, warn};

use crate::{middleware::error_handling::AppError, ApiState};

/// Length of issued bearer tokens.
pub const TOKEN_LENGTH: usize = 48;

/// Hashes a password using the Argon2 algorithm
///
/// # Arguments
///
/// * `password` - The plain text password to hash
///
/// # Returns
///
/// * `Result<String>` - The hashed password in PHC string format
///
/// # Example
///
/// ```rust
/// let hashed = carebook_api::middleware::auth::hash_password("s3cret")?;
/// assert!(hashed.starts_with("$argon2"));
/// # Ok::<(), eyre::Report>(())
/// ```
pub fn hash_password(password: &str) -> Result<String> {
    // Generate a fresh, random salt
    let salt = SaltString::generate(&mut OsRng);

    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| eyre::eyre!("Error hashing password: {}", e))?
        .to_string();

    Ok(password_hash)
}

/// Checks `password` against a stored PHC hash.
///
/// A hash that cannot be parsed never verifies.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    let parsed = match PasswordHash::new(password_hash) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("stored password hash is unreadable: {}", e);
            return false;
        }
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Opaque random bearer token.
pub fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// `AuthBackend` that checks passwords against the account store.
#[derive(Clone)]
pub struct PasswordAuthBackend {
    accounts: Arc<dyn AccountStore>,
}

impl PasswordAuthBackend {
    pub fn new(accounts: Arc<dyn AccountStore>) -> Self {
        Self { accounts }
    }

    /// Principal bound to `token`, if it is still live.
    pub async fn resolve(&self, token: &str) -> CareResult<Option<Principal>> {
        self.accounts.resolve_token(token).await
    }
}

#[async_trait]
impl AuthBackend for PasswordAuthBackend {
    async fn login(&self, credentials: &Credentials) -> CareResult<AuthGrant> {
        let invalid = || CareError::Authentication("invalid email or password".to_string());

        let account = self
            .accounts
            .find_by_email(credentials.email.trim())
            .await?
            .ok_or_else(invalid)?;

        if !verify_password(&credentials.password, &account.password_hash) {
            debug!(email = %credentials.email, "password mismatch");
            return Err(invalid());
        }

        let token = generate_token();
        self.accounts
            .store_token(&token, &account.principal.id)
            .await?;

        debug!(principal = %account.principal.id, "token issued");
        Ok(AuthGrant {
            principal: account.principal,
            token,
        })
    }

    async fn logout(&self, token: &str) -> CareResult<()> {
        self.accounts.revoke_token(token).await
    }
}

/// The caller behind the request's bearer token, if any.
///
/// Extraction never fails on a missing or unknown token; the guard decides
/// what an anonymous caller may do.
#[derive(Debug, Clone, Default)]
pub struct CurrentPrincipal {
    pub principal: Option<Principal>,
    pub token: Option<String>,
}

impl CurrentPrincipal {
    /// The principal if it holds one of `roles`; an empty slice admits any role.
    pub fn require(&self, roles: &[Role]) -> CareResult<&Principal> {
        guard::require(self.principal.as_ref(), roles)
    }
}

fn bearer_token(parts: &Parts) -> Option<String> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then(|| token.to_string())
}

#[axum::async_trait]
impl FromRequestParts<Arc<ApiState>> for CurrentPrincipal {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<ApiState>,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(parts) else {
            return Ok(Self::default());
        };

        let principal = state.auth.resolve(&token).await?;
        if principal.is_none() {
            debug!("bearer token is unknown or revoked");
        }

        Ok(Self {
            principal,
            token: Some(token),
        })
    }
}
