//! Stateless bearer-token authentication.
//!
//! Claims are trusted for the lifetime of a request; there is no session
//! store or revocation list. Verification sits behind `AuthConfig` so a
//! refresh/revocation scheme can be added without touching handlers.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use studyflow_core::domain::{Actor, Role};

use crate::api::AppState;
use crate::entity::user;
use crate::error::ApiError;

/// Claim set carried by every token: `{user_id, user, role, iat, exp}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i32,
    pub user: String,
    pub full_name: String,
    pub role: String,
    pub iat: u64,
    pub exp: u64,
}

impl Claims {
    /// The policy-facing view of the caller. A token minted with a role the
    /// policy does not know is treated as unauthenticated.
    pub fn actor(&self) -> Result<Actor, ApiError> {
        let role: Role = self
            .role
            .parse()
            .map_err(|_| ApiError::Authentication("Invalid or expired token".to_string()))?;
        Ok(Actor {
            id: self.user_id,
            role,
        })
    }
}

#[derive(Clone)]
pub struct AuthConfig {
    secret: String,
    token_ttl: Duration,
}

impl AuthConfig {
    pub fn new(secret: impl Into<String>, token_ttl: Duration) -> Self {
        Self {
            secret: secret.into(),
            token_ttl,
        }
    }

    pub fn issue_token(&self, user: &user::Model) -> Result<String, ApiError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| ApiError::Internal(e.into()))?
            .as_secs();

        let claims = Claims {
            user_id: user.user_id,
            user: user.username.clone(),
            full_name: user.full_name.clone(),
            role: user.role.clone(),
            iat: now,
            exp: now + self.token_ttl.as_secs(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| ApiError::Internal(e.into()))
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, ApiError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|_| ApiError::Authentication("Invalid or expired token".to_string()))
    }
}

/// Pulls the token out of `Authorization: Bearer <token>`.
fn extract_bearer(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Middleware guarding every endpoint except `/login`: verifies the bearer
/// token and stores the claims in request extensions for handlers.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::Authentication("Token not provided".to_string()))?;

    let token = extract_bearer(header)
        .ok_or_else(|| ApiError::Authentication("Token not provided".to_string()))?;
    let claims = state.auth.verify_token(token)?;

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// SHA-256 hex digest used for stored credentials.
pub fn password_digest(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

pub fn verify_password(password: &str, stored_digest: &str) -> bool {
    password_digest(password) == stored_digest
}
