//! JWT authentication module.
//!
//! Handles token issuance and validation, password hashing, and the axum
//! extractors that turn a bearer token into an [`Actor`].
//!
//! ## Token Schemes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Authorization: Bearer <jwt>                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  JwtManager::validate_token ── bad signature / expired ──► 401         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  claims.role matches the route's scheme? ── no ──► 403                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  subject still exists (and salesman is active)? ── no ──► 401          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  AuthSalesman / AuthAdmin                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{DateTime, Duration, Utc};
use fieldsales_core::{Actor, Admin, Role, Salesman};
use fieldsales_db::DbError;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::SharedState;

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (salesman or admin id)
    pub sub: String,

    pub role: Role,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,

    /// JWT ID (unique identifier for this token)
    pub jti: String,
}

impl Claims {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

/// A freshly issued token.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// JWT token manager.
pub struct JwtManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    salesman_lifetime_secs: i64,
    admin_lifetime_secs: i64,
}

impl std::fmt::Debug for JwtManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtManager")
            .field("salesman_lifetime_secs", &self.salesman_lifetime_secs)
            .field("admin_lifetime_secs", &self.admin_lifetime_secs)
            .finish_non_exhaustive()
    }
}

impl JwtManager {
    pub fn new(secret: &str, salesman_lifetime_secs: i64, admin_lifetime_secs: i64) -> Self {
        JwtManager {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            salesman_lifetime_secs,
            admin_lifetime_secs,
        }
    }

    /// Issues a token for `subject` under `role`'s scheme.
    pub fn issue(&self, role: Role, subject: &str) -> Result<IssuedToken, ApiError> {
        let lifetime = match role {
            Role::Salesman => self.salesman_lifetime_secs,
            Role::Admin => self.admin_lifetime_secs,
        };
        let now = Utc::now();
        let expires_at = now + Duration::seconds(lifetime);

        let claims = Claims {
            sub: subject.to_string(),
            role,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ApiError::internal(format!("Failed to generate token: {e}")))?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Validates signature and expiry and decodes the claims.
    pub fn validate_token(&self, token: &str) -> Result<Claims, ApiError> {
        let validation = Validation::new(Algorithm::HS256);

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => ApiError::unauthorized("Token expired"),
                _ => {
                    debug!(error = %e, "JWT validation failed");
                    ApiError::unauthorized("Invalid token")
                }
            })
    }
}

/// Extract bearer token from authorization header.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

// =============================================================================
// Passwords
// =============================================================================

/// Hashes a password for storage.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {e}")))
}

/// Verifies a password against a stored hash. Malformed hashes never match.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

// =============================================================================
// Extractors
// =============================================================================

/// An authenticated, active salesman.
#[derive(Debug, Clone)]
pub struct AuthSalesman {
    pub salesman: Salesman,
    pub claims: Claims,
}

impl AuthSalesman {
    pub fn actor(&self) -> Actor {
        Actor::Salesman {
            id: self.salesman.id.clone(),
        }
    }
}

/// The authenticated admin.
#[derive(Debug, Clone)]
pub struct AuthAdmin {
    pub admin: Admin,
    pub claims: Claims,
}

impl AuthAdmin {
    pub fn actor(&self) -> Actor {
        Actor::Admin {
            id: self.admin.id.clone(),
        }
    }
}

fn claims_for(parts: &Parts, state: &SharedState, expected: Role) -> Result<Claims, ApiError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match header {
        Some(header) => extract_bearer_token(header)
            .ok_or_else(|| ApiError::unauthorized("Invalid authorization header"))?,
        None => {
            warn!(uri = %parts.uri, "Missing authorization header");
            return Err(ApiError::unauthorized("Missing authorization header"));
        }
    };

    let claims = state.jwt.validate_token(token).inspect_err(|_| {
        warn!(uri = %parts.uri, "Rejected bearer token");
    })?;

    if claims.role != expected {
        warn!(uri = %parts.uri, role = %claims.role, expected = %expected, "Token used on the wrong scheme");
        return Err(ApiError::Forbidden(format!("{expected} access required")));
    }

    Ok(claims)
}

fn subject_gone(err: DbError) -> ApiError {
    match err {
        DbError::NotFound { .. } => ApiError::unauthorized("Account no longer exists"),
        other => other.into(),
    }
}

impl FromRequestParts<SharedState> for AuthSalesman {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &SharedState) -> Result<Self, Self::Rejection> {
        let claims = claims_for(parts, state, Role::Salesman)?;
        let salesman = state.db.salesmen().get(&claims.sub).await.map_err(subject_gone)?;

        if !salesman.is_active {
            warn!(salesman = %salesman.id, "Inactive salesman token rejected");
            return Err(ApiError::unauthorized("Account is inactive"));
        }

        Ok(AuthSalesman { salesman, claims })
    }
}

impl FromRequestParts<SharedState> for AuthAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &SharedState) -> Result<Self, Self::Rejection> {
        let claims = claims_for(parts, state, Role::Admin)?;
        let admin = state.db.admins().get(&claims.sub).await.map_err(subject_gone)?;
        Ok(AuthAdmin { admin, claims })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jwt_roundtrip() {
        let manager = JwtManager::new("test-secret", 3600, 7200);

        let issued = manager.issue(Role::Salesman, "salesman-001").unwrap();
        let claims = manager.validate_token(&issued.token).unwrap();

        assert_eq!(claims.sub, "salesman-001");
        assert_eq!(claims.role, Role::Salesman);
        assert_eq!(claims.exp - claims.iat, 3600);
        assert_eq!(claims.exp, issued.expires_at.timestamp());
        assert!(claims.expires_at().is_some());
    }

    #[test]
    fn test_admin_lifetime() {
        let manager = JwtManager::new("test-secret", 3600, 7200);
        let issued = manager.issue(Role::Admin, "admin-001").unwrap();
        let claims = manager.validate_token(&issued.token).unwrap();
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.exp - claims.iat, 7200);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issuer = JwtManager::new("secret-a", 3600, 3600);
        let verifier = JwtManager::new("secret-b", 3600, 3600);
        let issued = issuer.issue(Role::Admin, "admin-001").unwrap();
        assert!(matches!(verifier.validate_token(&issued.token), Err(ApiError::Unauthorized(_))));
    }

    #[test]
    fn test_expired_token_rejected() {
        // Beyond the default 60 s leeway.
        let manager = JwtManager::new("test-secret", -3600, -3600);
        let issued = manager.issue(Role::Salesman, "salesman-001").unwrap();
        let err = manager.validate_token(&issued.token).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(ref msg) if msg == "Token expired"));
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(extract_bearer_token("Bearer "), None);
        assert_eq!(extract_bearer_token("Basic abc"), None);
    }

    #[test]
    fn test_password_hash_verify() {
        let hash = hash_password("hunter22").unwrap();
        assert!(verify_password("hunter22", &hash));
        assert!(!verify_password("hunter23", &hash));
        assert!(!verify_password("hunter22", "not-a-hash"));
    }
}
