//! Admin account routes: one-time setup, login, profile and credential
//! changes. Every credential change requires the current password.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use fieldsales_core::validation::{normalize_email, validate_contact_number, validate_password, validate_required};
use fieldsales_core::{Admin, Role};
use fieldsales_db::NewAdmin;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::Message;
use crate::auth::{hash_password, verify_password, AuthAdmin, IssuedToken};
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::SharedState;

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/api/admin/setup", post(setup))
        .route("/api/admin/login", post(login))
        .route("/api/admin/profile", get(profile))
        .route("/api/admin/logout", post(logout))
        .route("/api/admin/update-email", put(update_email))
        .route("/api/admin/update-phone", put(update_phone))
        .route("/api/admin/update-password", put(update_password))
        .route("/api/admin/validate-password", post(validate_current_password))
}

#[derive(Debug, Deserialize)]
pub struct SetupRequest {
    pub email: String,
    pub phone: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Email or phone
    pub identifier: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AdminAuthResponse {
    pub admin: Admin,
    #[serde(flatten)]
    pub token: IssuedToken,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub admin: Admin,
    pub token_expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEmailRequest {
    pub email: String,
    pub current_password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePhoneRequest {
    pub phone: String,
    pub current_password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct PasswordRequest {
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UpdatedAdmin {
    pub message: String,
    pub admin: Admin,
}

fn check_current_password(auth: &AuthAdmin, password: &str) -> ApiResult<()> {
    if verify_password(password, &auth.admin.password_hash) {
        Ok(())
    } else {
        warn!(admin = %auth.admin.id, "Current password mismatch");
        Err(ApiError::unauthorized("Current password is incorrect"))
    }
}

async fn setup(
    State(state): State<SharedState>,
    ApiJson(req): ApiJson<SetupRequest>,
) -> ApiResult<(StatusCode, Json<AdminAuthResponse>)> {
    if state.db.admins().exists().await? {
        return Err(ApiError::BadRequest("Admin already exists".to_string()));
    }

    let email = normalize_email(&req.email)?;
    let phone = validate_contact_number("phone", &req.phone)?;
    validate_password(&req.password)?;

    let admin = state
        .db
        .admins()
        .create(NewAdmin {
            email,
            phone,
            password_hash: hash_password(&req.password)?,
        })
        .await?;
    let token = state.jwt.issue(Role::Admin, &admin.id)?;

    info!(admin = %admin.id, "Admin setup complete");
    Ok((StatusCode::CREATED, Json(AdminAuthResponse { admin, token })))
}

async fn login(
    State(state): State<SharedState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Json<AdminAuthResponse>> {
    let identifier = validate_required("identifier", &req.identifier)?;
    let lookup = if identifier.contains('@') {
        identifier.to_lowercase()
    } else {
        identifier
    };

    let admin = match state.db.admins().find_by_login(&lookup).await? {
        Some(admin) if verify_password(&req.password, &admin.password_hash) => admin,
        _ => {
            warn!("Admin login failed");
            return Err(ApiError::unauthorized("Invalid credentials"));
        }
    };

    let token = state.jwt.issue(Role::Admin, &admin.id)?;
    Ok(Json(AdminAuthResponse { admin, token }))
}

async fn profile(auth: AuthAdmin) -> Json<ProfileResponse> {
    Json(ProfileResponse {
        token_expires_at: auth.claims.expires_at(),
        admin: auth.admin,
    })
}

/// Tokens are stateless; the client discards its copy.
async fn logout(auth: AuthAdmin) -> Json<Message> {
    info!(admin = %auth.admin.id, "Admin logged out");
    Json(Message::new("Logout successful"))
}

async fn update_email(
    State(state): State<SharedState>,
    auth: AuthAdmin,
    ApiJson(req): ApiJson<UpdateEmailRequest>,
) -> ApiResult<Json<UpdatedAdmin>> {
    let email = normalize_email(&req.email)?;
    check_current_password(&auth, &req.current_password)?;

    let admin = state.db.admins().update_email(&auth.admin.id, &email).await?;
    Ok(Json(UpdatedAdmin {
        message: "Email updated successfully".to_string(),
        admin,
    }))
}

async fn update_phone(
    State(state): State<SharedState>,
    auth: AuthAdmin,
    ApiJson(req): ApiJson<UpdatePhoneRequest>,
) -> ApiResult<Json<UpdatedAdmin>> {
    let phone = validate_contact_number("phone", &req.phone)?;
    check_current_password(&auth, &req.current_password)?;

    let admin = state.db.admins().update_phone(&auth.admin.id, &phone).await?;
    Ok(Json(UpdatedAdmin {
        message: "Phone number updated successfully".to_string(),
        admin,
    }))
}

async fn update_password(
    State(state): State<SharedState>,
    auth: AuthAdmin,
    ApiJson(req): ApiJson<UpdatePasswordRequest>,
) -> ApiResult<Json<Message>> {
    validate_password(&req.new_password)?;
    check_current_password(&auth, &req.current_password)?;

    let hash = hash_password(&req.new_password)?;
    state.db.admins().update_password(&auth.admin.id, &hash).await?;
    Ok(Json(Message::new("Password updated successfully")))
}

async fn validate_current_password(
    auth: AuthAdmin,
    ApiJson(req): ApiJson<PasswordRequest>,
) -> ApiResult<Json<Message>> {
    if !verify_password(&req.password, &auth.admin.password_hash) {
        return Err(ApiError::unauthorized("Invalid password"));
    }
    Ok(Json(Message::new("Password is valid")))
}
