//! Salesman routes: registration, login, profile and admin management.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use fieldsales_core::validation::{
    normalize_email, normalize_optional, validate_contact_number, validate_password, validate_required,
};
use fieldsales_core::{Role, Salesman};
use fieldsales_db::{NewSalesman, SalesmanCascade, SalesmanFilter, SalesmanPatch};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::{hash_password, verify_password, AuthAdmin, AuthSalesman, IssuedToken};
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery};
use crate::import::{import_salesmen, ImportReport};
use crate::SharedState;

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/api/salesmen/register", post(register))
        .route("/api/salesmen/login", post(login))
        .route("/api/salesmen/me", get(profile))
        .route("/api/salesmen/admin/create", post(admin_create))
        .route("/api/salesmen/admin/all", get(admin_list))
        .route("/api/salesmen/admin/import", post(admin_import))
        .route(
            "/api/salesmen/admin/{id}",
            get(admin_get).put(admin_update).delete(admin_delete),
        )
        .route("/api/salesmen/admin/{id}/status", put(admin_toggle_status))
}

// =============================================================================
// DTOs
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSalesmanRequest {
    pub first_name: String,
    pub last_name: String,
    pub name: Option<String>,
    pub email: String,
    pub contact_no: String,
    pub contact_no2: Option<String>,
    pub password: String,
    pub franchise_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub salesman: Salesman,
    #[serde(flatten)]
    pub token: IssuedToken,
}

/// Admin update. A blank `franchiseId` detaches the salesman.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSalesmanRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub contact_no: Option<String>,
    pub contact_no2: Option<String>,
    pub password: Option<String>,
    pub franchise_id: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub active: Option<bool>,
    pub franchise: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub message: String,
    pub deleted: SalesmanCascade,
}

/// Validates a new salesman and hashes the password.
pub(crate) async fn prepare_salesman(state: &SharedState, req: CreateSalesmanRequest) -> ApiResult<NewSalesman> {
    let first_name = validate_required("firstName", &req.first_name)?;
    let last_name = validate_required("lastName", &req.last_name)?;
    let email = normalize_email(&req.email)?;
    let contact_no = validate_contact_number("contactNo", &req.contact_no)?;
    let contact_no2 = normalize_optional(req.contact_no2.as_deref())
        .map(|v| validate_contact_number("contactNo2", &v))
        .transpose()?;
    validate_password(&req.password)?;

    let franchise_id = match normalize_optional(req.franchise_id.as_deref()) {
        Some(id) => Some(state.db.franchises().get(&id).await?.id),
        None => None,
    };

    Ok(NewSalesman {
        first_name,
        last_name,
        name: normalize_optional(req.name.as_deref()),
        email,
        contact_no,
        contact_no2,
        password_hash: hash_password(&req.password)?,
        franchise_id,
    })
}

// =============================================================================
// Public & Salesman Handlers
// =============================================================================

async fn register(
    State(state): State<SharedState>,
    ApiJson(req): ApiJson<CreateSalesmanRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let new = prepare_salesman(&state, req).await?;
    let salesman = state.db.salesmen().create(new).await?;
    let token = state.jwt.issue(Role::Salesman, &salesman.id)?;

    info!(salesman = %salesman.id, "Salesman registered");
    Ok((StatusCode::CREATED, Json(AuthResponse { salesman, token })))
}

async fn login(
    State(state): State<SharedState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let email = normalize_email(&req.email).map_err(|_| ApiError::unauthorized("Invalid credentials"))?;

    let salesman = match state.db.salesmen().find_by_email(&email).await? {
        Some(s) if verify_password(&req.password, &s.password_hash) => s,
        _ => {
            warn!(email = %email, "Salesman login failed");
            return Err(ApiError::unauthorized("Invalid credentials"));
        }
    };

    if !salesman.is_active {
        return Err(ApiError::unauthorized("Account is inactive"));
    }

    let token = state.jwt.issue(Role::Salesman, &salesman.id)?;
    Ok(Json(AuthResponse { salesman, token }))
}

async fn profile(auth: AuthSalesman) -> Json<Salesman> {
    Json(auth.salesman)
}

// =============================================================================
// Admin Handlers
// =============================================================================

async fn admin_create(
    State(state): State<SharedState>,
    admin: AuthAdmin,
    ApiJson(req): ApiJson<CreateSalesmanRequest>,
) -> ApiResult<(StatusCode, Json<Salesman>)> {
    let new = prepare_salesman(&state, req).await?;
    let salesman = state.db.salesmen().create(new).await?;

    info!(salesman = %salesman.id, admin = %admin.admin.id, "Salesman created by admin");
    Ok((StatusCode::CREATED, Json(salesman)))
}

async fn admin_list(
    State(state): State<SharedState>,
    _admin: AuthAdmin,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<Json<Vec<Salesman>>> {
    let filter = SalesmanFilter {
        is_active: query.active,
        franchise_id: normalize_optional(query.franchise.as_deref()),
    };
    Ok(Json(state.db.salesmen().list(&filter).await?))
}

async fn admin_get(
    State(state): State<SharedState>,
    _admin: AuthAdmin,
    Path(id): Path<String>,
) -> ApiResult<Json<Salesman>> {
    Ok(Json(state.db.salesmen().get(&id).await?))
}

async fn admin_update(
    State(state): State<SharedState>,
    _admin: AuthAdmin,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateSalesmanRequest>,
) -> ApiResult<Json<Salesman>> {
    let franchise_id = match req.franchise_id {
        Some(raw) => match normalize_optional(Some(&raw)) {
            Some(fid) => Some(Some(state.db.franchises().get(&fid).await?.id)),
            None => Some(None),
        },
        None => None,
    };

    let password_hash = match req.password {
        Some(password) => {
            validate_password(&password)?;
            Some(hash_password(&password)?)
        }
        None => None,
    };

    let patch = SalesmanPatch {
        first_name: req.first_name.map(|v| validate_required("firstName", &v)).transpose()?,
        last_name: req.last_name.map(|v| validate_required("lastName", &v)).transpose()?,
        name: req.name.map(|v| validate_required("name", &v)).transpose()?,
        email: req.email.map(|v| normalize_email(&v)).transpose()?,
        contact_no: req
            .contact_no
            .map(|v| validate_contact_number("contactNo", &v))
            .transpose()?,
        contact_no2: match req.contact_no2 {
            Some(raw) => Some(
                normalize_optional(Some(&raw))
                    .map(|v| validate_contact_number("contactNo2", &v))
                    .transpose()?,
            ),
            None => None,
        },
        password_hash,
        franchise_id,
        is_active: req.is_active,
    };

    Ok(Json(state.db.salesmen().update(&id, patch).await?))
}

async fn admin_toggle_status(
    State(state): State<SharedState>,
    _admin: AuthAdmin,
    Path(id): Path<String>,
) -> ApiResult<Json<Salesman>> {
    Ok(Json(state.db.salesmen().toggle_active(&id).await?))
}

async fn admin_delete(
    State(state): State<SharedState>,
    admin: AuthAdmin,
    Path(id): Path<String>,
) -> ApiResult<Json<DeleteResponse>> {
    let deleted = state.db.salesmen().delete_cascade(&id).await?;
    info!(salesman = %id, admin = %admin.admin.id, sales = deleted.sales, retailers = deleted.retailers, "Salesman deleted");

    Ok(Json(DeleteResponse {
        message: "Salesman and associated data deleted successfully".to_string(),
        deleted,
    }))
}

async fn admin_import(
    State(state): State<SharedState>,
    _admin: AuthAdmin,
    multipart: Multipart,
) -> ApiResult<Json<ImportReport>> {
    let data = crate::import::read_file_field(multipart).await?;
    let report = import_salesmen(&state, &data).await?;
    Ok(Json(report))
}
