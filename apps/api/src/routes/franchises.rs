//! Franchise routes (admin only).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use fieldsales_core::validation::{normalize_sim_number, validate_required};
use fieldsales_core::{Franchise, Salesman};
use fieldsales_db::{FranchisePatch, NewFranchise};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::Message;
use crate::auth::AuthAdmin;
use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::SharedState;

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/api/franchises/admin/create", post(create_franchise))
        .route("/api/franchises/admin/all", get(list_franchises))
        .route(
            "/api/franchises/admin/{id}",
            get(get_franchise).put(update_franchise).delete(delete_franchise),
        )
        .route("/api/franchises/admin/{id}/status", put(toggle_status))
        .route("/api/franchises/admin/{id}/salesmen", get(list_members))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFranchiseRequest {
    pub name: String,
    #[serde(default)]
    pub address: String,
    pub master_sim_no: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFranchiseRequest {
    pub name: Option<String>,
    pub address: Option<String>,
    pub master_sim_no: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct FranchiseList {
    pub count: usize,
    pub franchises: Vec<Franchise>,
}

#[derive(Debug, Serialize)]
pub struct MemberList {
    pub count: usize,
    pub salesmen: Vec<Salesman>,
}

async fn create_franchise(
    State(state): State<SharedState>,
    _admin: AuthAdmin,
    ApiJson(req): ApiJson<CreateFranchiseRequest>,
) -> ApiResult<(StatusCode, Json<Franchise>)> {
    let franchise = state
        .db
        .franchises()
        .create(NewFranchise {
            name: validate_required("name", &req.name)?,
            address: req.address.trim().to_string(),
            master_sim_no: normalize_sim_number(&req.master_sim_no)?,
        })
        .await?;

    info!(franchise = %franchise.id, name = %franchise.name, "Franchise created");
    Ok((StatusCode::CREATED, Json(franchise)))
}

async fn list_franchises(State(state): State<SharedState>, _admin: AuthAdmin) -> ApiResult<Json<FranchiseList>> {
    let franchises = state.db.franchises().list().await?;
    Ok(Json(FranchiseList {
        count: franchises.len(),
        franchises,
    }))
}

async fn get_franchise(
    State(state): State<SharedState>,
    _admin: AuthAdmin,
    Path(id): Path<String>,
) -> ApiResult<Json<Franchise>> {
    Ok(Json(state.db.franchises().get(&id).await?))
}

async fn update_franchise(
    State(state): State<SharedState>,
    _admin: AuthAdmin,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateFranchiseRequest>,
) -> ApiResult<Json<Franchise>> {
    let patch = FranchisePatch {
        name: req.name.map(|v| validate_required("name", &v)).transpose()?,
        address: req.address.map(|v| v.trim().to_string()),
        master_sim_no: req.master_sim_no.map(|v| normalize_sim_number(&v)).transpose()?,
        is_active: req.is_active,
    };
    Ok(Json(state.db.franchises().update(&id, patch).await?))
}

async fn delete_franchise(
    State(state): State<SharedState>,
    _admin: AuthAdmin,
    Path(id): Path<String>,
) -> ApiResult<Json<Message>> {
    state.db.franchises().delete(&id).await?;
    Ok(Json(Message::new("Franchise deleted successfully")))
}

async fn toggle_status(
    State(state): State<SharedState>,
    _admin: AuthAdmin,
    Path(id): Path<String>,
) -> ApiResult<Json<Franchise>> {
    Ok(Json(state.db.franchises().toggle_active(&id).await?))
}

async fn list_members(
    State(state): State<SharedState>,
    _admin: AuthAdmin,
    Path(id): Path<String>,
) -> ApiResult<Json<MemberList>> {
    let salesmen = state.db.franchises().salesmen(&id).await?;
    Ok(Json(MemberList {
        count: salesmen.len(),
        salesmen,
    }))
}
