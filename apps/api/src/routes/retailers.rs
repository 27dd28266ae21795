//! Retailer routes.
//!
//! Salesmen manage the retailers they added; admins see all of them, can
//! create retailers on a salesman's behalf, and delete with cascade.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use fieldsales_core::validation::{
    normalize_optional, validate_contact_number, validate_coordinates, validate_radius_km, validate_required,
};
use fieldsales_core::{GeoPoint, Retailer};
use fieldsales_db::{NearbyRetailer, NewRetailer, RetailerPatch};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{Message, PointDto};
use crate::auth::{AuthAdmin, AuthSalesman};
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery};
use crate::import::{import_retailers, ImportReport};
use crate::SharedState;

/// Default nearby search radius in kilometers.
const DEFAULT_RADIUS_KM: f64 = 10.0;

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/api/retailers", post(create_retailer).get(list_retailers))
        .route("/api/retailers/nearby", get(nearby_retailers))
        .route(
            "/api/retailers/{id}",
            get(get_retailer).put(update_retailer).delete(delete_retailer),
        )
        .route("/api/retailers/admin/create", post(admin_create_retailer))
        .route("/api/retailers/admin/all", get(admin_list_retailers))
        .route("/api/retailers/admin/import", post(admin_import_retailers))
        .route("/api/retailers/admin/{id}", delete(admin_delete_retailer))
}

// =============================================================================
// DTOs
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRetailerRequest {
    pub retailer_name: String,
    pub shop_name: String,
    pub contact_no: String,
    pub contact_no2: Option<String>,
    #[serde(default)]
    pub address: String,
    pub location: Option<PointDto>,
    /// Required when an admin creates the retailer.
    pub assigned_salesman: Option<String>,
}

struct ValidatedRetailer {
    retailer_name: String,
    shop_name: String,
    contact_no: String,
    contact_no2: Option<String>,
    address: String,
    location: Option<GeoPoint>,
}

impl CreateRetailerRequest {
    fn validate(&self) -> ApiResult<ValidatedRetailer> {
        let contact_no2 = match normalize_optional(self.contact_no2.as_deref()) {
            Some(second) => Some(validate_contact_number("contactNo2", &second)?),
            None => None,
        };

        Ok(ValidatedRetailer {
            retailer_name: validate_required("retailerName", &self.retailer_name)?,
            shop_name: validate_required("shopName", &self.shop_name)?,
            contact_no: validate_contact_number("contactNo", &self.contact_no)?,
            contact_no2,
            address: self.address.trim().to_string(),
            location: self.location.as_ref().map(PointDto::to_point).transpose()?,
        })
    }
}

impl ValidatedRetailer {
    fn into_new(self, added_by: String, assigned_salesman: Option<String>) -> NewRetailer {
        NewRetailer {
            retailer_name: self.retailer_name,
            shop_name: self.shop_name,
            contact_no: self.contact_no,
            contact_no2: self.contact_no2,
            address: self.address,
            longitude: self.location.map(|p| p.longitude),
            latitude: self.location.map(|p| p.latitude),
            added_by,
            assigned_salesman,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRetailerRequest {
    pub retailer_name: Option<String>,
    pub shop_name: Option<String>,
    pub contact_no: Option<String>,
    pub contact_no2: Option<String>,
    pub address: Option<String>,
    pub location: Option<PointDto>,
    pub is_active: Option<bool>,
}

impl UpdateRetailerRequest {
    fn into_patch(self) -> ApiResult<RetailerPatch> {
        Ok(RetailerPatch {
            retailer_name: self
                .retailer_name
                .map(|v| validate_required("retailerName", &v))
                .transpose()?,
            shop_name: self.shop_name.map(|v| validate_required("shopName", &v)).transpose()?,
            contact_no: self
                .contact_no
                .map(|v| validate_contact_number("contactNo", &v))
                .transpose()?,
            contact_no2: match self.contact_no2 {
                Some(raw) => Some(
                    normalize_optional(Some(&raw))
                        .map(|v| validate_contact_number("contactNo2", &v))
                        .transpose()?,
                ),
                None => None,
            },
            address: self.address.map(|v| v.trim().to_string()),
            location: self
                .location
                .as_ref()
                .map(|p| p.to_point().map(Some))
                .transpose()?,
            assigned_salesman: None,
            is_active: self.is_active,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetailerResponse {
    #[serde(flatten)]
    pub retailer: Retailer,
    pub location: Option<PointDto>,
}

impl From<Retailer> for RetailerResponse {
    fn from(retailer: Retailer) -> Self {
        RetailerResponse {
            location: retailer.location().map(PointDto::from_point),
            retailer,
        }
    }
}

fn respond(retailers: Vec<Retailer>) -> Json<Vec<RetailerResponse>> {
    Json(retailers.into_iter().map(RetailerResponse::from).collect())
}

#[derive(Debug, Deserialize)]
pub struct NearbyQuery {
    pub latitude: f64,
    pub longitude: f64,
    /// Kilometers
    pub radius: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminDeleteResponse {
    pub message: String,
    pub deleted_sales: u64,
}

// =============================================================================
// Salesman Handlers
// =============================================================================

async fn create_retailer(
    State(state): State<SharedState>,
    auth: AuthSalesman,
    ApiJson(req): ApiJson<CreateRetailerRequest>,
) -> ApiResult<(StatusCode, Json<RetailerResponse>)> {
    let validated = req.validate()?;
    let id = auth.salesman.id.clone();
    let retailer = state
        .db
        .retailers()
        .create(validated.into_new(id.clone(), Some(id)))
        .await?;

    info!(retailer = %retailer.id, salesman = %auth.salesman.id, "Retailer created");
    Ok((StatusCode::CREATED, Json(retailer.into())))
}

async fn list_retailers(
    State(state): State<SharedState>,
    auth: AuthSalesman,
) -> ApiResult<Json<Vec<RetailerResponse>>> {
    let retailers = state.db.retailers().list(&auth.actor()).await?;
    Ok(respond(retailers))
}

async fn nearby_retailers(
    State(state): State<SharedState>,
    _auth: AuthSalesman,
    ApiQuery(query): ApiQuery<NearbyQuery>,
) -> ApiResult<Json<Vec<NearbyRetailer>>> {
    let center = validate_coordinates(&[query.longitude, query.latitude])?;
    let radius_km = validate_radius_km(query.radius.unwrap_or(DEFAULT_RADIUS_KM))?;

    let nearby = state.db.retailers().nearby(center, radius_km * 1000.0).await?;
    Ok(Json(nearby))
}

async fn get_retailer(
    State(state): State<SharedState>,
    auth: AuthSalesman,
    Path(id): Path<String>,
) -> ApiResult<Json<RetailerResponse>> {
    let retailer = state.db.retailers().get_visible(&auth.actor(), &id).await?;
    Ok(Json(retailer.into()))
}

async fn update_retailer(
    State(state): State<SharedState>,
    auth: AuthSalesman,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateRetailerRequest>,
) -> ApiResult<Json<RetailerResponse>> {
    let retailer = state
        .db
        .retailers()
        .update(&auth.actor(), &id, req.into_patch()?)
        .await?;
    Ok(Json(retailer.into()))
}

async fn delete_retailer(
    State(state): State<SharedState>,
    auth: AuthSalesman,
    Path(id): Path<String>,
) -> ApiResult<Json<Message>> {
    state.db.retailers().delete(&auth.actor(), &id).await?;
    Ok(Json(Message::new("Retailer deleted successfully")))
}

// =============================================================================
// Admin Handlers
// =============================================================================

async fn admin_create_retailer(
    State(state): State<SharedState>,
    admin: AuthAdmin,
    ApiJson(req): ApiJson<CreateRetailerRequest>,
) -> ApiResult<(StatusCode, Json<RetailerResponse>)> {
    let validated = req.validate()?;
    let assigned = super::sales::non_blank(req.assigned_salesman.clone())
        .ok_or_else(|| ApiError::validation("assignedSalesman is required"))?;
    let salesman = state.db.salesmen().get(&assigned).await?;

    let retailer = state
        .db
        .retailers()
        .create(validated.into_new(salesman.id.clone(), Some(salesman.id)))
        .await?;

    info!(retailer = %retailer.id, admin = %admin.admin.id, "Retailer created by admin");
    Ok((StatusCode::CREATED, Json(retailer.into())))
}

async fn admin_list_retailers(
    State(state): State<SharedState>,
    admin: AuthAdmin,
) -> ApiResult<Json<Vec<RetailerResponse>>> {
    let retailers = state.db.retailers().list(&admin.actor()).await?;
    Ok(respond(retailers))
}

async fn admin_delete_retailer(
    State(state): State<SharedState>,
    _admin: AuthAdmin,
    Path(id): Path<String>,
) -> ApiResult<Json<AdminDeleteResponse>> {
    let deleted_sales = state.db.retailers().delete_cascade(&id).await?;
    Ok(Json(AdminDeleteResponse {
        message: "Retailer and associated sales deleted successfully".to_string(),
        deleted_sales,
    }))
}

async fn admin_import_retailers(
    State(state): State<SharedState>,
    _admin: AuthAdmin,
    multipart: Multipart,
) -> ApiResult<Json<ImportReport>> {
    let data = crate::import::read_file_field(multipart).await?;
    let report = import_retailers(&state, &data).await?;
    Ok(Json(report))
}
