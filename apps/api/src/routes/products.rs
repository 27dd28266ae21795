//! Product routes: public catalogue and admin management.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use fieldsales_core::validation::{normalize_optional, validate_required, validate_unit_price};
use fieldsales_core::{CoreError, Money, Product};
use fieldsales_db::{NewProduct, ProductPatch};
use serde::Deserialize;
use tracing::info;

use super::Message;
use crate::auth::AuthAdmin;
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::SharedState;

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/api/products", get(list_catalogue))
        .route("/api/products/{id}", get(get_catalogue_product))
        .route("/api/products/admin/create", post(admin_create_product))
        .route("/api/products/admin/all", get(admin_list_products))
        .route(
            "/api/products/admin/{id}",
            get(admin_get_product).put(admin_update_product).delete(admin_delete_product),
        )
        .route("/api/products/admin/{id}/status", put(admin_toggle_status))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub name: String,
    pub description: Option<String>,
    /// Integer cents
    pub price: i64,
    pub assigned_salesman: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub assigned_salesman: Option<String>,
    pub is_active: Option<bool>,
}

fn validate_price(cents: i64) -> Result<Money, CoreError> {
    let price = Money::from_cents(cents);
    validate_unit_price("price", price)?;
    Ok(price)
}

async fn list_catalogue(State(state): State<SharedState>) -> ApiResult<Json<Vec<Product>>> {
    Ok(Json(state.db.products().list_active().await?))
}

async fn get_catalogue_product(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Product>> {
    let product = state.db.products().get(&id).await?;
    if !product.is_active {
        return Err(ApiError::NotFound("Product not found".to_string()));
    }
    Ok(Json(product))
}

async fn admin_create_product(
    State(state): State<SharedState>,
    admin: AuthAdmin,
    ApiJson(req): ApiJson<CreateProductRequest>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    let assigned_salesman = match normalize_optional(req.assigned_salesman.as_deref()) {
        Some(id) => Some(state.db.salesmen().get(&id).await?.id),
        None => None,
    };

    let product = state
        .db
        .products()
        .create(NewProduct {
            name: validate_required("name", &req.name)?,
            description: normalize_optional(req.description.as_deref()),
            price: validate_price(req.price)?,
            added_by: Some(admin.admin.id.clone()),
            assigned_salesman,
        })
        .await?;

    info!(product = %product.id, name = %product.name, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

async fn admin_list_products(
    State(state): State<SharedState>,
    _admin: AuthAdmin,
) -> ApiResult<Json<Vec<Product>>> {
    Ok(Json(state.db.products().list_all().await?))
}

async fn admin_get_product(
    State(state): State<SharedState>,
    _admin: AuthAdmin,
    Path(id): Path<String>,
) -> ApiResult<Json<Product>> {
    Ok(Json(state.db.products().get(&id).await?))
}

async fn admin_update_product(
    State(state): State<SharedState>,
    _admin: AuthAdmin,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateProductRequest>,
) -> ApiResult<Json<Product>> {
    let assigned_salesman = match req.assigned_salesman {
        Some(raw) => match normalize_optional(Some(&raw)) {
            Some(id) => Some(Some(state.db.salesmen().get(&id).await?.id)),
            None => Some(None),
        },
        None => None,
    };

    let patch = ProductPatch {
        name: req.name.map(|v| validate_required("name", &v)).transpose()?,
        description: req.description.map(|v| normalize_optional(Some(&v))),
        price: req.price.map(validate_price).transpose()?,
        assigned_salesman,
        is_active: req.is_active,
    };

    Ok(Json(state.db.products().update(&id, patch).await?))
}

async fn admin_delete_product(
    State(state): State<SharedState>,
    _admin: AuthAdmin,
    Path(id): Path<String>,
) -> ApiResult<Json<Message>> {
    state.db.products().delete(&id).await?;
    Ok(Json(Message::new("Product deleted successfully")))
}

async fn admin_toggle_status(
    State(state): State<SharedState>,
    _admin: AuthAdmin,
    Path(id): Path<String>,
) -> ApiResult<Json<Product>> {
    Ok(Json(state.db.products().toggle_active(&id).await?))
}
