//! Sale routes.
//!
//! ## Sale Recording
//! ```text
//! POST /api/sales
//!   │
//!   ├── coordinates.coordinates → GeoPoint        (400 on bad shape/range)
//!   ├── products map → Vec<SaleLine>              (400 on qty/price/total)
//!   ├── amount == Σ line totals, or computed      (400 on mismatch)
//!   ├── retailer lookup                           (404 when missing)
//!   ├── SaleValidator::assess(sale, retailer)     (never rejects)
//!   └── SaleRepository::create                    (201)
//! ```
//!
//! Products travel as a JSON object keyed by product name. Key order is
//! kept so a sale reads back the way it was recorded.

use std::fmt;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use fieldsales_core::statistics::DateRange;
use fieldsales_core::validation::{build_sale_line, resolve_sale_amount, validate_required};
use fieldsales_core::{Money, Sale, SaleLine};
use fieldsales_db::{NewSale, SaleFilter, SaleUpdate};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::info;

use super::{Message, PointDto};
use crate::auth::{AuthAdmin, AuthSalesman};
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiQuery};
use crate::SharedState;

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/api/sales", post(create_sale).get(list_own_sales))
        .route("/api/sales/retailer/{retailer_id}", get(list_retailer_sales))
        .route(
            "/api/sales/{id}",
            get(get_sale).put(update_sale).delete(delete_sale),
        )
        .route("/api/sales/admin/all", get(admin_list_all))
        .route("/api/sales/admin/filtered", get(admin_list_filtered))
        .route("/api/sales/admin/{id}", axum::routing::delete(admin_delete_sale))
        .route("/api/sales/admin/{id}/validity", put(admin_set_validity))
}

// =============================================================================
// DTOs
// =============================================================================

/// One product line on the wire. Money fields are integer cents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineDto {
    pub quantity: i64,
    pub price: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<i64>,
}

/// Product-name keyed map that keeps insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductMap(pub Vec<(String, LineDto)>);

impl ProductMap {
    pub fn from_lines(lines: &[SaleLine]) -> Self {
        ProductMap(
            lines
                .iter()
                .map(|line| {
                    (
                        line.product.clone(),
                        LineDto {
                            quantity: line.quantity,
                            price: line.unit_price.cents(),
                            total: Some(line.line_total.cents()),
                        },
                    )
                })
                .collect(),
        )
    }

    /// Validates every line. Duplicate names are rejected later by
    /// [`resolve_sale_amount`].
    pub fn to_lines(&self) -> ApiResult<Vec<SaleLine>> {
        let lines = self
            .0
            .iter()
            .map(|(name, line)| {
                build_sale_line(
                    name,
                    line.quantity,
                    Money::from_cents(line.price),
                    line.total.map(Money::from_cents),
                )
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(lines)
    }
}

impl Serialize for ProductMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, line) in &self.0 {
            map.serialize_entry(name, line)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ProductMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ProductMapVisitor;

        impl<'de> Visitor<'de> for ProductMapVisitor {
            type Value = ProductMap;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object keyed by product name")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, line)) = access.next_entry::<String, LineDto>()? {
                    entries.push((name, line));
                }
                Ok(ProductMap(entries))
            }
        }

        deserializer.deserialize_map(ProductMapVisitor)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleRequest {
    pub retailer: String,
    pub products: ProductMap,
    /// Integer cents; computed from the lines when omitted.
    pub amount: Option<i64>,
    pub coordinates: PointDto,
}

struct ValidatedSale {
    retailer_id: String,
    lines: Vec<SaleLine>,
    amount: Money,
    location: fieldsales_core::GeoPoint,
}

impl SaleRequest {
    fn validate(&self) -> ApiResult<ValidatedSale> {
        let retailer_id = validate_required("retailer", &self.retailer)?;
        let location = self.coordinates.to_point()?;
        let lines = self.products.to_lines()?;
        let amount = resolve_sale_amount(&lines, self.amount.map(Money::from_cents))?;

        Ok(ValidatedSale {
            retailer_id,
            lines,
            amount,
            location,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleResponse {
    pub id: String,
    pub retailer: String,
    pub products: ProductMap,
    pub amount: Money,
    pub coordinates: PointDto,
    pub added_by: String,
    pub valid: bool,
    pub distance_meters: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Sale> for SaleResponse {
    fn from(sale: Sale) -> Self {
        SaleResponse {
            products: ProductMap::from_lines(&sale.lines),
            coordinates: PointDto::from_point(sale.location),
            id: sale.id,
            retailer: sale.retailer_id,
            amount: sale.amount,
            added_by: sale.added_by,
            valid: sale.valid,
            distance_meters: sale.distance_meters,
            created_at: sale.created_at,
            updated_at: sale.updated_at,
        }
    }
}

fn respond(sales: Vec<Sale>) -> Json<Vec<SaleResponse>> {
    Json(sales.into_iter().map(SaleResponse::from).collect())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleFilterQuery {
    pub salesman: Option<String>,
    pub product: Option<String>,
    pub retailer: Option<String>,
    pub franchise: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub valid: Option<bool>,
}

impl SaleFilterQuery {
    fn into_filter(self) -> ApiResult<SaleFilter> {
        Ok(SaleFilter {
            range: DateRange::resolve(self.start_date.as_deref(), self.end_date.as_deref())?,
            salesman_id: non_blank(self.salesman),
            retailer_id: non_blank(self.retailer),
            product: non_blank(self.product),
            franchise_id: non_blank(self.franchise),
            valid: self.valid,
        })
    }
}

pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[derive(Debug, Deserialize)]
pub struct ValidityRequest {
    pub valid: bool,
}

// =============================================================================
// Salesman Handlers
// =============================================================================

async fn create_sale(
    State(state): State<SharedState>,
    auth: AuthSalesman,
    ApiJson(req): ApiJson<SaleRequest>,
) -> ApiResult<(StatusCode, Json<SaleResponse>)> {
    let sale = req.validate()?;
    let retailer = state.db.retailers().get(&sale.retailer_id).await?;

    let assessment = state.validator.assess(sale.location, retailer.location());

    let created = state
        .db
        .sales()
        .create(NewSale {
            retailer_id: sale.retailer_id,
            added_by: auth.salesman.id.clone(),
            lines: sale.lines,
            amount: sale.amount,
            location: sale.location,
            valid: assessment.valid,
            distance_meters: assessment.distance_meters,
        })
        .await?;

    info!(
        sale = %created.id,
        salesman = %auth.salesman.id,
        retailer = %created.retailer_id,
        amount = %created.amount,
        valid = created.valid,
        "Sale recorded"
    );

    Ok((StatusCode::CREATED, Json(created.into())))
}

async fn list_own_sales(
    State(state): State<SharedState>,
    auth: AuthSalesman,
) -> ApiResult<Json<Vec<SaleResponse>>> {
    let sales = state.db.sales().list(&SaleFilter::for_actor(&auth.actor())).await?;
    Ok(respond(sales))
}

async fn list_retailer_sales(
    State(state): State<SharedState>,
    auth: AuthSalesman,
    Path(retailer_id): Path<String>,
) -> ApiResult<Json<Vec<SaleResponse>>> {
    let filter = SaleFilter {
        retailer_id: Some(retailer_id),
        ..SaleFilter::for_actor(&auth.actor())
    };
    let sales = state.db.sales().list(&filter).await?;
    Ok(respond(sales))
}

async fn get_sale(
    State(state): State<SharedState>,
    auth: AuthSalesman,
    Path(id): Path<String>,
) -> ApiResult<Json<SaleResponse>> {
    let sale = state.db.sales().get(&auth.actor(), &id).await?;
    Ok(Json(sale.into()))
}

async fn update_sale(
    State(state): State<SharedState>,
    auth: AuthSalesman,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<SaleRequest>,
) -> ApiResult<Json<SaleResponse>> {
    let sale = req.validate()?;
    state.db.retailers().get(&sale.retailer_id).await?;

    let updated = state
        .db
        .sales()
        .update(
            &auth.actor(),
            &id,
            SaleUpdate {
                retailer_id: sale.retailer_id,
                lines: sale.lines,
                amount: sale.amount,
                location: sale.location,
            },
        )
        .await?;

    Ok(Json(updated.into()))
}

async fn delete_sale(
    State(state): State<SharedState>,
    auth: AuthSalesman,
    Path(id): Path<String>,
) -> ApiResult<Json<Message>> {
    state.db.sales().delete(&auth.actor(), &id).await?;
    Ok(Json(Message::new("Sale deleted successfully")))
}

// =============================================================================
// Admin Handlers
// =============================================================================

async fn admin_list_all(
    State(state): State<SharedState>,
    _admin: AuthAdmin,
) -> ApiResult<Json<Vec<SaleResponse>>> {
    let sales = state.db.sales().list(&SaleFilter::default()).await?;
    Ok(respond(sales))
}

async fn admin_list_filtered(
    State(state): State<SharedState>,
    _admin: AuthAdmin,
    ApiQuery(query): ApiQuery<SaleFilterQuery>,
) -> ApiResult<Json<Vec<SaleResponse>>> {
    let sales = state.db.sales().list(&query.into_filter()?).await?;
    Ok(respond(sales))
}

async fn admin_set_validity(
    State(state): State<SharedState>,
    admin: AuthAdmin,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<ValidityRequest>,
) -> ApiResult<Json<SaleResponse>> {
    let sale = state.db.sales().set_validity(&id, req.valid).await?;
    info!(sale = %id, valid = req.valid, admin = %admin.admin.id, "Sale validity overridden");
    Ok(Json(sale.into()))
}

async fn admin_delete_sale(
    State(state): State<SharedState>,
    admin: AuthAdmin,
    Path(id): Path<String>,
) -> ApiResult<Json<Message>> {
    state.db.sales().delete(&admin.actor(), &id).await?;
    Ok(Json(Message::new("Sale deleted successfully")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;

    #[test]
    fn test_product_map_keeps_order() {
        let json = r#"{"Tea":{"quantity":2,"price":150},"Biscuits":{"quantity":1,"price":80,"total":80}}"#;
        let map: ProductMap = serde_json::from_str(json).unwrap();
        let names: Vec<&str> = map.0.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["Tea", "Biscuits"]);

        let lines = map.to_lines().unwrap();
        assert_eq!(lines[0].line_total, Money::from_cents(300));

        let back = serde_json::to_value(ProductMap::from_lines(&lines)).unwrap();
        assert_eq!(back["Tea"]["total"], 300);
    }

    #[test]
    fn test_request_validation() {
        let req: SaleRequest = serde_json::from_value(serde_json::json!({
            "retailer": "r1",
            "products": {"Tea": {"quantity": 2, "price": 150}},
            "amount": 301,
            "coordinates": {"type": "Point", "coordinates": [0.0, 0.0]}
        }))
        .unwrap();
        assert!(matches!(req.validate(), Err(ApiError::Validation(_))));

        let req: SaleRequest = serde_json::from_value(serde_json::json!({
            "retailer": "r1",
            "products": {"Tea": {"quantity": 2, "price": 150}},
            "coordinates": {"coordinates": [74.35, 31.52]}
        }))
        .unwrap();
        let sale = req.validate().unwrap();
        assert_eq!(sale.amount, Money::from_cents(300));

        let req: SaleRequest = serde_json::from_value(serde_json::json!({
            "retailer": "r1",
            "products": {},
            "coordinates": {"coordinates": [0.0]}
        }))
        .unwrap();
        assert!(req.validate().is_err());
    }
}
