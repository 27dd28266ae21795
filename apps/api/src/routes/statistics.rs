//! Statistics routes.
//!
//! The repository filters and loads [`SaleFact`](fieldsales_core::statistics::SaleFact)s;
//! the grouping runs in `fieldsales-core`.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use fieldsales_core::statistics::{
    aggregate, restrict_to_product, series_window, time_series, DateRange, DayBucket, SalesStatistics,
};
use fieldsales_db::SaleFilter;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::sales::non_blank;
use crate::auth::{AuthAdmin, AuthSalesman};
use crate::error::ApiResult;
use crate::extract::ApiQuery;
use crate::SharedState;

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/api/sales/statistics", get(salesman_statistics))
        .route("/admin/statistics", get(admin_statistics))
        .route("/admin/graph-data", get(graph_data))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesmanStatisticsQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub retailer_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStatisticsQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// Franchise id
    pub franchise: Option<String>,
    pub product: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphResponse {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub series: Vec<DayBucket>,
}

async fn salesman_statistics(
    State(state): State<SharedState>,
    auth: AuthSalesman,
    ApiQuery(query): ApiQuery<SalesmanStatisticsQuery>,
) -> ApiResult<Json<SalesStatistics>> {
    let filter = SaleFilter {
        range: DateRange::resolve(query.start_date.as_deref(), query.end_date.as_deref())?,
        retailer_id: non_blank(query.retailer_id),
        ..SaleFilter::for_actor(&auth.actor())
    };

    let facts = state.db.statistics().sale_facts(&filter).await?;
    Ok(Json(aggregate(&facts)))
}

async fn admin_statistics(
    State(state): State<SharedState>,
    _admin: AuthAdmin,
    ApiQuery(query): ApiQuery<AdminStatisticsQuery>,
) -> ApiResult<Json<SalesStatistics>> {
    let filter = SaleFilter {
        range: DateRange::resolve(query.start_date.as_deref(), query.end_date.as_deref())?,
        franchise_id: non_blank(query.franchise),
        product: non_blank(query.product),
        ..SaleFilter::default()
    };

    let mut facts = state.db.statistics().sale_facts(&filter).await?;
    if let Some(product) = &filter.product {
        restrict_to_product(&mut facts, product);
    }
    debug!(facts = facts.len(), "Aggregating admin statistics");
    Ok(Json(aggregate(&facts)))
}

async fn graph_data(
    State(state): State<SharedState>,
    _admin: AuthAdmin,
    ApiQuery(query): ApiQuery<GraphQuery>,
) -> ApiResult<Json<GraphResponse>> {
    let range = DateRange::resolve(query.start_date.as_deref(), query.end_date.as_deref())?;

    let latest = if range.start.is_none() || range.end.is_none() {
        state.db.statistics().latest_sale_at(&SaleFilter::default()).await?
    } else {
        None
    };

    let Some((start, end)) = series_window(&range, latest) else {
        return Ok(Json(GraphResponse {
            start_date: None,
            end_date: None,
            series: Vec::new(),
        }));
    };

    let filter = SaleFilter {
        range: DateRange::new(start, end),
        ..SaleFilter::default()
    };
    let facts = state.db.statistics().sale_facts(&filter).await?;
    let series = time_series(&facts, start, end)?;

    Ok(Json(GraphResponse {
        start_date: Some(start),
        end_date: Some(end),
        series,
    }))
}
