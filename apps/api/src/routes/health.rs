//! Service banner and health check.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use crate::SharedState;

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/", get(banner))
        .route("/health", get(health))
}

#[derive(Debug, Serialize)]
pub struct Banner {
    pub name: &'static str,
    pub version: &'static str,
    pub status: &'static str,
    pub endpoints: Endpoints,
}

#[derive(Debug, Serialize)]
pub struct Endpoints {
    pub health: &'static str,
    pub salesmen: &'static str,
    pub retailers: &'static str,
    pub products: &'static str,
    pub sales: &'static str,
    pub admin: &'static str,
    pub franchises: &'static str,
    pub statistics: &'static str,
    #[serde(rename = "graphData")]
    pub graph_data: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub connect_attempts: u32,
    pub uptime_secs: u64,
    pub server_time: DateTime<Utc>,
}

async fn banner() -> Json<Banner> {
    Json(Banner {
        name: "Field Sales API",
        version: env!("CARGO_PKG_VERSION"),
        status: "running",
        endpoints: Endpoints {
            health: "/health",
            salesmen: "/api/salesmen",
            retailers: "/api/retailers",
            products: "/api/products",
            sales: "/api/sales",
            admin: "/api/admin",
            franchises: "/api/franchises",
            statistics: "/admin/statistics",
            graph_data: "/admin/graph-data",
        },
    })
}

async fn health(State(state): State<SharedState>) -> (StatusCode, Json<HealthResponse>) {
    let connected = state.db.health_check().await;

    let (code, status, database) = if connected {
        (StatusCode::OK, "healthy", "connected")
    } else {
        warn!("Health check failed: database unreachable");
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy", "disconnected")
    };

    (
        code,
        Json(HealthResponse {
            status,
            database,
            connect_attempts: state.db.connect_attempts(),
            uptime_secs: state.uptime_secs(),
            server_time: Utc::now(),
        }),
    )
}
