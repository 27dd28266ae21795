//! # Field Sales API
//!
//! HTTP server for the field sales tracker.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          API Request Path                               │
//! │                                                                         │
//! │  TraceLayer ─► CatchPanicLayer ─► TimeoutLayer ─► CorsLayer ─► Router  │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌──────────────────────────┐  │
//! │  │  salesman      │  │  admin         │  │  public                  │  │
//! │  │  AuthSalesman  │  │  AuthAdmin     │  │  banner, health,         │  │
//! │  │  sales,        │  │  oversight,    │  │  register/login, setup,  │  │
//! │  │  retailers     │  │  statistics,   │  │  product catalogue       │  │
//! │  │                │  │  CSV import    │  │                          │  │
//! │  └────────────────┘  └────────────────┘  └──────────────────────────┘  │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                      Shared State (Arc)                           │  │
//! │  │   Database pool • ApiConfig • JwtManager • SaleValidator         │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! See [`config::ApiConfig`]. Environment variables:
//! - `PORT` - HTTP port (default: 5000)
//! - `DATABASE_URL` - SQLite URL (default: `sqlite://fieldsales.db`)
//! - `JWT_SECRET` - Secret for JWT signing
//! - `MAX_SALE_DISTANCE_METERS` - Sale validity threshold (default: 200)
//! - `REQUEST_TIMEOUT_SECS` - Per-request timeout (default: 30)

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod import;
pub mod routes;

use std::any::Any;
use std::sync::Arc;
use std::time::Instant;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use fieldsales_core::validity::SaleValidator;
use fieldsales_db::Database;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

// Re-exports
pub use auth::JwtManager;
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};

/// Shared application state.
pub struct AppState {
    pub db: Database,
    pub config: ApiConfig,
    pub jwt: JwtManager,
    pub validator: SaleValidator,
    pub started_at: Instant,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(db: Database, config: ApiConfig) -> Self {
        let jwt = JwtManager::new(
            &config.jwt_secret,
            config.jwt_salesman_lifetime_secs,
            config.jwt_admin_lifetime_secs,
        );
        let validator = SaleValidator::new(config.max_sale_distance_meters);
        error::expose_internal_details(config.is_development());

        AppState {
            db,
            config,
            jwt,
            validator,
            started_at: Instant::now(),
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

/// Builds the full router with middleware.
pub fn build_router(state: SharedState) -> Router {
    let timeout = state.config.request_timeout();

    routes::router()
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CatchPanicLayer::custom(panic_response))
                .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout))
                .layer(CorsLayer::permissive()),
        )
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    error!(panic = %detail, "Handler panicked");

    let body = serde_json::json!({
        "error": "internal_error",
        "message": "Internal server error",
    });
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}
