//! HTTP routes.
//!
//! Each module owns the handlers and DTOs for one resource and exposes a
//! `routes()` function; [`router`] merges them.

pub mod admin;
pub mod franchises;
pub mod health;
pub mod products;
pub mod retailers;
pub mod sales;
pub mod salesmen;
pub mod statistics;

use axum::Router;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::SharedState;

/// Create the combined router.
pub fn router() -> Router<SharedState> {
    Router::new()
        .merge(health::routes())
        .merge(admin::routes())
        .merge(salesmen::routes())
        .merge(retailers::routes())
        .merge(products::routes())
        .merge(franchises::routes())
        .merge(sales::routes())
        .merge(statistics::routes())
}

/// Simple `{ "message": ... }` acknowledgement.
#[derive(Debug, Serialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Message {
            message: message.into(),
        }
    }
}

/// GeoJSON point as it appears on the wire: `{"type":"Point","coordinates":[lon, lat]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointDto {
    #[serde(rename = "type", default = "point_type")]
    pub kind: String,
    pub coordinates: Vec<f64>,
}

fn point_type() -> String {
    "Point".to_string()
}

impl PointDto {
    pub fn from_point(point: fieldsales_core::GeoPoint) -> Self {
        PointDto {
            kind: point_type(),
            coordinates: point.to_pair().to_vec(),
        }
    }

    /// Validates the GeoJSON shape and the coordinate pair.
    pub fn to_point(&self) -> Result<fieldsales_core::GeoPoint, ApiError> {
        if self.kind != "Point" {
            return Err(ApiError::validation("coordinates.type must be \"Point\""));
        }
        Ok(fieldsales_core::validation::validate_coordinates(&self.coordinates)?)
    }
}
