//! # Sale Validity
//!
//! Decides whether a sale was recorded close enough to its retailer.
//!
//! ## Decision Table
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  retailer location   distance            verdict                        │
//! │  ─────────────────   ─────────────────   ──────────────────────────     │
//! │  missing             (not computed)      invalid, distance = None       │
//! │  present             NaN / infinite      invalid, distance = None       │
//! │  present             d ≤ threshold       valid,   distance = Some(d)    │
//! │  present             d > threshold       invalid, distance = Some(d)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The verdict never blocks persistence: an invalid sale is still stored,
//! flagged `valid = false`, and can be overridden by an admin.

use serde::Serialize;
use tracing::{debug, warn};

use crate::geo::{haversine_distance, round_for_display, GeoPoint};
use crate::MAX_SALE_DISTANCE_METERS;

/// Result of a proximity check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidityAssessment {
    pub valid: bool,
    /// Full-precision distance in meters, when it could be computed.
    pub distance_meters: Option<f64>,
}

impl ValidityAssessment {
    const fn invalid() -> Self {
        ValidityAssessment {
            valid: false,
            distance_meters: None,
        }
    }
}

/// Proximity policy for new sales.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SaleValidator {
    pub max_distance_meters: f64,
}

impl Default for SaleValidator {
    fn default() -> Self {
        SaleValidator {
            max_distance_meters: MAX_SALE_DISTANCE_METERS,
        }
    }
}

impl SaleValidator {
    pub const fn new(max_distance_meters: f64) -> Self {
        SaleValidator {
            max_distance_meters,
        }
    }

    /// Assesses a sale recorded at `sale_point` against its retailer.
    ///
    /// ## Example
    /// ```rust
    /// use fieldsales_core::geo::GeoPoint;
    /// use fieldsales_core::validity::SaleValidator;
    ///
    /// let validator = SaleValidator::new(200.0);
    /// let far = validator.assess(GeoPoint::new(0.0, 0.01), Some(GeoPoint::new(0.0, 0.0)));
    /// assert!(!far.valid);
    ///
    /// let unknown = validator.assess(GeoPoint::new(0.0, 0.0), None);
    /// assert!(!unknown.valid);
    /// assert!(unknown.distance_meters.is_none());
    /// ```
    pub fn assess(&self, sale_point: GeoPoint, retailer_point: Option<GeoPoint>) -> ValidityAssessment {
        let Some(retailer_point) = retailer_point else {
            warn!("Retailer has no coordinates, marking sale invalid");
            return ValidityAssessment::invalid();
        };

        let distance = haversine_distance(sale_point, retailer_point);
        if !distance.is_finite() {
            warn!(
                sale_longitude = sale_point.longitude,
                sale_latitude = sale_point.latitude,
                "Distance computation failed, marking sale invalid"
            );
            return ValidityAssessment::invalid();
        }

        let valid = distance <= self.max_distance_meters;

        debug!(
            distance_meters = round_for_display(distance),
            max_distance_meters = self.max_distance_meters,
            sale = ?[round_for_display(sale_point.longitude), round_for_display(sale_point.latitude)],
            retailer = ?[round_for_display(retailer_point.longitude), round_for_display(retailer_point.latitude)],
            valid,
            "Sale proximity assessed"
        );

        ValidityAssessment {
            valid,
            distance_meters: Some(distance),
        }
    }
}
