//! # fieldsales-core: Pure Business Logic for the Field Sales Tracker
//!
//! This crate holds every rule that decides what a sale *means*: how far it
//! was recorded from its retailer, whether it counts as valid, whether its
//! amounts add up, and how sales roll up into statistics. It has zero I/O
//! dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Field Sales Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    apps/api (axum)                              │   │
//! │  │    auth extractors ──► handlers ──► JSON responses             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ fieldsales-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐  ┌──────────┐  ┌────────────┐  ┌─────────────┐   │   │
//! │  │   │   geo   │  │ validity │  │ validation │  │ statistics  │   │   │
//! │  │   │haversine│  │ 200 m    │  │ lines, sim │  │ rollups,    │   │   │
//! │  │   │         │  │ policy   │  │ amounts    │  │ day series  │   │   │
//! │  │   └─────────┘  └──────────┘  └────────────┘  └─────────────┘   │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 fieldsales-db (Database Layer)                  │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Sale, Retailer, Salesman, Franchise, ...)
//! - [`money`] - Money type with integer arithmetic
//! - [`geo`] - Great-circle distance
//! - [`validity`] - Proximity policy that marks a sale valid or invalid
//! - [`validation`] - Input validation and the sale amount invariant
//! - [`statistics`] - Product / franchise rollups and the daily series
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use fieldsales_core::geo::GeoPoint;
//! use fieldsales_core::validity::SaleValidator;
//!
//! let retailer = GeoPoint::new(0.0, 0.0);
//! let near = GeoPoint::new(0.0, 0.0017);
//!
//! let assessment = SaleValidator::default().assess(near, Some(retailer));
//! assert!(assessment.valid);
//! ```

pub mod error;
pub mod geo;
pub mod money;
pub mod statistics;
pub mod types;
pub mod validation;
pub mod validity;

pub use error::{CoreError, ValidationError};
pub use geo::GeoPoint;
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distance in meters between a sale and its retailer for the sale
/// to count as valid.
pub const MAX_SALE_DISTANCE_METERS: f64 = 200.0;

/// Decimal places used when coordinates and distances are written to logs.
///
/// Stored values always keep full precision.
pub const COORDINATE_DECIMAL_PLACES: u32 = 4;

/// Mean Earth radius in meters used by the haversine formula.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Franchise label used in statistics for salesmen without a franchise.
pub const UNKNOWN_FRANCHISE: &str = "Unknown";

/// Maximum quantity of a single product line in one sale.
pub const MAX_LINE_QUANTITY: i64 = 100_000;

/// Maximum unit price in cents (1,000,000,000.00).
pub const MAX_UNIT_PRICE_CENTS: i64 = 100_000_000_000;

/// Maximum sale amount in cents (10,000,000,000.00).
///
/// Millions of sales at this ceiling still sum without reaching `i64::MAX`.
pub const MAX_SALE_AMOUNT_CENTS: i64 = 1_000_000_000_000;
