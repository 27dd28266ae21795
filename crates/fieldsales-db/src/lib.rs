//! # fieldsales-db: Database Layer for the Field Sales Tracker
//!
//! This crate owns every SQL statement in the system. It uses SQLite with
//! sqlx for async operations and embeds its migrations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Field Sales Data Flow                              │
//! │                                                                         │
//! │  axum handler (POST /api/sales)                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  fieldsales-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐   ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │   │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │                │   │  (embedded)  │  │   │
//! │  │   │               │    │ SaleRepo       │   │              │  │   │
//! │  │   │ SqlitePool    │◄───│ RetailerRepo   │   │ 001_init.sql │  │   │
//! │  │   │ retry/backoff │    │ StatisticsRepo │   │ 002_idx.sql  │  │   │
//! │  │   └───────────────┘    └────────────────┘   └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │                  (DATABASE_URL, WAL mode)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation, configuration and connect retry
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (sale, retailer, etc.)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use fieldsales_db::{Database, DbConfig, SaleFilter};
//!
//! let db = Database::connect_with_retry(DbConfig::from_url("sqlite://fieldsales.db")).await?;
//!
//! let sales = db.sales().list(&SaleFilter::for_actor(&actor)).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::admin::{AdminRepository, NewAdmin};
pub use repository::franchise::{FranchisePatch, FranchiseRepository, NewFranchise};
pub use repository::product::{NewProduct, ProductPatch, ProductRepository};
pub use repository::retailer::{NearbyRetailer, NewRetailer, RetailerPatch, RetailerRepository};
pub use repository::sale::{NewSale, SaleFilter, SaleRepository, SaleUpdate};
pub use repository::salesman::{NewSalesman, SalesmanCascade, SalesmanFilter, SalesmanPatch, SalesmanRepository};
pub use repository::statistics::StatisticsRepository;
