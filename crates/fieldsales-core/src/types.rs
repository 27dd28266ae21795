//! # Domain Types
//!
//! Core domain types used throughout the field sales tracker.
//!
//! ## Ownership
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐        ┌─────────────────┐                        │
//! │  │   Franchise     │ 0..1   │    Salesman     │                        │
//! │  │  ─────────────  │◄───────│  ─────────────  │                        │
//! │  │  master_sim_no  │        │  email (unique) │                        │
//! │  └─────────────────┘        └───┬─────────┬───┘                        │
//! │                                 │ owns    │ owns                        │
//! │                   ┌─────────────▼───┐  ┌──▼──────────────┐             │
//! │                   │    Retailer     │  │      Sale       │             │
//! │                   │  ─────────────  │◄─│  ─────────────  │             │
//! │                   │  location       │  │  lines, amount  │             │
//! │                   └─────────────────┘  │  location,valid │             │
//! │                                        └─────────────────┘             │
//! │  ┌─────────────────┐   ┌─────────────────┐                             │
//! │  │    Product      │   │     Admin       │   (at most one row)         │
//! │  └─────────────────┘   └─────────────────┘                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every entity carries a UUID v4 string `id`. Credential hashes are never
//! serialized.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;
use crate::money::Money;

// =============================================================================
// Roles & Actors
// =============================================================================

/// The two token schemes accepted by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Salesman,
    Admin,
}

impl Role {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::Salesman => "salesman",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who is performing an operation.
///
/// Produced by the API's auth extractors and passed into repository calls
/// that scope their queries by owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    Salesman { id: String },
    Admin { id: String },
}

impl Actor {
    pub fn id(&self) -> &str {
        match self {
            Actor::Salesman { id } | Actor::Admin { id } => id,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Actor::Salesman { .. } => Role::Salesman,
            Actor::Admin { .. } => Role::Admin,
        }
    }

    /// Owner filter for scoped queries. Admins see everything.
    pub fn owner_scope(&self) -> Option<&str> {
        match self {
            Actor::Salesman { id } => Some(id),
            Actor::Admin { .. } => None,
        }
    }
}

// =============================================================================
// Sale
// =============================================================================

/// One product line of a sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleLine {
    /// Product name as entered by the salesman.
    pub product: String,
    pub quantity: i64,
    pub unit_price: Money,
    /// Always `unit_price × quantity` once validated.
    pub line_total: Money,
}

/// A recorded sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: String,
    pub retailer_id: String,
    /// The salesman who recorded the sale (owner).
    pub added_by: String,
    /// Ordered product lines. The keyed product map exists only on the wire.
    pub lines: Vec<SaleLine>,
    pub amount: Money,
    /// Where the sale was recorded.
    pub location: GeoPoint,
    /// Proximity verdict set at creation; admins may override it.
    pub valid: bool,
    /// Distance to the retailer at creation time, when it could be computed.
    pub distance_meters: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Retailer
// =============================================================================

/// A shop visited by salesmen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Retailer {
    pub id: String,
    pub retailer_name: String,
    pub shop_name: String,
    /// Unique across retailers.
    pub contact_no: String,
    pub contact_no2: Option<String>,
    pub address: String,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    /// Salesman who created the record.
    pub added_by: String,
    pub assigned_salesman: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Retailer {
    /// The retailer's point, if both coordinates are recorded.
    pub fn location(&self) -> Option<GeoPoint> {
        match (self.longitude, self.latitude) {
            (Some(lon), Some(lat)) => Some(GeoPoint::new(lon, lat)),
            _ => None,
        }
    }
}

// =============================================================================
// Product
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    /// Unique across products.
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    pub is_active: bool,
    pub added_by: Option<String>,
    pub assigned_salesman: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Salesman
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Salesman {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    /// Display name, `first_name last_name` unless set explicitly.
    pub name: String,
    /// Stored lowercase; unique.
    pub email: String,
    pub contact_no: String,
    pub contact_no2: Option<String>,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub franchise_id: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Franchise
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Franchise {
    pub id: String,
    pub name: String,
    pub address: String,
    /// Digits only, 10-15 long; unique.
    pub master_sim_no: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The slice of a franchise the statistics rollups need.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct FranchiseRef {
    pub id: String,
    pub name: String,
}

// =============================================================================
// Admin
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Admin {
    pub id: String,
    pub email: String,
    pub phone: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_scope() {
        let salesman = Actor::Salesman { id: "s-1".into() };
        let admin = Actor::Admin { id: "a-1".into() };

        assert_eq!(salesman.owner_scope(), Some("s-1"));
        assert_eq!(admin.owner_scope(), None);
        assert_eq!(admin.role(), Role::Admin);
        assert_eq!(salesman.id(), "s-1");
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Salesman).unwrap(), "\"salesman\"");
        let role: Role = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(role, Role::Admin);
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let now = Utc::now();
        let admin = Admin {
            id: "a-1".into(),
            email: "boss@example.com".into(),
            phone: "03001234567".into(),
            password_hash: "$argon2id$secret".into(),
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_string(&admin).unwrap();
        assert!(!json.contains("argon2"));
        assert!(json.contains("\"email\""));
    }

    #[test]
    fn test_retailer_location_requires_both_coordinates() {
        let now = Utc::now();
        let mut retailer = Retailer {
            id: "r-1".into(),
            retailer_name: "Ali".into(),
            shop_name: "Ali Store".into(),
            contact_no: "03001112222".into(),
            contact_no2: None,
            address: "Main Bazaar".into(),
            longitude: Some(73.0),
            latitude: None,
            added_by: "s-1".into(),
            assigned_salesman: Some("s-1".into()),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        assert!(retailer.location().is_none());

        retailer.latitude = Some(33.0);
        assert_eq!(retailer.location(), Some(GeoPoint::new(73.0, 33.0)));
    }
}
