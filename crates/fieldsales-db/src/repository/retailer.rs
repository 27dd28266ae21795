//! # Retailer Repository
//!
//! Database operations for retailers.
//!
//! ## Nearby Search
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    How Nearby Search Works                              │
//! │                                                                         │
//! │  center + radius                                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  bounding_deltas() ──► lat/lon box                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQL: WHERE latitude BETWEEN .. AND longitude BETWEEN ..               │
//! │       (idx_retailers_location)                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  haversine_distance() on each candidate, drop > radius,                │
//! │  sort by distance ascending                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use fieldsales_core::geo::{bounding_deltas, haversine_distance};
use fieldsales_core::{Actor, GeoPoint, Retailer};
use serde::Serialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};

const RETAILER_COLUMNS: &str = "id, retailer_name, shop_name, contact_no, contact_no2, address, \
                                longitude, latitude, added_by, assigned_salesman, is_active, \
                                created_at, updated_at";

/// A validated retailer ready to be stored.
#[derive(Debug, Clone)]
pub struct NewRetailer {
    pub retailer_name: String,
    pub shop_name: String,
    pub contact_no: String,
    pub contact_no2: Option<String>,
    pub address: String,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub added_by: String,
    pub assigned_salesman: Option<String>,
}

/// Partial update; `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default)]
pub struct RetailerPatch {
    pub retailer_name: Option<String>,
    pub shop_name: Option<String>,
    pub contact_no: Option<String>,
    pub contact_no2: Option<Option<String>>,
    pub address: Option<String>,
    pub location: Option<Option<GeoPoint>>,
    pub assigned_salesman: Option<Option<String>>,
    pub is_active: Option<bool>,
}

/// A retailer with its distance from the search center.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyRetailer {
    #[serde(flatten)]
    pub retailer: Retailer,
    pub distance_meters: f64,
}

/// Repository for retailer database operations.
#[derive(Debug, Clone)]
pub struct RetailerRepository {
    pool: SqlitePool,
}

impl RetailerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        RetailerRepository { pool }
    }

    /// Creates a retailer. The contact number must be unused.
    pub async fn create(&self, new: NewRetailer) -> DbResult<Retailer> {
        if self.contact_exists(&new.contact_no).await? {
            return Err(DbError::duplicate("contactNo", &new.contact_no));
        }

        let now = Utc::now();
        let retailer = Retailer {
            id: Uuid::new_v4().to_string(),
            retailer_name: new.retailer_name,
            shop_name: new.shop_name,
            contact_no: new.contact_no,
            contact_no2: new.contact_no2,
            address: new.address,
            longitude: new.longitude,
            latitude: new.latitude,
            added_by: new.added_by,
            assigned_salesman: new.assigned_salesman,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        debug!(
            id = %retailer.id,
            shop_name = %retailer.shop_name,
            added_by = %retailer.added_by,
            has_location = retailer.location().is_some(),
            "Creating retailer"
        );

        sqlx::query(
            r#"
            INSERT INTO retailers (
                id, retailer_name, shop_name, contact_no, contact_no2, address,
                longitude, latitude, added_by, assigned_salesman, is_active,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)
            "#,
        )
        .bind(&retailer.id)
        .bind(&retailer.retailer_name)
        .bind(&retailer.shop_name)
        .bind(&retailer.contact_no)
        .bind(&retailer.contact_no2)
        .bind(&retailer.address)
        .bind(retailer.longitude)
        .bind(retailer.latitude)
        .bind(&retailer.added_by)
        .bind(&retailer.assigned_salesman)
        .bind(retailer.is_active)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(retailer)
    }

    pub async fn contact_exists(&self, contact_no: &str) -> DbResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM retailers WHERE contact_no = ?1")
            .bind(contact_no)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    /// Gets a retailer regardless of owner (sale validation, admin views).
    pub async fn get(&self, id: &str) -> DbResult<Retailer> {
        sqlx::query_as::<_, Retailer>(&format!("SELECT {RETAILER_COLUMNS} FROM retailers WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Retailer", id))
    }

    /// Gets a retailer visible to `actor`: salesmen see retailers they added
    /// or are assigned to.
    pub async fn get_visible(&self, actor: &Actor, id: &str) -> DbResult<Retailer> {
        let retailer = self.get(id).await?;
        match actor.owner_scope() {
            Some(owner) if !is_visible_to(&retailer, owner) => Err(DbError::not_found("Retailer", id)),
            _ => Ok(retailer),
        }
    }

    /// Lists retailers visible to `actor`, newest first.
    pub async fn list(&self, actor: &Actor) -> DbResult<Vec<Retailer>> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {RETAILER_COLUMNS} FROM retailers WHERE 1 = 1"));
        if let Some(owner) = actor.owner_scope() {
            qb.push(" AND (added_by = ")
                .push_bind(owner.to_string())
                .push(" OR assigned_salesman = ")
                .push_bind(owner.to_string())
                .push(")");
        }
        qb.push(" ORDER BY created_at DESC, id");

        let retailers = qb.build_query_as::<Retailer>().fetch_all(&self.pool).await?;
        debug!(count = retailers.len(), actor = %actor.id(), "Listed retailers");
        Ok(retailers)
    }

    /// Active retailers within `radius_meters` of `center`, nearest first.
    pub async fn nearby(&self, center: GeoPoint, radius_meters: f64) -> DbResult<Vec<NearbyRetailer>> {
        let (delta_lat, delta_lon) = bounding_deltas(center, radius_meters);

        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {RETAILER_COLUMNS} FROM retailers \
             WHERE is_active = 1 AND latitude IS NOT NULL AND longitude IS NOT NULL"
        ));
        qb.push(" AND latitude BETWEEN ")
            .push_bind(center.latitude - delta_lat)
            .push(" AND ")
            .push_bind(center.latitude + delta_lat);
        if delta_lon < 180.0 {
            let west = center.longitude - delta_lon;
            let east = center.longitude + delta_lon;
            if west < -180.0 || east > 180.0 {
                // Box crosses the antimeridian: keep both sides.
                let (west, east) = (wrap_longitude(west), wrap_longitude(east));
                qb.push(" AND (longitude >= ")
                    .push_bind(west)
                    .push(" OR longitude <= ")
                    .push_bind(east)
                    .push(")");
            } else {
                qb.push(" AND longitude BETWEEN ")
                    .push_bind(west)
                    .push(" AND ")
                    .push_bind(east);
            }
        }

        let candidates = qb.build_query_as::<Retailer>().fetch_all(&self.pool).await?;

        let mut nearby: Vec<NearbyRetailer> = candidates
            .into_iter()
            .filter_map(|retailer| {
                let distance = haversine_distance(center, retailer.location()?);
                (distance <= radius_meters).then_some(NearbyRetailer {
                    retailer,
                    distance_meters: distance,
                })
            })
            .collect();
        nearby.sort_by(|a, b| a.distance_meters.total_cmp(&b.distance_meters));

        debug!(count = nearby.len(), radius_meters, "Nearby retailers found");
        Ok(nearby)
    }

    /// Applies a partial update. Salesmen may only update retailers they added.
    pub async fn update(&self, actor: &Actor, id: &str, patch: RetailerPatch) -> DbResult<Retailer> {
        let mut retailer = self.get(id).await?;
        if let Some(owner) = actor.owner_scope() {
            if retailer.added_by != owner {
                return Err(DbError::not_found("Retailer", id));
            }
        }

        if let Some(contact_no) = patch.contact_no {
            if contact_no != retailer.contact_no && self.contact_exists(&contact_no).await? {
                return Err(DbError::duplicate("contactNo", contact_no));
            }
            retailer.contact_no = contact_no;
        }
        if let Some(retailer_name) = patch.retailer_name {
            retailer.retailer_name = retailer_name;
        }
        if let Some(shop_name) = patch.shop_name {
            retailer.shop_name = shop_name;
        }
        if let Some(contact_no2) = patch.contact_no2 {
            retailer.contact_no2 = contact_no2;
        }
        if let Some(address) = patch.address {
            retailer.address = address;
        }
        if let Some(location) = patch.location {
            retailer.longitude = location.map(|p| p.longitude);
            retailer.latitude = location.map(|p| p.latitude);
        }
        if let Some(assigned) = patch.assigned_salesman {
            retailer.assigned_salesman = assigned;
        }
        if let Some(is_active) = patch.is_active {
            retailer.is_active = is_active;
        }
        retailer.updated_at = Utc::now();

        debug!(id = %id, actor = %actor.id(), "Updating retailer");

        sqlx::query(
            r#"
            UPDATE retailers SET
                retailer_name = ?2, shop_name = ?3, contact_no = ?4, contact_no2 = ?5,
                address = ?6, longitude = ?7, latitude = ?8, assigned_salesman = ?9,
                is_active = ?10, updated_at = ?11
            WHERE id = ?1
            "#,
        )
        .bind(&retailer.id)
        .bind(&retailer.retailer_name)
        .bind(&retailer.shop_name)
        .bind(&retailer.contact_no)
        .bind(&retailer.contact_no2)
        .bind(&retailer.address)
        .bind(retailer.longitude)
        .bind(retailer.latitude)
        .bind(&retailer.assigned_salesman)
        .bind(retailer.is_active)
        .bind(retailer.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(retailer)
    }

    /// Deletes a retailer the salesman added. Its sales go with it through
    /// the `ON DELETE CASCADE` foreign key.
    pub async fn delete(&self, actor: &Actor, id: &str) -> DbResult<()> {
        let owner = match actor.owner_scope() {
            Some(owner) => owner,
            None => return self.delete_cascade(id).await.map(|_| ()),
        };

        let result = sqlx::query("DELETE FROM retailers WHERE id = ?1 AND added_by = ?2")
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Retailer", id));
        }

        debug!(id = %id, owner = %owner, "Retailer deleted");
        Ok(())
    }

    /// Admin delete: removes the retailer and all of its sales in one
    /// transaction. Returns the number of sales removed.
    pub async fn delete_cascade(&self, id: &str) -> DbResult<u64> {
        let mut tx = self.pool.begin().await?;

        let sales = sqlx::query("DELETE FROM sales WHERE retailer_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let result = sqlx::query("DELETE FROM retailers WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Retailer", id));
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(id = %id, sales, "Retailer deleted with cascade");
        Ok(sales)
    }
}

fn wrap_longitude(longitude: f64) -> f64 {
    if longitude > 180.0 {
        longitude - 360.0
    } else if longitude < -180.0 {
        longitude + 360.0
    } else {
        longitude
    }
}

fn is_visible_to(retailer: &Retailer, salesman_id: &str) -> bool {
    retailer.added_by == salesman_id || retailer.assigned_salesman.as_deref() == Some(salesman_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::sale::{NewSale, SaleFilter};
    use crate::repository::test_support::{seed_retailer, seed_salesman};
    use crate::{Database, DbConfig};
    use fieldsales_core::validation::build_sale_line;
    use fieldsales_core::Money;

    #[tokio::test]
    async fn test_duplicate_contact_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let s = seed_salesman(&db, "ali@example.com", "0300-0000001", None).await;
        seed_retailer(&db, &s.id, "0311-0000001", None).await;

        let err = db
            .retailers()
            .create(NewRetailer {
                retailer_name: "Other".into(),
                shop_name: "Other Shop".into(),
                contact_no: "0311-0000001".into(),
                contact_no2: None,
                address: "Elsewhere".into(),
                longitude: None,
                latitude: None,
                added_by: s.id.clone(),
                assigned_salesman: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_visibility_is_scoped() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let a = seed_salesman(&db, "a@example.com", "0300-0000001", None).await;
        let b = seed_salesman(&db, "b@example.com", "0300-0000002", None).await;
        let retailer = seed_retailer(&db, &a.id, "0311-0000001", None).await;

        let actor_b = Actor::Salesman { id: b.id.clone() };
        assert!(db.retailers().list(&actor_b).await.unwrap().is_empty());
        assert!(db.retailers().get_visible(&actor_b, &retailer.id).await.is_err());
        assert!(db.retailers().delete(&actor_b, &retailer.id).await.is_err());

        let actor_a = Actor::Salesman { id: a.id.clone() };
        assert_eq!(db.retailers().list(&actor_a).await.unwrap().len(), 1);
        let admin = Actor::Admin { id: "admin".into() };
        assert_eq!(db.retailers().list(&admin).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_nearby_orders_by_distance() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let s = seed_salesman(&db, "a@example.com", "0300-0000001", None).await;
        let far = seed_retailer(&db, &s.id, "0311-0000001", Some((0.0, 0.05))).await;
        let near = seed_retailer(&db, &s.id, "0311-0000002", Some((0.0, 0.001))).await;
        seed_retailer(&db, &s.id, "0311-0000003", Some((1.0, 1.0))).await;
        seed_retailer(&db, &s.id, "0311-0000004", None).await;

        let found = db.retailers().nearby(GeoPoint::new(0.0, 0.0), 10_000.0).await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].retailer.id, near.id);
        assert_eq!(found[1].retailer.id, far.id);
        assert!(found[0].distance_meters < found[1].distance_meters);
    }

    #[tokio::test]
    async fn test_nearby_across_antimeridian() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let s = seed_salesman(&db, "a@example.com", "0300-0000001", None).await;
        let east = seed_retailer(&db, &s.id, "0311-0000001", Some((-179.9995, 10.0))).await;
        let west = seed_retailer(&db, &s.id, "0311-0000002", Some((179.9995, 10.0))).await;
        seed_retailer(&db, &s.id, "0311-0000003", Some((0.0, 10.0))).await;

        let found = db.retailers().nearby(GeoPoint::new(179.9999, 10.0), 500.0).await.unwrap();
        let ids: Vec<&str> = found.iter().map(|n| n.retailer.id.as_str()).collect();
        assert_eq!(ids, vec![west.id.as_str(), east.id.as_str()]);

        let found = db.retailers().nearby(GeoPoint::new(-179.9999, 10.0), 500.0).await.unwrap();
        let ids: Vec<&str> = found.iter().map(|n| n.retailer.id.as_str()).collect();
        assert_eq!(ids, vec![east.id.as_str(), west.id.as_str()]);
    }

    #[test]
    fn test_wrap_longitude() {
        assert_eq!(wrap_longitude(181.0), -179.0);
        assert_eq!(wrap_longitude(-181.0), 179.0);
        assert_eq!(wrap_longitude(42.0), 42.0);
    }

    #[tokio::test]
    async fn test_admin_delete_cascades_sales() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let s = seed_salesman(&db, "a@example.com", "0300-0000001", None).await;
        let retailer = seed_retailer(&db, &s.id, "0311-0000001", Some((0.0, 0.0))).await;
        let line = build_sale_line("Tea", 1, Money::from_cents(100), None).unwrap();
        for _ in 0..2 {
            db.sales()
                .create(NewSale {
                    retailer_id: retailer.id.clone(),
                    added_by: s.id.clone(),
                    lines: vec![line.clone()],
                    amount: Money::from_cents(100),
                    location: GeoPoint::new(0.0, 0.0),
                    valid: true,
                    distance_meters: Some(0.0),
                })
                .await
                .unwrap();
        }

        assert_eq!(db.retailers().delete_cascade(&retailer.id).await.unwrap(), 2);
        assert!(db.sales().list(&SaleFilter::default()).await.unwrap().is_empty());
        assert!(matches!(
            db.retailers().delete_cascade(&retailer.id).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_owner_delete_removes_sales_by_foreign_key() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let s = seed_salesman(&db, "a@example.com", "0300-0000001", None).await;
        let retailer = seed_retailer(&db, &s.id, "0311-0000001", Some((0.0, 0.0))).await;
        db.sales()
            .create(NewSale {
                retailer_id: retailer.id.clone(),
                added_by: s.id.clone(),
                lines: vec![build_sale_line("Tea", 1, Money::from_cents(100), None).unwrap()],
                amount: Money::from_cents(100),
                location: GeoPoint::new(0.0, 0.0),
                valid: true,
                distance_meters: Some(0.0),
            })
            .await
            .unwrap();

        let actor = Actor::Salesman { id: s.id.clone() };
        db.retailers().delete(&actor, &retailer.id).await.unwrap();
        assert!(db.sales().list(&SaleFilter::default()).await.unwrap().is_empty());
    }
}
