//! # Statistics Repository
//!
//! Loads [`SaleFact`]s for the aggregator in `fieldsales-core::statistics`.
//!
//! ```text
//! sales s ──LEFT JOIN──► salesmen sm ──LEFT JOIN──► franchises f
//!                                   (franchise may be absent: kept, f.* NULL)
//! ```
//!
//! Filtering happens in SQL with the same clauses as sale listings; the
//! grouping happens in Rust.

use chrono::{DateTime, Utc};
use fieldsales_core::statistics::SaleFact;
use fieldsales_core::{FranchiseRef, GeoPoint, Money};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use crate::repository::sale::{load_lines, SaleFilter};

#[derive(Debug, sqlx::FromRow)]
struct FactRow {
    id: String,
    retailer_id: String,
    amount: Money,
    longitude: f64,
    latitude: f64,
    created_at: DateTime<Utc>,
    franchise_id: Option<String>,
    franchise_name: Option<String>,
}

/// Read-only repository feeding the statistics endpoints.
#[derive(Debug, Clone)]
pub struct StatisticsRepository {
    pool: SqlitePool,
}

impl StatisticsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        StatisticsRepository { pool }
    }

    /// Sale facts matching `filter`, oldest first, with their lines and
    /// franchise attached.
    pub async fn sale_facts(&self, filter: &SaleFilter) -> DbResult<Vec<SaleFact>> {
        let mut qb = QueryBuilder::<Sqlite>::new(
            r#"
            SELECT s.id, s.retailer_id, s.amount, s.longitude, s.latitude, s.created_at,
                   f.id AS franchise_id, f.name AS franchise_name
            FROM sales s
            LEFT JOIN salesmen sm ON sm.id = s.added_by
            LEFT JOIN franchises f ON f.id = sm.franchise_id
            WHERE 1 = 1
            "#,
        );
        filter.push_clauses(&mut qb);
        qb.push(" ORDER BY s.created_at, s.id");

        let rows = qb.build_query_as::<FactRow>().fetch_all(&self.pool).await?;

        let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
        let mut lines = load_lines(&self.pool, &ids).await?;

        let facts: Vec<SaleFact> = rows
            .into_iter()
            .map(|row| {
                let franchise = match (row.franchise_id, row.franchise_name) {
                    (Some(id), Some(name)) => Some(FranchiseRef { id, name }),
                    _ => None,
                };
                SaleFact {
                    lines: lines.remove(&row.id).unwrap_or_default(),
                    sale_id: row.id,
                    retailer_id: row.retailer_id,
                    amount: row.amount,
                    location: GeoPoint::new(row.longitude, row.latitude),
                    franchise,
                    created_at: row.created_at,
                }
            })
            .collect();

        debug!(count = facts.len(), "Loaded sale facts");
        Ok(facts)
    }

    /// Timestamp of the newest sale matching `filter`, if any.
    pub async fn latest_sale_at(&self, filter: &SaleFilter) -> DbResult<Option<DateTime<Utc>>> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT s.created_at FROM sales s WHERE 1 = 1");
        filter.push_clauses(&mut qb);
        qb.push(" ORDER BY s.created_at DESC LIMIT 1");

        let latest = qb
            .build_query_scalar::<DateTime<Utc>>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(latest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::franchise::NewFranchise;
    use crate::repository::sale::NewSale;
    use crate::repository::test_support::{seed_retailer, seed_salesman};
    use crate::{Database, DbConfig};
    use fieldsales_core::statistics::aggregate;
    use fieldsales_core::validation::build_sale_line;
    use fieldsales_core::UNKNOWN_FRANCHISE;

    async fn record(db: &Database, retailer: &str, by: &str, product: &str, cents: i64) {
        db.sales()
            .create(NewSale {
                retailer_id: retailer.to_string(),
                added_by: by.to_string(),
                lines: vec![build_sale_line(product, 1, Money::from_cents(cents), None).unwrap()],
                amount: Money::from_cents(cents),
                location: GeoPoint::new(0.0, 0.0),
                valid: true,
                distance_meters: Some(0.0),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_facts_keep_salesmen_without_franchise() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let franchise = db
            .franchises()
            .create(NewFranchise {
                name: "North".into(),
                address: "1 Mall Road".into(),
                master_sim_no: "03001234567".into(),
            })
            .await
            .unwrap();
        let member = seed_salesman(&db, "a@example.com", "0300-0000001", Some(&franchise.id)).await;
        let loner = seed_salesman(&db, "b@example.com", "0300-0000002", None).await;
        let r1 = seed_retailer(&db, &member.id, "0311-0000001", Some((0.0, 0.0))).await;
        let r2 = seed_retailer(&db, &loner.id, "0311-0000002", Some((0.0, 0.0))).await;

        record(&db, &r1.id, &member.id, "Tea", 500).await;
        record(&db, &r2.id, &loner.id, "Tea", 300).await;

        let facts = db.statistics().sale_facts(&SaleFilter::default()).await.unwrap();
        assert_eq!(facts.len(), 2);
        assert!(facts.iter().all(|f| f.lines.len() == 1));

        let stats = aggregate(&facts);
        assert_eq!(stats.total_amount, Money::from_cents(800));
        assert_eq!(stats.total_count, 2);
        let labels: Vec<&str> = stats.franchises.iter().map(|f| f.franchise.as_str()).collect();
        assert_eq!(labels, vec!["North", UNKNOWN_FRANCHISE]);

        let north_only = db
            .statistics()
            .sale_facts(&SaleFilter {
                franchise_id: Some(franchise.id.clone()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(north_only.len(), 1);
    }

    #[tokio::test]
    async fn test_latest_sale_at() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.statistics().latest_sale_at(&SaleFilter::default()).await.unwrap().is_none());

        let s = seed_salesman(&db, "a@example.com", "0300-0000001", None).await;
        let r = seed_retailer(&db, &s.id, "0311-0000001", Some((0.0, 0.0))).await;
        record(&db, &r.id, &s.id, "Tea", 100).await;

        let latest = db.statistics().latest_sale_at(&SaleFilter::default()).await.unwrap();
        assert!(latest.is_some());
    }
}
