//! # Sale Repository
//!
//! Database operations for sales and their product lines.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. CREATE                                                             │
//! │     └── create() → sales row + sale_lines rows (one transaction)       │
//! │         valid / distance_meters already decided by SaleValidator       │
//! │                                                                         │
//! │  2. (OPTIONAL) UPDATE by owner                                         │
//! │     └── update() → replaces lines, amount, location, retailer          │
//! │         validity is NOT recomputed                                     │
//! │                                                                         │
//! │  3. (OPTIONAL) ADMIN OVERRIDE                                          │
//! │     └── set_validity()                                                 │
//! │                                                                         │
//! │  4. DELETE                                                             │
//! │     └── delete() by owner or admin, or cascaded from retailer/salesman │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every scoped operation takes an [`Actor`]: salesmen only ever see their
//! own sales; a foreign sale looks exactly like a missing one.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use fieldsales_core::statistics::DateRange;
use fieldsales_core::{Actor, GeoPoint, Money, Sale, SaleLine};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};

/// SQLite caps bound parameters per statement; line lookups are chunked.
const LINE_LOOKUP_CHUNK: usize = 500;

const SALE_COLUMNS: &str = "s.id, s.retailer_id, s.added_by, s.amount, s.longitude, s.latitude, \
                            s.valid, s.distance_meters, s.created_at, s.updated_at";

// =============================================================================
// Inputs & Filters
// =============================================================================

/// A validated sale ready to be stored.
#[derive(Debug, Clone)]
pub struct NewSale {
    pub retailer_id: String,
    pub added_by: String,
    pub lines: Vec<SaleLine>,
    pub amount: Money,
    pub location: GeoPoint,
    pub valid: bool,
    pub distance_meters: Option<f64>,
}

/// Replacement content for an existing sale.
#[derive(Debug, Clone)]
pub struct SaleUpdate {
    pub retailer_id: String,
    pub lines: Vec<SaleLine>,
    pub amount: Money,
    pub location: GeoPoint,
}

/// Filters shared by sale listings and statistics loading.
#[derive(Debug, Clone, Default)]
pub struct SaleFilter {
    pub salesman_id: Option<String>,
    pub retailer_id: Option<String>,
    /// Sales containing a line with this exact product name.
    pub product: Option<String>,
    pub franchise_id: Option<String>,
    pub range: DateRange,
    pub valid: Option<bool>,
}

impl SaleFilter {
    /// Filter restricted to what `actor` may see.
    pub fn for_actor(actor: &Actor) -> Self {
        SaleFilter {
            salesman_id: actor.owner_scope().map(str::to_string),
            ..Default::default()
        }
    }

    /// Appends ` AND ...` clauses for every set field. Sales are aliased `s`.
    pub(crate) fn push_clauses(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        if let Some(salesman_id) = &self.salesman_id {
            qb.push(" AND s.added_by = ").push_bind(salesman_id.clone());
        }
        if let Some(retailer_id) = &self.retailer_id {
            qb.push(" AND s.retailer_id = ").push_bind(retailer_id.clone());
        }
        if let Some(product) = &self.product {
            qb.push(" AND EXISTS (SELECT 1 FROM sale_lines pl WHERE pl.sale_id = s.id AND pl.product = ")
                .push_bind(product.clone())
                .push(")");
        }
        if let Some(franchise_id) = &self.franchise_id {
            qb.push(" AND s.added_by IN (SELECT fs.id FROM salesmen fs WHERE fs.franchise_id = ")
                .push_bind(franchise_id.clone())
                .push(")");
        }
        if let Some(start) = self.range.start {
            qb.push(" AND s.created_at >= ").push_bind(start);
        }
        if let Some(end) = self.range.end {
            qb.push(" AND s.created_at <= ").push_bind(end);
        }
        if let Some(valid) = self.valid {
            qb.push(" AND s.valid = ").push_bind(valid);
        }
    }
}

// =============================================================================
// Rows
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct SaleRow {
    id: String,
    retailer_id: String,
    added_by: String,
    amount: Money,
    longitude: f64,
    latitude: f64,
    valid: bool,
    distance_meters: Option<f64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SaleRow {
    fn into_sale(self, lines: Vec<SaleLine>) -> Sale {
        Sale {
            id: self.id,
            retailer_id: self.retailer_id,
            added_by: self.added_by,
            lines,
            amount: self.amount,
            location: GeoPoint::new(self.longitude, self.latitude),
            valid: self.valid,
            distance_meters: self.distance_meters,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SaleLineRow {
    sale_id: String,
    product: String,
    quantity: i64,
    unit_price: Money,
    line_total: Money,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Stores a new sale and its lines in one transaction.
    pub async fn create(&self, new: NewSale) -> DbResult<Sale> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        debug!(
            id = %id,
            retailer_id = %new.retailer_id,
            added_by = %new.added_by,
            amount = %new.amount,
            valid = new.valid,
            "Creating sale"
        );

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, retailer_id, added_by, amount, longitude, latitude,
                valid, distance_meters, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
            "#,
        )
        .bind(&id)
        .bind(&new.retailer_id)
        .bind(&new.added_by)
        .bind(new.amount)
        .bind(new.location.longitude)
        .bind(new.location.latitude)
        .bind(new.valid)
        .bind(new.distance_meters)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        insert_lines(&mut tx, &id, &new.lines).await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(Sale {
            id,
            retailer_id: new.retailer_id,
            added_by: new.added_by,
            lines: new.lines,
            amount: new.amount,
            location: new.location,
            valid: new.valid,
            distance_meters: new.distance_meters,
            created_at: now,
            updated_at: now,
        })
    }

    /// Gets a sale visible to `actor`.
    pub async fn get(&self, actor: &Actor, id: &str) -> DbResult<Sale> {
        self.fetch(id, actor.owner_scope()).await
    }

    async fn fetch(&self, id: &str, owner: Option<&str>) -> DbResult<Sale> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {SALE_COLUMNS} FROM sales s WHERE s.id = "));
        qb.push_bind(id.to_string());
        if let Some(owner) = owner {
            qb.push(" AND s.added_by = ").push_bind(owner.to_string());
        }

        let row = qb
            .build_query_as::<SaleRow>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", id))?;

        let mut lines = self.load_lines(&[row.id.clone()]).await?;
        let sale_lines = lines.remove(&row.id).unwrap_or_default();
        Ok(row.into_sale(sale_lines))
    }

    /// Lists sales matching `filter`, newest first.
    pub async fn list(&self, filter: &SaleFilter) -> DbResult<Vec<Sale>> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {SALE_COLUMNS} FROM sales s WHERE 1 = 1"));
        filter.push_clauses(&mut qb);
        qb.push(" ORDER BY s.created_at DESC, s.id");

        let rows = qb.build_query_as::<SaleRow>().fetch_all(&self.pool).await?;
        debug!(count = rows.len(), "Listed sales");

        let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
        let mut lines = self.load_lines(&ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let sale_lines = lines.remove(&row.id).unwrap_or_default();
                row.into_sale(sale_lines)
            })
            .collect())
    }

    /// Replaces a sale's content. Only the owner may update; validity and
    /// distance are kept as recorded at creation.
    pub async fn update(&self, actor: &Actor, id: &str, update: SaleUpdate) -> DbResult<Sale> {
        debug!(id = %id, actor = %actor.id(), amount = %update.amount, "Updating sale");

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE sales SET
                retailer_id = ?2,
                amount = ?3,
                longitude = ?4,
                latitude = ?5,
                updated_at = ?6
            WHERE id = ?1 AND added_by = ?7
            "#,
        )
        .bind(id)
        .bind(&update.retailer_id)
        .bind(update.amount)
        .bind(update.location.longitude)
        .bind(update.location.latitude)
        .bind(Utc::now())
        .bind(actor.id())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", id));
        }

        sqlx::query("DELETE FROM sale_lines WHERE sale_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        insert_lines(&mut tx, id, &update.lines).await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        self.fetch(id, Some(actor.id())).await
    }

    /// Admin override of a sale's validity flag.
    pub async fn set_validity(&self, id: &str, valid: bool) -> DbResult<Sale> {
        debug!(id = %id, valid, "Overriding sale validity");

        let result = sqlx::query("UPDATE sales SET valid = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(valid)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", id));
        }

        self.fetch(id, None).await
    }

    /// Deletes a sale. Salesmen may only delete their own.
    pub async fn delete(&self, actor: &Actor, id: &str) -> DbResult<()> {
        debug!(id = %id, actor = %actor.id(), "Deleting sale");

        let result = match actor.owner_scope() {
            Some(owner) => {
                sqlx::query("DELETE FROM sales WHERE id = ?1 AND added_by = ?2")
                    .bind(id)
                    .bind(owner)
                    .execute(&self.pool)
                    .await?
            }
            None => {
                sqlx::query("DELETE FROM sales WHERE id = ?1")
                    .bind(id)
                    .execute(&self.pool)
                    .await?
            }
        };

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", id));
        }

        Ok(())
    }

    /// Loads lines for the given sales, keyed by sale id in position order.
    pub(crate) async fn load_lines(&self, sale_ids: &[String]) -> DbResult<HashMap<String, Vec<SaleLine>>> {
        load_lines(&self.pool, sale_ids).await
    }
}

/// Loads lines for `sale_ids`, keyed by sale id in position order.
pub(crate) async fn load_lines(
    pool: &SqlitePool,
    sale_ids: &[String],
) -> DbResult<HashMap<String, Vec<SaleLine>>> {
    let mut by_sale: HashMap<String, Vec<SaleLine>> = HashMap::new();

    for chunk in sale_ids.chunks(LINE_LOOKUP_CHUNK) {
        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT sale_id, product, quantity, unit_price, line_total FROM sale_lines WHERE sale_id IN (",
        );
        let mut ids = qb.separated(", ");
        for id in chunk {
            ids.push_bind(id.clone());
        }
        ids.push_unseparated(") ORDER BY sale_id, position");

        let rows = qb.build_query_as::<SaleLineRow>().fetch_all(pool).await?;
        for row in rows {
            by_sale.entry(row.sale_id).or_default().push(SaleLine {
                product: row.product,
                quantity: row.quantity,
                unit_price: row.unit_price,
                line_total: row.line_total,
            });
        }
    }

    Ok(by_sale)
}

async fn insert_lines(conn: &mut SqliteConnection, sale_id: &str, lines: &[SaleLine]) -> DbResult<()> {
    for (position, line) in lines.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO sale_lines (sale_id, position, product, quantity, unit_price, line_total)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(sale_id)
        .bind(position as i64)
        .bind(&line.product)
        .bind(line.quantity)
        .bind(line.unit_price)
        .bind(line.line_total)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
