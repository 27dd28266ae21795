//! # Salesman Repository
//!
//! Database operations for salesmen.
//!
//! ## Cascade Delete
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  delete_cascade(salesman)            (one transaction)                 │
//! │                                                                         │
//! │   1. sales recorded by the salesman  ──► DELETE                        │
//! │   2. sales at the salesman's retailers ──► DELETE                      │
//! │   3. retailers added by the salesman ──► DELETE                        │
//! │   4. the salesman                     ──► DELETE                       │
//! │                                                                         │
//! │   Any failure rolls the whole thing back.                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use fieldsales_core::Salesman;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};

const SALESMAN_COLUMNS: &str = "id, first_name, last_name, name, email, contact_no, contact_no2, \
                                password_hash, franchise_id, is_active, created_at, updated_at";

/// A salesman ready to be stored. Fields are already validated and the
/// email lowercased.
#[derive(Debug, Clone)]
pub struct NewSalesman {
    pub first_name: String,
    pub last_name: String,
    /// Display name; defaults to `first_name last_name`.
    pub name: Option<String>,
    pub email: String,
    pub contact_no: String,
    pub contact_no2: Option<String>,
    pub password_hash: String,
    pub franchise_id: Option<String>,
}

/// Partial update. `None` leaves a field unchanged; the nested options
/// clear a field with `Some(None)`.
#[derive(Debug, Clone, Default)]
pub struct SalesmanPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub contact_no: Option<String>,
    pub contact_no2: Option<Option<String>>,
    pub password_hash: Option<String>,
    pub franchise_id: Option<Option<String>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct SalesmanFilter {
    pub is_active: Option<bool>,
    pub franchise_id: Option<String>,
}

/// Rows removed by a cascading salesman delete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesmanCascade {
    pub sales: u64,
    pub retailers: u64,
}

/// Repository for salesman database operations.
#[derive(Debug, Clone)]
pub struct SalesmanRepository {
    pool: SqlitePool,
}

impl SalesmanRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SalesmanRepository { pool }
    }

    /// Creates a salesman. Email and contact number must be unused.
    pub async fn create(&self, new: NewSalesman) -> DbResult<Salesman> {
        if self.email_exists(&new.email).await? {
            return Err(DbError::duplicate("email", &new.email));
        }
        if self.contact_exists(&new.contact_no).await? {
            return Err(DbError::duplicate("contactNo", &new.contact_no));
        }

        let now = Utc::now();
        let name = new
            .name
            .unwrap_or_else(|| format!("{} {}", new.first_name, new.last_name));
        let salesman = Salesman {
            id: Uuid::new_v4().to_string(),
            first_name: new.first_name,
            last_name: new.last_name,
            name,
            email: new.email,
            contact_no: new.contact_no,
            contact_no2: new.contact_no2,
            password_hash: new.password_hash,
            franchise_id: new.franchise_id,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %salesman.id, email = %salesman.email, "Creating salesman");

        sqlx::query(
            r#"
            INSERT INTO salesmen (
                id, first_name, last_name, name, email, contact_no, contact_no2,
                password_hash, franchise_id, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)
            "#,
        )
        .bind(&salesman.id)
        .bind(&salesman.first_name)
        .bind(&salesman.last_name)
        .bind(&salesman.name)
        .bind(&salesman.email)
        .bind(&salesman.contact_no)
        .bind(&salesman.contact_no2)
        .bind(&salesman.password_hash)
        .bind(&salesman.franchise_id)
        .bind(salesman.is_active)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(salesman)
    }

    /// Gets a salesman by id.
    pub async fn get(&self, id: &str) -> DbResult<Salesman> {
        sqlx::query_as::<_, Salesman>(&format!("SELECT {SALESMAN_COLUMNS} FROM salesmen WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Salesman", id))
    }

    /// Finds a salesman by (lowercased) email.
    pub async fn find_by_email(&self, email: &str) -> DbResult<Option<Salesman>> {
        let salesman = sqlx::query_as::<_, Salesman>(&format!(
            "SELECT {SALESMAN_COLUMNS} FROM salesmen WHERE email = ?1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(salesman)
    }

    pub async fn email_exists(&self, email: &str) -> DbResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM salesmen WHERE email = ?1")
            .bind(email)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    pub async fn contact_exists(&self, contact_no: &str) -> DbResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM salesmen WHERE contact_no = ?1")
            .bind(contact_no)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    /// Lists salesmen, newest first.
    pub async fn list(&self, filter: &SalesmanFilter) -> DbResult<Vec<Salesman>> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {SALESMAN_COLUMNS} FROM salesmen WHERE 1 = 1"));
        if let Some(active) = filter.is_active {
            qb.push(" AND is_active = ").push_bind(active);
        }
        if let Some(franchise_id) = &filter.franchise_id {
            qb.push(" AND franchise_id = ").push_bind(franchise_id.clone());
        }
        qb.push(" ORDER BY created_at DESC, id");

        let salesmen = qb.build_query_as::<Salesman>().fetch_all(&self.pool).await?;
        debug!(count = salesmen.len(), "Listed salesmen");
        Ok(salesmen)
    }

    /// Applies a partial update and returns the stored result.
    pub async fn update(&self, id: &str, patch: SalesmanPatch) -> DbResult<Salesman> {
        let mut salesman = self.get(id).await?;

        if let Some(email) = patch.email {
            if email != salesman.email && self.email_exists(&email).await? {
                return Err(DbError::duplicate("email", email));
            }
            salesman.email = email;
        }
        if let Some(contact_no) = patch.contact_no {
            if contact_no != salesman.contact_no && self.contact_exists(&contact_no).await? {
                return Err(DbError::duplicate("contactNo", contact_no));
            }
            salesman.contact_no = contact_no;
        }

        let renamed = patch.first_name.is_some() || patch.last_name.is_some();
        if let Some(first_name) = patch.first_name {
            salesman.first_name = first_name;
        }
        if let Some(last_name) = patch.last_name {
            salesman.last_name = last_name;
        }
        match patch.name {
            Some(name) => salesman.name = name,
            None if renamed => {
                salesman.name = format!("{} {}", salesman.first_name, salesman.last_name)
            }
            None => {}
        }
        if let Some(contact_no2) = patch.contact_no2 {
            salesman.contact_no2 = contact_no2;
        }
        if let Some(password_hash) = patch.password_hash {
            salesman.password_hash = password_hash;
        }
        if let Some(franchise_id) = patch.franchise_id {
            salesman.franchise_id = franchise_id;
        }
        if let Some(is_active) = patch.is_active {
            salesman.is_active = is_active;
        }
        salesman.updated_at = Utc::now();

        debug!(id = %id, "Updating salesman");

        sqlx::query(
            r#"
            UPDATE salesmen SET
                first_name = ?2, last_name = ?3, name = ?4, email = ?5,
                contact_no = ?6, contact_no2 = ?7, password_hash = ?8,
                franchise_id = ?9, is_active = ?10, updated_at = ?11
            WHERE id = ?1
            "#,
        )
        .bind(&salesman.id)
        .bind(&salesman.first_name)
        .bind(&salesman.last_name)
        .bind(&salesman.name)
        .bind(&salesman.email)
        .bind(&salesman.contact_no)
        .bind(&salesman.contact_no2)
        .bind(&salesman.password_hash)
        .bind(&salesman.franchise_id)
        .bind(salesman.is_active)
        .bind(salesman.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(salesman)
    }

    /// Flips the active flag and returns the updated salesman.
    pub async fn toggle_active(&self, id: &str) -> DbResult<Salesman> {
        let result = sqlx::query(
            "UPDATE salesmen SET is_active = NOT is_active, updated_at = ?2 WHERE id = ?1",
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Salesman", id));
        }

        self.get(id).await
    }

    /// Deletes a salesman together with their sales and retailers.
    pub async fn delete_cascade(&self, id: &str) -> DbResult<SalesmanCascade> {
        let mut tx = self.pool.begin().await?;

        let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM salesmen WHERE id = ?1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        if exists == 0 {
            return Err(DbError::not_found("Salesman", id));
        }

        let sales = sqlx::query(
            r#"
            DELETE FROM sales
            WHERE added_by = ?1
               OR retailer_id IN (SELECT id FROM retailers WHERE added_by = ?1)
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let retailers = sqlx::query("DELETE FROM retailers WHERE added_by = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        sqlx::query("DELETE FROM salesmen WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(id = %id, sales, retailers, "Salesman deleted with cascade");
        Ok(SalesmanCascade { sales, retailers })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::sale::NewSale;
    use crate::repository::test_support::{seed_retailer, seed_salesman};
    use crate::{Database, DbConfig};
    use fieldsales_core::validation::build_sale_line;
    use fieldsales_core::{GeoPoint, Money};

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        seed_salesman(&db, "ali@example.com", "0300-0000001", None).await;

        let err = db
            .salesmen()
            .create(NewSalesman {
                first_name: "Ali".into(),
                last_name: "Khan".into(),
                name: None,
                email: "ali@example.com".into(),
                contact_no: "0300-0000099".into(),
                contact_no2: None,
                password_hash: "hash".into(),
                franchise_id: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref field, .. } if field == "email"));
    }

    #[tokio::test]
    async fn test_update_recomputes_display_name() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let s = seed_salesman(&db, "ali@example.com", "0300-0000001", None).await;
        assert_eq!(s.name, "Test Salesman");

        let updated = db
            .salesmen()
            .update(
                &s.id,
                SalesmanPatch {
                    first_name: Some("Bilal".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Bilal Salesman");

        let toggled = db.salesmen().toggle_active(&s.id).await.unwrap();
        assert!(!toggled.is_active);

        let active = db
            .salesmen()
            .list(&SalesmanFilter {
                is_active: Some(true),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(active.is_empty());
    }

    #[tokio::test]
    async fn test_delete_cascades_sales_and_retailers() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let doomed = seed_salesman(&db, "doomed@example.com", "0300-0000001", None).await;
        let keeper = seed_salesman(&db, "keeper@example.com", "0300-0000002", None).await;
        let doomed_retailer = seed_retailer(&db, &doomed.id, "0311-0000001", Some((0.0, 0.0))).await;
        let keeper_retailer = seed_retailer(&db, &keeper.id, "0311-0000002", Some((0.0, 0.0))).await;

        let line = build_sale_line("Tea", 1, Money::from_cents(100), None).unwrap();
        let sale = |retailer: &str, by: &str| NewSale {
            retailer_id: retailer.to_string(),
            added_by: by.to_string(),
            lines: vec![line.clone()],
            amount: Money::from_cents(100),
            location: GeoPoint::new(0.0, 0.0),
            valid: true,
            distance_meters: Some(0.0),
        };
        db.sales().create(sale(&doomed_retailer.id, &doomed.id)).await.unwrap();
        db.sales().create(sale(&keeper_retailer.id, &doomed.id)).await.unwrap();
        db.sales().create(sale(&doomed_retailer.id, &keeper.id)).await.unwrap();
        db.sales().create(sale(&keeper_retailer.id, &keeper.id)).await.unwrap();

        let removed = db.salesmen().delete_cascade(&doomed.id).await.unwrap();
        assert_eq!(removed, SalesmanCascade { sales: 3, retailers: 1 });

        assert!(matches!(db.salesmen().get(&doomed.id).await, Err(DbError::NotFound { .. })));
        let remaining = db.sales().list(&Default::default()).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].retailer_id, keeper_retailer.id);

        assert!(matches!(
            db.salesmen().delete_cascade(&doomed.id).await,
            Err(DbError::NotFound { .. })
        ));
    }
}
