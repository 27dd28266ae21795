//! # Franchise Repository
//!
//! Database operations for franchises and their member salesmen.
//!
//! Deleting a franchise leaves its salesmen in place with `franchise_id`
//! cleared by the `ON DELETE SET NULL` foreign key. Their sales show up
//! under the "Unknown" franchise in statistics afterwards.

use chrono::Utc;
use fieldsales_core::{Franchise, Salesman};
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};

const FRANCHISE_COLUMNS: &str = "id, name, address, master_sim_no, is_active, created_at, updated_at";

/// A franchise ready to be stored. `master_sim_no` is already normalized
/// to digits only.
#[derive(Debug, Clone)]
pub struct NewFranchise {
    pub name: String,
    pub address: String,
    pub master_sim_no: String,
}

#[derive(Debug, Clone, Default)]
pub struct FranchisePatch {
    pub name: Option<String>,
    pub address: Option<String>,
    pub master_sim_no: Option<String>,
    pub is_active: Option<bool>,
}

/// Repository for franchise database operations.
#[derive(Debug, Clone)]
pub struct FranchiseRepository {
    pool: SqlitePool,
}

impl FranchiseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        FranchiseRepository { pool }
    }

    /// Creates a franchise. The master SIM number must be unused.
    pub async fn create(&self, new: NewFranchise) -> DbResult<Franchise> {
        if self.sim_exists(&new.master_sim_no).await? {
            return Err(DbError::duplicate("masterSimNo", &new.master_sim_no));
        }

        let now = Utc::now();
        let franchise = Franchise {
            id: Uuid::new_v4().to_string(),
            name: new.name,
            address: new.address,
            master_sim_no: new.master_sim_no,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %franchise.id, name = %franchise.name, "Creating franchise");

        sqlx::query(
            r#"
            INSERT INTO franchises (id, name, address, master_sim_no, is_active, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            "#,
        )
        .bind(&franchise.id)
        .bind(&franchise.name)
        .bind(&franchise.address)
        .bind(&franchise.master_sim_no)
        .bind(franchise.is_active)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(franchise)
    }

    pub async fn sim_exists(&self, master_sim_no: &str) -> DbResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM franchises WHERE master_sim_no = ?1")
            .bind(master_sim_no)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    pub async fn get(&self, id: &str) -> DbResult<Franchise> {
        sqlx::query_as::<_, Franchise>(&format!("SELECT {FRANCHISE_COLUMNS} FROM franchises WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Franchise", id))
    }

    /// Looks a franchise up by its (normalized) master SIM number.
    pub async fn find_by_sim(&self, master_sim_no: &str) -> DbResult<Option<Franchise>> {
        let franchise = sqlx::query_as::<_, Franchise>(&format!(
            "SELECT {FRANCHISE_COLUMNS} FROM franchises WHERE master_sim_no = ?1"
        ))
        .bind(master_sim_no)
        .fetch_optional(&self.pool)
        .await?;
        Ok(franchise)
    }

    /// Every franchise, newest first.
    pub async fn list(&self) -> DbResult<Vec<Franchise>> {
        let franchises = sqlx::query_as::<_, Franchise>(&format!(
            "SELECT {FRANCHISE_COLUMNS} FROM franchises ORDER BY created_at DESC, id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(franchises)
    }

    pub async fn update(&self, id: &str, patch: FranchisePatch) -> DbResult<Franchise> {
        let mut franchise = self.get(id).await?;

        if let Some(sim) = patch.master_sim_no {
            if sim != franchise.master_sim_no && self.sim_exists(&sim).await? {
                return Err(DbError::duplicate("masterSimNo", sim));
            }
            franchise.master_sim_no = sim;
        }
        if let Some(name) = patch.name {
            franchise.name = name;
        }
        if let Some(address) = patch.address {
            franchise.address = address;
        }
        if let Some(is_active) = patch.is_active {
            franchise.is_active = is_active;
        }
        franchise.updated_at = Utc::now();

        debug!(id = %id, "Updating franchise");

        sqlx::query(
            r#"
            UPDATE franchises SET
                name = ?2, address = ?3, master_sim_no = ?4, is_active = ?5, updated_at = ?6
            WHERE id = ?1
            "#,
        )
        .bind(&franchise.id)
        .bind(&franchise.name)
        .bind(&franchise.address)
        .bind(&franchise.master_sim_no)
        .bind(franchise.is_active)
        .bind(franchise.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(franchise)
    }

    pub async fn toggle_active(&self, id: &str) -> DbResult<Franchise> {
        let result = sqlx::query(
            "UPDATE franchises SET is_active = NOT is_active, updated_at = ?2 WHERE id = ?1",
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Franchise", id));
        }
        self.get(id).await
    }

    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM franchises WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Franchise", id));
        }

        info!(id = %id, "Franchise deleted, members detached");
        Ok(())
    }

    /// Salesmen belonging to the franchise, alphabetical by display name.
    pub async fn salesmen(&self, id: &str) -> DbResult<Vec<Salesman>> {
        self.get(id).await?;

        let salesmen = sqlx::query_as::<_, Salesman>(
            r#"
            SELECT id, first_name, last_name, name, email, contact_no, contact_no2,
                   password_hash, franchise_id, is_active, created_at, updated_at
            FROM salesmen
            WHERE franchise_id = ?1
            ORDER BY name, id
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(salesmen)
    }
}
