//! # Admin Repository
//!
//! The back office has exactly one admin account, created once through
//! setup. [`AdminRepository::create`] refuses a second row.

use chrono::Utc;
use fieldsales_core::Admin;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};

const ADMIN_COLUMNS: &str = "id, email, phone, password_hash, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct NewAdmin {
    pub email: String,
    pub phone: String,
    pub password_hash: String,
}

/// Repository for the admin account.
#[derive(Debug, Clone)]
pub struct AdminRepository {
    pool: SqlitePool,
}

impl AdminRepository {
    pub fn new(pool: SqlitePool) -> Self {
        AdminRepository { pool }
    }

    pub async fn exists(&self) -> DbResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM admins")
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    /// Creates the admin. Fails with [`DbError::Conflict`] when one exists.
    ///
    /// The existence check and insert share one statement so two concurrent
    /// setups cannot both succeed.
    pub async fn create(&self, new: NewAdmin) -> DbResult<Admin> {
        let now = Utc::now();
        let admin = Admin {
            id: Uuid::new_v4().to_string(),
            email: new.email,
            phone: new.phone,
            password_hash: new.password_hash,
            created_at: now,
            updated_at: now,
        };

        let result = sqlx::query(
            r#"
            INSERT INTO admins (id, email, phone, password_hash, created_at, updated_at)
            SELECT ?1, ?2, ?3, ?4, ?5, ?5
            WHERE NOT EXISTS (SELECT 1 FROM admins)
            "#,
        )
        .bind(&admin.id)
        .bind(&admin.email)
        .bind(&admin.phone)
        .bind(&admin.password_hash)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::Conflict("Admin already exists".to_string()));
        }

        info!(id = %admin.id, "Admin account created");
        Ok(admin)
    }

    pub async fn get(&self, id: &str) -> DbResult<Admin> {
        sqlx::query_as::<_, Admin>(&format!("SELECT {ADMIN_COLUMNS} FROM admins WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Admin", id))
    }

    /// Finds the admin by email or phone, whichever `identifier` matches.
    pub async fn find_by_login(&self, identifier: &str) -> DbResult<Option<Admin>> {
        let admin = sqlx::query_as::<_, Admin>(&format!(
            "SELECT {ADMIN_COLUMNS} FROM admins WHERE email = ?1 OR phone = ?1 LIMIT 1"
        ))
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await?;
        Ok(admin)
    }

    pub async fn update_email(&self, id: &str, email: &str) -> DbResult<Admin> {
        self.update_column(id, "email", email).await
    }

    pub async fn update_phone(&self, id: &str, phone: &str) -> DbResult<Admin> {
        self.update_column(id, "phone", phone).await
    }

    pub async fn update_password(&self, id: &str, password_hash: &str) -> DbResult<Admin> {
        self.update_column(id, "password_hash", password_hash).await
    }

    async fn update_column(&self, id: &str, column: &'static str, value: &str) -> DbResult<Admin> {
        debug!(id = %id, column, "Updating admin");

        let result = sqlx::query(&format!(
            "UPDATE admins SET {column} = ?2, updated_at = ?3 WHERE id = ?1"
        ))
        .bind(id)
        .bind(value)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::duplicate(field, value),
            other => other,
        })?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Admin", id));
        }
        self.get(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    fn admin() -> NewAdmin {
        NewAdmin {
            email: "admin@example.com".into(),
            phone: "03001234567".into(),
            password_hash: "hash".into(),
        }
    }

    #[tokio::test]
    async fn test_setup_only_once() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(!db.admins().exists().await.unwrap());

        db.admins().create(admin()).await.unwrap();
        assert!(db.admins().exists().await.unwrap());

        let err = db.admins().create(admin()).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_login_by_email_or_phone() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let created = db.admins().create(admin()).await.unwrap();

        let by_email = db.admins().find_by_login("admin@example.com").await.unwrap().unwrap();
        let by_phone = db.admins().find_by_login("03001234567").await.unwrap().unwrap();
        assert_eq!(by_email.id, created.id);
        assert_eq!(by_phone.id, created.id);
        assert!(db.admins().find_by_login("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_fields() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let created = db.admins().create(admin()).await.unwrap();

        let updated = db.admins().update_email(&created.id, "boss@example.com").await.unwrap();
        assert_eq!(updated.email, "boss@example.com");
        let updated = db.admins().update_phone(&created.id, "03007654321").await.unwrap();
        assert_eq!(updated.phone, "03007654321");
        let updated = db.admins().update_password(&created.id, "new-hash").await.unwrap();
        assert_eq!(updated.password_hash, "new-hash");

        assert!(matches!(
            db.admins().update_email("missing", "x@example.com").await,
            Err(DbError::NotFound { .. })
        ));
    }
}
