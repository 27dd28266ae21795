//! # Product Repository
//!
//! Database operations for the product catalogue.
//!
//! Products are referenced from sale lines by name, not by id, so renaming
//! or deleting a product never rewrites recorded sales.

use chrono::Utc;
use fieldsales_core::{Money, Product};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};

const PRODUCT_COLUMNS: &str =
    "id, name, description, price, is_active, added_by, assigned_salesman, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    pub added_by: Option<String>,
    pub assigned_salesman: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub price: Option<Money>,
    pub assigned_salesman: Option<Option<String>>,
    pub is_active: Option<bool>,
}

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Creates a product. Names are unique.
    pub async fn create(&self, new: NewProduct) -> DbResult<Product> {
        if self.name_exists(&new.name).await? {
            return Err(DbError::duplicate("name", &new.name));
        }

        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            name: new.name,
            description: new.description,
            price: new.price,
            is_active: true,
            added_by: new.added_by,
            assigned_salesman: new.assigned_salesman,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %product.id, name = %product.name, price = %product.price, "Creating product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, description, price, is_active, added_by,
                assigned_salesman, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.cents())
        .bind(product.is_active)
        .bind(&product.added_by)
        .bind(&product.assigned_salesman)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(product)
    }

    pub async fn name_exists(&self, name: &str) -> DbResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE name = ?1")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    pub async fn get(&self, id: &str) -> DbResult<Product> {
        sqlx::query_as::<_, Product>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Active products, alphabetical. This is the public catalogue.
    pub async fn list_active(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE is_active = 1 ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    /// Every product, newest first.
    pub async fn list_all(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY created_at DESC, id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    pub async fn update(&self, id: &str, patch: ProductPatch) -> DbResult<Product> {
        let mut product = self.get(id).await?;

        if let Some(name) = patch.name {
            if name != product.name && self.name_exists(&name).await? {
                return Err(DbError::duplicate("name", name));
            }
            product.name = name;
        }
        if let Some(description) = patch.description {
            product.description = description;
        }
        if let Some(price) = patch.price {
            product.price = price;
        }
        if let Some(assigned) = patch.assigned_salesman {
            product.assigned_salesman = assigned;
        }
        if let Some(is_active) = patch.is_active {
            product.is_active = is_active;
        }
        product.updated_at = Utc::now();

        debug!(id = %id, "Updating product");

        sqlx::query(
            r#"
            UPDATE products SET
                name = ?2, description = ?3, price = ?4, assigned_salesman = ?5,
                is_active = ?6, updated_at = ?7
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.cents())
        .bind(&product.assigned_salesman)
        .bind(product.is_active)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product)
    }

    pub async fn toggle_active(&self, id: &str) -> DbResult<Product> {
        let result = sqlx::query(
            "UPDATE products SET is_active = NOT is_active, updated_at = ?2 WHERE id = ?1",
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }
        self.get(id).await
    }

    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        debug!(id = %id, "Product deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    fn tea() -> NewProduct {
        NewProduct {
            name: "Tea".into(),
            description: Some("Loose leaf".into()),
            price: Money::from_cents(250),
            added_by: None,
            assigned_salesman: None,
        }
    }

    #[tokio::test]
    async fn test_catalogue_hides_inactive() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db.products().create(tea()).await.unwrap();
        assert_eq!(db.products().list_active().await.unwrap().len(), 1);

        let toggled = db.products().toggle_active(&product.id).await.unwrap();
        assert!(!toggled.is_active);
        assert!(db.products().list_active().await.unwrap().is_empty());
        assert_eq!(db.products().list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_name_is_unique() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.products().create(tea()).await.unwrap();
        let err = db.products().create(tea()).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref field, .. } if field == "name"));
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db.products().create(tea()).await.unwrap();

        let updated = db
            .products()
            .update(
                &product.id,
                ProductPatch {
                    price: Some(Money::from_cents(300)),
                    description: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.price, Money::from_cents(300));
        assert_eq!(updated.description, None);
        assert_eq!(db.products().get(&product.id).await.unwrap().price, Money::from_cents(300));

        db.products().delete(&product.id).await.unwrap();
        assert!(matches!(db.products().get(&product.id).await, Err(DbError::NotFound { .. })));
    }
}
