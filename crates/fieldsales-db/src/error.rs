//! # Repository Errors
//!
//! Every repository method returns [`DbResult`]. SQLite failures are sorted
//! into the handful of outcomes the API layer distinguishes:
//!
//! ```text
//! ┌──────────────────────────────┬──────────────────────┬────────────────┐
//! │ SQLite / sqlx failure        │ DbError              │ HTTP (apps/api)│
//! ├──────────────────────────────┼──────────────────────┼────────────────┤
//! │ no row / foreign owner       │ NotFound             │ 404            │
//! │ UNIQUE index                 │ UniqueViolation      │ 409            │
//! │ FOREIGN KEY                  │ ForeignKeyViolation  │ 400            │
//! │ precondition checked in SQL  │ Conflict             │ 409            │
//! │ pool timeout / closed / io   │ PoolExhausted,       │ 503            │
//! │                              │ ConnectionFailed     │                │
//! │ anything else                │ QueryFailed, ...     │ 500            │
//! └──────────────────────────────┴──────────────────────┴────────────────┘
//! ```

use sqlx::error::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    /// The id does not exist, or the row is owned by another salesman.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// `field` is the request field name (`contactNo`, `email`, ...), not the
    /// SQL column.
    #[error("{field} '{value}' is already registered")]
    UniqueViolation { field: String, value: String },

    #[error("Referenced record is missing: {message}")]
    ForeignKeyViolation { message: String },

    /// Business precondition rejected inside a write (e.g. a second admin).
    #[error("{0}")]
    Conflict(String),

    #[error("Database connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Schema migration failed: {0}")]
    MigrationFailed(String),

    #[error("Statement rejected by SQLite: {0}")]
    QueryFailed(String),

    /// Commit or rollback failed after the statements themselves succeeded.
    #[error("Transaction could not be completed: {0}")]
    TransactionFailed(String),

    #[error("Timed out waiting for a database connection")]
    PoolExhausted,

    #[error("Unexpected database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// A value that collides with an existing row.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// True when SQLite could not be reached. Startup retries on these and
    /// the API answers 503.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, DbError::ConnectionFailed(_) | DbError::PoolExhausted)
    }
}

/// Request field name for a `table.column` named in a SQLite UNIQUE message.
fn unique_field(target: &str) -> String {
    let column = target.rsplit('.').next().unwrap_or(target).trim();
    match column {
        "contact_no" => "contactNo".to_string(),
        "master_sim_no" => "masterSimNo".to_string(),
        other => other.to_string(),
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),
            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();
                match db_err.kind() {
                    ErrorKind::UniqueViolation => {
                        // "UNIQUE constraint failed: retailers.contact_no"
                        let target = message.rsplit(": ").next().unwrap_or(&message);
                        DbError::duplicate(unique_field(target), "unknown")
                    }
                    ErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation { message },
                    _ => DbError::QueryFailed(message),
                }
            }
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("connection pool is closed".to_string()),
            sqlx::Error::Io(e) => DbError::ConnectionFailed(e.to_string()),
            other => DbError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    #[test]
    fn test_unique_field_uses_request_names() {
        assert_eq!(unique_field("retailers.contact_no"), "contactNo");
        assert_eq!(unique_field("franchises.master_sim_no"), "masterSimNo");
        assert_eq!(unique_field("salesmen.email"), "email");
    }

    #[test]
    fn test_unavailable_variants() {
        assert!(DbError::PoolExhausted.is_unavailable());
        assert!(DbError::ConnectionFailed("refused".into()).is_unavailable());
        assert!(!DbError::not_found("Sale", "s-1").is_unavailable());
        assert!(DbError::from(sqlx::Error::PoolClosed).is_unavailable());
    }

    #[tokio::test]
    async fn test_sqlite_constraints_are_classified() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await.unwrap();
        sqlx::query("CREATE TABLE parents (id TEXT PRIMARY KEY, contact_no TEXT UNIQUE)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("CREATE TABLE children (parent_id TEXT NOT NULL REFERENCES parents(id))")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO parents VALUES ('p1', '0300')")
            .execute(&pool)
            .await
            .unwrap();

        let err: DbError = sqlx::query("INSERT INTO parents VALUES ('p2', '0300')")
            .execute(&pool)
            .await
            .unwrap_err()
            .into();
        assert!(matches!(err, DbError::UniqueViolation { ref field, .. } if field == "contactNo"));

        let err: DbError = sqlx::query("INSERT INTO children VALUES ('missing')")
            .execute(&pool)
            .await
            .unwrap_err()
            .into();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));

        let err: DbError = sqlx::query("SELECT * FROM nowhere")
            .fetch_all(&pool)
            .await
            .err()
            .unwrap()
            .into();
        assert!(matches!(err, DbError::QueryFailed(_)));
    }
}
