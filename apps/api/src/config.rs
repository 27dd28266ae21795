//! API configuration module.
//!
//! Configuration is layered with the `config` crate:
//!
//! ```text
//! built-in defaults  ──►  fieldsales.toml (optional)  ──►  environment
//!   (lowest)                                                 (highest)
//! ```
//!
//! Environment keys are the upper-case field names, e.g. `PORT`,
//! `DATABASE_URL`, `JWT_SECRET`, `MAX_SALE_DISTANCE_METERS`.

use std::time::Duration;

use config::{Config, Environment, File};
use fieldsales_db::DbConfig;
use serde::{Deserialize, Serialize};

/// Secret used when none is configured. Refused outside development.
pub const DEV_JWT_SECRET: &str = "fieldsales-dev-secret-change-in-production";

/// API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// HTTP port
    pub port: u16,

    /// SQLite URL or path (`sqlite://fieldsales.db`, `sqlite::memory:`)
    pub database_url: String,

    /// HS256 signing secret
    pub jwt_secret: String,

    /// Salesman token lifetime in seconds
    pub jwt_salesman_lifetime_secs: i64,

    /// Admin token lifetime in seconds
    pub jwt_admin_lifetime_secs: i64,

    /// Sale validity threshold in meters
    pub max_sale_distance_meters: f64,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,

    /// `development` exposes internal error details in responses
    pub environment: String,

    pub db_max_connections: u32,
    pub db_retry_max_interval_secs: u64,
    pub db_retry_max_elapsed_secs: u64,
}

impl ApiConfig {
    /// Loads defaults, then `fieldsales.toml` if present, then the process
    /// environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(Some("fieldsales"), Environment::default().try_parsing(true))
    }

    /// Loads from an optional config file stem and an explicit environment
    /// source.
    pub fn load_with(file: Option<&str>, env: Environment) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("port", 5000)?
            .set_default("database_url", "sqlite://fieldsales.db")?
            .set_default("jwt_secret", DEV_JWT_SECRET)?
            .set_default("jwt_salesman_lifetime_secs", 86_400)?
            .set_default("jwt_admin_lifetime_secs", 86_400)?
            .set_default("max_sale_distance_meters", fieldsales_core::MAX_SALE_DISTANCE_METERS)?
            .set_default("request_timeout_secs", 30)?
            .set_default("environment", "production")?
            .set_default("db_max_connections", 10)?
            .set_default("db_retry_max_interval_secs", 10)?
            .set_default("db_retry_max_elapsed_secs", 60)?;

        if let Some(stem) = file {
            builder = builder.add_source(File::with_name(stem).required(false));
        }

        let config: ApiConfig = builder.add_source(env).build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.trim().is_empty() {
            return Err(ConfigError::MissingRequired("JWT_SECRET".to_string()));
        }
        if self.jwt_secret == DEV_JWT_SECRET && !self.is_development() {
            return Err(ConfigError::MissingRequired(
                "JWT_SECRET (the built-in secret is only allowed in development)".to_string(),
            ));
        }
        if !self.max_sale_distance_meters.is_finite() || self.max_sale_distance_meters <= 0.0 {
            return Err(ConfigError::InvalidValue("MAX_SALE_DISTANCE_METERS".to_string()));
        }
        if self.jwt_salesman_lifetime_secs <= 0 {
            return Err(ConfigError::InvalidValue("JWT_SALESMAN_LIFETIME_SECS".to_string()));
        }
        if self.jwt_admin_lifetime_secs <= 0 {
            return Err(ConfigError::InvalidValue("JWT_ADMIN_LIFETIME_SECS".to_string()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue("REQUEST_TIMEOUT_SECS".to_string()));
        }
        if self.db_max_connections == 0 {
            return Err(ConfigError::InvalidValue("DB_MAX_CONNECTIONS".to_string()));
        }
        Ok(())
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Database settings derived from this configuration.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::from_url(&self.database_url)
            .max_connections(self.db_max_connections)
            .retry(
                Duration::from_secs(self.db_retry_max_interval_secs),
                Duration::from_secs(self.db_retry_max_elapsed_secs),
            )
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> Environment {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Environment::default().try_parsing(true).source(Some(map))
    }

    #[test]
    fn test_defaults_in_development() {
        let config = ApiConfig::load_with(None, env(&[("ENVIRONMENT", "development")])).unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.max_sale_distance_meters, 200.0);
        assert_eq!(config.jwt_salesman_lifetime_secs, 86_400);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert!(config.is_development());
    }

    #[test]
    fn test_environment_overrides_defaults() {
        let config = ApiConfig::load_with(
            None,
            env(&[
                ("PORT", "8080"),
                ("JWT_SECRET", "s3cret"),
                ("MAX_SALE_DISTANCE_METERS", "150"),
            ]),
        )
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.jwt_secret, "s3cret");
        assert_eq!(config.max_sale_distance_meters, 150.0);
        assert!(!config.is_development());
    }

    #[test]
    fn test_dev_secret_refused_in_production() {
        let err = ApiConfig::load_with(None, env(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired(_)));
    }

    #[test]
    fn test_rejects_bad_threshold() {
        let err = ApiConfig::load_with(
            None,
            env(&[("JWT_SECRET", "s3cret"), ("MAX_SALE_DISTANCE_METERS", "0")]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref key) if key == "MAX_SALE_DISTANCE_METERS"));
    }
}
