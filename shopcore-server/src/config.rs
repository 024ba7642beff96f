//! Process configuration from the environment.

use std::env;
use std::num::NonZeroU32;

use shopcore_postgres::{MaxConnections, PostgresConfig};
use thiserror::Error;

/// Configuration loading failures. All of them abort startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is not set.
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),

    /// An environment variable is set to an unusable value.
    #[error("invalid value for {name}: {value}")]
    InvalidVar {
        /// Variable name.
        name: &'static str,
        /// The offending value.
        value: String,
    },
}

/// Server process configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on (`BIND_ADDR`, default `0.0.0.0:8080`).
    pub bind_addr: String,
    /// Postgres connection string (`DATABASE_URL`, required).
    pub database_url: String,
    /// Pool settings (`DB_MAX_CONNECTIONS` overrides the default of 10).
    pub postgres: PostgresConfig,
}

impl ServerConfig {
    /// Loads configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| ConfigError::MissingVar("DATABASE_URL"))?;
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let mut postgres = PostgresConfig::default();
        if let Ok(raw) = env::var("DB_MAX_CONNECTIONS") {
            let parsed = raw.parse::<NonZeroU32>().map_err(|_| ConfigError::InvalidVar {
                name: "DB_MAX_CONNECTIONS",
                value: raw.clone(),
            })?;
            postgres.max_connections = MaxConnections::new(parsed);
        }

        Ok(Self {
            bind_addr,
            database_url,
            postgres,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Environment mutation is process-global, so all branches live in one
    // test to keep them from racing each other.
    #[test]
    fn from_env_covers_defaults_required_and_invalid_values() {
        env::remove_var("DATABASE_URL");
        env::remove_var("BIND_ADDR");
        env::remove_var("DB_MAX_CONNECTIONS");
        assert!(matches!(
            ServerConfig::from_env(),
            Err(ConfigError::MissingVar("DATABASE_URL"))
        ));

        env::set_var("DATABASE_URL", "postgres://localhost/shop");
        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.database_url, "postgres://localhost/shop");

        env::set_var("BIND_ADDR", "127.0.0.1:9999");
        env::set_var("DB_MAX_CONNECTIONS", "32");
        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:9999");
        let max: NonZeroU32 = config.postgres.max_connections.into();
        assert_eq!(max.get(), 32);

        env::set_var("DB_MAX_CONNECTIONS", "zero");
        assert!(matches!(
            ServerConfig::from_env(),
            Err(ConfigError::InvalidVar { name: "DB_MAX_CONNECTIONS", .. })
        ));

        env::remove_var("DATABASE_URL");
        env::remove_var("BIND_ADDR");
        env::remove_var("DB_MAX_CONNECTIONS");
    }
}
