//! PostgreSQL adapter for the `shopcore` storage ports.
//!
//! The checkout transaction maps directly onto a database transaction:
//! `lock_product` is a `SELECT ... FOR UPDATE`, so the row-level lock the
//! placement protocol depends on is held by postgres itself until the
//! transaction commits or rolls back.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::time::Duration;

use nutype::nutype;
use shopcore::errors::{StoreError, StoreResult};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use thiserror::Error;
use tracing::error;

mod row;
mod store;

pub use store::PostgresCheckout;

/// Errors raised while constructing the adapter itself.
#[derive(Debug, Error)]
pub enum PostgresStoreError {
    /// Failed to create the postgres connection pool.
    #[error("failed to create postgres connection pool")]
    ConnectionFailed(#[source] sqlx::Error),
}

/// Maximum number of database connections in the pool.
///
/// Must be at least 1, enforced by using `NonZeroU32` as the underlying
/// type.
#[nutype(derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRef, Into))]
pub struct MaxConnections(std::num::NonZeroU32);

/// Configuration for the `PostgresShopStore` connection pool.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Maximum number of connections in the pool (default: 10).
    pub max_connections: MaxConnections,
    /// Timeout for acquiring a connection from the pool (default: 30 seconds).
    pub acquire_timeout: Duration,
    /// Idle timeout for connections in the pool (default: 10 minutes).
    pub idle_timeout: Duration,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        const DEFAULT_MAX_CONNECTIONS: std::num::NonZeroU32 = match std::num::NonZeroU32::new(10) {
            Some(v) => v,
            None => unreachable!(),
        };

        Self {
            max_connections: MaxConnections::new(DEFAULT_MAX_CONNECTIONS),
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
        }
    }
}

/// PostgreSQL-backed implementation of the shopcore storage ports.
#[derive(Debug, Clone)]
pub struct PostgresShopStore {
    pool: Pool<Postgres>,
}

impl PostgresShopStore {
    /// Creates a store with the default pool configuration.
    pub async fn new<S: Into<String>>(connection_string: S) -> Result<Self, PostgresStoreError> {
        Self::with_config(connection_string, PostgresConfig::default()).await
    }

    /// Creates a store with a custom pool configuration.
    pub async fn with_config<S: Into<String>>(
        connection_string: S,
        config: PostgresConfig,
    ) -> Result<Self, PostgresStoreError> {
        let connection_string = connection_string.into();
        let max_connections: std::num::NonZeroU32 = config.max_connections.into();
        let pool = PgPoolOptions::new()
            .max_connections(max_connections.get())
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(config.idle_timeout)
            .connect(&connection_string)
            .await
            .map_err(PostgresStoreError::ConnectionFailed)?;
        Ok(Self { pool })
    }

    /// Creates a store from an existing connection pool.
    ///
    /// Use this when you need full control over pool configuration or want
    /// to share a pool across multiple components.
    pub fn from_pool(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// The underlying pool, for callers that need raw access (health
    /// checks, test fixtures).
    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }

    /// Runs the bundled schema migrations.
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|err| StoreError::Failure {
                operation: "migrate",
                detail: err.to_string(),
            })
    }
}

/// Translates a sqlx error into the core taxonomy, logging it at the single
/// point where backend detail is still available.
pub(crate) fn map_sqlx_error(error: sqlx::Error, operation: &'static str) -> StoreError {
    match &error {
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            error!(
                error = %error,
                operation,
                "[postgres.connection_error] connection-level failure"
            );
            StoreError::Connection(error.to_string())
        }
        _ => {
            error!(
                error = %error,
                operation,
                "[postgres.database_error] database operation failed"
            );
            StoreError::Failure {
                operation,
                detail: error.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_ten_connections() {
        let config = PostgresConfig::default();
        let max: std::num::NonZeroU32 = config.max_connections.into();
        assert_eq!(max.get(), 10);
        assert_eq!(config.acquire_timeout, Duration::from_secs(30));
        assert_eq!(config.idle_timeout, Duration::from_secs(600));
    }

    #[test]
    fn pool_errors_map_to_connection_variant() {
        let mapped = map_sqlx_error(sqlx::Error::PoolTimedOut, "list_products");
        assert!(matches!(mapped, StoreError::Connection(_)));
    }

    #[test]
    fn other_errors_map_to_failure_with_the_operation() {
        let mapped = map_sqlx_error(sqlx::Error::RowNotFound, "insert_order");
        match mapped {
            StoreError::Failure { operation, .. } => assert_eq!(operation, "insert_order"),
            other => panic!("expected Failure, got {other:?}"),
        }
    }
}
