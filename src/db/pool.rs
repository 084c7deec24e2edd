//! Connection pool management.
//!
//! [`PoolManager`] owns one `MySqlPool` per configured database target. The
//! pool is created lazily: no connection is opened until the first acquire.

use crate::db::escape::Escaper;
use crate::error::{DbError, DbResult};
use crate::models::DriverConfig;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlPoolOptions};
use sqlx::pool::PoolConnection;
use sqlx::{Connection, MySql, MySqlPool};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct PoolManager {
    pool: MySqlPool,
    escaper: Escaper,
    connection_limit: u32,
}

impl PoolManager {
    /// Create the pool for `config`. Must be called within a tokio runtime;
    /// performs no network I/O.
    pub fn new(config: &DriverConfig) -> DbResult<Self> {
        config.validate()?;

        let mut options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .database(config.connect_database())
            .charset("utf8mb4");
        if let Some(password) = &config.password {
            options = options.password(password);
        }

        let pool_opts = &config.pool_options;
        let pool = MySqlPoolOptions::new()
            .max_connections(config.connection_limit)
            .min_connections(pool_opts.min_connections_or_default())
            .acquire_timeout(pool_opts.acquire_timeout_or_default())
            .idle_timeout(Some(pool_opts.idle_timeout_or_default()))
            .test_before_acquire(pool_opts.test_before_acquire_or_default())
            .connect_lazy_with(options);

        info!(
            host = %config.host,
            port = config.port,
            database = %config.connect_database(),
            connection_limit = config.connection_limit,
            "Created connection pool"
        );

        Ok(Self {
            pool,
            escaper: Escaper::new(config.no_backslash_escapes),
            connection_limit: config.connection_limit,
        })
    }

    /// Wait for a free connection, opening a new one if the pool is below
    /// its limit.
    pub async fn acquire(&self) -> DbResult<DriverConnection> {
        match self.pool.acquire().await {
            Ok(conn) => {
                debug!(
                    size = self.pool.size(),
                    idle = self.pool.num_idle(),
                    "Acquired connection"
                );
                Ok(DriverConnection { inner: conn })
            }
            Err(e) => {
                warn!(error = %e, "Failed to acquire connection");
                Err(DbError::acquire_failed(e))
            }
        }
    }

    /// The pool's engine-native escaping rules.
    pub fn escaper(&self) -> &Escaper {
        &self.escaper
    }

    pub fn connection_limit(&self) -> u32 {
        self.connection_limit
    }

    /// Number of open connections, idle or checked out.
    pub fn size(&self) -> u32 {
        self.pool.size()
    }

    pub fn num_idle(&self) -> usize {
        self.pool.num_idle()
    }

    /// Close every connection and reject further acquires.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Connection pool closed");
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}

/// A connection checked out of the pool.
///
/// Dropping it returns it to the pool. Only one statement runs on it at a
/// time since every use needs `&mut`.
#[derive(Debug)]
pub struct DriverConnection {
    inner: PoolConnection<MySql>,
}

impl DriverConnection {
    pub(crate) fn raw(&mut self) -> &mut MySqlConnection {
        &mut self.inner
    }

    /// Close the connection instead of returning it. The pool may open a
    /// replacement later.
    pub async fn close(self) -> DbResult<()> {
        self.inner
            .detach()
            .close()
            .await
            .map_err(DbError::acquire_failed)
    }

    /// Drop the connection without returning it to the pool.
    pub(crate) fn discard(self) {
        warn!("Discarding connection after fatal error");
        drop(self.inner.detach());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoolOptions;

    #[tokio::test]
    async fn test_pool_creation_is_lazy() {
        // Nothing listens on port 1; construction must still succeed.
        let config = DriverConfig::new("blog")
            .with_host("127.0.0.1", 1)
            .with_connection_limit(3);
        let pool = PoolManager::new(&config).unwrap();
        assert_eq!(pool.size(), 0);
        assert_eq!(pool.num_idle(), 0);
        assert_eq!(pool.connection_limit(), 3);
        assert!(!pool.is_closed());
    }

    #[tokio::test]
    async fn test_pool_rejects_invalid_config() {
        let config = DriverConfig::new("blog").with_connection_limit(0);
        let err = PoolManager::new(&config).unwrap_err();
        assert!(matches!(err, DbError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn test_acquire_failure_is_connection_error() {
        let config = DriverConfig::new("blog")
            .with_host("127.0.0.1", 1)
            .with_pool_options(PoolOptions {
                acquire_timeout_secs: Some(1),
                ..Default::default()
            });
        let pool = PoolManager::new(&config).unwrap();
        let err = pool.acquire().await.unwrap_err();
        assert!(matches!(err, DbError::Connection { .. }));
        assert!(err.engine_error().is_some());
    }

    #[tokio::test]
    async fn test_close() {
        let pool = PoolManager::new(&DriverConfig::new("blog")).unwrap();
        pool.close().await;
        assert!(pool.is_closed());
        let err = pool.acquire().await.unwrap_err();
        assert!(matches!(err, DbError::Connection { .. }));
    }

    #[test]
    fn test_escaper_follows_config() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let _guard = rt.enter();
        let mut config = DriverConfig::new("blog");
        config.no_backslash_escapes = true;
        let pool = PoolManager::new(&config).unwrap();
        assert!(pool.escaper().no_backslash_escapes());
    }
}
