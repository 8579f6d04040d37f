//! Database connection pool management.

use std::time::{Duration, Instant};

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{debug, info, warn};

use lastro_core::{defaults, Attribute, Error, Result};

/// Pool configuration options.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum number of connections in the pool.
    pub max_connections: u32,
    /// Minimum number of connections to maintain.
    pub min_connections: u32,
    /// Connection acquire timeout.
    pub connect_timeout: Duration,
    /// Idle connection timeout.
    pub idle_timeout: Duration,
    /// Maximum connection lifetime.
    pub max_lifetime: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: defaults::POOL_MAX_CONNECTIONS,
            min_connections: 1,
            connect_timeout: Duration::from_secs(defaults::POOL_CONNECT_TIMEOUT_SECS),
            idle_timeout: Duration::from_secs(defaults::POOL_IDLE_TIMEOUT_SECS),
            max_lifetime: Some(Duration::from_secs(defaults::POOL_MAX_LIFETIME_SECS)),
        }
    }
}

impl PoolConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pool settings from the environment, defaults for anything unset or
    /// unparsable.
    ///
    /// Environment variables:
    /// - `LASTRO_DB_MAX_CONNECTIONS` (default: 20)
    /// - `LASTRO_DB_CONNECT_TIMEOUT_SECS` (default: 5)
    pub fn from_env() -> Self {
        let base = Self::default();
        let max_connections = std::env::var("LASTRO_DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.trim().parse::<u32>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(base.max_connections);
        let connect_timeout = std::env::var("LASTRO_DB_CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(base.connect_timeout);
        Self {
            max_connections,
            connect_timeout,
            ..base
        }
    }

    pub fn with_max_connections(mut self, n: u32) -> Self {
        self.max_connections = n;
        self
    }

    pub fn with_min_connections(mut self, n: u32) -> Self {
        self.min_connections = n;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn with_max_lifetime(mut self, lifetime: Option<Duration>) -> Self {
        self.max_lifetime = lifetime;
        self
    }

    /// Whether one column-scan batch (every searchable column plus keywords)
    /// can run without waiting for a connection.
    pub fn fits_widest_batch(&self) -> bool {
        self.max_connections as usize >= widest_batch()
    }
}

/// Queries issued at once by the single-term fallback scan.
fn widest_batch() -> usize {
    Attribute::SEARCHABLE.len() + 1
}

/// Create a PostgreSQL connection pool with default configuration.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    create_pool_with_config(database_url, PoolConfig::default()).await
}

/// Create a PostgreSQL connection pool with custom configuration.
pub async fn create_pool_with_config(database_url: &str, config: PoolConfig) -> Result<PgPool> {
    let start = Instant::now();

    info!(
        subsystem = "db",
        component = "pool",
        op = "create",
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        connect_timeout_secs = config.connect_timeout.as_secs(),
        "Creating record store connection pool"
    );
    if !config.fits_widest_batch() {
        warn!(
            subsystem = "db",
            component = "pool",
            max_connections = config.max_connections,
            widest_batch = widest_batch(),
            "Pool is smaller than the widest query batch, batches will queue"
        );
    }

    let mut options = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.connect_timeout)
        .idle_timeout(config.idle_timeout);

    if let Some(max_lifetime) = config.max_lifetime {
        options = options.max_lifetime(max_lifetime);
    }

    let pool = options
        .connect(database_url)
        .await
        .map_err(Error::Database)?;

    info!(
        subsystem = "db",
        component = "pool",
        op = "established",
        pool_size = pool.size(),
        pool_idle = pool.num_idle(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Record store connection pool established"
    );
    Ok(pool)
}

/// Log pool size and idle count, warning when no idle connection is left.
pub fn log_pool_metrics(pool: &PgPool) {
    let size = pool.size();
    let idle = pool.num_idle();

    debug!(
        subsystem = "db",
        component = "pool",
        op = "metrics",
        pool_size = size,
        pool_idle = idle,
        "Pool health check"
    );

    if idle == 0 && size > 0 {
        warn!(
            subsystem = "db",
            component = "pool",
            pool_size = size,
            "Connection pool has no idle connections, concurrent batches will queue"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn test_default_uses_central_constants() {
        let config = PoolConfig::default();
        assert_eq!(config.max_connections, defaults::POOL_MAX_CONNECTIONS);
        assert_eq!(
            config.max_lifetime,
            Some(Duration::from_secs(defaults::POOL_MAX_LIFETIME_SECS))
        );
    }

    #[test]
    fn test_pool_config_builder() {
        let config = PoolConfig::new()
            .with_max_connections(4)
            .with_min_connections(2)
            .with_connect_timeout(Duration::from_secs(1))
            .with_max_lifetime(None);

        assert_eq!(config.max_connections, 4);
        assert_eq!(config.min_connections, 2);
        assert_eq!(config.connect_timeout, Duration::from_secs(1));
        assert!(config.max_lifetime.is_none());
        assert!(!config.fits_widest_batch());
    }

    #[test]
    fn test_default_fits_column_scan() {
        assert_eq!(widest_batch(), 12);
        assert!(PoolConfig::default().fits_widest_batch());
    }

    #[test]
    fn test_from_env_overrides_and_ignores_garbage() {
        let _guard = ENV_MUTEX.lock().unwrap_or_else(|p| p.into_inner());

        std::env::set_var("LASTRO_DB_MAX_CONNECTIONS", "32");
        std::env::set_var("LASTRO_DB_CONNECT_TIMEOUT_SECS", "soon");
        let config = PoolConfig::from_env();
        assert_eq!(config.max_connections, 32);
        assert_eq!(
            config.connect_timeout,
            Duration::from_secs(defaults::POOL_CONNECT_TIMEOUT_SECS)
        );

        std::env::set_var("LASTRO_DB_MAX_CONNECTIONS", "0");
        assert_eq!(
            PoolConfig::from_env().max_connections,
            defaults::POOL_MAX_CONNECTIONS
        );

        std::env::remove_var("LASTRO_DB_MAX_CONNECTIONS");
        std::env::remove_var("LASTRO_DB_CONNECT_TIMEOUT_SECS");
    }
}
