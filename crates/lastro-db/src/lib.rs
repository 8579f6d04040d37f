//! # lastro-db
//!
//! Record store implementations for lastro.
//!
//! This crate provides:
//! - Connection pool management
//! - `PgRecordStore`, rendering predicate trees into parameterized SQL
//! - `MemoryRecordStore`, evaluating the same trees in process
//!
//! ## Example
//!
//! ```rust,ignore
//! use lastro_db::{Database, Predicate, RecordQuery, RecordStore, Attribute};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/lastro").await?;
//!
//!     let query = RecordQuery::filtered(Predicate::contains(Attribute::Category, "fado"));
//!     let records = db.records.execute(&query).await?;
//!
//!     println!("Found {} records", records.len());
//!     Ok(())
//! }
//! ```
pub mod memory;
pub mod pool;
pub mod query_builder;
pub mod store;

// Test fixtures for integration tests
// Note: Always compiled so integration tests (in tests/) can use TestDatabase
pub mod test_fixtures;

// Re-export core types
pub use lastro_core::*;

/// Escape LIKE/ILIKE wildcard characters (`%`, `_`, `\`) in user input.
///
/// Must be paired with `ESCAPE '\'` in the SQL condition.
pub fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

pub use memory::MemoryRecordStore;
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};
pub use query_builder::{QueryParam, RecordQueryBuilder};
pub use store::PgRecordStore;

/// Database handle bundling the pool and the record store.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Record store over [`Database::pool`].
    pub records: PgRecordStore,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            records: PgRecordStore::new(pool.clone()),
            pool,
        }
    }

    /// Connect to the database with default pool configuration.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Connect using `DATABASE_URL` and the `LASTRO_DB_*` pool settings.
    pub async fn connect_from_env() -> Result<Self> {
        let url = std::env::var("DATABASE_URL")
            .map_err(|_| Error::Config("DATABASE_URL is not set".to_string()))?;
        Self::connect_with_config(&url, PoolConfig::from_env()).await
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like_wildcards() {
        assert_eq!(escape_like("50%"), "50\\%");
        assert_eq!(escape_like("a_b"), "a\\_b");
        assert_eq!(escape_like("c:\\x"), "c:\\\\x");
        assert_eq!(escape_like("fado"), "fado");
    }
}
