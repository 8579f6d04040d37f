//! Collaborator traits consumed by the search engines.
//!
//! Implementations live in `lastro-db` (PostgreSQL and in-memory stores) or
//! are supplied by the embedding application (query translation).

use async_trait::async_trait;
use futures::future::join_all;

use crate::error::Result;
use crate::filter::RecordQuery;
use crate::models::Record;

// =============================================================================
// RECORD STORE
// =============================================================================

/// Read-only access to the catalogue.
///
/// Every call is one independent read; no transaction spans a batch.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Run one structured query.
    async fn execute(&self, query: &RecordQuery) -> Result<Vec<Record>>;

    /// Run a batch of structured queries concurrently.
    ///
    /// Outcomes are returned in input order and are independent: one failed
    /// query does not affect the others.
    async fn execute_batch(&self, queries: &[RecordQuery]) -> Vec<Result<Vec<Record>>> {
        join_all(queries.iter().map(|q| self.execute(q))).await
    }

    /// Run query text produced outside this crate (e.g. by a translator).
    async fn execute_raw(&self, query: &str) -> Result<Vec<Record>>;

    /// Run a batch of raw query texts concurrently, outcomes in input order.
    async fn execute_raw_batch(&self, queries: &[String]) -> Vec<Result<Vec<Record>>> {
        join_all(queries.iter().map(|q| self.execute_raw(q))).await
    }
}

// =============================================================================
// QUERY TRANSLATION
// =============================================================================

/// Natural-language to query translation service.
///
/// Returns the raw model output (`QUERY:` / `DESC:` lines); parsing is done
/// by the caller.
#[async_trait]
pub trait QueryTranslator: Send + Sync {
    async fn translate(&self, prompt: &str, previous_prompts: &[String]) -> Result<String>;
}
