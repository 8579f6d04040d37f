//! In-process record store.
//!
//! Evaluates [`RecordQuery`] predicate trees directly against a fixed record
//! set, with the same case-insensitive substring and NULL semantics as the
//! PostgreSQL store. Used by engine tests and by embedders that hold the
//! catalogue in memory.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use lastro_db::MemoryRecordStore;
//! use lastro_core::{Attribute, Record};
//!
//! let store = MemoryRecordStore::new(vec![
//!     Record::new(1, "https://video/1").with(Attribute::Category, "Fado"),
//! ])
//! .fail_on_attribute(Attribute::Author);
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use rand::seq::SliceRandom;
use tracing::trace;

use lastro_core::{
    Attribute, Error, Predicate, QueryOrder, Record, RecordQuery, RecordStore, Result,
};

type FailurePredicate = Arc<dyn Fn(&RecordQuery) -> bool + Send + Sync>;

/// [`RecordStore`] over an in-memory record list.
#[derive(Clone)]
pub struct MemoryRecordStore {
    config: Arc<MemoryConfig>,
    query_log: Arc<Mutex<Vec<String>>>,
}

#[derive(Clone, Default)]
struct MemoryConfig {
    records: Vec<Record>,
    raw_results: HashMap<String, Vec<i64>>,
    failures: Vec<FailurePredicate>,
    fail_raw: bool,
}

impl MemoryRecordStore {
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            config: Arc::new(MemoryConfig {
                records,
                ..Default::default()
            }),
            query_log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Answer a raw query text with the records of the given identities.
    ///
    /// Raw text is matched after trimming; unknown raw queries return no
    /// records.
    pub fn with_raw_result(mut self, query: impl Into<String>, ids: Vec<i64>) -> Self {
        Arc::make_mut(&mut self.config)
            .raw_results
            .insert(query.into().trim().to_string(), ids);
        self
    }

    /// Fail every structured query for which `predicate` returns true.
    pub fn fail_when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&RecordQuery) -> bool + Send + Sync + 'static,
    {
        Arc::make_mut(&mut self.config)
            .failures
            .push(Arc::new(predicate));
        self
    }

    /// Fail every structured query whose filter references `attribute`.
    pub fn fail_on_attribute(self, attribute: Attribute) -> Self {
        self.fail_when(move |query| {
            query
                .filter
                .as_ref()
                .is_some_and(|p| references(p, attribute))
        })
    }

    /// Fail every raw query.
    pub fn fail_raw_queries(mut self) -> Self {
        Arc::make_mut(&mut self.config).fail_raw = true;
        self
    }

    pub fn records(&self) -> &[Record] {
        &self.config.records
    }

    /// Texts of every query executed so far, structured and raw, in order.
    pub fn executed_queries(&self) -> Vec<String> {
        self.log().clone()
    }

    pub fn execution_count(&self) -> usize {
        self.log().len()
    }

    pub fn clear_log(&self) {
        self.log().clear();
    }

    fn log(&self) -> MutexGuard<'_, Vec<String>> {
        // the log holds plain strings, a poisoned guard is still consistent
        self.query_log
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn by_ids(&self, ids: &[i64]) -> Vec<Record> {
        ids.iter()
            .filter_map(|id| self.config.records.iter().find(|r| r.id == *id))
            .cloned()
            .collect()
    }
}

/// Whether any leaf of `predicate` is a condition on `attribute`.
fn references(predicate: &Predicate, attribute: Attribute) -> bool {
    match predicate {
        Predicate::Contains { attribute: a, .. } => *a == attribute,
        Predicate::YearPrefix { .. } => attribute == Attribute::Date,
        Predicate::Not(inner) => references(inner, attribute),
        Predicate::And(parts) | Predicate::Or(parts) => {
            parts.iter().any(|p| references(p, attribute))
        }
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn execute(&self, query: &RecordQuery) -> Result<Vec<Record>> {
        let text = query.to_query_text();
        self.log().push(text.clone());

        if self.config.failures.iter().any(|fails| fails(query)) {
            return Err(Error::Query(format!("injected failure: {}", text)));
        }

        let mut records: Vec<Record> = self
            .config
            .records
            .iter()
            .filter(|r| query.matches(r))
            .cloned()
            .collect();

        if query.order == QueryOrder::Random {
            records.shuffle(&mut rand::thread_rng());
        }
        if let Some(limit) = query.limit {
            records.truncate(usize::try_from(limit).unwrap_or(0));
        }

        trace!(query = %text, result_count = records.len(), "Memory query executed");
        Ok(records)
    }

    async fn execute_raw(&self, query: &str) -> Result<Vec<Record>> {
        let key = query.trim();
        self.log().push(key.to_string());

        if self.config.fail_raw {
            return Err(Error::Query(format!("injected failure: {}", key)));
        }

        let records = self
            .config
            .raw_results
            .get(key)
            .map(|ids| self.by_ids(ids))
            .unwrap_or_default();
        Ok(records)
    }
}
