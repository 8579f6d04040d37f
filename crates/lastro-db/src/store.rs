//! PostgreSQL record store.

use std::time::Instant;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::{PgPool, Postgres};
use tracing::{debug, instrument, trace};

use lastro_core::{Attribute, Error, Record, RecordQuery, RecordStore, Result};

use crate::query_builder::{column_expr, QueryParam, RecordQueryBuilder};

/// `date LIKE` / `date NOT LIKE`, optionally table-qualified.
static DATE_LIKE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:\w+\.)?date\s+(not\s+)?like\b").expect("date LIKE regex is valid")
});

static LIKE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\blike\b").expect("LIKE regex is valid"));

/// [`RecordStore`] backed by the `projects` table.
#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Check that `raw` is exactly one SELECT statement and return it without
/// its trailing semicolon.
pub fn validate_select(raw: &str) -> Result<&str> {
    let statement = raw.trim().trim_end_matches(';').trim_end();
    if statement.is_empty() {
        return Err(Error::InvalidInput("empty query".to_string()));
    }

    let starts_with_select = statement
        .get(..6)
        .is_some_and(|head| head.eq_ignore_ascii_case("select"));
    if !starts_with_select {
        return Err(Error::Query(
            "only SELECT statements are accepted".to_string(),
        ));
    }

    // a semicolon outside a string literal starts a second statement
    let mut in_literal = false;
    for c in statement.chars() {
        match c {
            '\'' => in_literal = !in_literal,
            ';' if !in_literal => {
                return Err(Error::Query(
                    "multiple statements are not accepted".to_string(),
                ))
            }
            _ => {}
        }
    }
    if in_literal {
        return Err(Error::Query("unterminated string literal".to_string()));
    }

    Ok(statement)
}

/// Rewrite LIKE conditions in translated text the way structured queries
/// render them: `LIKE` becomes `ILIKE` and the date column is matched as
/// `YYYY-MM-DD` text. String literals are left untouched.
///
/// Expects a statement accepted by [`validate_select`], so quotes are balanced.
pub fn to_postgres_dialect(statement: &str) -> String {
    let date_expr = column_expr(Attribute::Date);
    statement
        .split('\'')
        .enumerate()
        .map(|(i, segment)| {
            if i % 2 == 1 {
                return segment.to_string();
            }
            let dated = DATE_LIKE.replace_all(segment, |caps: &regex::Captures<'_>| {
                match caps.get(1) {
                    Some(_) => format!("{} NOT ILIKE", date_expr),
                    None => format!("{} ILIKE", date_expr),
                }
            });
            LIKE.replace_all(&dated, "ILIKE").into_owned()
        })
        .collect::<Vec<_>>()
        .join("'")
}

#[async_trait]
impl RecordStore for PgRecordStore {
    #[instrument(skip(self, query), fields(subsystem = "db", component = "store", op = "execute"))]
    async fn execute(&self, query: &RecordQuery) -> Result<Vec<Record>> {
        let start = Instant::now();
        let (sql, params) = RecordQueryBuilder::new(query, 0).build();
        trace!(sql = %sql, param_count = params.len(), "Rendered record query");

        let mut q = sqlx::query_as::<Postgres, Record>(&sql);
        for param in &params {
            q = match param {
                QueryParam::String(s) => q.bind(s),
                QueryParam::Int(val) => q.bind(val),
            };
        }

        let records = q.fetch_all(&self.pool).await.map_err(Error::Database)?;

        debug!(
            query = %query,
            result_count = records.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Record query executed"
        );
        Ok(records)
    }

    #[instrument(skip(self, query), fields(subsystem = "db", component = "store", op = "execute_raw"))]
    async fn execute_raw(&self, query: &str) -> Result<Vec<Record>> {
        let start = Instant::now();
        let statement = to_postgres_dialect(validate_select(query)?);

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        sqlx::query("SET TRANSACTION READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        let records = sqlx::query_as::<Postgres, Record>(&statement)
            .fetch_all(&mut *tx)
            .await
            .map_err(Error::Database)?;

        tx.rollback().await.map_err(Error::Database)?;

        debug!(
            query = %statement,
            result_count = records.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Raw query executed"
        );
        Ok(records)
    }
}
