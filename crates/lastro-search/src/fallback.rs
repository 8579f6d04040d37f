//! Cascading fallback for queries that returned nothing.
//!
//! Recovers the search terms of the failed queries and tries progressively
//! broader queries against the record store:
//!
//! 1. one free term: every searchable column, then the keyword column, then
//!    a word split of the term over keywords;
//! 2. several free terms: one keyword query OR-ing all of them;
//! 3. no free terms: straight to the final tier;
//! 4. a random sample of the catalogue.
//!
//! Tiers run strictly in order. Queries inside a tier run concurrently.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, instrument, warn};

use lastro_core::{
    defaults, Attribute, FallbackLevel, FallbackResponse, Predicate, Record, RecordQuery,
    RecordStore, Result, ResultGroup,
};

use crate::config::FallbackConfig;
use crate::dedup::is_duplicate;
use crate::descriptions;
use crate::extraction::{extract_terms_from_queries, ExtractedTerms};

/// Applies the fallback tiers against a record store.
pub struct FallbackEngine {
    store: Arc<dyn RecordStore>,
    config: FallbackConfig,
}

impl FallbackEngine {
    pub fn new(store: Arc<dyn RecordStore>, config: FallbackConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &FallbackConfig {
        &self.config
    }

    /// Recover terms from `original_queries` and run the fallback tiers.
    ///
    /// Only the final random tier can return an error, when the store cannot
    /// be read at all.
    #[instrument(skip(self, original_queries), fields(
        subsystem = "search",
        component = "fallback",
        op = "apply_fallback",
        query_count = original_queries.len(),
    ))]
    pub async fn apply_fallback<S: AsRef<str> + Sync>(
        &self,
        original_queries: &[S],
    ) -> Result<FallbackResponse> {
        let start = Instant::now();
        let terms = extract_terms_from_queries(original_queries);
        debug!(
            terms = ?terms.terms,
            date_term = terms.date_term.as_deref(),
            "Recovered search terms"
        );

        let response = self.fallback_for_terms(&terms).await?;

        info!(
            fallback_level = %response.fallback_level,
            group_count = response.group_count(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Fallback completed"
        );
        Ok(response)
    }

    /// Run the fallback tiers for already extracted terms.
    pub async fn fallback_for_terms(&self, terms: &ExtractedTerms) -> Result<FallbackResponse> {
        let date = terms.date_term.as_deref();

        let answer = match terms.terms.as_slice() {
            [] => None,
            [term] => self.single_term(term, date).await,
            several => self.multi_term(several, date).await,
        };

        match answer {
            Some((groups, level)) => Ok(FallbackResponse::from_groups(groups, level)),
            None => self.random_sample().await,
        }
    }

    /// Tier 1: one free term.
    async fn single_term(
        &self,
        term: &str,
        date: Option<&str>,
    ) -> Option<(Vec<ResultGroup>, FallbackLevel)> {
        let mut queries: Vec<(RecordQuery, String)> = Attribute::SEARCHABLE
            .iter()
            .map(|&attribute| {
                (
                    dated(Predicate::contains(attribute, term), date),
                    descriptions::column_match(attribute, term),
                )
            })
            .collect();
        queries.push((
            dated(Predicate::contains(Attribute::Keywords, term), date),
            descriptions::keyword_match(term),
        ));

        let batch: Vec<RecordQuery> = queries.iter().map(|(q, _)| q.clone()).collect();
        let outcomes = self.store.execute_batch(&batch).await;

        // the keyword query is last, so column groups are accepted before it
        let keyword_index = queries.len() - 1;
        let mut groups: Vec<ResultGroup> = Vec::new();
        let mut column_groups = 0usize;
        for (index, ((query, description), outcome)) in
            queries.into_iter().zip(outcomes).enumerate()
        {
            let records = records_or_empty(&query, outcome);
            if records.is_empty() || is_duplicate(&records, &groups) {
                continue;
            }
            if index != keyword_index {
                column_groups += 1;
            }
            groups.push(ResultGroup::new(query, description, records));
        }

        if !groups.is_empty() {
            let level = if column_groups > 0 {
                FallbackLevel::SingleColumnMultiMatch
            } else {
                FallbackLevel::KeywordMatch
            };
            return Some((groups, level));
        }

        self.split_words(term, date).await
    }

    /// Tier 1 relaxation: OR of the term's longer words over keywords.
    async fn split_words(
        &self,
        term: &str,
        date: Option<&str>,
    ) -> Option<(Vec<ResultGroup>, FallbackLevel)> {
        let words: Vec<&str> = term
            .split_whitespace()
            .filter(|w| w.chars().count() > defaults::MIN_TOKEN_LEN)
            .take(self.config.split_words_max)
            .collect();
        if words.len() < 2 {
            debug!(term, "Too few words to split, skipping split-word tier");
            return None;
        }

        let group = self
            .keyword_any(&words, date, descriptions::related_terms(&words))
            .await?;
        Some((vec![group], FallbackLevel::SplitWords))
    }

    /// Tier 2: several free terms OR-ed over keywords.
    async fn multi_term(
        &self,
        terms: &[String],
        date: Option<&str>,
    ) -> Option<(Vec<ResultGroup>, FallbackLevel)> {
        let group = self
            .keyword_any(terms, date, descriptions::related_terms(terms))
            .await?;
        Some((vec![group], FallbackLevel::MultiTermKeyword))
    }

    /// One keyword-column query OR-ing `terms`; `None` when it finds nothing.
    async fn keyword_any<S: AsRef<str>>(
        &self,
        terms: &[S],
        date: Option<&str>,
        description: String,
    ) -> Option<ResultGroup> {
        let conditions = terms
            .iter()
            .map(|t| Predicate::contains(Attribute::Keywords, t.as_ref()))
            .collect();
        let query = dated(Predicate::any_of(conditions), date);
        let outcome = self.store.execute(&query).await;
        let records = records_or_empty(&query, outcome);
        (!records.is_empty()).then(|| ResultGroup::new(query, description, records))
    }

    /// Tier 4: random sample, ignoring any date constraint.
    async fn random_sample(&self) -> Result<FallbackResponse> {
        let query = RecordQuery::random(self.config.random_limit);
        let records = self.store.execute(&query).await?;
        let group = ResultGroup::new(query, descriptions::NO_RESULTS, records);
        Ok(FallbackResponse::from_groups(vec![group], FallbackLevel::Random))
    }
}

/// `predicate`, narrowed to `date`'s year when present.
fn dated(predicate: Predicate, date: Option<&str>) -> RecordQuery {
    let filter = match date {
        Some(year) => predicate.and(Predicate::year(year)),
        None => predicate,
    };
    RecordQuery::filtered(filter)
}

fn records_or_empty(query: &RecordQuery, outcome: Result<Vec<Record>>) -> Vec<Record> {
    outcome.unwrap_or_else(|e| {
        warn!(
            subsystem = "search",
            component = "fallback",
            query = %query,
            error = %e,
            "Fallback query failed, treating as empty"
        );
        Vec::new()
    })
}
