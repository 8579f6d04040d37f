//! Request-level orchestration: prompt search and record suggestions.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use lastro_core::{
    FallbackLevel, QueryTranslator, Record, RecordStore, Result, SuggestionPayload,
};

use crate::config::{FallbackConfig, SamplerConfig};
use crate::fallback::FallbackEngine;
use crate::model_output::parse_model_output;
use crate::sampler::SuggestionSampler;

/// Answer to a free-text prompt.
///
/// `fallback_level` is set only when the translated queries found nothing
/// and the fallback engine produced the groups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub queries: Vec<String>,
    pub descriptions: Vec<String>,
    pub results: Vec<Vec<Record>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_level: Option<FallbackLevel>,
}

impl SearchResponse {
    pub fn is_fallback(&self) -> bool {
        self.fallback_level.is_some()
    }
}

/// Catalogue search service: translation, fallback, and suggestions over one
/// record store.
pub struct CatalogueSearch {
    translator: Arc<dyn QueryTranslator>,
    store: Arc<dyn RecordStore>,
    fallback: FallbackEngine,
    sampler: SuggestionSampler,
}

impl CatalogueSearch {
    pub fn new(
        translator: Arc<dyn QueryTranslator>,
        store: Arc<dyn RecordStore>,
        fallback_config: FallbackConfig,
        sampler_config: SamplerConfig,
    ) -> Self {
        Self {
            fallback: FallbackEngine::new(store.clone(), fallback_config),
            sampler: SuggestionSampler::new(store.clone(), sampler_config),
            translator,
            store,
        }
    }

    /// Service configured from environment variables.
    pub fn from_env(translator: Arc<dyn QueryTranslator>, store: Arc<dyn RecordStore>) -> Self {
        Self::new(
            translator,
            store,
            FallbackConfig::from_env(),
            SamplerConfig::from_env(),
        )
    }

    pub fn fallback(&self) -> &FallbackEngine {
        &self.fallback
    }

    pub fn sampler(&self) -> &SuggestionSampler {
        &self.sampler
    }

    /// Translate `prompt`, run the resulting queries, and fall back when
    /// every one of them comes back empty.
    ///
    /// Translation errors are returned; individual query failures count as
    /// empty results.
    #[instrument(skip(self, prompt, previous_prompts), fields(
        subsystem = "search",
        component = "catalogue",
        op = "handle_prompt",
        previous_count = previous_prompts.len(),
    ))]
    pub async fn handle_prompt(
        &self,
        prompt: &str,
        previous_prompts: &[String],
    ) -> Result<SearchResponse> {
        let start = Instant::now();
        let output = self.translator.translate(prompt, previous_prompts).await?;
        let parsed = parse_model_output(&output);
        debug!(query_count = parsed.queries.len(), "Translator output parsed");

        let outcomes = self.store.execute_raw_batch(&parsed.queries).await;
        let results: Vec<Vec<Record>> = parsed
            .queries
            .iter()
            .zip(outcomes)
            .map(|(query, outcome)| {
                outcome.unwrap_or_else(|e| {
                    warn!(query = %query, error = %e, "Translated query failed, treating as empty");
                    Vec::new()
                })
            })
            .collect();

        if results.iter().any(|r| !r.is_empty()) {
            info!(
                result_count = results.iter().map(Vec::len).sum::<usize>(),
                duration_ms = start.elapsed().as_millis() as u64,
                "Prompt answered by translated queries"
            );
            return Ok(SearchResponse {
                queries: parsed.queries,
                descriptions: parsed.descriptions,
                results,
                fallback_level: None,
            });
        }

        let fallback = self.fallback.apply_fallback(&parsed.queries).await?;
        info!(
            fallback_level = %fallback.fallback_level,
            duration_ms = start.elapsed().as_millis() as u64,
            "Prompt answered by fallback"
        );
        Ok(SearchResponse {
            queries: fallback.queries,
            descriptions: fallback.descriptions,
            results: fallback.results,
            fallback_level: Some(fallback.fallback_level),
        })
    }

    /// Suggestions for `record` in their public shape.
    pub async fn suggestions(&self, record: &Record) -> Vec<SuggestionPayload> {
        self.sampler
            .get_suggestions(record)
            .await
            .into_iter()
            .map(|s| s.into_payload())
            .collect()
    }
}
