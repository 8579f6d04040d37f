//! # lastro-search
//!
//! Query fallback and suggestion sampling for the lastro catalogue.
//!
//! This crate provides:
//! - Search term recovery from failed structured queries
//! - A tiered fallback engine that relaxes a query until it finds records
//! - Candidate queries and weighted concurrent sampling for "related items"
//! - Title-series detection for serialized entries
//! - Prompt orchestration over an external query translator

pub mod candidates;
pub mod config;
pub mod dedup;
pub mod descriptions;
pub mod extraction;
pub mod fallback;
pub mod model_output;
pub mod sampler;
pub mod series;
pub mod service;

// Re-export core types
pub use lastro_core::*;

pub use candidates::{CandidateOutcome, CandidateQueryBuilder, MatchPlan};
pub use config::{
    DirectOption, DisruptiveOption, FallbackConfig, SamplerConfig, DIRECT_OPTIONS,
    DISRUPTIVE_OPTIONS,
};
pub use dedup::is_duplicate;
pub use extraction::{extract_terms, extract_terms_from_queries, ExtractedTerms};
pub use fallback::FallbackEngine;
pub use model_output::{parse_model_output, ParsedQueries};
pub use sampler::{weighted_sample, SuggestionSampler};
pub use series::{find_series, normalize_title, same_series};
pub use service::{CatalogueSearch, SearchResponse};
