//! # lastro-core
//!
//! Core types, traits, and abstractions for the lastro catalogue search.
//!
//! This crate provides the record model, the predicate-tree query builder
//! shared by the fallback engine and the suggestion sampler, and the
//! collaborator traits (record store, query translator) that the other
//! lastro crates depend on.

pub mod defaults;
pub mod error;
pub mod filter;
pub mod logging;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use filter::{Predicate, QueryOrder, RecordQuery};
pub use logging::{init_tracing, LogConfig, LogFormat};
pub use models::*;
pub use traits::*;
