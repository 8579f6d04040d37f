//! Parsing of the translator's line-oriented output.
//!
//! The translator answers with `DESC:` and `QUERY:` lines; anything else is
//! ignored.

use serde::{Deserialize, Serialize};

const QUERY_PREFIX: &str = "QUERY:";
const DESC_PREFIX: &str = "DESC:";

/// Queries and descriptions read from translator output, in output order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedQueries {
    pub queries: Vec<String>,
    pub descriptions: Vec<String>,
}

impl ParsedQueries {
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }
}

/// Read `QUERY:` and `DESC:` lines; every query is terminated with `;`.
pub fn parse_model_output(text: &str) -> ParsedQueries {
    let mut parsed = ParsedQueries::default();

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(query) = line.strip_prefix(QUERY_PREFIX) {
            let mut query = query.trim().to_string();
            if !query.ends_with(';') {
                query.push(';');
            }
            parsed.queries.push(query);
        } else if let Some(description) = line.strip_prefix(DESC_PREFIX) {
            parsed.descriptions.push(description.trim().to_string());
        }
    }

    parsed
}
