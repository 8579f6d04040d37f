//! Search term recovery from structured query text.
//!
//! Scans `column LIKE '%term%'` clauses of a failed query to find out what the
//! user was looking for. Unparseable text simply yields no terms.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use lastro_core::Attribute;

/// One substring-match clause: optional column, optional NOT, quoted literal.
static LIKE_CLAUSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)(?:([A-Za-z_][\w."]*)\s+)?(NOT\s+)?I?LIKE\s+(?:'((?:[^']|'')*)'|"([^"]*)")"#,
    )
    .expect("LIKE clause regex is valid")
});

/// Four-digit year at the start of a date-column pattern (`%2023%`, `2023-%`).
static DATE_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^%?(\d{4})").expect("date literal regex is valid"));

static BARE_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}$").expect("bare year regex is valid"));

/// Terms recovered from one or more queries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedTerms {
    /// Free terms, first occurrence order, without duplicates.
    pub terms: Vec<String>,
    /// Year constraint, if any.
    pub date_term: Option<String>,
    pub has_date_filter: bool,
}

impl ExtractedTerms {
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty() && self.date_term.is_none()
    }

    fn push_term(&mut self, term: &str) {
        if !self.terms.iter().any(|t| t == term) {
            self.terms.push(term.to_string());
        }
    }

    fn set_date(&mut self, year: String) {
        self.date_term = Some(year);
        self.has_date_filter = true;
    }
}

/// Bare column name of a possibly qualified or quoted identifier.
fn column_name(raw: &str) -> &str {
    raw.rsplit('.').next().unwrap_or(raw).trim_matches('"')
}

/// Extract free terms and the year constraint from one query.
///
/// Negated clauses contribute nothing. Date-column literals only feed the
/// year constraint. A bare four-digit term elsewhere is never a free term;
/// it becomes the year constraint when no date-column literal is present.
pub fn extract_terms(query: &str) -> ExtractedTerms {
    let mut extracted = ExtractedTerms::default();
    let mut bare_year: Option<String> = None;

    for caps in LIKE_CLAUSE.captures_iter(query) {
        let column = caps.get(1).map(|m| column_name(m.as_str()));
        // an unparsed column expression leaves NOT in the column slot
        let negated = caps.get(2).is_some()
            || column.is_some_and(|c| c.eq_ignore_ascii_case("not"));
        if negated {
            continue;
        }

        let literal = match (caps.get(3), caps.get(4)) {
            (Some(single), _) => single.as_str().replace("''", "'"),
            (None, Some(double)) => double.as_str().to_string(),
            (None, None) => continue,
        };

        let is_date_column = column
            .and_then(Attribute::from_column)
            .is_some_and(Attribute::is_date);
        if is_date_column {
            if let Some(year) = DATE_LITERAL.captures(&literal).and_then(|c| c.get(1)) {
                extracted.set_date(year.as_str().to_string());
            }
            continue;
        }

        let Some(term) = literal
            .strip_prefix('%')
            .and_then(|rest| rest.strip_suffix('%'))
            .filter(|inner| !inner.contains('%'))
            .map(str::trim)
            .filter(|inner| !inner.is_empty())
        else {
            continue;
        };

        if BARE_YEAR.is_match(term) {
            bare_year.get_or_insert_with(|| term.to_string());
        } else {
            extracted.push_term(term);
        }
    }

    if extracted.date_term.is_none() {
        if let Some(year) = bare_year {
            extracted.set_date(year);
        }
    }

    extracted
}

/// Union of [`extract_terms`] over several queries.
///
/// Terms keep first-seen order across queries; the last query carrying a
/// year constraint wins.
pub fn extract_terms_from_queries<S: AsRef<str>>(queries: &[S]) -> ExtractedTerms {
    let mut combined = ExtractedTerms::default();
    for query in queries {
        let extracted = extract_terms(query.as_ref());
        for term in &extracted.terms {
            combined.push_term(term);
        }
        if let Some(year) = extracted.date_term {
            combined.set_date(year);
        }
    }
    combined
}
