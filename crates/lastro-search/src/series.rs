//! Title-series collapsing.
//!
//! Serialized entries ("Improvisação 1", "Improvisação 2", "Canções" vs
//! "Canção") share a normalized title. The collapser finds the other entries
//! of a reference record's series so they can be offered as one group.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use lastro_core::{defaults, Attribute, Predicate, Record, RecordQuery, RecordStore};

/// Trailing "(...)" or "[...]" variant marker.
static TRAILING_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s*(?:\([^()]*\)|\[[^\[\]]*\])\s*$").expect("marker regex is valid")
});

/// Trailing cardinal number preceded by whitespace.
static TRAILING_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+\d+\s*$").expect("number regex is valid"));

/// Trailing lower-case Roman numeral (1 to 39) preceded by whitespace.
static TRAILING_ROMAN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s+x{0,3}(?:ix|iv|v?i{0,3})\s*$").expect("roman regex is valid")
});

static ROMAN_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?i)x{0,3}(?:ix|iv|v?i{0,3})$").expect("roman token regex is valid")
});

/// Quote marks and punctuation replaced by spaces.
const PUNCTUATION: &[char] = &[
    '"', '\'', '“', '”', '‘', '’', '«', '»', '`', '´', ',', '.', ';', ':', '!', '?', '¡', '¿',
    '-', '–', '—', '/', '\\', '|', '_', '*', '#',
];

/// Portuguese plural endings and their singular replacement, most specific first.
const PLURAL_RULES: &[(&str, &str)] = &[
    ("oes", "ao"),
    ("aes", "ao"),
    ("ais", "al"),
    ("eis", "el"),
    ("ois", "ol"),
    ("is", "il"),
    ("ns", "m"),
];

fn strip_diacritics(text: &str) -> String {
    text.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

fn singularize(word: &str) -> String {
    if word.chars().count() <= 3 {
        return word.to_string();
    }
    for (suffix, replacement) in PLURAL_RULES {
        if let Some(stem) = word.strip_suffix(suffix) {
            return format!("{}{}", stem, replacement);
        }
    }
    match word.strip_suffix('s') {
        Some(stem) if !stem.ends_with('s') => stem.to_string(),
        _ => word.to_string(),
    }
}

/// Normalize a title to its series base form.
pub fn normalize_title(title: &str) -> String {
    let mut text = strip_diacritics(&title.to_lowercase());
    text = TRAILING_MARKER.replace(&text, "").into_owned();
    text = text.replace(PUNCTUATION, " ");
    text = TRAILING_NUMBER.replace(&text, "").into_owned();
    // the roman pattern also matches bare whitespace; only strip real numerals
    if let Some(m) = TRAILING_ROMAN.find(&text) {
        if !m.as_str().trim().is_empty() {
            text.truncate(m.start());
        }
    }

    text.split_whitespace()
        .map(singularize)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether two titles belong to the same series.
pub fn same_series(a: &str, b: &str) -> bool {
    normalize_title(a) == normalize_title(b)
}

/// Title tokens worth searching for: longer than the minimum token length,
/// a Roman numeral, or a number.
pub fn significant_tokens(title: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    for token in title.split(|c: char| !c.is_alphanumeric()) {
        if token.is_empty() {
            continue;
        }
        let keep = token.chars().count() > defaults::MIN_TOKEN_LEN
            || ROMAN_TOKEN.is_match(token)
            || token.chars().all(|c| c.is_ascii_digit());
        if keep && !tokens.iter().any(|t| t == token) {
            tokens.push(token.to_string());
        }
    }
    tokens
}

/// Naive singular/plural counterpart of an alphabetic token.
fn plural_variant(token: &str) -> Option<String> {
    if !token.chars().any(char::is_alphabetic) {
        return None;
    }
    match token.strip_suffix('s').or_else(|| token.strip_suffix('S')) {
        Some(stem) if !stem.is_empty() => Some(stem.to_string()),
        Some(_) => None,
        None => Some(format!("{}s", token)),
    }
}

/// Query over the title column for any significant token of `record`'s
/// title or its plural variant, excluding `record` itself.
pub fn series_query(record: &Record) -> Option<RecordQuery> {
    let title = record.text(Attribute::Title)?;
    let mut patterns: Vec<String> = Vec::new();
    for token in significant_tokens(title) {
        let variant = plural_variant(&token);
        for pattern in std::iter::once(token).chain(variant) {
            if !patterns.contains(&pattern) {
                patterns.push(pattern);
            }
        }
    }
    if patterns.is_empty() {
        return None;
    }

    let conditions = patterns
        .into_iter()
        .map(|p| Predicate::contains(Attribute::Title, p))
        .collect();
    Some(RecordQuery::filtered(Predicate::any_of(conditions)).excluding(record.id))
}

/// Other entries of `record`'s title series, or `None` when there are none.
pub async fn find_series(store: &dyn RecordStore, record: &Record) -> Option<Vec<Record>> {
    let title = record.text(Attribute::Title)?;
    let base = normalize_title(title);
    if base.is_empty() {
        return None;
    }
    let query = series_query(record)?;

    let candidates = match store.execute(&query).await {
        Ok(records) => records,
        Err(e) => {
            warn!(
                subsystem = "search",
                component = "series",
                record_id = record.id,
                error = %e,
                "Series query failed, skipping series group"
            );
            return None;
        }
    };

    let candidate_count = candidates.len();
    let mates: Vec<Record> = candidates
        .into_iter()
        .filter(|c| c.id != record.id)
        .filter(|c| {
            c.text(Attribute::Title)
                .is_some_and(|t| normalize_title(t) == base)
        })
        .collect();

    debug!(
        subsystem = "search",
        component = "series",
        record_id = record.id,
        series_base = %base,
        candidate_count,
        result_count = mates.len(),
        "Series candidates filtered"
    );

    (!mates.is_empty()).then_some(mates)
}
