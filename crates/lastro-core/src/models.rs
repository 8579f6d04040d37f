//! Catalogue record model and the result shapes produced by the engines.

use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::filter::RecordQuery;

// =============================================================================
// ATTRIBUTES
// =============================================================================

/// A named, queryable attribute of a catalogue record.
///
/// Replaces dynamic field lookup: every column the engines touch is listed
/// here and resolved through [`Record::text`] / [`Record::has_value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    Title,
    Author,
    Category,
    Date,
    Direction,
    Sound,
    Production,
    Support,
    Assistance,
    Research,
    Location,
    Instruments,
    Keywords,
}

impl Attribute {
    /// Every attribute, in declaration order.
    pub const ALL: [Attribute; 13] = [
        Attribute::Title,
        Attribute::Author,
        Attribute::Category,
        Attribute::Date,
        Attribute::Direction,
        Attribute::Sound,
        Attribute::Production,
        Attribute::Support,
        Attribute::Assistance,
        Attribute::Research,
        Attribute::Location,
        Attribute::Instruments,
        Attribute::Keywords,
    ];

    /// Columns scanned one by one for a single free term, in scan order.
    ///
    /// Excludes the date and keyword columns as well as identity, link,
    /// info pool and timestamp columns, which are not attributes at all.
    pub const SEARCHABLE: [Attribute; 11] = [
        Attribute::Title,
        Attribute::Author,
        Attribute::Category,
        Attribute::Direction,
        Attribute::Sound,
        Attribute::Production,
        Attribute::Support,
        Attribute::Assistance,
        Attribute::Research,
        Attribute::Location,
        Attribute::Instruments,
    ];

    /// Column name in the record store.
    pub fn column(self) -> &'static str {
        match self {
            Attribute::Title => "title",
            Attribute::Author => "author",
            Attribute::Category => "category",
            Attribute::Date => "date",
            Attribute::Direction => "direction",
            Attribute::Sound => "sound",
            Attribute::Production => "production",
            Attribute::Support => "support",
            Attribute::Assistance => "assistance",
            Attribute::Research => "research",
            Attribute::Location => "location",
            Attribute::Instruments => "instruments",
            Attribute::Keywords => "keywords",
        }
    }

    /// Resolve a column name (case-insensitive).
    pub fn from_column(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|a| a.column().eq_ignore_ascii_case(name))
    }

    pub fn is_date(self) -> bool {
        self == Attribute::Date
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

// =============================================================================
// RECORD
// =============================================================================

/// A catalogue entry (an audiovisual project).
///
/// Read-only for the engines; rows are written by the ingestion side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Record {
    pub id: i64,
    pub link: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub category: Option<String>,
    pub date: Option<NaiveDate>,

    // technical credits
    pub direction: Option<String>,
    pub sound: Option<String>,
    pub production: Option<String>,
    pub support: Option<String>,
    pub assistance: Option<String>,
    pub research: Option<String>,

    pub location: Option<String>,
    pub instruments: Option<String>,

    pub keywords: Option<String>,
    pub info_pool: Option<String>,

    pub created_at: Option<DateTime<Utc>>,
}

impl Record {
    pub fn new(id: i64, link: impl Into<String>) -> Self {
        Self {
            id,
            link: link.into(),
            ..Default::default()
        }
    }

    /// Set an attribute from text. Date values are parsed as `YYYY-MM-DD`;
    /// unparsable dates leave the attribute empty.
    pub fn with(mut self, attribute: Attribute, value: impl Into<String>) -> Self {
        let value = value.into();
        let slot = match attribute {
            Attribute::Date => {
                self.date = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok();
                return self;
            }
            Attribute::Title => &mut self.title,
            Attribute::Author => &mut self.author,
            Attribute::Category => &mut self.category,
            Attribute::Direction => &mut self.direction,
            Attribute::Sound => &mut self.sound,
            Attribute::Production => &mut self.production,
            Attribute::Support => &mut self.support,
            Attribute::Assistance => &mut self.assistance,
            Attribute::Research => &mut self.research,
            Attribute::Location => &mut self.location,
            Attribute::Instruments => &mut self.instruments,
            Attribute::Keywords => &mut self.keywords,
        };
        *slot = Some(value);
        self
    }

    /// Raw text of a text attribute; `None` for absent, blank, or date.
    pub fn text(&self, attribute: Attribute) -> Option<&str> {
        let value = match attribute {
            Attribute::Title => &self.title,
            Attribute::Author => &self.author,
            Attribute::Category => &self.category,
            Attribute::Direction => &self.direction,
            Attribute::Sound => &self.sound,
            Attribute::Production => &self.production,
            Attribute::Support => &self.support,
            Attribute::Assistance => &self.assistance,
            Attribute::Research => &self.research,
            Attribute::Location => &self.location,
            Attribute::Instruments => &self.instruments,
            Attribute::Keywords => &self.keywords,
            Attribute::Date => return None,
        };
        value.as_deref().filter(|v| !v.trim().is_empty())
    }

    /// Column value as the store would compare it in a substring match.
    pub fn column_value(&self, attribute: Attribute) -> Option<String> {
        if attribute.is_date() {
            return self.date.map(|d| d.format("%Y-%m-%d").to_string());
        }
        self.text(attribute).map(str::to_string)
    }

    pub fn has_value(&self, attribute: Attribute) -> bool {
        if attribute.is_date() {
            self.date.is_some()
        } else {
            self.text(attribute).is_some()
        }
    }

    /// Four-digit year of the record date, if it can be rendered as one.
    pub fn year(&self) -> Option<String> {
        let year = self.date?.year();
        (0..=9999).contains(&year).then(|| format!("{:04}", year))
    }

    /// Minimal public representation used in response payloads.
    pub fn to_public(&self) -> PublicRecord {
        PublicRecord::from(self)
    }
}

/// Public projection of a [`Record`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicRecord {
    pub id: i64,
    pub link: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instruments: Option<String>,
}

impl From<&Record> for PublicRecord {
    fn from(record: &Record) -> Self {
        Self {
            id: record.id,
            link: record.link.clone(),
            title: record.title.clone(),
            author: record.author.clone(),
            category: record.category.clone(),
            date: record.date.map(|d| d.format("%Y-%m-%d").to_string()),
            location: record.location.clone(),
            instruments: record.instruments.clone(),
        }
    }
}

// =============================================================================
// FALLBACK RESULTS
// =============================================================================

/// Relaxation tier that produced a fallback answer, ordered by breadth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackLevel {
    /// One group per searchable column matching a single free term.
    SingleColumnMultiMatch,
    /// Only the keyword-column match of a single free term survived.
    KeywordMatch,
    /// Words of a single multi-word term OR-joined over keywords.
    SplitWords,
    /// Several free terms OR-joined over keywords.
    MultiTermKeyword,
    /// Unconstrained random sample.
    Random,
}

impl FallbackLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            FallbackLevel::SingleColumnMultiMatch => "single_column_multi_match",
            FallbackLevel::KeywordMatch => "keyword_match",
            FallbackLevel::SplitWords => "split_words",
            FallbackLevel::MultiTermKeyword => "multi_term_keyword",
            FallbackLevel::Random => "random",
        }
    }
}

impl fmt::Display for FallbackLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One relaxation attempt that produced records.
#[derive(Debug, Clone)]
pub struct ResultGroup {
    pub query: RecordQuery,
    pub description: String,
    pub records: Vec<Record>,
}

impl ResultGroup {
    pub fn new(query: RecordQuery, description: impl Into<String>, records: Vec<Record>) -> Self {
        Self {
            query,
            description: description.into(),
            records,
        }
    }
}

/// Answer of the fallback engine, in the caller's column-oriented shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackResponse {
    pub queries: Vec<String>,
    pub descriptions: Vec<String>,
    pub results: Vec<Vec<Record>>,
    pub fallback_level: FallbackLevel,
}

impl FallbackResponse {
    pub fn from_groups(groups: Vec<ResultGroup>, fallback_level: FallbackLevel) -> Self {
        let mut response = Self {
            queries: Vec::with_capacity(groups.len()),
            descriptions: Vec::with_capacity(groups.len()),
            results: Vec::with_capacity(groups.len()),
            fallback_level,
        };
        for group in groups {
            response.queries.push(group.query.to_query_text());
            response.descriptions.push(group.description);
            response.results.push(group.records);
        }
        response
    }

    pub fn group_count(&self) -> usize {
        self.queries.len()
    }
}

// =============================================================================
// SUGGESTIONS
// =============================================================================

/// How a suggestion relates to its reference record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SuggestionKind {
    /// Shares one attribute value.
    Direct { attribute: Attribute },
    /// Matches one attribute while excluding the value of another.
    Disruptive {
        match_attribute: Attribute,
        exclude_attribute: Attribute,
    },
    /// Other entries of the same title series.
    Series,
}

/// A "related items" group for a reference record.
#[derive(Debug, Clone)]
pub struct Suggestion {
    pub kind: SuggestionKind,
    pub description: String,
    pub records: Vec<Record>,
}

impl Suggestion {
    pub fn is_series(&self) -> bool {
        self.kind == SuggestionKind::Series
    }

    /// Convert to the public payload, serializing each record once.
    pub fn into_payload(self) -> SuggestionPayload {
        SuggestionPayload {
            description: self.description,
            projects: self.records.iter().map(PublicRecord::from).collect(),
        }
    }
}

/// Public shape of a suggestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestionPayload {
    pub description: String,
    pub projects: Vec<PublicRecord>,
}
