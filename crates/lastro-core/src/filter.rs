//! Predicate-tree query builder.
//!
//! Every query the engines issue is a [`RecordQuery`]: an optional predicate
//! tree over record attributes, an optional identity exclusion, an ordering
//! and a limit. Store implementations render it at the boundary (parameterized
//! SQL in `lastro-db`, in-process evaluation in the memory store), and
//! [`RecordQuery::to_query_text`] produces the canonical text reported to
//! callers.
//!
//! Predicates follow SQL NULL semantics: a condition on an absent attribute is
//! unknown, so neither `title LIKE '%x%'` nor `title NOT LIKE '%x%'` matches a
//! record without a title.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::defaults;
use crate::models::{Attribute, Record};

/// A node of the filter tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Predicate {
    /// Case-insensitive substring match on one attribute.
    Contains { attribute: Attribute, value: String },
    /// Record date falls in the given four-digit year.
    YearPrefix { year: String },
    Not(Box<Predicate>),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

impl Predicate {
    pub fn contains(attribute: Attribute, value: impl Into<String>) -> Self {
        Predicate::Contains {
            attribute,
            value: value.into(),
        }
    }

    pub fn year(year: impl Into<String>) -> Self {
        Predicate::YearPrefix { year: year.into() }
    }

    pub fn negate(self) -> Self {
        Predicate::Not(Box::new(self))
    }

    /// OR over `predicates`; a single predicate is returned unchanged.
    pub fn any_of(mut predicates: Vec<Predicate>) -> Self {
        if predicates.len() == 1 {
            return predicates.remove(0);
        }
        Predicate::Or(predicates)
    }

    /// AND over `predicates`; a single predicate is returned unchanged.
    pub fn all_of(mut predicates: Vec<Predicate>) -> Self {
        if predicates.len() == 1 {
            return predicates.remove(0);
        }
        Predicate::And(predicates)
    }

    /// Conjunction with `other`, flattening nested ANDs.
    pub fn and(self, other: Predicate) -> Self {
        let mut parts = match self {
            Predicate::And(parts) => parts,
            single => vec![single],
        };
        match other {
            Predicate::And(more) => parts.extend(more),
            single => parts.push(single),
        }
        Predicate::And(parts)
    }

    /// Three-valued evaluation: `None` stands for SQL NULL (unknown).
    pub fn eval(&self, record: &Record) -> Option<bool> {
        match self {
            Predicate::Contains { attribute, value } => {
                let haystack = record.column_value(*attribute)?;
                Some(haystack.to_lowercase().contains(&value.to_lowercase()))
            }
            Predicate::YearPrefix { year } => {
                let date = record.column_value(Attribute::Date)?;
                Some(date.starts_with(&format!("{}-", year)))
            }
            Predicate::Not(inner) => inner.eval(record).map(|b| !b),
            Predicate::And(parts) => {
                let mut unknown = false;
                for part in parts {
                    match part.eval(record) {
                        Some(false) => return Some(false),
                        None => unknown = true,
                        Some(true) => {}
                    }
                }
                if unknown {
                    None
                } else {
                    Some(true)
                }
            }
            Predicate::Or(parts) => {
                let mut unknown = false;
                for part in parts {
                    match part.eval(record) {
                        Some(true) => return Some(true),
                        None => unknown = true,
                        Some(false) => {}
                    }
                }
                if unknown {
                    None
                } else {
                    Some(false)
                }
            }
        }
    }

    /// True only when the predicate definitely holds for `record`.
    pub fn matches(&self, record: &Record) -> bool {
        self.eval(record) == Some(true)
    }

    fn render(&self, out: &mut String, nested: bool) {
        match self {
            Predicate::Contains { attribute, value } => {
                out.push_str(&format!("{} LIKE '%{}%'", attribute, quote(value)));
            }
            Predicate::YearPrefix { year } => {
                out.push_str(&format!("{} LIKE '{}-%'", Attribute::Date, quote(year)));
            }
            Predicate::Not(inner) => match inner.as_ref() {
                Predicate::Contains { attribute, value } => {
                    out.push_str(&format!("{} NOT LIKE '%{}%'", attribute, quote(value)));
                }
                Predicate::YearPrefix { year } => {
                    out.push_str(&format!(
                        "{} NOT LIKE '{}-%'",
                        Attribute::Date,
                        quote(year)
                    ));
                }
                other => {
                    out.push_str("NOT (");
                    other.render(out, false);
                    out.push(')');
                }
            },
            Predicate::And(parts) if parts.is_empty() => out.push_str("TRUE"),
            Predicate::Or(parts) if parts.is_empty() => out.push_str("FALSE"),
            Predicate::And(parts) => {
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        out.push_str(" AND ");
                    }
                    part.render(out, true);
                }
            }
            Predicate::Or(parts) => {
                if nested {
                    out.push('(');
                }
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        out.push_str(" OR ");
                    }
                    part.render(out, true);
                }
                if nested {
                    out.push(')');
                }
            }
        }
    }
}

fn quote(value: &str) -> String {
    value.replace('\'', "''")
}

/// Result ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryOrder {
    /// Whatever order the store returns.
    #[default]
    Natural,
    Random,
}

/// A complete read query against the records table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct RecordQuery {
    pub filter: Option<Predicate>,
    /// Identity of a reference record that must not appear in the results.
    pub exclude_id: Option<i64>,
    pub order: QueryOrder,
    pub limit: Option<i64>,
}

impl RecordQuery {
    pub fn filtered(predicate: Predicate) -> Self {
        Self {
            filter: Some(predicate),
            ..Default::default()
        }
    }

    /// Unconstrained random sample of `limit` records.
    pub fn random(limit: i64) -> Self {
        Self {
            order: QueryOrder::Random,
            limit: Some(limit),
            ..Default::default()
        }
    }

    pub fn excluding(mut self, id: i64) -> Self {
        self.exclude_id = Some(id);
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// AND an extra condition into the filter.
    pub fn and_filter(mut self, predicate: Predicate) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
        self
    }

    /// Whether `record` satisfies the filter and identity exclusion.
    ///
    /// Ordering and limit are not considered.
    pub fn matches(&self, record: &Record) -> bool {
        if self.exclude_id == Some(record.id) {
            return false;
        }
        self.filter.as_ref().map_or(true, |p| p.matches(record))
    }

    /// Canonical textual form, e.g.
    /// `SELECT * FROM projects WHERE category LIKE '%fado%' AND id != 7;`
    pub fn to_query_text(&self) -> String {
        let mut out = format!("SELECT * FROM {}", defaults::RECORDS_TABLE);
        let mut has_where = false;

        if let Some(filter) = &self.filter {
            out.push_str(" WHERE ");
            filter.render(&mut out, self.exclude_id.is_some());
            has_where = true;
        }
        if let Some(id) = self.exclude_id {
            out.push_str(if has_where { " AND " } else { " WHERE " });
            out.push_str(&format!("id != {}", id));
        }
        if self.order == QueryOrder::Random {
            out.push_str(" ORDER BY RANDOM()");
        }
        if let Some(limit) = self.limit {
            out.push_str(&format!(" LIMIT {}", limit));
        }
        out.push(';');
        out
    }
}

impl fmt::Display for RecordQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_query_text())
    }
}
