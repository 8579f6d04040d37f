//! Parameterized SQL rendering of record queries.
//!
//! Converts a [`RecordQuery`] predicate tree into a PostgreSQL statement with
//! `$n` placeholders. Attribute names come from the closed [`Attribute`] enum
//! and every literal is bound as a parameter, so no user text is ever
//! interpolated into the SQL.

use lastro_core::{defaults, Attribute, Predicate, QueryOrder, RecordQuery};

use crate::escape_like;

/// Columns selected for every record query, in [`lastro_core::Record`] order.
pub const RECORD_COLUMNS: &str = "id, link, title, author, category, date, direction, sound, \
     production, support, assistance, research, location, instruments, keywords, info_pool, \
     created_at";

/// Type-safe parameter binding for SQL queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryParam {
    /// Text parameter (LIKE patterns).
    String(String),
    /// Integer parameter (identities, limits).
    Int(i64),
}

/// Generates a complete SELECT statement for a [`RecordQuery`].
///
/// # Example
///
/// ```rust,ignore
/// use lastro_db::{RecordQueryBuilder, QueryParam};
/// use lastro_core::{Attribute, Predicate, RecordQuery};
///
/// let query = RecordQuery::filtered(Predicate::contains(Attribute::Author, "Lima")).excluding(7);
/// let (sql, params) = RecordQueryBuilder::new(&query, 0).build();
/// // sql: "SELECT ... FROM projects WHERE author ILIKE $1 ESCAPE '\' AND id <> $2"
/// // params: [QueryParam::String("%Lima%"), QueryParam::Int(7)]
/// ```
pub struct RecordQueryBuilder<'a> {
    query: &'a RecordQuery,
    param_offset: usize,
}

impl<'a> RecordQueryBuilder<'a> {
    /// Create a builder.
    ///
    /// # Parameters
    ///
    /// * `query` - The query to render
    /// * `param_offset` - Number of parameters already bound before this statement
    pub fn new(query: &'a RecordQuery, param_offset: usize) -> Self {
        Self {
            query,
            param_offset,
        }
    }

    /// Build the statement and its parameters, in placeholder order.
    pub fn build(&self) -> (String, Vec<QueryParam>) {
        let mut params = Vec::new();
        let mut param_idx = self.param_offset;
        let mut clauses = Vec::new();

        if let Some(filter) = &self.query.filter {
            clauses.push(render(filter, &mut param_idx, &mut params));
        }

        if let Some(id) = self.query.exclude_id {
            param_idx += 1;
            clauses.push(format!("id <> ${}", param_idx));
            params.push(QueryParam::Int(id));
        }

        let mut sql = format!(
            "SELECT {} FROM {}",
            RECORD_COLUMNS,
            defaults::RECORDS_TABLE
        );
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        if self.query.order == QueryOrder::Random {
            sql.push_str(" ORDER BY random()");
        }
        if let Some(limit) = self.query.limit {
            param_idx += 1;
            sql.push_str(&format!(" LIMIT ${}", param_idx));
            params.push(QueryParam::Int(limit));
        }

        (sql, params)
    }
}

/// Column expression used for substring matching; dates compare as ISO text.
pub(crate) fn column_expr(attribute: Attribute) -> String {
    if attribute.is_date() {
        "to_char(date, 'YYYY-MM-DD')".to_string()
    } else {
        attribute.column().to_string()
    }
}

fn render(predicate: &Predicate, param_idx: &mut usize, params: &mut Vec<QueryParam>) -> String {
    match predicate {
        Predicate::Contains { attribute, value } => {
            *param_idx += 1;
            params.push(QueryParam::String(format!("%{}%", escape_like(value))));
            format!("{} ILIKE ${} ESCAPE '\\'", column_expr(*attribute), param_idx)
        }
        Predicate::YearPrefix { year } => {
            *param_idx += 1;
            params.push(QueryParam::String(format!("{}-%", escape_like(year))));
            format!(
                "{} LIKE ${} ESCAPE '\\'",
                column_expr(Attribute::Date),
                param_idx
            )
        }
        Predicate::Not(inner) => format!("NOT ({})", render(inner, param_idx, params)),
        Predicate::And(parts) if parts.is_empty() => "TRUE".to_string(),
        Predicate::Or(parts) if parts.is_empty() => "FALSE".to_string(),
        Predicate::And(parts) => join(parts, " AND ", param_idx, params),
        Predicate::Or(parts) => join(parts, " OR ", param_idx, params),
    }
}

fn join(
    parts: &[Predicate],
    separator: &str,
    param_idx: &mut usize,
    params: &mut Vec<QueryParam>,
) -> String {
    let rendered: Vec<String> = parts
        .iter()
        .map(|p| render(p, param_idx, params))
        .collect();
    format!("({})", rendered.join(separator))
}
