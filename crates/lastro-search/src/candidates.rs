//! Candidate query construction for "related items" suggestions.
//!
//! Given a reference record and an attribute, builds the query that finds
//! other records sharing that attribute's value, relaxing an exact substring
//! match into a word-level OR when the exact form finds nothing. Every query
//! excludes the reference record itself.

use tracing::{trace, warn};

use lastro_core::{defaults, Attribute, Error, Predicate, Record, RecordQuery, RecordStore};

/// Separator marking a list-valued attribute ("Lisboa, Porto").
pub const LIST_SEPARATOR: &str = ", ";

/// Portuguese function words and forms of "ser"/"estar" ignored when
/// splitting attribute values into words.
pub static STOP_WORDS: &[&str] = &[
    "de", "da", "do", "das", "dos", "e", "a", "o", "as", "os", "em", "no", "na", "nos", "nas",
    "um", "uma", "uns", "umas", "que", "não", "eu", "tu", "ele", "ela", "nós", "vós", "eles",
    "elas", "me", "te", "se", "vos", "meu", "minha", "teu", "tua", "seu", "sua", "este", "esta",
    "esse", "essa", "aquele", "aquela", "com", "sem", "para", "por", "sobre", "sob", "mas",
    "mais", "menos", "muito", "pouco", "já", "ainda", "sempre", "nunca",
    // ser
    "sou", "és", "é", "somos", "sois", "são", "era", "eras", "éramos", "éreis", "eram", "fui",
    "foi", "fomos", "fostes", "foram", "serei", "será", "seremos", "sereis", "serão", "seria",
    "serias", "seríamos", "seríeis", "seriam", "seja", "sejas", "sejamos", "sejais", "sejam",
    "fosse", "fosses", "fôssemos", "fôsseis", "fossem", "for", "fores", "formos", "fordes",
    "forem", "ser", "sendo", "sido",
    // estar
    "estou", "estás", "está", "estamos", "estais", "estão", "estava", "estavas", "estávamos",
    "estáveis", "estavam", "estive", "esteve", "estivemos", "estivestes", "estiveram",
    "estarei", "estará", "estaremos", "estareis", "estarão", "estaria", "estarias",
    "estaríamos", "estaríeis", "estariam", "esteja", "estejas", "estejamos", "estejais",
    "estejam", "estivesse", "estivesses", "estivéssemos", "estivésseis", "estivessem",
    "estiver", "estiveres", "estivermos", "estiverdes", "estiverem", "estar", "estando",
    "estado",
];

pub fn is_stop_word(word: &str) -> bool {
    let lower = word.to_lowercase();
    STOP_WORDS.contains(&lower.as_str())
}

/// Whether `word` carries meaning on its own: longer than the minimum token
/// length and not a stop word.
pub fn is_significant(word: &str) -> bool {
    word.chars().count() > defaults::MIN_TOKEN_LEN && !is_stop_word(word)
}

/// Outcome of evaluating one candidate.
#[derive(Debug)]
pub enum CandidateOutcome {
    /// The query matched at least one record.
    Found {
        query: RecordQuery,
        records: Vec<Record>,
    },
    /// The query ran and matched nothing.
    Empty { query: RecordQuery },
    /// The store failed; treated as no result.
    Failed { query: RecordQuery, error: Error },
    /// No query could be built (absent value or unusable date).
    Unavailable,
}

impl CandidateOutcome {
    fn from_run(query: RecordQuery, outcome: lastro_core::Result<Vec<Record>>) -> Self {
        match outcome {
            Ok(records) if records.is_empty() => CandidateOutcome::Empty { query },
            Ok(records) => CandidateOutcome::Found { query, records },
            Err(error) => CandidateOutcome::Failed { query, error },
        }
    }

    /// The query and its records, when the candidate matched something.
    pub fn into_found(self) -> Option<(RecordQuery, Vec<Record>)> {
        match self {
            CandidateOutcome::Found { query, records } => Some((query, records)),
            _ => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, CandidateOutcome::Found { .. })
    }
}

/// How a match query is obtained for one attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchPlan {
    /// Use this predicate as is.
    Direct(Predicate),
    /// Try `exact` first; if it finds nothing and `split` exists, use `split`.
    Relaxable {
        exact: Predicate,
        split: Option<Predicate>,
    },
}

/// Substring conditions on `attribute`, one per surviving element.
fn any_contains<'v>(attribute: Attribute, values: impl Iterator<Item = &'v str>) -> Option<Predicate> {
    let conditions: Vec<Predicate> = values.map(|v| Predicate::contains(attribute, v)).collect();
    (!conditions.is_empty()).then(|| Predicate::any_of(conditions))
}

/// Plan the match query for `attribute` of `record`, or `None` when the
/// attribute is empty or its date cannot be rendered.
pub fn match_plan(attribute: Attribute, record: &Record) -> Option<MatchPlan> {
    if attribute.is_date() {
        return record.year().map(|y| MatchPlan::Direct(Predicate::year(y)));
    }

    let value = record.text(attribute)?;

    if value.contains(LIST_SEPARATOR) {
        let elements = value
            .split(LIST_SEPARATOR)
            .map(str::trim)
            .filter(|e| !e.is_empty() && is_significant(e));
        let predicate = any_contains(attribute, elements)
            .unwrap_or_else(|| Predicate::contains(attribute, value));
        return Some(MatchPlan::Direct(predicate));
    }

    let words = value.split_whitespace().filter(|w| is_significant(w));
    Some(MatchPlan::Relaxable {
        exact: Predicate::contains(attribute, value),
        split: any_contains(attribute, words),
    })
}

/// Negated condition excluding `record`'s value of `attribute`.
///
/// List values exclude each element; other values exclude the whole value;
/// dates exclude the record's year. `None` when there is nothing to exclude.
pub fn exclusion_predicate(attribute: Attribute, record: &Record) -> Option<Predicate> {
    if attribute.is_date() {
        return record.year().map(|y| Predicate::year(y).negate());
    }

    let value = record.text(attribute)?;
    let negated: Vec<Predicate> = if value.contains(LIST_SEPARATOR) {
        value
            .split(LIST_SEPARATOR)
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(|e| Predicate::contains(attribute, e).negate())
            .collect()
    } else {
        vec![Predicate::contains(attribute, value).negate()]
    };

    (!negated.is_empty()).then(|| Predicate::all_of(negated))
}

/// Builds and runs candidate queries against a record store.
pub struct CandidateQueryBuilder<'a> {
    store: &'a dyn RecordStore,
}

impl<'a> CandidateQueryBuilder<'a> {
    pub fn new(store: &'a dyn RecordStore) -> Self {
        Self { store }
    }

    async fn run(&self, query: RecordQuery) -> CandidateOutcome {
        let result = self.store.execute(&query).await;
        if let Err(ref e) = result {
            warn!(
                subsystem = "search",
                component = "candidates",
                query = %query,
                error = %e,
                "Candidate query failed, treating as no result"
            );
        }
        CandidateOutcome::from_run(query, result)
    }

    /// Build the match query for `attribute` and run it.
    ///
    /// An exact match that finds nothing is relaxed into a word-level OR;
    /// when no significant word exists the empty exact result stands.
    pub async fn build_and_run(&self, attribute: Attribute, record: &Record) -> CandidateOutcome {
        let Some(plan) = match_plan(attribute, record) else {
            trace!(attribute = %attribute, record_id = record.id, "No value to match");
            return CandidateOutcome::Unavailable;
        };

        match plan {
            MatchPlan::Direct(predicate) => {
                self.run(RecordQuery::filtered(predicate).excluding(record.id))
                    .await
            }
            MatchPlan::Relaxable { exact, split } => {
                let outcome = self
                    .run(RecordQuery::filtered(exact).excluding(record.id))
                    .await;
                match (outcome, split) {
                    (CandidateOutcome::Empty { query }, Some(split)) => {
                        trace!(attribute = %attribute, exact = %query, "Exact match empty, splitting words");
                        self.run(RecordQuery::filtered(split).excluding(record.id))
                            .await
                    }
                    (outcome, _) => outcome,
                }
            }
        }
    }

    /// Run the match query for `matched` narrowed by an exclusion on
    /// `excluded`.
    ///
    /// Returns the outcome and whether the exclusion was applied; when the
    /// record has no usable value for `excluded` the bare match outcome is
    /// returned.
    pub async fn build_and_run_excluding(
        &self,
        matched: Attribute,
        excluded: Attribute,
        record: &Record,
    ) -> (CandidateOutcome, bool) {
        let (query, records) = match self.build_and_run(matched, record).await {
            CandidateOutcome::Found { query, records } => (query, records),
            other => return (other, false),
        };

        match exclusion_predicate(excluded, record) {
            Some(exclusion) => (self.run(query.and_filter(exclusion)).await, true),
            None => (CandidateOutcome::Found { query, records }, false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> Record {
        Record::new(10, "v/10")
            .with(Attribute::Author, "Carlos Lima")
            .with(Attribute::Location, "Lisboa, Porto, de")
            .with(Attribute::Instruments, "de, a")
            .with(Attribute::Category, "de")
            .with(Attribute::Date, "2019-06-01")
    }

    #[test]
    fn test_stop_words_are_case_insensitive() {
        assert!(is_stop_word("De"));
        assert!(is_stop_word("ESTÁ"));
        assert!(!is_stop_word("fado"));
        assert!(!is_significant("Lx"));
        assert!(is_significant("Lima"));
    }

    #[test]
    fn test_absent_value_has_no_plan() {
        assert_eq!(match_plan(Attribute::Title, &record()), None);
        assert_eq!(exclusion_predicate(Attribute::Title, &record()), None);
    }

    #[test]
    fn test_date_plan_is_year_prefix() {
        assert_eq!(
            match_plan(Attribute::Date, &record()),
            Some(MatchPlan::Direct(Predicate::year("2019")))
        );
        assert_eq!(
            exclusion_predicate(Attribute::Date, &record()),
            Some(Predicate::year("2019").negate())
        );
    }

    #[test]
    fn test_list_value_filters_insignificant_elements() {
        let expected = Predicate::any_of(vec![
            Predicate::contains(Attribute::Location, "Lisboa"),
            Predicate::contains(Attribute::Location, "Porto"),
        ]);
        assert_eq!(
            match_plan(Attribute::Location, &record()),
            Some(MatchPlan::Direct(expected))
        );
    }

    #[test]
    fn test_list_value_with_no_survivors_uses_whole_value() {
        assert_eq!(
            match_plan(Attribute::Instruments, &record()),
            Some(MatchPlan::Direct(Predicate::contains(
                Attribute::Instruments,
                "de, a"
            )))
        );
    }

    #[test]
    fn test_plain_value_is_relaxable() {
        let plan = match_plan(Attribute::Author, &record()).unwrap();
        assert_eq!(
            plan,
            MatchPlan::Relaxable {
                exact: Predicate::contains(Attribute::Author, "Carlos Lima"),
                split: Some(Predicate::any_of(vec![
                    Predicate::contains(Attribute::Author, "Carlos"),
                    Predicate::contains(Attribute::Author, "Lima"),
                ])),
            }
        );
    }

    #[test]
    fn test_plain_value_without_significant_words() {
        let plan = match_plan(Attribute::Category, &record()).unwrap();
        assert_eq!(
            plan,
            MatchPlan::Relaxable {
                exact: Predicate::contains(Attribute::Category, "de"),
                split: None,
            }
        );
    }

    #[test]
    fn test_list_exclusion_negates_every_element() {
        let predicate = exclusion_predicate(Attribute::Location, &record()).unwrap();
        assert_eq!(
            predicate,
            Predicate::And(vec![
                Predicate::contains(Attribute::Location, "Lisboa").negate(),
                Predicate::contains(Attribute::Location, "Porto").negate(),
                Predicate::contains(Attribute::Location, "de").negate(),
            ])
        );
    }

    #[test]
    fn test_plain_exclusion_negates_whole_value() {
        assert_eq!(
            exclusion_predicate(Attribute::Author, &record()),
            Some(Predicate::contains(Attribute::Author, "Carlos Lima").negate())
        );
    }
}
