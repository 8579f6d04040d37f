//! "Related items" suggestions for a reference record.
//!
//! Three independent branches run concurrently for each request:
//! - direct: records sharing one attribute value, picked by weighted
//!   sampling without replacement;
//! - disruptive: records matching one attribute while excluding the value of
//!   another, picked uniformly;
//! - series: other entries of the record's title series.
//!
//! Every branch fans its candidate queries out concurrently. A failed
//! candidate counts as no result and never aborts its siblings.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::{thread_rng, Rng};
use tracing::{debug, info, instrument};

use lastro_core::{Record, RecordStore, Suggestion, SuggestionKind};

use crate::candidates::CandidateQueryBuilder;
use crate::config::{DirectOption, DisruptiveOption, SamplerConfig};
use crate::descriptions;
use crate::series::find_series;

/// Picks up to `count` items without replacement, each draw proportional to
/// the remaining weights.
///
/// When every remaining weight is zero the draw is uniform.
pub fn weighted_sample<T, R: Rng + ?Sized>(
    rng: &mut R,
    mut pool: Vec<(T, u32)>,
    count: usize,
) -> Vec<T> {
    let mut picked = Vec::with_capacity(count.min(pool.len()));
    while picked.len() < count && !pool.is_empty() {
        let index = match WeightedIndex::new(pool.iter().map(|(_, weight)| *weight)) {
            Ok(dist) => dist.sample(rng),
            Err(_) => rng.gen_range(0..pool.len()),
        };
        picked.push(pool.swap_remove(index).0);
    }
    picked
}

/// Direct options worth evaluating for `record`: attributes with a value,
/// heaviest first, at most `pool_size` of them.
pub fn direct_candidates(
    options: &[DirectOption],
    record: &Record,
    pool_size: usize,
) -> Vec<DirectOption> {
    let mut candidates: Vec<DirectOption> = options
        .iter()
        .filter(|o| record.has_value(o.attribute))
        .copied()
        .collect();
    candidates.sort_by(|a, b| b.weight.cmp(&a.weight));
    candidates.truncate(pool_size);
    candidates
}

/// Disruptive options worth evaluating for `record`: pairs whose match
/// attribute has a value, shuffled, at most `pool_size` of them.
pub fn disruptive_candidates<R: Rng + ?Sized>(
    rng: &mut R,
    options: &[DisruptiveOption],
    record: &Record,
    pool_size: usize,
) -> Vec<DisruptiveOption> {
    let mut candidates: Vec<DisruptiveOption> = options
        .iter()
        .filter(|o| record.has_value(o.match_attribute))
        .copied()
        .collect();
    candidates.shuffle(rng);
    candidates.truncate(pool_size);
    candidates
}

/// A disruptive candidate that found records.
#[derive(Debug, Clone)]
pub struct DisruptiveHit {
    pub option: DisruptiveOption,
    /// Whether the exclusion narrowed the query.
    pub excluded: bool,
    pub records: Vec<Record>,
}

fn pick_direct<R: Rng + ?Sized>(
    rng: &mut R,
    hits: Vec<(DirectOption, Vec<Record>)>,
    count: usize,
) -> Vec<Suggestion> {
    let pool = hits
        .into_iter()
        .map(|(option, records)| ((option.attribute, records), option.weight))
        .collect();
    weighted_sample(rng, pool, count)
        .into_iter()
        .map(|(attribute, records)| Suggestion {
            kind: SuggestionKind::Direct { attribute },
            description: descriptions::describe_direct(rng, attribute),
            records,
        })
        .collect()
}

fn pick_disruptive<R: Rng + ?Sized>(
    rng: &mut R,
    hits: Vec<DisruptiveHit>,
    count: usize,
) -> Vec<Suggestion> {
    let mut seen = HashSet::new();
    let mut unique: Vec<DisruptiveHit> = hits
        .into_iter()
        .filter(|hit| seen.insert(hit.option))
        .collect();
    unique.shuffle(rng);
    unique.truncate(count);

    unique
        .into_iter()
        .map(|hit| {
            let DisruptiveOption {
                match_attribute,
                exclude_attribute,
            } = hit.option;
            if hit.excluded {
                Suggestion {
                    kind: SuggestionKind::Disruptive {
                        match_attribute,
                        exclude_attribute,
                    },
                    description: descriptions::describe_disruptive(
                        rng,
                        match_attribute,
                        exclude_attribute,
                    ),
                    records: hit.records,
                }
            } else {
                Suggestion {
                    kind: SuggestionKind::Direct {
                        attribute: match_attribute,
                    },
                    description: descriptions::describe_direct(rng, match_attribute),
                    records: hit.records,
                }
            }
        })
        .collect()
}

/// Final ordering: records of each suggestion shuffled, suggestions shuffled,
/// the series group (if any) pinned first.
pub fn arrange<R: Rng + ?Sized>(
    rng: &mut R,
    mut suggestions: Vec<Suggestion>,
    series: Option<Suggestion>,
) -> Vec<Suggestion> {
    suggestions.shuffle(rng);
    if let Some(series) = series {
        suggestions.insert(0, series);
    }
    for suggestion in &mut suggestions {
        suggestion.records.shuffle(rng);
    }
    suggestions
}

/// Samples suggestion groups for reference records.
pub struct SuggestionSampler {
    store: Arc<dyn RecordStore>,
    config: SamplerConfig,
}

impl SuggestionSampler {
    pub fn new(store: Arc<dyn RecordStore>, config: SamplerConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// Direct suggestions, at most one per attribute.
    pub async fn get_direct(&self, record: &Record) -> Vec<Suggestion> {
        let candidates =
            direct_candidates(self.config.direct_options, record, self.config.direct_pool_size());
        let builder = CandidateQueryBuilder::new(self.store.as_ref());

        let outcomes = join_all(
            candidates
                .iter()
                .map(|option| builder.build_and_run(option.attribute, record)),
        )
        .await;

        let hits: Vec<(DirectOption, Vec<Record>)> = candidates
            .into_iter()
            .zip(outcomes)
            .filter_map(|(option, outcome)| outcome.into_found().map(|(_, records)| (option, records)))
            .collect();
        debug!(
            subsystem = "search",
            component = "sampler",
            record_id = record.id,
            candidate_count = hits.len(),
            "Direct candidates evaluated"
        );

        pick_direct(&mut thread_rng(), hits, self.config.direct_count)
    }

    /// Disruptive suggestions, at most one per (match, exclude) pair.
    pub async fn get_disruptive(&self, record: &Record) -> Vec<Suggestion> {
        let candidates = disruptive_candidates(
            &mut thread_rng(),
            self.config.disruptive_options,
            record,
            self.config.disruptive_pool_size(),
        );
        let builder = CandidateQueryBuilder::new(self.store.as_ref());

        let outcomes = join_all(candidates.iter().map(|option| {
            builder.build_and_run_excluding(option.match_attribute, option.exclude_attribute, record)
        }))
        .await;

        let hits: Vec<DisruptiveHit> = candidates
            .into_iter()
            .zip(outcomes)
            .filter_map(|(option, (outcome, excluded))| {
                outcome.into_found().map(|(_, records)| DisruptiveHit {
                    option,
                    excluded,
                    records,
                })
            })
            .collect();
        debug!(
            subsystem = "search",
            component = "sampler",
            record_id = record.id,
            candidate_count = hits.len(),
            "Disruptive candidates evaluated"
        );

        pick_disruptive(&mut thread_rng(), hits, self.config.disruptive_count)
    }

    /// The record's title series, if it has one.
    pub async fn get_series(&self, record: &Record) -> Option<Suggestion> {
        let records = find_series(self.store.as_ref(), record).await?;
        Some(Suggestion {
            kind: SuggestionKind::Series,
            description: descriptions::describe_series(&mut thread_rng()),
            records,
        })
    }

    /// All suggestions for `record`, series group first.
    ///
    /// An empty list is a valid answer when no candidate found anything.
    #[instrument(skip(self, record), fields(
        subsystem = "search",
        component = "sampler",
        op = "get_suggestions",
        record_id = record.id,
    ))]
    pub async fn get_suggestions(&self, record: &Record) -> Vec<Suggestion> {
        let start = Instant::now();
        let (mut direct, disruptive, series) = tokio::join!(
            self.get_direct(record),
            self.get_disruptive(record),
            self.get_series(record)
        );
        direct.extend(disruptive);

        let suggestions = arrange(&mut thread_rng(), direct, series);
        info!(
            result_count = suggestions.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Suggestions sampled"
        );
        suggestions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lastro_core::Attribute;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::config::{DIRECT_OPTIONS, DISRUPTIVE_OPTIONS};

    fn records(ids: &[i64]) -> Vec<Record> {
        ids.iter().map(|id| Record::new(*id, format!("v/{}", id))).collect()
    }

    #[test]
    fn test_weighted_sample_is_without_replacement() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            let picked = weighted_sample(&mut rng, vec![(1, 5), (2, 90), (3, 50), (4, 1)], 3);
            assert_eq!(picked.len(), 3);
            let unique: HashSet<_> = picked.iter().collect();
            assert_eq!(unique.len(), 3);
        }
    }

    #[test]
    fn test_weighted_sample_exhausts_small_pool() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut picked = weighted_sample(&mut rng, vec![("a", 1), ("b", 2)], 5);
        picked.sort_unstable();
        assert_eq!(picked, vec!["a", "b"]);
    }

    #[test]
    fn test_weighted_sample_all_zero_weights() {
        let mut rng = StdRng::seed_from_u64(2);
        let picked = weighted_sample(&mut rng, vec![(1, 0), (2, 0), (3, 0)], 2);
        assert_eq!(picked.len(), 2);
    }

    #[test]
    fn test_weighted_sample_never_picks_zero_weight_first() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            let picked = weighted_sample(&mut rng, vec![("never", 0), ("always", 10)], 1);
            assert_eq!(picked, vec!["always"]);
        }
    }

    #[test]
    fn test_weighted_sample_favours_heavy_items() {
        let mut rng = StdRng::seed_from_u64(4);
        let heavy = (0..1000)
            .filter(|_| weighted_sample(&mut rng, vec![("light", 1), ("heavy", 99)], 1) == ["heavy"])
            .count();
        assert!(heavy > 900, "heavy picked {} times", heavy);
    }

    #[test]
    fn test_direct_candidates_ranked_and_filtered() {
        let record = Record::new(1, "v/1")
            .with(Attribute::Sound, "Rui")
            .with(Attribute::Author, "Carlos Lima")
            .with(Attribute::Keywords, "fado")
            .with(Attribute::Research, "Ana");

        let candidates = direct_candidates(&DIRECT_OPTIONS, &record, 3);
        let attributes: Vec<Attribute> = candidates.iter().map(|o| o.attribute).collect();
        assert_eq!(
            attributes,
            vec![Attribute::Author, Attribute::Keywords, Attribute::Sound]
        );
    }

    #[test]
    fn test_disruptive_candidates_need_match_value() {
        let mut rng = StdRng::seed_from_u64(5);
        let record = Record::new(1, "v/1").with(Attribute::Category, "fado");
        let candidates = disruptive_candidates(&mut rng, &DISRUPTIVE_OPTIONS, &record, 6);
        assert_eq!(candidates.len(), 3);
        assert!(candidates
            .iter()
            .all(|o| o.match_attribute == Attribute::Category));
    }

    #[test]
    fn test_pick_disruptive_dedups_pairs_and_falls_back_to_direct() {
        let mut rng = StdRng::seed_from_u64(6);
        let pair = DISRUPTIVE_OPTIONS[0];
        let hits = vec![
            DisruptiveHit {
                option: pair,
                excluded: false,
                records: records(&[1]),
            },
            DisruptiveHit {
                option: pair,
                excluded: true,
                records: records(&[2]),
            },
        ];

        let picked = pick_disruptive(&mut rng, hits, 2);
        assert_eq!(picked.len(), 1);
        assert_eq!(
            picked[0].kind,
            SuggestionKind::Direct {
                attribute: pair.match_attribute
            }
        );
    }

    #[test]
    fn test_arrange_pins_series_first() {
        let mut rng = StdRng::seed_from_u64(8);
        let direct = |attribute| Suggestion {
            kind: SuggestionKind::Direct { attribute },
            description: "d".to_string(),
            records: records(&[1, 2, 3]),
        };
        let series = Suggestion {
            kind: SuggestionKind::Series,
            description: "s".to_string(),
            records: records(&[7, 8]),
        };

        for _ in 0..20 {
            let arranged = arrange(
                &mut rng,
                vec![direct(Attribute::Author), direct(Attribute::Category)],
                Some(series.clone()),
            );
            assert_eq!(arranged.len(), 3);
            assert!(arranged[0].is_series());
            assert!(arranged[1..].iter().all(|s| !s.is_series()));
        }
    }
}
