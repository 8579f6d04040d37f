//! Candidate builder and suggestion sampler tests against the in-memory store.

use std::collections::HashSet;
use std::sync::Arc;

use lastro_db::MemoryRecordStore;
use lastro_search::{
    Attribute, CandidateOutcome, CandidateQueryBuilder, DisruptiveOption, Predicate, Record,
    SamplerConfig, SuggestionKind, SuggestionSampler,
};

static AUTHOR_NOT_CATEGORY: [DisruptiveOption; 1] = [DisruptiveOption {
    match_attribute: Attribute::Author,
    exclude_attribute: Attribute::Category,
}];

static AUTHOR_NOT_CATEGORY_OR_LOCATION: [DisruptiveOption; 2] = [
    DisruptiveOption {
        match_attribute: Attribute::Author,
        exclude_attribute: Attribute::Category,
    },
    DisruptiveOption {
        match_attribute: Attribute::Author,
        exclude_attribute: Attribute::Location,
    },
];

/// Whether `predicate` negates a condition on `attribute` anywhere.
fn negates(predicate: &Predicate, attribute: Attribute) -> bool {
    match predicate {
        Predicate::Not(inner) => matches!(
            inner.as_ref(),
            Predicate::Contains { attribute: a, .. } if *a == attribute
        ),
        Predicate::And(parts) | Predicate::Or(parts) => {
            parts.iter().any(|p| negates(p, attribute))
        }
        _ => false,
    }
}

fn reference() -> Record {
    Record::new(1, "v/1")
        .with(Attribute::Title, "Improvisação 1")
        .with(Attribute::Author, "Carlos Lima")
        .with(Attribute::Category, "Fado")
        .with(Attribute::Location, "Lisboa, Porto")
        .with(Attribute::Instruments, "guitarra portuguesa")
        .with(Attribute::Date, "2021-03-04")
        .with(Attribute::Keywords, "fado")
}

fn catalogue() -> Vec<Record> {
    vec![
        reference(),
        Record::new(2, "v/2")
            .with(Attribute::Title, "Improvisação 2")
            .with(Attribute::Author, "Lima Barreto")
            .with(Attribute::Category, "Jazz"),
        Record::new(3, "v/3")
            .with(Attribute::Title, "Improvisação (ao vivo)")
            .with(Attribute::Category, "Fado")
            .with(Attribute::Location, "Porto"),
        Record::new(4, "v/4")
            .with(Attribute::Title, "Cantiga")
            .with(Attribute::Instruments, "guitarra portuguesa, viola")
            .with(Attribute::Date, "2021-10-10"),
        Record::new(5, "v/5")
            .with(Attribute::Title, "Noite")
            .with(Attribute::Author, "Carlos Lima")
            .with(Attribute::Category, "Fado")
            .with(Attribute::Keywords, "fado, noite"),
    ]
}

fn sampler(store: &Arc<MemoryRecordStore>, config: SamplerConfig) -> SuggestionSampler {
    SuggestionSampler::new(store.clone(), config)
}

fn ids(records: &[Record]) -> Vec<i64> {
    let mut ids: Vec<i64> = records.iter().map(|r| r.id).collect();
    ids.sort_unstable();
    ids
}

#[tokio::test]
async fn test_author_exact_match_relaxes_to_word_split() {
    let reference = Record::new(1, "v/1").with(Attribute::Author, "Carlos Lima");
    let store = MemoryRecordStore::new(vec![
        reference.clone(),
        Record::new(2, "v/2").with(Attribute::Author, "Lima Barreto"),
        Record::new(3, "v/3").with(Attribute::Author, "Ana Moura"),
    ]);
    let builder = CandidateQueryBuilder::new(&store);

    let outcome = builder.build_and_run(Attribute::Author, &reference).await;

    let (query, records) = outcome.into_found().expect("split query should match");
    assert_eq!(ids(&records), vec![2]);
    assert_eq!(
        query.filter,
        Some(Predicate::any_of(vec![
            Predicate::contains(Attribute::Author, "Carlos"),
            Predicate::contains(Attribute::Author, "Lima"),
        ]))
    );
    assert_eq!(query.exclude_id, Some(1));
    assert_eq!(store.execution_count(), 2);
}

#[tokio::test]
async fn test_exact_match_is_kept_when_it_finds_records() {
    let store = MemoryRecordStore::new(catalogue());
    let builder = CandidateQueryBuilder::new(&store);

    let outcome = builder.build_and_run(Attribute::Author, &reference()).await;

    let (query, records) = outcome.into_found().expect("exact query should match");
    assert_eq!(ids(&records), vec![5]);
    assert_eq!(
        query.filter,
        Some(Predicate::contains(Attribute::Author, "Carlos Lima"))
    );
    assert_eq!(store.execution_count(), 1);
}

#[tokio::test]
async fn test_missing_value_is_unavailable() {
    let store = MemoryRecordStore::new(catalogue());
    let builder = CandidateQueryBuilder::new(&store);

    let outcome = builder
        .build_and_run(Attribute::Research, &reference())
        .await;

    assert!(matches!(outcome, CandidateOutcome::Unavailable));
    assert_eq!(store.execution_count(), 0);
}

#[tokio::test]
async fn test_direct_suggestions_use_each_attribute_once() {
    let store = Arc::new(MemoryRecordStore::new(catalogue()));
    let sampler = sampler(&store, SamplerConfig::default());

    for _ in 0..20 {
        let suggestions = sampler.get_direct(&reference()).await;
        assert!(!suggestions.is_empty());
        assert!(suggestions.len() <= 3);

        let attributes: HashSet<SuggestionKind> = suggestions.iter().map(|s| s.kind).collect();
        assert_eq!(attributes.len(), suggestions.len());
        for suggestion in &suggestions {
            assert!(matches!(suggestion.kind, SuggestionKind::Direct { .. }));
            assert!(!suggestion.records.is_empty());
            assert!(suggestion.records.iter().all(|r| r.id != 1));
            assert!(!suggestion.description.is_empty());
        }
    }
}

#[tokio::test]
async fn test_direct_candidate_failure_is_isolated() {
    let store = Arc::new(MemoryRecordStore::new(catalogue()).fail_on_attribute(Attribute::Author));
    let sampler = sampler(&store, SamplerConfig::default());

    let suggestions = sampler.get_direct(&reference()).await;

    assert!(!suggestions.is_empty());
    assert!(suggestions
        .iter()
        .all(|s| s.kind != SuggestionKind::Direct { attribute: Attribute::Author }));
}

#[tokio::test]
async fn test_disruptive_excludes_the_other_attribute() {
    let store = Arc::new(MemoryRecordStore::new(catalogue()));
    let config = SamplerConfig::default()
        .with_disruptive_options(&AUTHOR_NOT_CATEGORY)
        .with_disruptive_count(1);
    let sampler = sampler(&store, config);

    let mut reference = reference();
    reference.author = Some("Lima".to_string());

    let suggestions = sampler.get_disruptive(&reference).await;

    assert_eq!(suggestions.len(), 1);
    assert_eq!(
        suggestions[0].kind,
        SuggestionKind::Disruptive {
            match_attribute: Attribute::Author,
            exclude_attribute: Attribute::Category,
        }
    );
    // record 5 shares the author but also the category
    assert_eq!(ids(&suggestions[0].records), vec![2]);
}

#[tokio::test]
async fn test_disruptive_exclusion_failure_is_isolated() {
    let mut records = catalogue();
    records[1].location = Some("Coimbra".to_string());
    records[4].location = Some("Lisboa".to_string());
    let store = Arc::new(MemoryRecordStore::new(records).fail_when(|query| {
        query
            .filter
            .as_ref()
            .is_some_and(|p| negates(p, Attribute::Category))
    }));
    let config = SamplerConfig::default()
        .with_disruptive_options(&AUTHOR_NOT_CATEGORY_OR_LOCATION)
        .with_disruptive_count(2);
    let sampler = sampler(&store, config);

    let mut reference = reference();
    reference.author = Some("Lima".to_string());

    let suggestions = sampler.get_disruptive(&reference).await;

    assert_eq!(suggestions.len(), 1);
    assert_eq!(
        suggestions[0].kind,
        SuggestionKind::Disruptive {
            match_attribute: Attribute::Author,
            exclude_attribute: Attribute::Location,
        }
    );
    // record 5 is in Lisboa, one of the reference locations
    assert_eq!(ids(&suggestions[0].records), vec![2]);
}

#[tokio::test]
async fn test_disruptive_without_exclude_value_uses_bare_match() {
    let store = Arc::new(MemoryRecordStore::new(catalogue()));
    let config = SamplerConfig::default().with_disruptive_options(&AUTHOR_NOT_CATEGORY);
    let sampler = sampler(&store, config);

    let reference = Record::new(9, "v/9").with(Attribute::Author, "Carlos Lima");

    let suggestions = sampler.get_disruptive(&reference).await;

    assert_eq!(suggestions.len(), 1);
    assert_eq!(
        suggestions[0].kind,
        SuggestionKind::Direct {
            attribute: Attribute::Author
        }
    );
    assert_eq!(ids(&suggestions[0].records), vec![1, 5]);
}

#[tokio::test]
async fn test_series_group_is_pinned_first() {
    let store = Arc::new(MemoryRecordStore::new(catalogue()));
    let sampler = sampler(&store, SamplerConfig::default());

    for _ in 0..10 {
        let suggestions = sampler.get_suggestions(&reference()).await;

        assert!(suggestions[0].is_series());
        assert_eq!(ids(&suggestions[0].records), vec![2, 3]);
        assert_eq!(suggestions.iter().filter(|s| s.is_series()).count(), 1);
        assert!(suggestions
            .iter()
            .all(|s| s.records.iter().all(|r| r.id != 1)));
    }
}

#[tokio::test]
async fn test_lonely_record_has_no_suggestions() {
    let lonely = Record::new(1, "v/1")
        .with(Attribute::Title, "Único")
        .with(Attribute::Author, "Ninguém");
    let store = Arc::new(MemoryRecordStore::new(vec![lonely.clone()]));
    let sampler = sampler(&store, SamplerConfig::default());

    assert!(sampler.get_suggestions(&lonely).await.is_empty());
}
