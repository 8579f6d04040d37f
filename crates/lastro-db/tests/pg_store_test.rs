//! PostgreSQL record store integration tests.
//!
//! Require a running database (`DATABASE_URL` or the default test URL);
//! run with `cargo test -p lastro-db -- --ignored`.

use lastro_db::test_fixtures::{TestDatabase, DEFAULT_TEST_DATABASE_URL};
use lastro_db::{Attribute, Database, Error, Predicate, Record, RecordQuery, RecordStore};

fn catalogue() -> Vec<Record> {
    vec![
        Record::new(1, "https://video/1")
            .with(Attribute::Title, "Fado de Coimbra")
            .with(Attribute::Category, "Fado")
            .with(Attribute::Date, "2023-03-01"),
        Record::new(2, "https://video/2")
            .with(Attribute::Title, "Improvisação 1")
            .with(Attribute::Author, "Carlos Lima")
            .with(Attribute::Category, "fado vadio")
            .with(Attribute::Date, "2021-11-20"),
        Record::new(3, "https://video/3")
            .with(Attribute::Title, "100% Jazz")
            .with(Attribute::Category, "Jazz"),
    ]
}

async fn setup() -> TestDatabase {
    dotenvy::dotenv().ok();
    let db = TestDatabase::new().await;
    db.insert_all(&catalogue()).await;
    db
}

fn ids(records: &[Record]) -> Vec<i64> {
    let mut ids: Vec<i64> = records.iter().map(|r| r.id).collect();
    ids.sort();
    ids
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_substring_match_is_case_insensitive() {
    let db = setup().await;

    let query = RecordQuery::filtered(Predicate::contains(Attribute::Category, "FADO"));
    let records = db.store.execute(&query).await.expect("query failed");
    assert_eq!(ids(&records), vec![1, 2]);

    db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_like_wildcards_in_terms_are_literal() {
    let db = setup().await;

    let query = RecordQuery::filtered(Predicate::contains(Attribute::Title, "100%"));
    let records = db.store.execute(&query).await.expect("query failed");
    assert_eq!(ids(&records), vec![3]);

    let query = RecordQuery::filtered(Predicate::contains(Attribute::Title, "_"));
    let records = db.store.execute(&query).await.expect("query failed");
    assert!(records.is_empty());

    db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_year_prefix_and_exclusion() {
    let db = setup().await;

    let query = RecordQuery::filtered(
        Predicate::contains(Attribute::Category, "fado").and(Predicate::year("2023").negate()),
    );
    let records = db.store.execute(&query).await.expect("query failed");
    assert_eq!(ids(&records), vec![2]);

    let query = RecordQuery::filtered(Predicate::contains(Attribute::Category, "fado")).excluding(2);
    let records = db.store.execute(&query).await.expect("query failed");
    assert_eq!(ids(&records), vec![1]);

    db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_negation_skips_null_attributes() {
    let db = setup().await;

    // record 3 has no author, so the negated match is unknown for it
    let query = RecordQuery::filtered(Predicate::contains(Attribute::Author, "Lima").negate());
    let records = db.store.execute(&query).await.expect("query failed");
    assert!(records.is_empty());

    db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_random_sample_limit() {
    let db = setup().await;

    let records = db
        .store
        .execute(&RecordQuery::random(2))
        .await
        .expect("query failed");
    assert_eq!(records.len(), 2);

    db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_raw_select_runs_read_only() {
    let db = setup().await;

    let records = db
        .store
        .execute_raw("SELECT * FROM projects WHERE title LIKE '%Coimbra%';")
        .await
        .expect("raw query failed");
    assert_eq!(ids(&records), vec![1]);

    let rejected = db.store.execute_raw("DELETE FROM projects;").await;
    assert!(matches!(rejected, Err(Error::Query(_))));

    db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_raw_translated_like_matches_case_and_years() {
    let db = setup().await;

    let records = db
        .store
        .execute_raw("SELECT * FROM projects WHERE author LIKE '%carlos%';")
        .await
        .expect("raw query failed");
    assert_eq!(ids(&records), vec![2]);

    let records = db
        .store
        .execute_raw("SELECT * FROM projects WHERE category LIKE '%fado%' AND date LIKE '%2023%';")
        .await
        .expect("raw query failed");
    assert_eq!(ids(&records), vec![1]);

    // canonical fallback text goes through the same path
    let records = db
        .store
        .execute_raw("SELECT * FROM projects WHERE category LIKE '%fado%' AND date NOT LIKE '2023-%';")
        .await
        .expect("raw query failed");
    assert_eq!(ids(&records), vec![2]);

    db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_batch_outcomes_are_independent() {
    let db = setup().await;

    let outcomes = db
        .store
        .execute_raw_batch(&[
            "SELECT * FROM projects WHERE category LIKE '%Jazz%';".to_string(),
            "SELECT * FROM missing_table;".to_string(),
        ])
        .await;
    assert_eq!(outcomes.len(), 2);
    assert!(outcomes[0].is_ok());
    assert!(matches!(outcomes[1], Err(Error::Database(_))));

    db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_connect_from_env_uses_database_url() {
    dotenvy::dotenv().ok();
    if std::env::var("DATABASE_URL").is_err() {
        std::env::set_var("DATABASE_URL", DEFAULT_TEST_DATABASE_URL);
    }

    let db = Database::connect_from_env().await.expect("connect failed");
    let (one,): (i32,) = sqlx::query_as("SELECT 1")
        .fetch_one(db.pool())
        .await
        .expect("query failed");
    assert_eq!(one, 1);
}
