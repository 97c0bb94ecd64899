// tests/engine.rs
mod common;

use std::sync::Arc;

use common::{engine_with, raw, Step};
use reddit_live_stats::ingest::providers::FixtureProvider;
use reddit_live_stats::ingest::{CycleError, CycleOutcome};
use reddit_live_stats::{AggregationStore, AuthorAggregate, StatsEngine};

#[tokio::test]
async fn single_batch_ranks_authors_by_post_count() {
    let (engine, _, _) = engine_with(vec![Step::Items(vec![
        raw("1", "u1", 10),
        raw("2", "u1", 20),
        raw("3", "u2", 30),
    ])]);
    engine.trigger_fetch_and_merge().await.expect("cycle");

    assert_eq!(
        engine.top_authors(2),
        vec![
            AuthorAggregate {
                author: "u1".into(),
                post_count: 2,
                total_score: 30
            },
            AuthorAggregate {
                author: "u2".into(),
                post_count: 1,
                total_score: 30
            },
        ]
    );
}

#[tokio::test]
async fn remerge_updates_score_without_duplicating() {
    let (engine, store, _) = engine_with(vec![
        Step::Items(vec![raw("1", "u1", 10), raw("2", "u1", 20), raw("3", "u2", 30)]),
        Step::Items(vec![raw("1", "u1", 99)]),
    ]);
    engine.trigger_fetch_and_merge().await.expect("first cycle");
    let first_seen = store.item("1").unwrap().ingested_at;

    let out = engine.trigger_fetch_and_merge().await.expect("second cycle");
    match out {
        CycleOutcome::Merged { report, stale } => {
            assert_eq!(report.updated, 1);
            assert_eq!(report.inserted, 0);
            assert_eq!(stale, 0);
        }
        other => panic!("unexpected outcome {other:?}"),
    }

    let top = engine.top_items(1);
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].id, "1");
    assert_eq!(top[0].score, 99);
    assert_eq!(top[0].ingested_at, first_seen);
    assert_eq!(store.item_count(), 3);
}

#[tokio::test]
async fn failed_fetch_keeps_prior_state() {
    let (engine, store, _) = engine_with(vec![
        Step::Items(vec![raw("1", "u1", 10)]),
        Step::Fail("timeout"),
    ]);
    engine.trigger_fetch_and_merge().await.expect("first cycle");

    let err = engine.trigger_fetch_and_merge().await.unwrap_err();
    assert!(matches!(err, CycleError::Fetch { .. }));
    assert!(err.to_string().contains("timeout"));
    assert_eq!(store.item_count(), 1);
    assert_eq!(store.item("1").unwrap().score, 10);
}

#[tokio::test]
async fn top_items_bounds() {
    let (engine, _, _) = engine_with(vec![Step::Items(vec![
        raw("a", "u1", 1),
        raw("b", "u1", 3),
        raw("c", "u2", 2),
    ])]);
    engine.trigger_fetch_and_merge().await.expect("cycle");

    assert!(engine.top_items(0).is_empty());
    let all = engine.top_items(50);
    assert_eq!(all.len(), 3);
    assert!(all.windows(2).all(|w| w[0].score >= w[1].score));
}

#[tokio::test]
async fn fixture_listing_flows_into_store() {
    let listing = include_str!("fixtures/listing.json");
    let store = Arc::new(AggregationStore::new());
    let engine = StatsEngine::new(
        store.clone(),
        Arc::new(FixtureProvider::from_fixture(listing)),
    );

    engine.trigger_fetch_and_merge().await.expect("cycle");
    // the [deleted] child has no id/author and never reaches the store
    assert_eq!(store.item_count(), 4);
    assert_eq!(store.author_count(), 3);

    let item = store.item("1c9aa3").unwrap();
    assert_eq!(item.score, 30);
    assert!(item.created_at.is_some());

    // the same page again only refreshes scores
    engine.trigger_fetch_and_merge().await.expect("cycle");
    assert_eq!(store.item_count(), 4);

    let authors = engine.top_authors(10);
    assert_eq!(authors[0].author, "u1");
    assert_eq!(authors[0].post_count, 2);
    assert_eq!(authors[1].author, "u2");
}
