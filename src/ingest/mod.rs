// src/ingest/mod.rs
pub mod config;
pub mod providers;
pub mod scheduler;
pub mod types;

use metrics::{describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;

use crate::store::AggregationStore;

pub use types::{CycleError, CycleOutcome, FeedProvider};

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("stats_fetch_cycles_total", "Fetch+merge cycles started.");
        describe_counter!(
            "stats_fetch_failures_total",
            "Cycles aborted because the provider failed."
        );
        describe_counter!(
            "stats_empty_batches_total",
            "Cycles where the provider returned no items."
        );
        describe_counter!(
            "stats_unexpected_failures_total",
            "Cycles aborted by an unexpected failure (panic) in the ingest path."
        );
        describe_counter!(
            "stats_items_merged_total",
            "Items inserted or updated by merge."
        );
        describe_counter!(
            "stats_items_stale_total",
            "Items dropped by the recency prefilter."
        );
        describe_counter!(
            "stats_provider_errors_total",
            "Provider transport/status errors."
        );
        describe_histogram!("stats_fetch_ms", "Provider fetch+parse time in milliseconds.");
        describe_gauge!("stats_items_stored", "Items currently held in the store.");
        describe_gauge!("stats_authors_stored", "Author rollups currently held in the store.");
        describe_gauge!("stats_last_cycle_ts", "Unix ts of the last completed cycle.");
    });
}

pub(crate) fn record_store_gauges(store: &AggregationStore) {
    gauge!("stats_items_stored").set(store.item_count() as f64);
    gauge!("stats_authors_stored").set(store.author_count() as f64);
}
