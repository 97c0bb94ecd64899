//! # Stats Engine
//! Binds one provider to one store and exposes the surface the HTTP layer
//! and the scheduler drive: a forced fetch+merge cycle and the two rankings.
//!
//! The provider call happens with no store lock held; only the merge that
//! follows takes it.

use std::sync::Arc;

use chrono::Utc;
use metrics::{counter, gauge};
use tracing::{error, info};

use crate::ingest::{self, CycleError, CycleOutcome, FeedProvider};
use crate::model::{AuthorAggregate, Item};
use crate::store::{recency_cutoff, AggregationStore};

#[derive(Clone)]
pub struct StatsEngine {
    store: Arc<AggregationStore>,
    provider: Arc<dyn FeedProvider>,
}

impl StatsEngine {
    pub fn new(store: Arc<AggregationStore>, provider: Arc<dyn FeedProvider>) -> Self {
        Self { store, provider }
    }

    pub fn store(&self) -> &Arc<AggregationStore> {
        &self.store
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Run one fetch → prefilter → merge cycle.
    ///
    /// A failed fetch leaves the store untouched and is returned as
    /// [`CycleError::Fetch`]; it is already logged when this returns.
    pub async fn trigger_fetch_and_merge(&self) -> Result<CycleOutcome, CycleError> {
        ingest::ensure_metrics_described();
        counter!("stats_fetch_cycles_total").increment(1);

        let provider = self.provider.name();
        let batch = match self.provider.fetch_batch().await {
            Ok(batch) => batch,
            Err(source) => {
                error!(target: "ingest", provider, error = %format!("{source:#}"), "fetch failed");
                counter!("stats_fetch_failures_total").increment(1);
                return Err(CycleError::Fetch { provider, source });
            }
        };

        let now = Utc::now();
        let fetched = batch.len();
        let outcome: CycleOutcome = self
            .store
            .ingest_batch_with_prefilter_at(batch, recency_cutoff(now), now)
            .into();

        match outcome {
            CycleOutcome::EmptyBatch => {
                counter!("stats_empty_batches_total").increment(1);
            }
            CycleOutcome::Merged { report, stale } => {
                counter!("stats_items_merged_total")
                    .increment((report.inserted + report.updated) as u64);
                counter!("stats_items_stale_total").increment(stale as u64);
                info!(
                    target: "ingest",
                    provider,
                    fetched,
                    inserted = report.inserted,
                    updated = report.updated,
                    skipped = report.skipped,
                    stale,
                    "processed fetched items"
                );
            }
        }

        ingest::record_store_gauges(&self.store);
        gauge!("stats_last_cycle_ts").set(now.timestamp().max(0) as f64);
        Ok(outcome)
    }

    pub fn top_items(&self, count: usize) -> Vec<Item> {
        let out = self.store.top_items(count);
        info!(target: "engine", requested = count, returned = out.len(), "retrieved top items");
        out
    }

    /// Recomputes every cached author rollup as a side effect.
    pub fn top_authors(&self, count: usize) -> Vec<AuthorAggregate> {
        let out = self.store.top_authors(count);
        info!(target: "engine", requested = count, returned = out.len(), "retrieved top authors");
        out
    }
}
