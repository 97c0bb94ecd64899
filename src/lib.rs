// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod engine;
pub mod ingest;
pub mod metrics;
pub mod model;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::engine::StatsEngine;
pub use crate::ingest::scheduler::{PollingScheduler, SchedulerHandle, SchedulerState};
pub use crate::model::{AuthorAggregate, Item, RawItem};
pub use crate::store::AggregationStore;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the fmt subscriber (compact, or JSON with `STATS_LOG_JSON=1`).
///
/// Uses `try_init`: when the hosting runtime already installed a global
/// subscriber, that one is kept.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("reddit_live_stats=info,warn"));
    let json = std::env::var("STATS_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    let res = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .try_init()
    };
    if res.is_err() {
        tracing::debug!("tracing subscriber already installed; keeping it");
    }
}
