// src/ingest/types.rs
use anyhow::Result;

use crate::model::RawItem;
use crate::store::{IngestOutcome, MergeReport};

/// The fetch collaborator: one page of raw items, or a failure.
///
/// Implementations own transport, auth and decoding. The engine only tells
/// "got zero-or-more items" apart from "fetch failed".
#[async_trait::async_trait]
pub trait FeedProvider: Send + Sync {
    async fn fetch_batch(&self) -> Result<Vec<RawItem>>;
    fn name(&self) -> &'static str;
}

/// What a successful fetch cycle did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Provider returned no items; merge skipped.
    EmptyBatch,
    Merged { report: MergeReport, stale: usize },
}

impl From<IngestOutcome> for CycleOutcome {
    fn from(o: IngestOutcome) -> Self {
        match o {
            IngestOutcome::EmptyBatch => CycleOutcome::EmptyBatch,
            IngestOutcome::Merged { report, stale } => CycleOutcome::Merged { report, stale },
        }
    }
}

/// A cycle that did not reach the store. Never fatal to the scheduler.
#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error("fetch from {provider} failed: {source:#}")]
    Fetch {
        provider: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("unexpected failure in ingest cycle: {0}")]
    Unexpected(String),
}
