// src/model.rs
//! Data entities shared by the store, the providers and the HTTP layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single submission as aggregated by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Stable external id; the dedup key.
    pub id: String,
    pub title: String,
    pub author: String,
    /// Current upvote count, overwritten on every re-ingestion.
    pub score: i64,
    /// Time of first successful merge of this id. Never changes afterwards.
    pub ingested_at: DateTime<Utc>,
    /// Creation time reported by the feed, carried through untouched.
    pub created_at: Option<DateTime<Utc>>,
}

/// Per-author rollup over the recency window.
///
/// Fields are always a recount from the stored items, never accumulated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorAggregate {
    pub author: String,
    pub post_count: u64,
    pub total_score: i64,
}

impl AuthorAggregate {
    pub fn new(author: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            post_count: 0,
            total_score: 0,
        }
    }
}

/// A submission as handed over by a provider, before it is merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawItem {
    pub id: String,
    pub title: String,
    pub author: String,
    pub score: i64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Stamped by the provider when the page was fetched. `None` means "now".
    #[serde(default)]
    pub fetched_at: Option<DateTime<Utc>>,
}

impl RawItem {
    pub fn new(
        id: impl Into<String>,
        author: impl Into<String>,
        title: impl Into<String>,
        score: i64,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            author: author.into(),
            score,
            created_at: None,
            fetched_at: None,
        }
    }

    /// Records missing an id or an author cannot be keyed and are skipped on merge.
    pub fn is_malformed(&self) -> bool {
        self.id.trim().is_empty() || self.author.trim().is_empty()
    }
}
