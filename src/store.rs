// src/store.rs
//! # Aggregation Store
//! In-memory, deduplicated aggregate of fetched submissions and their authors.
//!
//! All state sits behind one mutex. Reads are not pure: `top_authors`
//! rewrites the cached author rollups from the current recency window, so
//! every operation (read or write) takes the same lock.
//!
//! Items are keyed by `id` and never deleted. `ingested_at` is stamped on
//! first merge and drives the recency window; on re-merge only `score`
//! changes. Author rollups are created on first sight and never removed.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Months, Utc};
use tracing::{debug, warn};

use crate::model::{AuthorAggregate, Item, RawItem};

/// Length of the recency window in calendar months.
pub const RECENCY_WINDOW_MONTHS: u32 = 1;

/// `now` minus one calendar month (Mar 31 → Feb 28/29, not a fixed 30 days).
pub fn recency_cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
    now.checked_sub_months(Months::new(RECENCY_WINDOW_MONTHS))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Per-batch bookkeeping returned by [`AggregationStore::merge`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
}

/// Result of the prefiltered ingest entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The provider returned nothing; merge was not attempted.
    EmptyBatch,
    /// `stale` items were dropped by the prefilter, the rest were merged.
    Merged { report: MergeReport, stale: usize },
}

#[derive(Debug, Default)]
struct Inner {
    /// Insertion order is the implicit tie-break for equal scores.
    items: Vec<Item>,
    by_id: HashMap<String, usize>,
    authors: Vec<AuthorAggregate>,
    by_author: HashMap<String, usize>,
}

#[derive(Debug, Default)]
pub struct AggregationStore {
    inner: Mutex<Inner>,
}

impl AggregationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every mutation under the lock is a push or a field write, so a
    /// poisoned guard still holds consistent data.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            warn!(target: "store", "store mutex poisoned; recovering");
            poisoned.into_inner()
        })
    }

    pub fn merge(&self, batch: Vec<RawItem>) -> MergeReport {
        self.merge_at(batch, Utc::now())
    }

    /// Fold `batch` into the store, stamping new ids with `now`.
    ///
    /// Known ids only get their score overwritten and recount the author the
    /// stored item belongs to. Every touched author ends up with a recount over
    /// all of that author's stored items (unwindowed; the window is applied at
    /// query time).
    pub fn merge_at(&self, batch: Vec<RawItem>, now: DateTime<Utc>) -> MergeReport {
        let mut report = MergeReport::default();
        let mut guard = self.lock();
        let inner = &mut *guard;
        let mut touched: HashSet<String> = HashSet::new();

        for raw in batch {
            if raw.is_malformed() {
                warn!(target: "store", id = %raw.id, author = %raw.author, "skipping malformed item");
                report.skipped += 1;
                continue;
            }

            let known = inner.by_id.get(&raw.id).copied();
            match known {
                Some(idx) => {
                    // The stored item keeps its original author even if the
                    // listing now reports another one (e.g. "[deleted]").
                    let item = &mut inner.items[idx];
                    item.score = raw.score;
                    touched.insert(item.author.clone());
                    report.updated += 1;
                }
                None => {
                    if !inner.by_author.contains_key(&raw.author) {
                        inner
                            .by_author
                            .insert(raw.author.clone(), inner.authors.len());
                        inner.authors.push(AuthorAggregate::new(raw.author.clone()));
                    }
                    touched.insert(raw.author.clone());

                    inner.by_id.insert(raw.id.clone(), inner.items.len());
                    inner.items.push(Item {
                        id: raw.id,
                        title: raw.title,
                        author: raw.author,
                        score: raw.score,
                        ingested_at: now,
                        created_at: raw.created_at,
                    });
                    report.inserted += 1;
                }
            }
        }

        // A brand-new author recounts to (1, score), so one pass covers both
        // the create and the update path.
        let tallies = tally(inner.items.iter(), |it| touched.contains(&it.author));
        for author in &touched {
            if let Some(&idx) = inner.by_author.get(author) {
                let (count, total) = tallies.get(author.as_str()).copied().unwrap_or((0, 0));
                let agg = &mut inner.authors[idx];
                agg.post_count = count;
                agg.total_score = total;
            }
        }

        debug!(
            target: "store",
            inserted = report.inserted,
            updated = report.updated,
            skipped = report.skipped,
            items = inner.items.len(),
            authors = inner.authors.len(),
            "merged batch"
        );
        report
    }

    pub fn ingest_batch_with_prefilter(
        &self,
        batch: Vec<RawItem>,
        cutoff: DateTime<Utc>,
    ) -> IngestOutcome {
        self.ingest_batch_with_prefilter_at(batch, cutoff, Utc::now())
    }

    /// Drop items fetched before `cutoff`, then merge the rest.
    ///
    /// Items without a fetch stamp count as fetched at `now`. An empty batch
    /// skips the merge entirely.
    pub fn ingest_batch_with_prefilter_at(
        &self,
        batch: Vec<RawItem>,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> IngestOutcome {
        if batch.is_empty() {
            warn!(target: "ingest", "no items fetched");
            return IngestOutcome::EmptyBatch;
        }

        let total = batch.len();
        let fresh: Vec<RawItem> = batch
            .into_iter()
            .filter(|raw| raw.fetched_at.unwrap_or(now) >= cutoff)
            .collect();
        let stale = total - fresh.len();
        if stale > 0 {
            debug!(target: "ingest", stale, "dropped items older than cutoff");
        }

        let report = self.merge_at(fresh, now);
        IngestOutcome::Merged { report, stale }
    }

    pub fn top_items(&self, count: usize) -> Vec<Item> {
        self.top_items_at(count, Utc::now())
    }

    /// Highest-scoring items ingested within the month before `now`.
    /// Equal scores keep insertion order.
    pub fn top_items_at(&self, count: usize, now: DateTime<Utc>) -> Vec<Item> {
        if count == 0 {
            return Vec::new();
        }
        let cutoff = recency_cutoff(now);
        let guard = self.lock();

        let mut windowed: Vec<Item> = guard
            .items
            .iter()
            .filter(|it| it.ingested_at >= cutoff)
            .cloned()
            .collect();
        drop(guard);

        windowed.sort_by(|a, b| b.score.cmp(&a.score));
        windowed.truncate(count);
        windowed
    }

    pub fn top_authors(&self, count: usize) -> Vec<AuthorAggregate> {
        self.top_authors_at(count, Utc::now())
    }

    /// Rematerialize every author rollup from the window ending at `now`,
    /// then rank by post count, then total score.
    ///
    /// This is a write: the stored rollups keep the recomputed values,
    /// including zeros for authors with nothing left in the window.
    pub fn top_authors_at(&self, count: usize, now: DateTime<Utc>) -> Vec<AuthorAggregate> {
        let cutoff = recency_cutoff(now);
        let mut guard = self.lock();
        let inner = &mut *guard;

        let tallies = tally(inner.items.iter(), |it| it.ingested_at >= cutoff);
        for agg in inner.authors.iter_mut() {
            let (count, total) = tallies.get(agg.author.as_str()).copied().unwrap_or((0, 0));
            agg.post_count = count;
            agg.total_score = total;
        }

        if count == 0 {
            return Vec::new();
        }

        let mut ranked = inner.authors.clone();
        drop(guard);

        ranked.sort_by(|a, b| {
            b.post_count
                .cmp(&a.post_count)
                .then_with(|| b.total_score.cmp(&a.total_score))
        });
        ranked.truncate(count);
        ranked
    }

    pub fn item(&self, id: &str) -> Option<Item> {
        let guard = self.lock();
        guard.by_id.get(id).map(|&idx| guard.items[idx].clone())
    }

    /// Cached rollup as of the last merge or `top_authors` call.
    pub fn author(&self, author: &str) -> Option<AuthorAggregate> {
        let guard = self.lock();
        guard
            .by_author
            .get(author)
            .map(|&idx| guard.authors[idx].clone())
    }

    pub fn item_count(&self) -> usize {
        self.lock().items.len()
    }

    pub fn author_count(&self) -> usize {
        self.lock().authors.len()
    }
}

/// `(post_count, total_score)` per author over the items accepted by `keep`.
fn tally<'a>(
    items: impl Iterator<Item = &'a Item>,
    keep: impl Fn(&Item) -> bool,
) -> HashMap<&'a str, (u64, i64)> {
    let mut out: HashMap<&'a str, (u64, i64)> = HashMap::new();
    for it in items.filter(|it| keep(it)) {
        let e = out.entry(it.author.as_str()).or_insert((0, 0));
        e.0 += 1;
        e.1 = e.1.saturating_add(it.score);
    }
    out
}
