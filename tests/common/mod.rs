// tests/common/mod.rs
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use reddit_live_stats::ingest::FeedProvider;
use reddit_live_stats::{AggregationStore, RawItem, StatsEngine};

pub enum Step {
    Items(Vec<RawItem>),
    Fail(&'static str),
    Panic,
    /// Return the items after sleeping, to simulate a slow network call.
    Slow(Duration, Vec<RawItem>),
}

/// Replays queued steps in order; an exhausted script returns empty pages.
pub struct ScriptedProvider {
    steps: Mutex<VecDeque<Step>>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedProvider for ScriptedProvider {
    async fn fetch_batch(&self) -> Result<Vec<RawItem>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self.steps.lock().unwrap().pop_front();
        match step {
            None => Ok(Vec::new()),
            Some(Step::Items(items)) => Ok(items),
            Some(Step::Fail(msg)) => Err(anyhow!(msg)),
            Some(Step::Panic) => panic!("scripted provider panic"),
            Some(Step::Slow(d, items)) => {
                tokio::time::sleep(d).await;
                Ok(items)
            }
        }
    }

    fn name(&self) -> &'static str {
        "Scripted"
    }
}

pub fn raw(id: &str, author: &str, score: i64) -> RawItem {
    RawItem::new(id, author, format!("post {id}"), score)
}

pub fn engine_with(steps: Vec<Step>) -> (StatsEngine, Arc<AggregationStore>, Arc<ScriptedProvider>) {
    let store = Arc::new(AggregationStore::new());
    let provider = Arc::new(ScriptedProvider::new(steps));
    let engine = StatsEngine::new(store.clone(), provider.clone());
    (engine, store, provider)
}

/// Poll `cond` until it holds or `timeout` elapses.
pub async fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    cond()
}
