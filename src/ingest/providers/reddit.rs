// src/ingest/providers/reddit.rs
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use metrics::{counter, histogram};
use serde::Deserialize;

use crate::ingest::config::StatsConfig;
use crate::ingest::types::FeedProvider;
use crate::model::RawItem;

// Listing envelope: {"data":{"children":[{"data":{...}}]}}
#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: Post,
}

#[derive(Debug, Deserialize)]
struct Post {
    id: Option<String>,
    title: Option<String>,
    author: Option<String>,
    ups: Option<i64>,
    created_utc: Option<f64>,
}

fn unix_to_utc(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    Utc.timestamp_opt(secs.trunc() as i64, 0).single()
}

/// Decode a subreddit listing page. Every item is stamped with `fetched_at`.
///
/// Children without an id or author are dropped here; everything else is
/// passed through as-is.
pub fn parse_listing(body: &str, fetched_at: DateTime<Utc>) -> Result<Vec<RawItem>> {
    let listing: Listing = serde_json::from_str(body).context("parsing reddit listing json")?;

    let mut out = Vec::with_capacity(listing.data.children.len());
    for child in listing.data.children {
        let p = child.data;
        let (Some(id), Some(author)) = (p.id, p.author) else {
            tracing::debug!(target: "ingest", "listing child without id/author skipped");
            continue;
        };
        out.push(RawItem {
            id,
            title: p.title.unwrap_or_default(),
            author,
            score: p.ups.unwrap_or(0),
            created_at: p.created_utc.and_then(unix_to_utc),
            fetched_at: Some(fetched_at),
        });
    }
    Ok(out)
}

pub fn listing_url(base_url: &str, subreddit: &str, limit: u32) -> String {
    format!(
        "{}/r/{}/new?limit={}",
        base_url.trim_end_matches('/'),
        subreddit,
        limit
    )
}

/// Pulls the newest submissions of one subreddit through the OAuth API.
pub struct RedditProvider {
    client: reqwest::Client,
    url: String,
    access_token: String,
}

impl RedditProvider {
    pub fn from_config(cfg: &StatsConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.request_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(cfg.user_agent.clone())
            .build()
            .context("building reddit http client")?;

        if cfg.access_token.is_empty() {
            tracing::warn!(target: "ingest", "reddit access token is empty; requests will be rejected");
        }

        Ok(Self {
            client,
            url: listing_url(&cfg.base_url, &cfg.subreddit, cfg.listing_limit),
            access_token: cfg.access_token.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl FeedProvider for RedditProvider {
    async fn fetch_batch(&self) -> Result<Vec<RawItem>> {
        let t0 = std::time::Instant::now();

        let resp = match self
            .client
            .get(&self.url)
            .bearer_auth(&self.access_token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!(target: "ingest", error = ?e, provider = "Reddit", "provider http error");
                counter!("stats_provider_errors_total").increment(1);
                return Err(e).context("reddit http get()");
            }
        };

        let status = resp.status();
        if !status.is_success() {
            tracing::warn!(target: "ingest", %status, provider = "Reddit", "provider http status");
            counter!("stats_provider_errors_total").increment(1);
            bail!("reddit listing returned HTTP {status}");
        }

        let body = resp.text().await.context("reddit http .text()")?;
        let items = parse_listing(&body, Utc::now())?;

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("stats_fetch_ms").record(ms);
        tracing::info!(target: "ingest", count = items.len(), ms, "fetched reddit listing");
        Ok(items)
    }

    fn name(&self) -> &'static str {
        "Reddit"
    }
}
