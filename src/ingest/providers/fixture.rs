// src/ingest/providers/fixture.rs
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;

use crate::ingest::providers::reddit::parse_listing;
use crate::ingest::types::FeedProvider;
use crate::model::RawItem;

/// Serves a canned listing page. Each fetch re-parses it with a fresh stamp.
pub struct FixtureProvider {
    listing_json: String,
}

impl FixtureProvider {
    pub fn from_fixture(content: &str) -> Self {
        Self {
            listing_json: content.to_string(),
        }
    }
}

#[async_trait]
impl FeedProvider for FixtureProvider {
    async fn fetch_batch(&self) -> Result<Vec<RawItem>> {
        parse_listing(&self.listing_json, Utc::now())
    }

    fn name(&self) -> &'static str {
        "Fixture"
    }
}
