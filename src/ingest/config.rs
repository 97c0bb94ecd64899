// src/ingest/config.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_CONFIG_PATH: &str = "STATS_CONFIG_PATH";
pub const ENV_ACCESS_TOKEN: &str = "REDDIT_ACCESS_TOKEN";
pub const DEFAULT_CONFIG_PATH: &str = "config/stats.toml";

/// Reddit caps a listing page at 100 children.
const MAX_LISTING_LIMIT: u32 = 100;

fn default_subreddit() -> String {
    "wallstreetbets".to_string()
}
fn default_listing_limit() -> u32 {
    MAX_LISTING_LIMIT
}
fn default_base_url() -> String {
    "https://oauth.reddit.com".to_string()
}
fn default_user_agent() -> String {
    concat!("reddit-live-stats/", env!("CARGO_PKG_VERSION")).to_string()
}
fn default_access_token() -> String {
    "ENV".to_string()
}
fn default_poll_interval_secs() -> u64 {
    60
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsConfig {
    #[serde(default = "default_subreddit")]
    pub subreddit: String,
    #[serde(default = "default_listing_limit")]
    pub listing_limit: u32,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// "ENV" means: read from REDDIT_ACCESS_TOKEN
    #[serde(default = "default_access_token")]
    pub access_token: String,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Force a fetch cycle before answering each ranking request.
    #[serde(default = "default_true")]
    pub refresh_before_query: bool,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            subreddit: default_subreddit(),
            listing_limit: default_listing_limit(),
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            access_token: default_access_token(),
            poll_interval_secs: default_poll_interval_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            refresh_before_query: true,
        }
        .sanitized()
    }
}

impl StatsConfig {
    /// Load from an explicit TOML file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading stats config from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: StatsConfig = toml::from_str(s).context("parsing stats config toml")?;
        Ok(cfg.sanitized())
    }

    /// Load using env var + fallbacks:
    /// 1) $STATS_CONFIG_PATH
    /// 2) config/stats.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            } else {
                return Err(anyhow!("STATS_CONFIG_PATH points to non-existent path"));
            }
        }
        let toml_p = PathBuf::from(DEFAULT_CONFIG_PATH);
        if toml_p.exists() {
            return Self::load_from(&toml_p);
        }
        Ok(Self::default())
    }

    fn sanitized(mut self) -> Self {
        let sub = self.subreddit.trim();
        let sub = sub
            .strip_prefix("/r/")
            .or_else(|| sub.strip_prefix("r/"))
            .unwrap_or(sub);
        self.subreddit = if sub.is_empty() {
            default_subreddit()
        } else {
            sub.to_string()
        };

        self.listing_limit = self.listing_limit.clamp(1, MAX_LISTING_LIMIT);
        if self.poll_interval_secs == 0 {
            self.poll_interval_secs = default_poll_interval_secs();
        }
        if self.request_timeout_secs == 0 {
            self.request_timeout_secs = default_request_timeout_secs();
        }

        // Resolve token if "ENV"; a missing var leaves it empty and the
        // provider reports the rejection per cycle.
        if self.access_token.trim().eq_ignore_ascii_case("env") {
            self.access_token = std::env::var(ENV_ACCESS_TOKEN).unwrap_or_default();
        }
        self
    }

    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.poll_interval_secs)
    }
}
