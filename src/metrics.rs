use anyhow::{Context, Result};
use axum::{extract::State, routing::get, Router};
use metrics::{describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::ingest::config::StatsConfig;

/// Prometheus exposition for the stats service.
pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global recorder, register the ingest metric descriptions and
    /// publish the polling settings as static gauges.
    ///
    /// Fails if a recorder is already installed in this process.
    pub fn init(cfg: &StatsConfig) -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;

        crate::ingest::ensure_metrics_described();
        publish_settings(cfg);

        Ok(Self { handle })
    }

    /// Wrap an existing handle without touching the global recorder.
    pub fn from_handle(handle: PrometheusHandle) -> Self {
        Self { handle }
    }

    /// `/metrics` in the Prometheus text format.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/metrics", get(render_metrics))
            .with_state(self.handle.clone())
    }
}

fn publish_settings(cfg: &StatsConfig) {
    describe_gauge!("stats_poll_interval_secs", "Configured delay between polling cycles.");
    describe_gauge!("stats_listing_limit", "Submissions requested per listing page.");
    gauge!("stats_poll_interval_secs").set(cfg.poll_interval_secs as f64);
    gauge!("stats_listing_limit").set(cfg.listing_limit as f64);
}

async fn render_metrics(State(handle): State<PrometheusHandle>) -> String {
    handle.render()
}
