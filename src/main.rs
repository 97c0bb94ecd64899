//! Reddit Live Stats: binary entrypoint
//! Loads config, builds the store/provider/engine, and serves the Axum API
//! while the polling scheduler keeps the aggregate fresh.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tracing::{info, warn};

use reddit_live_stats::ingest::config::StatsConfig;
use reddit_live_stats::ingest::providers::RedditProvider;
use reddit_live_stats::metrics::Metrics;
use reddit_live_stats::{api, AggregationStore, AppState, PollingScheduler, StatsEngine};

/// Router plus the scheduler it is paired with; the scheduler only starts
/// once the runtime binds the service.
struct StatsService {
    router: Router,
    scheduler: PollingScheduler,
}

impl StatsService {
    async fn serve(self, addr: SocketAddr) -> anyhow::Result<()> {
        let handle = self.scheduler.spawn();

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("binding {addr}"))?;
        info!(%addr, "reddit live stats listening");

        let served = axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await;

        let stats = handle.stop().await;
        info!(?stats, "scheduler stopped");
        served.context("axum server error")
    }
}

#[async_trait::async_trait]
impl shuttle_runtime::Service for StatsService {
    async fn bind(self, addr: SocketAddr) -> Result<(), shuttle_runtime::Error> {
        self.serve(addr).await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "ctrl-c handler unavailable; running until killed");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

#[shuttle_runtime::main]
async fn init() -> Result<StatsService, shuttle_runtime::Error> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    reddit_live_stats::init_tracing();

    let cfg = StatsConfig::load_default()?;
    info!(
        subreddit = %cfg.subreddit,
        limit = cfg.listing_limit,
        interval_secs = cfg.poll_interval_secs,
        refresh_before_query = cfg.refresh_before_query,
        "config loaded"
    );

    let metrics = Metrics::init(&cfg)?;

    let store = Arc::new(AggregationStore::new());
    let provider = Arc::new(RedditProvider::from_config(&cfg)?);
    let engine = StatsEngine::new(store, provider);

    let scheduler = PollingScheduler::new(engine.clone(), cfg.poll_interval());
    let router = api::router(AppState::new(engine, cfg.refresh_before_query)).merge(metrics.router());

    Ok(StatsService { router, scheduler })
}
