use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::engine::StatsEngine;
use crate::model::{AuthorAggregate, Item};

/// Result count when the caller does not pass `?count=`.
pub const DEFAULT_COUNT: usize = 10;

#[derive(Clone)]
pub struct AppState {
    pub engine: StatsEngine,
    /// Run a fetch cycle before answering each ranking request.
    pub refresh_before_query: bool,
}

impl AppState {
    pub fn new(engine: StatsEngine, refresh_before_query: bool) -> Self {
        Self {
            engine,
            refresh_before_query,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/stats/fetch-and-process", get(fetch_and_process))
        .route("/stats/top-posts", get(top_posts))
        .route("/stats/top-users", get(top_users))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug, serde::Deserialize)]
struct CountQuery {
    count: Option<i64>,
}

impl CountQuery {
    /// Missing → default, negative → 0.
    fn resolve(&self) -> usize {
        match self.count {
            None => DEFAULT_COUNT,
            Some(n) => usize::try_from(n).unwrap_or(0),
        }
    }
}

#[derive(Debug, serde::Serialize)]
struct FetchResp {
    fetched: bool,
    message: String,
}

async fn fetch_and_process(State(state): State<AppState>) -> Json<FetchResp> {
    info!(target: "api", "fetching and processing posts");
    let resp = match state.engine.trigger_fetch_and_merge().await {
        Ok(_) => FetchResp {
            fetched: true,
            message: "Posts fetched and processed successfully.".to_string(),
        },
        Err(e) => FetchResp {
            fetched: false,
            message: e.to_string(),
        },
    };
    Json(resp)
}

/// Best-effort refresh; on failure the current aggregate is served as-is.
async fn refresh(state: &AppState) {
    if !state.refresh_before_query {
        return;
    }
    if let Err(e) = state.engine.trigger_fetch_and_merge().await {
        warn!(target: "api", error = %e, "refresh before query failed; serving stored data");
    }
}

async fn top_posts(State(state): State<AppState>, Query(q): Query<CountQuery>) -> Json<Vec<Item>> {
    refresh(&state).await;
    Json(state.engine.top_items(q.resolve()))
}

async fn top_users(
    State(state): State<AppState>,
    Query(q): Query<CountQuery>,
) -> Json<Vec<AuthorAggregate>> {
    refresh(&state).await;
    Json(state.engine.top_authors(q.resolve()))
}
