//! Read-only HTTP API over the snapshot file

pub mod error;
pub mod handlers;

use crate::{metrics::MetricsCollector, store::SnapshotStore, types::Snapshot};
use axum::{routing::get, Router};
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// Shared state for API handlers
///
/// The server never sees the update loop directly; snapshots arrive only
/// through the file behind `store`.
#[derive(Clone)]
pub struct AppState {
    store: Arc<SnapshotStore>,
    metrics: Arc<MetricsCollector>,
    stale_after: Duration,
}

impl AppState {
    pub fn new(
        store: Arc<SnapshotStore>,
        metrics: Arc<MetricsCollector>,
        stale_after: Duration,
    ) -> Self {
        Self {
            store,
            metrics,
            stale_after,
        }
    }

    /// Loads the current snapshot off the async runtime
    pub async fn load_snapshot(&self) -> Result<Snapshot, ApiError> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.read())
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))?
            .map_err(ApiError::from)
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/latest", get(handlers::get_latest))
        .route("/health", get(handlers::get_health))
        .route("/htmlpage", get(handlers::get_html_page))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
