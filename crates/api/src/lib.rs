//! HTTP API server for the CSV ingest pipeline.
//!
//! Exposes the saga-orchestrated pipeline run and the subject lookup
//! queries, with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use lookup::SubjectIndex;
use metrics_exporter_prometheus::PrometheusHandle;
use saga::{InMemoryMessageQueue, InMemoryObjectStore, InMemoryRecordStore, StepDelays};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
///
/// The three resource stores are process-wide: every pipeline run executes
/// against the same instances, mirroring how the sagas share external
/// services.
pub struct AppState {
    pub index: Arc<SubjectIndex>,
    pub storage: InMemoryObjectStore,
    pub queue: InMemoryMessageQueue,
    pub records: InMemoryRecordStore,
    pub delays: StepDelays,
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::export))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/pipeline/run", post(routes::pipeline::run))
        .route("/subjects", get(routes::subjects::list))
        .route("/subjects/search", get(routes::subjects::search))
        .route("/subjects/{id}", get(routes::subjects::get))
        .route("/images", get(routes::subjects::images))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the default application state around a loaded subject index.
pub fn create_default_state(index: SubjectIndex, delays: StepDelays) -> Arc<AppState> {
    Arc::new(AppState {
        index: Arc::new(index),
        storage: InMemoryObjectStore::new(),
        queue: InMemoryMessageQueue::new(),
        records: InMemoryRecordStore::new(),
        delays,
    })
}
