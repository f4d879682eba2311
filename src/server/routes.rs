// HTTP routes configuration
// Author: kelexine (https://github.com/kelexine)

use super::handlers::{
    caches_handler, fetch_handler, health_handler, message_handler, metrics_handler,
    update_handler,
};
use super::middleware::{record_metrics, request_id_layers};
use crate::config::AppConfig;
use crate::error::Result;
use crate::worker::Registration;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    /// Explicit `--config` path, reread by `/__sw/update`
    pub config_path: Option<PathBuf>,
    pub registration: Arc<Registration>,
}

pub fn create_router(
    config: AppConfig,
    config_path: Option<PathBuf>,
    registration: Arc<Registration>,
) -> Result<Router> {
    let state = AppState {
        config,
        config_path,
        registration,
    };

    let (set_request_id, propagate_request_id) = request_id_layers();

    let app = Router::new()
        .route("/__sw/health", get(health_handler))
        .route("/__sw/caches", get(caches_handler))
        .route("/__sw/metrics", get(metrics_handler))
        .route("/__sw/message", post(message_handler))
        .route("/__sw/update", post(update_handler))
        // Everything else is a fetch event
        .fallback(fetch_handler)
        .layer(middleware::from_fn(record_metrics))
        .layer(TraceLayer::new_for_http())
        .layer(propagate_request_id)
        .layer(set_request_id)
        .with_state(state);

    Ok(app)
}
