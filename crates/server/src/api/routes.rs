use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{services::ServeDir, trace::TraceLayer};

use super::{download, handlers, log, middleware::metrics_middleware};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let static_dir = state.config().web.static_dir.clone();

    Router::new()
        // Page and assets
        .route("/", get(handlers::index))
        .nest_service("/static", ServeDir::new(static_dir))
        // Downloads
        .route("/download", post(download::download))
        .route("/log/{download_id}", get(log::get_log_entry))
        // Operations
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
