mod health;
mod metrics;
mod waitlist;

pub use health::health_handler;
pub use metrics::metrics_handler;
pub use waitlist::{info_handler, join_handler};

use crate::state::AppState;
use axum::{Router, routing::get};
use std::sync::Arc;

// All routes; the waitlist resource is also served under /api for the site's form
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/waitlist", get(info_handler).post(join_handler))
        .route("/api/waitlist", get(info_handler).post(join_handler))
        .with_state(state)
}
