use crate::metrics::render;
use axum::http::StatusCode;
use tracing::error;

pub async fn metrics_handler() -> Result<String, (StatusCode, String)> {
    exposition(render())
}

// Encoding failures go straight back to the scraper, they are not signup
// rejections
fn exposition(rendered: Result<String, String>) -> Result<String, (StatusCode, String)> {
    rendered.map_err(|e| {
        error!(error = %e, "Failed to render metrics");
        (StatusCode::INTERNAL_SERVER_ERROR, e)
    })
}
