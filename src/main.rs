use clap::Parser; // for cli
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{Level, debug, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use waitlist_gateway::{AppState, Args, notifier, router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // parse cli arguments
    let args = Args::parse();

    let state = Arc::new(AppState::new(args.clone(), reqwest::Client::new()));

    // sweep expired rate limit windows
    let cleanup_state = state.clone();
    let cleanup_interval = args.cleanup_interval().max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(cleanup_interval);
        loop {
            interval.tick().await;
            let removed = cleanup_state.rate_limiter.cleanup();
            if removed > 0 {
                debug!(removed, "Expired rate limit windows dropped");
            }
        }
    });

    let app = router(state).layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = TcpListener::bind(&addr).await?;

    info!(%addr, "Waitlist gateway listening");
    info!(
        rate_limit = args.rate_limit,
        rate_window_secs = args.rate_window,
        geo_timeout_ms = args.geo_timeout_ms,
        "Rate limit and notification settings"
    );
    if notifier::api_key().is_none() {
        info!(
            var = notifier::API_KEY_VAR,
            "Mail API key not set yet, notifications will be skipped until it is"
        );
    }

    axum::serve(listener, app).await?;

    Ok(())
}
