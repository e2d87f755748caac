use crate::error::ApiError;
use crate::metrics::{REQUEST_LATENCY, REQUEST_TOTAL, SIGNUPS_TOTAL, WAITLIST_SIZE};
use crate::models::{JoinRequest, JoinResponse};
use crate::notifier::{api_key, key_prefix};
use crate::rate_limit::{RateLimitResult, client_ip};
use crate::state::AppState;
use crate::validator::validate_optional;
use crate::worker::spawn_notification;
use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

// POST /waitlist
pub async fn join_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<JoinResponse>), ApiError> {
    REQUEST_TOTAL.inc();
    let start_time = Instant::now();

    let result = join(&state, &headers, &body).await;

    // every outcome counts, rejections included
    REQUEST_LATENCY.observe(start_time.elapsed().as_secs_f64());
    result
}

async fn join(
    state: &AppState,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<(StatusCode, Json<JoinResponse>), ApiError> {
    let ip = client_ip(headers);

    if let RateLimitResult::Limited { retry_after } = state.rate_limiter.check(&ip) {
        info!(client = %ip, "Signup rate limited");
        return Err(ApiError::RateLimited { retry_after });
    }

    // a body that is not JSON at all is a server error, as is anything else unexpected;
    // JSON of the wrong shape is just an invalid email
    let body: Value = serde_json::from_slice(body)
        .map_err(|e| ApiError::Internal(format!("Unreadable request body: {}", e)))?;
    let request: JoinRequest = serde_json::from_value(body).unwrap_or_default();
    let email = validate_optional(request.email.as_deref())?;

    // fast path, try_insert below settles races
    if state.store.exists(email).await {
        debug!(%email, "Email already on the waitlist");
        return Err(ApiError::Duplicate);
    }

    let entry = state.store.try_insert(email).await?;
    SIGNUPS_TOTAL.inc();
    WAITLIST_SIZE.set(state.store.len().await as f64);

    // fire and forget, the client never waits on geolocation or mail delivery
    spawn_notification(
        &entry,
        &ip,
        state.geo.clone(),
        state.notifier.clone(),
        state.geo_timeout,
    );

    Ok((StatusCode::CREATED, Json(JoinResponse::from(&entry))))
}

// GET /waitlist - service metadata
pub async fn info_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let key = api_key();
    let configured = key.is_some();
    let note = if configured {
        "API key is set. Ensure the sender email is verified in the SendGrid dashboard."
    } else {
        "SENDGRID_API_KEY environment variable is not set."
    };

    Json(json!({
        "service": format!("{} waitlist API", state.config.site_name),
        "version": env!("CARGO_PKG_VERSION"),
        "signups": state.store.len().await,
        "sendGrid": {
            "configured": configured,
            "apiKeyPrefix": key.as_deref().map(key_prefix),
            "senderEmail": state.config.notify_from,
            "recipientEmail": state.config.notify_to,
            "note": note,
        },
    }))
}
