use lazy_static::lazy_static;
use prometheus::{
    Counter, Encoder, Gauge, Histogram, IntCounterVec, TextEncoder, register_counter,
    register_gauge, register_histogram, register_int_counter_vec,
};

lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("waitlist_requests_total", "Total number of signup requests").unwrap();
    pub static ref SIGNUPS_TOTAL: Counter =
        register_counter!("waitlist_signups_total", "Total signups stored").unwrap();
    pub static ref REJECTIONS: IntCounterVec = register_int_counter_vec!(
        "waitlist_rejections_total",
        "Signup requests rejected, by reason",
        &["reason"]
    )
    .unwrap();
    pub static ref NOTIFICATION_OUTCOMES: IntCounterVec = register_int_counter_vec!(
        "waitlist_notifications_total",
        "Signup notifications, by outcome",
        &["outcome"]
    )
    .unwrap();
    pub static ref GEOLOCATION_OUTCOMES: IntCounterVec = register_int_counter_vec!(
        "waitlist_geolocation_lookups_total",
        "Geolocation lookups, by outcome",
        &["outcome"]
    )
    .unwrap();
    pub static ref REQUEST_LATENCY: Histogram = register_histogram!(
        "waitlist_request_latency_seconds",
        "Signup request latency in seconds"
    )
    .unwrap();
    pub static ref WAITLIST_SIZE: Gauge =
        register_gauge!("waitlist_size", "Current number of waitlist entries").unwrap();
}

// Render every registered metric in the Prometheus text format
pub fn render() -> Result<String, String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| format!("Encode error: {}", e))?;
    String::from_utf8(buffer).map_err(|e| format!("Encode error: {}", e))
}
