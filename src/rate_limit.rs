use axum::http::HeaderMap;
use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

// Key shared by every client we could not identify
pub const UNKNOWN_CLIENT: &str = "unknown";

// Proxy headers checked in order; x-forwarded-for may hold a chain
const CLIENT_IP_HEADERS: [&str; 3] = ["x-forwarded-for", "x-real-ip", "cf-connecting-ip"];

// Rate limit entry - tracks requests per client in the current window
pub struct RateLimitEntry {
    pub count: u32,
    pub reset_time: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitResult {
    Allowed { remaining: u32 },
    Limited { retry_after: Duration },
}

impl RateLimitResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed { .. })
    }
}

// Fixed window limiter, one entry per client key
pub struct RateLimiter {
    entries: DashMap<String, RateLimitEntry>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            max_requests,
            window,
        }
    }

    pub fn check(&self, key: &str) -> RateLimitResult {
        let now = Instant::now();

        // entry() holds the shard lock, so read-modify-write is atomic per key
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert(RateLimitEntry {
                count: 0,
                reset_time: now + self.window,
            });

        // new or expired window? start over
        if entry.count == 0 || now > entry.reset_time {
            entry.count = 1;
            entry.reset_time = now + self.window;
            return RateLimitResult::Allowed {
                remaining: self.max_requests.saturating_sub(1),
            };
        }

        if entry.count >= self.max_requests {
            let retry_after = entry.reset_time.saturating_duration_since(now);
            debug!(client = %key, ?retry_after, "Client rate limited");
            return RateLimitResult::Limited { retry_after };
        }

        entry.count += 1;
        RateLimitResult::Allowed {
            remaining: self.max_requests - entry.count,
        }
    }

    // Drop records whose window has passed, returns how many were removed
    pub fn cleanup(&self) -> usize {
        let now = Instant::now();
        // counted inside retain, check() may insert keys while this runs
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            let keep = now <= entry.reset_time;
            removed += usize::from(!keep);
            keep
        });
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// Client identifier for rate limiting and geolocation
pub fn client_ip(headers: &HeaderMap) -> String {
    CLIENT_IP_HEADERS
        .iter()
        .filter_map(|name| headers.get(*name))
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(',').next())
        .map(str::trim)
        .find(|value| !value.is_empty())
        .unwrap_or(UNKNOWN_CLIENT)
        .to_string()
}
