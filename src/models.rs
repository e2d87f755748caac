use chrono::{DateTime, SecondsFormat, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;

// Boxed future returned by the collaborator traits
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// One waitlist signup
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WaitlistEntry {
    pub id: String,
    pub email: String,
    pub timestamp: String,
}

impl WaitlistEntry {
    pub fn new(email: &str) -> Self {
        Self::created_at(email, Utc::now())
    }

    pub fn created_at(email: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: generate_id(now),
            email: email.to_string(),
            timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    // Dedupe key
    pub fn key(&self) -> String {
        self.email.to_lowercase()
    }
}

// "<epoch millis>-<9 base36 chars>"
fn generate_id(now: DateTime<Utc>) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..9)
        .filter_map(|_| std::char::from_digit(rng.gen_range(0..36), 36))
        .collect();
    format!("{}-{}", now.timestamp_millis(), suffix)
}

// POST /waitlist body. Anything that is not a string email fails validation later.
#[derive(Deserialize, Default, Debug)]
pub struct JoinRequest {
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Serialize, Debug)]
pub struct JoinedData {
    pub email: String,
    pub timestamp: String,
}

// 201 response body
#[derive(Serialize, Debug)]
pub struct JoinResponse {
    pub success: bool,
    pub message: &'static str,
    pub data: JoinedData,
}

impl From<&WaitlistEntry> for JoinResponse {
    fn from(entry: &WaitlistEntry) -> Self {
        Self {
            success: true,
            message: "Successfully joined the waitlist",
            data: JoinedData {
                email: entry.email.clone(),
                timestamp: entry.timestamp.clone(),
            },
        }
    }
}
