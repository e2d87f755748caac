// In-memory waitlist storage.
//
// Entries live for the lifetime of the process. Email uniqueness is
// case-insensitive.

use crate::models::WaitlistEntry;
use std::collections::HashSet;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("email is already on the waitlist")]
    Duplicate,

    // Raised by backends that can be unreachable. The in-memory store never
    // returns it.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

#[derive(Default)]
struct Inner {
    entries: Vec<WaitlistEntry>,
    emails: HashSet<String>,
}

impl Inner {
    fn push(&mut self, email: &str) -> WaitlistEntry {
        let entry = WaitlistEntry::new(email);
        self.emails.insert(entry.key());
        self.entries.push(entry.clone());

        info!(
            email = %entry.email,
            timestamp = %entry.timestamp,
            total_signups = self.entries.len(),
            "New waitlist signup"
        );
        entry
    }
}

// Append-only set of waitlist signups.
#[derive(Default)]
pub struct EntryStore {
    inner: RwLock<Inner>,
}

impl EntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Case-insensitive membership test.
    pub async fn exists(&self, email: &str) -> bool {
        self.inner
            .read()
            .await
            .emails
            .contains(&email.to_lowercase())
    }

    // Append a new entry. The caller is expected to have checked
    // exists() first; nothing here prevents a duplicate.
    pub async fn insert(&self, email: &str) -> Result<WaitlistEntry, StoreError> {
        Ok(self.inner.write().await.push(email))
    }

    // Check and append under one write lock, so two concurrent submissions
    // of the same address cannot both be stored.
    pub async fn try_insert(&self, email: &str) -> Result<WaitlistEntry, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.emails.contains(&email.to_lowercase()) {
            return Err(StoreError::Duplicate);
        }
        Ok(inner.push(email))
    }

    // Copy of every entry in insertion order.
    pub async fn list_all(&self) -> Vec<WaitlistEntry> {
        self.inner.read().await.entries.clone()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
