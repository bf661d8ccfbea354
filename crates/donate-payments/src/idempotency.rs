//! Idempotency Window
//!
//! Remembers the intent created for each idempotency key so a retried
//! submission replays the same client secret instead of charging twice.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{PaymentError, Result};

/// Default dedup window
pub const DEFAULT_WINDOW_SECS: i64 = 24 * 60 * 60;

/// Intent recorded for one idempotency key
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IdempotencyRecord {
    pub key: String,

    /// Digest of the request body that created the intent
    pub fingerprint: String,

    pub intent_id: String,
    pub client_secret: String,
    pub created_at: DateTime<Utc>,
}

impl IdempotencyRecord {
    pub fn new(
        key: impl Into<String>,
        fingerprint: impl Into<String>,
        intent_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            fingerprint: fingerprint.into(),
            intent_id: intent_id.into(),
            client_secret: client_secret.into(),
            created_at: Utc::now(),
        }
    }
}

/// Idempotency storage trait
pub trait IdempotencyStore: Send + Sync {
    /// Look up a record still inside the window
    fn get(&self, key: &str) -> Result<Option<IdempotencyRecord>>;

    /// Save a record
    fn save(&self, record: IdempotencyRecord) -> Result<()>;

    /// Drop records older than the window; returns how many were removed
    fn purge_expired(&self) -> Result<usize>;
}

/// In-memory store (for development/testing)
pub struct MemoryIdempotencyStore {
    records: RwLock<HashMap<String, IdempotencyRecord>>,
    window: Duration,
}

impl Default for MemoryIdempotencyStore {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_WINDOW_SECS))
    }
}

impl MemoryIdempotencyStore {
    pub fn new(window: Duration) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            window,
        }
    }

    pub const fn window(&self) -> Duration {
        self.window
    }

    fn is_live(&self, record: &IdempotencyRecord, now: DateTime<Utc>) -> bool {
        now - record.created_at < self.window
    }
}

fn poisoned<T>(_: T) -> PaymentError {
    PaymentError::Storage("idempotency store lock poisoned".into())
}

impl IdempotencyStore for MemoryIdempotencyStore {
    fn get(&self, key: &str) -> Result<Option<IdempotencyRecord>> {
        let records = self.records.read().map_err(poisoned)?;
        let now = Utc::now();
        Ok(records
            .get(key)
            .filter(|record| self.is_live(record, now))
            .cloned())
    }

    fn save(&self, record: IdempotencyRecord) -> Result<()> {
        let mut records = self.records.write().map_err(poisoned)?;
        records.insert(record.key.clone(), record);
        Ok(())
    }

    fn purge_expired(&self) -> Result<usize> {
        let mut records = self.records.write().map_err(poisoned)?;
        let now = Utc::now();
        let before = records.len();
        records.retain(|_, record| now - record.created_at < self.window);
        Ok(before - records.len())
    }
}
