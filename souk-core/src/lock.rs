use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

pub type LockError = Box<dyn std::error::Error + Send + Sync>;

/// Opaque fencing token handed out by a successful lease acquisition.
/// Release is only honored for the token that was granted, so a slow
/// request cannot free a lease that has since expired and been re-acquired
/// by someone else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaseToken(String);

impl LeaseToken {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for LeaseToken {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

/// Builds the lease key for a listing slot. Keyed on the listing and the
/// normalized start instant, so two requests proposing the same slot always
/// contend on the same key.
pub fn slot_key(listing_id: Uuid, start_at: DateTime<Utc>) -> String {
    format!("booking_lock:{}:{}", listing_id, start_at.timestamp())
}

/// Short-lived mutual exclusion around booking creation. The TTL is a
/// liveness guard against crashed holders, not a correctness boundary: the
/// store-level availability check still decides who wins.
#[async_trait]
pub trait SlotLock: Send + Sync {
    /// Try to acquire the lease. `None` means another holder owns it right now.
    async fn acquire(&self, key: &str, ttl: Duration) -> Result<Option<LeaseToken>, LockError>;

    /// Release the lease if `token` still owns it. Returns whether a lease was
    /// actually removed; releasing an expired or foreign lease is a no-op.
    async fn release(&self, key: &str, token: &LeaseToken) -> Result<bool, LockError>;
}

/// Single-process lock table for tests and single-node deployments.
pub struct MemorySlotLock {
    leases: Mutex<HashMap<String, (LeaseToken, Instant)>>,
}

impl MemorySlotLock {
    pub fn new() -> Self {
        Self {
            leases: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemorySlotLock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SlotLock for MemorySlotLock {
    async fn acquire(&self, key: &str, ttl: Duration) -> Result<Option<LeaseToken>, LockError> {
        let mut leases = self.leases.lock().await;
        if let Some((_, expires_at)) = leases.get(key) {
            if Instant::now() < *expires_at {
                return Ok(None);
            }
        }
        let token = LeaseToken::generate();
        leases.insert(key.to_string(), (token.clone(), Instant::now() + ttl));
        Ok(Some(token))
    }

    async fn release(&self, key: &str, token: &LeaseToken) -> Result<bool, LockError> {
        let mut leases = self.leases.lock().await;
        match leases.get(key) {
            Some((held, _)) if held == token => {
                leases.remove(key);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
