// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Distributed lock interfaces and backends.
//!
//! The lock is a throughput optimization, never a correctness boundary:
//! it keeps concurrent deliveries of the same event id from doing the
//! same work twice, but the event ledger alone enforces at-most-once
//! effects. A lock that expires mid-processing merely lets a duplicate
//! start, and the ledger's conditional writes absorb it.

pub mod redis;

pub use self::redis::RedisLockManager;

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::error::Result;

/// Short-lived mutual exclusion keyed by event id.
#[async_trait]
pub trait LockManager: Send + Sync {
    /// Atomically create the lock entry if absent, with the given TTL.
    ///
    /// Returns `true` iff this caller obtained exclusive ownership.
    async fn acquire(&self, event_id: &str, ttl: Duration) -> Result<bool>;

    /// Remove the lock entry. Must be invoked on every exit path of the
    /// locked section so a future retry of the same event id is never
    /// starved until the TTL expires.
    async fn release(&self, event_id: &str) -> Result<()>;
}

/// In-process lock manager for tests and single-node deployments.
///
/// Mirrors the Redis backend's semantics (set-if-absent with expiry,
/// unconditional delete) without an external store.
#[derive(Debug, Default)]
pub struct InMemoryLockManager {
    entries: Mutex<HashMap<String, Instant>>,
}

impl InMemoryLockManager {
    /// Create an empty lock manager.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LockManager for InMemoryLockManager {
    async fn acquire(&self, event_id: &str, ttl: Duration) -> Result<bool> {
        let mut entries = self.entries.lock().expect("lock map poisoned");
        let now = Instant::now();
        match entries.get(event_id) {
            Some(expires_at) if *expires_at > now => Ok(false),
            _ => {
                entries.insert(event_id.to_string(), now + ttl);
                Ok(true)
            }
        }
    }

    async fn release(&self, event_id: &str) -> Result<()> {
        self.entries
            .lock()
            .expect("lock map poisoned")
            .remove(event_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_acquire_is_exclusive() {
        let locks = InMemoryLockManager::new();
        assert!(locks.acquire("evt_1", Duration::from_secs(30)).await.unwrap());
        assert!(!locks.acquire("evt_1", Duration::from_secs(30)).await.unwrap());
        // A different event id is unaffected
        assert!(locks.acquire("evt_2", Duration::from_secs(30)).await.unwrap());
    }

    #[tokio::test]
    async fn test_release_frees_the_lock() {
        let locks = InMemoryLockManager::new();
        assert!(locks.acquire("evt_1", Duration::from_secs(30)).await.unwrap());
        locks.release("evt_1").await.unwrap();
        assert!(locks.acquire("evt_1", Duration::from_secs(30)).await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_lock_can_be_reacquired() {
        let locks = InMemoryLockManager::new();
        assert!(locks.acquire("evt_1", Duration::from_millis(10)).await.unwrap());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(locks.acquire("evt_1", Duration::from_secs(30)).await.unwrap());
    }

    #[tokio::test]
    async fn test_release_of_unheld_lock_is_harmless() {
        let locks = InMemoryLockManager::new();
        locks.release("evt_never_locked").await.unwrap();
    }
}
