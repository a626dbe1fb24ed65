// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Redis/Valkey-backed lock manager.
//!
//! One-shot locks via `SET key token NX EX ttl`: the write succeeds only
//! if the key is absent, and the server expires it after the TTL so a
//! crashed worker cannot hold an event id forever.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use uuid::Uuid;

use crate::error::Result;

use super::LockManager;

/// Key prefix for per-event lock entries.
const LOCK_PREFIX: &str = "lock:stripe:";

/// Lock manager backed by a shared Redis/Valkey instance.
#[derive(Clone)]
pub struct RedisLockManager {
    conn: ConnectionManager,
}

impl RedisLockManager {
    /// Create a lock manager over an existing connection manager.
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    /// Connect to the lock store at the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).map_err(crate::error::WebhookError::from)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }

    fn key(event_id: &str) -> String {
        format!("{}{}", LOCK_PREFIX, event_id)
    }
}

#[async_trait]
impl LockManager for RedisLockManager {
    async fn acquire(&self, event_id: &str, ttl: Duration) -> Result<bool> {
        let mut conn = self.conn.clone();
        // Holder token is stored for observability; ownership is decided
        // solely by NX.
        let token = Uuid::new_v4().to_string();
        let reply: Option<String> = redis::cmd("SET")
            .arg(Self::key(event_id))
            .arg(token)
            .arg("NX")
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await?;
        Ok(reply.is_some())
    }

    async fn release(&self, event_id: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _deleted: i64 = redis::cmd("DEL")
            .arg(Self::key(event_id))
            .query_async(&mut conn)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_key_is_prefixed() {
        assert_eq!(RedisLockManager::key("evt_123"), "lock:stripe:evt_123");
    }
}
