// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! SQLite-backed ledger implementation.
//!
//! Used for embedded deployments and tests. Semantics match the
//! PostgreSQL backend exactly; `ON CONFLICT DO NOTHING` provides the same
//! idempotent insert and the transaction in `finalize` the same atomic
//! boundary.

use std::path::Path;

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::dispatch::SideEffect;
use crate::error::WebhookError;

use super::{EventStatus, Ledger, LedgerRow, status_from_row};

/// SQLite-backed ledger provider.
#[derive(Clone)]
pub struct SqliteLedger {
    pool: SqlitePool,
}

impl SqliteLedger {
    /// Create a new SQLite ledger from an existing pool.
    ///
    /// The caller is responsible for running
    /// [`crate::migrations::run_sqlite`] before first use.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create and initialize a new SQLite ledger from a file path.
    ///
    /// This convenience constructor handles all setup:
    /// - Creates parent directories if they don't exist
    /// - Creates the database file if it doesn't exist
    /// - Connects with sensible pool defaults
    /// - Runs all migrations
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, WebhookError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| WebhookError::Database {
                operation: "create_dir".to_string(),
                details: format!("Failed to create directory {:?}: {}", parent, e),
            })?;
        }

        let url = format!("sqlite:{}?mode=rwc", path.to_string_lossy());

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await
            .map_err(|e| WebhookError::Database {
                operation: "connect".to_string(),
                details: format!("Failed to connect to SQLite at {:?}: {}", path, e),
            })?;

        crate::migrations::run_sqlite(&pool)
            .await
            .map_err(|e| WebhookError::Database {
                operation: "migrate".to_string(),
                details: format!("Failed to run migrations: {}", e),
            })?;

        Ok(Self { pool })
    }

    async fn apply_effect(
        tx: &mut Transaction<'_, Sqlite>,
        effect: &SideEffect,
    ) -> Result<(), WebhookError> {
        match effect {
            SideEffect::RecordPayment {
                session_id,
                customer_email,
                amount_total,
                currency,
            } => {
                sqlx::query(
                    r#"
                    INSERT INTO payments (session_id, customer_email, amount_total, currency, status, created_at)
                    VALUES (?, ?, ?, ?, 'succeeded', CURRENT_TIMESTAMP)
                    ON CONFLICT(session_id) DO NOTHING
                    "#,
                )
                .bind(session_id)
                .bind(customer_email)
                .bind(amount_total)
                .bind(currency)
                .execute(&mut **tx)
                .await?;
            }
            SideEffect::RecordPaymentIntent {
                intent_id,
                amount_received,
                currency,
            } => {
                sqlx::query(
                    r#"
                    INSERT INTO payment_intents (intent_id, amount_received, currency, status, created_at)
                    VALUES (?, ?, ?, 'succeeded', CURRENT_TIMESTAMP)
                    ON CONFLICT(intent_id) DO NOTHING
                    "#,
                )
                .bind(intent_id)
                .bind(amount_received)
                .bind(currency)
                .execute(&mut **tx)
                .await?;
            }
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Ledger for SqliteLedger {
    async fn status_of(&self, event_id: &str) -> Result<EventStatus, WebhookError> {
        let row: Option<(String,)> = sqlx::query_as(
            r#"
            SELECT status FROM webhook_events WHERE event_id = ?
            "#,
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(status_from_row(row.map(|(status,)| status)))
    }

    async fn begin_processing(
        &self,
        event_id: &str,
        event_type: &str,
        payload_hash: &str,
    ) -> Result<(), WebhookError> {
        sqlx::query(
            r#"
            INSERT INTO webhook_events (event_id, event_type, payload_hash, status, received_at)
            VALUES (?, ?, ?, 'processing', CURRENT_TIMESTAMP)
            ON CONFLICT(event_id) DO NOTHING
            "#,
        )
        .bind(event_id)
        .bind(event_type)
        .bind(payload_hash)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn finalize(&self, event_id: &str, effects: &[SideEffect]) -> Result<(), WebhookError> {
        let mut tx = self.pool.begin().await?;

        for effect in effects {
            Self::apply_effect(&mut tx, effect).await?;
        }

        sqlx::query(
            r#"
            UPDATE webhook_events
            SET status = 'processed', processed_at = CURRENT_TIMESTAMP
            WHERE event_id = ? AND status = 'processing'
            "#,
        )
        .bind(event_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn fetch(&self, event_id: &str) -> Result<Option<LedgerRow>, WebhookError> {
        let row = sqlx::query_as::<_, LedgerRow>(
            r#"
            SELECT event_id, event_type, payload_hash, status, received_at, processed_at
            FROM webhook_events
            WHERE event_id = ?
            "#,
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn stuck_processing(
        &self,
        older_than: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<LedgerRow>, WebhookError> {
        let rows = sqlx::query_as::<_, LedgerRow>(
            r#"
            SELECT event_id, event_type, payload_hash, status, received_at, processed_at
            FROM webhook_events
            WHERE status = 'processing' AND datetime(received_at) < datetime(?)
            ORDER BY received_at ASC
            LIMIT ?
            "#,
        )
        .bind(older_than)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
