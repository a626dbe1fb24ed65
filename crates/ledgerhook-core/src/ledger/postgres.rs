// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! PostgreSQL-backed ledger implementation.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};

use crate::dispatch::SideEffect;
use crate::error::WebhookError;

use super::{EventStatus, Ledger, LedgerRow, status_from_row};

/// PostgreSQL-backed ledger provider.
#[derive(Clone)]
pub struct PostgresLedger {
    pool: PgPool,
}

impl PostgresLedger {
    /// Create a new PostgreSQL ledger from an existing pool.
    ///
    /// The caller is responsible for running
    /// [`crate::migrations::run_postgres`] before first use.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn apply_effect(
        tx: &mut Transaction<'_, Postgres>,
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
                    VALUES ($1, $2, $3, $4, 'succeeded', NOW())
                    ON CONFLICT (session_id) DO NOTHING
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
                    VALUES ($1, $2, $3, 'succeeded', NOW())
                    ON CONFLICT (intent_id) DO NOTHING
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
impl Ledger for PostgresLedger {
    async fn status_of(&self, event_id: &str) -> Result<EventStatus, WebhookError> {
        let row: Option<(String,)> = sqlx::query_as(
            r#"
            SELECT status FROM webhook_events WHERE event_id = $1
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
            VALUES ($1, $2, $3, 'processing', NOW())
            ON CONFLICT (event_id) DO NOTHING
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

        // Conditional: a racing finalizer may already have won; the row
        // stays processed either way and the upserts above were no-ops.
        sqlx::query(
            r#"
            UPDATE webhook_events
            SET status = 'processed', processed_at = NOW()
            WHERE event_id = $1 AND status = 'processing'
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
            WHERE event_id = $1
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
            WHERE status = 'processing' AND received_at < $1
            ORDER BY received_at ASC
            LIMIT $2
            "#,
        )
        .bind(older_than)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
