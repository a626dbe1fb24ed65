// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Event ledger interfaces and backends.
//!
//! The ledger is the authoritative source of at-most-once truth: one
//! durable row per event id, with a monotonic `processing → processed`
//! state machine. Locks and everything else are optimizations layered on
//! top of it.
//!
//! Both backends guarantee:
//! - `begin_processing` is an idempotent insert-if-absent — racing
//!   writers never error and never create a second row;
//! - `finalize` applies the planned side-effect upserts and the
//!   conditional status transition inside a single transaction, so no
//!   intermediate state (effect without status, status without effect)
//!   is observable after a crash.

pub mod postgres;
pub mod sqlite;

pub use self::postgres::PostgresLedger;
pub use self::sqlite::SqliteLedger;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::dispatch::SideEffect;
use crate::error::WebhookError;

/// Ledger row status string for in-flight events.
pub const STATUS_PROCESSING: &str = "processing";

/// Ledger row status string for finalized events.
pub const STATUS_PROCESSED: &str = "processed";

/// Dedup status of an event id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventStatus {
    /// Never seen.
    Absent,
    /// A row exists but side effects have not been finalized. Re-entrant:
    /// a new delivery may safely re-attempt the idempotent dispatch.
    Processing,
    /// Side effects are durably applied; must not be reapplied.
    Processed,
}

/// Event record from the ledger.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LedgerRow {
    /// Provider-assigned event id (unique key).
    pub event_id: String,
    /// Event type as delivered.
    pub event_type: String,
    /// SHA-256 hex digest of the raw delivery bytes.
    pub payload_hash: String,
    /// Current status (processing, processed).
    pub status: String,
    /// When the event id was first sighted.
    pub received_at: DateTime<Utc>,
    /// When side effects were finalized.
    pub processed_at: Option<DateTime<Utc>>,
}

/// Durable dedup state machine used by the orchestrator.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Query the dedup status of an event id.
    async fn status_of(&self, event_id: &str) -> Result<EventStatus, WebhookError>;

    /// Record first sighting of an event id with status `processing`.
    ///
    /// Idempotent insert-if-absent: if a concurrent writer already
    /// inserted this event id, the call is a harmless no-op.
    async fn begin_processing(
        &self,
        event_id: &str,
        event_type: &str,
        payload_hash: &str,
    ) -> Result<(), WebhookError>;

    /// Apply the planned side effects and transition the row to
    /// `processed`, atomically.
    ///
    /// The upserts and the conditional status update commit in one
    /// transaction. Effects are insert-if-absent keyed by business
    /// identifiers, so re-finalizing after a crash is safe.
    async fn finalize(&self, event_id: &str, effects: &[SideEffect]) -> Result<(), WebhookError>;

    /// Fetch the full ledger row for an event id, for audit and tooling.
    async fn fetch(&self, event_id: &str) -> Result<Option<LedgerRow>, WebhookError>;

    /// List rows stuck in `processing` since before `older_than`, oldest
    /// first. Feeds the reconciliation sweep.
    async fn stuck_processing(
        &self,
        older_than: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<LedgerRow>, WebhookError>;
}

pub(crate) fn status_from_row(status: Option<String>) -> EventStatus {
    match status.as_deref() {
        None => EventStatus::Absent,
        Some(STATUS_PROCESSED) => EventStatus::Processed,
        // Any non-terminal value counts as in-flight.
        Some(_) => EventStatus::Processing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_row_mapping() {
        assert_eq!(status_from_row(None), EventStatus::Absent);
        assert_eq!(
            status_from_row(Some("processing".to_string())),
            EventStatus::Processing
        );
        assert_eq!(
            status_from_row(Some("processed".to_string())),
            EventStatus::Processed
        );
    }
}
