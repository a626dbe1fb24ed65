// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Webhook processing orchestrator.
//!
//! Sequences verification, locking, ledger lookup, dispatch, and
//! finalization for one inbound delivery. Invoked concurrently across
//! arbitrarily many transport workers; for the same event id the ledger's
//! conditional writes provide at-most-once semantics no matter how many
//! instances race.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::dispatch;
use crate::error::Result;
use crate::event::{WebhookEvent, payload_hash};
use crate::ledger::{EventStatus, Ledger};
use crate::lock::LockManager;
use crate::signature::SignatureVerifier;

/// How a successfully acknowledged delivery was resolved.
///
/// Every variant converges to a success acknowledgement at the transport:
/// all of them mean "this logical event's effects are applied at most
/// once".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Side effects were written and the event finalized by this call.
    Applied,
    /// The ledger already recorded this event id as processed.
    AlreadyProcessed,
    /// A concurrent delivery of this event id holds the lock; the
    /// in-flight worker will complete the job.
    DuplicateInFlight,
    /// Unknown event type: accepted and finalized with no side effects.
    Ignored,
}

/// Orchestrates processing of inbound webhook deliveries.
///
/// Collaborators are injected at construction and shared by reference;
/// there is no lazily-initialized global state.
pub struct WebhookProcessor {
    verifier: SignatureVerifier,
    locks: Arc<dyn LockManager>,
    ledger: Arc<dyn Ledger>,
    lock_ttl: Duration,
}

impl WebhookProcessor {
    /// Create a processor over the given collaborators.
    ///
    /// `lock_ttl` bounds the worst-case lock hold time and should cover
    /// expected worst-case processing latency.
    pub fn new(
        verifier: SignatureVerifier,
        locks: Arc<dyn LockManager>,
        ledger: Arc<dyn Ledger>,
        lock_ttl: Duration,
    ) -> Self {
        Self {
            verifier,
            locks,
            ledger,
            lock_ttl,
        }
    }

    /// Process one inbound delivery.
    ///
    /// # Errors
    ///
    /// - [`crate::error::WebhookError::InvalidSignature`] /
    ///   [`crate::error::WebhookError::StaleSignature`]: verification
    ///   failed; nothing was written.
    /// - [`crate::error::WebhookError::MalformedEvent`]: the payload is
    ///   authentic but unusable.
    /// - [`crate::error::WebhookError::Database`] /
    ///   [`crate::error::WebhookError::LockBackend`]: a store failed; the
    ///   caller must surface a retryable failure so the provider
    ///   redelivers. Never masked as success.
    pub async fn process(&self, raw: &[u8], signature_header: &str) -> Result<ProcessOutcome> {
        // 1. Authenticate before touching any store. Fail closed.
        self.verifier.verify(raw, signature_header)?;

        // 2. Extract the envelope and fingerprint the raw bytes.
        let event = WebhookEvent::parse(raw)?;
        let body_hash = payload_hash(raw);

        // 3. Cheap concurrent guard first. Losing the race is
        // outcome-equivalent to having processed: the in-flight worker
        // finishes the job.
        if !self.locks.acquire(&event.id, self.lock_ttl).await? {
            info!(
                event_id = %event.id,
                event_type = %event.event_type,
                "Duplicate delivery in flight, acknowledging"
            );
            return Ok(ProcessOutcome::DuplicateInFlight);
        }

        let result = self.process_locked(&event, &body_hash).await;

        // 7. Release unconditionally; a stuck entry would starve retries
        // of this event id until the TTL expires. A failed release is
        // logged, not surfaced: the outcome above is already decided.
        if let Err(e) = self.locks.release(&event.id).await {
            warn!(event_id = %event.id, error = %e, "Failed to release webhook lock");
        }

        result
    }

    async fn process_locked(
        &self,
        event: &WebhookEvent,
        body_hash: &str,
    ) -> Result<ProcessOutcome> {
        // 4. The ledger is the authoritative duplicate check, independent
        // of whether the lock was obtained.
        match self.ledger.status_of(&event.id).await? {
            EventStatus::Processed => {
                info!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    "Event already processed, acknowledging"
                );
                return Ok(ProcessOutcome::AlreadyProcessed);
            }
            EventStatus::Processing => {
                // A previous worker crashed between insert and finalize.
                // Dispatch is idempotent, so re-attempt.
                debug!(event_id = %event.id, "Re-entering partially processed event");
            }
            EventStatus::Absent => {}
        }

        // 5. First sighting (or harmless no-op on re-entry).
        self.ledger
            .begin_processing(&event.id, &event.event_type, body_hash)
            .await?;

        // 6. Plan and apply side effects together with the status
        // transition in one atomic commit.
        let planned = dispatch::plan(event)?;
        let outcome = match planned {
            Some(_) => ProcessOutcome::Applied,
            None => {
                debug!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    "Unknown event type, finalizing without side effects"
                );
                ProcessOutcome::Ignored
            }
        };
        let effects: Vec<_> = planned.into_iter().collect();
        self.ledger.finalize(&event.id, &effects).await?;

        info!(
            event_id = %event.id,
            event_type = %event.event_type,
            outcome = ?outcome,
            "Event finalized"
        );
        Ok(outcome)
    }
}
