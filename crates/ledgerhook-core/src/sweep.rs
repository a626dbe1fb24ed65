// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Reconciliation sweep for rows stuck in `processing`.
//!
//! A delivery that crashed between `begin_processing` and `finalize`
//! leaves a `processing` row behind. The provider's at-least-once retries
//! normally repair it; this sweep detects rows that have sat past a
//! horizon without repair so operators see them. The raw payload is not
//! retained (only its hash), so the sweep observes and alerts rather than
//! re-dispatching.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Notify;
use tracing::{error, info, warn};

use crate::error::Result;
use crate::ledger::{Ledger, LedgerRow};

/// Reconciliation sweep configuration.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// How often to poll for stuck rows
    pub poll_interval: Duration,
    /// Age past which a `processing` row counts as stuck
    pub horizon: Duration,
    /// Maximum rows to report per poll
    pub batch_size: i64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
            horizon: Duration::from_secs(300),
            batch_size: 50,
        }
    }
}

/// Reconciliation sweep that runs as a background task.
pub struct ReconciliationSweep {
    ledger: Arc<dyn Ledger>,
    config: SweepConfig,
    shutdown: Arc<Notify>,
}

impl ReconciliationSweep {
    /// Create a new sweep over the given ledger.
    pub fn new(ledger: Arc<dyn Ledger>, config: SweepConfig) -> Self {
        Self {
            ledger,
            config,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Get a handle to signal shutdown.
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        self.shutdown.clone()
    }

    /// Run the sweep loop until shutdown is signalled.
    pub async fn run(self) {
        info!(
            poll_interval_secs = self.config.poll_interval.as_secs(),
            horizon_secs = self.config.horizon.as_secs(),
            batch_size = self.config.batch_size,
            "Reconciliation sweep started"
        );

        loop {
            tokio::select! {
                _ = self.shutdown.notified() => {
                    info!("Reconciliation sweep shutting down");
                    break;
                }
                _ = tokio::time::sleep(self.config.poll_interval) => {
                    if let Err(e) = self.sweep_once().await {
                        error!(error = %e, "Reconciliation sweep pass failed");
                    }
                }
            }
        }
    }

    /// Run one sweep pass, returning the stuck rows it flagged.
    pub async fn sweep_once(&self) -> Result<Vec<LedgerRow>> {
        let older_than = Utc::now()
            - chrono::Duration::from_std(self.config.horizon)
                .unwrap_or_else(|_| chrono::Duration::seconds(300));
        let stuck = self
            .ledger
            .stuck_processing(older_than, self.config.batch_size)
            .await?;

        for row in &stuck {
            let age_secs = (Utc::now() - row.received_at).num_seconds();
            warn!(
                event_id = %row.event_id,
                event_type = %row.event_type,
                age_secs,
                "Ledger row stuck in processing; awaiting provider redelivery"
            );
        }

        Ok(stuck)
    }
}
