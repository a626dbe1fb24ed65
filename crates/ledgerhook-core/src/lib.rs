// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Ledgerhook Core - Idempotent Webhook Processing
//!
//! This crate turns at-least-once webhook delivery into exactly-once business
//! effects. Inbound events are signature-verified, deduplicated through a
//! durable event ledger, and dispatched as idempotent upserts keyed by
//! business identifiers. A short-lived distributed lock reduces contention
//! between concurrent deliveries of the same event; the ledger, not the lock,
//! is the source of correctness.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Payment Provider (Stripe)                  │
//! │                 at-least-once webhook delivery               │
//! └─────────────────────────────────────────────────────────────┘
//!                              │ HTTP POST (ledgerhook-server)
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      WebhookProcessor                        │
//! │   verify ─▶ lock ─▶ ledger lookup ─▶ dispatch + finalize     │
//! └─────────────────────────────────────────────────────────────┘
//!           │                        │
//!           ▼                        ▼
//! ┌───────────────────┐   ┌─────────────────────────────────────┐
//! │   Redis/Valkey    │   │          PostgreSQL / SQLite         │
//! │  (SET NX EX lock) │   │  webhook_events + payments tables    │
//! └───────────────────┘   └─────────────────────────────────────┘
//! ```
//!
//! # Event Status State Machine
//!
//! ```text
//!    ┌────────┐  begin_processing   ┌────────────┐  finalize   ┌───────────┐
//!    │ absent │────────────────────▶│ processing │────────────▶│ processed │
//!    └────────┘  (insert if absent) └────────────┘ (one txn    └───────────┘
//!                                                  with side
//!                                                  effects)
//! ```
//!
//! The transition is monotonic. A `processed` row means the side effects are
//! durably applied and must never be reapplied; a `processing` row with no
//! live lock is re-entrant because every side-effect write is idempotent.
//!
//! # Processing Outcomes
//!
//! | Outcome | Meaning |
//! |---------|---------|
//! | `Applied` | Side effects were written and the event finalized |
//! | `AlreadyProcessed` | Ledger short-circuit, nothing written |
//! | `DuplicateInFlight` | Another worker holds the lock, nothing written |
//! | `Ignored` | Unknown event type, finalized with no side effects |
//!
//! All four acknowledge as success at the transport. Only signature,
//! freshness, malformed-event, and persistence failures surface as errors.
//!
//! # Configuration
//!
//! Configuration is loaded from environment variables:
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `LEDGERHOOK_DATABASE_URL` | Yes | - | PostgreSQL connection string |
//! | `LEDGERHOOK_WEBHOOK_SECRET` | Yes | - | Shared secret for signature verification |
//! | `LEDGERHOOK_REDIS_URL` | No | `redis://127.0.0.1:6379/0` | Lock store connection string |
//! | `LEDGERHOOK_HTTP_PORT` | No | `8080` | Inbound webhook server port |
//! | `LEDGERHOOK_SIGNATURE_TOLERANCE_SECS` | No | `300` | Replay-defense window |
//! | `LEDGERHOOK_LOCK_TTL_SECS` | No | `30` | Worst-case lock hold time |
//! | `LEDGERHOOK_SWEEP_INTERVAL_SECS` | No | `60` | Reconciliation poll interval |
//! | `LEDGERHOOK_SWEEP_HORIZON_SECS` | No | `300` | Age before a `processing` row counts as stuck |
//! | `LEDGERHOOK_STRIPE_API_KEY` | No | - | Outbound Stripe API key |
//!
//! # Modules
//!
//! - [`config`]: Configuration from environment variables
//! - [`dispatch`]: Event type to side-effect planning
//! - [`error`]: Error taxonomy with transport classification
//! - [`event`]: Event extraction and payload hashing
//! - [`keys`]: Outbound idempotency-key derivation
//! - [`ledger`]: Durable dedup state machine (Postgres + SQLite)
//! - [`lock`]: TTL-bounded distributed locks (Redis + in-memory)
//! - [`migrations`]: Embedded schema migrations
//! - [`processor`]: The orchestrator
//! - [`signature`]: Inbound signature verification
//! - [`sweep`]: Stuck-row reconciliation sweep

#![deny(missing_docs)]

/// Configuration loaded from environment variables.
pub mod config;

/// Maps event types to idempotent side-effect plans.
pub mod dispatch;

/// Error taxonomy for webhook processing.
pub mod error;

/// Event extraction and payload hashing.
pub mod event;

/// Deterministic idempotency-key derivation for outbound calls.
pub mod keys;

/// Durable event ledger backends and the `Ledger` trait.
pub mod ledger;

/// Distributed lock manager backends and the `LockManager` trait.
pub mod lock;

/// Embedded database migrations for both ledger backends.
pub mod migrations;

/// Webhook processing orchestrator.
pub mod processor;

/// Inbound webhook signature verification.
pub mod signature;

/// Reconciliation sweep for rows stuck in `processing`.
pub mod sweep;
