// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Ledgerhook Server - HTTP surface for the webhook processing core.
//!
//! Exposes the inbound webhook endpoint that feeds deliveries into
//! [`ledgerhook_core::processor::WebhookProcessor`], and the outbound
//! Stripe client that attaches derived idempotency keys to side-effecting
//! API calls.
//!
//! Acknowledgement contract (status code only):
//!
//! | Status | Meaning |
//! |--------|---------|
//! | 200 | Durably deduplicated: newly processed, skipped, or ignored |
//! | 400 | Rejected: signature, freshness, or malformed payload |
//! | 500 | Retryable persistence/lock-store failure; provider redelivers |
//!
//! No business branch surfaces as a transport-level error, which keeps
//! provider retry storms off the table.

#![deny(missing_docs)]

/// Inbound webhook routes and application state.
pub mod routes;

/// Outbound Stripe client with idempotency-key derivation.
pub mod stripe;
