// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Deterministic idempotency-key derivation for outbound requests.
//!
//! When this service issues side-effecting calls to a remote payment API,
//! the caller attaches a key derived here so that its own retries of the
//! same logical operation collapse to one remote operation. The key is a
//! pure function of the operation fingerprint: no randomness, no clock.

use sha2::{Digest, Sha256};

/// Derive a 64-character hex idempotency key from an operation fingerprint.
///
/// The digest is SHA-256 over the purpose and parts joined with `|`.
/// Identical inputs always yield the identical key, across calls and
/// processes; changing any single part changes the key.
///
/// # Example
///
/// ```
/// use ledgerhook_core::keys::derive_idempotency_key;
///
/// let key = derive_idempotency_key("checkout.session", &["order_123", "5000", "usd"]);
/// assert_eq!(key.len(), 64);
/// assert_eq!(key, derive_idempotency_key("checkout.session", &["order_123", "5000", "usd"]));
/// ```
pub fn derive_idempotency_key(purpose: &str, parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(purpose.as_bytes());
    for part in parts {
        hasher.update(b"|");
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}
