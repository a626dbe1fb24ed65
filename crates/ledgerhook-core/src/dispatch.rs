// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Maps event types to idempotent side-effect plans.
//!
//! Planning is pure: it inspects the decoded event and produces at most
//! one [`SideEffect`], which the ledger later applies as an insert-if-absent
//! keyed by the business identifier embedded in the payload, never the
//! transport-level event id. The same business fact redelivered under a
//! different event id therefore still lands exactly once.
//!
//! Unknown event types plan nothing and are acknowledged ("ignore unknown,
//! don't fail"), keeping the service forward-compatible with event types
//! the provider introduces later.

use crate::error::{Result, WebhookError};
use crate::event::WebhookEvent;

/// An idempotent business write, keyed by its own business identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SideEffect {
    /// Record a completed checkout as a payment row keyed by session id.
    RecordPayment {
        /// Checkout session id (business identifier, unique key).
        session_id: String,
        /// Customer email, when the provider includes it.
        customer_email: Option<String>,
        /// Total amount in the smallest currency unit.
        amount_total: Option<i64>,
        /// ISO currency code.
        currency: Option<String>,
    },

    /// Record a succeeded payment intent keyed by intent id.
    RecordPaymentIntent {
        /// Payment intent id (business identifier, unique key).
        intent_id: String,
        /// Amount received in the smallest currency unit.
        amount_received: Option<i64>,
        /// ISO currency code.
        currency: Option<String>,
    },
}

/// Plan the side effect for an event, if its type is one we act on.
///
/// # Errors
///
/// Returns [`WebhookError::MalformedEvent`] when a known event type is
/// missing the business identifier its side effect is keyed by.
pub fn plan(event: &WebhookEvent) -> Result<Option<SideEffect>> {
    let object = &event.data.object;
    match event.event_type.as_str() {
        "checkout.session.completed" => {
            let session_id = require_object_id(event, "session id")?;
            Ok(Some(SideEffect::RecordPayment {
                session_id,
                customer_email: object
                    .pointer("/customer_details/email")
                    .and_then(|v| v.as_str())
                    .map(str::to_string),
                amount_total: object.get("amount_total").and_then(|v| v.as_i64()),
                currency: object
                    .get("currency")
                    .and_then(|v| v.as_str())
                    .map(str::to_string),
            }))
        }
        "payment_intent.succeeded" => {
            let intent_id = require_object_id(event, "payment intent id")?;
            Ok(Some(SideEffect::RecordPaymentIntent {
                intent_id,
                amount_received: object.get("amount_received").and_then(|v| v.as_i64()),
                currency: object
                    .get("currency")
                    .and_then(|v| v.as_str())
                    .map(str::to_string),
            }))
        }
        // Accept harmlessly, do nothing.
        _ => Ok(None),
    }
}

fn require_object_id(event: &WebhookEvent, what: &str) -> Result<String> {
    event
        .data
        .object
        .get("id")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| WebhookError::MalformedEvent {
            reason: format!("'{}' event is missing its {}", event.event_type, what),
        })
}
