// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Event extraction and payload hashing.
//!
//! Only the stable envelope is decoded here: the provider-assigned event
//! id, the event type, and the business object. Everything else in the
//! payload is opaque to the core; the raw bytes are captured as a SHA-256
//! digest for audit and tamper evidence.

use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::error::{Result, WebhookError};

/// An inbound event envelope, decoded from raw delivery bytes.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    /// Provider-assigned, globally unique event id (e.g. `evt_123`).
    pub id: String,
    /// Event type (e.g. `checkout.session.completed`).
    #[serde(rename = "type")]
    pub event_type: String,
    /// Event data containing the business object.
    #[serde(default)]
    pub data: EventData,
}

/// The `data` element of an event envelope.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventData {
    /// The business object the event describes. Shape depends on the
    /// event type; unknown types carry it through untouched.
    #[serde(default)]
    pub object: serde_json::Value,
}

impl WebhookEvent {
    /// Decode an event envelope from raw delivery bytes.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookError::MalformedEvent`] if the bytes are not valid
    /// JSON or the envelope lacks a non-empty `id` or `type`.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let event: WebhookEvent = serde_json::from_slice(raw)?;
        if event.id.is_empty() {
            return Err(WebhookError::MalformedEvent {
                reason: "event id is empty".to_string(),
            });
        }
        if event.event_type.is_empty() {
            return Err(WebhookError::MalformedEvent {
                reason: "event type is empty".to_string(),
            });
        }
        Ok(event)
    }
}

/// SHA-256 hex digest of the raw delivery bytes.
pub fn payload_hash(raw: &[u8]) -> String {
    hex::encode(Sha256::digest(raw))
}
