// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Inbound webhook routes.

use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use ledgerhook_core::processor::WebhookProcessor;

/// Shared state for webhook handlers.
pub struct AppState {
    /// The processing core shared across all handlers.
    pub processor: Arc<WebhookProcessor>,
}

/// Build the webhook router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/webhooks/stripe", post(stripe_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Handle one inbound Stripe webhook delivery.
///
/// The acknowledgement is a status code only; see the crate docs for the
/// mapping. Raw bytes go to the processor untouched so the signature is
/// verified over exactly what was sent.
async fn stripe_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let Some(signature) = headers
        .get("stripe-signature")
        .and_then(|value| value.to_str().ok())
    else {
        warn!("Delivery without a stripe-signature header");
        return StatusCode::BAD_REQUEST;
    };

    match state.processor.process(&body, signature).await {
        Ok(outcome) => {
            info!(outcome = ?outcome, "Webhook acknowledged");
            StatusCode::OK
        }
        Err(e) if e.is_rejection() => {
            warn!(code = e.error_code(), error = %e, "Webhook rejected");
            StatusCode::BAD_REQUEST
        }
        Err(e) => {
            // Transient store failure: never mask as success, or a
            // storage outage would permanently drop the event.
            error!(code = e.error_code(), error = %e, "Webhook processing failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
