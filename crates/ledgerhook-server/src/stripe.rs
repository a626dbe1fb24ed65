// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Outbound Stripe client.
//!
//! Every side-effecting call carries an `Idempotency-Key` header derived
//! from the logical operation's fingerprint, so our own retries collapse
//! to one remote operation. The key is deterministic: retrying the same
//! order with the same amount always hits the same remote idempotency
//! slot.

use ledgerhook_core::keys::derive_idempotency_key;

const DEFAULT_BASE_URL: &str = "https://api.stripe.com";

/// A request to create a hosted checkout session.
#[derive(Debug, Clone)]
pub struct CheckoutSessionRequest {
    /// Our order id; doubles as the client reference id.
    pub order_id: String,
    /// Amount in the smallest currency unit.
    pub amount_cents: i64,
    /// ISO currency code.
    pub currency: String,
    /// Where the customer lands after paying.
    pub success_url: String,
    /// Where the customer lands after cancelling.
    pub cancel_url: String,
}

impl CheckoutSessionRequest {
    /// The idempotency key for this logical operation.
    ///
    /// A pure function of order id, amount, and currency; URLs are
    /// presentation detail and deliberately excluded.
    pub fn idempotency_key(&self) -> String {
        derive_idempotency_key(
            "checkout.session",
            &[
                &self.order_id,
                &self.amount_cents.to_string(),
                &self.currency,
            ],
        )
    }
}

/// Errors from the outbound Stripe client.
#[derive(Debug, thiserror::Error)]
pub enum StripeClientError {
    /// The HTTP request itself failed.
    #[error("request to Stripe failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Stripe answered with a non-success status.
    #[error("Stripe returned {status}: {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },
}

/// Thin client for the Stripe REST API.
#[derive(Debug, Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl StripeClient {
    /// Create a client against the production Stripe API.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Create a client against an alternate base URL (tests, mocks).
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }

    /// Create a checkout session for an order.
    ///
    /// Safe to retry: the derived `Idempotency-Key` makes Stripe
    /// deduplicate repeated calls for the same logical operation.
    pub async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<serde_json::Value, StripeClientError> {
        let key = request.idempotency_key();
        let unit_amount = request.amount_cents.to_string();
        let product_name = format!("Order {}", request.order_id);

        let params: [(&str, &str); 8] = [
            ("mode", "payment"),
            ("success_url", &request.success_url),
            ("cancel_url", &request.cancel_url),
            ("client_reference_id", &request.order_id),
            ("line_items[0][price_data][currency]", &request.currency),
            ("line_items[0][price_data][product_data][name]", &product_name),
            ("line_items[0][price_data][unit_amount]", &unit_amount),
            ("line_items[0][quantity]", "1"),
        ];

        let response = self
            .http
            .post(format!("{}/v1/checkout/sessions", self.base_url))
            .bearer_auth(&self.api_key)
            .header("Idempotency-Key", &key)
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StripeClientError::Api {
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(order_id: &str, amount_cents: i64) -> CheckoutSessionRequest {
        CheckoutSessionRequest {
            order_id: order_id.to_string(),
            amount_cents,
            currency: "usd".to_string(),
            success_url: "https://shop.example.com/success".to_string(),
            cancel_url: "https://shop.example.com/cancel".to_string(),
        }
    }

    #[test]
    fn test_idempotency_key_is_stable_across_url_changes() {
        let mut a = request("order_123", 5000);
        let key = a.idempotency_key();
        a.success_url = "https://elsewhere.example.com/done".to_string();
        assert_eq!(a.idempotency_key(), key);
    }

    #[test]
    fn test_idempotency_key_differs_per_operation() {
        assert_ne!(
            request("order_123", 5000).idempotency_key(),
            request("order_456", 5000).idempotency_key()
        );
        assert_ne!(
            request("order_123", 5000).idempotency_key(),
            request("order_123", 5001).idempotency_key()
        );
    }
}
