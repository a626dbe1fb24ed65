// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Inbound webhook signature verification.
//!
//! Implements the Stripe signing scheme: the `stripe-signature` header
//! carries `t=<unix-seconds>,v1=<hex hmac>` where the MAC is HMAC-SHA256
//! over `"{t}.{raw_payload}"` with the shared endpoint secret. Multiple
//! `v1` entries may be present (secret rotation); any match passes.
//!
//! Verification fails closed: any error here aborts processing before a
//! single ledger or side-effect write. The tolerance window additionally
//! rejects otherwise-valid signatures whose embedded timestamp is too old,
//! defending against replay of captured requests.

use std::time::Duration;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{Result, WebhookError};

type HmacSha256 = Hmac<Sha256>;

/// Verifies inbound webhook signatures against a shared secret.
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    secret: String,
    tolerance: Duration,
}

impl SignatureVerifier {
    /// Create a verifier with the given shared secret and tolerance window.
    pub fn new(secret: impl Into<String>, tolerance: Duration) -> Self {
        Self {
            secret: secret.into(),
            tolerance,
        }
    }

    /// Verify a signature header against the raw payload bytes.
    ///
    /// # Errors
    ///
    /// - [`WebhookError::InvalidSignature`] if the header is malformed or
    ///   no `v1` entry matches the payload MAC.
    /// - [`WebhookError::StaleSignature`] if the MAC is valid but the
    ///   signed timestamp is older than the tolerance window.
    pub fn verify(&self, payload: &[u8], signature_header: &str) -> Result<()> {
        self.verify_at(payload, signature_header, Utc::now())
    }

    /// Verify against an explicit current time. Exposed so tests can pin
    /// the clock.
    pub fn verify_at(
        &self,
        payload: &[u8],
        signature_header: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let (timestamp_raw, candidates) = parse_header(signature_header)?;

        let timestamp: i64 = timestamp_raw.parse().map_err(|_| {
            WebhookError::InvalidSignature {
                reason: "timestamp is not an integer".to_string(),
            }
        })?;

        let mac = self.payload_mac(timestamp_raw, payload);
        let matched = candidates.iter().any(|candidate| {
            hex::decode(candidate)
                .ok()
                .is_some_and(|sig| mac.clone().verify_slice(&sig).is_ok())
        });
        if !matched {
            return Err(WebhookError::InvalidSignature {
                reason: "no v1 entry matches the payload".to_string(),
            });
        }

        // MAC is genuine; now enforce freshness. Future-dated timestamps
        // are tolerated (clock skew), only age is bounded.
        let age_secs = now.timestamp() - timestamp;
        if age_secs > self.tolerance.as_secs() as i64 {
            return Err(WebhookError::StaleSignature {
                age_secs,
                tolerance_secs: self.tolerance.as_secs() as i64,
            });
        }

        Ok(())
    }

    fn payload_mac(&self, timestamp_raw: &str, payload: &[u8]) -> HmacSha256 {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(timestamp_raw.as_bytes());
        mac.update(b".");
        mac.update(payload);
        mac
    }
}

/// Produce a valid signature header for the given payload and timestamp.
///
/// Used by tests and local tooling to construct deliveries that pass
/// [`SignatureVerifier::verify`].
pub fn sign_header(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let timestamp_raw = timestamp.to_string();
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(timestamp_raw.as_bytes());
    mac.update(b".");
    mac.update(payload);
    format!(
        "t={},v1={}",
        timestamp_raw,
        hex::encode(mac.finalize().into_bytes())
    )
}

/// Split the header into the raw timestamp and all v1 signature candidates.
fn parse_header(header: &str) -> Result<(&str, Vec<&str>)> {
    let mut timestamp = None;
    let mut candidates = Vec::new();

    for item in header.split(',') {
        match item.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => candidates.push(value),
            // Unknown schemes (e.g. v0) are ignored, like the reference SDK.
            Some(_) => {}
            None => {
                return Err(WebhookError::InvalidSignature {
                    reason: format!("malformed header element '{}'", item),
                });
            }
        }
    }

    let timestamp = timestamp.ok_or_else(|| WebhookError::InvalidSignature {
        reason: "missing timestamp element".to_string(),
    })?;
    if candidates.is_empty() {
        return Err(WebhookError::InvalidSignature {
            reason: "missing v1 signature element".to_string(),
        });
    }

    Ok((timestamp, candidates))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test123secret456";
    const PAYLOAD: &[u8] = b"{\"id\":\"evt_123\",\"type\":\"checkout.session.completed\"}";

    fn verifier() -> SignatureVerifier {
        SignatureVerifier::new(SECRET, Duration::from_secs(300))
    }

    #[test]
    fn test_valid_signature_accepted() {
        let now = Utc::now();
        let header = sign_header(PAYLOAD, SECRET, now.timestamp());
        verifier().verify_at(PAYLOAD, &header, now).unwrap();
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let now = Utc::now();
        let header = sign_header(PAYLOAD, "whsec_other", now.timestamp());
        let err = verifier().verify_at(PAYLOAD, &header, now).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_SIGNATURE");
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let now = Utc::now();
        let header = sign_header(PAYLOAD, SECRET, now.timestamp());
        let mut tampered = PAYLOAD.to_vec();
        tampered[10] ^= 0x01;
        let err = verifier().verify_at(&tampered, &header, now).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_SIGNATURE");
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let now = Utc::now();
        // Valid signature, but signed 10 minutes ago (tolerance is 5)
        let header = sign_header(PAYLOAD, SECRET, now.timestamp() - 600);
        let err = verifier().verify_at(PAYLOAD, &header, now).unwrap_err();
        assert_eq!(err.error_code(), "STALE_SIGNATURE");
        assert!(matches!(
            err,
            WebhookError::StaleSignature {
                age_secs: 600,
                tolerance_secs: 300
            }
        ));
    }

    #[test]
    fn test_timestamp_at_tolerance_boundary_accepted() {
        let now = Utc::now();
        let header = sign_header(PAYLOAD, SECRET, now.timestamp() - 300);
        verifier().verify_at(PAYLOAD, &header, now).unwrap();
    }

    #[test]
    fn test_future_timestamp_tolerated() {
        let now = Utc::now();
        let header = sign_header(PAYLOAD, SECRET, now.timestamp() + 60);
        verifier().verify_at(PAYLOAD, &header, now).unwrap();
    }

    #[test]
    fn test_missing_timestamp_rejected() {
        let err = verifier()
            .verify_at(PAYLOAD, "v1=abcdef", Utc::now())
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_SIGNATURE");
    }

    #[test]
    fn test_missing_v1_rejected() {
        let err = verifier()
            .verify_at(PAYLOAD, "t=1234567890", Utc::now())
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_SIGNATURE");
    }

    #[test]
    fn test_garbage_header_rejected() {
        let err = verifier().verify_at(PAYLOAD, "garbage", Utc::now()).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_SIGNATURE");
    }

    #[test]
    fn test_non_hex_signature_rejected() {
        let now = Utc::now();
        let header = format!("t={},v1=not-hex-at-all", now.timestamp());
        let err = verifier().verify_at(PAYLOAD, &header, now).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_SIGNATURE");
    }

    #[test]
    fn test_second_v1_entry_matches_after_rotation() {
        let now = Utc::now();
        let good = sign_header(PAYLOAD, SECRET, now.timestamp());
        let good_sig = good.split_once(",v1=").unwrap().1.to_string();
        let stale_key_sig = sign_header(PAYLOAD, "whsec_rotated_out", now.timestamp());
        let stale_sig = stale_key_sig.split_once(",v1=").unwrap().1.to_string();
        let header = format!("t={},v1={},v1={}", now.timestamp(), stale_sig, good_sig);
        verifier().verify_at(PAYLOAD, &header, now).unwrap();
    }
}
