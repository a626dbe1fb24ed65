// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for ledgerhook-core.
//!
//! Only two classes of failure may surface to the transport: rejections
//! (signature, freshness, malformed payload) which the provider retries
//! within its window, and retryable persistence failures. Every other
//! branch of processing converges to a success acknowledgement and is
//! modeled as a [`crate::processor::ProcessOutcome`], not an error.

use std::fmt;

/// Result type using WebhookError
pub type Result<T> = std::result::Result<T, WebhookError>;

/// Errors that can occur while processing an inbound webhook delivery.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum WebhookError {
    /// The signature header was missing, malformed, or did not match.
    InvalidSignature {
        /// Why verification failed.
        reason: String,
    },

    /// The signature was otherwise valid but its timestamp is too old.
    StaleSignature {
        /// Age of the signed timestamp in seconds.
        age_secs: i64,
        /// Configured tolerance window in seconds.
        tolerance_secs: i64,
    },

    /// The payload could not be parsed into an event, or a known event
    /// type is missing its business identifier.
    MalformedEvent {
        /// What was wrong with the payload.
        reason: String,
    },

    /// A ledger or side-effect write failed.
    Database {
        /// The operation that failed.
        operation: String,
        /// Error details.
        details: String,
    },

    /// The lock store could not be reached.
    LockBackend {
        /// Error details.
        details: String,
    },
}

impl WebhookError {
    /// Get the error code string for this error type.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidSignature { .. } => "INVALID_SIGNATURE",
            Self::StaleSignature { .. } => "STALE_SIGNATURE",
            Self::MalformedEvent { .. } => "MALFORMED_EVENT",
            Self::Database { .. } => "DATABASE_ERROR",
            Self::LockBackend { .. } => "LOCK_BACKEND_ERROR",
        }
    }

    /// True for failures the caller should surface as a rejection (4xx)
    /// so the provider redelivers within its retry window. False for
    /// transient persistence failures, which must propagate as retryable
    /// server errors and never be masked as success.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::InvalidSignature { .. }
                | Self::StaleSignature { .. }
                | Self::MalformedEvent { .. }
        )
    }
}

impl fmt::Display for WebhookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSignature { reason } => {
                write!(f, "Invalid webhook signature: {}", reason)
            }
            Self::StaleSignature {
                age_secs,
                tolerance_secs,
            } => {
                write!(
                    f,
                    "Stale webhook signature: timestamp is {}s old, tolerance is {}s",
                    age_secs, tolerance_secs
                )
            }
            Self::MalformedEvent { reason } => {
                write!(f, "Malformed event payload: {}", reason)
            }
            Self::Database { operation, details } => {
                write!(f, "Database error during '{}': {}", operation, details)
            }
            Self::LockBackend { details } => {
                write!(f, "Lock store error: {}", details)
            }
        }
    }
}

impl std::error::Error for WebhookError {}

impl From<sqlx::Error> for WebhookError {
    fn from(err: sqlx::Error) -> Self {
        WebhookError::Database {
            operation: "query".to_string(),
            details: err.to_string(),
        }
    }
}

impl From<redis::RedisError> for WebhookError {
    fn from(err: redis::RedisError) -> Self {
        WebhookError::LockBackend {
            details: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for WebhookError {
    fn from(err: serde_json::Error) -> Self {
        WebhookError::MalformedEvent {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let test_cases = vec![
            (
                WebhookError::InvalidSignature {
                    reason: "no v1 entry".to_string(),
                },
                "INVALID_SIGNATURE",
            ),
            (
                WebhookError::StaleSignature {
                    age_secs: 600,
                    tolerance_secs: 300,
                },
                "STALE_SIGNATURE",
            ),
            (
                WebhookError::MalformedEvent {
                    reason: "missing id".to_string(),
                },
                "MALFORMED_EVENT",
            ),
            (
                WebhookError::Database {
                    operation: "insert".to_string(),
                    details: "connection refused".to_string(),
                },
                "DATABASE_ERROR",
            ),
            (
                WebhookError::LockBackend {
                    details: "connection reset".to_string(),
                },
                "LOCK_BACKEND_ERROR",
            ),
        ];

        for (error, expected_code) in test_cases {
            assert_eq!(
                error.error_code(),
                expected_code,
                "Error {:?} should have code {}",
                error,
                expected_code
            );
            assert!(!error.to_string().is_empty());
        }
    }

    #[test]
    fn test_rejection_classification() {
        assert!(
            WebhookError::InvalidSignature {
                reason: "x".to_string()
            }
            .is_rejection()
        );
        assert!(
            WebhookError::StaleSignature {
                age_secs: 301,
                tolerance_secs: 300
            }
            .is_rejection()
        );
        assert!(
            WebhookError::MalformedEvent {
                reason: "x".to_string()
            }
            .is_rejection()
        );
        assert!(
            !WebhookError::Database {
                operation: "insert".to_string(),
                details: "x".to_string()
            }
            .is_rejection()
        );
        assert!(
            !WebhookError::LockBackend {
                details: "x".to_string()
            }
            .is_rejection()
        );
    }

    #[test]
    fn test_error_display() {
        let err = WebhookError::StaleSignature {
            age_secs: 600,
            tolerance_secs: 300,
        };
        assert_eq!(
            err.to_string(),
            "Stale webhook signature: timestamp is 600s old, tolerance is 300s"
        );

        let err = WebhookError::Database {
            operation: "finalize".to_string(),
            details: "connection refused".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Database error during 'finalize': connection refused"
        );
    }

    #[test]
    fn test_from_serde_json_error() {
        let parse_err = serde_json::from_slice::<serde_json::Value>(b"not json").unwrap_err();
        let err: WebhookError = parse_err.into();
        assert_eq!(err.error_code(), "MALFORMED_EVENT");
        assert!(err.is_rejection());
    }
}
