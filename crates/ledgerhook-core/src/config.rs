// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration loading from environment variables.

use std::net::SocketAddr;
use std::time::Duration;

/// Ledgerhook configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL. Embedded deployments construct a
    /// [`crate::ledger::SqliteLedger`] directly instead of using this.
    pub database_url: String,
    /// Redis/Valkey connection URL for the lock store
    pub redis_url: String,
    /// Shared secret for inbound signature verification
    pub webhook_secret: String,
    /// Inbound HTTP server address
    pub http_addr: SocketAddr,
    /// Replay-defense window for signed timestamps
    pub signature_tolerance: Duration,
    /// TTL for per-event locks; bounds the worst-case hold time
    pub lock_ttl: Duration,
    /// How often the reconciliation sweep polls for stuck rows
    pub sweep_interval: Duration,
    /// Age past which a `processing` row counts as stuck
    pub sweep_horizon: Duration,
    /// Stripe API key for outbound side-effecting calls
    pub stripe_api_key: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `LEDGERHOOK_DATABASE_URL`: PostgreSQL connection string
    /// - `LEDGERHOOK_WEBHOOK_SECRET`: shared secret for signature verification
    ///
    /// Optional (with defaults):
    /// - `LEDGERHOOK_REDIS_URL`: lock store URL (default: redis://127.0.0.1:6379/0)
    /// - `LEDGERHOOK_HTTP_PORT`: inbound server port (default: 8080)
    /// - `LEDGERHOOK_SIGNATURE_TOLERANCE_SECS`: replay window (default: 300)
    /// - `LEDGERHOOK_LOCK_TTL_SECS`: lock TTL (default: 30)
    /// - `LEDGERHOOK_SWEEP_INTERVAL_SECS`: sweep poll interval (default: 60)
    /// - `LEDGERHOOK_SWEEP_HORIZON_SECS`: stuck-row horizon (default: 300)
    /// - `LEDGERHOOK_STRIPE_API_KEY`: outbound API key (no default)
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("LEDGERHOOK_DATABASE_URL")
            .map_err(|_| ConfigError::Missing("LEDGERHOOK_DATABASE_URL"))?;

        let webhook_secret = std::env::var("LEDGERHOOK_WEBHOOK_SECRET")
            .map_err(|_| ConfigError::Missing("LEDGERHOOK_WEBHOOK_SECRET"))?;

        let redis_url = std::env::var("LEDGERHOOK_REDIS_URL")
            .unwrap_or_else(|_| "redis://127.0.0.1:6379/0".to_string());

        let http_port: u16 = std::env::var("LEDGERHOOK_HTTP_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| {
                ConfigError::Invalid("LEDGERHOOK_HTTP_PORT", "must be a valid port number")
            })?;

        let signature_tolerance = parse_secs("LEDGERHOOK_SIGNATURE_TOLERANCE_SECS", 300)?;
        let lock_ttl = parse_secs("LEDGERHOOK_LOCK_TTL_SECS", 30)?;
        let sweep_interval = parse_secs("LEDGERHOOK_SWEEP_INTERVAL_SECS", 60)?;
        let sweep_horizon = parse_secs("LEDGERHOOK_SWEEP_HORIZON_SECS", 300)?;

        let stripe_api_key = std::env::var("LEDGERHOOK_STRIPE_API_KEY").ok();

        Ok(Self {
            database_url,
            redis_url,
            webhook_secret,
            http_addr: SocketAddr::from(([0, 0, 0, 0], http_port)),
            signature_tolerance,
            lock_ttl,
            sweep_interval,
            sweep_horizon,
            stripe_api_key,
        })
    }
}

fn parse_secs(var: &'static str, default_secs: u64) -> Result<Duration, ConfigError> {
    let secs: u64 = std::env::var(var)
        .unwrap_or_else(|_| default_secs.to_string())
        .parse()
        .map_err(|_| ConfigError::Invalid(var, "must be a non-negative integer of seconds"))?;
    Ok(Duration::from_secs(secs))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),

    /// An environment variable has an invalid value.
    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, &'static str),
}
