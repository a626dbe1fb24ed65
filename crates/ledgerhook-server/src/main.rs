// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Ledgerhook Server - Idempotent Webhook Processing
//!
//! The server is responsible for:
//! - Inbound webhook endpoint (signature-gated, at-least-once safe)
//! - Reconciliation sweep (flags events stuck in `processing`)
//!
//! Note: Outbound Stripe calls are made by services embedding
//! [`ledgerhook_server::stripe::StripeClient`]; this binary only
//! consumes deliveries.

use std::sync::Arc;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use tracing::{error, info};

use ledgerhook_core::config::Config;
use ledgerhook_core::ledger::PostgresLedger;
use ledgerhook_core::lock::RedisLockManager;
use ledgerhook_core::migrations;
use ledgerhook_core::processor::WebhookProcessor;
use ledgerhook_core::signature::SignatureVerifier;
use ledgerhook_core::sweep::{ReconciliationSweep, SweepConfig};
use ledgerhook_server::routes::{self, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (from crate directory or parent directories)
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ledgerhook_core=info".parse().unwrap())
                .add_directive("ledgerhook_server=info".parse().unwrap()),
        )
        .init();

    info!("Starting Ledgerhook Server");

    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Configuration error: {}", e);
        e
    })?;

    info!(
        http_addr = %config.http_addr,
        signature_tolerance_secs = config.signature_tolerance.as_secs(),
        lock_ttl_secs = config.lock_ttl.as_secs(),
        "Configuration loaded"
    );

    // Connect to database
    info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;

    info!("Database connection established");

    // Verify connection
    let row: (i32,) = sqlx::query_as("SELECT 1").fetch_one(&pool).await?;
    info!(result = row.0, "Database health check passed");

    info!("Running database migrations...");
    migrations::run_postgres(&pool).await?;
    info!("Migrations completed");

    // Connect to the lock store
    info!("Connecting to lock store...");
    let locks = Arc::new(RedisLockManager::connect(&config.redis_url).await?);
    info!("Lock store connection established");

    // Assemble the processing core
    let ledger = Arc::new(PostgresLedger::new(pool.clone()));
    let verifier = SignatureVerifier::new(&config.webhook_secret, config.signature_tolerance);
    let processor = Arc::new(WebhookProcessor::new(
        verifier,
        locks,
        ledger.clone(),
        config.lock_ttl,
    ));

    info!("Ledgerhook Server initialized successfully");

    // Start the reconciliation sweep (flags events stuck in `processing`)
    let sweep = ReconciliationSweep::new(
        ledger,
        SweepConfig {
            poll_interval: config.sweep_interval,
            horizon: config.sweep_horizon,
            ..SweepConfig::default()
        },
    );
    let sweep_shutdown = sweep.shutdown_handle();
    let sweep_handle = tokio::spawn(sweep.run());

    // Start the inbound webhook server
    let app = routes::router(Arc::new(AppState { processor }));
    let listener = tokio::net::TcpListener::bind(config.http_addr).await?;
    info!(addr = %config.http_addr, "Webhook endpoint listening");
    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Webhook server error: {}", e);
        }
    });

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutting down...");

    // Let the sweep finish its current pass, then cancel the server
    sweep_shutdown.notify_one();
    let _ = sweep_handle.await;
    server_handle.abort();

    pool.close().await;
    info!("Shutdown complete");

    Ok(())
}
