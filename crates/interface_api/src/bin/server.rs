//! Settlement API - Server Binary
//!
//! Starts the HTTP API and the scheduled-payment drain.
//!
//! # Usage
//!
//! ```bash
//! # Run with default configuration
//! cargo run --bin settlement-api
//!
//! # Run with environment variables
//! API_PORT=8080 API_DATABASE_URL=postgres://... cargo run --bin settlement-api
//! ```
//!
//! # Environment Variables
//!
//! * `API_HOST` / `API_PORT` - Listen address (default: 0.0.0.0:8080)
//! * `API_DATABASE_URL` - PostgreSQL connection string (`DATABASE_URL` also accepted)
//! * `API_LOG_LEVEL` - Log level or filter directive (default: info)
//! * `API_LOG_JSON` - Emit JSON log lines (default: false)
//! * `API_SCHEDULER_INTERVAL_SECS` - Seconds between scheduled-payment sweeps (default: 60)
//! * `API_WEBHOOK_URL` - Endpoint receiving settlement events (unset disables webhooks)
//! * `API_APPROVAL_THRESHOLD` - Payments at or above this wait for approval (default: 150000)
//! * `API_BASE_CURRENCY` - Book currency (default: USD)

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use domain_ledger::LedgerBootstrap;
use domain_payables::PaymentService;
use infra_db::{
    create_pool, run_migrations, DatabaseConfig, PostgresAuditSink, PostgresLedgerAdapter,
    PostgresPayablesAdapter,
};
use interface_api::{config::ApiConfig, create_router, webhook::HttpWebhookDispatcher, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let config = load_config();
    init_tracing(&config.log_level, config.log_json);
    let settlement = config.settlement().context("invalid settlement configuration")?;

    tracing::info!(
        host = %config.host,
        port = %config.port,
        currency = %settlement.currency,
        "Starting settlement API server"
    );

    let pool = create_pool(DatabaseConfig::new(config.database_url.clone()))
        .await
        .context("database connection failed")?;
    run_migrations(&pool).await.context("database migrations failed")?;

    let payables = Arc::new(PostgresPayablesAdapter::new(pool.clone()));
    let ledger = Arc::new(PostgresLedgerAdapter::new(pool.clone()));
    let audit = Arc::new(PostgresAuditSink::new(pool));

    let created = LedgerBootstrap::new(ledger.clone(), settlement.currency)
        .initialize()
        .await
        .context("chart of accounts bootstrap failed")?;
    tracing::info!(created, "Chart of accounts ready");

    let webhook = HttpWebhookDispatcher::new(config.webhook_url.clone(), config.webhook_timeout());
    if !webhook.is_enabled() {
        tracing::info!("No webhook URL configured; outbound events are disabled");
    }

    let state = AppState::new(payables, ledger, audit, Arc::new(webhook), settlement);
    spawn_scheduler(state.payments.clone(), config.scheduler_interval());

    let app = create_router(state);
    let addr: SocketAddr = config
        .server_addr()
        .parse()
        .with_context(|| format!("invalid listen address {}", config.server_addr()))?;

    tracing::info!(%addr, "Server listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Loads API configuration, falling back to defaults plus `DATABASE_URL`
fn load_config() -> ApiConfig {
    ApiConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Ignoring unreadable API_* configuration: {}", e);
        let defaults = ApiConfig::default();
        ApiConfig {
            database_url: std::env::var("DATABASE_URL").unwrap_or(defaults.database_url.clone()),
            ..defaults
        }
    })
}

fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init();
    }
}

/// Drains due scheduled payments on a fixed interval
///
/// Each sweep runs to completion before the next tick is awaited, so sweeps
/// never overlap.
fn spawn_scheduler(payments: PaymentService, interval: std::time::Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match payments.process_scheduled(Utc::now().date_naive()).await {
                Ok(report) if report.examined == 0 => tracing::debug!("No scheduled payments due"),
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "Scheduled payment sweep failed"),
            }
        }
    });
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
