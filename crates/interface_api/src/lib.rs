//! HTTP API Layer
//!
//! REST surface of the settlement subsystem, built on Axum.
//!
//! # Architecture
//!
//! - **Handlers**: one module per resource group, thin over the domain services
//! - **Middleware**: acting-user resolution and request logging
//! - **DTOs**: request bodies and query strings, validated before use
//! - **Error Handling**: domain errors mapped onto consistent JSON responses
//! - **Webhooks**: outbound HTTP delivery of settlement events
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{create_router, AppState};
//!
//! let state = AppState::new(payables, ledger, audit, webhook, settlement_config);
//! axum::serve(listener, create_router(state)).await?;
//! ```

pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod webhook;

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use core_kernel::Currency;
use domain_ledger::LedgerPort;
use domain_payables::{
    AccrualService, AdjustmentService, AuditSink, BatchService, ExceptionService, InvoiceService,
    PayablesPort, PaymentService, PeriodService, ReconciliationService, SettlementConfig,
    SettlementContext, VendorLedgerService, WebhookDispatcher,
};

use crate::handlers::{books, health, invoices, ledger, payments};
use crate::middleware::{actor_middleware, request_log_middleware};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub payables: Arc<dyn PayablesPort>,
    pub ledger: Arc<dyn LedgerPort>,
    pub ctx: SettlementContext,
    pub payments: PaymentService,
    pub batches: BatchService,
    pub adjustments: AdjustmentService,
    pub accruals: AccrualService,
    pub periods: PeriodService,
    pub reconciliation: ReconciliationService,
    pub invoices: InvoiceService,
    pub exceptions: ExceptionService,
    pub vendor_ledgers: VendorLedgerService,
}

impl AppState {
    /// Wires every service over one shared settlement context
    pub fn new(
        payables: Arc<dyn PayablesPort>,
        ledger: Arc<dyn LedgerPort>,
        audit: Arc<dyn AuditSink>,
        webhook: Arc<dyn WebhookDispatcher>,
        config: SettlementConfig,
    ) -> Self {
        let ctx = SettlementContext::new(payables.clone(), ledger.clone(), audit, webhook, config);
        Self {
            payables,
            ledger,
            payments: PaymentService::new(ctx.clone()),
            batches: BatchService::new(ctx.clone()),
            adjustments: AdjustmentService::new(ctx.clone()),
            accruals: AccrualService::new(ctx.clone()),
            periods: PeriodService::new(ctx.clone()),
            reconciliation: ReconciliationService::new(ctx.clone()),
            invoices: InvoiceService::new(ctx.clone()),
            exceptions: ExceptionService::new(ctx.clone()),
            vendor_ledgers: VendorLedgerService::new(ctx.clone()),
            ctx,
        }
    }

    /// Book currency; request amounts are denominated in it
    pub fn currency(&self) -> Currency {
        self.ctx.config().currency
    }
}

/// Creates the main API router
pub fn create_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let payment_routes = Router::new()
        .route("/", post(payments::create_payment).get(payments::list_payments))
        .route("/:id", get(payments::get_payment).put(payments::update_payment))
        .route("/:id/submit", post(payments::submit_payment))
        .route("/:id/approve", post(payments::approve_payment))
        .route("/:id/cancel", post(payments::cancel_payment));

    let accrual_routes = Router::new()
        .route("/", post(books::create_accrual).get(books::list_accruals))
        .route("/:id/reverse", post(books::reverse_accrual));

    let period_routes = Router::new()
        .route("/", get(books::list_periods))
        .route("/close", post(books::close_period))
        .route("/reopen", post(books::reopen_period));

    let invoice_routes = Router::new()
        .route("/", post(invoices::register_invoice))
        .route("/exceptions", get(invoices::list_exceptions))
        .route("/:id", get(invoices::get_invoice));

    let api_routes = Router::new()
        .nest("/payments", payment_routes)
        .route(
            "/adjustments",
            post(books::create_adjustment).get(books::list_adjustments),
        )
        .nest("/accruals", accrual_routes)
        .route("/batch-payments", post(books::run_batch))
        .route("/batch-payments/:id", get(books::get_batch))
        .nest("/periods", period_routes)
        .route("/reconciliation", post(books::reconcile_statement))
        .route("/journal-entries", get(ledger::list_journal_entries))
        .route("/accounts", get(ledger::list_accounts))
        .route("/accounts/trial-balance", get(ledger::trial_balance))
        .nest("/invoices", invoice_routes)
        .route("/vendors/:id/ledger", get(ledger::vendor_ledger));

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(axum_middleware::from_fn(request_log_middleware))
        .layer(axum_middleware::from_fn(actor_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
