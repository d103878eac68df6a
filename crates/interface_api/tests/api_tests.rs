//! Router tests over the in-memory ports

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tower::ServiceExt;

use core_kernel::Currency;
use domain_ledger::ports::mock::MockLedgerPort;
use domain_ledger::LedgerBootstrap;
use domain_payables::audit::mock::RecordingAuditSink;
use domain_payables::ports::mock::MockPayablesPort;
use domain_payables::webhook::mock::RecordingWebhookDispatcher;
use domain_payables::{PayablesPort, PurchaseOrder, SettlementConfig, Vendor};
use interface_api::middleware::ACTOR_HEADER;
use interface_api::{create_router, AppState};
use test_utils::{MoneyFixtures, PurchaseOrderBuilder, VendorBuilder};

struct TestApp {
    router: Router,
    payables: Arc<MockPayablesPort>,
}

impl TestApp {
    async fn new() -> Self {
        let payables = Arc::new(MockPayablesPort::new());
        let ledger = Arc::new(MockLedgerPort::new());
        LedgerBootstrap::new(ledger.clone(), Currency::USD)
            .initialize()
            .await
            .unwrap();
        let state = AppState::new(
            payables.clone(),
            ledger,
            Arc::new(RecordingAuditSink::new()),
            Arc::new(RecordingWebhookDispatcher::new()),
            SettlementConfig::default(),
        );
        Self {
            router: create_router(state),
            payables,
        }
    }

    async fn send(&self, method: Method, uri: &str, body: Option<Value>, actor: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(actor) = actor {
            builder = builder.header(ACTOR_HEADER, actor);
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.dispatch(request).await
    }

    async fn dispatch(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None, None).await
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(body), None).await
    }

    /// A vendor with a delivered purchase order covering `amount`
    async fn supplier(&self, amount: Decimal) -> (Vendor, PurchaseOrder) {
        let vendor = VendorBuilder::new().build();
        self.payables.save_vendor(&vendor).await.unwrap();
        let order = PurchaseOrderBuilder::new(vendor.id)
            .with_total(MoneyFixtures::usd(amount))
            .build();
        self.payables.save_purchase_order(&order).await.unwrap();
        (vendor, order)
    }

    /// Registers an invoice over HTTP and returns its JSON
    async fn invoice(&self, amount: Decimal) -> Value {
        let (vendor, order) = self.supplier(amount).await;
        let today = Utc::now().date_naive();
        let (status, body) = self
            .post(
                "/api/v1/invoices",
                json!({
                    "invoice_number": format!("INV-{}", order.po_number),
                    "vendor_id": vendor.id,
                    "purchase_order_id": order.id,
                    "invoice_date": today,
                    "due_date": today + Duration::days(30),
                    "amount": amount.to_string(),
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body
    }
}

fn amount_of(money: &Value) -> Decimal {
    money["amount"].as_str().unwrap().parse().unwrap()
}

#[tokio::test]
async fn test_health_and_readiness() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = app.get("/health/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
    assert_eq!(body["adapters"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_payment_below_threshold_settles_immediately() {
    let app = TestApp::new().await;
    let invoice = app.invoice(dec!(1200)).await;

    let (status, payment) = app
        .post(
            "/api/v1/payments",
            json!({ "invoice_id": invoice["id"], "amount": "1200", "method": "BankTransfer" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", payment);
    assert_eq!(payment["payment_status"], "Success");
    assert_eq!(payment["approval_status"], "N/A");

    let uri = format!("/api/v1/invoices/{}", invoice["id"].as_str().unwrap());
    let (status, stored) = app.get(&uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(amount_of(&stored["paid_amount"]), dec!(1200));

    let (_, entries) = app.get("/api/v1/journal-entries?reference_type=payment").await;
    assert_eq!(entries.as_array().unwrap().len(), 1);

    let (status, trial) = app.get("/api/v1/accounts/trial-balance").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(trial["is_balanced"], true);

    let uri = format!("/api/v1/vendors/{}/ledger", invoice["vendor_id"].as_str().unwrap());
    let (status, ledger) = app.get(&uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(amount_of(&ledger["total_outstanding"]), Decimal::ZERO);
}

#[tokio::test]
async fn test_large_payment_waits_for_approval_by_named_actor() {
    let app = TestApp::new().await;
    let invoice = app.invoice(dec!(200000)).await;

    let (status, payment) = app
        .send(
            Method::POST,
            "/api/v1/payments",
            Some(json!({ "invoice_id": invoice["id"], "amount": "200000", "method": "Wire" })),
            Some("ap.clerk"),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(payment["payment_status"], "Pending");
    assert_eq!(payment["approval_status"], "Submitted");
    assert_eq!(payment["created_by"], "ap.clerk");

    let approve = format!("/api/v1/payments/{}/approve", payment["id"].as_str().unwrap());
    let (status, approved) = app
        .send(
            Method::POST,
            &approve,
            Some(json!({ "decision": "Approve", "comment": "within budget" })),
            Some("finance.controller"),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", approved);
    assert_eq!(approved["payment_status"], "Success");
    let history = approved["approval_history"].as_array().unwrap();
    assert_eq!(history.last().unwrap()["actor"], "finance.controller");

    // a second decision is a state conflict
    let (status, body) = app.post(&approve, json!({ "decision": "Reject" })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn test_overpayment_is_rejected() {
    let app = TestApp::new().await;
    let invoice = app.invoice(dec!(500)).await;

    let (status, body) = app
        .post(
            "/api/v1/payments",
            json!({ "invoice_id": invoice["id"], "amount": "500.01", "method": "Ach" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn test_unknown_and_malformed_ids() {
    let app = TestApp::new().await;

    let uri = format!("/api/v1/payments/{}", uuid::Uuid::new_v4());
    let (status, _) = app.get(&uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app.get("/api/v1/payments/not-an-id").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn test_credit_note_reduces_vendor_balance() {
    let app = TestApp::new().await;
    let invoice = app.invoice(dec!(1000)).await;

    let (status, adjustment) = app
        .post(
            "/api/v1/adjustments",
            json!({
                "kind": "Credit",
                "invoice_id": invoice["id"],
                "amount": "150",
                "reason": "Damaged pallets returned",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", adjustment);

    let uri = format!("/api/v1/vendors/{}/ledger", invoice["vendor_id"].as_str().unwrap());
    let (_, ledger) = app.get(&uri).await;
    assert_eq!(amount_of(&ledger["total_outstanding"]), dec!(850));

    let (status, listed) = app.get("/api/v1/adjustments").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_empty_batch_is_a_validation_error() {
    let app = TestApp::new().await;
    let (status, _) = app
        .post("/api/v1/batch-payments", json!({ "invoice_ids": [], "method": "Ach" }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_batch_pays_each_invoice_in_full() {
    let app = TestApp::new().await;
    let first = app.invoice(dec!(300)).await;
    let second = app.invoice(dec!(700)).await;

    let (status, batch) = app
        .post(
            "/api/v1/batch-payments",
            json!({ "invoice_ids": [first["id"], second["id"]], "method": "Ach" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", batch);

    let uri = format!("/api/v1/batch-payments/{}", batch["id"].as_str().unwrap());
    let (status, fetched) = app.get(&uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"], batch["id"]);

    let uri = format!("/api/v1/payments?batch_id={}", batch["id"].as_str().unwrap());
    let (_, payments) = app.get(&uri).await;
    assert_eq!(payments.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_period_close_and_reopen() {
    let app = TestApp::new().await;

    let (status, period) = app.post("/api/v1/periods/close", json!({ "month": 1, "year": 2024 })).await;
    assert_eq!(status, StatusCode::OK, "{}", period);

    let (_, periods) = app.get("/api/v1/periods").await;
    assert_eq!(periods.as_array().unwrap().len(), 1);

    let (status, _) = app.post("/api/v1/periods/reopen", json!({ "month": 1, "year": 2024 })).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.post("/api/v1/periods/close", json!({ "month": 13, "year": 2024 })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_unknown_journal_reference_type() {
    let app = TestApp::new().await;
    let (status, _) = app.get("/api/v1/journal-entries?reference_type=refund").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_statement_reconciliation_matches_by_transaction_id() {
    let app = TestApp::new().await;
    let invoice = app.invoice(dec!(640)).await;
    let (_, payment) = app
        .post(
            "/api/v1/payments",
            json!({ "invoice_id": invoice["id"], "amount": "640", "method": "BankTransfer" }),
        )
        .await;
    let txn = payment["transaction_id"].as_str().unwrap();

    let csv = format!(
        "Date,Transaction_ID,Amount,Narration\n{},{},640.00,Vendor payout\n",
        Utc::now().date_naive(),
        txn.to_lowercase()
    );
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/reconciliation")
        .header("content-type", "text/csv")
        .body(Body::from(csv))
        .unwrap();
    let (status, report) = app.dispatch(request).await;
    assert_eq!(status, StatusCode::OK, "{}", report);
    assert_eq!(report["matched"].as_array().unwrap().len(), 1);
    assert_eq!(report["matched"][0]["transaction_id"], txn);

    let (status, _) = app.send(Method::POST, "/api/v1/reconciliation", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_exceptions_listing_is_reachable() {
    let app = TestApp::new().await;
    app.invoice(dec!(90)).await;

    let (status, exceptions) = app.get("/api/v1/invoices/exceptions").await;
    assert_eq!(status, StatusCode::OK);
    assert!(exceptions.as_array().unwrap().is_empty());
}
