//! Shared harness for payables integration tests

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;

use core_kernel::{Actor, Money};
use domain_ledger::ports::mock::MockLedgerPort;
use domain_ledger::{JournalQuery, JournalReference, LedgerBootstrap};
use domain_payables::audit::mock::RecordingAuditSink;
use domain_payables::ports::mock::MockPayablesPort;
use domain_payables::webhook::mock::RecordingWebhookDispatcher;
use domain_payables::{
    Invoice, InvoiceService, PayablesPort, PurchaseOrder, PurchaseOrderStatus, SettlementConfig,
    SettlementContext, Vendor,
};
use test_utils::{
    ActorFixtures, DateFixtures, InvoiceRequestBuilder, MoneyFixtures, PurchaseOrderBuilder, StringFixtures,
    VendorBuilder,
};

pub use test_utils::{
    assert_entry_balanced, assert_money_eq, assert_money_zero, assert_payment_status, assert_vendor_ledger_consistent,
    StatementBuilder,
};

pub fn usd(v: Decimal) -> Money {
    MoneyFixtures::usd(v)
}

pub fn today() -> NaiveDate {
    DateFixtures::today()
}

pub fn days_from_today(days: i64) -> NaiveDate {
    DateFixtures::days_from_today(days)
}

pub fn clerk() -> Actor {
    ActorFixtures::clerk()
}

pub fn controller() -> Actor {
    ActorFixtures::controller()
}

pub struct Harness {
    pub payables: Arc<MockPayablesPort>,
    pub ledger: Arc<MockLedgerPort>,
    pub audit: Arc<RecordingAuditSink>,
    pub webhooks: Arc<RecordingWebhookDispatcher>,
    pub ctx: SettlementContext,
}

impl Harness {
    pub async fn new() -> Self {
        Self::build(
            SettlementConfig::default(),
            RecordingAuditSink::new(),
            RecordingWebhookDispatcher::new(),
        )
        .await
    }

    pub async fn with_config(config: SettlementConfig) -> Self {
        Self::build(config, RecordingAuditSink::new(), RecordingWebhookDispatcher::new()).await
    }

    pub async fn with_failing_collaborators() -> Self {
        Self::build(
            SettlementConfig::default(),
            RecordingAuditSink::failing(),
            RecordingWebhookDispatcher::failing(),
        )
        .await
    }

    async fn build(
        config: SettlementConfig,
        audit: RecordingAuditSink,
        webhooks: RecordingWebhookDispatcher,
    ) -> Self {
        let payables = Arc::new(MockPayablesPort::new());
        let ledger = Arc::new(MockLedgerPort::new());
        let audit = Arc::new(audit);
        let webhooks = Arc::new(webhooks);
        LedgerBootstrap::new(ledger.clone(), config.currency)
            .initialize()
            .await
            .unwrap();

        let ctx = SettlementContext::new(
            payables.clone(),
            ledger.clone(),
            audit.clone(),
            webhooks.clone(),
            config,
        );
        Self {
            payables,
            ledger,
            audit,
            webhooks,
            ctx,
        }
    }

    pub async fn vendor(&self) -> Vendor {
        let vendor = VendorBuilder::new().with_name(StringFixtures::vendor_name()).build();
        self.payables.save_vendor(&vendor).await.unwrap();
        vendor
    }

    pub async fn discounting_vendor(&self, percentage: Decimal, window_days: u32) -> Vendor {
        let vendor = VendorBuilder::new()
            .with_name("Contoso Steel")
            .with_discount(percentage, window_days)
            .build();
        self.payables.save_vendor(&vendor).await.unwrap();
        vendor
    }

    pub async fn order(&self, vendor: &Vendor, total: Decimal, status: PurchaseOrderStatus) -> PurchaseOrder {
        let order = PurchaseOrderBuilder::new(vendor.id)
            .with_total(usd(total))
            .with_status(status)
            .build();
        self.payables.save_purchase_order(&order).await.unwrap();
        order
    }

    pub async fn received_order(&self, vendor: &Vendor, total: Decimal) -> PurchaseOrder {
        self.order(vendor, total, PurchaseOrderStatus::Delivered).await
    }

    /// Registers an invoice through intake, dated `invoice_date`
    pub async fn invoice_on(
        &self,
        vendor: &Vendor,
        order: Option<&PurchaseOrder>,
        amount: Decimal,
        invoice_date: NaiveDate,
    ) -> Invoice {
        let mut request = InvoiceRequestBuilder::new(vendor.id)
            .with_amount(usd(amount))
            .dated(invoice_date, invoice_date + Duration::days(30));
        if let Some(order) = order {
            request = request.with_order_id(order.id);
        }
        InvoiceService::new(self.ctx.clone())
            .register_invoice(request.build(), &clerk())
            .await
            .unwrap()
    }

    /// A received order plus an invoice for `amount` dated today
    pub async fn payable_invoice(&self, vendor: &Vendor, amount: Decimal) -> Invoice {
        let order = self.received_order(vendor, amount).await;
        self.invoice_on(vendor, Some(&order), amount, today()).await
    }

    pub async fn reload(&self, invoice: &Invoice) -> Invoice {
        self.payables.get_invoice(invoice.id).await.unwrap()
    }

    pub async fn journal_for(&self, reference: JournalReference) -> Vec<domain_ledger::JournalEntry> {
        self.ctx
            .journal()
            .list(&JournalQuery::for_reference(reference))
            .await
            .unwrap()
    }
}
