//! Payables Domain - Payment Settlement for Procurement
//!
//! This crate settles vendor invoices. It owns the payment lifecycle and
//! everything that changes what a vendor is owed: payments (single,
//! scheduled and batched), credit and debit notes, and accruals. Each
//! committed event is echoed into the books kept by `domain_ledger`.
//!
//! # Settlement Rules
//!
//! - A payment may not exceed the invoice's outstanding amount
//! - The invoice's purchase order must be delivered or receipt-confirmed
//! - Payments at or above the approval threshold wait for an explicit approve
//! - Early-payment discounts reduce the cash paid, not the amount relieved
//!
//! # Failure Model
//!
//! The business record is written first. Journal posting, vendor ledger
//! update, audit and webhook follow as best-effort side effects: their
//! failures are logged and never undo the settlement. Lost invoice write
//! races are detected through the invoice `version` and fail the payment.
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_payables::{CreatePaymentRequest, PaymentMethod, PaymentService};
//!
//! let service = PaymentService::new(ctx);
//! let payment = service
//!     .create_payment(CreatePaymentRequest::new(invoice.id, amount, PaymentMethod::Wire), &actor)
//!     .await?;
//! ```

pub mod accrual;
pub mod adjustment;
pub mod audit;
pub mod batch;
pub mod config;
pub mod context;
pub mod discount;
pub mod error;
pub mod exceptions;
pub mod intake;
pub mod invoice;
pub mod ledger_sync;
pub mod payment;
pub mod periods;
pub mod ports;
pub mod purchase_order;
pub mod reconciliation;
pub mod recorder;
pub mod settlement;
pub mod statement;
pub mod vendor;
pub mod webhook;

pub use accrual::{Accrual, AccrualReference, AccrualService, AccrualStatus, CreateAccrualRequest};
pub use adjustment::{Adjustment, AdjustmentKind, AdjustmentQuery, AdjustmentService, CreateAdjustmentRequest};
pub use audit::{AuditEntity, AuditEvent, AuditSink, TracingAuditSink};
pub use batch::{BatchItemFailure, BatchPayment, BatchService, BatchStatus};
pub use config::SettlementConfig;
pub use context::SettlementContext;
pub use discount::{early_payment_discount, DiscountQuote};
pub use error::SettlementError;
pub use exceptions::{detect_invoice_exceptions, ExceptionFlag, ExceptionKind, ExceptionService, InvoiceException};
pub use intake::{InvoiceService, RegisterInvoiceRequest};
pub use invoice::{Invoice, InvoicePaymentStatus, InvoiceQuery};
pub use ledger_sync::VendorLedgerService;
pub use payment::{
    ApprovalDecision, ApprovalRecord, ApprovalStatus, CreatePaymentRequest, Payment, PaymentMethod,
    PaymentQuery, PaymentStatus, UpdatePaymentRequest,
};
pub use periods::PeriodService;
pub use ports::PayablesPort;
pub use purchase_order::{PoApprovalStatus, PurchaseOrder, PurchaseOrderStatus};
pub use reconciliation::{
    match_bank_records, BankRecord, MatchConfidence, ReconciliationReport, ReconciliationService,
    RecordMatch, StatementReconciliation,
};
pub use recorder::{LedgerRecorder, Posting};
pub use settlement::{PaymentService, SchedulerReport};
pub use statement::{parse_bank_statement, ParsedStatement, RejectedRow};
pub use vendor::{EarlyPaymentDiscount, Vendor};
pub use webhook::{NoopWebhookDispatcher, WebhookDispatcher};
