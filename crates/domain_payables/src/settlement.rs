//! Payment settlement engine
//!
//! Creation validates the invoice and its purchase order, quotes any
//! early-payment discount and routes the payment through the approval gate.
//! Settlement relieves the invoice, echoes the payment into the journal and
//! the vendor ledger, then notifies downstream systems.
//!
//! Concurrent payments against one invoice both pass the outstanding check
//! before either writes. The invoice write is version-checked, so the
//! loser of that race fails with the conflict recorded as its reason
//! instead of over-paying.
//!
//! The invoice records which payments it has absorbed in the same
//! version-checked write. If storing the settled payment then fails, a
//! retry finds its id on the invoice and completes the payment without
//! relieving the invoice a second time.
//!
//! The early-payment discount is quoted again on the day the payment
//! actually settles; a quote taken at creation or approval is only a
//! preview.

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use core_kernel::{Actor, InvoiceId, Money, PaymentId};
use domain_ledger::{JournalReference, JournalTemplates, VendorLedgerEntryType};

use crate::audit::AuditEntity;
use crate::context::SettlementContext;
use crate::discount::early_payment_discount;
use crate::error::SettlementError;
use crate::invoice::Invoice;
use crate::payment::{
    ApprovalDecision, ApprovalStatus, CreatePaymentRequest, Payment, PaymentQuery, PaymentStatus,
    UpdatePaymentRequest,
};
use crate::ports::PayablesPort;
use crate::purchase_order::PurchaseOrder;
use crate::recorder::Posting;
use crate::webhook::{PAYMENT_COMPLETED, PAYMENT_FAILED};

/// Where the approval gate sends a payment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GateRoute {
    AwaitApproval,
    Scheduled,
    SettleNow,
}

/// Outcome counts of one scheduled-payment sweep
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerReport {
    pub examined: u32,
    pub settled: u32,
    pub failed: u32,
    /// Left pending after a transient failure, to be tried on the next sweep
    pub retried: u32,
}

/// Checks that goods on the invoice's purchase order have arrived
pub(crate) async fn ensure_goods_received(
    payables: &dyn PayablesPort,
    invoice: &Invoice,
) -> Result<PurchaseOrder, SettlementError> {
    let po_id = invoice.purchase_order_id.ok_or_else(|| {
        SettlementError::validation(format!(
            "Invoice {} has no purchase order; payment requires a received order",
            invoice.invoice_number
        ))
    })?;
    let order = payables.get_purchase_order(po_id).await?.ok_or_else(|| {
        SettlementError::validation(format!("Purchase order {} for invoice {} not found", po_id, invoice.invoice_number))
    })?;
    if !order.is_received() {
        return Err(SettlementError::validation(format!(
            "Purchase order {} has not been delivered (status {:?})",
            order.po_number, order.status
        )));
    }
    Ok(order)
}

/// Creates, approves, schedules and settles vendor payments
#[derive(Clone)]
pub struct PaymentService {
    ctx: SettlementContext,
}

impl PaymentService {
    pub fn new(ctx: SettlementContext) -> Self {
        Self { ctx }
    }

    /// Creates a payment and, when nothing holds it back, settles it immediately
    ///
    /// # Errors
    ///
    /// - `Validation` if the invoice is paid, the amount exceeds what is
    ///   outstanding, or the purchase order has not been received
    /// - `NotFound` for an unknown invoice or vendor
    ///
    /// A settlement that fails after the payment was stored is not an error:
    /// the payment comes back `Failed` with its `failure_reason` set.
    #[instrument(skip_all, fields(invoice_id = %request.invoice_id, actor = %actor))]
    pub async fn create_payment(
        &self,
        request: CreatePaymentRequest,
        actor: &Actor,
    ) -> Result<Payment, SettlementError> {
        self.ctx.ensure_amount(&request.amount, "Payment amount")?;
        let today = self.ctx.today();
        if let Some(date) = request.scheduled_date {
            if date < today {
                return Err(SettlementError::validation(format!(
                    "Scheduled date {} is in the past",
                    date
                )));
            }
        }
        if let Some(date) = request.payment_date {
            if date < today {
                return Err(SettlementError::validation(format!(
                    "Payment date {} is in the past",
                    date
                )));
            }
        }

        let invoice = self.load_payable(request.invoice_id, request.amount).await?;
        let vendor = self.ctx.payables.get_vendor(invoice.vendor_id).await?;

        let payment_date = request.scheduled_date.or(request.payment_date).unwrap_or(today);
        let quote = early_payment_discount(&vendor, invoice.invoice_date, payment_date, request.amount)?;

        let mut payment = Payment::new(
            invoice.id,
            invoice.vendor_id,
            quote.settled,
            request.method,
            payment_date,
            actor.clone(),
        );
        payment.discount_applied = quote.discount;
        payment.discount_percentage = quote.percentage;
        payment.scheduled_date = request.scheduled_date;
        payment.notes = request.notes;

        if request.draft {
            payment.record_approval(ApprovalStatus::Draft, actor, None);
            self.ctx.payables.insert_payment(&payment).await?;
            self.audit_payment(actor, "payment.drafted", &payment).await;
            return Ok(payment);
        }

        let route = self.gate(&mut payment, actor, today);
        self.ctx.payables.insert_payment(&payment).await?;
        self.audit_payment(actor, "payment.created", &payment).await;
        info!(
            payment_id = %payment.id,
            amount = %payment.amount,
            discount = %payment.discount_applied,
            route = ?route,
            "Payment created"
        );

        match route {
            GateRoute::SettleNow => self.settle_or_fail(payment, actor, today).await,
            GateRoute::AwaitApproval | GateRoute::Scheduled => Ok(payment),
        }
    }

    /// Moves a draft payment through the approval gate
    #[instrument(skip(self, actor), fields(actor = %actor))]
    pub async fn submit_payment(&self, id: PaymentId, actor: &Actor) -> Result<Payment, SettlementError> {
        let mut payment = self.ctx.payables.get_payment(id).await?;
        if payment.payment_status != PaymentStatus::Pending || payment.approval_status != ApprovalStatus::Draft {
            return Err(SettlementError::conflict(format!(
                "Payment {} is not a draft (status {:?}/{})",
                id, payment.payment_status, payment.approval_status
            )));
        }
        self.load_payable(payment.invoice_id, payment.gross_amount()?).await?;

        let today = self.ctx.today();
        let route = self.gate(&mut payment, actor, today);
        self.ctx.payables.save_payment(&payment).await?;
        self.audit_payment(actor, "payment.submitted", &payment).await;

        match route {
            GateRoute::SettleNow => self.settle_or_fail(payment, actor, today).await,
            GateRoute::AwaitApproval | GateRoute::Scheduled => Ok(payment),
        }
    }

    /// Approves or rejects a submitted payment
    ///
    /// Only legal from `Submitted`; anything else is a state conflict with
    /// no side effects. Approval settles now unless the payment is
    /// scheduled for a later date. Rejection is terminal.
    #[instrument(skip(self, actor, comment), fields(actor = %actor))]
    pub async fn approve_payment(
        &self,
        id: PaymentId,
        decision: ApprovalDecision,
        actor: &Actor,
        comment: Option<String>,
    ) -> Result<Payment, SettlementError> {
        let mut payment = self.ctx.payables.get_payment(id).await?;
        if payment.approval_status != ApprovalStatus::Submitted || payment.payment_status != PaymentStatus::Pending {
            return Err(SettlementError::conflict(format!(
                "Payment {} cannot be approved or rejected from approval status {}",
                id, payment.approval_status
            )));
        }

        match decision {
            ApprovalDecision::Reject => {
                let reason = match &comment {
                    Some(c) => format!("Rejected by {}: {}", actor, c),
                    None => format!("Rejected by {}", actor),
                };
                payment.record_approval(ApprovalStatus::Rejected, actor, comment);
                payment.mark_failed(reason);
                self.ctx.payables.save_payment(&payment).await?;
                self.audit_payment(actor, "payment.rejected", &payment).await;
                self.ctx.notify(PAYMENT_FAILED, Self::payload(&payment)).await;
                info!(payment_id = %id, "Payment rejected");
                Ok(payment)
            }
            ApprovalDecision::Approve => {
                payment.record_approval(ApprovalStatus::Approved, actor, comment);
                self.ctx.payables.save_payment(&payment).await?;
                self.audit_payment(actor, "payment.approved", &payment).await;
                info!(payment_id = %id, "Payment approved");

                let today = self.ctx.today();
                if payment.is_scheduled_after(today) {
                    return Ok(payment);
                }
                self.settle_or_fail(payment, actor, today).await
            }
        }
    }

    pub async fn get_payment(&self, id: PaymentId) -> Result<Payment, SettlementError> {
        Ok(self.ctx.payables.get_payment(id).await?)
    }

    pub async fn list_payments(&self, query: &PaymentQuery) -> Result<Vec<Payment>, SettlementError> {
        Ok(self.ctx.payables.list_payments(query).await?)
    }

    /// Edits method, schedule or notes of a payment that has not been cleared
    pub async fn update_payment(
        &self,
        id: PaymentId,
        request: UpdatePaymentRequest,
        actor: &Actor,
    ) -> Result<Payment, SettlementError> {
        let mut payment = self.ctx.payables.get_payment(id).await?;
        let editable = payment.payment_status == PaymentStatus::Pending
            && matches!(payment.approval_status, ApprovalStatus::Draft | ApprovalStatus::NotRequired);
        if !editable {
            return Err(SettlementError::conflict(format!(
                "Payment {} can no longer be edited (status {:?}/{})",
                id, payment.payment_status, payment.approval_status
            )));
        }

        if let Some(date) = request.scheduled_date {
            if date < self.ctx.today() {
                return Err(SettlementError::validation(format!("Scheduled date {} is in the past", date)));
            }
            payment.scheduled_date = Some(date);
        } else if request.clear_schedule {
            payment.scheduled_date = None;
        }
        if let Some(method) = request.method {
            payment.method = method;
        }
        if request.notes.is_some() {
            payment.notes = request.notes;
        }
        payment.updated_at = chrono::Utc::now();

        self.ctx.payables.save_payment(&payment).await?;
        self.audit_payment(actor, "payment.updated", &payment).await;
        Ok(payment)
    }

    /// Cancels a payment that is pending and not yet approved
    pub async fn cancel_payment(
        &self,
        id: PaymentId,
        actor: &Actor,
        reason: Option<String>,
    ) -> Result<Payment, SettlementError> {
        let mut payment = self.ctx.payables.get_payment(id).await?;
        if payment.payment_status != PaymentStatus::Pending || payment.approval_status == ApprovalStatus::Approved {
            return Err(SettlementError::conflict(format!(
                "Payment {} cannot be cancelled (status {:?}/{})",
                id, payment.payment_status, payment.approval_status
            )));
        }

        let reason = match reason {
            Some(r) => format!("Cancelled by {}: {}", actor, r),
            None => format!("Cancelled by {}", actor),
        };
        payment.mark_failed(reason);
        self.ctx.payables.save_payment(&payment).await?;
        self.audit_payment(actor, "payment.cancelled", &payment).await;
        Ok(payment)
    }

    /// Drains pending payments that are cleared and due on `today`
    ///
    /// Each payment is re-validated against the invoice as it stands now,
    /// its discount is quoted again for `today`, and it is marked Failed if
    /// it no longer qualifies. Transient storage failures leave the payment
    /// pending with `retry_count` incremented; after `max_settlement_retries`
    /// attempts it is marked Failed, unless the invoice already absorbed it.
    #[instrument(skip(self))]
    pub async fn process_scheduled(&self, today: NaiveDate) -> Result<SchedulerReport, SettlementError> {
        let pending = self
            .ctx
            .payables
            .list_payments(&PaymentQuery::with_status(PaymentStatus::Pending))
            .await?;
        let system = Actor::system();
        let mut report = SchedulerReport::default();

        for payment in pending.into_iter().filter(|p| p.is_due(today)) {
            report.examined += 1;
            match self.settle_or_fail(payment.clone(), &system, today).await {
                Ok(settled) if settled.payment_status == PaymentStatus::Success => report.settled += 1,
                Ok(_) => report.failed += 1,
                Err(e) => {
                    // the attempt may have stored re-quoted terms
                    let mut retry = self.ctx.payables.get_payment(payment.id).await.unwrap_or(payment);
                    retry.retry_count += 1;
                    if retry.retry_count >= self.ctx.config.max_settlement_retries
                        && self.definitely_unapplied(&retry).await
                    {
                        retry.mark_failed(format!(
                            "Settlement failed after {} attempts: {}",
                            retry.retry_count, e
                        ));
                        report.failed += 1;
                    } else {
                        report.retried += 1;
                    }
                    warn!(payment_id = %retry.id, attempt = retry.retry_count, error = %e, "Scheduled settlement failed");
                    if let Err(save_error) = self.ctx.payables.save_payment(&retry).await {
                        warn!(payment_id = %retry.id, error = %save_error, "Could not record settlement retry");
                    }
                }
            }
        }

        if report.examined > 0 {
            info!(
                examined = report.examined,
                settled = report.settled,
                failed = report.failed,
                retried = report.retried,
                "Scheduled payment sweep finished"
            );
        }
        Ok(report)
    }

    // ------------------------------------------------------------------------
    // Internals shared with the batch processor
    // ------------------------------------------------------------------------

    /// Loads an invoice and checks `gross` can be paid against it now
    async fn load_payable(&self, invoice_id: InvoiceId, gross: Money) -> Result<Invoice, SettlementError> {
        let invoice = self.ctx.payables.get_invoice(invoice_id).await?;
        self.check_payable(&invoice, gross).await?;
        Ok(invoice)
    }

    async fn check_payable(&self, invoice: &Invoice, gross: Money) -> Result<(), SettlementError> {
        if invoice.is_paid()? {
            return Err(SettlementError::validation(format!(
                "Invoice {} is already paid",
                invoice.invoice_number
            )));
        }
        let outstanding = invoice.outstanding()?;
        if gross.currency() != outstanding.currency() || gross > outstanding {
            return Err(SettlementError::validation(format!(
                "Payment amount {} exceeds outstanding amount {} on invoice {}",
                gross, outstanding, invoice.invoice_number
            )));
        }
        ensure_goods_received(self.ctx.payables.as_ref(), invoice).await?;
        Ok(())
    }

    /// True only when the invoice is known not to carry the payment
    ///
    /// A payment the invoice has absorbed must never be marked Failed; it
    /// stays pending until the scheduler completes it.
    pub(crate) async fn definitely_unapplied(&self, payment: &Payment) -> bool {
        match self.ctx.payables.get_invoice(payment.invoice_id).await {
            Ok(invoice) => !invoice.has_applied(payment.id),
            Err(e) => e.is_not_found(),
        }
    }

    /// Quotes the vendor's discount again for settling on `on`
    ///
    /// The gross amount relieved from the invoice stays fixed; only the
    /// split between cash and discount moves. Returns true when the terms
    /// changed.
    async fn requote(&self, payment: &mut Payment, invoice: &Invoice, on: NaiveDate) -> Result<bool, SettlementError> {
        let gross = payment.gross_amount()?;
        let vendor = self.ctx.payables.get_vendor(payment.vendor_id).await?;
        let quote = early_payment_discount(&vendor, invoice.invoice_date, on, gross)?;
        let changed = quote.settled != payment.amount || payment.payment_date != on;
        if changed {
            debug!(
                payment_id = %payment.id,
                quoted = %payment.discount_applied,
                now = %quote.discount,
                "Discount quoted again at settlement"
            );
            payment.amount = quote.settled;
            payment.discount_applied = quote.discount;
            payment.discount_percentage = quote.percentage;
            payment.payment_date = on;
            payment.updated_at = chrono::Utc::now();
        }
        Ok(changed)
    }

    fn gate(&self, payment: &mut Payment, actor: &Actor, today: NaiveDate) -> GateRoute {
        if payment.amount >= self.ctx.config.approval_threshold() {
            payment.record_approval(ApprovalStatus::Submitted, actor, None);
            GateRoute::AwaitApproval
        } else {
            payment.approval_status = ApprovalStatus::NotRequired;
            if payment.is_scheduled_after(today) {
                GateRoute::Scheduled
            } else {
                GateRoute::SettleNow
            }
        }
    }

    /// Settles on `on`, turning non-transient failures into a stored `Failed` payment
    ///
    /// Transient storage errors are returned so the caller can retry, as is
    /// any failure after the invoice has absorbed the payment.
    pub(crate) async fn settle_or_fail(
        &self,
        payment: Payment,
        actor: &Actor,
        on: NaiveDate,
    ) -> Result<Payment, SettlementError> {
        match self.settle(payment.clone(), actor, on).await {
            Ok(settled) => Ok(settled),
            Err(e) if e.is_transient() => Err(e),
            Err(e) => {
                if !self.definitely_unapplied(&payment).await {
                    warn!(payment_id = %payment.id, error = %e, "Settlement interrupted after the invoice was relieved");
                    return Err(e);
                }
                let mut failed = payment;
                failed.mark_failed(e.to_string());
                self.ctx.payables.save_payment(&failed).await?;
                warn!(payment_id = %failed.id, reason = %e, "Payment settlement failed");
                self.audit_payment(actor, "payment.failed", &failed).await;
                self.ctx.notify(PAYMENT_FAILED, Self::payload(&failed)).await;
                Ok(failed)
            }
        }
    }

    async fn settle(&self, mut payment: Payment, actor: &Actor, on: NaiveDate) -> Result<Payment, SettlementError> {
        let mut invoice = self.ctx.payables.get_invoice(payment.invoice_id).await?;
        let already_applied = invoice.has_applied(payment.id);

        if already_applied {
            debug!(payment_id = %payment.id, invoice_id = %invoice.id, "Invoice already carries this payment");
        } else {
            // batch runs pay the full outstanding amount with no discount
            if payment.batch_id.is_none() && self.requote(&mut payment, &invoice, on).await? {
                self.ctx.payables.save_payment(&payment).await?;
            }
            self.check_payable(&invoice, payment.gross_amount()?).await?;
        }
        let lines = JournalTemplates::payment(payment.amount, payment.discount_applied)?;

        if !already_applied {
            invoice.apply_payment(payment.id, payment.gross_amount()?)?;
            invoice = match self.ctx.payables.save_invoice(&invoice).await {
                Ok(stored) => stored,
                Err(e) if e.is_conflict() => {
                    warn!(payment_id = %payment.id, invoice_id = %invoice.id, "Invoice changed during settlement");
                    return Err(SettlementError::conflict(format!(
                        "Invoice {} was modified by a concurrent settlement: {}",
                        invoice.invoice_number, e
                    )));
                }
                Err(e) => return Err(e.into()),
            };
        }

        payment.mark_success();
        self.ctx.payables.save_payment(&payment).await?;

        let posting = Posting::new(
            JournalReference::Payment(payment.id),
            format!("Payment {} for invoice {}", payment.transaction_id, invoice.invoice_number),
            lines,
            on,
        )
        .with_vendor_entry(
            payment.vendor_id,
            VendorLedgerEntryType::Payment,
            payment.amount,
            format!("Payment {}", payment.transaction_id),
        )
        .with_vendor_entry(
            payment.vendor_id,
            VendorLedgerEntryType::Credit,
            payment.discount_applied,
            format!("Early payment discount {}%", payment.discount_percentage),
        );
        self.ctx.echo(posting, actor).await;

        info!(
            payment_id = %payment.id,
            invoice_id = %invoice.id,
            amount = %payment.amount,
            outstanding = %invoice.outstanding()?,
            "Payment settled"
        );
        self.audit_payment(actor, "payment.settled", &payment).await;
        self.ctx.notify(PAYMENT_COMPLETED, Self::payload(&payment)).await;
        Ok(payment)
    }

    async fn audit_payment(&self, actor: &Actor, action: &str, payment: &Payment) {
        self.ctx
            .audit(
                actor,
                action,
                AuditEntity::Payment(payment.id),
                json!({
                    "invoice_id": payment.invoice_id,
                    "amount": payment.amount.amount(),
                    "discount": payment.discount_applied.amount(),
                    "payment_status": payment.payment_status,
                    "approval_status": payment.approval_status,
                    "failure_reason": payment.failure_reason,
                }),
            )
            .await;
    }

    fn payload(payment: &Payment) -> serde_json::Value {
        json!({
            "payment_id": payment.id,
            "transaction_id": payment.transaction_id,
            "invoice_id": payment.invoice_id,
            "vendor_id": payment.vendor_id,
            "amount": payment.amount.amount(),
            "currency": payment.amount.currency(),
            "discount": payment.discount_applied.amount(),
            "status": payment.payment_status,
            "failure_reason": payment.failure_reason,
        })
    }
}
