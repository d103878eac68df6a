//! Payment lifecycle, scheduler and batch integration tests

mod common;

use rust_decimal_macros::dec;

use common::*;
use domain_ledger::{AccountCode, JournalReference, VendorLedgerEntryType};
use domain_payables::{
    ApprovalDecision, ApprovalStatus, BatchService, BatchStatus, CreatePaymentRequest, PayablesPort,
    PaymentMethod, PaymentQuery, PaymentService, PaymentStatus, PeriodService, PurchaseOrderStatus,
    SettlementConfig, SettlementError, UpdatePaymentRequest,
};

mod immediate_settlement {
    use super::*;

    #[tokio::test]
    async fn test_payment_below_threshold_settles_immediately() {
        let h = Harness::new().await;
        let vendor = h.vendor().await;
        let invoice = h.payable_invoice(&vendor, dec!(100000)).await;
        let service = PaymentService::new(h.ctx.clone());

        let payment = service
            .create_payment(
                CreatePaymentRequest::new(invoice.id, usd(dec!(100000)), PaymentMethod::BankTransfer),
                &clerk(),
            )
            .await
            .unwrap();

        assert_eq!(payment.payment_status, PaymentStatus::Success);
        assert_eq!(payment.approval_status, ApprovalStatus::NotRequired);
        assert!(payment.paid_at.is_some());
        assert!(h.reload(&invoice).await.outstanding().unwrap().is_zero());

        let entries = h.journal_for(JournalReference::Payment(payment.id)).await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].lines.len(), 2);
        assert!(entries[0].is_balanced);

        assert!(h.webhooks.events().await.contains(&"payment.completed".to_string()));
        assert!(h.audit.actions().await.contains(&"payment.settled".to_string()));
    }

    #[tokio::test]
    async fn test_early_payment_discount_reduces_cash() {
        let h = Harness::new().await;
        let vendor = h.discounting_vendor(dec!(2), 10).await;
        let order = h.received_order(&vendor, dec!(100000)).await;
        let invoice = h.invoice_on(&vendor, Some(&order), dec!(100000), days_from_today(-5)).await;

        let payment = PaymentService::new(h.ctx.clone())
            .create_payment(
                CreatePaymentRequest::new(invoice.id, usd(dec!(100000)), PaymentMethod::Wire),
                &clerk(),
            )
            .await
            .unwrap();

        assert_eq!(payment.payment_status, PaymentStatus::Success);
        assert_eq!(payment.discount_applied.amount(), dec!(2000));
        assert_eq!(payment.amount.amount(), dec!(98000));
        assert!(h.reload(&invoice).await.is_paid().unwrap());

        let ledger = h.ctx.vendor_ledgers().get(vendor.id).await.unwrap().unwrap();
        let credits: Vec<_> = ledger
            .entries
            .iter()
            .filter(|e| e.entry_type == VendorLedgerEntryType::Credit)
            .collect();
        assert_eq!(credits.len(), 1);
        assert_eq!(credits[0].amount.amount(), dec!(2000));
        assert_eq!(ledger.total_paid.amount(), dec!(98000));
        assert!(ledger.total_outstanding.is_zero());
        assert!(ledger.is_consistent());

        let entry = &h.journal_for(JournalReference::Payment(payment.id)).await[0];
        assert_eq!(entry.lines.len(), 3);
        assert!(entry
            .lines
            .iter()
            .any(|l| l.account_code == AccountCode::PurchaseDiscounts && l.credit.amount() == dec!(2000)));
    }

    #[tokio::test]
    async fn test_discount_window_expired() {
        let h = Harness::new().await;
        let vendor = h.discounting_vendor(dec!(2), 10).await;
        let order = h.received_order(&vendor, dec!(5000)).await;
        let invoice = h.invoice_on(&vendor, Some(&order), dec!(5000), days_from_today(-11)).await;

        let payment = PaymentService::new(h.ctx.clone())
            .create_payment(CreatePaymentRequest::new(invoice.id, usd(dec!(5000)), PaymentMethod::Ach), &clerk())
            .await
            .unwrap();

        assert!(payment.discount_applied.is_zero());
        assert_eq!(payment.amount.amount(), dec!(5000));
    }

    #[tokio::test]
    async fn test_partial_payment_leaves_remainder() {
        let h = Harness::new().await;
        let vendor = h.vendor().await;
        let invoice = h.payable_invoice(&vendor, dec!(1000)).await;

        PaymentService::new(h.ctx.clone())
            .create_payment(CreatePaymentRequest::new(invoice.id, usd(dec!(400)), PaymentMethod::Check), &clerk())
            .await
            .unwrap();

        let stored = h.reload(&invoice).await;
        assert_eq!(stored.outstanding().unwrap().amount(), dec!(600));
        assert_eq!(stored.version, 1);
    }

    #[tokio::test]
    async fn test_collaborator_failures_do_not_block_settlement() {
        let h = Harness::with_failing_collaborators().await;
        let vendor = h.vendor().await;
        let invoice = h.payable_invoice(&vendor, dec!(750)).await;

        let payment = PaymentService::new(h.ctx.clone())
            .create_payment(CreatePaymentRequest::new(invoice.id, usd(dec!(750)), PaymentMethod::Card), &clerk())
            .await
            .unwrap();

        assert_eq!(payment.payment_status, PaymentStatus::Success);
        assert!(h.audit.events().await.is_empty());
        assert!(h.webhooks.events().await.is_empty());
    }
}

mod validation {
    use super::*;

    #[tokio::test]
    async fn test_amount_above_outstanding_is_rejected() {
        let h = Harness::new().await;
        let vendor = h.vendor().await;
        let invoice = h.payable_invoice(&vendor, dec!(1000)).await;

        let result = PaymentService::new(h.ctx.clone())
            .create_payment(CreatePaymentRequest::new(invoice.id, usd(dec!(1000.01)), PaymentMethod::Wire), &clerk())
            .await;

        match result {
            Err(SettlementError::Validation(reason)) => assert!(reason.contains("exceeds outstanding")),
            other => panic!("expected validation error, got {:?}", other),
        }
        assert!(h.payables.list_payments(&PaymentQuery::default()).await.unwrap().is_empty());
        assert!(h.reload(&invoice).await.paid_amount.is_zero());
    }

    #[tokio::test]
    async fn test_goods_must_be_received() {
        let h = Harness::new().await;
        let vendor = h.vendor().await;
        let order = h.order(&vendor, dec!(300), PurchaseOrderStatus::Ordered).await;
        let invoice = h.invoice_on(&vendor, Some(&order), dec!(300), today()).await;

        let result = PaymentService::new(h.ctx.clone())
            .create_payment(CreatePaymentRequest::new(invoice.id, usd(dec!(300)), PaymentMethod::Wire), &clerk())
            .await;

        assert!(matches!(result, Err(SettlementError::Validation(ref r)) if r.contains("not been delivered")));
    }

    #[tokio::test]
    async fn test_invoice_without_order_is_rejected() {
        let h = Harness::new().await;
        let vendor = h.vendor().await;
        let invoice = h.invoice_on(&vendor, None, dec!(300), today()).await;

        let result = PaymentService::new(h.ctx.clone())
            .create_payment(CreatePaymentRequest::new(invoice.id, usd(dec!(300)), PaymentMethod::Wire), &clerk())
            .await;

        assert!(matches!(result, Err(SettlementError::Validation(ref r)) if r.contains("no purchase order")));
    }

    #[tokio::test]
    async fn test_paid_invoice_is_rejected() {
        let h = Harness::new().await;
        let vendor = h.vendor().await;
        let invoice = h.payable_invoice(&vendor, dec!(200)).await;
        let service = PaymentService::new(h.ctx.clone());
        service
            .create_payment(CreatePaymentRequest::new(invoice.id, usd(dec!(200)), PaymentMethod::Wire), &clerk())
            .await
            .unwrap();

        let again = service
            .create_payment(CreatePaymentRequest::new(invoice.id, usd(dec!(1)), PaymentMethod::Wire), &clerk())
            .await;
        assert!(matches!(again, Err(SettlementError::Validation(ref r)) if r.contains("already paid")));
    }

    #[tokio::test]
    async fn test_non_positive_and_foreign_amounts() {
        let h = Harness::new().await;
        let vendor = h.vendor().await;
        let invoice = h.payable_invoice(&vendor, dec!(200)).await;
        let service = PaymentService::new(h.ctx.clone());

        let zero = service
            .create_payment(CreatePaymentRequest::new(invoice.id, usd(dec!(0)), PaymentMethod::Wire), &clerk())
            .await;
        assert!(matches!(zero, Err(SettlementError::Validation(_))));

        let euros = core_kernel::Money::new(dec!(10), core_kernel::Currency::EUR);
        let foreign = service
            .create_payment(CreatePaymentRequest::new(invoice.id, euros, PaymentMethod::Wire), &clerk())
            .await;
        assert!(matches!(foreign, Err(SettlementError::Validation(_))));
    }

    #[tokio::test]
    async fn test_backdated_payment_date_is_rejected() {
        let h = Harness::new().await;
        let vendor = h.discounting_vendor(dec!(2), 10).await;
        let order = h.received_order(&vendor, dec!(5000)).await;
        let invoice = h.invoice_on(&vendor, Some(&order), dec!(5000), days_from_today(-40)).await;

        let result = PaymentService::new(h.ctx.clone())
            .create_payment(
                CreatePaymentRequest::new(invoice.id, usd(dec!(5000)), PaymentMethod::Wire).on(days_from_today(-35)),
                &clerk(),
            )
            .await;

        assert!(matches!(result, Err(SettlementError::Validation(ref r)) if r.contains("in the past")));
        assert!(h.payables.list_payments(&PaymentQuery::default()).await.unwrap().is_empty());
        assert!(h.reload(&invoice).await.paid_amount.is_zero());
    }

    #[tokio::test]
    async fn test_unknown_invoice_is_not_found() {
        let h = Harness::new().await;
        let result = PaymentService::new(h.ctx.clone())
            .create_payment(
                CreatePaymentRequest::new(core_kernel::InvoiceId::new(), usd(dec!(10)), PaymentMethod::Wire),
                &clerk(),
            )
            .await;
        assert!(matches!(result, Err(SettlementError::NotFound { ref entity, .. }) if entity == "Invoice"));
    }
}

mod approval {
    use super::*;

    #[tokio::test]
    async fn test_threshold_payment_waits_for_approval() {
        let h = Harness::new().await;
        let vendor = h.vendor().await;
        let invoice = h.payable_invoice(&vendor, dec!(150000)).await;
        let service = PaymentService::new(h.ctx.clone());

        let payment = service
            .create_payment(CreatePaymentRequest::new(invoice.id, usd(dec!(150000)), PaymentMethod::Wire), &clerk())
            .await
            .unwrap();

        assert_eq!(payment.payment_status, PaymentStatus::Pending);
        assert_eq!(payment.approval_status, ApprovalStatus::Submitted);
        assert!(h.reload(&invoice).await.paid_amount.is_zero());
        assert!(h.journal_for(JournalReference::Payment(payment.id)).await.is_empty());

        let approved = service
            .approve_payment(payment.id, ApprovalDecision::Approve, &controller(), Some("ok".into()))
            .await
            .unwrap();

        assert_eq!(approved.payment_status, PaymentStatus::Success);
        assert_eq!(approved.approval_status, ApprovalStatus::Approved);
        assert_eq!(approved.approval_history.len(), 2);
        assert!(h.reload(&invoice).await.is_paid().unwrap());
    }

    #[tokio::test]
    async fn test_approval_quotes_discount_again() {
        let h = Harness::new().await;
        let vendor = h.discounting_vendor(dec!(2), 10).await;
        let order = h.received_order(&vendor, dec!(200000)).await;
        let invoice = h.invoice_on(&vendor, Some(&order), dec!(200000), days_from_today(-3)).await;
        let service = PaymentService::new(h.ctx.clone());

        let payment = service
            .create_payment(CreatePaymentRequest::new(invoice.id, usd(dec!(200000)), PaymentMethod::Wire), &clerk())
            .await
            .unwrap();
        assert_eq!(payment.approval_status, ApprovalStatus::Submitted);
        assert_eq!(payment.discount_applied.amount(), dec!(4000));

        // the vendor withdraws its terms before the controller signs off
        let mut withdrawn = vendor.clone();
        withdrawn.early_payment_discount = None;
        h.payables.save_vendor(&withdrawn).await.unwrap();

        let approved = service
            .approve_payment(payment.id, ApprovalDecision::Approve, &controller(), None)
            .await
            .unwrap();

        assert_eq!(approved.payment_status, PaymentStatus::Success);
        assert!(approved.discount_applied.is_zero());
        assert_eq!(approved.amount.amount(), dec!(200000));
        assert!(h.reload(&invoice).await.is_paid().unwrap());
        let entry = &h.journal_for(JournalReference::Payment(payment.id)).await[0];
        assert_eq!(entry.lines.len(), 2);
    }

    #[tokio::test]
    async fn test_rejection_is_terminal() {
        let h = Harness::new().await;
        let vendor = h.vendor().await;
        let invoice = h.payable_invoice(&vendor, dec!(200000)).await;
        let service = PaymentService::new(h.ctx.clone());
        let payment = service
            .create_payment(CreatePaymentRequest::new(invoice.id, usd(dec!(200000)), PaymentMethod::Wire), &clerk())
            .await
            .unwrap();

        let rejected = service
            .approve_payment(payment.id, ApprovalDecision::Reject, &controller(), Some("duplicate".into()))
            .await
            .unwrap();

        assert_eq!(rejected.payment_status, PaymentStatus::Failed);
        assert_eq!(rejected.approval_status, ApprovalStatus::Rejected);
        assert!(rejected.failure_reason.unwrap().contains("duplicate"));
        assert!(h.reload(&invoice).await.paid_amount.is_zero());
        assert!(h.webhooks.events().await.contains(&"payment.failed".to_string()));
    }

    #[tokio::test]
    async fn test_approving_non_submitted_payment_has_no_side_effects() {
        let h = Harness::new().await;
        let vendor = h.vendor().await;
        let invoice = h.payable_invoice(&vendor, dec!(500)).await;
        let service = PaymentService::new(h.ctx.clone());
        let settled = service
            .create_payment(CreatePaymentRequest::new(invoice.id, usd(dec!(500)), PaymentMethod::Wire), &clerk())
            .await
            .unwrap();
        let entries_before = h.ledger.entry_count().await;
        let audit_before = h.audit.events().await.len();

        let result = service
            .approve_payment(settled.id, ApprovalDecision::Approve, &controller(), None)
            .await;

        assert!(matches!(result, Err(SettlementError::StateConflict(_))));
        assert_eq!(service.get_payment(settled.id).await.unwrap(), settled);
        assert_eq!(h.ledger.entry_count().await, entries_before);
        assert_eq!(h.audit.events().await.len(), audit_before);
    }

    #[tokio::test]
    async fn test_approved_future_payment_waits_for_schedule() {
        let h = Harness::new().await;
        let vendor = h.vendor().await;
        let invoice = h.payable_invoice(&vendor, dec!(160000)).await;
        let service = PaymentService::new(h.ctx.clone());
        let payment = service
            .create_payment(
                CreatePaymentRequest::new(invoice.id, usd(dec!(160000)), PaymentMethod::Wire)
                    .scheduled_for(days_from_today(4)),
                &clerk(),
            )
            .await
            .unwrap();

        let approved = service
            .approve_payment(payment.id, ApprovalDecision::Approve, &controller(), None)
            .await
            .unwrap();
        assert_eq!(approved.payment_status, PaymentStatus::Pending);
        assert_eq!(approved.approval_status, ApprovalStatus::Approved);

        let cancel = service.cancel_payment(payment.id, &clerk(), None).await;
        assert!(matches!(cancel, Err(SettlementError::StateConflict(_))));

        let report = service.process_scheduled(days_from_today(4)).await.unwrap();
        assert_eq!(report.settled, 1);
        assert!(h.reload(&invoice).await.is_paid().unwrap());
    }
}

mod drafts_and_edits {
    use super::*;

    #[tokio::test]
    async fn test_draft_then_submit() {
        let h = Harness::new().await;
        let vendor = h.vendor().await;
        let invoice = h.payable_invoice(&vendor, dec!(900)).await;
        let service = PaymentService::new(h.ctx.clone());

        let draft = service
            .create_payment(
                CreatePaymentRequest::new(invoice.id, usd(dec!(900)), PaymentMethod::Wire).as_draft(),
                &clerk(),
            )
            .await
            .unwrap();
        assert_eq!(draft.approval_status, ApprovalStatus::Draft);
        assert!(h.reload(&invoice).await.paid_amount.is_zero());

        let edited = service
            .update_payment(
                draft.id,
                UpdatePaymentRequest {
                    method: Some(PaymentMethod::Ach),
                    notes: Some("vendor asked for ACH".into()),
                    ..Default::default()
                },
                &clerk(),
            )
            .await
            .unwrap();
        assert_eq!(edited.method, PaymentMethod::Ach);

        let submitted = service.submit_payment(draft.id, &clerk()).await.unwrap();
        assert_eq!(submitted.payment_status, PaymentStatus::Success);

        let resubmit = service.submit_payment(draft.id, &clerk()).await;
        assert!(matches!(resubmit, Err(SettlementError::StateConflict(_))));
    }

    #[tokio::test]
    async fn test_cancel_pending_payment() {
        let h = Harness::new().await;
        let vendor = h.vendor().await;
        let invoice = h.payable_invoice(&vendor, dec!(400)).await;
        let service = PaymentService::new(h.ctx.clone());
        let scheduled = service
            .create_payment(
                CreatePaymentRequest::new(invoice.id, usd(dec!(400)), PaymentMethod::Wire)
                    .scheduled_for(days_from_today(7)),
                &clerk(),
            )
            .await
            .unwrap();

        let cancelled = service
            .cancel_payment(scheduled.id, &clerk(), Some("wrong bank".into()))
            .await
            .unwrap();
        assert_eq!(cancelled.payment_status, PaymentStatus::Failed);

        let report = service.process_scheduled(days_from_today(7)).await.unwrap();
        assert_eq!(report.examined, 0);
        assert!(h.reload(&invoice).await.paid_amount.is_zero());
    }

    #[tokio::test]
    async fn test_settled_payment_cannot_be_edited() {
        let h = Harness::new().await;
        let vendor = h.vendor().await;
        let invoice = h.payable_invoice(&vendor, dec!(50)).await;
        let service = PaymentService::new(h.ctx.clone());
        let payment = service
            .create_payment(CreatePaymentRequest::new(invoice.id, usd(dec!(50)), PaymentMethod::Wire), &clerk())
            .await
            .unwrap();

        let result = service
            .update_payment(payment.id, UpdatePaymentRequest::default(), &clerk())
            .await;
        assert!(matches!(result, Err(SettlementError::StateConflict(_))));
    }
}

mod scheduler {
    use super::*;

    #[tokio::test]
    async fn test_scheduled_payment_settles_when_due() {
        let h = Harness::new().await;
        let vendor = h.vendor().await;
        let invoice = h.payable_invoice(&vendor, dec!(2500)).await;
        let service = PaymentService::new(h.ctx.clone());
        let payment = service
            .create_payment(
                CreatePaymentRequest::new(invoice.id, usd(dec!(2500)), PaymentMethod::Wire)
                    .scheduled_for(days_from_today(3)),
                &clerk(),
            )
            .await
            .unwrap();
        assert_eq!(payment.payment_status, PaymentStatus::Pending);

        let early = service.process_scheduled(today()).await.unwrap();
        assert_eq!(early.examined, 0);

        let due = service.process_scheduled(days_from_today(3)).await.unwrap();
        assert_eq!(due.examined, 1);
        assert_eq!(due.settled, 1);
        assert_eq!(service.get_payment(payment.id).await.unwrap().payment_status, PaymentStatus::Success);
    }

    #[tokio::test]
    async fn test_discount_is_judged_on_the_day_the_payment_settles() {
        let h = Harness::new().await;
        let vendor = h.discounting_vendor(dec!(2), 10).await;
        let order = h.received_order(&vendor, dec!(5000)).await;
        let invoice = h.invoice_on(&vendor, Some(&order), dec!(5000), days_from_today(-5)).await;
        let service = PaymentService::new(h.ctx.clone());

        let scheduled = service
            .create_payment(
                CreatePaymentRequest::new(invoice.id, usd(dec!(5000)), PaymentMethod::Ach)
                    .scheduled_for(days_from_today(3)),
                &clerk(),
            )
            .await
            .unwrap();
        assert_eq!(scheduled.discount_applied.amount(), dec!(100));
        assert_eq!(scheduled.payment_date, days_from_today(3));

        // the sweep only gets to it on day 30, well past the window
        let report = service.process_scheduled(days_from_today(30)).await.unwrap();
        assert_eq!(report.settled, 1);

        let settled = service.get_payment(scheduled.id).await.unwrap();
        assert!(settled.discount_applied.is_zero());
        assert_eq!(settled.amount.amount(), dec!(5000));
        assert_eq!(settled.payment_date, days_from_today(30));
        assert!(h.reload(&invoice).await.is_paid().unwrap());

        let entry = &h.journal_for(JournalReference::Payment(scheduled.id)).await[0];
        assert_eq!(entry.entry_date, days_from_today(30));
        assert!(entry.lines.iter().all(|l| l.account_code != AccountCode::PurchaseDiscounts));
    }

    #[tokio::test]
    async fn test_schedule_past_the_window_is_quoted_without_discount() {
        let h = Harness::new().await;
        let vendor = h.discounting_vendor(dec!(2), 10).await;
        let order = h.received_order(&vendor, dec!(5000)).await;
        let invoice = h.invoice_on(&vendor, Some(&order), dec!(5000), today()).await;

        let payment = PaymentService::new(h.ctx.clone())
            .create_payment(
                CreatePaymentRequest::new(invoice.id, usd(dec!(5000)), PaymentMethod::Ach)
                    .on(today())
                    .scheduled_for(days_from_today(30)),
                &clerk(),
            )
            .await
            .unwrap();

        assert_eq!(payment.payment_status, PaymentStatus::Pending);
        assert!(payment.discount_applied.is_zero());
        assert_eq!(payment.amount.amount(), dec!(5000));
    }

    #[tokio::test]
    async fn test_due_payment_is_revalidated() {
        let h = Harness::new().await;
        let vendor = h.vendor().await;
        let invoice = h.payable_invoice(&vendor, dec!(800)).await;
        let service = PaymentService::new(h.ctx.clone());
        let scheduled = service
            .create_payment(
                CreatePaymentRequest::new(invoice.id, usd(dec!(800)), PaymentMethod::Wire)
                    .scheduled_for(days_from_today(2)),
                &clerk(),
            )
            .await
            .unwrap();
        service
            .create_payment(CreatePaymentRequest::new(invoice.id, usd(dec!(800)), PaymentMethod::Card), &clerk())
            .await
            .unwrap();

        let report = service.process_scheduled(days_from_today(2)).await.unwrap();
        assert_eq!(report.failed, 1);

        let failed = service.get_payment(scheduled.id).await.unwrap();
        assert_eq!(failed.payment_status, PaymentStatus::Failed);
        assert!(failed.failure_reason.unwrap().contains("already paid"));
        assert_eq!(h.reload(&invoice).await.paid_amount.amount(), dec!(800));
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried_then_failed() {
        let h = Harness::with_config(SettlementConfig::default().with_max_retries(3)).await;
        let vendor = h.vendor().await;
        let invoice = h.payable_invoice(&vendor, dec!(600)).await;
        let service = PaymentService::new(h.ctx.clone());

        h.payables.fail_invoice_writes(true);
        let result = service
            .create_payment(CreatePaymentRequest::new(invoice.id, usd(dec!(600)), PaymentMethod::Wire), &clerk())
            .await;
        assert!(result.unwrap_err().is_transient());

        let pending = h
            .payables
            .list_payments(&PaymentQuery::with_status(PaymentStatus::Pending))
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
        let id = pending[0].id;

        for attempt in 1..=2 {
            let report = service.process_scheduled(today()).await.unwrap();
            assert_eq!(report.retried, 1);
            assert_eq!(service.get_payment(id).await.unwrap().retry_count, attempt);
        }
        let last = service.process_scheduled(today()).await.unwrap();
        assert_eq!(last.failed, 1);

        let payment = service.get_payment(id).await.unwrap();
        assert_eq!(payment.payment_status, PaymentStatus::Failed);
        assert_eq!(payment.retry_count, 3);
        assert!(h.reload(&invoice).await.paid_amount.is_zero());
    }

    #[tokio::test]
    async fn test_interrupted_settlement_relieves_the_invoice_once() {
        let h = Harness::new().await;
        let vendor = h.vendor().await;
        let invoice = h.payable_invoice(&vendor, dec!(1000)).await;
        let service = PaymentService::new(h.ctx.clone());

        h.payables.fail_settled_payment_saves(1);
        let result = service
            .create_payment(CreatePaymentRequest::new(invoice.id, usd(dec!(400)), PaymentMethod::Wire), &clerk())
            .await;
        assert!(result.unwrap_err().is_transient());
        assert_eq!(h.reload(&invoice).await.paid_amount.amount(), dec!(400));

        let report = service.process_scheduled(today()).await.unwrap();
        assert_eq!(report.settled, 1);

        let stored = h.reload(&invoice).await;
        assert_eq!(stored.paid_amount.amount(), dec!(400));
        assert_eq!(stored.outstanding().unwrap().amount(), dec!(600));
        assert_eq!(stored.applied_payments.len(), 1);

        let payments = h.payables.list_payments(&PaymentQuery::default()).await.unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].payment_status, PaymentStatus::Success);
        assert_eq!(h.journal_for(JournalReference::Payment(payments[0].id)).await.len(), 1);
    }

    #[tokio::test]
    async fn test_absorbed_payment_outlives_the_retry_limit() {
        let h = Harness::with_config(SettlementConfig::default().with_max_retries(1)).await;
        let vendor = h.vendor().await;
        let invoice = h.payable_invoice(&vendor, dec!(1000)).await;
        let service = PaymentService::new(h.ctx.clone());

        h.payables.fail_settled_payment_saves(3);
        let _ = service
            .create_payment(CreatePaymentRequest::new(invoice.id, usd(dec!(400)), PaymentMethod::Wire), &clerk())
            .await;

        for _ in 0..2 {
            let report = service.process_scheduled(today()).await.unwrap();
            assert_eq!(report.retried, 1);
            assert_eq!(report.failed, 0);
        }
        let pending = h
            .payables
            .list_payments(&PaymentQuery::with_status(PaymentStatus::Pending))
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);

        let report = service.process_scheduled(today()).await.unwrap();
        assert_eq!(report.settled, 1);
        assert_eq!(h.reload(&invoice).await.paid_amount.amount(), dec!(400));
    }

    #[tokio::test]
    async fn test_retry_recovers_after_outage() {
        let h = Harness::new().await;
        let vendor = h.vendor().await;
        let invoice = h.payable_invoice(&vendor, dec!(350)).await;
        let service = PaymentService::new(h.ctx.clone());

        h.payables.fail_invoice_writes(true);
        let _ = service
            .create_payment(CreatePaymentRequest::new(invoice.id, usd(dec!(350)), PaymentMethod::Wire), &clerk())
            .await;
        assert_eq!(service.process_scheduled(today()).await.unwrap().retried, 1);

        h.payables.fail_invoice_writes(false);
        let report = service.process_scheduled(today()).await.unwrap();
        assert_eq!(report.settled, 1);
        assert!(h.reload(&invoice).await.is_paid().unwrap());
    }
}

mod concurrency {
    use super::*;

    #[tokio::test]
    async fn test_lost_invoice_race_fails_the_payment() {
        let h = Harness::new().await;
        let vendor = h.vendor().await;
        let invoice = h.payable_invoice(&vendor, dec!(1000)).await;
        let service = PaymentService::new(h.ctx.clone());

        h.payables.inject_invoice_conflicts(1);
        let payment = service
            .create_payment(CreatePaymentRequest::new(invoice.id, usd(dec!(1000)), PaymentMethod::Wire), &clerk())
            .await
            .unwrap();

        assert_eq!(payment.payment_status, PaymentStatus::Failed);
        assert!(payment.failure_reason.unwrap().contains("concurrent"));
        assert!(h.reload(&invoice).await.paid_amount.is_zero());
        assert!(h.journal_for(JournalReference::Payment(payment.id)).await.is_empty());
    }

    #[tokio::test]
    async fn test_stale_invoice_version_is_rejected() {
        let h = Harness::new().await;
        let vendor = h.vendor().await;
        let invoice = h.payable_invoice(&vendor, dec!(1000)).await;

        let mut concurrent = invoice.clone();
        concurrent.record_settlement(usd(dec!(100))).unwrap();
        h.payables.force_invoice(concurrent).await;

        let mut stale = invoice.clone();
        stale.record_settlement(usd(dec!(1000))).unwrap();
        let result = h.payables.save_invoice(&stale).await;
        assert!(result.unwrap_err().is_conflict());
    }

    #[tokio::test]
    async fn test_concurrent_payments_never_over_pay() {
        let h = Harness::new().await;
        let vendor = h.vendor().await;
        let invoice = h.payable_invoice(&vendor, dec!(1000)).await;
        let service = PaymentService::new(h.ctx.clone());

        let first = {
            let service = service.clone();
            let id = invoice.id;
            tokio::spawn(async move {
                service
                    .create_payment(CreatePaymentRequest::new(id, usd(dec!(1000)), PaymentMethod::Wire), &clerk())
                    .await
            })
        };
        let second = {
            let service = service.clone();
            let id = invoice.id;
            tokio::spawn(async move {
                service
                    .create_payment(CreatePaymentRequest::new(id, usd(dec!(1000)), PaymentMethod::Ach), &clerk())
                    .await
            })
        };
        let outcomes = [first.await.unwrap(), second.await.unwrap()];

        let settled = outcomes
            .iter()
            .filter(|r| matches!(r, Ok(p) if p.payment_status == PaymentStatus::Success))
            .count();
        assert_eq!(settled, 1);
        assert_eq!(h.reload(&invoice).await.paid_amount.amount(), dec!(1000));
    }
}

mod closed_periods {
    use super::*;
    use chrono::Datelike;

    #[tokio::test]
    async fn test_settlement_in_closed_period_skips_the_books() {
        let h = Harness::new().await;
        let vendor = h.vendor().await;
        let invoice = h.payable_invoice(&vendor, dec!(1200)).await;

        let now = today();
        PeriodService::new(h.ctx.clone())
            .close_period(now.month(), now.year(), &controller())
            .await
            .unwrap();

        let payment = PaymentService::new(h.ctx.clone())
            .create_payment(CreatePaymentRequest::new(invoice.id, usd(dec!(1200)), PaymentMethod::Wire), &clerk())
            .await
            .unwrap();

        assert_eq!(payment.payment_status, PaymentStatus::Success);
        assert!(h.reload(&invoice).await.is_paid().unwrap());
        assert!(h.journal_for(JournalReference::Payment(payment.id)).await.is_empty());

        // the vendor ledger keeps the invoice but never sees the payment
        let ledger = h.ctx.vendor_ledgers().get(vendor.id).await.unwrap().unwrap();
        assert!(ledger.total_paid.is_zero());
        assert_eq!(ledger.total_outstanding.amount(), dec!(1200));
    }
}

mod batches {
    use super::*;

    #[tokio::test]
    async fn test_paid_invoices_are_filtered_before_counting() {
        let h = Harness::new().await;
        let vendor = h.vendor().await;
        let paid = h.payable_invoice(&vendor, dec!(100)).await;
        let a = h.payable_invoice(&vendor, dec!(200)).await;
        let b = h.payable_invoice(&vendor, dec!(300)).await;
        PaymentService::new(h.ctx.clone())
            .create_payment(CreatePaymentRequest::new(paid.id, usd(dec!(100)), PaymentMethod::Wire), &clerk())
            .await
            .unwrap();

        let batch = BatchService::new(h.ctx.clone())
            .run_batch(vec![paid.id, a.id, b.id], PaymentMethod::Ach, &clerk())
            .await
            .unwrap();

        assert_eq!(batch.invoice_ids, vec![a.id, b.id]);
        assert_eq!(batch.processed_count, 2);
        assert_eq!(batch.failed_count, 0);
        assert_eq!(batch.status, BatchStatus::Completed);
        assert_eq!(batch.total_amount.amount(), dec!(500));
        assert!(h.reload(&a).await.is_paid().unwrap());
        assert!(h.reload(&b).await.is_paid().unwrap());

        let batch_payments = h
            .payables
            .list_payments(&PaymentQuery {
                batch_id: Some(batch.id),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(batch_payments.len(), 2);
        assert!(h.webhooks.events().await.contains(&"batch.completed".to_string()));
    }

    #[tokio::test]
    async fn test_item_failures_are_isolated() {
        let h = Harness::new().await;
        let vendor = h.vendor().await;
        let good = h.payable_invoice(&vendor, dec!(200)).await;
        let order = h.order(&vendor, dec!(300), PurchaseOrderStatus::Ordered).await;
        let undelivered = h.invoice_on(&vendor, Some(&order), dec!(300), today()).await;
        let service = BatchService::new(h.ctx.clone());

        let batch = service
            .run_batch(vec![good.id, undelivered.id], PaymentMethod::Wire, &clerk())
            .await
            .unwrap();

        assert_eq!(batch.processed_count, 1);
        assert_eq!(batch.failed_count, 1);
        assert_eq!(batch.status, BatchStatus::Completed);
        assert_eq!(batch.failures[0].invoice_id, undelivered.id);
        assert!(batch.failures[0].reason.contains("not been delivered"));
        assert_eq!(service.get_batch(batch.id).await.unwrap(), batch);
    }

    #[tokio::test]
    async fn test_interrupted_batch_item_stays_pending_and_settles_once() {
        let h = Harness::new().await;
        let vendor = h.vendor().await;
        let invoice = h.payable_invoice(&vendor, dec!(1000)).await;
        let payments = PaymentService::new(h.ctx.clone());

        h.payables.fail_settled_payment_saves(1);
        let batch = BatchService::new(h.ctx.clone())
            .run_batch(vec![invoice.id], PaymentMethod::Ach, &clerk())
            .await
            .unwrap();

        assert_eq!(batch.pending_count, 1);
        assert_eq!(batch.failed_count, 0);
        assert_eq!(batch.status, BatchStatus::Completed);
        let item = payments.get_payment(batch.payment_ids[0]).await.unwrap();
        assert_eq!(item.payment_status, PaymentStatus::Pending);
        assert!(h.reload(&invoice).await.is_paid().unwrap());

        let report = payments.process_scheduled(today()).await.unwrap();
        assert_eq!(report.settled, 1);
        assert_eq!(h.reload(&invoice).await.paid_amount.amount(), dec!(1000));
        assert_eq!(
            payments.get_payment(item.id).await.unwrap().payment_status,
            PaymentStatus::Success
        );
    }

    #[tokio::test]
    async fn test_batch_without_eligible_invoices() {
        let h = Harness::new().await;
        let service = BatchService::new(h.ctx.clone());

        let empty = service.run_batch(vec![], PaymentMethod::Wire, &clerk()).await;
        assert!(matches!(empty, Err(SettlementError::Validation(_))));

        let unknown = service
            .run_batch(vec![core_kernel::InvoiceId::new()], PaymentMethod::Wire, &clerk())
            .await;
        assert!(matches!(unknown, Err(SettlementError::Validation(ref r)) if r.contains("eligible")));
    }

    #[tokio::test]
    async fn test_batch_where_every_item_fails() {
        let h = Harness::new().await;
        let vendor = h.vendor().await;
        let invoice = h.invoice_on(&vendor, None, dec!(90), today()).await;

        let batch = BatchService::new(h.ctx.clone())
            .run_batch(vec![invoice.id], PaymentMethod::Wire, &clerk())
            .await
            .unwrap();

        assert_eq!(batch.status, BatchStatus::Failed);
        assert_eq!(batch.failed_count, 1);
        assert!(batch.payment_ids.is_empty());
    }
}

mod properties {
    use super::*;
    use core_kernel::Rate;
    use proptest::prelude::*;
    use test_utils::{
        discount_percentage_strategy, discount_window_strategy, installments_strategy, payment_method_strategy,
        PaymentRequestBuilder,
    };

    fn block_on<F: std::future::Future>(future: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(future)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn installments_settle_the_invoice_exactly(
            (total, parts) in installments_strategy(5),
            method in payment_method_strategy(),
        ) {
            block_on(async {
                let h = Harness::new().await;
                let vendor = h.vendor().await;
                let invoice = h.payable_invoice(&vendor, total.amount()).await;
                let service = PaymentService::new(h.ctx.clone());

                for part in &parts {
                    let payment = service
                        .create_payment(
                            PaymentRequestBuilder::new(invoice.id, *part).with_method(method).build(),
                            &clerk(),
                        )
                        .await
                        .unwrap();
                    assert_payment_status(&payment, PaymentStatus::Success);
                }

                let stored = h.reload(&invoice).await;
                assert!(stored.is_paid().unwrap());
                assert_money_eq(&stored.paid_amount, &total);
                assert_eq!(stored.applied_payments.len(), parts.len());

                let ledger = h.ctx.vendor_ledgers().get(vendor.id).await.unwrap().unwrap();
                assert_vendor_ledger_consistent(&ledger);
                assert_money_zero(&ledger.total_outstanding);
            });
        }

        #[test]
        fn discount_on_the_last_day_of_the_window(
            percentage in discount_percentage_strategy(),
            window in discount_window_strategy(),
        ) {
            block_on(async {
                let h = Harness::new().await;
                let vendor = h.discounting_vendor(percentage, window).await;
                let order = h.received_order(&vendor, dec!(10000)).await;
                let invoice_date = days_from_today(-i64::from(window));
                let invoice = h.invoice_on(&vendor, Some(&order), dec!(10000), invoice_date).await;

                let payment = PaymentService::new(h.ctx.clone())
                    .create_payment(CreatePaymentRequest::new(invoice.id, usd(dec!(10000)), PaymentMethod::Wire), &clerk())
                    .await
                    .unwrap();

                let expected = Rate::from_percentage(percentage).apply(&usd(dec!(10000)));
                assert_money_eq(&payment.discount_applied, &expected);
                assert_money_eq(&payment.gross_amount().unwrap(), &usd(dec!(10000)));
                assert!(h.reload(&invoice).await.is_paid().unwrap());
            });
        }
    }
}
