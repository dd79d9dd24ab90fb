pub mod allocation;
pub mod receipt_number;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::catalog::FeeCatalog;
use crate::config::LedgerConfig;
use crate::decimal::Money;
use crate::directory::StudentDirectory;
use crate::errors::{LedgerError, Result};
use crate::events::Event;
use crate::receipts::{Receipt, ReceiptContext};
use crate::state::{lock, FeeAccount, LedgerStore, StudentFee};
use crate::types::{DueAllocation, FeeStatus, PaymentId, PaymentMethod, StudentFeeId, StudentId};

pub use receipt_number::ReceiptSequence;

/// payment request
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRequest {
    pub student_fee_id: StudentFeeId,
    pub amount: Money,
    pub discount_amount: Money,
    pub discount_reason: Option<String>,
    pub method: PaymentMethod,
    pub transaction_id: Option<String>,
    pub remarks: Option<String>,
    /// version the caller last saw; a stale value fails with a conflict
    pub expected_version: Option<u64>,
}

impl PaymentRequest {
    pub fn new(student_fee_id: StudentFeeId, amount: Money, method: PaymentMethod) -> Self {
        Self {
            student_fee_id,
            amount,
            discount_amount: Money::ZERO,
            discount_reason: None,
            method,
            transaction_id: None,
            remarks: None,
            expected_version: None,
        }
    }

    pub fn with_discount(mut self, discount: Money, reason: impl Into<String>) -> Self {
        self.discount_amount = discount;
        self.discount_reason = Some(reason.into());
        self
    }

    pub fn with_transaction_id(mut self, transaction_id: impl Into<String>) -> Self {
        self.transaction_id = Some(transaction_id.into());
        self
    }

    pub fn with_remarks(mut self, remarks: impl Into<String>) -> Self {
        self.remarks = Some(remarks.into());
        self
    }

    pub fn expecting_version(mut self, version: u64) -> Self {
        self.expected_version = Some(version);
        self
    }

    /// checks that need no ledger state
    pub fn validate(&self) -> Result<()> {
        if !self.amount.is_positive() {
            return Err(LedgerError::InvalidAmount {
                amount: self.amount,
                reason: "payment amount must be positive".to_string(),
            });
        }
        if self.discount_amount.is_negative() {
            return Err(LedgerError::InvalidAmount {
                amount: self.discount_amount,
                reason: "discount cannot be negative".to_string(),
            });
        }
        if self.discount_amount.is_positive() && self.discount_reason().is_none() {
            return Err(LedgerError::DiscountReasonRequired {
                discount: self.discount_amount,
            });
        }
        Ok(())
    }

    /// cash plus discount
    pub fn total_credit(&self) -> Money {
        self.amount + self.discount_amount
    }

    fn discount_reason(&self) -> Option<String> {
        non_blank(self.discount_reason.as_deref())
    }
}

/// append-only journal entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub student_id: StudentId,
    pub student_fee_id: StudentFeeId,
    /// negative on reversals
    pub amount: Money,
    pub discount_amount: Money,
    pub discount_reason: Option<String>,
    pub method: PaymentMethod,
    pub payment_date: DateTime<Utc>,
    pub receipt_number: String,
    pub transaction_id: Option<String>,
    pub remarks: Option<String>,
    pub allocations: Vec<DueAllocation>,
    /// receipt number of the entry this one reverses
    pub reverses: Option<String>,
}

impl Payment {
    pub fn is_reversal(&self) -> bool {
        self.reverses.is_some()
    }

    pub fn total_credit(&self) -> Money {
        self.amount + self.discount_amount
    }
}

/// everything a committed payment produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentOutcome {
    pub payment: Payment,
    pub receipt: Receipt,
    pub student_fee: StudentFee,
}

/// applies payments, reversals, waivers and overdue marking to the store
pub struct PaymentLedger<'a> {
    store: &'a LedgerStore,
    catalog: &'a FeeCatalog,
    directory: &'a dyn StudentDirectory,
    config: &'a LedgerConfig,
}

impl<'a> PaymentLedger<'a> {
    pub fn new(
        store: &'a LedgerStore,
        catalog: &'a FeeCatalog,
        directory: &'a dyn StudentDirectory,
        config: &'a LedgerConfig,
    ) -> Self {
        Self {
            store,
            catalog,
            directory,
            config,
        }
    }

    /// record a payment, optionally with a discount.
    ///
    /// all checks run before anything changes; the account, journal entry and
    /// receipt are committed together under the account lock.
    #[instrument(skip_all, fields(student_fee_id = %request.student_fee_id, amount = %request.amount))]
    pub fn record(&self, request: PaymentRequest, time: &SafeTimeProvider) -> Result<PaymentOutcome> {
        if let Err(e) = request.validate() {
            warn!(error = %e, "payment rejected");
            return Err(e);
        }

        let handle = self.store.account_handle(request.student_fee_id)?;
        let snapshot = lock(&handle).fee.clone();
        let context = ReceiptContext::resolve(&snapshot, self.catalog, self.directory);

        let now = time.now();
        let mut account = lock(&handle);

        if let Err(e) = check_payable(&account.fee, &request) {
            warn!(error = %e, "payment rejected");
            return Err(e);
        }

        let mut next = account.clone();
        let allocations = if next.has_installments() {
            allocation::allocate(&mut next.dues, request.amount, request.discount_amount, now.date_naive())?
        } else {
            Vec::new()
        };

        let old_status = next.fee.status;
        next.fee.paid_amount += request.amount;
        next.fee.discount_amount += request.discount_amount;
        next.fee.recompute_due();
        next.fee.last_payment_date = Some(now);
        next.fee.status = FeeStatus::derive(next.fee.total_amount, next.fee.settled(), old_status);
        next.fee.version += 1;
        verify(&next)?;

        let receipt_number = self
            .config
            .format_receipt_number(now.year(), self.store.next_sequence());
        let payment = Payment {
            id: Uuid::new_v4(),
            student_id: next.fee.student_id,
            student_fee_id: next.fee.id,
            amount: request.amount,
            discount_amount: request.discount_amount,
            discount_reason: request.discount_reason(),
            method: request.method,
            payment_date: now,
            receipt_number: receipt_number.clone(),
            transaction_id: non_blank(request.transaction_id.as_deref()),
            remarks: non_blank(request.remarks.as_deref()),
            allocations: allocations.clone(),
            reverses: None,
        };
        let receipt = Receipt::issue(&payment, context, &next.fee, now);

        self.store.receipts().insert(receipt.clone())?;
        self.store.append_payment(payment.clone());
        let fee = next.fee.clone();
        *account = next;
        drop(account);

        let mut events = vec![
            Event::PaymentRecorded {
                student_fee_id: fee.id,
                receipt_number: receipt_number.clone(),
                amount: payment.amount,
                discount: payment.discount_amount,
                allocations,
                timestamp: now,
            },
            Event::ReceiptIssued {
                receipt_number: receipt_number.clone(),
                student_fee_id: fee.id,
                timestamp: now,
            },
        ];
        if fee.status != old_status {
            events.push(Event::StatusChanged {
                student_fee_id: fee.id,
                old_status,
                new_status: fee.status,
                reason: "payment recorded".to_string(),
                timestamp: now,
            });
        }
        self.store.emit_all(events);

        info!(
            receipt_number = %receipt_number,
            due = %fee.due_amount,
            status = %fee.status,
            "payment recorded"
        );
        Ok(PaymentOutcome {
            payment,
            receipt,
            student_fee: fee,
        })
    }

    /// append a negative entry undoing an earlier payment
    #[instrument(skip_all, fields(receipt_number = %receipt_number))]
    pub fn reverse(&self, receipt_number: &str, reason: &str, time: &SafeTimeProvider) -> Result<PaymentOutcome> {
        let reason = non_blank(Some(reason)).ok_or(LedgerError::MissingField {
            field: "reversal.reason",
        })?;
        let original = self
            .store
            .find_payment(receipt_number)
            .ok_or_else(|| LedgerError::not_found("payment", receipt_number))?;
        if original.is_reversal() {
            return Err(LedgerError::ReversalNotReversible {
                receipt_number: receipt_number.to_string(),
            });
        }

        let handle = self.store.account_handle(original.student_fee_id)?;
        let snapshot = lock(&handle).fee.clone();
        let context = ReceiptContext::resolve(&snapshot, self.catalog, self.directory);

        let now = time.now();
        let mut account = lock(&handle);

        if let Some(reversed_by) = self.store.reversal_of(receipt_number) {
            warn!(%reversed_by, "reversal rejected");
            return Err(LedgerError::AlreadyReversed {
                receipt_number: receipt_number.to_string(),
                reversed_by,
            });
        }
        if account.fee.status == FeeStatus::Waived {
            return Err(LedgerError::FeeWaived { id: account.fee.id });
        }

        let mut next = account.clone();
        let lines = if next.has_installments() {
            allocation::unwind(&mut next.dues, &original.allocations, now.date_naive())?
        } else {
            Vec::new()
        };

        let old_status = next.fee.status;
        next.fee.paid_amount -= original.amount;
        next.fee.discount_amount -= original.discount_amount;
        next.fee.recompute_due();
        next.fee.status = FeeStatus::derive(next.fee.total_amount, next.fee.settled(), old_status);
        next.fee.version += 1;
        verify(&next)?;

        let reversal_number = self
            .config
            .format_receipt_number(now.year(), self.store.next_sequence());
        let reversal = Payment {
            id: Uuid::new_v4(),
            student_id: original.student_id,
            student_fee_id: original.student_fee_id,
            amount: -original.amount,
            discount_amount: -original.discount_amount,
            discount_reason: original.discount_reason.clone(),
            method: original.method,
            payment_date: now,
            receipt_number: reversal_number.clone(),
            transaction_id: None,
            remarks: Some(reason.clone()),
            allocations: lines,
            reverses: Some(original.receipt_number.clone()),
        };
        let receipt = Receipt::issue(&reversal, context, &next.fee, now);

        self.store.receipts().insert(receipt.clone())?;
        self.store.append_payment(reversal.clone());
        self.store
            .mark_reversed(original.receipt_number.clone(), reversal_number.clone());
        let fee = next.fee.clone();
        *account = next;
        drop(account);

        let mut events = vec![
            Event::PaymentReversed {
                student_fee_id: fee.id,
                receipt_number: reversal_number.clone(),
                reverses: original.receipt_number.clone(),
                amount: reversal.amount,
                discount: reversal.discount_amount,
                timestamp: now,
            },
            Event::ReceiptIssued {
                receipt_number: reversal_number.clone(),
                student_fee_id: fee.id,
                timestamp: now,
            },
        ];
        if fee.status != old_status {
            events.push(Event::StatusChanged {
                student_fee_id: fee.id,
                old_status,
                new_status: fee.status,
                reason: format!("reversal: {}", reason),
                timestamp: now,
            });
        }
        self.store.emit_all(events);

        info!(reversal = %reversal_number, due = %fee.due_amount, status = %fee.status, "payment reversed");
        Ok(PaymentOutcome {
            payment: reversal,
            receipt,
            student_fee: fee,
        })
    }

    /// forgive the remaining due; terminal
    #[instrument(skip_all, fields(student_fee_id = %student_fee_id))]
    pub fn waive(&self, student_fee_id: StudentFeeId, reason: &str, time: &SafeTimeProvider) -> Result<StudentFee> {
        let reason = non_blank(Some(reason)).ok_or(LedgerError::MissingField {
            field: "waiver.reason",
        })?;
        let handle = self.store.account_handle(student_fee_id)?;
        let now = time.now();
        let mut account = lock(&handle);

        if account.fee.status == FeeStatus::Waived {
            debug!("fee already waived");
            return Ok(account.fee.clone());
        }

        let mut next = account.clone();
        let old_status = next.fee.status;
        next.fee.status = FeeStatus::Waived;
        next.fee.waiver_reason = Some(reason.clone());
        next.fee.version += 1;
        for due in next.dues.iter_mut().filter(|d| d.status != FeeStatus::Paid) {
            due.status = FeeStatus::Waived;
        }
        verify(&next)?;

        let fee = next.fee.clone();
        *account = next;
        drop(account);

        self.store.emit_all(vec![
            Event::StatusChanged {
                student_fee_id,
                old_status,
                new_status: FeeStatus::Waived,
                reason: reason.clone(),
                timestamp: now,
            },
            Event::FeeWaived {
                student_fee_id,
                waived_due: fee.due_amount,
                reason,
                timestamp: now,
            },
        ]);

        info!(waived_due = %fee.due_amount, "fee waived");
        Ok(fee)
    }

    /// persist the overdue label on open fees and installments due before `as_of`.
    ///
    /// returns how many fees and installments changed; running it again for the
    /// same date changes nothing.
    #[instrument(skip(self))]
    pub fn recompute_overdue(&self, as_of: NaiveDate) -> Result<usize> {
        let mut marked = 0;

        for handle in self.store.account_handles() {
            let mut account = lock(&handle);
            let mut next = account.clone();
            let mut events = Vec::new();

            for due in next.dues.iter_mut().filter(|d| marks_overdue(d.status, d.due_date, as_of)) {
                due.status = FeeStatus::Overdue;
                events.push(Event::OverdueMarked {
                    student_fee_id: next.fee.id,
                    period: Some(due.period),
                    due_date: due.due_date,
                    as_of,
                });
            }
            if marks_overdue(next.fee.status, next.fee.due_date, as_of) {
                next.fee.status = FeeStatus::Overdue;
                events.push(Event::OverdueMarked {
                    student_fee_id: next.fee.id,
                    period: None,
                    due_date: next.fee.due_date,
                    as_of,
                });
            }
            if events.is_empty() {
                continue;
            }

            next.fee.version += 1;
            verify(&next)?;
            *account = next;
            drop(account);

            marked += events.len();
            self.store.emit_all(events);
        }

        if marked > 0 {
            info!(marked, "overdue labels persisted");
        }
        Ok(marked)
    }
}

fn check_payable(fee: &StudentFee, request: &PaymentRequest) -> Result<()> {
    if let Some(expected) = request.expected_version {
        if expected != fee.version {
            return Err(LedgerError::Conflict {
                student_fee_id: fee.id,
                expected,
                actual: fee.version,
                current_due: fee.due_amount,
            });
        }
    }
    if fee.status == FeeStatus::Waived {
        return Err(LedgerError::FeeWaived { id: fee.id });
    }
    let requested = request.total_credit();
    if requested > fee.due_amount {
        return Err(LedgerError::Overpayment {
            due: fee.due_amount,
            requested,
        });
    }
    Ok(())
}

fn marks_overdue(status: FeeStatus, due_date: NaiveDate, as_of: NaiveDate) -> bool {
    matches!(status, FeeStatus::Pending | FeeStatus::Partial) && due_date < as_of
}

fn verify(account: &FeeAccount) -> Result<()> {
    account.check_invariant().map_err(|e| {
        error!(student_fee_id = %account.fee.id, error = %e, "ledger invariant violated");
        e
    })
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_request_validation() {
        let id = Uuid::new_v4();

        let zero = PaymentRequest::new(id, Money::ZERO, PaymentMethod::Cash);
        assert!(matches!(zero.validate(), Err(LedgerError::InvalidAmount { .. })));

        let negative_discount = PaymentRequest::new(id, Money::from_major(100), PaymentMethod::Cash)
            .with_discount(Money::from_major(-5), "typo");
        assert!(matches!(negative_discount.validate(), Err(LedgerError::InvalidAmount { .. })));

        let blank_reason = PaymentRequest::new(id, Money::from_major(100), PaymentMethod::Upi)
            .with_discount(Money::from_major(500), "   ");
        assert!(matches!(
            blank_reason.validate(),
            Err(LedgerError::DiscountReasonRequired { .. })
        ));

        let ok = PaymentRequest::new(id, Money::from_decimal(dec!(99.99)), PaymentMethod::Card)
            .with_discount(Money::from_major(10), "sibling")
            .with_transaction_id("TXN-1");
        assert!(ok.validate().is_ok());
        assert_eq!(ok.total_credit(), Money::from_decimal(dec!(109.99)));
    }

    #[test]
    fn test_zero_discount_needs_no_reason() {
        let request = PaymentRequest::new(Uuid::new_v4(), Money::from_major(1), PaymentMethod::Cash);
        assert!(request.validate().is_ok());
        assert_eq!(request.discount_reason(), None);
    }

    #[test]
    fn test_overdue_marking_rule() {
        let due = NaiveDate::from_ymd_opt(2024, 4, 10).unwrap();
        let after = NaiveDate::from_ymd_opt(2024, 4, 11).unwrap();

        assert!(marks_overdue(FeeStatus::Pending, due, after));
        assert!(marks_overdue(FeeStatus::Partial, due, after));
        assert!(!marks_overdue(FeeStatus::Pending, due, due));
        assert!(!marks_overdue(FeeStatus::Paid, due, after));
        assert!(!marks_overdue(FeeStatus::Overdue, due, after));
        assert!(!marks_overdue(FeeStatus::Waived, due, after));
    }
}
