// immutable payment receipts.
//
// a receipt is a snapshot taken when its payment commits. labels are copied
// from the directory and catalog at that moment, so later renames or
// transfers never change a reprint.

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::catalog::FeeCatalog;
use crate::decimal::Money;
use crate::directory::StudentDirectory;
use crate::errors::{LedgerError, Result};
use crate::payments::Payment;
use crate::state::StudentFee;
use crate::types::{DueAllocation, FeeCategory, FeeStatus, PaymentId, PaymentMethod, StudentFeeId, StudentId};

/// display labels resolved at payment time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptContext {
    pub student_name: String,
    pub roll_number: String,
    pub class_name: String,
    pub fee_type_name: String,
    pub fee_category: FeeCategory,
    pub academic_year: String,
}

impl ReceiptContext {
    /// look up labels for a fee, falling back to placeholders for unknown records
    pub fn resolve(fee: &StudentFee, catalog: &FeeCatalog, directory: &dyn StudentDirectory) -> Self {
        let student = directory.student(fee.student_id);
        let class_name = directory
            .class(fee.class_id)
            .map(|c| c.display_name())
            .unwrap_or_else(|| "unknown class".to_string());
        let fee_type = catalog.fee_type(fee.fee_type_id).ok();

        Self {
            student_name: student
                .as_ref()
                .map(|s| s.name.clone())
                .unwrap_or_else(|| "unknown student".to_string()),
            roll_number: student
                .map(|s| s.roll_number)
                .unwrap_or_else(|| "-".to_string()),
            class_name,
            fee_type_name: fee_type
                .as_ref()
                .map(|t| t.name.clone())
                .unwrap_or_else(|| "unknown fee type".to_string()),
            fee_category: fee_type.map(|t| t.category).unwrap_or(FeeCategory::Other),
            academic_year: fee.academic_year.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub receipt_number: String,
    pub payment_id: PaymentId,
    pub student_fee_id: StudentFeeId,
    pub student_id: StudentId,

    // labels
    pub student_name: String,
    pub roll_number: String,
    pub class_name: String,
    pub fee_type_name: String,
    pub fee_category: FeeCategory,
    pub academic_year: String,

    // the transaction
    pub amount: Money,
    pub discount_amount: Money,
    pub discount_reason: Option<String>,
    pub method: PaymentMethod,
    pub transaction_id: Option<String>,
    pub remarks: Option<String>,
    pub payment_date: DateTime<Utc>,
    pub lines: Vec<DueAllocation>,
    pub reverses: Option<String>,

    // balances right after the payment
    pub total_amount: Money,
    pub paid_to_date: Money,
    pub discount_to_date: Money,
    pub balance_due: Money,
    pub status_after: FeeStatus,

    pub issued_at: DateTime<Utc>,
}

impl Receipt {
    /// build the snapshot for a committed payment
    pub fn issue(
        payment: &Payment,
        context: ReceiptContext,
        fee_after: &StudentFee,
        issued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            receipt_number: payment.receipt_number.clone(),
            payment_id: payment.id,
            student_fee_id: payment.student_fee_id,
            student_id: payment.student_id,
            student_name: context.student_name,
            roll_number: context.roll_number,
            class_name: context.class_name,
            fee_type_name: context.fee_type_name,
            fee_category: context.fee_category,
            academic_year: context.academic_year,
            amount: payment.amount,
            discount_amount: payment.discount_amount,
            discount_reason: payment.discount_reason.clone(),
            method: payment.method,
            transaction_id: payment.transaction_id.clone(),
            remarks: payment.remarks.clone(),
            payment_date: payment.payment_date,
            lines: payment.allocations.clone(),
            reverses: payment.reverses.clone(),
            total_amount: fee_after.total_amount,
            paid_to_date: fee_after.paid_amount,
            discount_to_date: fee_after.discount_amount,
            balance_due: fee_after.due_amount,
            status_after: fee_after.status,
            issued_at,
        }
    }

    /// cash plus discount credited by this receipt
    pub fn total_credit(&self) -> Money {
        self.amount + self.discount_amount
    }

    pub fn is_reversal(&self) -> bool {
        self.reverses.is_some()
    }

    pub fn to_json_pretty(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// receipts keyed by number
#[derive(Debug, Default)]
pub struct ReceiptBook {
    receipts: DashMap<String, Receipt>,
}

impl ReceiptBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// store a new receipt; a number can only be used once
    pub(crate) fn insert(&self, receipt: Receipt) -> Result<()> {
        match self.receipts.entry(receipt.receipt_number.clone()) {
            Entry::Occupied(existing) => Err(LedgerError::consistency(format!(
                "receipt number {} already issued",
                existing.key()
            ))),
            Entry::Vacant(slot) => {
                slot.insert(receipt);
                Ok(())
            }
        }
    }

    pub fn get(&self, receipt_number: &str) -> Option<Receipt> {
        self.receipts.get(receipt_number).map(|r| r.value().clone())
    }

    /// the stored snapshot, never regenerated
    pub fn reprint(&self, receipt_number: &str) -> Result<Receipt> {
        self.get(receipt_number)
            .ok_or_else(|| LedgerError::not_found("receipt", receipt_number))
    }

    /// receipts of one student fee in issue order
    pub fn for_student_fee(&self, student_fee_id: StudentFeeId) -> Vec<Receipt> {
        let mut receipts: Vec<Receipt> = self
            .receipts
            .iter()
            .filter(|r| r.student_fee_id == student_fee_id)
            .map(|r| r.value().clone())
            .collect();
        receipts.sort_by(|a, b| {
            a.issued_at
                .cmp(&b.issued_at)
                .then_with(|| a.receipt_number.cmp(&b.receipt_number))
        });
        receipts
    }

    pub fn len(&self) -> usize {
        self.receipts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receipts.is_empty()
    }
}
