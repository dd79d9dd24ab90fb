use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::decimal::Money;

/// unique identifier for a fee type
pub type FeeTypeId = Uuid;
/// unique identifier for a fee structure
pub type FeeStructureId = Uuid;
/// unique identifier for a student fee obligation
pub type StudentFeeId = Uuid;
/// unique identifier for a payment journal entry
pub type PaymentId = Uuid;
/// identifier owned by the external student directory
pub type StudentId = Uuid;
/// identifier owned by the external class directory
pub type ClassId = Uuid;

/// fee categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeeCategory {
    Tuition,
    Admission,
    Exam,
    Transport,
    Library,
    Laboratory,
    Sports,
    Miscellaneous,
    Other,
}

/// billing frequency of a fee structure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Frequency {
    OneTime,
    Monthly,
    Quarterly,
    HalfYearly,
    Yearly,
}

impl Frequency {
    /// months covered by one billing period, none for one-time fees
    pub fn months_per_period(&self) -> Option<u32> {
        match self {
            Frequency::OneTime => None,
            Frequency::Monthly => Some(1),
            Frequency::Quarterly => Some(3),
            Frequency::HalfYearly => Some(6),
            Frequency::Yearly => Some(12),
        }
    }

    pub fn is_recurring(&self) -> bool {
        !matches!(self, Frequency::OneTime)
    }
}

/// status shared by student fees and their monthly dues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeeStatus {
    /// nothing settled yet
    Pending,
    /// partly settled by payments or discounts
    Partial,
    /// fully settled
    Paid,
    /// due date passed while unresolved
    Overdue,
    /// forgiven by an administrator, terminal
    Waived,
}

impl FeeStatus {
    /// status implied by the settled amount, per the payment-path rules.
    ///
    /// waived stays waived; nothing settled keeps the previous pending or
    /// overdue label.
    pub fn derive(total: Money, settled: Money, previous: FeeStatus) -> FeeStatus {
        if previous == FeeStatus::Waived {
            return FeeStatus::Waived;
        }
        if settled >= total {
            FeeStatus::Paid
        } else if settled.is_positive() {
            FeeStatus::Partial
        } else if previous == FeeStatus::Overdue {
            FeeStatus::Overdue
        } else {
            FeeStatus::Pending
        }
    }

    /// paid or waived, no longer collectible
    pub fn is_resolved(&self) -> bool {
        matches!(self, FeeStatus::Paid | FeeStatus::Waived)
    }

    /// can still receive payments
    pub fn is_open(&self) -> bool {
        !self.is_resolved()
    }
}

impl fmt::Display for FeeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FeeStatus::Pending => "PENDING",
            FeeStatus::Partial => "PARTIAL",
            FeeStatus::Paid => "PAID",
            FeeStatus::Overdue => "OVERDUE",
            FeeStatus::Waived => "WAIVED",
        };
        f.write_str(label)
    }
}

/// how a payment was tendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    Card,
    Upi,
    BankTransfer,
    Cheque,
    Online,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PaymentMethod::Cash => "CASH",
            PaymentMethod::Card => "CARD",
            PaymentMethod::Upi => "UPI",
            PaymentMethod::BankTransfer => "BANK_TRANSFER",
            PaymentMethod::Cheque => "CHEQUE",
            PaymentMethod::Online => "ONLINE",
        };
        f.write_str(label)
    }
}

/// where the leftover minor units go when splitting a total into installments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RemainderPolicy {
    #[default]
    Last,
    First,
}

/// calendar month a monthly due belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PeriodKey {
    pub year: i32,
    pub month: u32,
}

impl PeriodKey {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    /// the month `months` after this one
    pub fn plus_months(&self, months: u32) -> Self {
        let zero_based = self.year * 12 + (self.month as i32 - 1) + months as i32;
        Self {
            year: zero_based.div_euclid(12),
            month: zero_based.rem_euclid(12) as u32 + 1,
        }
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// share of one payment credited to one installment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DueAllocation {
    pub period: PeriodKey,
    pub to_paid: Money,
    pub to_discount: Money,
}

impl DueAllocation {
    pub fn total_applied(&self) -> Money {
        self.to_paid + self.to_discount
    }
}
