use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, NaiveDate, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::events::{Event, EventStore};
use crate::payments::{Payment, ReceiptSequence};
use crate::receipts::ReceiptBook;
use crate::types::{
    ClassId, FeeStatus, FeeStructureId, FeeTypeId, PeriodKey, StudentFeeId, StudentId,
};

// every write replaces whole values, so a poisoned lock never guards a
// half-applied change and can be entered safely
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn read_guard<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write_guard<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// a student's obligation instantiated from a fee structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentFee {
    // identification
    pub id: StudentFeeId,
    pub student_id: StudentId,
    pub structure_id: FeeStructureId,

    // copied from the structure for reporting
    pub fee_type_id: FeeTypeId,
    pub class_id: ClassId,
    pub academic_year: String,

    // balances
    pub total_amount: Money,
    pub paid_amount: Money,
    pub discount_amount: Money,
    pub due_amount: Money,

    // status
    pub status: FeeStatus,
    pub due_date: NaiveDate,
    pub last_payment_date: Option<DateTime<Utc>>,
    pub assigned_at: DateTime<Utc>,
    pub waiver_reason: Option<String>,

    /// bumped on every committed mutation
    pub version: u64,
}

impl StudentFee {
    /// paid plus discounted
    pub fn settled(&self) -> Money {
        self.paid_amount + self.discount_amount
    }

    pub fn recompute_due(&mut self) {
        self.due_amount = self.total_amount - self.settled();
    }

    pub fn is_overdue_on(&self, as_of: NaiveDate) -> bool {
        self.due_date < as_of && !self.status.is_resolved()
    }

    pub fn check_invariant(&self) -> Result<()> {
        if self.due_amount.is_negative() {
            return Err(LedgerError::consistency(format!(
                "student fee {} has negative due {}",
                self.id, self.due_amount
            )));
        }
        if self.paid_amount.is_negative() || self.discount_amount.is_negative() {
            return Err(LedgerError::consistency(format!(
                "student fee {} has negative paid {} or discount {}",
                self.id, self.paid_amount, self.discount_amount
            )));
        }
        if self.settled() + self.due_amount != self.total_amount {
            return Err(LedgerError::consistency(format!(
                "student fee {}: paid {} + discount {} + due {} != total {}",
                self.id, self.paid_amount, self.discount_amount, self.due_amount, self.total_amount
            )));
        }
        Ok(())
    }
}

/// one installment of a periodic student fee
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyDue {
    pub student_fee_id: StudentFeeId,
    pub period: PeriodKey,
    pub amount: Money,
    pub paid_amount: Money,
    pub discount_amount: Money,
    pub status: FeeStatus,
    pub due_date: NaiveDate,
    pub paid_date: Option<NaiveDate>,
}

impl MonthlyDue {
    pub fn settled(&self) -> Money {
        self.paid_amount + self.discount_amount
    }

    pub fn outstanding(&self) -> Money {
        self.amount - self.settled()
    }

    pub fn is_overdue_on(&self, as_of: NaiveDate) -> bool {
        self.due_date < as_of && !self.status.is_resolved()
    }

    /// re-derive status and paid date after a balance change
    pub(crate) fn refresh_status(&mut self, on: NaiveDate) {
        self.status = FeeStatus::derive(self.amount, self.settled(), self.status);
        self.paid_date = match self.status {
            FeeStatus::Paid => self.paid_date.or(Some(on)),
            _ => None,
        };
    }
}

/// a student fee together with its installments, locked as one unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeAccount {
    pub fee: StudentFee,
    pub dues: Vec<MonthlyDue>,
}

impl FeeAccount {
    pub fn check_invariant(&self) -> Result<()> {
        self.fee.check_invariant()?;
        if self.dues.is_empty() {
            return Ok(());
        }

        let scheduled: Money = self.dues.iter().map(|d| d.amount).sum();
        if scheduled != self.fee.total_amount {
            return Err(LedgerError::consistency(format!(
                "student fee {}: installments sum to {} but total is {}",
                self.fee.id, scheduled, self.fee.total_amount
            )));
        }

        let paid: Money = self.dues.iter().map(|d| d.paid_amount).sum();
        let discount: Money = self.dues.iter().map(|d| d.discount_amount).sum();
        if paid != self.fee.paid_amount || discount != self.fee.discount_amount {
            return Err(LedgerError::consistency(format!(
                "student fee {}: installments carry paid {} discount {}, fee carries {} and {}",
                self.fee.id, paid, discount, self.fee.paid_amount, self.fee.discount_amount
            )));
        }

        if let Some(due) = self.dues.iter().find(|d| d.outstanding().is_negative()) {
            return Err(LedgerError::consistency(format!(
                "student fee {}: installment {} over-settled",
                self.fee.id, due.period
            )));
        }
        Ok(())
    }

    pub fn has_installments(&self) -> bool {
        !self.dues.is_empty()
    }
}

/// in-process ledger store.
///
/// each account sits behind its own mutex; the surrounding maps are sharded
/// so unrelated accounts never contend.
#[derive(Debug)]
pub struct LedgerStore {
    accounts: DashMap<StudentFeeId, Arc<Mutex<FeeAccount>>>,
    assignments: DashMap<(StudentId, FeeStructureId), StudentFeeId>,
    journal: DashMap<StudentFeeId, Vec<Payment>>,
    reversals: DashMap<String, String>,
    receipts: ReceiptBook,
    sequence: ReceiptSequence,
    events: Mutex<EventStore>,
}

impl LedgerStore {
    pub fn new(start_sequence: u64) -> Self {
        Self {
            accounts: DashMap::new(),
            assignments: DashMap::new(),
            journal: DashMap::new(),
            reversals: DashMap::new(),
            receipts: ReceiptBook::new(),
            sequence: ReceiptSequence::starting_at(start_sequence),
            events: Mutex::new(EventStore::new()),
        }
    }

    pub(crate) fn account_handle(&self, id: StudentFeeId) -> Result<Arc<Mutex<FeeAccount>>> {
        self.accounts
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| LedgerError::not_found("student fee", id))
    }

    pub fn account(&self, id: StudentFeeId) -> Result<FeeAccount> {
        let handle = self.account_handle(id)?;
        let account = lock(&handle).clone();
        Ok(account)
    }

    pub fn student_fee(&self, id: StudentFeeId) -> Result<StudentFee> {
        self.account(id).map(|account| account.fee)
    }

    pub fn find_assignment(&self, student_id: StudentId, structure_id: FeeStructureId) -> Option<StudentFeeId> {
        self.assignments
            .get(&(student_id, structure_id))
            .map(|entry| *entry.value())
    }

    /// publish a fully built account unless the pair is already assigned.
    ///
    /// `on_create` runs inside the pair's entry lock before publication; if it
    /// fails nothing is stored. returns the account and whether it is new.
    pub(crate) fn publish_account<F>(&self, account: FeeAccount, on_create: F) -> Result<(FeeAccount, bool)>
    where
        F: FnOnce() -> Result<()>,
    {
        let key = (account.fee.student_id, account.fee.structure_id);
        let existing = match self.assignments.entry(key) {
            Entry::Occupied(entry) => *entry.get(),
            Entry::Vacant(entry) => {
                account.check_invariant()?;
                on_create()?;
                let id = account.fee.id;
                self.accounts.insert(id, Arc::new(Mutex::new(account.clone())));
                entry.insert(id);
                return Ok((account, true));
            }
        };
        Ok((self.account(existing)?, false))
    }

    /// handles cloned out of the map so no shard stays locked while callers wait
    pub(crate) fn account_handles(&self) -> Vec<Arc<Mutex<FeeAccount>>> {
        self.accounts
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    /// consistent per-account copies of every account
    pub fn accounts_snapshot(&self) -> Vec<FeeAccount> {
        let mut accounts: Vec<FeeAccount> = self
            .account_handles()
            .iter()
            .map(|h| lock(h).clone())
            .collect();
        accounts.sort_by(|a, b| {
            a.fee
                .student_id
                .cmp(&b.fee.student_id)
                .then(a.fee.due_date.cmp(&b.fee.due_date))
                .then(a.fee.id.cmp(&b.fee.id))
        });
        accounts
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// journal entries of one student fee in recording order
    pub fn payments_for(&self, student_fee_id: StudentFeeId) -> Vec<Payment> {
        self.journal
            .get(&student_fee_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    pub(crate) fn append_payment(&self, payment: Payment) {
        self.journal
            .entry(payment.student_fee_id)
            .or_default()
            .push(payment);
    }

    pub(crate) fn find_payment(&self, receipt_number: &str) -> Option<Payment> {
        let receipt = self.receipts.get(receipt_number)?;
        self.journal
            .get(&receipt.student_fee_id)?
            .iter()
            .find(|p| p.receipt_number == receipt_number)
            .cloned()
    }

    pub(crate) fn reversal_of(&self, receipt_number: &str) -> Option<String> {
        self.reversals
            .get(receipt_number)
            .map(|entry| entry.value().clone())
    }

    pub(crate) fn mark_reversed(&self, original: String, reversal: String) {
        self.reversals.insert(original, reversal);
    }

    pub fn receipts(&self) -> &ReceiptBook {
        &self.receipts
    }

    pub(crate) fn next_sequence(&self) -> u64 {
        self.sequence.next()
    }

    pub(crate) fn emit(&self, event: Event) {
        lock(&self.events).emit(event);
    }

    pub(crate) fn emit_all(&self, events: Vec<Event>) {
        lock(&self.events).extend(events);
    }

    pub fn take_events(&self) -> Vec<Event> {
        lock(&self.events).take_events()
    }
}
