// read-only views over the ledger.
//
// everything here works on account snapshots and never mutates; missing
// data yields empty results rather than errors. statuses are reported as
// persisted, the overdue label is only derived in `overdue_entries`.

pub mod overdue;

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::payments::Payment;
use crate::state::{FeeAccount, MonthlyDue, StudentFee};
use crate::types::{ClassId, FeeStatus, FeeTypeId, StudentFeeId, StudentId};

pub use overdue::{overdue_entries, OverdueEntry};

/// optional filters for [`list_dues`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuesFilter {
    pub class_id: Option<ClassId>,
    pub fee_type_id: Option<FeeTypeId>,
    pub status: Option<FeeStatus>,
    pub student_id: Option<StudentId>,
}

impl DuesFilter {
    pub fn for_class(class_id: ClassId) -> Self {
        Self {
            class_id: Some(class_id),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: FeeStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_fee_type(mut self, fee_type_id: FeeTypeId) -> Self {
        self.fee_type_id = Some(fee_type_id);
        self
    }

    fn matches(&self, fee: &StudentFee) -> bool {
        self.class_id.map_or(true, |c| fee.class_id == c)
            && self.fee_type_id.map_or(true, |t| fee.fee_type_id == t)
            && self.status.map_or(true, |s| fee.status == s)
            && self.student_id.map_or(true, |s| fee.student_id == s)
    }
}

/// totals over a set of student fees
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuesSummary {
    pub count: usize,
    pub total: Money,
    pub paid: Money,
    pub discount: Money,
    pub due: Money,
}

impl DuesSummary {
    pub fn add(&mut self, fee: &StudentFee) {
        self.count += 1;
        self.total += fee.total_amount;
        self.paid += fee.paid_amount;
        self.discount += fee.discount_amount;
        self.due += fee.due_amount;
    }

    pub fn from_fees<'a>(fees: impl IntoIterator<Item = &'a StudentFee>) -> Self {
        let mut summary = Self::default();
        for fee in fees {
            summary.add(fee);
        }
        summary
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuesReport {
    pub fees: Vec<StudentFee>,
    pub summary: DuesSummary,
}

/// student fees of an academic year matching `filter`, with totals
pub fn list_dues(accounts: &[FeeAccount], academic_year: &str, filter: &DuesFilter) -> DuesReport {
    let fees: Vec<StudentFee> = accounts
        .iter()
        .map(|a| &a.fee)
        .filter(|f| f.academic_year == academic_year && filter.matches(f))
        .cloned()
        .collect();
    let summary = DuesSummary::from_fees(&fees);
    DuesReport { fees, summary }
}

/// optional filters for [`monthly_view`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyFilter {
    pub month: Option<u32>,
    pub class_id: Option<ClassId>,
    pub fee_type_id: Option<FeeTypeId>,
    pub status: Option<FeeStatus>,
}

/// one installment with the keys of the fee it belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyRow {
    pub student_fee_id: StudentFeeId,
    pub student_id: StudentId,
    pub class_id: ClassId,
    pub fee_type_id: FeeTypeId,
    pub academic_year: String,
    pub due: MonthlyDue,
    pub outstanding: Money,
}

/// flat installment listing for a calendar year
pub fn monthly_view(accounts: &[FeeAccount], year: i32, filter: &MonthlyFilter) -> Vec<MonthlyRow> {
    let mut rows: Vec<MonthlyRow> = accounts
        .iter()
        .filter(|a| filter.class_id.map_or(true, |c| a.fee.class_id == c))
        .filter(|a| filter.fee_type_id.map_or(true, |t| a.fee.fee_type_id == t))
        .flat_map(|a| {
            a.dues
                .iter()
                .filter(|d| d.period.year == year)
                .filter(|d| filter.month.map_or(true, |m| d.period.month == m))
                .filter(|d| filter.status.map_or(true, |s| d.status == s))
                .map(|d| MonthlyRow {
                    student_fee_id: a.fee.id,
                    student_id: a.fee.student_id,
                    class_id: a.fee.class_id,
                    fee_type_id: a.fee.fee_type_id,
                    academic_year: a.fee.academic_year.clone(),
                    due: d.clone(),
                    outstanding: d.outstanding(),
                })
        })
        .collect();

    rows.sort_by(|a, b| {
        a.due
            .period
            .cmp(&b.due.period)
            .then(a.due.due_date.cmp(&b.due.due_date))
            .then(a.student_id.cmp(&b.student_id))
            .then(a.student_fee_id.cmp(&b.student_fee_id))
    });
    rows
}

/// everything a student owes and has paid in one academic year
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentStatement {
    pub student_id: StudentId,
    pub academic_year: String,
    pub fees: Vec<StudentFee>,
    /// journal entries, reversals included, oldest first
    pub payments: Vec<Payment>,
    pub summary: DuesSummary,
    pub next_due_date: Option<NaiveDate>,
}

pub fn student_statement(
    accounts: &[FeeAccount],
    journal: impl Fn(StudentFeeId) -> Vec<Payment>,
    student_id: StudentId,
    academic_year: &str,
) -> StudentStatement {
    let mine: Vec<&FeeAccount> = accounts
        .iter()
        .filter(|a| a.fee.student_id == student_id && a.fee.academic_year == academic_year)
        .collect();

    let fees: Vec<StudentFee> = mine.iter().map(|a| a.fee.clone()).collect();
    let mut payments: Vec<Payment> = mine.iter().flat_map(|a| journal(a.fee.id)).collect();
    payments.sort_by(|a, b| {
        a.payment_date
            .cmp(&b.payment_date)
            .then_with(|| a.receipt_number.cmp(&b.receipt_number))
    });

    // earliest open installment, or the fee itself when it has none
    let next_due_date = mine
        .iter()
        .flat_map(|a| {
            let open_dues = a
                .dues
                .iter()
                .filter(|d| d.status.is_open())
                .map(|d| d.due_date);
            let lump = (!a.has_installments() && a.fee.status.is_open()).then_some(a.fee.due_date);
            open_dues.chain(lump)
        })
        .min();

    StudentStatement {
        student_id,
        academic_year: academic_year.to_string(),
        summary: DuesSummary::from_fees(&fees),
        fees,
        payments,
        next_due_date,
    }
}

/// how many fees sit in each status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub partial: usize,
    pub paid: usize,
    pub overdue: usize,
    pub waived: usize,
}

impl StatusCounts {
    pub fn record(&mut self, status: FeeStatus) {
        match status {
            FeeStatus::Pending => self.pending += 1,
            FeeStatus::Partial => self.partial += 1,
            FeeStatus::Paid => self.paid += 1,
            FeeStatus::Overdue => self.overdue += 1,
            FeeStatus::Waived => self.waived += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeTypeTotals {
    pub fee_type_id: FeeTypeId,
    pub summary: DuesSummary,
    pub statuses: StatusCounts,
}

/// collection position of one class in one academic year
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassSummary {
    pub class_id: ClassId,
    pub academic_year: String,
    pub overall: DuesSummary,
    pub statuses: StatusCounts,
    pub by_fee_type: Vec<FeeTypeTotals>,
    pub students: usize,
}

pub fn class_summary(accounts: &[FeeAccount], class_id: ClassId, academic_year: &str) -> ClassSummary {
    let mut overall = DuesSummary::default();
    let mut statuses = StatusCounts::default();
    let mut by_fee_type: BTreeMap<FeeTypeId, (DuesSummary, StatusCounts)> = BTreeMap::new();
    let mut students: Vec<StudentId> = Vec::new();

    for fee in accounts
        .iter()
        .map(|a| &a.fee)
        .filter(|f| f.class_id == class_id && f.academic_year == academic_year)
    {
        overall.add(fee);
        statuses.record(fee.status);
        let (summary, counts) = by_fee_type.entry(fee.fee_type_id).or_default();
        summary.add(fee);
        counts.record(fee.status);
        students.push(fee.student_id);
    }
    students.sort();
    students.dedup();

    ClassSummary {
        class_id,
        academic_year: academic_year.to_string(),
        overall,
        statuses,
        by_fee_type: by_fee_type
            .into_iter()
            .map(|(fee_type_id, (summary, statuses))| FeeTypeTotals {
                fee_type_id,
                summary,
                statuses,
            })
            .collect(),
        students: students.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PaymentMethod, PeriodKey};
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    struct Keys {
        class_id: ClassId,
        tuition: FeeTypeId,
        transport: FeeTypeId,
    }

    fn fee(keys: &Keys, student_id: StudentId, fee_type_id: FeeTypeId, paid: i64, status: FeeStatus) -> FeeAccount {
        let id = Uuid::new_v4();
        let total = Money::from_major(3_000);
        let paid = Money::from_major(paid);
        let dues = (0..3)
            .map(|i| {
                let period = PeriodKey::new(2024, 4).plus_months(i);
                MonthlyDue {
                    student_fee_id: id,
                    period,
                    amount: Money::from_major(1_000),
                    paid_amount: Money::ZERO,
                    discount_amount: Money::ZERO,
                    status: FeeStatus::Pending,
                    due_date: NaiveDate::from_ymd_opt(period.year, period.month, 10).unwrap(),
                    paid_date: None,
                }
            })
            .collect();
        FeeAccount {
            fee: StudentFee {
                id,
                student_id,
                structure_id: Uuid::new_v4(),
                fee_type_id,
                class_id: keys.class_id,
                academic_year: "2024-25".to_string(),
                total_amount: total,
                paid_amount: paid,
                discount_amount: Money::ZERO,
                due_amount: total - paid,
                status,
                due_date: NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
                last_payment_date: None,
                assigned_at: Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap(),
                waiver_reason: None,
                version: 0,
            },
            dues,
        }
    }

    fn ledger() -> (Keys, Vec<StudentId>, Vec<FeeAccount>) {
        let keys = Keys {
            class_id: Uuid::new_v4(),
            tuition: Uuid::new_v4(),
            transport: Uuid::new_v4(),
        };
        let students: Vec<StudentId> = (0..3).map(|_| Uuid::new_v4()).collect();
        let accounts = vec![
            fee(&keys, students[0], keys.tuition, 0, FeeStatus::Pending),
            fee(&keys, students[1], keys.tuition, 1_500, FeeStatus::Partial),
            fee(&keys, students[2], keys.tuition, 3_000, FeeStatus::Paid),
            fee(&keys, students[0], keys.transport, 500, FeeStatus::Partial),
        ];
        (keys, students, accounts)
    }

    #[test]
    fn test_list_dues_summary() {
        let (keys, _, accounts) = ledger();

        let all = list_dues(&accounts, "2024-25", &DuesFilter::for_class(keys.class_id));
        assert_eq!(all.summary.count, 4);
        assert_eq!(all.summary.total, Money::from_major(12_000));
        assert_eq!(all.summary.paid, Money::from_major(5_000));
        assert_eq!(all.summary.due, Money::from_major(7_000));

        let partial = list_dues(
            &accounts,
            "2024-25",
            &DuesFilter::default().with_status(FeeStatus::Partial).with_fee_type(keys.tuition),
        );
        assert_eq!(partial.fees.len(), 1);

        let other_year = list_dues(&accounts, "2023-24", &DuesFilter::default());
        assert!(other_year.fees.is_empty());
        assert_eq!(other_year.summary, DuesSummary::default());
    }

    #[test]
    fn test_monthly_view_ordering() {
        let (keys, _, accounts) = ledger();

        let rows = monthly_view(&accounts, 2024, &MonthlyFilter::default());
        assert_eq!(rows.len(), 12);
        assert!(rows.windows(2).all(|w| w[0].due.period <= w[1].due.period));

        let may_transport = monthly_view(
            &accounts,
            2024,
            &MonthlyFilter {
                month: Some(5),
                fee_type_id: Some(keys.transport),
                ..MonthlyFilter::default()
            },
        );
        assert_eq!(may_transport.len(), 1);
        assert_eq!(may_transport[0].outstanding, Money::from_major(1_000));

        assert!(monthly_view(&accounts, 2025, &MonthlyFilter::default()).is_empty());
    }

    #[test]
    fn test_student_statement() {
        let (_, students, accounts) = ledger();
        let first_fee = accounts[0].fee.id;

        let journal = |id: StudentFeeId| {
            if id != first_fee {
                return Vec::new();
            }
            vec![Payment {
                id: Uuid::new_v4(),
                student_id: students[0],
                student_fee_id: id,
                amount: Money::from_major(100),
                discount_amount: Money::ZERO,
                discount_reason: None,
                method: PaymentMethod::Cash,
                payment_date: Utc.with_ymd_and_hms(2024, 4, 2, 0, 0, 0).unwrap(),
                receipt_number: "RCPT-2024-000001".to_string(),
                transaction_id: None,
                remarks: None,
                allocations: Vec::new(),
                reverses: None,
            }]
        };

        let statement = student_statement(&accounts, journal, students[0], "2024-25");
        assert_eq!(statement.fees.len(), 2);
        assert_eq!(statement.payments.len(), 1);
        assert_eq!(statement.summary.total, Money::from_major(6_000));
        assert_eq!(statement.next_due_date, NaiveDate::from_ymd_opt(2024, 4, 10));

        let stranger = student_statement(&accounts, |_| Vec::new(), Uuid::new_v4(), "2024-25");
        assert!(stranger.fees.is_empty());
        assert_eq!(stranger.next_due_date, None);
    }

    #[test]
    fn test_class_summary() {
        let (keys, _, accounts) = ledger();
        let summary = class_summary(&accounts, keys.class_id, "2024-25");

        assert_eq!(summary.students, 3);
        assert_eq!(summary.overall.count, 4);
        assert_eq!(summary.statuses.partial, 2);
        assert_eq!(summary.statuses.paid, 1);
        assert_eq!(summary.by_fee_type.len(), 2);

        let tuition = summary
            .by_fee_type
            .iter()
            .find(|t| t.fee_type_id == keys.tuition)
            .unwrap();
        assert_eq!(tuition.summary.count, 3);
        assert_eq!(tuition.summary.paid, Money::from_major(4_500));

        let empty = class_summary(&accounts, Uuid::new_v4(), "2024-25");
        assert_eq!(empty.students, 0);
        assert!(empty.by_fee_type.is_empty());
    }
}
