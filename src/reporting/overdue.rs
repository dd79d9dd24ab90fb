use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::state::FeeAccount;
use crate::types::{ClassId, FeeStatus, FeeTypeId, PeriodKey, StudentFeeId, StudentId};

/// one overdue fee or installment as of a query date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverdueEntry {
    pub student_fee_id: StudentFeeId,
    pub student_id: StudentId,
    pub class_id: ClassId,
    pub fee_type_id: FeeTypeId,
    /// set for installment rows, none for the fee itself
    pub period: Option<PeriodKey>,
    pub due_date: NaiveDate,
    pub outstanding: Money,
    /// status as persisted in the ledger
    pub stored_status: FeeStatus,
    /// always overdue; derived, never stored
    pub label: FeeStatus,
    pub days_overdue: i64,
}

/// fees and installments past their due date and still unresolved
pub fn overdue_entries(accounts: &[FeeAccount], as_of: NaiveDate) -> Vec<OverdueEntry> {
    let mut entries = Vec::new();

    for account in accounts {
        let fee = &account.fee;
        if fee.is_overdue_on(as_of) {
            entries.push(OverdueEntry {
                student_fee_id: fee.id,
                student_id: fee.student_id,
                class_id: fee.class_id,
                fee_type_id: fee.fee_type_id,
                period: None,
                due_date: fee.due_date,
                outstanding: fee.due_amount,
                stored_status: fee.status,
                label: FeeStatus::Overdue,
                days_overdue: (as_of - fee.due_date).num_days(),
            });
        }

        for due in account.dues.iter().filter(|d| d.is_overdue_on(as_of)) {
            entries.push(OverdueEntry {
                student_fee_id: fee.id,
                student_id: fee.student_id,
                class_id: fee.class_id,
                fee_type_id: fee.fee_type_id,
                period: Some(due.period),
                due_date: due.due_date,
                outstanding: due.outstanding(),
                stored_status: due.status,
                label: FeeStatus::Overdue,
                days_overdue: (as_of - due.due_date).num_days(),
            });
        }
    }

    entries.sort_by(|a, b| {
        a.due_date
            .cmp(&b.due_date)
            .then(a.student_id.cmp(&b.student_id))
            .then(a.period.cmp(&b.period))
    });
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{MonthlyDue, StudentFee};
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn account(status: FeeStatus, due_day: u32, dues: &[(u32, FeeStatus)]) -> FeeAccount {
        let id = Uuid::new_v4();
        let total = Money::from_major(1_000 * dues.len().max(1) as i64);
        FeeAccount {
            fee: StudentFee {
                id,
                student_id: Uuid::new_v4(),
                structure_id: Uuid::new_v4(),
                fee_type_id: Uuid::new_v4(),
                class_id: Uuid::new_v4(),
                academic_year: "2024-25".to_string(),
                total_amount: total,
                paid_amount: Money::ZERO,
                discount_amount: Money::ZERO,
                due_amount: total,
                status,
                due_date: NaiveDate::from_ymd_opt(2024, 6, due_day).unwrap(),
                last_payment_date: None,
                assigned_at: Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap(),
                waiver_reason: None,
                version: 0,
            },
            dues: dues
                .iter()
                .map(|(month, status)| MonthlyDue {
                    student_fee_id: id,
                    period: PeriodKey::new(2024, *month),
                    amount: Money::from_major(1_000),
                    paid_amount: Money::ZERO,
                    discount_amount: Money::ZERO,
                    status: *status,
                    due_date: NaiveDate::from_ymd_opt(2024, *month, 10).unwrap(),
                    paid_date: None,
                })
                .collect(),
        }
    }

    #[test]
    fn test_days_overdue_is_derived() {
        let accounts = vec![account(
            FeeStatus::Pending,
            10,
            &[(4, FeeStatus::Paid), (5, FeeStatus::Partial), (6, FeeStatus::Pending)],
        )];
        let as_of = NaiveDate::from_ymd_opt(2024, 6, 20).unwrap();

        let entries = overdue_entries(&accounts, as_of);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].period, Some(PeriodKey::new(2024, 5)));
        assert_eq!(entries[0].days_overdue, 41);
        assert!(entries.iter().all(|e| e.label == FeeStatus::Overdue));

        // the same ledger read a day earlier than the june due date
        let early = overdue_entries(&accounts, NaiveDate::from_ymd_opt(2024, 6, 10).unwrap());
        assert_eq!(early.len(), 1);
    }

    #[test]
    fn test_resolved_fees_never_overdue() {
        let accounts = vec![
            account(FeeStatus::Paid, 1, &[]),
            account(FeeStatus::Waived, 1, &[(4, FeeStatus::Waived)]),
        ];
        let as_of = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        assert!(overdue_entries(&accounts, as_of).is_empty());
    }

    #[test]
    fn test_persisted_overdue_still_listed() {
        let accounts = vec![account(FeeStatus::Overdue, 1, &[])];
        let entries = overdue_entries(&accounts, NaiveDate::from_ymd_opt(2024, 6, 2).unwrap());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].stored_status, FeeStatus::Overdue);
        assert_eq!(entries[0].days_overdue, 1);
    }
}
