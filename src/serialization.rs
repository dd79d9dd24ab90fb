/// serialization support for student fees
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::state::FeeAccount;
use crate::types::{ClassId, FeeStatus, FeeStructureId, FeeTypeId, StudentFeeId, StudentId};

/// serializable view of a student fee and its installments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentFeeView {
    pub id: StudentFeeId,
    pub student_id: StudentId,
    pub status: FeeStatus,
    pub due_date: NaiveDate,
    pub balances: BalanceView,
    pub installments: Vec<InstallmentView>,
    pub metadata: FeeMetadataView,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceView {
    pub total_amount: Money,
    pub paid_amount: Money,
    pub discount_amount: Money,
    pub due_amount: Money,
    pub last_payment_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallmentView {
    /// "YYYY-MM"
    pub period: String,
    pub amount: Money,
    pub paid_amount: Money,
    pub discount_amount: Money,
    pub outstanding: Money,
    pub status: FeeStatus,
    pub due_date: NaiveDate,
    pub paid_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeMetadataView {
    pub structure_id: FeeStructureId,
    pub fee_type_id: FeeTypeId,
    pub class_id: ClassId,
    pub academic_year: String,
    pub assigned_at: DateTime<Utc>,
    pub waiver_reason: Option<String>,
    pub version: u64,
}

impl StudentFeeView {
    pub fn from_account(account: &FeeAccount) -> Self {
        let fee = &account.fee;
        StudentFeeView {
            id: fee.id,
            student_id: fee.student_id,
            status: fee.status,
            due_date: fee.due_date,
            balances: BalanceView {
                total_amount: fee.total_amount,
                paid_amount: fee.paid_amount,
                discount_amount: fee.discount_amount,
                due_amount: fee.due_amount,
                last_payment_date: fee.last_payment_date,
            },
            installments: account
                .dues
                .iter()
                .map(|d| InstallmentView {
                    period: d.period.to_string(),
                    amount: d.amount,
                    paid_amount: d.paid_amount,
                    discount_amount: d.discount_amount,
                    outstanding: d.outstanding(),
                    status: d.status,
                    due_date: d.due_date,
                    paid_date: d.paid_date,
                })
                .collect(),
            metadata: FeeMetadataView {
                structure_id: fee.structure_id,
                fee_type_id: fee.fee_type_id,
                class_id: fee.class_id,
                academic_year: fee.academic_year.clone(),
                assigned_at: fee.assigned_at,
                waiver_reason: fee.waiver_reason.clone(),
                version: fee.version,
            },
        }
    }

    /// convert to pretty-printed json string
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{MonthlyDue, StudentFee};
    use crate::types::PeriodKey;
    use chrono::TimeZone;
    use uuid::Uuid;

    #[test]
    fn test_view_round_trips_through_json() {
        let id = Uuid::new_v4();
        let account = FeeAccount {
            fee: StudentFee {
                id,
                student_id: Uuid::new_v4(),
                structure_id: Uuid::new_v4(),
                fee_type_id: Uuid::new_v4(),
                class_id: Uuid::new_v4(),
                academic_year: "2024-25".to_string(),
                total_amount: Money::from_major(2_000),
                paid_amount: Money::from_major(1_200),
                discount_amount: Money::ZERO,
                due_amount: Money::from_major(800),
                status: FeeStatus::Partial,
                due_date: NaiveDate::from_ymd_opt(2024, 5, 10).unwrap(),
                last_payment_date: Some(Utc.with_ymd_and_hms(2024, 4, 3, 10, 0, 0).unwrap()),
                assigned_at: Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap(),
                waiver_reason: None,
                version: 1,
            },
            dues: vec![
                MonthlyDue {
                    student_fee_id: id,
                    period: PeriodKey::new(2024, 4),
                    amount: Money::from_major(1_000),
                    paid_amount: Money::from_major(1_000),
                    discount_amount: Money::ZERO,
                    status: FeeStatus::Paid,
                    due_date: NaiveDate::from_ymd_opt(2024, 4, 10).unwrap(),
                    paid_date: NaiveDate::from_ymd_opt(2024, 4, 3),
                },
                MonthlyDue {
                    student_fee_id: id,
                    period: PeriodKey::new(2024, 5),
                    amount: Money::from_major(1_000),
                    paid_amount: Money::from_major(200),
                    discount_amount: Money::ZERO,
                    status: FeeStatus::Partial,
                    due_date: NaiveDate::from_ymd_opt(2024, 5, 10).unwrap(),
                    paid_date: None,
                },
            ],
        };

        let view = StudentFeeView::from_account(&account);
        let json = view.to_json_pretty().unwrap();
        assert!(json.contains("\"period\": \"2024-05\""));
        assert!(json.contains("\"status\": \"PARTIAL\""));

        let parsed = StudentFeeView::from_json(&json).unwrap();
        assert_eq!(parsed, view);
        assert_eq!(parsed.installments[1].outstanding, Money::from_major(800));
    }
}
