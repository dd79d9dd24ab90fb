use chrono::NaiveDate;

use crate::calendar::{due_date_in, AcademicYear};
use crate::config::ScheduleConfig;
use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::state::MonthlyDue;
use crate::types::{FeeStatus, Frequency, PeriodKey, StudentFeeId};

/// installment in a generated schedule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledInstallment {
    pub number: u32,
    pub period: PeriodKey,
    pub months: u32,
    pub amount: Money,
    pub due_date: NaiveDate,
}

/// how a student fee is billed over the academic year
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallmentSchedule {
    pub total: Money,
    pub frequency: Frequency,
    /// due date carried by the student fee itself
    pub due_date: NaiveDate,
    pub installments: Vec<ScheduledInstallment>,
}

impl InstallmentSchedule {
    /// split `total` across the billing periods of `year`.
    ///
    /// plain one-time fees get no installments and fall due in the first month
    /// of the year; periodic fees fall due with their final installment.
    pub fn generate(
        total: Money,
        frequency: Frequency,
        recurring_fee_type: bool,
        year: &AcademicYear,
        config: &ScheduleConfig,
    ) -> Result<Self> {
        let periods = year.billing_periods(frequency, recurring_fee_type);
        let amounts = total.split_even(periods.len() as u32, config.remainder_policy);

        let installments = periods
            .iter()
            .zip(amounts)
            .enumerate()
            .map(|(i, (billing, amount))| -> Result<ScheduledInstallment> {
                Ok(ScheduledInstallment {
                    number: i as u32 + 1,
                    period: billing.period,
                    months: billing.months,
                    amount,
                    due_date: due_date_in(billing.period, config.due_day)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let due_date = match installments.last() {
            Some(last) => last.due_date,
            None => {
                let first = year.months().first().copied().ok_or_else(|| LedgerError::InvalidDate {
                    message: format!("academic year {} has no months", year.label),
                })?;
                due_date_in(first, config.due_day)?
            }
        };

        Ok(Self {
            total,
            frequency,
            due_date,
            installments,
        })
    }

    pub fn is_periodic(&self) -> bool {
        !self.installments.is_empty()
    }

    /// fresh pending dues for a student fee
    pub fn to_dues(&self, student_fee_id: StudentFeeId) -> Vec<MonthlyDue> {
        self.installments
            .iter()
            .map(|i| MonthlyDue {
                student_fee_id,
                period: i.period,
                amount: i.amount,
                paid_amount: Money::ZERO,
                discount_amount: Money::ZERO,
                // a zero share is settled from the start
                status: FeeStatus::derive(i.amount, Money::ZERO, FeeStatus::Pending),
                due_date: i.due_date,
                paid_date: None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RemainderPolicy;
    use rust_decimal_macros::dec;

    fn year() -> AcademicYear {
        AcademicYear::starting("2024-25", 2024, 4).unwrap()
    }

    #[test]
    fn test_monthly_schedule() {
        let schedule = InstallmentSchedule::generate(
            Money::from_major(12_000),
            Frequency::Monthly,
            true,
            &year(),
            &ScheduleConfig::default(),
        )
        .unwrap();

        assert_eq!(schedule.installments.len(), 12);
        assert!(schedule.installments.iter().all(|i| i.amount == Money::from_major(1_000)));
        assert_eq!(schedule.installments[0].due_date, NaiveDate::from_ymd_opt(2024, 4, 10).unwrap());
        assert_eq!(schedule.due_date, NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());
    }

    #[test]
    fn test_remainder_placement() {
        let total = Money::from_decimal(dec!(10000));
        let last = InstallmentSchedule::generate(total, Frequency::Quarterly, false, &year(), &ScheduleConfig::default())
            .unwrap();
        let amounts: Vec<Money> = last.installments.iter().map(|i| i.amount).collect();
        assert_eq!(amounts.len(), 4);
        assert_eq!(amounts[0], Money::from_major(2_500));

        let odd = Money::from_major(1_000);
        let first_config = ScheduleConfig {
            remainder_policy: RemainderPolicy::First,
            ..ScheduleConfig::default()
        };
        let first = InstallmentSchedule::generate(odd, Frequency::Quarterly, false, &year(), &first_config).unwrap();
        let amounts: Vec<Money> = first.installments.iter().map(|i| i.amount).collect();
        assert_eq!(amounts[0], Money::from_decimal(dec!(250.00)));

        let third = InstallmentSchedule::generate(
            Money::from_major(100),
            Frequency::Yearly,
            false,
            &AcademicYear::new(
                "short",
                NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
            )
            .unwrap(),
            &first_config,
        )
        .unwrap();
        assert_eq!(third.installments.len(), 1);
        assert_eq!(third.installments[0].months, 3);
        assert_eq!(third.installments[0].amount, Money::from_major(100));
    }

    #[test]
    fn test_zero_installments_start_paid() {
        let schedule = InstallmentSchedule::generate(
            Money::from_decimal(dec!(0.05)),
            Frequency::Monthly,
            true,
            &year(),
            &ScheduleConfig::default(),
        )
        .unwrap();
        let dues = schedule.to_dues(uuid::Uuid::nil());

        assert_eq!(dues.len(), 12);
        assert!(dues[..11].iter().all(|d| d.amount == Money::ZERO && d.status == FeeStatus::Paid));
        assert_eq!(dues[11].amount, Money::from_decimal(dec!(0.05)));
        assert_eq!(dues[11].status, FeeStatus::Pending);
    }

    #[test]
    fn test_uneven_split_sums_to_total() {
        let total = Money::from_major(1_000);
        for policy in [RemainderPolicy::Last, RemainderPolicy::First] {
            let config = ScheduleConfig {
                remainder_policy: policy,
                ..ScheduleConfig::default()
            };
            let schedule = InstallmentSchedule::generate(total, Frequency::Monthly, true, &year(), &config).unwrap();
            let sum: Money = schedule.installments.iter().map(|i| i.amount).sum();
            assert_eq!(sum, total);

            let odd_one = match policy {
                RemainderPolicy::Last => schedule.installments.last().unwrap(),
                RemainderPolicy::First => schedule.installments.first().unwrap(),
            };
            assert_eq!(odd_one.amount, Money::from_decimal(dec!(83.37)));
            assert_eq!(schedule.installments[5].amount, Money::from_decimal(dec!(83.33)));
        }
    }

    #[test]
    fn test_one_time_fee() {
        let plain = InstallmentSchedule::generate(
            Money::from_major(2_500),
            Frequency::OneTime,
            false,
            &year(),
            &ScheduleConfig::default(),
        )
        .unwrap();
        assert!(!plain.is_periodic());
        assert_eq!(plain.due_date, NaiveDate::from_ymd_opt(2024, 4, 10).unwrap());

        // a one-time structure on a recurring fee type still bills monthly
        let recurring = InstallmentSchedule::generate(
            Money::from_major(2_400),
            Frequency::OneTime,
            true,
            &year(),
            &ScheduleConfig::default(),
        )
        .unwrap();
        assert_eq!(recurring.installments.len(), 12);
        assert_eq!(recurring.to_dues(uuid::Uuid::new_v4())[0].amount, Money::from_major(200));
    }
}
