use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::errors::{LedgerError, Result};
use crate::types::{Frequency, PeriodKey};

/// academic year boundaries, supplied by the caller on every call that needs them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcademicYear {
    pub label: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// one billing period inside an academic year
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillingPeriod {
    /// first month of the period
    pub period: PeriodKey,
    /// months covered, the last period may be shorter
    pub months: u32,
}

impl AcademicYear {
    pub fn new(label: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Result<Self> {
        let label = label.into();
        if label.trim().is_empty() {
            return Err(LedgerError::MissingField {
                field: "academic_year.label",
            });
        }
        if end <= start {
            return Err(LedgerError::InvalidDate {
                message: format!("academic year {} ends {} before it starts {}", label, end, start),
            });
        }
        Ok(Self { label, start, end })
    }

    /// twelve-month year beginning on the first of `month`
    pub fn starting(label: impl Into<String>, year: i32, month: u32) -> Result<Self> {
        let start = first_of_month(PeriodKey::new(year, month))?;
        let end = first_of_month(PeriodKey::new(year, month).plus_months(12))?
            .pred_opt()
            .ok_or_else(|| LedgerError::InvalidDate {
                message: format!("no day before {}", start),
            })?;
        Self::new(label, start, end)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// every calendar month touched by the year, in order
    pub fn months(&self) -> Vec<PeriodKey> {
        let first = PeriodKey::new(self.start.year(), self.start.month());
        let last = PeriodKey::new(self.end.year(), self.end.month());

        let mut months = Vec::new();
        let mut current = first;
        while current <= last {
            months.push(current);
            current = current.plus_months(1);
        }
        months
    }

    /// billing periods for a structure.
    ///
    /// one-time structures on a recurring fee type bill monthly; plain
    /// one-time structures have no installments.
    pub fn billing_periods(&self, frequency: Frequency, recurring_fee_type: bool) -> Vec<BillingPeriod> {
        let step = match frequency.months_per_period() {
            Some(step) => step,
            None if recurring_fee_type => 1,
            None => return Vec::new(),
        };

        self.months()
            .chunks(step as usize)
            .map(|chunk| BillingPeriod {
                period: chunk[0],
                months: chunk.len() as u32,
            })
            .collect()
    }
}

/// due date for a period: `due_day` of its first month, clamped to the month length
pub fn due_date_in(period: PeriodKey, due_day: u32) -> Result<NaiveDate> {
    (1..=due_day.max(1))
        .rev()
        .find_map(|day| NaiveDate::from_ymd_opt(period.year, period.month, day))
        .ok_or_else(|| LedgerError::InvalidDate {
            message: format!("no valid due day in {}", period),
        })
}

fn first_of_month(period: PeriodKey) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(period.year, period.month, 1).ok_or_else(|| LedgerError::InvalidDate {
        message: format!("invalid month {}", period),
    })
}
