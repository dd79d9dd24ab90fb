use chrono::NaiveDate;
use tracing::debug;

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::state::MonthlyDue;
use crate::types::DueAllocation;

/// apply cash then discount to installments, oldest due first.
///
/// each installment is filled before the next one receives anything.
/// the caller guarantees `cash + discount` does not exceed what is outstanding.
pub fn allocate(
    dues: &mut [MonthlyDue],
    cash: Money,
    discount: Money,
    on: NaiveDate,
) -> Result<Vec<DueAllocation>> {
    let mut order: Vec<usize> = (0..dues.len()).collect();
    order.sort_by_key(|&i| (dues[i].due_date, dues[i].period));

    let mut cash_left = cash;
    let mut discount_left = discount;
    let mut allocations = Vec::new();

    for i in order {
        if cash_left.is_zero() && discount_left.is_zero() {
            break;
        }
        let due = &mut dues[i];
        let open = due.outstanding();
        if !open.is_positive() {
            continue;
        }

        let to_paid = cash_left.min(open);
        let to_discount = discount_left.min(open - to_paid);
        if (to_paid + to_discount).is_zero() {
            continue;
        }

        due.paid_amount += to_paid;
        due.discount_amount += to_discount;
        due.refresh_status(on);
        cash_left -= to_paid;
        discount_left -= to_discount;

        debug!(period = %due.period, %to_paid, %to_discount, status = %due.status, "installment credited");
        allocations.push(DueAllocation {
            period: due.period,
            to_paid,
            to_discount,
        });
    }

    if !(cash_left + discount_left).is_zero() {
        return Err(LedgerError::consistency(format!(
            "{} left unallocated after crediting every installment",
            cash_left + discount_left
        )));
    }
    Ok(allocations)
}

/// take back earlier allocations, latest period first.
///
/// returns the negated allocation lines in the order they were unwound.
pub fn unwind(
    dues: &mut [MonthlyDue],
    allocations: &[DueAllocation],
    on: NaiveDate,
) -> Result<Vec<DueAllocation>> {
    let mut lines: Vec<&DueAllocation> = allocations.iter().collect();
    lines.sort_by(|a, b| b.period.cmp(&a.period));

    let mut unwound = Vec::with_capacity(lines.len());
    for line in lines {
        let due = dues
            .iter_mut()
            .find(|d| d.period == line.period)
            .ok_or_else(|| {
                LedgerError::consistency(format!("no installment for allocated period {}", line.period))
            })?;

        if due.paid_amount < line.to_paid || due.discount_amount < line.to_discount {
            return Err(LedgerError::consistency(format!(
                "installment {} holds less than the allocation being reversed",
                due.period
            )));
        }

        due.paid_amount -= line.to_paid;
        due.discount_amount -= line.to_discount;
        due.refresh_status(on);
        unwound.push(DueAllocation {
            period: line.period,
            to_paid: -line.to_paid,
            to_discount: -line.to_discount,
        });
    }
    Ok(unwound)
}
