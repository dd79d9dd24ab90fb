use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;

use crate::types::RemainderPolicy;

/// number of minor-unit digits carried by every amount (paise, cents)
pub const MINOR_DIGITS: u32 = 2;

/// fixed-point currency amount with 2 decimal places
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);
    pub const ONE: Money = Money(Decimal::ONE);
    pub const MINOR_UNIT: Money = Money(Decimal::from_parts(1, 0, 0, false, MINOR_DIGITS));

    /// create from decimal, rounding half away from zero to minor units
    pub fn from_decimal(d: Decimal) -> Self {
        Money(d.round_dp_with_strategy(MINOR_DIGITS, RoundingStrategy::MidpointAwayFromZero))
    }

    /// create from string with exact parsing
    pub fn from_str_exact(s: &str) -> Result<Self, rust_decimal::Error> {
        Ok(Money::from_decimal(Decimal::from_str(s.trim())?))
    }

    /// create from whole currency units (rupees, dollars)
    pub fn from_major(amount: i64) -> Self {
        Money(Decimal::from(amount))
    }

    /// create from minor units (paise, cents)
    pub fn from_minor(amount: i64) -> Self {
        Money(Decimal::new(amount, MINOR_DIGITS))
    }

    /// get underlying decimal
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// amount expressed in minor units
    pub fn to_minor(&self) -> Option<i64> {
        let scaled = self.0 * Decimal::from(10_i64.pow(MINOR_DIGITS));
        i64::try_from(scaled.trunc()).ok()
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// strictly greater than zero
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// strictly less than zero
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    pub fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    pub fn min(self, other: Self) -> Self {
        Money(self.0.min(other.0))
    }

    pub fn max(self, other: Self) -> Self {
        Money(self.0.max(other.0))
    }

    /// split into `parts` installments that sum exactly to `self`.
    ///
    /// every regular installment is the even share truncated to minor units;
    /// the leftover minor units land on the last or first installment
    /// according to `policy`.
    pub fn split_even(self, parts: u32, policy: RemainderPolicy) -> Vec<Money> {
        if parts == 0 {
            return Vec::new();
        }
        if parts == 1 {
            return vec![self];
        }

        let share = (self.0 / Decimal::from(parts))
            .round_dp_with_strategy(MINOR_DIGITS, RoundingStrategy::ToZero);
        let regular = Money(share);
        let odd = self - Money(share * Decimal::from(parts - 1));

        let mut installments = vec![regular; parts as usize];
        match policy {
            RemainderPolicy::Last => installments[parts as usize - 1] = odd,
            RemainderPolicy::First => installments[0] = odd,
        }
        installments
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Money::from_str_exact(s)
    }
}

impl From<Decimal> for Money {
    fn from(d: Decimal) -> Self {
        Money::from_decimal(d)
    }
}

impl From<i32> for Money {
    fn from(i: i32) -> Self {
        Money::from_major(i as i64)
    }
}

impl From<u32> for Money {
    fn from(i: u32) -> Self {
        Money::from_major(i as i64)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, other: Money) -> Money {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Money) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, other: Money) -> Money {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, other: Money) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, x| acc + x)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, x| acc + *x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_money_precision() {
        let m = Money::from_str_exact("100.125").unwrap();
        assert_eq!(m.to_string(), "100.13"); // half away from zero

        let m = Money::from_str_exact(" 42 ").unwrap();
        assert_eq!(m.to_string(), "42.00");
    }

    #[test]
    fn test_minor_units() {
        let m = Money::from_minor(150_050);
        assert_eq!(m, Money::from_decimal(dec!(1500.50)));
        assert_eq!(m.to_minor(), Some(150_050));
        assert_eq!(Money::from_minor(1), Money::MINOR_UNIT);
    }

    #[test]
    fn test_sign_helpers() {
        assert!(!Money::ZERO.is_positive());
        assert!(!Money::ZERO.is_negative());
        assert!(Money::from_major(1).is_positive());
        assert!((-Money::from_major(1)).is_negative());
    }

    #[test]
    fn test_split_even_exact() {
        let parts = Money::from_major(12_000).split_even(12, RemainderPolicy::Last);
        assert_eq!(parts.len(), 12);
        assert!(parts.iter().all(|p| *p == Money::from_major(1_000)));
    }

    #[test]
    fn test_split_remainder_last() {
        let parts = Money::from_major(1_000).split_even(3, RemainderPolicy::Last);
        assert_eq!(parts[0], Money::from_decimal(dec!(333.33)));
        assert_eq!(parts[1], Money::from_decimal(dec!(333.33)));
        assert_eq!(parts[2], Money::from_decimal(dec!(333.34)));
        assert_eq!(parts.iter().sum::<Money>(), Money::from_major(1_000));
    }

    #[test]
    fn test_split_remainder_first() {
        let parts = Money::from_decimal(dec!(100.00)).split_even(7, RemainderPolicy::First);
        assert_eq!(parts[0], Money::from_decimal(dec!(14.32)));
        assert!(parts[1..].iter().all(|p| *p == Money::from_decimal(dec!(14.28))));
        assert_eq!(parts.iter().sum::<Money>(), Money::from_major(100));
    }
}
