//! Currency amounts with 2-decimal precision.
//!
//! Amounts are held as integer cents so totals never pick up binary floating
//! point drift. The currency itself is implied by the deployment.

use core::fmt;
use core::ops::{Add, AddAssign};
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::value_object::ValueObject;

/// A currency amount in the smallest unit (cents).
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl ValueObject for Money {}

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Multiply by a unit count, saturating instead of wrapping on overflow.
    pub fn times(self, units: u64) -> Self {
        let units = i64::try_from(units).unwrap_or(i64::MAX);
        Self(self.0.saturating_mul(units))
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        *self = *self + rhs;
    }
}

impl core::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl FromStr for Money {
    type Err = DomainError;

    /// Parse `"12"`, `"12.5"` or `"12.50"`; more than two decimals is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let (whole, frac) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if whole.is_empty() || frac.len() > 2 || !all_digits(whole) || !all_digits(frac) {
            return Err(DomainError::validation(format!("invalid amount: {s:?}")));
        }
        let whole: i64 = whole
            .parse()
            .map_err(|_| DomainError::validation(format!("invalid amount: {s:?}")))?;
        let frac_cents: i64 = match frac.len() {
            0 => 0,
            1 => frac
                .parse::<i64>()
                .map_err(|_| DomainError::validation(format!("invalid amount: {s:?}")))?
                * 10,
            _ => frac
                .parse()
                .map_err(|_| DomainError::validation(format!("invalid amount: {s:?}")))?,
        };
        let cents = whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(frac_cents))
            .ok_or_else(|| DomainError::validation(format!("amount out of range: {s:?}")))?;
        Ok(Self(if negative { -cents } else { cents }))
    }
}
