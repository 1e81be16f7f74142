use std::{
    fmt,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Signed money amount represented as **integer cents**.
///
/// Every amount in the ledger goes through this type so that totals never
/// suffer floating-point drift.
///
/// # Examples
///
/// ```rust
/// use engine::Money;
///
/// let amount: Money = "85".parse().unwrap();
/// assert_eq!(amount.minor(), 8500);
/// assert_eq!(amount.to_string(), "$85.00");
/// ```
///
/// Parsing from chat input strips a leading `$` and `,` thousands separators,
/// and rejects more than 2 decimals:
///
/// ```rust
/// use engine::Money;
///
/// assert_eq!("$1,250.5".parse::<Money>().unwrap().minor(), 125_050);
/// assert!("12.345".parse::<Money>().is_err());
/// ```
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// Largest amount accepted for a single entry: 1,000,000,000.00.
    pub const MAX_ENTRY: Money = Money(100_000_000_000);

    /// Creates a new amount from integer cents.
    #[must_use]
    pub const fn new(minor: i64) -> Self {
        Self(minor)
    }

    /// Returns the raw value in cents.
    #[must_use]
    pub const fn minor(self) -> i64 {
        self.0
    }

    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Value in major units, only meant for display ratios and bars.
    #[must_use]
    pub fn as_major_f64(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Plain decimal form without symbol or grouping, e.g. `1234.50`.
    ///
    /// Used for spreadsheet cells and CSV exports, where the consumer parses
    /// the number itself.
    #[must_use]
    pub fn to_decimal_string(self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        format!("{sign}{}.{:02}", abs / 100, abs % 100)
    }

    /// Checks the bounds of a single ledger entry: `0 < amount <= MAX_ENTRY`.
    pub fn validate_entry(self) -> Result<(), EngineError> {
        if !self.is_positive() {
            return Err(EngineError::InvalidAmount(
                "amount must be > 0".to_string(),
            ));
        }
        if self > Self::MAX_ENTRY {
            return Err(EngineError::InvalidAmount("amount too large".to_string()));
        }
        Ok(())
    }

    /// Parses a strictly positive amount, as required for ledger entries.
    pub fn parse_positive(input: &str) -> Result<Money, EngineError> {
        let money: Money = input.parse()?;
        money.validate_entry()?;
        Ok(money)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let units = (abs / 100).to_string();
        let cents = abs % 100;

        let mut grouped = String::with_capacity(units.len() + units.len() / 3);
        for (idx, ch) in units.chars().enumerate() {
            if idx > 0 && (units.len() - idx) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }
        write!(f, "{sign}${grouped}.{cents:02}")
    }
}

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Money> for i64 {
    fn from(value: Money) -> Self {
        value.0
    }
}

// Arithmetic saturates at the i64 bounds instead of wrapping or panicking.
impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Self::Output {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        *self = *self + rhs;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Self::Output {
        Money(self.0.saturating_sub(rhs.0))
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Self::Output {
        Money(self.0.saturating_neg())
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl FromStr for Money {
    type Err = EngineError;

    /// Parses a decimal string into cents.
    ///
    /// Accepts an optional leading `+`/`-`, an optional `$`, `,` as thousands
    /// separator and `.` as decimal separator.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let empty = || EngineError::InvalidAmount("empty amount".to_string());
        let invalid = || EngineError::InvalidAmount("invalid amount".to_string());
        let overflow = || EngineError::InvalidAmount("amount too large".to_string());

        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(empty());
        }

        let (negative, rest) = if let Some(stripped) = trimmed.strip_prefix('-') {
            (true, stripped)
        } else if let Some(stripped) = trimmed.strip_prefix('+') {
            (false, stripped)
        } else {
            (false, trimmed)
        };

        let rest: String = rest
            .trim()
            .trim_start_matches('$')
            .chars()
            .filter(|c| *c != ',')
            .collect();
        if rest.is_empty() {
            return Err(empty());
        }

        let mut parts = rest.split('.');
        let units_str = parts.next().ok_or_else(invalid)?;
        let cents_str = parts.next();
        if parts.next().is_some() {
            return Err(invalid());
        }

        if units_str.is_empty() || !units_str.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let units: i64 = units_str.parse().map_err(|_| overflow())?;

        let cents: i64 = match cents_str {
            None | Some("") => 0,
            Some(frac) => {
                if !frac.chars().all(|c| c.is_ascii_digit()) {
                    return Err(invalid());
                }
                match frac.len() {
                    1 => frac.parse::<i64>().map_err(|_| invalid())? * 10,
                    2 => frac.parse::<i64>().map_err(|_| invalid())?,
                    _ => return Err(EngineError::InvalidAmount("too many decimals".to_string())),
                }
            }
        };

        let total = units
            .checked_mul(100)
            .and_then(|v| v.checked_add(cents))
            .ok_or_else(overflow)?;

        Ok(Money(if negative { -total } else { total }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_groups_thousands() {
        assert_eq!(Money::new(0).to_string(), "$0.00");
        assert_eq!(Money::new(5).to_string(), "$0.05");
        assert_eq!(Money::new(8500).to_string(), "$85.00");
        assert_eq!(Money::new(123_456).to_string(), "$1,234.56");
        assert_eq!(Money::new(100_000_000).to_string(), "$1,000,000.00");
        assert_eq!(Money::new(-1050).to_string(), "-$10.50");
    }

    #[test]
    fn decimal_string_has_no_grouping() {
        assert_eq!(Money::new(123_450).to_decimal_string(), "1234.50");
        assert_eq!(Money::new(-7).to_decimal_string(), "-0.07");
    }

    #[test]
    fn parse_strips_currency_and_separators() {
        assert_eq!("85".parse::<Money>().unwrap().minor(), 8500);
        assert_eq!("85.5".parse::<Money>().unwrap().minor(), 8550);
        assert_eq!("$85.50".parse::<Money>().unwrap().minor(), 8550);
        assert_eq!("1,500".parse::<Money>().unwrap().minor(), 150_000);
        assert_eq!("+20".parse::<Money>().unwrap().minor(), 2000);
        assert_eq!("-0.01".parse::<Money>().unwrap().minor(), -1);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!("".parse::<Money>().is_err());
        assert!("abc".parse::<Money>().is_err());
        assert!("1.2.3".parse::<Money>().is_err());
        assert!("12.345".parse::<Money>().is_err());
        assert!("$".parse::<Money>().is_err());
    }

    #[test]
    fn parse_positive_rejects_zero_and_negative() {
        assert!(Money::parse_positive("0").is_err());
        assert!(Money::parse_positive("0.00").is_err());
        assert!(Money::parse_positive("-5").is_err());
        assert_eq!(Money::parse_positive("0.01").unwrap(), Money::new(1));
    }

    #[test]
    fn parse_positive_rejects_amounts_above_entry_limit() {
        assert_eq!(
            Money::parse_positive("1,000,000,000").unwrap(),
            Money::MAX_ENTRY
        );
        assert_eq!(
            Money::parse_positive("90000000000000000"),
            Err(EngineError::InvalidAmount("amount too large".to_string()))
        );
        assert!(Money::parse_positive("1000000000.01").is_err());
    }

    #[test]
    fn arithmetic_saturates() {
        let big = Money::new(i64::MAX - 1);
        assert_eq!(big + Money::new(10), Money::new(i64::MAX));
        let mut acc = big;
        acc += big;
        assert_eq!(acc, Money::new(i64::MAX));
        assert_eq!(Money::new(i64::MIN) - Money::new(1), Money::new(i64::MIN));
        assert_eq!(-Money::new(i64::MIN), Money::new(i64::MAX));
        let total: Money = [big, big, big].into_iter().sum();
        assert_eq!(total, Money::new(i64::MAX));
    }
}
