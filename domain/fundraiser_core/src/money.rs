//! # Money
//!
//! Currency amounts in integer minor units (cents).
//!
//! Requests may carry amounts as JSON numbers (`50`, `12.5`) or strings
//! (`"12.50"`); both are parsed textually so no binary floating point ever
//! reaches the running totals. At most two fractional digits are accepted.
//! Amounts always serialize as a decimal string with exactly two digits.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::Error;

const MINOR_PER_MAJOR: i64 = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    pub const fn saturating_add(self, other: Money) -> Money {
        Money(self.0.saturating_add(other.0))
    }
}

impl FromStr for Money {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::Validation(format!("invalid amount: {raw:?}"));

        let text = raw.trim();
        let (negative, digits) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text.strip_prefix('+').unwrap_or(text)),
        };

        let (whole, fraction) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };

        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid());
        }
        if !whole.bytes().all(|b| b.is_ascii_digit()) || !fraction.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if fraction.len() > 2 {
            return Err(Error::Validation(format!(
                "amount {raw:?} has more than two decimal places"
            )));
        }

        let whole: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid())?
        };
        let fraction: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|_| invalid())? * 10,
            _ => fraction.parse().map_err(|_| invalid())?,
        };

        let cents = whole
            .checked_mul(MINOR_PER_MAJOR)
            .and_then(|c| c.checked_add(fraction))
            .ok_or_else(invalid)?;

        Ok(Money(if negative { -cents } else { cents }))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let per = MINOR_PER_MAJOR as u64;
        write!(f, "{sign}{}.{:02}", abs / per, abs % per)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MoneyVisitor)
    }
}

struct MoneyVisitor;

impl<'de> Visitor<'de> for MoneyVisitor {
    type Value = Money;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a decimal amount as a number or string")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Money, E> {
        v.checked_mul(MINOR_PER_MAJOR)
            .map(Money)
            .ok_or_else(|| E::custom("amount out of range"))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Money, E> {
        i64::try_from(v)
            .map_err(|_| E::custom("amount out of range"))
            .and_then(|v| self.visit_i64(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Money, E> {
        if !v.is_finite() {
            return Err(E::custom("amount must be finite"));
        }
        // Shortest round-trip text of the literal, e.g. 12.5 -> "12.5".
        v.to_string().parse().map_err(E::custom)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Money, E> {
        v.parse().map_err(E::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_whole_and_fractional_amounts() {
        assert_eq!("50".parse::<Money>().unwrap(), Money::from_cents(5_000));
        assert_eq!("12.5".parse::<Money>().unwrap(), Money::from_cents(1_250));
        assert_eq!("0.07".parse::<Money>().unwrap(), Money::from_cents(7));
        assert_eq!(".5".parse::<Money>().unwrap(), Money::from_cents(50));
        assert_eq!("-3.10".parse::<Money>().unwrap(), Money::from_cents(-310));
    }

    #[test]
    fn rejects_malformed_amounts() {
        for bad in ["", ".", "abc", "1.234", "1e3", "--1", "1.2.3"] {
            assert!(bad.parse::<Money>().is_err(), "{bad:?} should not parse");
        }
    }

    #[test]
    fn displays_two_decimal_places() {
        assert_eq!(Money::from_cents(5_000).to_string(), "50.00");
        assert_eq!(Money::from_cents(7).to_string(), "0.07");
        assert_eq!(Money::from_cents(-310).to_string(), "-3.10");
    }

    #[test]
    fn deserializes_numbers_and_strings() {
        let m: Money = serde_json::from_str("10").unwrap();
        assert_eq!(m.cents(), 1_000);
        let m: Money = serde_json::from_str("0.1").unwrap();
        assert_eq!(m.cents(), 10);
        let m: Money = serde_json::from_str("\"15.25\"").unwrap();
        assert_eq!(m.cents(), 1_525);
        assert!(serde_json::from_str::<Money>("10.001").is_err());
    }

    #[test]
    fn repeated_tenths_do_not_drift() {
        let tenth: Money = "0.1".parse().unwrap();
        let total = (0..10).try_fold(Money::ZERO, |acc, _| acc.checked_add(tenth)).unwrap();
        assert_eq!(total, Money::from_cents(100));
    }
}
