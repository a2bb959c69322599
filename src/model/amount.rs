//! Amount type for handling monetary values read from spreadsheet cells.
//!
//! Spreadsheet users decorate amounts freely (`₩50,000`, `50,000원`, `-3,000`). Parsing keeps
//! only digits, dots and minus signs and reads what is left as a decimal number.

use crate::model::RawCell;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};
use std::str::FromStr;

/// Represents an amount of money. Currency is implied by the household (won), so no currency
/// information is carried.
///
/// # Examples
///
/// Decorations are stripped:
/// ```
/// # use budget_sheet::model::Amount;
/// # use std::str::FromStr;
/// let amount = Amount::from_str("₩50,000").unwrap();
/// assert_eq!(amount.to_string(), "50,000");
/// ```
///
/// Nothing numeric left is an error:
/// ```
/// # use budget_sheet::model::Amount;
/// # use std::str::FromStr;
/// assert!(Amount::from_str("N/A").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(Decimal);

/// The largest magnitude accepted from a cell or request: one quadrillion won. Larger values are
/// treated like any other unreadable amount, which keeps sums of a sheet far from `Decimal::MAX`.
const MAX_MAGNITUDE: Decimal = Decimal::from_parts(2_764_472_320, 232_830, 0, false, 0);

impl Amount {
    pub const ZERO: Amount = Amount(Decimal::ZERO);

    pub const fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Returns the underlying Decimal value.
    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Reads an amount from a raw cell. Numeric cells pass through unchanged (when finite), text
    /// cells are parsed with `FromStr`. Anything else is `None`.
    pub fn from_cell(cell: &RawCell) -> Option<Self> {
        match cell {
            RawCell::Number(n) if n.is_finite() => Decimal::from_f64(*n).and_then(Self::bounded),
            RawCell::Number(_) => None,
            RawCell::Text(s) => Amount::from_str(s).ok(),
            RawCell::Empty => None,
        }
    }

    fn bounded(value: Decimal) -> Option<Self> {
        (value.abs() <= MAX_MAGNITUDE).then_some(Self(value))
    }

    /// `max(0, self - other)`
    pub fn saturating_excess_over(self, other: Amount) -> Amount {
        if self > other {
            self - other
        } else {
            Amount::ZERO
        }
    }

    pub fn to_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or_default()
    }
}

/// An error that can occur when parsing strings into `Amount` values.
pub struct AmountError(String);

impl Debug for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

impl Display for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl std::error::Error for AmountError {}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let numeric: String = s
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
            .collect();

        if numeric.is_empty() {
            return Err(AmountError(format!("No numeric content in '{s}'")));
        }

        let value = Decimal::from_str(&numeric)
            .map_err(|e| AmountError(format!("Unable to parse '{s}' as an amount: {e}")))?;
        Amount::bounded(value)
            .ok_or_else(|| AmountError(format!("Amount '{s}' is out of range")))
    }
}

impl Display for Amount {
    /// Thousands separators; decimals only when there is a fractional part.
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let value = self.0.normalize();
        let sign = if value.is_sign_negative() && !value.is_zero() {
            "-"
        } else {
            ""
        };
        let abs = value.abs().to_f64().unwrap_or_default();
        if value.fract().is_zero() {
            write!(f, "{sign}{}", format_num::format_num!(",.0f", abs))
        } else {
            write!(f, "{sign}{}", format_num::format_num!(",.2f", abs))
        }
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // Clients receive plain JSON numbers and do their own currency formatting
        serializer.serialize_f64(self.to_f64())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum NumberOrString {
            Number(f64),
            String(String),
        }

        match NumberOrString::deserialize(deserializer)? {
            NumberOrString::Number(n) => Amount::from_cell(&RawCell::Number(n))
                .ok_or_else(|| serde::de::Error::custom(format!("Invalid amount {n}"))),
            NumberOrString::String(s) => Amount::from_str(&s).map_err(serde::de::Error::custom),
        }
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Amount::new(value)
    }
}

impl From<i64> for Amount {
    fn from(value: i64) -> Self {
        Amount::new(Decimal::from(value))
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.value()
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Self) -> Self::Output {
        Amount(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Self) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl Sub for Amount {
    type Output = Amount;

    fn sub(self, rhs: Self) -> Self::Output {
        Amount(self.0.saturating_sub(rhs.0))
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Amount::ZERO, |acc, a| acc + a)
    }
}

impl<'a> Sum<&'a Amount> for Amount {
    fn sum<I: Iterator<Item = &'a Amount>>(iter: I) -> Self {
        iter.copied().sum()
    }
}
