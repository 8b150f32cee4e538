//! Decimal money amounts.
//!
//! Prices and order totals are carried as [`Decimal`] fixed to two places and
//! serialized as strings (`"545.00"`), so summing many lines never picks up
//! floating-point drift. Single currency only.

use core::fmt;
use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::quantity::Quantity;

/// Errors that can occur when building or combining [`Money`] values.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// The amount is below zero.
    #[error("amount cannot be negative")]
    Negative,
    /// The input is not a decimal number.
    #[error("invalid amount: {0}")]
    Invalid(String),
    /// Arithmetic exceeded the decimal range.
    #[error("amount overflow")]
    Overflow,
}

/// A non-negative amount of money with two decimal places.
///
/// ```
/// use atelier_core::{Money, Quantity};
///
/// let coat = Money::parse("295.00").unwrap();
/// let sweater = Money::parse("125").unwrap();
///
/// let two = Quantity::new(2).unwrap();
/// let lines = [
///     coat.line_total(Quantity::ONE).unwrap(),
///     sweater.line_total(two).unwrap(),
/// ];
/// assert_eq!(Money::try_sum(lines).unwrap().to_string(), "545.00");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    /// Number of decimal places every amount is normalized to.
    pub const SCALE: u32 = 2;

    /// The zero amount.
    pub const ZERO: Self = Self(Decimal::from_parts(0, 0, 0, false, Self::SCALE));

    /// Build from a decimal, rounding to two places (banker's rounding).
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Negative`] if the amount is below zero.
    pub fn new(amount: Decimal) -> Result<Self, MoneyError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(MoneyError::Negative);
        }
        let mut normalized = amount.round_dp(Self::SCALE);
        normalized.rescale(Self::SCALE);
        Ok(Self(normalized))
    }

    /// Parse a decimal string such as `"295.00"` or `"45"`.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Invalid`] for non-numeric input and
    /// [`MoneyError::Negative`] for negative amounts.
    pub fn parse(s: &str) -> Result<Self, MoneyError> {
        let amount = Decimal::from_str(s.trim()).map_err(|e| MoneyError::Invalid(e.to_string()))?;
        Self::new(amount)
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Price of `quantity` units at this unit price.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Overflow`] if the product leaves the decimal range.
    pub fn line_total(self, quantity: Quantity) -> Result<Self, MoneyError> {
        self.0
            .checked_mul(Decimal::from(quantity.get()))
            .ok_or(MoneyError::Overflow)
            .and_then(Self::new)
    }

    /// Add two amounts.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Overflow`] if the sum leaves the decimal range.
    pub fn checked_add(self, other: Self) -> Result<Self, MoneyError> {
        self.0
            .checked_add(other.0)
            .ok_or(MoneyError::Overflow)
            .and_then(Self::new)
    }

    /// Sum an iterator of amounts, starting from zero.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Overflow`] if any partial sum overflows.
    pub fn try_sum<I>(amounts: I) -> Result<Self, MoneyError>
    where
        I: IntoIterator<Item = Self>,
    {
        amounts
            .into_iter()
            .try_fold(Self::ZERO, |acc, amount| acc.checked_add(amount))
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl TryFrom<Decimal> for Money {
    type Error = MoneyError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}

impl FromStr for Money {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Money {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Money {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(amount)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Money {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes_scale() {
        assert_eq!(Money::parse("45").unwrap().to_string(), "45.00");
        assert_eq!(Money::parse("19.9").unwrap().to_string(), "19.90");
        assert_eq!(Money::parse(" 7.005 ").unwrap().to_string(), "7.00");
    }

    #[test]
    fn test_parse_rejects_negative_and_garbage() {
        assert_eq!(Money::parse("-1.00"), Err(MoneyError::Negative));
        assert!(matches!(Money::parse("abc"), Err(MoneyError::Invalid(_))));
    }

    #[test]
    fn test_zero_displays_two_places() {
        assert_eq!(Money::ZERO.to_string(), "0.00");
        assert_eq!(Money::default(), Money::parse("0").unwrap());
    }

    #[test]
    fn test_tenths_sum_exactly() {
        // 0.10 added a thousand times is exactly 100.00, unlike f64
        let dime = Money::parse("0.10").unwrap();
        let total = Money::try_sum(std::iter::repeat_n(dime, 1000)).unwrap();
        assert_eq!(total.to_string(), "100.00");
    }

    #[test]
    fn test_serializes_as_string() {
        let price = Money::parse("295").unwrap();
        assert_eq!(serde_json::to_string(&price).unwrap(), "\"295.00\"");
    }

    #[test]
    fn test_deserializes_from_string_or_number() {
        let from_str: Money = serde_json::from_str("\"125.00\"").unwrap();
        let from_num: Money = serde_json::from_str("125").unwrap();
        assert_eq!(from_str, from_num);
        assert!(serde_json::from_str::<Money>("\"-3\"").is_err());
    }
}
