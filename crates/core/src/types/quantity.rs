//! Line quantities.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when building a [`Quantity`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityError {
    /// Zero or negative quantities are not valid cart or order lines.
    #[error("quantity must be at least 1 (got {0})")]
    TooSmall(i64),
    /// Larger than the storage column can hold.
    #[error("quantity must be at most {max} (got {got})")]
    TooLarge {
        /// Largest accepted quantity.
        max: i32,
        /// Value supplied.
        got: i64,
    },
}

/// A positive number of units on a cart or order line.
///
/// Removal is always an explicit operation, so zero is rejected rather than
/// treated as "delete".
///
/// ```
/// use atelier_core::Quantity;
///
/// assert_eq!(Quantity::new(3).unwrap().get(), 3);
/// assert!(Quantity::new(0).is_err());
/// assert!(Quantity::new(-1).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i32")]
pub struct Quantity(i32);

impl Quantity {
    /// A single unit.
    pub const ONE: Self = Self(1);

    /// Validate a raw quantity.
    ///
    /// # Errors
    ///
    /// Returns [`QuantityError::TooSmall`] for values below 1 and
    /// [`QuantityError::TooLarge`] for values beyond `i32::MAX`.
    pub fn new(value: i64) -> Result<Self, QuantityError> {
        if value < 1 {
            return Err(QuantityError::TooSmall(value));
        }
        i32::try_from(value)
            .map(Self)
            .map_err(|_| QuantityError::TooLarge {
                max: i32::MAX,
                got: value,
            })
    }

    /// The raw value (always `>= 1`).
    #[must_use]
    pub const fn get(self) -> i32 {
        self.0
    }

    /// Merge another quantity into this one.
    ///
    /// # Errors
    ///
    /// Returns [`QuantityError::TooLarge`] if the sum overflows.
    pub fn checked_add(self, other: Self) -> Result<Self, QuantityError> {
        Self::new(i64::from(self.0) + i64::from(other.0))
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self::ONE
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i64> for Quantity {
    type Error = QuantityError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<i32> for Quantity {
    type Error = QuantityError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::new(i64::from(value))
    }
}

impl From<Quantity> for i32 {
    fn from(quantity: Quantity) -> Self {
        quantity.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_floor_is_one() {
        assert_eq!(Quantity::new(0), Err(QuantityError::TooSmall(0)));
        assert_eq!(Quantity::new(-1), Err(QuantityError::TooSmall(-1)));
        assert_eq!(Quantity::new(1), Ok(Quantity::ONE));
    }

    #[test]
    fn test_ceiling_is_i32_max() {
        assert!(Quantity::new(i64::from(i32::MAX)).is_ok());
        assert!(matches!(
            Quantity::new(i64::from(i32::MAX) + 1),
            Err(QuantityError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_checked_add_accumulates() {
        let merged = Quantity::new(2)
            .unwrap()
            .checked_add(Quantity::new(3).unwrap())
            .unwrap();
        assert_eq!(merged.get(), 5);
        assert!(Quantity::new(i64::from(i32::MAX)).unwrap().checked_add(Quantity::ONE).is_err());
    }

    #[test]
    fn test_deserialize_rejects_zero_and_fractions() {
        assert_eq!(serde_json::from_str::<Quantity>("4").unwrap().get(), 4);
        assert!(serde_json::from_str::<Quantity>("0").is_err());
        assert!(serde_json::from_str::<Quantity>("1.5").is_err());
    }
}
