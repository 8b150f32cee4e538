//! Swatch colors for product variants.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Error returned when a swatch hex code is malformed.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("color must be a hex code like #1a2847 or #fff (got {0:?})")]
pub struct HexColorError(pub String);

/// A CSS hex color (`#RGB` or `#RRGGBB`), stored uppercase.
///
/// ```
/// use atelier_core::HexColor;
///
/// assert_eq!(HexColor::parse("#1a2847").unwrap().as_str(), "#1A2847");
/// assert!(HexColor::parse("navy").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor(String);

impl HexColor {
    /// Parse a hex color code.
    ///
    /// # Errors
    ///
    /// Returns [`HexColorError`] unless the input is `#` followed by exactly
    /// three or six hex digits.
    pub fn parse(s: &str) -> Result<Self, HexColorError> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix('#')
            .filter(|d| matches!(d.len(), 3 | 6) && d.chars().all(|c| c.is_ascii_hexdigit()))
            .ok_or_else(|| HexColorError(s.to_owned()))?;
        Ok(Self(format!("#{}", digits.to_ascii_uppercase())))
    }

    /// Returns the normalized code, including the leading `#`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for HexColor {
    type Error = HexColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<HexColor> for String {
    fn from(color: HexColor) -> Self {
        color.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_form_is_accepted() {
        assert_eq!(HexColor::parse("#fff").map(|c| c.0), Ok("#FFF".to_owned()));
    }

    #[test]
    fn test_missing_hash_or_bad_length() {
        assert!(HexColor::parse("000000").is_err());
        assert!(HexColor::parse("#0000").is_err());
        assert!(HexColor::parse("#GGGGGG").is_err());
    }
}
