//! Cart ledger types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use atelier_core::{CartItemId, Money, MoneyError, ProductId, Quantity, UserId, VariantId};

use super::catalog::{Product, ProductVariant};

/// One cart line, unique per (user, product, variant).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: CartItemId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub quantity: Quantity,
    pub created_at: DateTime<Utc>,
    /// Bumped on every merge or quantity change.
    pub updated_at: DateTime<Utc>,
}

/// A cart line joined with the current product and variant.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    #[serde(flatten)]
    pub item: CartItem,
    pub product: Product,
    pub variant: ProductVariant,
}

impl CartLine {
    /// Product base price times quantity.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Overflow`] if the line total is out of range.
    pub fn line_total(&self) -> Result<Money, MoneyError> {
        self.product.price.line_total(self.item.quantity)
    }
}

/// Cart lines plus display totals.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSummary {
    pub lines: Vec<CartLine>,
    /// Sum of quantities across lines.
    pub item_count: i64,
    pub subtotal: Money,
}

impl CartSummary {
    /// Summarize a list of lines.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Overflow`] if the subtotal is out of range.
    pub fn from_lines(lines: Vec<CartLine>) -> Result<Self, MoneyError> {
        let subtotal = Money::try_sum(
            lines
                .iter()
                .map(CartLine::line_total)
                .collect::<Result<Vec<_>, _>>()?,
        )?;
        let item_count = lines
            .iter()
            .map(|line| i64::from(line.item.quantity.get()))
            .sum();

        Ok(Self {
            lines,
            item_count,
            subtotal,
        })
    }
}
