//! Catalog domain types: products and their size/color variants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use atelier_core::{HexColor, Money, ProductId, Quantity, VariantId};

/// Whether zero-stock variants may still be sold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StockPolicy {
    /// Only variants with stock on hand are purchasable.
    #[default]
    Strict,
    /// Zero-stock variants are purchasable; stock bottoms out at zero.
    AllowBackorder,
}

impl StockPolicy {
    /// Map the `allow_backorder` config flag to a policy.
    #[must_use]
    pub const fn from_allow_backorder(allow: bool) -> Self {
        if allow {
            Self::AllowBackorder
        } else {
            Self::Strict
        }
    }
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Unique product ID.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Long-form description.
    pub description: String,
    /// Base price. This is the price captured on order lines.
    pub price: Money,
    /// Primary image reference.
    pub image_src: Option<String>,
    /// Gallery image references.
    pub images: Vec<String>,
    /// When the product was created.
    pub created_at: DateTime<Utc>,
    /// When the product was last updated.
    pub updated_at: DateTime<Utc>,
}

/// A purchasable size/color combination of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductVariant {
    /// Unique variant ID.
    pub id: VariantId,
    /// Parent product.
    pub product_id: ProductId,
    /// Size label ("M", "32", ...).
    pub size: String,
    /// Color name.
    pub color: String,
    /// Swatch color.
    pub color_hex: HexColor,
    /// Units on hand (never negative).
    pub stock: i32,
    /// Optional stock keeping unit.
    pub sku: Option<String>,
    /// Optional price override. Not used for order totals.
    pub price: Option<Money>,
    /// Optional unit cost.
    pub cost_price: Option<Money>,
    /// When the variant was created.
    pub created_at: DateTime<Utc>,
    /// When the variant was last updated.
    pub updated_at: DateTime<Utc>,
}

impl ProductVariant {
    /// Whether a single unit can be bought under `policy`.
    #[must_use]
    pub const fn is_purchasable(&self, policy: StockPolicy) -> bool {
        match policy {
            StockPolicy::Strict => self.stock > 0,
            StockPolicy::AllowBackorder => true,
        }
    }

    /// Whether `quantity` units can be fulfilled under `policy`.
    #[must_use]
    pub const fn can_fulfil(&self, quantity: Quantity, policy: StockPolicy) -> bool {
        match policy {
            StockPolicy::Strict => self.stock >= quantity.get(),
            StockPolicy::AllowBackorder => true,
        }
    }
}

/// A product with all of its variants, in insertion order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductWithVariants {
    /// The product itself.
    #[serde(flatten)]
    pub product: Product,
    /// Its variants.
    pub variants: Vec<ProductVariant>,
}

/// Input for creating a product.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Money,
    #[serde(default)]
    pub image_src: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

/// Partial update for a product. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Money>,
    pub image_src: Option<String>,
    pub images: Option<Vec<String>>,
}

/// Input for creating a variant under a product.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVariant {
    pub size: String,
    pub color: String,
    pub color_hex: HexColor,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub price: Option<Money>,
    #[serde(default)]
    pub cost_price: Option<Money>,
}

/// Partial update for a variant. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantPatch {
    pub size: Option<String>,
    pub color: Option<String>,
    pub color_hex: Option<HexColor>,
    pub stock: Option<i32>,
    pub sku: Option<String>,
    pub price: Option<Money>,
    pub cost_price: Option<Money>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn variant(stock: i32) -> ProductVariant {
        let now = Utc::now();
        ProductVariant {
            id: VariantId::generate(),
            product_id: ProductId::generate(),
            size: "M".to_owned(),
            color: "Black".to_owned(),
            color_hex: HexColor::parse("#000000").unwrap(),
            stock,
            sku: None,
            price: None,
            cost_price: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_zero_stock_is_not_purchasable_by_default() {
        assert!(!variant(0).is_purchasable(StockPolicy::default()));
        assert!(variant(1).is_purchasable(StockPolicy::Strict));
    }

    #[test]
    fn test_backorder_allows_zero_stock() {
        assert!(variant(0).is_purchasable(StockPolicy::AllowBackorder));
        assert!(variant(0).can_fulfil(Quantity::new(4).unwrap(), StockPolicy::AllowBackorder));
    }

    #[test]
    fn test_can_fulfil_compares_against_stock() {
        let v = variant(3);
        assert!(v.can_fulfil(Quantity::new(3).unwrap(), StockPolicy::Strict));
        assert!(!v.can_fulfil(Quantity::new(4).unwrap(), StockPolicy::Strict));
    }

    #[test]
    fn test_policy_from_flag() {
        assert_eq!(StockPolicy::from_allow_backorder(false), StockPolicy::Strict);
        assert_eq!(StockPolicy::from_allow_backorder(true), StockPolicy::AllowBackorder);
    }
}
