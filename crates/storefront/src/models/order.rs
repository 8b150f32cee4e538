//! Order types and the checkout command handed to storage.

use chrono::{DateTime, Utc};
use serde::Serialize;

use atelier_core::{
    CartItemId, Email, Money, OrderId, OrderItemId, OrderStatus, ProductId, Quantity, UserId,
    VariantId,
};

use super::catalog::StockPolicy;

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub customer_name: String,
    pub customer_email: Email,
    pub shipping_address: String,
    /// Sum of line price times quantity, fixed at checkout.
    pub total: Money,
    pub status: OrderStatus,
    /// Client-supplied key used to replay a checkout without duplicating it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A line of a placed order.
///
/// Name, size, color and price are captured at checkout and never change
/// afterwards, even if the catalog does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub quantity: Quantity,
    /// Unit price at checkout.
    pub price: Money,
    pub product_name: String,
    pub size: String,
    pub color: String,
    /// Units actually taken from variant stock at checkout. Lower than
    /// `quantity` when a backorder ran the variant out; cancelling returns
    /// only this many.
    #[serde(skip)]
    pub stock_taken: i32,
}

/// An order together with its lines.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Validated customer details collected at checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShippingDetails {
    pub customer_name: String,
    pub customer_email: Email,
    pub shipping_address: String,
}

/// One line of a checkout, snapshotted from the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderLine {
    /// The cart line this came from.
    pub cart_item_id: CartItemId,
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub quantity: Quantity,
    pub unit_price: Money,
    pub product_name: String,
    pub size: String,
    pub color: String,
}

/// Everything storage needs to commit a checkout in one step.
///
/// Storage must verify that the user's cart still holds exactly `lines`
/// (same cart item IDs and quantities) before committing.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub id: OrderId,
    pub user_id: UserId,
    pub shipping: ShippingDetails,
    pub total: Money,
    pub idempotency_key: Option<String>,
    pub lines: Vec<NewOrderLine>,
    pub policy: StockPolicy,
}

/// Outcome of a checkout.
#[derive(Debug, Clone)]
pub enum OrderPlacement {
    /// A new order was committed.
    Created(Order),
    /// The idempotency key matched an existing order; nothing was written.
    Replayed(Order),
}

impl OrderPlacement {
    /// The order, whether new or replayed.
    #[must_use]
    pub const fn order(&self) -> &Order {
        match self {
            Self::Created(order) | Self::Replayed(order) => order,
        }
    }

    /// Consume into the order.
    #[must_use]
    pub fn into_order(self) -> Order {
        match self {
            Self::Created(order) | Self::Replayed(order) => order,
        }
    }

    /// Whether this placement wrote a new order.
    #[must_use]
    pub const fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// A compare-and-swap status write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub order_id: OrderId,
    /// The status the order must currently have.
    pub from: OrderStatus,
    pub to: OrderStatus,
    /// Return each line's quantity to its variant's stock.
    pub restock: bool,
}
