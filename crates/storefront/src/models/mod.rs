//! Domain models for the storefront.
//!
//! These types are what services and routes exchange; each storage backend
//! maps its own rows into them.

pub mod cart;
pub mod catalog;
pub mod identity;
pub mod order;

pub use cart::{CartItem, CartLine, CartSummary};
pub use catalog::{
    NewProduct, NewVariant, Product, ProductPatch, ProductVariant, ProductWithVariants,
    StockPolicy, VariantPatch,
};
pub use identity::{CurrentUser, Role};
pub use order::{
    NewOrder, NewOrderLine, Order, OrderItem, OrderPlacement, OrderWithItems, ShippingDetails,
    StatusChange,
};
