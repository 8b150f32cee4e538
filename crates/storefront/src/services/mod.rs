//! Business logic services for the storefront.
//!
//! Services are cheap, borrow the store for the length of a request and are
//! generic over the storage backend.
//!
//! # Services
//!
//! - `inventory` - Variant lookup and availability
//! - `cart` - Cart ledger (add/merge, quantity, remove, summary)
//! - `orders` - Checkout, order lifecycle and order queries
//! - `catalog` - Cached product reads and catalog administration

pub mod cart;
pub mod catalog;
mod error;
pub mod inventory;
pub mod orders;

#[cfg(test)]
pub(crate) mod testing;

pub use cart::CartService;
pub use catalog::{CatalogCache, CatalogService};
pub use error::CommerceError;
pub use inventory::InventoryService;
pub use orders::{CheckoutDetails, OrderService};
