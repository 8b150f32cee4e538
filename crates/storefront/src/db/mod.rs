//! Storage for the catalog, carts and orders.
//!
//! # Backends
//!
//! - [`PgStore`] - `PostgreSQL` via sqlx, the production backend
//! - [`MemoryStore`] - in-process, used by tests and local demos
//!
//! Both implement the three store traits below. Services are generic over
//! [`CommerceStore`], so the same checkout code runs against either.
//!
//! # Database schema: `shop`
//!
//! - `product` - Catalog products
//! - `product_variant` - Size/color variants with stock on hand
//! - `cart_item` - Cart ledger, one row per (user, product, variant)
//! - `orders` - Placed orders
//! - `order_item` - Order lines with captured name/size/color/price
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p atelier-cli -- migrate
//! ```

pub mod memory;
pub mod postgres;

use std::future::Future;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use atelier_core::{CartItemId, OrderId, ProductId, Quantity, UserId, VariantId};

use crate::models::{
    CartItem, CartLine, NewOrder, NewProduct, NewVariant, Order, OrderPlacement, OrderWithItems,
    Product, ProductPatch, ProductVariant, ProductWithVariants, StatusChange, VariantPatch,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation or lost race (e.g., cart changed mid-checkout).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// A stock decrement would have taken a variant below zero.
    #[error("insufficient stock for variant {0}")]
    InsufficientStock(VariantId),

    /// Non-database backend failure.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Products and variants.
pub trait CatalogStore: Send + Sync {
    /// All products, newest first.
    fn list_products(&self) -> impl Future<Output = Result<Vec<Product>, RepositoryError>> + Send;

    /// All products newest first, each with its variants in insertion order.
    fn list_products_with_variants(
        &self,
    ) -> impl Future<Output = Result<Vec<ProductWithVariants>, RepositoryError>> + Send;

    fn get_product(
        &self,
        id: ProductId,
    ) -> impl Future<Output = Result<Option<Product>, RepositoryError>> + Send;

    fn create_product(
        &self,
        input: &NewProduct,
    ) -> impl Future<Output = Result<Product, RepositoryError>> + Send;

    /// Apply a partial update. `Ok(None)` if the product does not exist.
    fn update_product(
        &self,
        id: ProductId,
        patch: &ProductPatch,
    ) -> impl Future<Output = Result<Option<Product>, RepositoryError>> + Send;

    /// Delete a product, its variants and any cart lines pointing at them.
    /// Returns whether a product was removed.
    fn delete_product(
        &self,
        id: ProductId,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    /// Variants of one product in insertion order.
    fn list_variants(
        &self,
        product_id: ProductId,
    ) -> impl Future<Output = Result<Vec<ProductVariant>, RepositoryError>> + Send;

    fn get_variant(
        &self,
        id: VariantId,
    ) -> impl Future<Output = Result<Option<ProductVariant>, RepositoryError>> + Send;

    /// Exact match on (product, size, color).
    fn find_variant(
        &self,
        product_id: ProductId,
        size: &str,
        color: &str,
    ) -> impl Future<Output = Result<Option<ProductVariant>, RepositoryError>> + Send;

    /// Returns [`RepositoryError::NotFound`] if the product does not exist
    /// and [`RepositoryError::Conflict`] for a duplicate size/color or SKU.
    fn create_variant(
        &self,
        product_id: ProductId,
        input: &NewVariant,
    ) -> impl Future<Output = Result<ProductVariant, RepositoryError>> + Send;

    fn update_variant(
        &self,
        id: VariantId,
        patch: &VariantPatch,
    ) -> impl Future<Output = Result<Option<ProductVariant>, RepositoryError>> + Send;

    /// Delete a variant and any cart lines pointing at it.
    fn delete_variant(
        &self,
        id: VariantId,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;
}

/// The per-user cart ledger.
pub trait CartStore: Send + Sync {
    /// The user's cart lines joined with product and variant, oldest first.
    fn list_cart(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<Vec<CartLine>, RepositoryError>> + Send;

    /// Insert a line, or add `quantity` to the existing line for the same
    /// (user, product, variant). Runs as one atomic step.
    ///
    /// Returns [`RepositoryError::NotFound`] if the variant does not belong
    /// to the product (or either is gone).
    fn merge_cart_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        variant_id: VariantId,
        quantity: Quantity,
    ) -> impl Future<Output = Result<CartItem, RepositoryError>> + Send;

    /// Overwrite a line's quantity. `Ok(None)` if the user has no such line.
    fn set_cart_item_quantity(
        &self,
        user_id: UserId,
        id: CartItemId,
        quantity: Quantity,
    ) -> impl Future<Output = Result<Option<CartItem>, RepositoryError>> + Send;

    /// Remove one of the user's lines. Returns whether a line was removed.
    fn delete_cart_item(
        &self,
        user_id: UserId,
        id: CartItemId,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    /// Remove all of the user's lines. Returns how many were removed.
    fn clear_cart(&self, user_id: UserId)
    -> impl Future<Output = Result<u64, RepositoryError>> + Send;
}

/// Orders and the atomic checkout.
pub trait OrderStore: Send + Sync {
    /// Commit a checkout as a single unit:
    ///
    /// 1. Replay if `(user, idempotency_key)` already has an order.
    /// 2. Verify the user's cart still matches `order.lines` exactly,
    ///    else [`RepositoryError::Conflict`].
    /// 3. Decrement each variant's stock, failing with
    ///    [`RepositoryError::InsufficientStock`] under the strict policy.
    /// 4. Insert the order and its lines.
    /// 5. Empty the user's cart.
    ///
    /// On any error nothing is persisted.
    fn place_order(
        &self,
        order: &NewOrder,
    ) -> impl Future<Output = Result<OrderPlacement, RepositoryError>> + Send;

    fn find_order_by_idempotency_key(
        &self,
        user_id: UserId,
        key: &str,
    ) -> impl Future<Output = Result<Option<Order>, RepositoryError>> + Send;

    fn get_order(
        &self,
        id: OrderId,
    ) -> impl Future<Output = Result<Option<OrderWithItems>, RepositoryError>> + Send;

    /// Orders newest first, optionally for one user.
    fn list_orders(
        &self,
        user_id: Option<UserId>,
    ) -> impl Future<Output = Result<Vec<OrderWithItems>, RepositoryError>> + Send;

    /// Move an order from `change.from` to `change.to`, restocking in the
    /// same unit when asked.
    ///
    /// Returns [`RepositoryError::NotFound`] for an unknown order and
    /// [`RepositoryError::Conflict`] if the status is no longer `change.from`.
    fn transition_order_status(
        &self,
        change: StatusChange,
    ) -> impl Future<Output = Result<Order, RepositoryError>> + Send;
}

/// Everything the storefront needs from storage.
pub trait CommerceStore: CatalogStore + CartStore + OrderStore + Clone + 'static {
    /// Cheap liveness check for readiness probes.
    fn ping(&self) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

/// Map a sqlx error, turning unique violations into [`RepositoryError::Conflict`].
pub(crate) fn map_unique_violation(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(e)
}
