//! Commerce error types.

use thiserror::Error;

use atelier_core::{
    InvalidOrderStatus, MoneyError, OrderStatus, ProductId, QuantityError, VariantId,
};

use crate::db::RepositoryError;

/// Errors that can occur in catalog, cart and order operations.
#[derive(Debug, Error)]
pub enum CommerceError {
    /// A product, variant, cart line or order does not exist (or is not
    /// visible to the caller).
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Nothing purchasable for the request.
    #[error("{0} is out of stock")]
    OutOfStock(String),

    /// A checkout line asks for more units than are on hand.
    #[error("not enough stock for variant {0}")]
    InsufficientStock(VariantId),

    /// Zero, negative or out-of-range quantity.
    #[error("invalid quantity: {0}")]
    InvalidQuantity(#[from] QuantityError),

    /// Checkout with nothing in the cart.
    #[error("cart is empty")]
    EmptyCart,

    /// Status string is not one of the known statuses.
    #[error(transparent)]
    InvalidStatus(#[from] InvalidOrderStatus),

    /// Status change not allowed by the order lifecycle.
    #[error("cannot move order from {from} to {to}")]
    IllegalTransition {
        /// Current status.
        from: OrderStatus,
        /// Requested status.
        to: OrderStatus,
    },

    /// The variant exists but belongs to a different product.
    #[error("variant {variant_id} does not belong to product {product_id}")]
    VariantMismatch {
        /// Variant named in the request.
        variant_id: VariantId,
        /// Product named in the request.
        product_id: ProductId,
    },

    /// Checkout details failed validation.
    #[error("invalid checkout: {0}")]
    InvalidCheckout(String),

    /// Catalog input failed validation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Caller may not see or change this resource.
    #[error("forbidden")]
    Forbidden,

    /// Lost a race with a concurrent write, or a uniqueness clash.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Storage failed.
    #[error("storage error: {0}")]
    Storage(#[source] RepositoryError),
}

impl From<RepositoryError> for CommerceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound("record"),
            RepositoryError::Conflict(msg) => Self::Conflict(msg),
            RepositoryError::InsufficientStock(variant_id) => Self::InsufficientStock(variant_id),
            other => Self::Storage(other),
        }
    }
}

impl From<MoneyError> for CommerceError {
    fn from(err: MoneyError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_errors_map_to_domain_errors() {
        let variant_id = VariantId::generate();
        assert!(matches!(
            CommerceError::from(RepositoryError::InsufficientStock(variant_id)),
            CommerceError::InsufficientStock(id) if id == variant_id
        ));
        assert!(matches!(
            CommerceError::from(RepositoryError::Conflict("x".to_owned())),
            CommerceError::Conflict(_)
        ));
        assert!(matches!(
            CommerceError::from(RepositoryError::Backend("down".to_owned())),
            CommerceError::Storage(_)
        ));
    }
}
