//! Variant lookup and availability.

use tracing::instrument;

use atelier_core::{ProductId, VariantId};

use super::CommerceError;
use crate::db::CatalogStore;
use crate::models::{Product, ProductVariant, StockPolicy};

/// Read-only queries over variants and their stock.
pub struct InventoryService<'a, S> {
    store: &'a S,
    policy: StockPolicy,
}

impl<'a, S: CatalogStore> InventoryService<'a, S> {
    /// Create a new inventory service.
    #[must_use]
    pub const fn new(store: &'a S, policy: StockPolicy) -> Self {
        Self { store, policy }
    }

    /// The stock policy in force.
    #[must_use]
    pub const fn policy(&self) -> StockPolicy {
        self.policy
    }

    /// Load a product or fail with `NotFound`.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::NotFound` if the product does not exist.
    pub async fn product(&self, product_id: ProductId) -> Result<Product, CommerceError> {
        self.store
            .get_product(product_id)
            .await?
            .ok_or(CommerceError::NotFound("product"))
    }

    /// All variants of a product, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::NotFound` if the product does not exist.
    #[instrument(skip(self))]
    pub async fn list_variants(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<ProductVariant>, CommerceError> {
        self.product(product_id).await?;
        Ok(self.store.list_variants(product_id).await?)
    }

    /// Exact variant for a (product, size, color) selection.
    ///
    /// Zero-stock variants are still returned; callers decide whether they
    /// are purchasable via [`ProductVariant::is_purchasable`].
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::NotFound` if no variant matches.
    #[instrument(skip(self))]
    pub async fn find_variant(
        &self,
        product_id: ProductId,
        size: &str,
        color: &str,
    ) -> Result<ProductVariant, CommerceError> {
        self.store
            .find_variant(product_id, size, color)
            .await?
            .ok_or(CommerceError::NotFound("variant"))
    }

    /// The first purchasable variant of a product, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::NotFound` if the product does not exist and
    /// `CommerceError::OutOfStock` if no variant is purchasable.
    #[instrument(skip(self))]
    pub async fn first_available_variant(
        &self,
        product_id: ProductId,
    ) -> Result<ProductVariant, CommerceError> {
        let product = self.product(product_id).await?;
        self.store
            .list_variants(product_id)
            .await?
            .into_iter()
            .find(|v| v.is_purchasable(self.policy))
            .ok_or(CommerceError::OutOfStock(product.name))
    }

    /// A variant that can be added to a cart for `product_id`.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::NotFound` if the product or variant does not
    /// exist, `CommerceError::VariantMismatch` if the variant belongs to
    /// another product, and `CommerceError::OutOfStock` if it has no stock.
    pub async fn purchasable_variant(
        &self,
        product_id: ProductId,
        variant_id: VariantId,
    ) -> Result<ProductVariant, CommerceError> {
        let product = self.product(product_id).await?;
        let variant = self
            .store
            .get_variant(variant_id)
            .await?
            .ok_or(CommerceError::NotFound("variant"))?;

        if variant.product_id != product_id {
            return Err(CommerceError::VariantMismatch {
                variant_id,
                product_id,
            });
        }
        if !variant.is_purchasable(self.policy) {
            return Err(CommerceError::OutOfStock(format!(
                "{} ({} / {})",
                product.name, variant.size, variant.color
            )));
        }

        Ok(variant)
    }
}
