//! Catalog reads and administration.
//!
//! Product reads go through a `moka` cache with a TTL; every catalog write
//! drops the whole cache.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::instrument;

use atelier_core::{ProductId, VariantId};

use super::CommerceError;
use crate::db::CatalogStore;
use crate::models::{
    NewProduct, NewVariant, Product, ProductPatch, ProductVariant, ProductWithVariants,
    VariantPatch,
};

#[derive(Debug, Clone)]
enum CacheValue {
    Products(Arc<Vec<Product>>),
    Product(Arc<Product>),
}

/// Shared product cache, held in application state.
#[derive(Clone)]
pub struct CatalogCache {
    cache: Cache<String, CacheValue>,
}

impl CatalogCache {
    /// Create a cache whose entries live for `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(ttl)
            .build();
        Self { cache }
    }

    /// Drop every cached entry.
    pub async fn invalidate_all(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }
}

impl std::fmt::Debug for CatalogCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogCache")
            .field("entries", &self.cache.entry_count())
            .finish()
    }
}

fn require_text(field: &str, value: &str) -> Result<(), CommerceError> {
    if value.trim().is_empty() {
        return Err(CommerceError::InvalidInput(format!("{field} cannot be empty")));
    }
    Ok(())
}

fn require_stock(stock: i32) -> Result<(), CommerceError> {
    if stock < 0 {
        return Err(CommerceError::InvalidInput(
            "stock cannot be negative".to_owned(),
        ));
    }
    Ok(())
}

/// Catalog service.
pub struct CatalogService<'a, S> {
    store: &'a S,
    cache: &'a CatalogCache,
}

impl<'a, S: CatalogStore> CatalogService<'a, S> {
    /// Create a new catalog service.
    #[must_use]
    pub const fn new(store: &'a S, cache: &'a CatalogCache) -> Self {
        Self { store, cache }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// All products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::Storage` if the query fails.
    pub async fn list_products(&self) -> Result<Arc<Vec<Product>>, CommerceError> {
        let key = "products".to_owned();
        if let Some(CacheValue::Products(products)) = self.cache.cache.get(&key).await {
            tracing::debug!("Catalog cache hit");
            return Ok(products);
        }

        let products = Arc::new(self.store.list_products().await?);
        self.cache
            .cache
            .insert(key, CacheValue::Products(Arc::clone(&products)))
            .await;
        Ok(products)
    }

    /// One product.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::NotFound` if the product does not exist.
    pub async fn get_product(&self, id: ProductId) -> Result<Arc<Product>, CommerceError> {
        let key = format!("product:{id}");
        if let Some(CacheValue::Product(product)) = self.cache.cache.get(&key).await {
            return Ok(product);
        }

        let product = Arc::new(
            self.store
                .get_product(id)
                .await?
                .ok_or(CommerceError::NotFound("product"))?,
        );
        self.cache
            .cache
            .insert(key, CacheValue::Product(Arc::clone(&product)))
            .await;
        Ok(product)
    }

    /// Every product with its variants, uncached.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::Storage` if the query fails.
    pub async fn list_products_with_variants(
        &self,
    ) -> Result<Vec<ProductWithVariants>, CommerceError> {
        Ok(self.store.list_products_with_variants().await?)
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::InvalidInput` for an empty name.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_product(&self, input: &NewProduct) -> Result<Product, CommerceError> {
        require_text("name", &input.name)?;
        let product = self.store.create_product(input).await?;
        self.cache.invalidate_all().await;
        tracing::info!(product_id = %product.id, "Product created");
        Ok(product)
    }

    /// Apply a partial update to a product.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::InvalidInput` for an empty name and
    /// `CommerceError::NotFound` if the product does not exist.
    #[instrument(skip(self, patch))]
    pub async fn update_product(
        &self,
        id: ProductId,
        patch: &ProductPatch,
    ) -> Result<Product, CommerceError> {
        if let Some(name) = &patch.name {
            require_text("name", name)?;
        }
        let product = self
            .store
            .update_product(id, patch)
            .await?
            .ok_or(CommerceError::NotFound("product"))?;
        self.cache.invalidate_all().await;
        Ok(product)
    }

    /// Delete a product with its variants and any cart lines for them.
    /// Placed orders keep their captured lines.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::NotFound` if the product does not exist.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: ProductId) -> Result<(), CommerceError> {
        if !self.store.delete_product(id).await? {
            return Err(CommerceError::NotFound("product"));
        }
        self.cache.invalidate_all().await;
        tracing::info!(product_id = %id, "Product deleted");
        Ok(())
    }

    // =========================================================================
    // Variants
    // =========================================================================

    /// Add a variant to a product.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::InvalidInput` for empty size/color or negative
    /// stock, `CommerceError::NotFound` if the product does not exist and
    /// `CommerceError::Conflict` if the size/color pair or SKU is taken.
    #[instrument(skip(self, input))]
    pub async fn create_variant(
        &self,
        product_id: ProductId,
        input: &NewVariant,
    ) -> Result<ProductVariant, CommerceError> {
        require_text("size", &input.size)?;
        require_text("color", &input.color)?;
        require_stock(input.stock)?;

        let variant = self
            .store
            .create_variant(product_id, input)
            .await
            .map_err(|e| match CommerceError::from(e) {
                CommerceError::NotFound(_) => CommerceError::NotFound("product"),
                other => other,
            })?;
        self.cache.invalidate_all().await;
        Ok(variant)
    }

    /// Apply a partial update to a variant.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::InvalidInput` for empty size/color or negative
    /// stock and `CommerceError::NotFound` if the variant does not exist.
    #[instrument(skip(self, patch))]
    pub async fn update_variant(
        &self,
        id: VariantId,
        patch: &VariantPatch,
    ) -> Result<ProductVariant, CommerceError> {
        if let Some(size) = &patch.size {
            require_text("size", size)?;
        }
        if let Some(color) = &patch.color {
            require_text("color", color)?;
        }
        if let Some(stock) = patch.stock {
            require_stock(stock)?;
        }

        let variant = self
            .store
            .update_variant(id, patch)
            .await?
            .ok_or(CommerceError::NotFound("variant"))?;
        self.cache.invalidate_all().await;
        Ok(variant)
    }

    /// Delete a variant and any cart lines for it.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::NotFound` if the variant does not exist.
    #[instrument(skip(self))]
    pub async fn delete_variant(&self, id: VariantId) -> Result<(), CommerceError> {
        if !self.store.delete_variant(id).await? {
            return Err(CommerceError::NotFound("variant"));
        }
        self.cache.invalidate_all().await;
        Ok(())
    }
}
