//! Cart ledger operations.
//!
//! Every operation is scoped to the calling user; another user's line IDs
//! behave as if they did not exist.

use tracing::instrument;

use atelier_core::{CartItemId, ProductId, Quantity, UserId, VariantId};

use super::{CommerceError, InventoryService};
use crate::db::{CartStore, CatalogStore};
use crate::models::{CartItem, CartLine, CartSummary, StockPolicy};

/// Cart service.
pub struct CartService<'a, S> {
    store: &'a S,
    inventory: InventoryService<'a, S>,
}

impl<'a, S: CatalogStore + CartStore> CartService<'a, S> {
    /// Create a new cart service.
    #[must_use]
    pub const fn new(store: &'a S, policy: StockPolicy) -> Self {
        Self {
            store,
            inventory: InventoryService::new(store, policy),
        }
    }

    /// Add `quantity` units of a variant, merging into an existing line for
    /// the same (product, variant).
    ///
    /// Only checks that the variant is purchasable at all; whether there is
    /// enough stock for the requested quantity is decided at checkout.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::InvalidQuantity` for quantities below 1,
    /// `CommerceError::NotFound`, `CommerceError::VariantMismatch` or
    /// `CommerceError::OutOfStock` if the variant cannot be bought.
    #[instrument(skip(self))]
    pub async fn add_to_cart(
        &self,
        user_id: UserId,
        product_id: ProductId,
        variant_id: VariantId,
        quantity: i64,
    ) -> Result<CartItem, CommerceError> {
        let quantity = Quantity::new(quantity)?;
        self.inventory
            .purchasable_variant(product_id, variant_id)
            .await?;

        let item = self
            .store
            .merge_cart_item(user_id, product_id, variant_id, quantity)
            .await
            .map_err(|e| match CommerceError::from(e) {
                // Variant vanished between the check and the write.
                CommerceError::NotFound(_) => CommerceError::NotFound("variant"),
                other => other,
            })?;

        tracing::info!(
            cart_item_id = %item.id,
            quantity = %item.quantity,
            "Cart line merged"
        );
        Ok(item)
    }

    /// Add the product's first purchasable variant.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::OutOfStock` if no variant is purchasable, plus
    /// everything [`Self::add_to_cart`] can return.
    #[instrument(skip(self))]
    pub async fn quick_add(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<CartItem, CommerceError> {
        let quantity = Quantity::new(quantity)?;
        let variant = self.inventory.first_available_variant(product_id).await?;
        self.add_to_cart(user_id, product_id, variant.id, i64::from(quantity.get()))
            .await
    }

    /// Overwrite the quantity of one of the user's lines.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::InvalidQuantity` for quantities below 1 and
    /// `CommerceError::NotFound` if the user has no such line.
    #[instrument(skip(self))]
    pub async fn update_quantity(
        &self,
        user_id: UserId,
        cart_item_id: CartItemId,
        quantity: i64,
    ) -> Result<CartItem, CommerceError> {
        let quantity = Quantity::new(quantity)?;
        self.store
            .set_cart_item_quantity(user_id, cart_item_id, quantity)
            .await?
            .ok_or(CommerceError::NotFound("cart item"))
    }

    /// Remove one of the user's lines. Removing a missing line succeeds.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::Storage` if the delete fails.
    #[instrument(skip(self))]
    pub async fn remove_item(
        &self,
        user_id: UserId,
        cart_item_id: CartItemId,
    ) -> Result<(), CommerceError> {
        if !self.store.delete_cart_item(user_id, cart_item_id).await? {
            tracing::debug!(%cart_item_id, "Cart line already gone");
        }
        Ok(())
    }

    /// The user's cart lines with product and variant attached.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::Storage` if the query fails.
    pub async fn list_cart(&self, user_id: UserId) -> Result<Vec<CartLine>, CommerceError> {
        Ok(self.store.list_cart(user_id).await?)
    }

    /// Lines plus item count and subtotal.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::Storage` if the query fails.
    pub async fn summary(&self, user_id: UserId) -> Result<CartSummary, CommerceError> {
        let lines = self.list_cart(user_id).await?;
        Ok(CartSummary::from_lines(lines)?)
    }

    /// Empty the user's cart.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::Storage` if the delete fails.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self, user_id: UserId) -> Result<u64, CommerceError> {
        Ok(self.store.clear_cart(user_id).await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::services::testing::{coat_fixture, seed_coat, seed_sweater};

    #[tokio::test]
    async fn test_adding_same_variant_twice_merges() {
        let store = MemoryStore::new();
        let coat = seed_coat(&store).await;
        let cart = CartService::new(&store, StockPolicy::Strict);
        let user = UserId::generate();
        let black_m = coat.variant("M", "Black").id;

        cart.add_to_cart(user, coat.product.id, black_m, 1)
            .await
            .unwrap();
        cart.add_to_cart(user, coat.product.id, black_m, 2)
            .await
            .unwrap();

        let lines = cart.list_cart(user).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].item.quantity.get(), 3);
    }

    #[tokio::test]
    async fn test_different_variants_get_separate_lines() {
        let store = MemoryStore::new();
        let coat = seed_coat(&store).await;
        let cart = CartService::new(&store, StockPolicy::Strict);
        let user = UserId::generate();

        cart.add_to_cart(user, coat.product.id, coat.variant("M", "Black").id, 1)
            .await
            .unwrap();
        cart.add_to_cart(user, coat.product.id, coat.variant("L", "Navy").id, 1)
            .await
            .unwrap();

        assert_eq!(cart.list_cart(user).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_zero_and_negative_quantities_are_rejected() {
        let store = MemoryStore::new();
        let coat = seed_coat(&store).await;
        let cart = CartService::new(&store, StockPolicy::Strict);
        let user = UserId::generate();
        let variant = coat.variant("M", "Black").id;

        for bad in [0, -1] {
            let err = cart
                .add_to_cart(user, coat.product.id, variant, bad)
                .await
                .unwrap_err();
            assert!(matches!(err, CommerceError::InvalidQuantity(_)));
        }
        assert!(cart.list_cart(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sold_out_variant_cannot_be_added() {
        let store = MemoryStore::new();
        let coat = seed_coat(&store).await;
        let cart = CartService::new(&store, StockPolicy::Strict);

        let err = cart
            .add_to_cart(
                UserId::generate(),
                coat.product.id,
                coat.variant("M", "Charcoal").id,
                1,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CommerceError::OutOfStock(_)));
    }

    #[tokio::test]
    async fn test_add_more_than_stock_is_allowed_until_checkout() {
        let store = MemoryStore::new();
        let coat = seed_coat(&store).await;
        let cart = CartService::new(&store, StockPolicy::Strict);
        let user = UserId::generate();

        let item = cart
            .add_to_cart(user, coat.product.id, coat.variant("XS", "Black").id, 50)
            .await
            .unwrap();
        assert_eq!(item.quantity.get(), 50);
    }

    #[tokio::test]
    async fn test_quick_add_picks_first_available() {
        let store = MemoryStore::new();
        let product = coat_fixture(&store, &[("S", "Grey", 0), ("M", "Grey", 4)]).await;
        let cart = CartService::new(&store, StockPolicy::Strict);
        let user = UserId::generate();

        cart.quick_add(user, product.id, 1).await.unwrap();

        let lines = cart.list_cart(user).await.unwrap();
        assert_eq!(lines[0].variant.size, "M");
    }

    #[tokio::test]
    async fn test_update_quantity_floor_is_one() {
        let store = MemoryStore::new();
        let coat = seed_coat(&store).await;
        let cart = CartService::new(&store, StockPolicy::Strict);
        let user = UserId::generate();
        let item = cart
            .add_to_cart(user, coat.product.id, coat.variant("M", "Black").id, 2)
            .await
            .unwrap();

        let err = cart.update_quantity(user, item.id, 0).await.unwrap_err();
        assert!(matches!(err, CommerceError::InvalidQuantity(_)));

        let updated = cart.update_quantity(user, item.id, 1).await.unwrap();
        assert_eq!(updated.quantity.get(), 1);
    }

    #[tokio::test]
    async fn test_other_users_lines_are_invisible() {
        let store = MemoryStore::new();
        let coat = seed_coat(&store).await;
        let cart = CartService::new(&store, StockPolicy::Strict);
        let owner = UserId::generate();
        let item = cart
            .add_to_cart(owner, coat.product.id, coat.variant("M", "Black").id, 1)
            .await
            .unwrap();

        let err = cart
            .update_quantity(UserId::generate(), item.id, 5)
            .await
            .unwrap_err();
        assert!(matches!(err, CommerceError::NotFound("cart item")));
        assert!(cart.list_cart(UserId::generate()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let store = MemoryStore::new();
        let coat = seed_coat(&store).await;
        let cart = CartService::new(&store, StockPolicy::Strict);
        let user = UserId::generate();
        let item = cart
            .add_to_cart(user, coat.product.id, coat.variant("M", "Black").id, 1)
            .await
            .unwrap();

        cart.remove_item(user, item.id).await.unwrap();
        cart.remove_item(user, item.id).await.unwrap();
        assert!(cart.list_cart(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_summary_totals() {
        let store = MemoryStore::new();
        let coat = seed_coat(&store).await;
        let sweater = seed_sweater(&store).await;
        let cart = CartService::new(&store, StockPolicy::Strict);
        let user = UserId::generate();

        cart.add_to_cart(user, coat.product.id, coat.variant("M", "Black").id, 1)
            .await
            .unwrap();
        cart.add_to_cart(user, sweater.product.id, sweater.variant("M", "Navy").id, 2)
            .await
            .unwrap();

        let summary = cart.summary(user).await.unwrap();
        assert_eq!(summary.item_count, 3);
        assert_eq!(summary.subtotal.to_string(), "545.00");
    }

    #[tokio::test]
    async fn test_clear_cart() {
        let store = MemoryStore::new();
        let coat = seed_coat(&store).await;
        let cart = CartService::new(&store, StockPolicy::Strict);
        let user = UserId::generate();
        cart.add_to_cart(user, coat.product.id, coat.variant("M", "Black").id, 1)
            .await
            .unwrap();
        cart.add_to_cart(user, coat.product.id, coat.variant("L", "Navy").id, 1)
            .await
            .unwrap();

        assert_eq!(cart.clear_cart(user).await.unwrap(), 2);
        assert!(cart.list_cart(user).await.unwrap().is_empty());
    }
}
