//! In-memory store for tests and local demos.
//!
//! All state sits behind one async mutex. Multi-step writes (checkout,
//! status changes) run against a scratch copy of the state which replaces
//! the live state only once every step has succeeded, so a failure part way
//! through leaves nothing behind.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;

use atelier_core::{
    CartItemId, OrderId, OrderItemId, OrderStatus, ProductId, Quantity, UserId, VariantId,
};

use super::{CartStore, CatalogStore, CommerceStore, OrderStore, RepositoryError};
use crate::models::{
    CartItem, CartLine, NewOrder, NewProduct, NewVariant, Order, OrderItem, OrderPlacement,
    OrderWithItems, Product, ProductPatch, ProductVariant, ProductWithVariants, StatusChange,
    StockPolicy, VariantPatch,
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    // Vecs keep insertion order, which listing relies on.
    products: Vec<Product>,
    variants: Vec<ProductVariant>,
    cart: Vec<CartItem>,
    orders: Vec<Order>,
    order_items: Vec<OrderItem>,
    /// Fail the n-th order item insert of a checkout.
    fail_order_item_at: Option<usize>,
}

impl MemoryState {
    fn product(&self, id: ProductId) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    /// Products newest first; ties keep the later insert first.
    fn newest_products(&self) -> Vec<Product> {
        let mut products: Vec<_> = self.products.iter().rev().cloned().collect();
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        products
    }

    fn variant_mut(&mut self, id: VariantId) -> Option<&mut ProductVariant> {
        self.variants.iter_mut().find(|v| v.id == id)
    }

    fn order_with_items(&self, order: &Order) -> OrderWithItems {
        OrderWithItems {
            order: order.clone(),
            items: self
                .order_items
                .iter()
                .filter(|i| i.order_id == order.id)
                .cloned()
                .collect(),
        }
    }

    fn find_by_key(&self, user_id: UserId, key: &str) -> Option<&Order> {
        self.orders
            .iter()
            .find(|o| o.user_id == user_id && o.idempotency_key.as_deref() == Some(key))
    }

    fn commit_checkout(&mut self, new: &NewOrder) -> Result<Order, RepositoryError> {
        let mut cart: Vec<_> = self
            .cart
            .iter()
            .filter(|c| c.user_id == new.user_id)
            .map(|c| (c.id, c.quantity))
            .collect();
        let mut lines: Vec<_> = new
            .lines
            .iter()
            .map(|l| (l.cart_item_id, l.quantity))
            .collect();
        cart.sort_unstable();
        lines.sort_unstable();
        if cart != lines {
            return Err(RepositoryError::Conflict(
                "cart changed during checkout".to_owned(),
            ));
        }

        let mut taken = Vec::with_capacity(new.lines.len());
        for line in &new.lines {
            let variant = self.variant_mut(line.variant_id).ok_or_else(|| {
                RepositoryError::Conflict(format!("variant {} no longer exists", line.variant_id))
            })?;
            let wanted = line.quantity.get();
            let available = variant.stock.max(0);
            let take = match new.policy {
                StockPolicy::Strict if available < wanted => {
                    return Err(RepositoryError::InsufficientStock(line.variant_id));
                }
                StockPolicy::Strict => wanted,
                StockPolicy::AllowBackorder => wanted.min(available),
            };
            variant.stock = available - take;
            variant.updated_at = Utc::now();
            taken.push(take);
        }

        let now = Utc::now();
        let order = Order {
            id: new.id,
            user_id: new.user_id,
            customer_name: new.shipping.customer_name.clone(),
            customer_email: new.shipping.customer_email.clone(),
            shipping_address: new.shipping.shipping_address.clone(),
            total: new.total,
            status: OrderStatus::Pending,
            idempotency_key: new.idempotency_key.clone(),
            created_at: now,
            updated_at: now,
        };
        self.orders.push(order.clone());

        for (index, (line, stock_taken)) in new.lines.iter().zip(taken).enumerate() {
            if self.fail_order_item_at == Some(index) {
                return Err(RepositoryError::Backend(format!(
                    "injected failure inserting order item {index}"
                )));
            }
            self.order_items.push(OrderItem {
                id: OrderItemId::generate(),
                order_id: order.id,
                product_id: line.product_id,
                variant_id: line.variant_id,
                quantity: line.quantity,
                price: line.unit_price,
                product_name: line.product_name.clone(),
                size: line.size.clone(),
                color: line.color.clone(),
                stock_taken,
            });
        }

        self.cart
            .retain(|c| !new.lines.iter().any(|l| l.cart_item_id == c.id));

        Ok(order)
    }
}

/// Storage held entirely in process memory. Cloning shares the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later checkout fail while inserting its `index`-th order
    /// line (zero-based). Used to exercise checkout rollback.
    pub async fn fail_order_item_insert_at(&self, index: usize) {
        self.state.lock().await.fail_order_item_at = Some(index);
    }

    /// Undo [`Self::fail_order_item_insert_at`].
    pub async fn clear_injected_failures(&self) {
        self.state.lock().await.fail_order_item_at = None;
    }
}

impl CatalogStore for MemoryStore {
    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError> {
        Ok(self.state.lock().await.newest_products())
    }

    async fn list_products_with_variants(
        &self,
    ) -> Result<Vec<ProductWithVariants>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state
            .newest_products()
            .into_iter()
            .map(|product| ProductWithVariants {
                variants: state
                    .variants
                    .iter()
                    .filter(|v| v.product_id == product.id)
                    .cloned()
                    .collect(),
                product,
            })
            .collect())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.state.lock().await.product(id).cloned())
    }

    async fn create_product(&self, input: &NewProduct) -> Result<Product, RepositoryError> {
        let now = Utc::now();
        let product = Product {
            id: ProductId::generate(),
            name: input.name.clone(),
            description: input.description.clone(),
            price: input.price,
            image_src: input.image_src.clone(),
            images: input.images.clone(),
            created_at: now,
            updated_at: now,
        };
        self.state.lock().await.products.push(product.clone());
        Ok(product)
    }

    async fn update_product(
        &self,
        id: ProductId,
        patch: &ProductPatch,
    ) -> Result<Option<Product>, RepositoryError> {
        let mut state = self.state.lock().await;
        let Some(product) = state.products.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };

        if let Some(name) = &patch.name {
            product.name.clone_from(name);
        }
        if let Some(description) = &patch.description {
            product.description.clone_from(description);
        }
        if let Some(price) = patch.price {
            product.price = price;
        }
        if let Some(image_src) = &patch.image_src {
            product.image_src = Some(image_src.clone());
        }
        if let Some(images) = &patch.images {
            product.images.clone_from(images);
        }
        product.updated_at = Utc::now();

        Ok(Some(product.clone()))
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let mut state = self.state.lock().await;
        let before = state.products.len();
        state.products.retain(|p| p.id != id);
        state.variants.retain(|v| v.product_id != id);
        state.cart.retain(|c| c.product_id != id);
        Ok(state.products.len() < before)
    }

    async fn list_variants(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<ProductVariant>, RepositoryError> {
        Ok(self
            .state
            .lock()
            .await
            .variants
            .iter()
            .filter(|v| v.product_id == product_id)
            .cloned()
            .collect())
    }

    async fn get_variant(&self, id: VariantId) -> Result<Option<ProductVariant>, RepositoryError> {
        Ok(self
            .state
            .lock()
            .await
            .variants
            .iter()
            .find(|v| v.id == id)
            .cloned())
    }

    async fn find_variant(
        &self,
        product_id: ProductId,
        size: &str,
        color: &str,
    ) -> Result<Option<ProductVariant>, RepositoryError> {
        Ok(self
            .state
            .lock()
            .await
            .variants
            .iter()
            .find(|v| v.product_id == product_id && v.size == size && v.color == color)
            .cloned())
    }

    async fn create_variant(
        &self,
        product_id: ProductId,
        input: &NewVariant,
    ) -> Result<ProductVariant, RepositoryError> {
        let mut state = self.state.lock().await;
        if state.product(product_id).is_none() {
            return Err(RepositoryError::NotFound);
        }
        let duplicate = state.variants.iter().any(|v| {
            (v.product_id == product_id && v.size == input.size && v.color == input.color)
                || (input.sku.is_some() && v.sku == input.sku)
        });
        if duplicate {
            return Err(RepositoryError::Conflict("variant already exists".to_owned()));
        }

        let now = Utc::now();
        let variant = ProductVariant {
            id: VariantId::generate(),
            product_id,
            size: input.size.clone(),
            color: input.color.clone(),
            color_hex: input.color_hex.clone(),
            stock: input.stock,
            sku: input.sku.clone(),
            price: input.price,
            cost_price: input.cost_price,
            created_at: now,
            updated_at: now,
        };
        state.variants.push(variant.clone());
        Ok(variant)
    }

    async fn update_variant(
        &self,
        id: VariantId,
        patch: &VariantPatch,
    ) -> Result<Option<ProductVariant>, RepositoryError> {
        let mut state = self.state.lock().await;
        let Some(variant) = state.variant_mut(id) else {
            return Ok(None);
        };

        if let Some(size) = &patch.size {
            variant.size.clone_from(size);
        }
        if let Some(color) = &patch.color {
            variant.color.clone_from(color);
        }
        if let Some(color_hex) = &patch.color_hex {
            variant.color_hex = color_hex.clone();
        }
        if let Some(stock) = patch.stock {
            variant.stock = stock;
        }
        if let Some(sku) = &patch.sku {
            variant.sku = Some(sku.clone());
        }
        if let Some(price) = patch.price {
            variant.price = Some(price);
        }
        if let Some(cost_price) = patch.cost_price {
            variant.cost_price = Some(cost_price);
        }
        variant.updated_at = Utc::now();

        Ok(Some(variant.clone()))
    }

    async fn delete_variant(&self, id: VariantId) -> Result<bool, RepositoryError> {
        let mut state = self.state.lock().await;
        let before = state.variants.len();
        state.variants.retain(|v| v.id != id);
        state.cart.retain(|c| c.variant_id != id);
        Ok(state.variants.len() < before)
    }
}

impl CartStore for MemoryStore {
    async fn list_cart(&self, user_id: UserId) -> Result<Vec<CartLine>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state
            .cart
            .iter()
            .filter(|c| c.user_id == user_id)
            .filter_map(|item| {
                let product = state.product(item.product_id)?.clone();
                let variant = state
                    .variants
                    .iter()
                    .find(|v| v.id == item.variant_id)?
                    .clone();
                Some(CartLine {
                    item: item.clone(),
                    product,
                    variant,
                })
            })
            .collect())
    }

    async fn merge_cart_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        variant_id: VariantId,
        quantity: Quantity,
    ) -> Result<CartItem, RepositoryError> {
        let mut state = self.state.lock().await;
        let belongs = state
            .variants
            .iter()
            .any(|v| v.id == variant_id && v.product_id == product_id);
        if !belongs {
            return Err(RepositoryError::NotFound);
        }

        let now = Utc::now();
        if let Some(existing) = state.cart.iter_mut().find(|c| {
            c.user_id == user_id && c.product_id == product_id && c.variant_id == variant_id
        }) {
            existing.quantity = existing.quantity.checked_add(quantity).map_err(|e| {
                RepositoryError::Conflict(format!("merged quantity out of range: {e}"))
            })?;
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let item = CartItem {
            id: CartItemId::generate(),
            user_id,
            product_id,
            variant_id,
            quantity,
            created_at: now,
            updated_at: now,
        };
        state.cart.push(item.clone());
        Ok(item)
    }

    async fn set_cart_item_quantity(
        &self,
        user_id: UserId,
        id: CartItemId,
        quantity: Quantity,
    ) -> Result<Option<CartItem>, RepositoryError> {
        let mut state = self.state.lock().await;
        Ok(state
            .cart
            .iter_mut()
            .find(|c| c.id == id && c.user_id == user_id)
            .map(|item| {
                item.quantity = quantity;
                item.updated_at = Utc::now();
                item.clone()
            }))
    }

    async fn delete_cart_item(
        &self,
        user_id: UserId,
        id: CartItemId,
    ) -> Result<bool, RepositoryError> {
        let mut state = self.state.lock().await;
        let before = state.cart.len();
        state.cart.retain(|c| !(c.id == id && c.user_id == user_id));
        Ok(state.cart.len() < before)
    }

    async fn clear_cart(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let mut state = self.state.lock().await;
        let before = state.cart.len();
        state.cart.retain(|c| c.user_id != user_id);
        Ok((before - state.cart.len()) as u64)
    }
}

impl OrderStore for MemoryStore {
    async fn place_order(&self, order: &NewOrder) -> Result<OrderPlacement, RepositoryError> {
        let mut state = self.state.lock().await;

        if let Some(key) = order.idempotency_key.as_deref()
            && let Some(existing) = state.find_by_key(order.user_id, key)
        {
            return Ok(OrderPlacement::Replayed(existing.clone()));
        }

        let mut scratch = state.clone();
        let created = scratch.commit_checkout(order)?;
        *state = scratch;

        Ok(OrderPlacement::Created(created))
    }

    async fn find_order_by_idempotency_key(
        &self,
        user_id: UserId,
        key: &str,
    ) -> Result<Option<Order>, RepositoryError> {
        Ok(self.state.lock().await.find_by_key(user_id, key).cloned())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<OrderWithItems>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state
            .orders
            .iter()
            .find(|o| o.id == id)
            .map(|o| state.order_with_items(o)))
    }

    async fn list_orders(
        &self,
        user_id: Option<UserId>,
    ) -> Result<Vec<OrderWithItems>, RepositoryError> {
        let state = self.state.lock().await;
        // Reverse first so equal timestamps still come out newest first.
        let mut orders: Vec<_> = state
            .orders
            .iter()
            .rev()
            .filter(|o| user_id.is_none_or(|id| o.user_id == id))
            .map(|o| state.order_with_items(o))
            .collect();
        orders.sort_by(|a, b| b.order.created_at.cmp(&a.order.created_at));
        Ok(orders)
    }

    async fn transition_order_status(&self, change: StatusChange) -> Result<Order, RepositoryError> {
        let mut state = self.state.lock().await;
        let mut scratch = state.clone();

        let order = scratch
            .orders
            .iter_mut()
            .find(|o| o.id == change.order_id)
            .ok_or(RepositoryError::NotFound)?;
        if order.status != change.from {
            return Err(RepositoryError::Conflict(format!(
                "order status changed to {} concurrently",
                order.status
            )));
        }
        order.status = change.to;
        order.updated_at = Utc::now();
        let updated = order.clone();

        if change.restock {
            let returned: Vec<_> = scratch
                .order_items
                .iter()
                .filter(|i| i.order_id == change.order_id)
                .map(|i| (i.variant_id, i.stock_taken))
                .collect();
            for (variant_id, quantity) in returned {
                if let Some(variant) = scratch.variant_mut(variant_id) {
                    variant.stock = variant.stock.saturating_add(quantity);
                    variant.updated_at = Utc::now();
                }
            }
        }

        *state = scratch;
        Ok(updated)
    }
}

impl CommerceStore for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}
