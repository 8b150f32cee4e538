//! Order assembly, checkout and the order lifecycle.

use serde::Deserialize;
use tracing::instrument;

use atelier_core::{Email, Money, OrderId, OrderStatus, UserId};

use super::CommerceError;
use crate::db::{CartStore, CatalogStore, OrderStore};
use crate::models::{
    CartLine, CurrentUser, NewOrder, NewOrderLine, Order, OrderPlacement, OrderWithItems,
    ShippingDetails, StatusChange, StockPolicy,
};

/// Minimum length of a shipping address, after trimming.
pub const MIN_SHIPPING_ADDRESS_LEN: usize = 10;

/// Longest accepted customer name.
pub const MAX_CUSTOMER_NAME_LEN: usize = 200;

/// Longest accepted idempotency key.
pub const MAX_IDEMPOTENCY_KEY_LEN: usize = 255;

/// Customer details submitted at checkout, before validation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutDetails {
    pub customer_name: String,
    pub customer_email: String,
    pub shipping_address: String,
}

impl CheckoutDetails {
    /// Validate and normalize into [`ShippingDetails`].
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::InvalidCheckout` naming the first bad field.
    pub fn validate(&self) -> Result<ShippingDetails, CommerceError> {
        let customer_name = self.customer_name.trim();
        if customer_name.is_empty() {
            return Err(CommerceError::InvalidCheckout(
                "customer name is required".to_owned(),
            ));
        }
        if customer_name.chars().count() > MAX_CUSTOMER_NAME_LEN {
            return Err(CommerceError::InvalidCheckout(format!(
                "customer name must be at most {MAX_CUSTOMER_NAME_LEN} characters"
            )));
        }

        let customer_email = Email::parse(&self.customer_email)
            .map_err(|e| CommerceError::InvalidCheckout(e.to_string()))?;

        let shipping_address = self.shipping_address.trim();
        if shipping_address.chars().count() < MIN_SHIPPING_ADDRESS_LEN {
            return Err(CommerceError::InvalidCheckout(format!(
                "shipping address must be at least {MIN_SHIPPING_ADDRESS_LEN} characters"
            )));
        }

        Ok(ShippingDetails {
            customer_name: customer_name.to_owned(),
            customer_email,
            shipping_address: shipping_address.to_owned(),
        })
    }
}

fn validate_idempotency_key(key: Option<&str>) -> Result<Option<String>, CommerceError> {
    let Some(key) = key.map(str::trim) else {
        return Ok(None);
    };
    if key.is_empty() || key.len() > MAX_IDEMPOTENCY_KEY_LEN {
        return Err(CommerceError::InvalidCheckout(format!(
            "idempotency key must be 1 to {MAX_IDEMPOTENCY_KEY_LEN} characters"
        )));
    }
    Ok(Some(key.to_owned()))
}

/// Snapshot cart lines into order lines priced at the product base price.
fn snapshot_lines(
    lines: &[CartLine],
    policy: StockPolicy,
) -> Result<(Vec<NewOrderLine>, Money), CommerceError> {
    let mut order_lines = Vec::with_capacity(lines.len());
    let mut line_totals = Vec::with_capacity(lines.len());

    for line in lines {
        if !line.variant.can_fulfil(line.item.quantity, policy) {
            return Err(CommerceError::InsufficientStock(line.variant.id));
        }
        line_totals.push(line.line_total()?);
        order_lines.push(NewOrderLine {
            cart_item_id: line.item.id,
            product_id: line.product.id,
            variant_id: line.variant.id,
            quantity: line.item.quantity,
            unit_price: line.product.price,
            product_name: line.product.name.clone(),
            size: line.variant.size.clone(),
            color: line.variant.color.clone(),
        });
    }

    Ok((order_lines, Money::try_sum(line_totals)?))
}

/// Order service.
pub struct OrderService<'a, S> {
    store: &'a S,
    policy: StockPolicy,
}

impl<'a, S: CatalogStore + CartStore + OrderStore> OrderService<'a, S> {
    /// Create a new order service.
    #[must_use]
    pub const fn new(store: &'a S, policy: StockPolicy) -> Self {
        Self { store, policy }
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    /// Turn the user's cart into an order.
    ///
    /// With an idempotency key that already produced an order, that order is
    /// returned as [`OrderPlacement::Replayed`] and nothing changes.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::InvalidCheckout` for bad details,
    /// `CommerceError::EmptyCart` for an empty cart,
    /// `CommerceError::InsufficientStock` if a line cannot be fulfilled and
    /// `CommerceError::Conflict` if the cart changed during checkout.
    #[instrument(skip(self, details))]
    pub async fn place_order(
        &self,
        user_id: UserId,
        details: &CheckoutDetails,
        idempotency_key: Option<&str>,
    ) -> Result<OrderPlacement, CommerceError> {
        let shipping = details.validate()?;
        let idempotency_key = validate_idempotency_key(idempotency_key)?;

        if let Some(key) = idempotency_key.as_deref()
            && let Some(existing) = self
                .store
                .find_order_by_idempotency_key(user_id, key)
                .await?
        {
            tracing::info!(order_id = %existing.id, "Replaying checkout");
            return Ok(OrderPlacement::Replayed(existing));
        }

        let cart = self.store.list_cart(user_id).await?;
        if cart.is_empty() {
            return Err(CommerceError::EmptyCart);
        }

        let (lines, total) = snapshot_lines(&cart, self.policy)?;
        let new_order = NewOrder {
            id: OrderId::generate(),
            user_id,
            shipping,
            total,
            idempotency_key,
            lines,
            policy: self.policy,
        };

        let placement = self.store.place_order(&new_order).await?;
        if placement.is_created() {
            tracing::info!(
                order_id = %placement.order().id,
                total = %placement.order().total,
                lines = new_order.lines.len(),
                "Order placed"
            );
        }
        Ok(placement)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Move an order to `status`.
    ///
    /// Setting the current status again is a no-op. Cancelling returns the
    /// order's quantities to stock.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::InvalidStatus` for an unknown status,
    /// `CommerceError::NotFound` for an unknown order,
    /// `CommerceError::IllegalTransition` if the lifecycle forbids the move
    /// and `CommerceError::Conflict` if the order changed concurrently.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        order_id: OrderId,
        status: &str,
    ) -> Result<Order, CommerceError> {
        let to: OrderStatus = status.parse()?;
        let current = self
            .store
            .get_order(order_id)
            .await?
            .ok_or(CommerceError::NotFound("order"))?
            .order;

        if current.status == to {
            return Ok(current);
        }
        if !current.status.can_transition_to(to) {
            return Err(CommerceError::IllegalTransition {
                from: current.status,
                to,
            });
        }

        let updated = self
            .store
            .transition_order_status(StatusChange {
                order_id,
                from: current.status,
                to,
                restock: to == OrderStatus::Cancelled,
            })
            .await
            .map_err(|e| match CommerceError::from(e) {
                CommerceError::NotFound(_) => CommerceError::NotFound("order"),
                other => other,
            })?;

        tracing::info!(from = %current.status, to = %updated.status, "Order status changed");
        Ok(updated)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Orders visible to `viewer`, newest first. Admins see every order.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::Storage` if the query fails.
    pub async fn list_orders(
        &self,
        viewer: &CurrentUser,
    ) -> Result<Vec<OrderWithItems>, CommerceError> {
        let scope = (!viewer.is_admin()).then_some(viewer.id);
        Ok(self.store.list_orders(scope).await?)
    }

    /// One order with its lines.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::NotFound` for an unknown order and
    /// `CommerceError::Forbidden` if `viewer` neither owns it nor is an admin.
    pub async fn get_order(
        &self,
        viewer: &CurrentUser,
        order_id: OrderId,
    ) -> Result<OrderWithItems, CommerceError> {
        let order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or(CommerceError::NotFound("order"))?;

        if order.order.user_id != viewer.id && !viewer.is_admin() {
            return Err(CommerceError::Forbidden);
        }
        Ok(order)
    }
}
