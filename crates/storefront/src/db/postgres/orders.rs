//! Order queries and the checkout transaction.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use atelier_core::{
    CartItemId, Email, Money, OrderId, OrderItemId, OrderStatus, ProductId, Quantity, UserId,
    VariantId,
};

use super::PgStore;
use crate::db::{OrderStore, RepositoryError};
use crate::models::{
    NewOrder, Order, OrderItem, OrderPlacement, OrderWithItems, StatusChange, StockPolicy,
};

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: UserId,
    customer_name: String,
    customer_email: String,
    shipping_address: String,
    total: Money,
    status: OrderStatus,
    idempotency_key: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let customer_email = Email::parse(&row.customer_email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            customer_name: row.customer_name,
            customer_email,
            shipping_address: row.shipping_address,
            total: row.total,
            status: row.status,
            idempotency_key: row.idempotency_key,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    id: OrderItemId,
    order_id: OrderId,
    product_id: ProductId,
    variant_id: VariantId,
    quantity: i32,
    price: Money,
    product_name: String,
    size: String,
    color: String,
    stock_taken: i32,
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = RepositoryError;

    fn try_from(row: OrderItemRow) -> Result<Self, Self::Error> {
        let quantity = Quantity::try_from(row.quantity).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid quantity in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            variant_id: row.variant_id,
            quantity,
            price: row.price,
            product_name: row.product_name,
            size: row.size,
            color: row.color,
            stock_taken: row.stock_taken,
        })
    }
}

const ORDER_COLUMNS: &str = "id, user_id, customer_name, customer_email, shipping_address, \
     total, status, idempotency_key, created_at, updated_at";

impl PgStore {
    /// Attach items to orders, preserving the order of `orders`.
    async fn with_items(&self, orders: Vec<Order>) -> Result<Vec<OrderWithItems>, RepositoryError> {
        let ids: Vec<Uuid> = orders.iter().map(|o| o.id.as_uuid()).collect();
        let rows = sqlx::query_as::<_, OrderItemRow>(
            r"
            SELECT id, order_id, product_id, variant_id, quantity, price,
                   product_name, size, color, stock_taken
            FROM shop.order_item
            WHERE order_id = ANY($1)
            ORDER BY order_id, position
            ",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_order: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for row in rows {
            let item = OrderItem::try_from(row)?;
            by_order.entry(item.order_id).or_default().push(item);
        }

        Ok(orders
            .into_iter()
            .map(|order| {
                let items = by_order.remove(&order.id).unwrap_or_default();
                OrderWithItems { order, items }
            })
            .collect())
    }
}

/// Lock the user's cart rows and check they match the checkout snapshot.
async fn verify_cart_snapshot(
    tx: &mut Transaction<'_, Postgres>,
    order: &NewOrder,
) -> Result<(), RepositoryError> {
    let locked: Vec<(CartItemId, i32)> = sqlx::query_as(
        r"
        SELECT id, quantity
        FROM shop.cart_item
        WHERE user_id = $1
        ORDER BY seq
        FOR UPDATE
        ",
    )
    .bind(order.user_id)
    .fetch_all(&mut **tx)
    .await?;

    let matches = locked.len() == order.lines.len()
        && order.lines.iter().all(|line| {
            locked
                .iter()
                .any(|(id, qty)| *id == line.cart_item_id && *qty == line.quantity.get())
        });

    if matches {
        Ok(())
    } else {
        Err(RepositoryError::Conflict(
            "cart changed during checkout".to_owned(),
        ))
    }
}

/// Take stock for every line, in variant-id order so concurrent checkouts
/// lock rows in the same sequence.
///
/// Returns the units taken per line, indexed like `order.lines`.
async fn take_stock(
    tx: &mut Transaction<'_, Postgres>,
    order: &NewOrder,
) -> Result<Vec<i32>, RepositoryError> {
    let mut lines: Vec<_> = order.lines.iter().enumerate().collect();
    lines.sort_by_key(|(_, line)| line.variant_id.as_uuid());

    // Both statements return the units taken. The backorder form reads the
    // locked pre-update stock so a clamp at zero is reported as a partial take.
    let sql = match order.policy {
        StockPolicy::Strict => {
            r"
            UPDATE shop.product_variant
            SET stock = stock - $2, updated_at = now()
            WHERE id = $1 AND stock >= $2
            RETURNING $2::integer
            "
        }
        StockPolicy::AllowBackorder => {
            r"
            UPDATE shop.product_variant v
            SET stock = GREATEST(v.stock - $2, 0), updated_at = now()
            FROM (
                SELECT id, stock FROM shop.product_variant WHERE id = $1 FOR UPDATE
            ) AS prev
            WHERE v.id = prev.id
            RETURNING prev.stock - v.stock
            "
        }
    };

    let mut taken = vec![0; order.lines.len()];
    for (index, line) in lines {
        let took: Option<i32> = sqlx::query_scalar(sql)
            .bind(line.variant_id)
            .bind(line.quantity.get())
            .fetch_optional(&mut **tx)
            .await?;

        let Some(took) = took else {
            return Err(match order.policy {
                StockPolicy::Strict => RepositoryError::InsufficientStock(line.variant_id),
                StockPolicy::AllowBackorder => {
                    RepositoryError::Conflict(format!("variant {} no longer exists", line.variant_id))
                }
            });
        };
        if let Some(slot) = taken.get_mut(index) {
            *slot = took;
        }
    }

    Ok(taken)
}

/// Delete the cart lines that were checked out. Lines added by a concurrent
/// request after the snapshot was locked stay in the cart.
async fn clear_checked_out_lines(
    tx: &mut Transaction<'_, Postgres>,
    order: &NewOrder,
) -> Result<u64, RepositoryError> {
    let ids: Vec<Uuid> = order
        .lines
        .iter()
        .map(|line| line.cart_item_id.as_uuid())
        .collect();

    let result = sqlx::query("DELETE FROM shop.cart_item WHERE user_id = $1 AND id = ANY($2)")
        .bind(order.user_id)
        .bind(&ids)
        .execute(&mut **tx)
        .await?;

    Ok(result.rows_affected())
}

impl OrderStore for PgStore {
    async fn place_order(&self, order: &NewOrder) -> Result<OrderPlacement, RepositoryError> {
        if let Some(key) = order.idempotency_key.as_deref()
            && let Some(existing) = self.find_order_by_idempotency_key(order.user_id, key).await?
        {
            return Ok(OrderPlacement::Replayed(existing));
        }

        let mut tx = self.pool.begin().await?;

        verify_cart_snapshot(&mut tx, order).await?;
        let taken = take_stock(&mut tx, order).await?;

        let inserted = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            INSERT INTO shop.orders
                (id, user_id, customer_name, customer_email, shipping_address, total,
                 status, idempotency_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(order.id)
        .bind(order.user_id)
        .bind(&order.shipping.customer_name)
        .bind(order.shipping.customer_email.as_str())
        .bind(&order.shipping.shipping_address)
        .bind(order.total)
        .bind(OrderStatus::Pending)
        .bind(order.idempotency_key.as_deref())
        .fetch_one(&mut *tx)
        .await;

        let row = match inserted {
            Ok(row) => row,
            Err(sqlx::Error::Database(ref db_err)) if db_err.is_unique_violation() => {
                // A concurrent request with the same key won the race.
                tx.rollback().await?;
                let key = order.idempotency_key.as_deref().unwrap_or_default();
                return self
                    .find_order_by_idempotency_key(order.user_id, key)
                    .await?
                    .map(OrderPlacement::Replayed)
                    .ok_or_else(|| RepositoryError::Conflict("order already exists".to_owned()));
            }
            Err(e) => return Err(e.into()),
        };

        for ((position, line), stock_taken) in (0_i32..).zip(&order.lines).zip(taken) {
            sqlx::query(
                r"
                INSERT INTO shop.order_item
                    (id, order_id, product_id, variant_id, quantity, price,
                     product_name, size, color, position, stock_taken)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                ",
            )
            .bind(OrderItemId::generate())
            .bind(order.id)
            .bind(line.product_id)
            .bind(line.variant_id)
            .bind(line.quantity.get())
            .bind(line.unit_price)
            .bind(&line.product_name)
            .bind(&line.size)
            .bind(&line.color)
            .bind(position)
            .bind(stock_taken)
            .execute(&mut *tx)
            .await?;
        }

        clear_checked_out_lines(&mut tx, order).await?;

        tx.commit().await?;

        Ok(OrderPlacement::Created(row.try_into()?))
    }

    async fn find_order_by_idempotency_key(
        &self,
        user_id: UserId,
        key: &str,
    ) -> Result<Option<Order>, RepositoryError> {
        sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM shop.orders WHERE user_id = $1 AND idempotency_key = $2"
        ))
        .bind(user_id)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?
        .map(Order::try_from)
        .transpose()
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<OrderWithItems>, RepositoryError> {
        let Some(row) = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM shop.orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let mut orders = self.with_items(vec![row.try_into()?]).await?;
        Ok(orders.pop())
    }

    async fn list_orders(
        &self,
        user_id: Option<UserId>,
    ) -> Result<Vec<OrderWithItems>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            SELECT {ORDER_COLUMNS}
            FROM shop.orders
            WHERE $1::uuid IS NULL OR user_id = $1
            ORDER BY created_at DESC, seq DESC
            "
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let orders = rows
            .into_iter()
            .map(Order::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        self.with_items(orders).await
    }

    async fn transition_order_status(&self, change: StatusChange) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            UPDATE shop.orders
            SET status = $3, updated_at = now()
            WHERE id = $1 AND status = $2
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(change.order_id)
        .bind(change.from)
        .bind(change.to)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = updated else {
            let exists: Option<(OrderStatus,)> =
                sqlx::query_as("SELECT status FROM shop.orders WHERE id = $1")
                    .bind(change.order_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            return Err(match exists {
                None => RepositoryError::NotFound,
                Some((current,)) => RepositoryError::Conflict(format!(
                    "order status changed to {current} concurrently"
                )),
            });
        };

        if change.restock {
            sqlx::query(
                r"
                UPDATE shop.product_variant v
                SET stock = v.stock + i.stock_taken, updated_at = now()
                FROM shop.order_item i
                WHERE i.order_id = $1 AND v.id = i.variant_id
                ",
            )
            .bind(change.order_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        row.try_into()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use atelier_core::HexColor;

    use super::*;
    use crate::db::{CartStore, CatalogStore};
    use crate::models::{NewOrderLine, NewProduct, NewVariant, ShippingDetails};

    async fn test_store() -> PgStore {
        let url = std::env::var("STOREFRONT_TEST_DATABASE_URL")
            .unwrap_or_else(|_| panic!("STOREFRONT_TEST_DATABASE_URL must be set"));
        let pool = sqlx::PgPool::connect(&url).await.unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        PgStore::new(pool)
    }

    fn variant(size: &str) -> NewVariant {
        NewVariant {
            size: size.to_owned(),
            color: "Black".to_owned(),
            color_hex: HexColor::parse("#000000").unwrap(),
            stock: 10,
            sku: None,
            price: None,
            cost_price: None,
        }
    }

    #[tokio::test]
    #[ignore = "Requires PostgreSQL (STOREFRONT_TEST_DATABASE_URL)"]
    async fn test_checkout_keeps_lines_added_after_snapshot() {
        let store = test_store().await;
        let product = store
            .create_product(&NewProduct {
                name: "Wool Coat".to_owned(),
                description: String::new(),
                price: Money::parse("295.00").unwrap(),
                image_src: None,
                images: vec![],
            })
            .await
            .unwrap();
        let medium = store.create_variant(product.id, &variant("M")).await.unwrap();
        let large = store.create_variant(product.id, &variant("L")).await.unwrap();
        let user = UserId::generate();
        let item = store
            .merge_cart_item(user, product.id, medium.id, Quantity::ONE)
            .await
            .unwrap();

        let order = NewOrder {
            id: OrderId::generate(),
            user_id: user,
            shipping: ShippingDetails {
                customer_name: "Ada Lovelace".to_owned(),
                customer_email: Email::parse("ada@example.com").unwrap(),
                shipping_address: "12 Analytical Row, London".to_owned(),
            },
            total: product.price,
            idempotency_key: None,
            lines: vec![NewOrderLine {
                cart_item_id: item.id,
                product_id: product.id,
                variant_id: medium.id,
                quantity: Quantity::ONE,
                unit_price: product.price,
                product_name: product.name.clone(),
                size: medium.size.clone(),
                color: medium.color.clone(),
            }],
            policy: StockPolicy::Strict,
        };

        let mut tx = store.pool.begin().await.unwrap();
        verify_cart_snapshot(&mut tx, &order).await.unwrap();

        // Committed on another connection while the checkout holds its locks.
        let added = store
            .merge_cart_item(user, product.id, large.id, Quantity::ONE)
            .await
            .unwrap();

        assert_eq!(clear_checked_out_lines(&mut tx, &order).await.unwrap(), 1);
        tx.commit().await.unwrap();

        let remaining = store.list_cart(user).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].item.id, added.id);
    }
}
