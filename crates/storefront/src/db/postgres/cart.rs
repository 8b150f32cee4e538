//! Cart ledger queries.

use chrono::{DateTime, Utc};

use atelier_core::{CartItemId, HexColor, Money, ProductId, Quantity, UserId, VariantId};

use super::PgStore;
use crate::db::{CartStore, RepositoryError};
use crate::models::{CartItem, CartLine, Product, ProductVariant};

fn quantity_from_db(value: i32) -> Result<Quantity, RepositoryError> {
    Quantity::try_from(value)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid quantity in database: {e}")))
}

/// SQLSTATE `numeric_value_out_of_range`.
const NUMERIC_OUT_OF_RANGE: &str = "22003";

/// Map a failed cart merge: an unknown product/variant pair is `NotFound`
/// and a merged quantity past `INTEGER` is `Conflict`.
fn merge_error(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e {
        if db_err.is_foreign_key_violation() {
            return RepositoryError::NotFound;
        }
        if db_err.code().as_deref() == Some(NUMERIC_OUT_OF_RANGE) {
            return RepositoryError::Conflict(format!(
                "merged quantity out of range: {}",
                db_err.message()
            ));
        }
    }
    RepositoryError::Database(e)
}

#[derive(Debug, sqlx::FromRow)]
struct CartItemRow {
    id: CartItemId,
    user_id: UserId,
    product_id: ProductId,
    variant_id: VariantId,
    quantity: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CartItemRow> for CartItem {
    type Error = RepositoryError;

    fn try_from(row: CartItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            product_id: row.product_id,
            variant_id: row.variant_id,
            quantity: quantity_from_db(row.quantity)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// A cart line joined with its product and variant.
#[derive(Debug, sqlx::FromRow)]
struct CartLineRow {
    id: CartItemId,
    user_id: UserId,
    product_id: ProductId,
    variant_id: VariantId,
    quantity: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    product_name: String,
    product_description: String,
    product_price: Money,
    product_image_src: Option<String>,
    product_images: Vec<String>,
    product_created_at: DateTime<Utc>,
    product_updated_at: DateTime<Utc>,
    variant_size: String,
    variant_color: String,
    variant_color_hex: String,
    variant_stock: i32,
    variant_sku: Option<String>,
    variant_price: Option<Money>,
    variant_cost_price: Option<Money>,
    variant_created_at: DateTime<Utc>,
    variant_updated_at: DateTime<Utc>,
}

impl TryFrom<CartLineRow> for CartLine {
    type Error = RepositoryError;

    fn try_from(row: CartLineRow) -> Result<Self, Self::Error> {
        let color_hex = HexColor::parse(&row.variant_color_hex).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid color in database: {e}"))
        })?;

        Ok(Self {
            item: CartItem {
                id: row.id,
                user_id: row.user_id,
                product_id: row.product_id,
                variant_id: row.variant_id,
                quantity: quantity_from_db(row.quantity)?,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            product: Product {
                id: row.product_id,
                name: row.product_name,
                description: row.product_description,
                price: row.product_price,
                image_src: row.product_image_src,
                images: row.product_images,
                created_at: row.product_created_at,
                updated_at: row.product_updated_at,
            },
            variant: ProductVariant {
                id: row.variant_id,
                product_id: row.product_id,
                size: row.variant_size,
                color: row.variant_color,
                color_hex,
                stock: row.variant_stock,
                sku: row.variant_sku,
                price: row.variant_price,
                cost_price: row.variant_cost_price,
                created_at: row.variant_created_at,
                updated_at: row.variant_updated_at,
            },
        })
    }
}

impl CartStore for PgStore {
    async fn list_cart(&self, user_id: UserId) -> Result<Vec<CartLine>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartLineRow>(
            r"
            SELECT c.id, c.user_id, c.product_id, c.variant_id, c.quantity,
                   c.created_at, c.updated_at,
                   p.name AS product_name,
                   p.description AS product_description,
                   p.price AS product_price,
                   p.image_src AS product_image_src,
                   p.images AS product_images,
                   p.created_at AS product_created_at,
                   p.updated_at AS product_updated_at,
                   v.size AS variant_size,
                   v.color AS variant_color,
                   v.color_hex AS variant_color_hex,
                   v.stock AS variant_stock,
                   v.sku AS variant_sku,
                   v.price AS variant_price,
                   v.cost_price AS variant_cost_price,
                   v.created_at AS variant_created_at,
                   v.updated_at AS variant_updated_at
            FROM shop.cart_item c
            JOIN shop.product p ON p.id = c.product_id
            JOIN shop.product_variant v ON v.id = c.variant_id
            WHERE c.user_id = $1
            ORDER BY c.seq
            ",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(CartLine::try_from).collect()
    }

    async fn merge_cart_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        variant_id: VariantId,
        quantity: Quantity,
    ) -> Result<CartItem, RepositoryError> {
        let row = sqlx::query_as::<_, CartItemRow>(
            r"
            INSERT INTO shop.cart_item (id, user_id, product_id, variant_id, quantity)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id, product_id, variant_id)
            DO UPDATE SET quantity = shop.cart_item.quantity + EXCLUDED.quantity,
                          updated_at = now()
            RETURNING id, user_id, product_id, variant_id, quantity, created_at, updated_at
            ",
        )
        .bind(CartItemId::generate())
        .bind(user_id)
        .bind(product_id)
        .bind(variant_id)
        .bind(quantity.get())
        .fetch_one(&self.pool)
        .await
        .map_err(merge_error)?;

        row.try_into()
    }

    async fn set_cart_item_quantity(
        &self,
        user_id: UserId,
        id: CartItemId,
        quantity: Quantity,
    ) -> Result<Option<CartItem>, RepositoryError> {
        sqlx::query_as::<_, CartItemRow>(
            r"
            UPDATE shop.cart_item
            SET quantity = $3, updated_at = now()
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, product_id, variant_id, quantity, created_at, updated_at
            ",
        )
        .bind(id)
        .bind(user_id)
        .bind(quantity.get())
        .fetch_optional(&self.pool)
        .await?
        .map(CartItem::try_from)
        .transpose()
    }

    async fn delete_cart_item(
        &self,
        user_id: UserId,
        id: CartItemId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.cart_item WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn clear_cart(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.cart_item WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;
    use std::error::Error as StdError;
    use std::fmt;

    use sqlx::error::{DatabaseError, ErrorKind};

    use super::*;

    #[derive(Debug)]
    struct PgError {
        code: &'static str,
        kind: ErrorKind,
    }

    impl fmt::Display for PgError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "error {}", self.code)
        }
    }

    impl StdError for PgError {}

    impl DatabaseError for PgError {
        fn message(&self) -> &str {
            "integer out of range"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed(self.code))
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            // `ErrorKind` is neither `Clone` nor `Copy`; rebuild it by variant.
            match self.kind {
                ErrorKind::UniqueViolation => ErrorKind::UniqueViolation,
                ErrorKind::ForeignKeyViolation => ErrorKind::ForeignKeyViolation,
                ErrorKind::NotNullViolation => ErrorKind::NotNullViolation,
                ErrorKind::CheckViolation => ErrorKind::CheckViolation,
                _ => ErrorKind::Other,
            }
        }
    }

    fn db_error(code: &'static str, kind: ErrorKind) -> sqlx::Error {
        sqlx::Error::Database(Box::new(PgError { code, kind }))
    }

    #[test]
    fn test_merge_overflow_is_conflict() {
        let err = merge_error(db_error(NUMERIC_OUT_OF_RANGE, ErrorKind::Other));
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[test]
    fn test_merge_foreign_key_violation_is_not_found() {
        let err = merge_error(db_error("23503", ErrorKind::ForeignKeyViolation));
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[test]
    fn test_other_merge_errors_stay_database_errors() {
        assert!(matches!(
            merge_error(db_error("40001", ErrorKind::Other)),
            RepositoryError::Database(_)
        ));
        assert!(matches!(
            merge_error(sqlx::Error::RowNotFound),
            RepositoryError::Database(_)
        ));
    }
}
