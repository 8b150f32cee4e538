//! Catalog queries.

use chrono::{DateTime, Utc};

use atelier_core::{HexColor, Money, ProductId, VariantId};

use super::PgStore;
use crate::db::{CatalogStore, RepositoryError, map_unique_violation};
use crate::models::{
    NewProduct, NewVariant, Product, ProductPatch, ProductVariant, ProductWithVariants,
    VariantPatch,
};

#[derive(Debug, sqlx::FromRow)]
pub(super) struct ProductRow {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Money,
    pub image_src: Option<String>,
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            price: row.price,
            image_src: row.image_src,
            images: row.images,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct VariantRow {
    pub id: VariantId,
    pub product_id: ProductId,
    pub size: String,
    pub color: String,
    pub color_hex: String,
    pub stock: i32,
    pub sku: Option<String>,
    pub price: Option<Money>,
    pub cost_price: Option<Money>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<VariantRow> for ProductVariant {
    type Error = RepositoryError;

    fn try_from(row: VariantRow) -> Result<Self, Self::Error> {
        let color_hex = HexColor::parse(&row.color_hex).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid color in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            product_id: row.product_id,
            size: row.size,
            color: row.color,
            color_hex,
            stock: row.stock,
            sku: row.sku,
            price: row.price,
            cost_price: row.cost_price,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_variants(rows: Vec<VariantRow>) -> Result<Vec<ProductVariant>, RepositoryError> {
    rows.into_iter().map(ProductVariant::try_from).collect()
}

impl CatalogStore for PgStore {
    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, name, description, price, image_src, images, created_at, updated_at
            FROM shop.product
            ORDER BY created_at DESC, seq DESC
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn list_products_with_variants(
        &self,
    ) -> Result<Vec<ProductWithVariants>, RepositoryError> {
        let products = self.list_products().await?;
        let variants = into_variants(
            sqlx::query_as::<_, VariantRow>(
                r"
                SELECT id, product_id, size, color, color_hex, stock, sku, price, cost_price,
                       created_at, updated_at
                FROM shop.product_variant
                ORDER BY seq
                ",
            )
            .fetch_all(&self.pool)
            .await?,
        )?;

        Ok(products
            .into_iter()
            .map(|product| {
                let variants = variants
                    .iter()
                    .filter(|v| v.product_id == product.id)
                    .cloned()
                    .collect();
                ProductWithVariants { product, variants }
            })
            .collect())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, name, description, price, image_src, images, created_at, updated_at
            FROM shop.product
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    async fn create_product(&self, input: &NewProduct) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            INSERT INTO shop.product (id, name, description, price, image_src, images)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, name, description, price, image_src, images, created_at, updated_at
            ",
        )
        .bind(ProductId::generate())
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.price)
        .bind(input.image_src.as_deref())
        .bind(&input.images)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn update_product(
        &self,
        id: ProductId,
        patch: &ProductPatch,
    ) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            UPDATE shop.product
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                price = COALESCE($4, price),
                image_src = COALESCE($5, image_src),
                images = COALESCE($6, images),
                updated_at = now()
            WHERE id = $1
            RETURNING id, name, description, price, image_src, images, created_at, updated_at
            ",
        )
        .bind(id)
        .bind(patch.name.as_deref())
        .bind(patch.description.as_deref())
        .bind(patch.price)
        .bind(patch.image_src.as_deref())
        .bind(patch.images.as_deref())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.product WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_variants(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<ProductVariant>, RepositoryError> {
        let rows = sqlx::query_as::<_, VariantRow>(
            r"
            SELECT id, product_id, size, color, color_hex, stock, sku, price, cost_price,
                   created_at, updated_at
            FROM shop.product_variant
            WHERE product_id = $1
            ORDER BY seq
            ",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        into_variants(rows)
    }

    async fn get_variant(&self, id: VariantId) -> Result<Option<ProductVariant>, RepositoryError> {
        sqlx::query_as::<_, VariantRow>(
            r"
            SELECT id, product_id, size, color, color_hex, stock, sku, price, cost_price,
                   created_at, updated_at
            FROM shop.product_variant
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(ProductVariant::try_from)
        .transpose()
    }

    async fn find_variant(
        &self,
        product_id: ProductId,
        size: &str,
        color: &str,
    ) -> Result<Option<ProductVariant>, RepositoryError> {
        sqlx::query_as::<_, VariantRow>(
            r"
            SELECT id, product_id, size, color, color_hex, stock, sku, price, cost_price,
                   created_at, updated_at
            FROM shop.product_variant
            WHERE product_id = $1 AND size = $2 AND color = $3
            ORDER BY seq
            LIMIT 1
            ",
        )
        .bind(product_id)
        .bind(size)
        .bind(color)
        .fetch_optional(&self.pool)
        .await?
        .map(ProductVariant::try_from)
        .transpose()
    }

    async fn create_variant(
        &self,
        product_id: ProductId,
        input: &NewVariant,
    ) -> Result<ProductVariant, RepositoryError> {
        let row = sqlx::query_as::<_, VariantRow>(
            r"
            INSERT INTO shop.product_variant
                (id, product_id, size, color, color_hex, stock, sku, price, cost_price)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, product_id, size, color, color_hex, stock, sku, price, cost_price,
                      created_at, updated_at
            ",
        )
        .bind(VariantId::generate())
        .bind(product_id)
        .bind(&input.size)
        .bind(&input.color)
        .bind(input.color_hex.as_str())
        .bind(input.stock)
        .bind(input.sku.as_deref())
        .bind(input.price)
        .bind(input.cost_price)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return RepositoryError::NotFound;
            }
            map_unique_violation(e, "variant")
        })?;

        row.try_into()
    }

    async fn update_variant(
        &self,
        id: VariantId,
        patch: &VariantPatch,
    ) -> Result<Option<ProductVariant>, RepositoryError> {
        sqlx::query_as::<_, VariantRow>(
            r"
            UPDATE shop.product_variant
            SET size = COALESCE($2, size),
                color = COALESCE($3, color),
                color_hex = COALESCE($4, color_hex),
                stock = COALESCE($5, stock),
                sku = COALESCE($6, sku),
                price = COALESCE($7, price),
                cost_price = COALESCE($8, cost_price),
                updated_at = now()
            WHERE id = $1
            RETURNING id, product_id, size, color, color_hex, stock, sku, price, cost_price,
                      created_at, updated_at
            ",
        )
        .bind(id)
        .bind(patch.size.as_deref())
        .bind(patch.color.as_deref())
        .bind(patch.color_hex.as_ref().map(HexColor::as_str))
        .bind(patch.stock)
        .bind(patch.sku.as_deref())
        .bind(patch.price)
        .bind(patch.cost_price)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "variant"))?
        .map(ProductVariant::try_from)
        .transpose()
    }

    async fn delete_variant(&self, id: VariantId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.product_variant WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
