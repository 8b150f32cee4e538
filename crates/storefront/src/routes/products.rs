//! Catalog route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use atelier_core::ProductId;

use crate::db::CommerceStore;
use crate::error::Result;
use crate::models::{Product, ProductVariant};
use crate::state::AppState;

/// Size and color selection for a variant lookup.
#[derive(Debug, Deserialize)]
pub struct VariantSelection {
    pub size: String,
    pub color: String,
}

/// Variant lookup result.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantLookupResponse {
    pub variant: ProductVariant,
    /// Whether the variant can be added to a cart right now.
    pub purchasable: bool,
}

/// Product listing, newest first.
///
/// GET /api/products
pub async fn index<S: CommerceStore>(
    State(state): State<AppState<S>>,
) -> Result<Json<Vec<Product>>> {
    let products = state.catalog().list_products().await?;
    Ok(Json(products.as_ref().clone()))
}

/// Product detail.
///
/// GET /api/products/{id}
pub async fn show<S: CommerceStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>> {
    let product = state.catalog().get_product(id).await?;
    Ok(Json(product.as_ref().clone()))
}

/// All variants of a product.
///
/// GET /api/products/{id}/variants
pub async fn variants<S: CommerceStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<ProductId>,
) -> Result<Json<Vec<ProductVariant>>> {
    Ok(Json(state.inventory().list_variants(id).await?))
}

/// Resolve a size/color selection to a variant.
///
/// GET /api/products/{id}/variants/lookup?size=M&color=Black
#[instrument(skip(state))]
pub async fn lookup<S: CommerceStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<ProductId>,
    Query(selection): Query<VariantSelection>,
) -> Result<Json<VariantLookupResponse>> {
    let inventory = state.inventory();
    let variant = inventory
        .find_variant(id, &selection.size, &selection.color)
        .await?;
    let purchasable = variant.is_purchasable(inventory.policy());

    Ok(Json(VariantLookupResponse {
        variant,
        purchasable,
    }))
}

/// The first variant that can be bought.
///
/// GET /api/products/{id}/variants/first-available
pub async fn first_available<S: CommerceStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<ProductId>,
) -> Result<Json<ProductVariant>> {
    Ok(Json(state.inventory().first_available_variant(id).await?))
}
