//! Cart route handlers.
//!
//! All handlers act on the calling user's cart only.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::Deserialize;

use atelier_core::{CartItemId, ProductId, VariantId};

use crate::db::CommerceStore;
use crate::error::Result;
use crate::middleware::RequireUser;
use crate::models::{CartItem, CartSummary};
use crate::state::AppState;

const fn default_quantity() -> i64 {
    1
}

/// Add-to-cart request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

/// Quick-add request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickAddRequest {
    pub product_id: ProductId,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

/// Quantity update request body.
#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: i64,
}

/// The caller's cart with totals.
///
/// GET /api/cart
pub async fn show<S: CommerceStore>(
    State(state): State<AppState<S>>,
    RequireUser(user): RequireUser,
) -> Result<Json<CartSummary>> {
    Ok(Json(state.cart().summary(user.id).await?))
}

/// Add a variant to the cart, merging with an existing line.
///
/// POST /api/cart
pub async fn add<S: CommerceStore>(
    State(state): State<AppState<S>>,
    RequireUser(user): RequireUser,
    body: std::result::Result<Json<AddToCartRequest>, JsonRejection>,
) -> Result<Json<CartItem>> {
    let Json(req) = body?;
    let item = state
        .cart()
        .add_to_cart(user.id, req.product_id, req.variant_id, req.quantity)
        .await?;
    Ok(Json(item))
}

/// Add the product's first purchasable variant.
///
/// POST /api/cart/quick-add
pub async fn quick_add<S: CommerceStore>(
    State(state): State<AppState<S>>,
    RequireUser(user): RequireUser,
    body: std::result::Result<Json<QuickAddRequest>, JsonRejection>,
) -> Result<Json<CartItem>> {
    let Json(req) = body?;
    let item = state
        .cart()
        .quick_add(user.id, req.product_id, req.quantity)
        .await?;
    Ok(Json(item))
}

/// Set a line's quantity.
///
/// PATCH /api/cart/{id}
pub async fn update<S: CommerceStore>(
    State(state): State<AppState<S>>,
    RequireUser(user): RequireUser,
    Path(id): Path<CartItemId>,
    body: std::result::Result<Json<UpdateQuantityRequest>, JsonRejection>,
) -> Result<Json<CartItem>> {
    let Json(req) = body?;
    let item = state
        .cart()
        .update_quantity(user.id, id, req.quantity)
        .await?;
    Ok(Json(item))
}

/// Remove a line. Succeeds even if the line is already gone.
///
/// DELETE /api/cart/{id}
pub async fn remove<S: CommerceStore>(
    State(state): State<AppState<S>>,
    RequireUser(user): RequireUser,
    Path(id): Path<CartItemId>,
) -> Result<StatusCode> {
    state.cart().remove_item(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Empty the cart.
///
/// DELETE /api/cart
pub async fn clear<S: CommerceStore>(
    State(state): State<AppState<S>>,
    RequireUser(user): RequireUser,
) -> Result<StatusCode> {
    state.cart().clear_cart(user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
