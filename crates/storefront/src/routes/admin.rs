//! Admin route handlers: catalog management and operational views.
//!
//! Every handler requires the admin role.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::Serialize;

use atelier_core::{ProductId, VariantId};

use crate::db::CommerceStore;
use crate::error::Result;
use crate::middleware::{RequestLogEntry, RequireAdmin};
use crate::models::{
    NewProduct, NewVariant, Product, ProductPatch, ProductVariant, ProductWithVariants,
    VariantPatch,
};
use crate::state::AppState;

/// Admin health summary.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminHealthResponse {
    /// `ok` when the store answers, `degraded` otherwise.
    pub status: &'static str,
    pub uptime_secs: u64,
    pub version: &'static str,
}

// =============================================================================
// Products
// =============================================================================

/// Every product with its variants.
///
/// GET /api/admin/products
pub async fn products<S: CommerceStore>(
    State(state): State<AppState<S>>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<ProductWithVariants>>> {
    Ok(Json(state.catalog().list_products_with_variants().await?))
}

/// POST /api/admin/products
pub async fn create_product<S: CommerceStore>(
    State(state): State<AppState<S>>,
    RequireAdmin(_admin): RequireAdmin,
    body: std::result::Result<Json<NewProduct>, JsonRejection>,
) -> Result<(StatusCode, Json<Product>)> {
    let Json(input) = body?;
    let product = state.catalog().create_product(&input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// PATCH /api/admin/products/{id}
pub async fn update_product<S: CommerceStore>(
    State(state): State<AppState<S>>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<ProductId>,
    body: std::result::Result<Json<ProductPatch>, JsonRejection>,
) -> Result<Json<Product>> {
    let Json(patch) = body?;
    Ok(Json(state.catalog().update_product(id, &patch).await?))
}

/// Delete a product together with its variants.
///
/// DELETE /api/admin/products/{id}
pub async fn delete_product<S: CommerceStore>(
    State(state): State<AppState<S>>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<ProductId>,
) -> Result<StatusCode> {
    state.catalog().delete_product(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Variants
// =============================================================================

/// POST /api/admin/products/{id}/variants
pub async fn create_variant<S: CommerceStore>(
    State(state): State<AppState<S>>,
    RequireAdmin(_admin): RequireAdmin,
    Path(product_id): Path<ProductId>,
    body: std::result::Result<Json<NewVariant>, JsonRejection>,
) -> Result<(StatusCode, Json<ProductVariant>)> {
    let Json(input) = body?;
    let variant = state.catalog().create_variant(product_id, &input).await?;
    Ok((StatusCode::CREATED, Json(variant)))
}

/// PATCH /api/admin/variants/{id}
pub async fn update_variant<S: CommerceStore>(
    State(state): State<AppState<S>>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<VariantId>,
    body: std::result::Result<Json<VariantPatch>, JsonRejection>,
) -> Result<Json<ProductVariant>> {
    let Json(patch) = body?;
    Ok(Json(state.catalog().update_variant(id, &patch).await?))
}

/// DELETE /api/admin/variants/{id}
pub async fn delete_variant<S: CommerceStore>(
    State(state): State<AppState<S>>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<VariantId>,
) -> Result<StatusCode> {
    state.catalog().delete_variant(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Operations
// =============================================================================

/// Recent `/api` requests, newest first.
///
/// GET /api/admin/logs
pub async fn logs<S: CommerceStore>(
    State(state): State<AppState<S>>,
    RequireAdmin(_admin): RequireAdmin,
) -> Json<Vec<RequestLogEntry>> {
    Json(state.request_log().recent())
}

/// GET /api/admin/health
pub async fn health<S: CommerceStore>(
    State(state): State<AppState<S>>,
    RequireAdmin(_admin): RequireAdmin,
) -> Json<AdminHealthResponse> {
    let status = match state.store().ping().await {
        Ok(()) => "ok",
        Err(e) => {
            tracing::warn!(error = %e, "Store ping failed");
            "degraded"
        }
    };

    Json(AdminHealthResponse {
        status,
        uptime_secs: state.uptime().as_secs(),
        version: env!("CARGO_PKG_VERSION"),
    })
}
