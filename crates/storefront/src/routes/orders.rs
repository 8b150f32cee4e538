//! Checkout and order route handlers.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
};
use serde::Deserialize;

use atelier_core::OrderId;

use crate::db::CommerceStore;
use crate::error::{AppError, Result};
use crate::middleware::{RequireAdmin, RequireUser};
use crate::models::{Order, OrderPlacement, OrderWithItems};
use crate::services::CheckoutDetails;
use crate::state::AppState;

/// Header carrying the client's checkout retry key.
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// Status change request body.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

/// Place an order from the caller's cart.
///
/// POST /api/orders
///
/// Responds `201 Created` for a new order and `200 OK` when an
/// `Idempotency-Key` replays an earlier one.
pub async fn create<S: CommerceStore>(
    State(state): State<AppState<S>>,
    RequireUser(user): RequireUser,
    headers: HeaderMap,
    body: std::result::Result<Json<CheckoutDetails>, JsonRejection>,
) -> Result<(StatusCode, Json<Order>)> {
    let Json(details) = body?;
    let idempotency_key = headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .map(|value| {
            value
                .to_str()
                .map_err(|_| AppError::BadRequest("Invalid Idempotency-Key header".to_string()))
        })
        .transpose()?;

    let placement = state
        .orders()
        .place_order(user.id, &details, idempotency_key)
        .await?;

    let status = match placement {
        OrderPlacement::Created(_) => StatusCode::CREATED,
        OrderPlacement::Replayed(_) => StatusCode::OK,
    };
    Ok((status, Json(placement.into_order())))
}

/// The caller's orders, or every order for admins.
///
/// GET /api/orders
pub async fn index<S: CommerceStore>(
    State(state): State<AppState<S>>,
    RequireUser(user): RequireUser,
) -> Result<Json<Vec<OrderWithItems>>> {
    Ok(Json(state.orders().list_orders(&user).await?))
}

/// One order, visible to its owner and admins.
///
/// GET /api/orders/{id}
pub async fn show<S: CommerceStore>(
    State(state): State<AppState<S>>,
    RequireUser(user): RequireUser,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderWithItems>> {
    Ok(Json(state.orders().get_order(&user, id).await?))
}

/// Move an order along its lifecycle.
///
/// PATCH /api/orders/{id}/status
pub async fn update_status<S: CommerceStore>(
    State(state): State<AppState<S>>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<OrderId>,
    body: std::result::Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<Order>> {
    let Json(req) = body?;
    let order = state.orders().update_status(id, &req.status).await?;
    tracing::info!(
        admin_id = %admin.id,
        order_id = %order.id,
        status = %order.status,
        "Order status updated by admin"
    );
    Ok(Json(order))
}
