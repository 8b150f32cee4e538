//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                                - Liveness
//! GET    /health/ready                          - Store reachability
//!
//! # Catalog
//! GET    /api/products                          - Product listing (cached)
//! GET    /api/products/{id}                     - Product detail
//! GET    /api/products/{id}/variants            - Variants, insertion order
//! GET    /api/products/{id}/variants/lookup     - ?size=&color= selection
//! GET    /api/products/{id}/variants/first-available
//!
//! # Cart (requires identity)
//! GET    /api/cart                              - Lines and summary
//! POST   /api/cart                              - Add to cart
//! POST   /api/cart/quick-add                    - Add first available variant
//! PATCH  /api/cart/{id}                         - Set quantity
//! DELETE /api/cart/{id}                         - Remove line
//! DELETE /api/cart                              - Clear cart
//!
//! # Orders (requires identity)
//! POST   /api/orders                            - Checkout (Idempotency-Key)
//! GET    /api/orders                            - Own orders, all for admins
//! GET    /api/orders/{id}                       - One order
//! PATCH  /api/orders/{id}/status                - Transition (admin)
//!
//! # Admin (requires admin role)
//! GET    /api/admin/products                    - Products with variants
//! POST   /api/admin/products                    - Create product
//! PATCH  /api/admin/products/{id}               - Update product
//! DELETE /api/admin/products/{id}               - Delete product
//! POST   /api/admin/products/{id}/variants      - Create variant
//! PATCH  /api/admin/variants/{id}               - Update variant
//! DELETE /api/admin/variants/{id}               - Delete variant
//! GET    /api/admin/logs                        - Recent API requests
//! GET    /api/admin/health                      - Status and uptime
//! ```

pub mod admin;
pub mod cart;
pub mod orders;
pub mod products;

use axum::{
    Json, Router,
    extract::{Request, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, patch, post},
};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::db::CommerceStore;
use crate::middleware::request_log_middleware;
use crate::state::AppState;

/// Create the catalog routes router.
pub fn product_routes<S: CommerceStore>() -> Router<AppState<S>> {
    Router::new()
        .route("/", get(products::index::<S>))
        .route("/{id}", get(products::show::<S>))
        .route("/{id}/variants", get(products::variants::<S>))
        .route("/{id}/variants/lookup", get(products::lookup::<S>))
        .route(
            "/{id}/variants/first-available",
            get(products::first_available::<S>),
        )
}

/// Create the cart routes router.
pub fn cart_routes<S: CommerceStore>() -> Router<AppState<S>> {
    Router::new()
        .route(
            "/",
            get(cart::show::<S>)
                .post(cart::add::<S>)
                .delete(cart::clear::<S>),
        )
        .route("/quick-add", post(cart::quick_add::<S>))
        .route(
            "/{id}",
            patch(cart::update::<S>).delete(cart::remove::<S>),
        )
}

/// Create the order routes router.
pub fn order_routes<S: CommerceStore>() -> Router<AppState<S>> {
    Router::new()
        .route("/", get(orders::index::<S>).post(orders::create::<S>))
        .route("/{id}", get(orders::show::<S>))
        .route("/{id}/status", patch(orders::update_status::<S>))
}

/// Create the admin routes router.
pub fn admin_routes<S: CommerceStore>() -> Router<AppState<S>> {
    Router::new()
        .route(
            "/products",
            get(admin::products::<S>).post(admin::create_product::<S>),
        )
        .route(
            "/products/{id}",
            patch(admin::update_product::<S>).delete(admin::delete_product::<S>),
        )
        .route("/products/{id}/variants", post(admin::create_variant::<S>))
        .route(
            "/variants/{id}",
            patch(admin::update_variant::<S>).delete(admin::delete_variant::<S>),
        )
        .route("/logs", get(admin::logs::<S>))
        .route("/health", get(admin::health::<S>))
}

/// Create all `/api` routes.
pub fn api_routes<S: CommerceStore>() -> Router<AppState<S>> {
    Router::new()
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
        .nest("/orders", order_routes())
        .nest("/admin", admin_routes())
}

/// Build the full application router with its request-level layers.
///
/// Sentry layers are added by the binary so tests can run without a client.
pub fn router<S: CommerceStore>(state: AppState<S>) -> Router {
    let request_log = state.request_log().clone();

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness::<S>))
        .nest("/api", api_routes())
        .layer(middleware::from_fn_with_state(
            request_log,
            request_log_middleware,
        ))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
}

/// Liveness check.
async fn health() -> &'static str {
    "ok"
}

/// Readiness check: the store must answer.
async fn readiness<S: CommerceStore>(State(state): State<AppState<S>>) -> impl IntoResponse {
    match state.store().ping().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ready" }))),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable" })),
            )
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use tower::ServiceExt;

    use super::*;
    use crate::db::MemoryStore;
    use crate::middleware::{REQUEST_ID_HEADER, RequestLog};
    use crate::models::StockPolicy;
    use crate::services::CatalogCache;

    fn app() -> (Router, AppState<MemoryStore>) {
        let state = AppState::with_parts(
            MemoryStore::new(),
            StockPolicy::Strict,
            CatalogCache::new(std::time::Duration::from_secs(60)),
            RequestLog::new(10),
        );
        (router(state.clone()), state)
    }

    #[tokio::test]
    async fn test_health_endpoints() {
        let (app, _) = app();

        let response = app
            .clone()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(Request::get("/health/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_only_api_requests_are_logged() {
        let (app, state) = app();

        app.clone()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let response = app
            .oneshot(
                Request::get("/api/products")
                    .header(REQUEST_ID_HEADER, "req-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers()[REQUEST_ID_HEADER], "req-123");
        let entries = state.request_log().recent();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, "/api/products");
        assert_eq!(entries[0].request_id, "req-123");
        assert_eq!(entries[0].status, 200);
    }

    #[tokio::test]
    async fn test_cart_requires_identity() {
        let (app, _) = app();

        let response = app
            .oneshot(Request::get("/api/cart").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
