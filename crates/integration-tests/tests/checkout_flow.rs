//! Integration tests for the cart and checkout flow over HTTP.
//!
//! Every test runs the real router against a fresh in-memory store.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::http::{Method, StatusCode};
use serde_json::{Value, json};

use atelier_core::UserId;
use atelier_integration_tests::{Caller, TestApp};
use atelier_storefront::db::CatalogStore;

fn checkout_body() -> Value {
    json!({
        "customerName": "Ada Lovelace",
        "customerEmail": "ada@example.com",
        "shippingAddress": "12 Analytical Row, London"
    })
}

async fn stock(app: &TestApp, variant_id: atelier_core::VariantId) -> i32 {
    app.store.get_variant(variant_id).await.unwrap().unwrap().stock
}

// =============================================================================
// Cart
// =============================================================================

#[tokio::test]
async fn test_add_to_cart_merges_lines() {
    let app = TestApp::default();
    let coat = app.seed_coat().await;
    let user = Caller::Customer(UserId::generate());
    let body = json!({
        "productId": coat.product.id,
        "variantId": coat.variant("M", "Black").id,
        "quantity": 1
    });

    let first = app
        .request(Method::POST, "/api/cart", user, Some(body.clone()))
        .await;
    assert_eq!(first.status, StatusCode::OK);

    let mut second_body = body;
    second_body["quantity"] = json!(2);
    let second = app
        .request(Method::POST, "/api/cart", user, Some(second_body))
        .await;
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(second.body["id"], first.body["id"]);
    assert_eq!(second.body["quantity"], 3);

    let cart = app.request(Method::GET, "/api/cart", user, None).await;
    assert_eq!(cart.body["lines"].as_array().unwrap().len(), 1);
    assert_eq!(cart.body["itemCount"], 3);
    assert_eq!(cart.body["subtotal"], "885.00");
}

#[tokio::test]
async fn test_quantity_defaults_to_one() {
    let app = TestApp::default();
    let coat = app.seed_coat().await;
    let user = Caller::Customer(UserId::generate());

    let response = app
        .request(
            Method::POST,
            "/api/cart",
            user,
            Some(json!({
                "productId": coat.product.id,
                "variantId": coat.variant("S", "Black").id
            })),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["quantity"], 1);
}

#[tokio::test]
async fn test_invalid_quantities_are_rejected() {
    let app = TestApp::default();
    let coat = app.seed_coat().await;
    let user_id = UserId::generate();
    let user = Caller::Customer(user_id);
    let variant_id = coat.variant("M", "Black").id;

    for quantity in [0, -1] {
        let response = app
            .request(
                Method::POST,
                "/api/cart",
                user,
                Some(json!({
                    "productId": coat.product.id,
                    "variantId": variant_id,
                    "quantity": quantity
                })),
            )
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
    }

    let raw = format!(
        r#"{{"productId":"{}","variantId":"{}","quantity":2.5}}"#,
        coat.product.id, variant_id
    );
    let response = app
        .request_raw(Method::POST, "/api/cart", user, raw)
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let cart = app.request(Method::GET, "/api/cart", user, None).await;
    assert_eq!(cart.body["itemCount"], 0);
}

#[tokio::test]
async fn test_update_quantity_floor() {
    let app = TestApp::default();
    let coat = app.seed_coat().await;
    let user = Caller::Customer(UserId::generate());
    let added = app
        .request(
            Method::POST,
            "/api/cart",
            user,
            Some(json!({
                "productId": coat.product.id,
                "variantId": coat.variant("M", "Black").id,
                "quantity": 2
            })),
        )
        .await;
    let uri = format!("/api/cart/{}", added.body["id"].as_str().unwrap());

    for quantity in [0, -1] {
        let response = app
            .request(Method::PATCH, &uri, user, Some(json!({ "quantity": quantity })))
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
    }

    let cart = app.request(Method::GET, "/api/cart", user, None).await;
    assert_eq!(cart.body["lines"][0]["quantity"], 2);

    let response = app
        .request(Method::PATCH, &uri, user, Some(json!({ "quantity": 5 })))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["quantity"], 5);
}

#[tokio::test]
async fn test_sold_out_variant_is_conflict() {
    let app = TestApp::default();
    let coat = app.seed_coat().await;

    let response = app
        .request(
            Method::POST,
            "/api/cart",
            Caller::Customer(UserId::generate()),
            Some(json!({
                "productId": coat.product.id,
                "variantId": coat.variant("M", "Charcoal").id
            })),
        )
        .await;

    assert_eq!(response.status, StatusCode::CONFLICT);
    assert!(
        response.body["message"]
            .as_str()
            .unwrap()
            .contains("out of stock")
    );
}

#[tokio::test]
async fn test_variant_of_another_product_is_rejected() {
    let app = TestApp::default();
    let coat = app.seed_coat().await;
    let sweater = app.seed_sweater().await;

    let response = app
        .request(
            Method::POST,
            "/api/cart",
            Caller::Customer(UserId::generate()),
            Some(json!({
                "productId": coat.product.id,
                "variantId": sweater.variant("M", "Navy").id
            })),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_remove_and_clear_cart() {
    let app = TestApp::default();
    let coat = app.seed_coat().await;
    let user = Caller::Customer(UserId::generate());
    let added = app
        .request(
            Method::POST,
            "/api/cart",
            user,
            Some(json!({
                "productId": coat.product.id,
                "variantId": coat.variant("M", "Black").id
            })),
        )
        .await;
    app.request(
        Method::POST,
        "/api/cart/quick-add",
        user,
        Some(json!({ "productId": coat.product.id })),
    )
    .await;

    let uri = format!("/api/cart/{}", added.body["id"].as_str().unwrap());
    let removed = app.request(Method::DELETE, &uri, user, None).await;
    assert_eq!(removed.status, StatusCode::NO_CONTENT);
    let removed_again = app.request(Method::DELETE, &uri, user, None).await;
    assert_eq!(removed_again.status, StatusCode::NO_CONTENT);

    let cart = app.request(Method::GET, "/api/cart", user, None).await;
    assert_eq!(cart.body["lines"].as_array().unwrap().len(), 1);
    assert_eq!(cart.body["lines"][0]["variant"]["size"], "XS");

    let cleared = app.request(Method::DELETE, "/api/cart", user, None).await;
    assert_eq!(cleared.status, StatusCode::NO_CONTENT);
    let cart = app.request(Method::GET, "/api/cart", user, None).await;
    assert!(cart.body["lines"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_cart_requires_identity() {
    let app = TestApp::default();

    let response = app
        .request(Method::GET, "/api/cart", Caller::Anonymous, None)
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Checkout
// =============================================================================

#[tokio::test]
async fn test_checkout_scenario() {
    let app = TestApp::default();
    let coat = app.seed_coat().await;
    let sweater = app.seed_sweater().await;
    let user = Caller::Customer(UserId::generate());
    let coat_m = coat.variant("M", "Black").id;
    let sweater_m = sweater.variant("M", "Navy").id;

    app.request(
        Method::POST,
        "/api/cart",
        user,
        Some(json!({ "productId": coat.product.id, "variantId": coat_m, "quantity": 1 })),
    )
    .await;
    app.request(
        Method::POST,
        "/api/cart",
        user,
        Some(json!({ "productId": sweater.product.id, "variantId": sweater_m, "quantity": 2 })),
    )
    .await;

    let order = app
        .request(Method::POST, "/api/orders", user, Some(checkout_body()))
        .await;
    assert_eq!(order.status, StatusCode::CREATED);
    assert_eq!(order.body["total"], "545.00");
    assert_eq!(order.body["status"], "pending");

    let cart = app.request(Method::GET, "/api/cart", user, None).await;
    assert!(cart.body["lines"].as_array().unwrap().is_empty());

    assert_eq!(stock(&app, coat_m).await, 14);
    assert_eq!(stock(&app, sweater_m).await, 10);

    let orders = app.request(Method::GET, "/api/orders", user, None).await;
    let orders = orders.body.as_array().unwrap();
    assert_eq!(orders.len(), 1);
    let items = orders[0]["items"].as_array().unwrap();
    let mut quantities: Vec<i64> = items
        .iter()
        .map(|item| item["quantity"].as_i64().unwrap())
        .collect();
    quantities.sort_unstable();
    assert_eq!(quantities, [1, 2]);
    assert!(items.iter().any(|item| item["productName"] == "Wool Coat"
        && item["price"] == "295.00"
        && item["size"] == "M"));
}

#[tokio::test]
async fn test_checkout_with_empty_cart() {
    let app = TestApp::default();

    let response = app
        .request(
            Method::POST,
            "/api/orders",
            Caller::Customer(UserId::generate()),
            Some(checkout_body()),
        )
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.body["message"], "cart is empty");
}

#[tokio::test]
async fn test_checkout_with_invalid_details() {
    let app = TestApp::default();
    let coat = app.seed_coat().await;
    let user = Caller::Customer(UserId::generate());
    app.request(
        Method::POST,
        "/api/cart",
        user,
        Some(json!({ "productId": coat.product.id, "variantId": coat.variant("M", "Black").id })),
    )
    .await;

    let mut body = checkout_body();
    body["customerEmail"] = json!("not-an-email");
    let response = app.request(Method::POST, "/api/orders", user, Some(body)).await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);

    let cart = app.request(Method::GET, "/api/cart", user, None).await;
    assert_eq!(cart.body["itemCount"], 1);
}

#[tokio::test]
async fn test_insufficient_stock_fails_whole_order() {
    let app = TestApp::default();
    let coat = app.seed_coat().await;
    let user = Caller::Customer(UserId::generate());
    let xs = coat.variant("XS", "Black").id;
    let m = coat.variant("M", "Black").id;

    app.request(
        Method::POST,
        "/api/cart",
        user,
        Some(json!({ "productId": coat.product.id, "variantId": m, "quantity": 2 })),
    )
    .await;
    app.request(
        Method::POST,
        "/api/cart",
        user,
        Some(json!({ "productId": coat.product.id, "variantId": xs, "quantity": 6 })),
    )
    .await;

    let response = app
        .request(Method::POST, "/api/orders", user, Some(checkout_body()))
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);

    assert_eq!(stock(&app, m).await, 15);
    assert_eq!(stock(&app, xs).await, 5);
    let cart = app.request(Method::GET, "/api/cart", user, None).await;
    assert_eq!(cart.body["itemCount"], 8);
    let orders = app.request(Method::GET, "/api/orders", user, None).await;
    assert!(orders.body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_line_insert_rolls_back() {
    let app = TestApp::default();
    let coat = app.seed_coat().await;
    let sweater = app.seed_sweater().await;
    let user = Caller::Customer(UserId::generate());
    let coat_m = coat.variant("M", "Black").id;
    let sweater_m = sweater.variant("M", "Navy").id;

    app.request(
        Method::POST,
        "/api/cart",
        user,
        Some(json!({ "productId": coat.product.id, "variantId": coat_m })),
    )
    .await;
    app.request(
        Method::POST,
        "/api/cart",
        user,
        Some(json!({ "productId": sweater.product.id, "variantId": sweater_m, "quantity": 2 })),
    )
    .await;

    app.store.fail_order_item_insert_at(1).await;
    let response = app
        .request(Method::POST, "/api/orders", user, Some(checkout_body()))
        .await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body["message"], "Internal server error");

    assert_eq!(stock(&app, coat_m).await, 15);
    assert_eq!(stock(&app, sweater_m).await, 12);
    let cart = app.request(Method::GET, "/api/cart", user, None).await;
    assert_eq!(cart.body["itemCount"], 3);
    let orders = app.request(Method::GET, "/api/orders", user, None).await;
    assert!(orders.body.as_array().unwrap().is_empty());

    app.store.clear_injected_failures().await;
    let retry = app
        .request(Method::POST, "/api/orders", user, Some(checkout_body()))
        .await;
    assert_eq!(retry.status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_idempotent_checkout_replays() {
    let app = TestApp::default();
    let coat = app.seed_coat().await;
    let user = Caller::Customer(UserId::generate());
    let coat_m = coat.variant("M", "Black").id;

    app.request(
        Method::POST,
        "/api/cart",
        user,
        Some(json!({ "productId": coat.product.id, "variantId": coat_m })),
    )
    .await;

    let headers = [("idempotency-key", "checkout-1")];
    let first = app
        .request_with_headers(Method::POST, "/api/orders", user, &headers, Some(checkout_body()))
        .await;
    let second = app
        .request_with_headers(Method::POST, "/api/orders", user, &headers, Some(checkout_body()))
        .await;

    assert_eq!(first.status, StatusCode::CREATED);
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(first.body["id"], second.body["id"]);
    assert_eq!(stock(&app, coat_m).await, 14);

    let orders = app.request(Method::GET, "/api/orders", user, None).await;
    assert_eq!(orders.body.as_array().unwrap().len(), 1);
}

// =============================================================================
// Order lifecycle and visibility
// =============================================================================

async fn place_coat_order(app: &TestApp, user: Caller, quantity: i64) -> String {
    let coat = app.seed_coat().await;
    app.request(
        Method::POST,
        "/api/cart",
        user,
        Some(json!({
            "productId": coat.product.id,
            "variantId": coat.variant("L", "Navy").id,
            "quantity": quantity
        })),
    )
    .await;
    let order = app
        .request(Method::POST, "/api/orders", user, Some(checkout_body()))
        .await;
    order.body["id"].as_str().unwrap().to_owned()
}

#[tokio::test]
async fn test_status_lifecycle() {
    let app = TestApp::default();
    let admin = Caller::Admin(UserId::generate());
    let order_id = place_coat_order(&app, Caller::Customer(UserId::generate()), 1).await;
    let uri = format!("/api/orders/{order_id}/status");

    for status in ["processing", "shipped", "delivered"] {
        let response = app
            .request(Method::PATCH, &uri, admin, Some(json!({ "status": status })))
            .await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body["status"], status);
    }

    let backwards = app
        .request(Method::PATCH, &uri, admin, Some(json!({ "status": "pending" })))
        .await;
    assert_eq!(backwards.status, StatusCode::CONFLICT);

    let unknown = app
        .request(Method::PATCH, &uri, admin, Some(json!({ "status": "lost" })))
        .await;
    assert_eq!(unknown.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_customers_cannot_change_status() {
    let app = TestApp::default();
    let user = Caller::Customer(UserId::generate());
    let order_id = place_coat_order(&app, user, 1).await;

    let response = app
        .request(
            Method::PATCH,
            &format!("/api/orders/{order_id}/status"),
            user,
            Some(json!({ "status": "shipped" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_cancel_restocks() {
    let app = TestApp::default();
    let user = Caller::Customer(UserId::generate());
    let order_id = place_coat_order(&app, user, 2).await;
    let navy_l = app
        .store
        .list_products_with_variants()
        .await
        .unwrap()
        .remove(0)
        .variants
        .into_iter()
        .find(|v| v.size == "L" && v.color == "Navy")
        .unwrap()
        .id;
    assert_eq!(stock(&app, navy_l).await, 4);

    let response = app
        .request(
            Method::PATCH,
            &format!("/api/orders/{order_id}/status"),
            Caller::Admin(UserId::generate()),
            Some(json!({ "status": "cancelled" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(stock(&app, navy_l).await, 6);
}

#[tokio::test]
async fn test_order_visibility() {
    let app = TestApp::default();
    let owner = Caller::Customer(UserId::generate());
    let stranger = Caller::Customer(UserId::generate());
    let order_id = place_coat_order(&app, owner, 1).await;
    let uri = format!("/api/orders/{order_id}");

    assert_eq!(
        app.request(Method::GET, &uri, owner, None).await.status,
        StatusCode::OK
    );
    assert_eq!(
        app.request(Method::GET, &uri, stranger, None).await.status,
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        app.request(Method::GET, &uri, Caller::Admin(UserId::generate()), None)
            .await
            .status,
        StatusCode::OK
    );

    let stranger_orders = app.request(Method::GET, "/api/orders", stranger, None).await;
    assert!(stranger_orders.body.as_array().unwrap().is_empty());
    let all_orders = app
        .request(Method::GET, "/api/orders", Caller::Admin(UserId::generate()), None)
        .await;
    assert_eq!(all_orders.body.as_array().unwrap().len(), 1);
}
