//! Integration tests for the Atelier storefront.
//!
//! Tests drive the full router (identity extractors, JSON handling, error
//! mapping and request logging) against the in-memory store, one request at
//! a time through `tower::ServiceExt::oneshot`.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p atelier-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use atelier_core::{HexColor, Money, UserId};
use atelier_storefront::db::{CatalogStore, MemoryStore};
use atelier_storefront::middleware::{RequestLog, USER_ID_HEADER, USER_ROLE_HEADER};
use atelier_storefront::models::{NewProduct, NewVariant, Product, ProductVariant, StockPolicy};
use atelier_storefront::routes;
use atelier_storefront::services::CatalogCache;
use atelier_storefront::state::AppState;

/// Who a request is sent as.
#[derive(Debug, Clone, Copy)]
pub enum Caller {
    Anonymous,
    Customer(UserId),
    Admin(UserId),
}

/// A product created by [`TestApp::seed_product`].
#[derive(Debug, Clone)]
pub struct Seeded {
    pub product: Product,
    pub variants: Vec<ProductVariant>,
}

impl Seeded {
    /// The variant with this size and color.
    ///
    /// # Panics
    ///
    /// Panics if the product has no such variant.
    #[must_use]
    pub fn variant(&self, size: &str, color: &str) -> &ProductVariant {
        self.variants
            .iter()
            .find(|v| v.size == size && v.color == color)
            .unwrap_or_else(|| panic!("no {size}/{color} variant"))
    }
}

/// A JSON response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// The storefront router over a fresh in-memory store.
pub struct TestApp {
    pub store: MemoryStore,
    pub state: AppState<MemoryStore>,
    router: Router,
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new(StockPolicy::Strict)
    }
}

impl TestApp {
    /// Build an app with the given stock policy.
    #[must_use]
    pub fn new(policy: StockPolicy) -> Self {
        let store = MemoryStore::new();
        let state = AppState::with_parts(
            store.clone(),
            policy,
            CatalogCache::new(Duration::from_secs(300)),
            RequestLog::new(100),
        );
        let router = routes::router(state.clone());
        Self {
            store,
            state,
            router,
        }
    }

    /// Insert a product with `(size, color, stock)` variants.
    ///
    /// # Panics
    ///
    /// Panics if the inputs are invalid.
    pub async fn seed_product(
        &self,
        name: &str,
        price: &str,
        variants: &[(&str, &str, i32)],
    ) -> Seeded {
        let product = self
            .store
            .create_product(&NewProduct {
                name: name.to_owned(),
                description: String::new(),
                price: price.parse::<Money>().unwrap_or_else(|e| panic!("{e}")),
                image_src: None,
                images: Vec::new(),
            })
            .await
            .unwrap_or_else(|e| panic!("{e}"));

        let mut created = Vec::new();
        for (size, color, stock) in variants {
            let variant = self
                .store
                .create_variant(
                    product.id,
                    &NewVariant {
                        size: (*size).to_owned(),
                        color: (*color).to_owned(),
                        color_hex: HexColor::parse("#333333").unwrap_or_else(|e| panic!("{e}")),
                        stock: *stock,
                        sku: None,
                        price: None,
                        cost_price: None,
                    },
                )
                .await
                .unwrap_or_else(|e| panic!("{e}"));
            created.push(variant);
        }

        Seeded {
            product,
            variants: created,
        }
    }

    /// The Wool Coat from the sample catalog.
    pub async fn seed_coat(&self) -> Seeded {
        self.seed_product(
            "Wool Coat",
            "295.00",
            &[
                ("XS", "Black", 5),
                ("S", "Black", 10),
                ("M", "Black", 15),
                ("L", "Black", 12),
                ("XL", "Black", 8),
                ("M", "Charcoal", 0),
                ("L", "Navy", 6),
            ],
        )
        .await
    }

    /// The Merino Sweater from the sample catalog.
    pub async fn seed_sweater(&self) -> Seeded {
        self.seed_product(
            "Merino Sweater",
            "125.00",
            &[
                ("S", "Navy", 8),
                ("M", "Navy", 12),
                ("L", "Navy", 10),
                ("XL", "Navy", 5),
                ("M", "Black", 15),
            ],
        )
        .await
    }

    /// Send one request and decode the JSON response (`Null` when empty, a
    /// string when the body is not JSON).
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or the body is not JSON.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        caller: Caller,
        body: Option<Value>,
    ) -> TestResponse {
        self.request_with_headers(method, uri, caller, &[], body)
            .await
    }

    /// Like [`Self::request`] with extra headers.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or the body is not JSON.
    pub async fn request_with_headers(
        &self,
        method: Method,
        uri: &str,
        caller: Caller,
        headers: &[(&str, &str)],
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        match caller {
            Caller::Anonymous => {}
            Caller::Customer(id) => {
                builder = builder.header(USER_ID_HEADER, id.to_string());
            }
            Caller::Admin(id) => {
                builder = builder
                    .header(USER_ID_HEADER, id.to_string())
                    .header(USER_ROLE_HEADER, "admin");
            }
        }
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap_or_else(|e| panic!("{e}"));

        self.send(request).await
    }

    /// Send a request with a raw body, for malformed-input tests.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built.
    pub async fn request_raw(
        &self,
        method: Method,
        uri: &str,
        caller: Caller,
        raw: String,
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        if let Caller::Customer(id) | Caller::Admin(id) = caller {
            builder = builder.header(USER_ID_HEADER, id.to_string());
        }
        let request = builder
            .body(Body::from(raw))
            .unwrap_or_else(|e| panic!("{e}"));

        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .unwrap_or_else(|e| match e {});
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap_or_else(|e| panic!("{e}"));
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        TestResponse { status, body }
    }
}
