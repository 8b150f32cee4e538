//! Catalog fixtures shared by service tests.

#![allow(clippy::unwrap_used)]

use atelier_core::{HexColor, Money};

use crate::db::{CatalogStore, MemoryStore};
use crate::models::{NewProduct, NewVariant, Product, ProductVariant};

pub struct SeededProduct {
    pub product: Product,
    pub variants: Vec<ProductVariant>,
}

impl SeededProduct {
    pub fn variant(&self, size: &str, color: &str) -> &ProductVariant {
        self.variants
            .iter()
            .find(|v| v.size == size && v.color == color)
            .unwrap()
    }
}

pub async fn seed_product(
    store: &MemoryStore,
    name: &str,
    price: &str,
    variants: &[(&str, &str, &str, i32)],
) -> SeededProduct {
    let product = store
        .create_product(&NewProduct {
            name: name.to_owned(),
            description: String::new(),
            price: Money::parse(price).unwrap(),
            image_src: None,
            images: vec![],
        })
        .await
        .unwrap();

    let mut created = Vec::new();
    for (size, color, hex, stock) in variants {
        created.push(
            store
                .create_variant(
                    product.id,
                    &NewVariant {
                        size: (*size).to_owned(),
                        color: (*color).to_owned(),
                        color_hex: HexColor::parse(hex).unwrap(),
                        stock: *stock,
                        sku: None,
                        price: None,
                        cost_price: None,
                    },
                )
                .await
                .unwrap(),
        );
    }

    SeededProduct {
        product,
        variants: created,
    }
}

pub async fn seed_coat(store: &MemoryStore) -> SeededProduct {
    seed_product(
        store,
        "Wool Coat",
        "295.00",
        &[
            ("XS", "Black", "#000000", 5),
            ("S", "Black", "#000000", 10),
            ("M", "Black", "#000000", 15),
            ("L", "Black", "#000000", 12),
            ("XL", "Black", "#000000", 8),
            ("M", "Charcoal", "#3a3a3a", 0),
            ("L", "Navy", "#1a2847", 6),
        ],
    )
    .await
}

pub async fn seed_sweater(store: &MemoryStore) -> SeededProduct {
    seed_product(
        store,
        "Merino Sweater",
        "125.00",
        &[
            ("S", "Navy", "#1a2847", 8),
            ("M", "Navy", "#1a2847", 12),
            ("L", "Navy", "#1a2847", 10),
            ("XL", "Navy", "#1a2847", 5),
            ("M", "Black", "#000000", 15),
        ],
    )
    .await
}

/// A throwaway coat with the given (size, color, stock) variants.
pub async fn coat_fixture(store: &MemoryStore, variants: &[(&str, &str, i32)]) -> Product {
    let variants: Vec<_> = variants
        .iter()
        .map(|(size, color, stock)| (*size, *color, "#333333", *stock))
        .collect();
    seed_product(store, "Test Coat", "100.00", &variants)
        .await
        .product
}
