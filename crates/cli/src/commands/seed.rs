//! Seed the catalog from a YAML file.
//!
//! The file lists products, each with its variants:
//!
//! ```yaml
//! products:
//!   - name: Wool Coat
//!     price: "295.00"
//!     variants:
//!       - { size: "M", color: Black, colorHex: "#000000", stock: 15 }
//! ```
//!
//! Products whose name already exists are skipped, so the command can be
//! re-run safely.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use tracing::{error, info};

use atelier_core::Money;
use atelier_storefront::db::{self, CatalogStore, PgStore};
use atelier_storefront::models::{NewProduct, NewVariant};

use super::migrate::database_url;

/// A catalog file.
#[derive(Debug, Deserialize)]
pub struct CatalogFile {
    pub products: Vec<SeedProduct>,
}

/// One product and its variants.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Money,
    #[serde(default)]
    pub image_src: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub variants: Vec<NewVariant>,
}

impl SeedProduct {
    fn to_new_product(&self) -> NewProduct {
        NewProduct {
            name: self.name.clone(),
            description: self.description.clone(),
            price: self.price,
            image_src: self.image_src.clone(),
            images: self.images.clone(),
        }
    }
}

/// Check a catalog for problems the database would reject.
///
/// Returns one message per problem; empty means valid.
#[must_use]
pub fn validate_catalog(catalog: &CatalogFile) -> Vec<String> {
    let mut errors = Vec::new();
    let mut names = HashSet::new();

    for product in &catalog.products {
        if product.name.trim().is_empty() {
            errors.push("product with an empty name".to_owned());
            continue;
        }
        if !names.insert(product.name.as_str()) {
            errors.push(format!("{}: duplicate product name", product.name));
        }

        let mut selections = HashSet::new();
        for variant in &product.variants {
            if variant.stock < 0 {
                errors.push(format!(
                    "{} {}/{}: negative stock",
                    product.name, variant.size, variant.color
                ));
            }
            if !selections.insert((variant.size.as_str(), variant.color.as_str())) {
                errors.push(format!(
                    "{} {}/{}: duplicate size and color",
                    product.name, variant.size, variant.color
                ));
            }
        }
    }

    errors
}

/// Seed products and variants from a YAML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or fails validation, or if
/// database operations fail.
pub async fn catalog(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading catalog from file");

    // Read and validate YAML before connecting to database
    let content = tokio::fs::read_to_string(path).await?;
    let catalog: CatalogFile = serde_yaml::from_str(&content)?;
    info!(products = catalog.products.len(), "Parsed catalog");

    let errors = validate_catalog(&catalog);
    if !errors.is_empty() {
        error!("Catalog validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    let pool = db::create_pool(&database_url()?).await?;
    let store = PgStore::new(pool);
    info!("Connected to database");

    let existing: HashSet<String> = store
        .list_products()
        .await?
        .into_iter()
        .map(|p| p.name)
        .collect();

    let mut inserted = 0_usize;
    let mut skipped = 0_usize;
    for seed in &catalog.products {
        if existing.contains(&seed.name) {
            skipped += 1;
            continue;
        }

        let product = store.create_product(&seed.to_new_product()).await?;
        for variant in &seed.variants {
            store.create_variant(product.id, variant).await?;
        }
        info!(
            product = %product.name,
            variants = seed.variants.len(),
            "Created product"
        );
        inserted += 1;
    }

    info!("Seeding complete!");
    info!("  Products inserted: {inserted}");
    info!("  Products skipped (already exist): {skipped}");

    Ok(())
}
