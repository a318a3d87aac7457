//! Catalog seeding for the in-memory backend.

use std::path::Path;

use thiserror::Error;

use storefront_cart_core::{
    CurrencyCode, DEFAULT_OPTION, Image, Merchandise, MerchandiseId, Money, Product, ProductId,
    SelectedOption,
};

/// Errors loading a catalog file.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse catalog file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Load a JSON array of merchandise.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a valid catalog.
pub fn load_catalog(path: &Path) -> Result<Vec<Merchandise>, CatalogError> {
    let raw = std::fs::read_to_string(path)?;
    let catalog: Vec<Merchandise> = serde_json::from_str(&raw)?;
    tracing::info!(path = %path.display(), variants = catalog.len(), "Loaded catalog");
    Ok(catalog)
}

/// A small catalog for local development.
#[must_use]
pub fn demo_catalog(currency: CurrencyCode) -> Vec<Merchandise> {
    let hat = Product {
        id: ProductId::new("gid://storefront/Product/1"),
        handle: "apple-hat".to_string(),
        title: "Apple Hat".to_string(),
        featured_image: Some(Image {
            url: "/static/images/apple-hat.jpg".to_string(),
            alt_text: None,
        }),
    };
    let shirt = Product {
        id: ProductId::new("gid://storefront/Product/2"),
        handle: "banana-shirt".to_string(),
        title: "Banana Shirt".to_string(),
        featured_image: Some(Image {
            url: "/static/images/banana-shirt.jpg".to_string(),
            alt_text: Some("A yellow shirt with a banana print".to_string()),
        }),
    };

    let mut catalog = vec![Merchandise {
        id: MerchandiseId::new("gid://storefront/ProductVariant/1"),
        title: DEFAULT_OPTION.to_string(),
        selected_options: vec![SelectedOption::new("Title", DEFAULT_OPTION)],
        price: Money::from_cents(1800, currency),
        product: hat,
    }];

    for (n, (size, color)) in [("S", "Yellow"), ("M", "Yellow"), ("L", "Green")]
        .into_iter()
        .enumerate()
    {
        catalog.push(Merchandise {
            id: MerchandiseId::new(format!("gid://storefront/ProductVariant/{}", n + 2)),
            title: format!("{size} / {color}"),
            selected_options: vec![
                SelectedOption::new("Size", size),
                SelectedOption::new("Color", color),
            ],
            price: Money::from_cents(3200, currency),
            product: shirt.clone(),
        });
    }

    catalog
}
