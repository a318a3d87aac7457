//! Read-only catalog projections referenced by cart lines.
//!
//! These mirror what the commerce backend reports about a purchasable
//! variant. They are never mutated client-side.

use serde::{Deserialize, Serialize};

use super::id::{MerchandiseId, ProductId};
use super::money::Money;

/// Option value the backend uses for variants without distinguishing options.
///
/// Shopify reports a product with a single variant as having one option
/// named "Title" whose value is "Default Title". The variant title is the
/// same sentinel.
pub const DEFAULT_OPTION: &str = "Default Title";

/// Product or variant image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    /// Image URL.
    pub url: String,
    /// Alt text for accessibility.
    pub alt_text: Option<String>,
}

/// Product info carried by cart merchandise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Product ID.
    pub id: ProductId,
    /// Product handle (URL slug).
    pub handle: String,
    /// Product title.
    pub title: String,
    /// Featured image.
    pub featured_image: Option<Image>,
}

/// Selected product option (e.g., Size: Large).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedOption {
    /// Option name (e.g., "Size", "Color").
    pub name: String,
    /// Selected value (e.g., "Large", "Blue").
    pub value: String,
}

impl SelectedOption {
    /// Create a selected option.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Whether this option carries the "no meaningful option" sentinel.
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.value == DEFAULT_OPTION
    }
}

/// A purchasable product variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Merchandise {
    /// Variant ID.
    pub id: MerchandiseId,
    /// Variant title (combination of option values).
    pub title: String,
    /// Selected options, in the product's declaration order.
    pub selected_options: Vec<SelectedOption>,
    /// Unit price.
    pub price: Money,
    /// Parent product.
    pub product: Product,
}

impl Merchandise {
    /// Variant title suitable for display, or `None` for the default variant.
    #[must_use]
    pub fn variant_title(&self) -> Option<&str> {
        if self.title == DEFAULT_OPTION || self.title.is_empty() {
            None
        } else {
            Some(&self.title)
        }
    }

    /// Options that distinguish this variant from its siblings.
    pub fn distinguishing_options(&self) -> impl Iterator<Item = &SelectedOption> {
        self.selected_options.iter().filter(|o| !o.is_default())
    }
}
