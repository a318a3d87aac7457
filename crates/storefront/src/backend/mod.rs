//! Commerce backend capability.
//!
//! # Architecture
//!
//! - The backend is the source of truth for carts - the storefront only
//!   holds an optimistic projection of it
//! - Access goes through the [`CartBackend`] trait so reconciliation can be
//!   exercised without a network
//! - [`MemoryBackend`] is an in-process implementation used by tests and by
//!   the development server
//!
//! # Example
//!
//! ```rust,ignore
//! use storefront_cart::backend::{CartBackend, MemoryBackend};
//!
//! let backend = MemoryBackend::new(CurrencyCode::USD).with_merchandise(tee);
//!
//! let cart_id = backend.create_cart().await?;
//! let cart = backend.add_line_item(&cart_id, &tee_id, 1).await?;
//! ```

pub mod catalog;
mod memory;

pub use memory::MemoryBackend;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use storefront_cart_core::{Cart, CartId, CartLineId, Merchandise, MerchandiseId};

/// Errors that can occur when talking to the commerce backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The cart expired or was consumed by checkout.
    #[error("Cart not found: {0}")]
    CartNotFound(CartId),

    /// The backend refused the mutation (e.g., not enough stock).
    #[error("Rejected: {message}")]
    Rejected {
        /// Machine-readable error code, when the backend provides one.
        code: Option<String>,
        /// Human-readable error message.
        message: String,
    },

    /// The backend could not be reached or failed internally.
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

impl BackendError {
    /// Create a rejection with an error code.
    #[must_use]
    pub fn rejected(code: &str, message: impl Into<String>) -> Self {
        Self::Rejected {
            code: Some(code.to_string()),
            message: message.into(),
        }
    }
}

/// Where to send the shopper to complete checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRedirect {
    /// Hosted checkout URL.
    pub url: String,
}

/// Cart operations offered by the commerce backend.
///
/// Every mutation returns the authoritative cart state after the change.
#[async_trait]
pub trait CartBackend: Send + Sync {
    /// Create a new empty cart and return its identity.
    async fn create_cart(&self) -> Result<CartId, BackendError>;

    /// Add `quantity` units of a variant. Not idempotent.
    async fn add_line_item(
        &self,
        cart_id: &CartId,
        merchandise_id: &MerchandiseId,
        quantity: u32,
    ) -> Result<Cart, BackendError>;

    /// Set a line's quantity. A quantity of zero removes the line.
    async fn update_line_item(
        &self,
        cart_id: &CartId,
        line_id: &CartLineId,
        quantity: u32,
    ) -> Result<Cart, BackendError>;

    /// Remove a line.
    async fn remove_line_item(
        &self,
        cart_id: &CartId,
        line_id: &CartLineId,
    ) -> Result<Cart, BackendError>;

    /// Fetch a cart. `None` if it expired or was consumed by checkout.
    async fn get_cart(&self, cart_id: &CartId) -> Result<Option<Cart>, BackendError>;

    /// Hand the cart over to checkout. One-shot: the cart is consumed.
    async fn checkout(&self, cart_id: &CartId) -> Result<CheckoutRedirect, BackendError>;

    /// Look up a purchasable variant.
    async fn merchandise(
        &self,
        merchandise_id: &MerchandiseId,
    ) -> Result<Option<Merchandise>, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_display() {
        let err = BackendError::CartNotFound(CartId::new("gid://storefront/Cart/1"));
        assert_eq!(err.to_string(), "Cart not found: gid://storefront/Cart/1");

        let err = BackendError::rejected("NOT_ENOUGH_IN_STOCK", "Only 2 left");
        assert_eq!(err.to_string(), "Rejected: Only 2 left");

        let err = BackendError::Unavailable("timeout".to_string());
        assert_eq!(err.to_string(), "Backend unavailable: timeout");
    }
}
