//! Session-related types.
//!
//! Values the storefront keeps in the visitor's session.

/// Session keys.
pub mod keys {
    /// Key for storing the backend cart ID.
    pub const CART_ID: &str = "cart_id";

    /// Key for the visitor's theme preference.
    pub const THEME: &str = "theme";
}
