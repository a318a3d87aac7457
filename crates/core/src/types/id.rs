//! Newtype IDs for type-safe entity references.
//!
//! Commerce backends hand out opaque string identifiers (for Shopify these
//! are global IDs such as `gid://shopify/Cart/abc`). Use the `define_id!`
//! macro to create wrappers that prevent accidentally mixing IDs from
//! different entity types.

use uuid::Uuid;

/// Macro to define a type-safe string ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`
/// - Conversion methods: `new()`, `as_str()`
/// - `From<String>`, `From<&str>` and `Into<String>` implementations
///
/// # Example
///
/// ```rust
/// # use storefront_cart_core::define_id;
/// define_id!(WishlistId);
/// define_id!(OrderId);
///
/// let wishlist_id = WishlistId::new("w-1");
/// let order_id = OrderId::new("w-1");
///
/// // These are different types, so this won't compile:
/// // let _: WishlistId = order_id;
/// # let _ = (wishlist_id, order_id);
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(CartId);
define_id!(CartLineId);
define_id!(MerchandiseId);
define_id!(ProductId);

/// Prefix for line IDs minted locally before the backend assigns one.
const OPTIMISTIC_LINE_PREFIX: &str = "optimistic-line:";

impl CartLineId {
    /// Mint a fresh line ID for a line that exists only optimistically.
    #[must_use]
    pub fn optimistic() -> Self {
        Self(format!("{OPTIMISTIC_LINE_PREFIX}{}", Uuid::new_v4()))
    }

    /// Whether this ID was minted locally and is unknown to the backend.
    #[must_use]
    pub fn is_optimistic(&self) -> bool {
        self.0.starts_with(OPTIMISTIC_LINE_PREFIX)
    }
}
