//! Core types for the storefront cart.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod catalog;
pub mod id;
pub mod money;

pub use cart::{Cart, CartCost, CartLine, CartLineCost};
pub use catalog::{DEFAULT_OPTION, Image, Merchandise, Product, SelectedOption};
pub use id::*;
pub use money::{CurrencyCode, Money, MoneyError};
