//! Storefront Cart Core - Shared types library.
//!
//! This crate provides the types shared by the cart components:
//! - `storefront` - Optimistic cart store, backend capability and panel surface
//! - `integration-tests` - End-to-end tests against the in-memory backend
//!
//! # Architecture
//!
//! The core crate contains only types and pure computations - no I/O, no
//! backend access, no HTTP. This keeps it lightweight and allows it to be
//! used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, money, catalog projections and the cart model

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
