//! Optimistic cart state and its reconciliation with the backend.
//!
//! - [`store`]: the visible snapshot and its pending mutations
//! - [`controller`]: dispatches mutations to the backend and settles them
//! - [`identity`]: where the cart ID survives between visits
//! - [`view`]: display derivation for the panel

pub mod controller;
pub mod identity;
pub mod store;
pub mod view;

pub use controller::{CartController, CartCreationGate, CartError, MutationOutcome};
pub use identity::{CartIdentityStore, IdentityError, MemoryCartIdentity, SessionCartIdentity};
pub use store::{CartAction, MutationTicket, OptimisticCart, QuantityUpdate, Settlement};
pub use view::{CartLineView, CartPanelView, locale_cmp, merchandise_url, sorted_lines};
