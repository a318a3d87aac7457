//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Health check
//!
//! # Cart (HTMX fragments)
//! GET  /cart                   - Cart page with the panel open
//! GET  /cart/panel             - Cart panel fragment
//! GET  /cart/count             - Cart count badge (fragment)
//! POST /cart/add               - Add to cart (returns cart_panel fragment, triggers cart-updated)
//! POST /cart/update            - Update quantity (returns cart_panel fragment)
//! POST /cart/remove            - Remove item (returns cart_panel fragment)
//! POST /cart/checkout          - Redirect to hosted checkout
//!
//! # Theme
//! POST /theme/toggle           - Flip light/dark (returns theme_toggle fragment)
//! ```

pub mod cart;
pub mod theme;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/panel", get(cart::panel))
        .route("/count", get(cart::count))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/checkout", post(cart::checkout))
}

/// Create all storefront routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .nest("/cart", cart_routes())
        .route("/theme/toggle", post(theme::toggle))
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}
