//! Storefront cart library.
//!
//! An optimistic shopping cart over a commerce backend, served as an HTMX
//! cart panel with a light/dark theme toggle. Provided as a library so the
//! store, controller and routes can be tested and reused.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod cart;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
pub mod ui;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the storefront router with sessions and request tracing.
pub fn app(state: AppState) -> Router {
    let session_layer = middleware::create_session_layer(state.config());

    routes::routes()
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
