//! Integration tests for the cart panel routes.

use std::sync::Arc;

use axum::http::StatusCode;
use storefront_cart_core::MerchandiseId;

use storefront_cart::backend::MemoryBackend;
use storefront_cart_integration_tests::{
    APPLE_HAT, BANANA_SHIRT_MEDIUM, BANANA_SHIRT_SMALL, BASE_URL, TestClient, demo_backend,
    test_app,
};

fn client() -> (Arc<MemoryBackend>, TestClient) {
    let backend = Arc::new(demo_backend());
    let client = TestClient::new(test_app(backend.clone()));
    (backend, client)
}

// ============================================================================
// Page & Fragments
// ============================================================================

#[tokio::test]
async fn test_health() {
    let (_backend, mut client) = client();
    let resp = client.get("/health").await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body, "ok");
}

#[tokio::test]
async fn test_empty_cart_page() {
    let (backend, mut client) = client();

    let resp = client.get("/cart").await;

    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains("Your cart is empty."));
    assert!(resp.body.contains(r#"data-theme="light""#));
    assert!(resp.body.contains("Toggle dark mode"));
    assert_eq!(backend.create_calls(), 0);
}

#[tokio::test]
async fn test_empty_count() {
    let (_backend, mut client) = client();
    let resp = client.get("/cart/count").await;
    assert!(resp.body.contains(r#"<span id="cart-count"></span>"#));
}

// ============================================================================
// Mutations
// ============================================================================

#[tokio::test]
async fn test_add_renders_panel_and_triggers_update() {
    let (backend, mut client) = client();

    let resp = client
        .post_form("/cart/add", &[("merchandise_id", APPLE_HAT)])
        .await;

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.header("hx-trigger"), Some("cart-updated"));
    assert!(resp.body.contains("Apple Hat"));
    assert!(resp.body.contains("$18.00"));
    assert!(resp.body.contains("Calculated at checkout"));
    assert!(resp.body.contains("Proceed to Checkout"));
    assert!(resp.body.contains(r#"href="/product/apple-hat""#));
    assert_eq!(backend.create_calls(), 1);

    assert!(resp.body.contains("$18.00 USD"));

    let count = client.get("/cart/count").await;
    assert!(count.body.contains(">1</span>"));

    let page = client.get("/cart").await;
    assert!(page.body.contains(">1</span>"));
}

#[tokio::test]
async fn test_cart_survives_between_requests() {
    let (backend, mut client) = client();
    client
        .post_form("/cart/add", &[("merchandise_id", APPLE_HAT)])
        .await;
    client
        .post_form("/cart/add", &[("merchandise_id", APPLE_HAT)])
        .await;

    let resp = client.get("/cart/panel").await;

    assert!(resp.body.contains("$36.00"));
    assert_eq!(backend.create_calls(), 1);
}

#[tokio::test]
async fn test_update_to_zero_empties_cart() {
    let (_backend, mut client) = client();
    client
        .post_form("/cart/add", &[("merchandise_id", APPLE_HAT)])
        .await;
    let resp = client
        .post_form(
            "/cart/update",
            &[("merchandise_id", APPLE_HAT), ("action", "plus")],
        )
        .await;
    assert!(resp.body.contains("$36.00"));

    client
        .post_form(
            "/cart/update",
            &[("merchandise_id", APPLE_HAT), ("action", "minus")],
        )
        .await;
    let resp = client
        .post_form(
            "/cart/update",
            &[("merchandise_id", APPLE_HAT), ("action", "minus")],
        )
        .await;

    assert!(resp.body.contains("Your cart is empty."));
}

#[tokio::test]
async fn test_concurrent_adds_in_one_session_share_one_cart() {
    let (backend, mut client) = client();
    client.post_form("/theme/toggle", &[]).await;
    let (mut tab_a, mut tab_b) = (client.fork(), client.fork());

    let (a, b) = tokio::join!(
        tab_a.post_form("/cart/add", &[("merchandise_id", APPLE_HAT)]),
        tab_b.post_form("/cart/add", &[("merchandise_id", BANANA_SHIRT_SMALL)]),
    );

    assert_eq!(a.status, StatusCode::OK);
    assert_eq!(b.status, StatusCode::OK);
    assert_eq!(backend.create_calls(), 1);

    let resp = client.get("/cart/panel").await;
    assert!(resp.body.contains("Apple Hat"));
    assert!(resp.body.contains("Banana Shirt"));
}

#[tokio::test]
async fn test_set_quantity_requires_quantity() {
    let (_backend, mut client) = client();
    let resp = client
        .post_form(
            "/cart/update",
            &[("merchandise_id", APPLE_HAT), ("action", "set")],
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_set_quantity() {
    let (_backend, mut client) = client();
    client
        .post_form("/cart/add", &[("merchandise_id", APPLE_HAT)])
        .await;

    let resp = client
        .post_form(
            "/cart/update",
            &[
                ("merchandise_id", APPLE_HAT),
                ("action", "set"),
                ("quantity", "4"),
            ],
        )
        .await;

    assert!(resp.body.contains("$72.00"));
}

#[tokio::test]
async fn test_remove_line() {
    let (_backend, mut client) = client();
    client
        .post_form("/cart/add", &[("merchandise_id", APPLE_HAT)])
        .await;

    let resp = client
        .post_form("/cart/remove", &[("line_id", "gid://storefront/CartLine/1")])
        .await;
    assert!(resp.body.contains("Your cart is empty."));

    // Already gone
    let resp = client
        .post_form("/cart/remove", &[("line_id", "gid://storefront/CartLine/1")])
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(!resp.body.contains("role=\"alert\""));
}

#[tokio::test]
async fn test_unknown_merchandise() {
    let (backend, mut client) = client();
    let resp = client
        .post_form("/cart/add", &[("merchandise_id", "gid://storefront/ProductVariant/999")])
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(backend.create_calls(), 0);
}

#[tokio::test]
async fn test_rejected_add_shows_notice_and_reverts() {
    let backend = Arc::new(demo_backend().with_stock_limit(MerchandiseId::new(APPLE_HAT), 1));
    let mut client = TestClient::new(test_app(backend));
    client
        .post_form("/cart/add", &[("merchandise_id", APPLE_HAT)])
        .await;

    let resp = client
        .post_form("/cart/add", &[("merchandise_id", APPLE_HAT)])
        .await;

    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains("role=\"alert\""));
    assert!(resp.body.contains("Only 1 of this item"));
    assert!(resp.body.contains("$18.00"));
    assert!(!resp.body.contains("$36.00"));
}

// ============================================================================
// Display
// ============================================================================

#[tokio::test]
async fn test_lines_sorted_by_title() {
    let (_backend, mut client) = client();
    client
        .post_form("/cart/add", &[("merchandise_id", BANANA_SHIRT_SMALL)])
        .await;
    let resp = client
        .post_form("/cart/add", &[("merchandise_id", APPLE_HAT)])
        .await;

    let apple = resp.body.find("Apple Hat").unwrap();
    let banana = resp.body.find("Banana Shirt").unwrap();
    assert!(apple < banana);
}

#[tokio::test]
async fn test_variant_url_and_title() {
    let (_backend, mut client) = client();
    let resp = client
        .post_form("/cart/add", &[("merchandise_id", BANANA_SHIRT_MEDIUM)])
        .await;

    assert!(resp.body.contains("/product/banana-shirt?size=M&#38;color=Yellow"));
    assert!(resp.body.contains("M / Yellow"));
    assert!(resp.body.contains("A yellow shirt with a banana print"));
}

#[tokio::test]
async fn test_last_known_cart_shown_when_backend_down() {
    let (backend, mut client) = client();
    client
        .post_form("/cart/add", &[("merchandise_id", APPLE_HAT)])
        .await;
    backend.set_available(false);

    let resp = client.get("/cart/panel").await;

    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains("Apple Hat"));
}

// ============================================================================
// Checkout
// ============================================================================

#[tokio::test]
async fn test_checkout_redirects_and_clears_cart() {
    let (_backend, mut client) = client();
    client
        .post_form("/cart/add", &[("merchandise_id", APPLE_HAT)])
        .await;

    let resp = client.post_form("/cart/checkout", &[]).await;

    assert!(resp.status.is_redirection());
    let location = resp.header("location").unwrap();
    assert!(location.starts_with(&format!("{BASE_URL}/checkouts/")));

    let resp = client.get("/cart/panel").await;
    assert!(resp.body.contains("Your cart is empty."));
}

#[tokio::test]
async fn test_checkout_without_cart_returns_to_cart() {
    let (_backend, mut client) = client();
    let resp = client.post_form("/cart/checkout", &[]).await;
    assert!(resp.status.is_redirection());
    assert_eq!(resp.header("location"), Some("/cart"));
}

#[tokio::test]
async fn test_failed_checkout_keeps_cart() {
    let (backend, mut client) = client();
    client
        .post_form("/cart/add", &[("merchandise_id", APPLE_HAT)])
        .await;
    backend.set_available(false);

    let resp = client.post_form("/cart/checkout", &[]).await;
    assert_eq!(resp.header("location"), Some("/cart"));

    backend.set_available(true);
    let resp = client.get("/cart/panel").await;
    assert!(resp.body.contains("Apple Hat"));
}

// ============================================================================
// Theme
// ============================================================================

#[tokio::test]
async fn test_theme_toggle_cycles() {
    let (_backend, mut client) = client();

    let resp = client.post_form("/theme/toggle", &[]).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains(r#"data-theme="dark""#));
    assert!(resp.body.contains("icon-sun"));

    let resp = client.post_form("/theme/toggle", &[]).await;
    assert!(resp.body.contains(r#"data-theme="light""#));
    assert!(resp.body.contains("icon-moon"));

    let page = client.get("/cart").await;
    assert!(page.body.contains(r#"<html lang="en" data-theme="light">"#));
}
