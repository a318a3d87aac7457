//! Integration tests for the storefront cart.
//!
//! Everything runs in process against the in-memory backend: the router is
//! driven with `tower::ServiceExt::oneshot`, carrying the session cookie
//! from one request to the next like a browser would.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p storefront-cart-integration-tests
//! ```

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{HeaderMap, Request, StatusCode, header};
use rust_decimal::Decimal;
use tower::ServiceExt;

use storefront_cart::backend::catalog::demo_catalog;
use storefront_cart::backend::{CartBackend, MemoryBackend};
use storefront_cart::config::StorefrontConfig;
use storefront_cart::state::AppState;
use storefront_cart_core::{CurrencyCode, Merchandise, MerchandiseId};

/// Public URL the test storefront pretends to be served from.
pub const BASE_URL: &str = "http://localhost:3000";

/// Demo catalog variant without options ("Apple Hat", $18.00).
pub const APPLE_HAT: &str = "gid://storefront/ProductVariant/1";

/// Demo catalog variant "Banana Shirt" in S / Yellow ($32.00).
pub const BANANA_SHIRT_SMALL: &str = "gid://storefront/ProductVariant/2";

/// Demo catalog variant "Banana Shirt" in M / Yellow ($32.00).
pub const BANANA_SHIRT_MEDIUM: &str = "gid://storefront/ProductVariant/3";

/// Configuration for tests.
#[must_use]
pub fn test_config() -> StorefrontConfig {
    StorefrontConfig {
        host: [127, 0, 0, 1].into(),
        port: 3000,
        base_url: BASE_URL.to_string(),
        currency: CurrencyCode::USD,
        tax_rate: Decimal::ZERO,
        catalog_path: None,
        cart_cache_ttl: Duration::from_secs(300),
        sentry_dsn: None,
        sentry_environment: None,
    }
}

/// In-memory backend stocked with the demo catalog.
#[must_use]
pub fn demo_backend() -> MemoryBackend {
    MemoryBackend::new(CurrencyCode::USD)
        .with_checkout_base_url(BASE_URL)
        .with_catalog(demo_catalog(CurrencyCode::USD))
}

/// Look up a demo catalog variant.
///
/// # Panics
///
/// Panics if the id is not part of the demo catalog.
#[must_use]
pub fn demo_merchandise(id: &str) -> Merchandise {
    let id = MerchandiseId::new(id);
    demo_catalog(CurrencyCode::USD)
        .into_iter()
        .find(|m| m.id == id)
        .expect("unknown demo merchandise")
}

/// Build the storefront router over a backend.
#[must_use]
pub fn test_app(backend: Arc<MemoryBackend>) -> Router {
    let backend: Arc<dyn CartBackend> = backend;
    storefront_cart::app(AppState::new(test_config(), backend))
}

/// Response captured from the router.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    /// Value of a response header, if present.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// A browser-like client: keeps the session cookie between requests.
pub struct TestClient {
    app: Router,
    cookie: Option<String>,
}

impl TestClient {
    /// Create a client with no session yet.
    #[must_use]
    pub const fn new(app: Router) -> Self {
        Self { app, cookie: None }
    }

    /// A second client sharing this one's session cookie, like another tab
    /// of the same browser.
    #[must_use]
    pub fn fork(&self) -> Self {
        Self {
            app: self.app.clone(),
            cookie: self.cookie.clone(),
        }
    }

    /// Send a GET request.
    pub async fn get(&mut self, uri: &str) -> TestResponse {
        let request = self.request("GET", uri).body(Body::empty());
        self.send(request.expect("valid request")).await
    }

    /// Send a POST request with a form body.
    pub async fn post_form(&mut self, uri: &str, fields: &[(&str, &str)]) -> TestResponse {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        let request = self
            .request("POST", uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body));
        self.send(request.expect("valid request")).await
    }

    fn request(&self, method: &str, uri: &str) -> axum::http::request::Builder {
        let builder = Request::builder().method(method).uri(uri);
        match &self.cookie {
            Some(cookie) => builder.header(header::COOKIE, cookie),
            None => builder,
        }
    }

    async fn send(&mut self, request: Request<Body>) -> TestResponse {
        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        if let Some(set_cookie) = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            && let Some(pair) = set_cookie.split(';').next()
        {
            self.cookie = Some(pair.to_string());
        }

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("readable body");

        TestResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }
}
