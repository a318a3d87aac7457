//! Application state shared across handlers.

use std::sync::Arc;

use moka::future::Cache;
use tower_sessions::Session;
use tower_sessions::session::Id as SessionId;

use storefront_cart_core::{Cart, CartId};

use crate::backend::CartBackend;
use crate::cart::{CartController, CartCreationGate, CartIdentityStore, SessionCartIdentity};
use crate::config::StorefrontConfig;

/// Maximum number of carts kept in the last known cart cache.
const CART_CACHE_CAPACITY: u64 = 10_000;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the backend, configuration, the last known cart cache and the per-session
/// cart creation gates.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    backend: Arc<dyn CartBackend>,
    last_known: Cache<CartId, Cart>,
    creation_gates: Cache<SessionId, Arc<CartCreationGate>>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: StorefrontConfig, backend: Arc<dyn CartBackend>) -> Self {
        let last_known = Cache::builder()
            .max_capacity(CART_CACHE_CAPACITY)
            .time_to_live(config.cart_cache_ttl)
            .build();
        let creation_gates = Cache::builder()
            .max_capacity(CART_CACHE_CAPACITY)
            .time_to_idle(config.cart_cache_ttl)
            .build();

        Self {
            inner: Arc::new(AppStateInner {
                config,
                backend,
                last_known,
                creation_gates,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the commerce backend.
    #[must_use]
    pub fn backend(&self) -> &Arc<dyn CartBackend> {
        &self.inner.backend
    }

    /// Build a cart controller for the visitor owning `session`.
    ///
    /// The controller starts from the last cart the backend confirmed for
    /// the session's cart, if it is still cached. Controllers built for the
    /// same session share one cart creation gate.
    pub async fn cart_controller(&self, session: Session) -> CartController {
        let gate = match session.id() {
            Some(session_id) => {
                self.inner
                    .creation_gates
                    .get_with(session_id, async { Arc::default() })
                    .await
            }
            None => Arc::default(),
        };
        let identity = SessionCartIdentity::new(session);
        let last_known = match identity.load().await {
            Ok(Some(cart_id)) => self.inner.last_known.get(&cart_id).await,
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read cart identity from session");
                None
            }
        };

        CartController::new(
            self.inner.backend.clone(),
            Arc::new(identity),
            self.inner.config.currency,
        )
        .with_creation_gate(gate)
        .with_last_known(last_known)
    }

    /// Remember the cart the backend last confirmed.
    pub async fn remember_cart(&self, cart: Option<&Cart>) {
        if let Some(cart) = cart
            && let Some(cart_id) = &cart.id
        {
            self.inner.last_known.insert(cart_id.clone(), cart.clone()).await;
        }
    }

    /// Drop a cart from the last known cart cache.
    pub async fn forget_cart(&self, cart_id: &CartId) {
        self.inner.last_known.invalidate(cart_id).await;
    }
}
