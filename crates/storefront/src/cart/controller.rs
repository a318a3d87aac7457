//! Drives the optimistic store against the commerce backend.
//!
//! Each mutation is applied to the store first, then sent to the backend,
//! then settled: the backend's cart is adopted on success and the mutation
//! is rolled back on failure. The store lock is never held across a
//! backend call.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tracing::instrument;

use storefront_cart_core::{Cart, CartId, CartLineId, CurrencyCode, Merchandise, MerchandiseId};

use super::identity::{CartIdentityStore, IdentityError};
use super::store::{MutationTicket, OptimisticCart, QuantityUpdate, Settlement};
use crate::backend::{BackendError, CartBackend, CheckoutRedirect};
use crate::error::add_breadcrumb;

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The commerce backend failed or refused the operation.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// The stored cart identity could not be read or written.
    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    /// There is no cart to operate on.
    #[error("No cart")]
    NoCart,
}

/// Result of a mutation once the backend has answered.
#[derive(Debug)]
pub enum MutationOutcome {
    /// The backend accepted the mutation.
    Confirmed {
        /// The cart to show now.
        cart: Option<Cart>,
    },
    /// The mutation failed and was rolled back.
    Reverted {
        /// Why the mutation failed.
        error: CartError,
        /// The cart to show now.
        cart: Option<Cart>,
    },
}

impl MutationOutcome {
    /// The cart to show after settlement.
    #[must_use]
    pub const fn cart(&self) -> Option<&Cart> {
        match self {
            Self::Confirmed { cart } | Self::Reverted { cart, .. } => cart.as_ref(),
        }
    }

    /// Whether the mutation was rolled back.
    #[must_use]
    pub const fn is_reverted(&self) -> bool {
        matches!(self, Self::Reverted { .. })
    }
}

/// Serializes cart creation for one shopper and remembers the cart it made.
///
/// Controllers serving the same shopper share one gate, so a cart is created
/// at most once even when their requests race. The remembered ID covers
/// callers whose identity store was read before the cart existed.
#[derive(Debug, Default)]
pub struct CartCreationGate {
    created: tokio::sync::Mutex<Option<CartId>>,
}

impl CartCreationGate {
    /// Forget the remembered cart, e.g. after checkout.
    pub async fn forget(&self) {
        self.created.lock().await.take();
    }
}

/// Owns one shopper's optimistic cart and talks to the backend for it.
pub struct CartController {
    backend: Arc<dyn CartBackend>,
    identity: Arc<dyn CartIdentityStore>,
    store: Mutex<OptimisticCart>,
    creation: Arc<CartCreationGate>,
    currency: CurrencyCode,
}

impl CartController {
    /// Create a controller with no cart loaded yet.
    ///
    /// `currency` prices carts created before the backend reports any cost.
    #[must_use]
    pub fn new(
        backend: Arc<dyn CartBackend>,
        identity: Arc<dyn CartIdentityStore>,
        currency: CurrencyCode,
    ) -> Self {
        Self {
            backend,
            identity,
            store: Mutex::new(OptimisticCart::default()),
            creation: Arc::default(),
            currency,
        }
    }

    /// Share cart creation with other controllers for the same shopper.
    #[must_use]
    pub fn with_creation_gate(mut self, gate: Arc<CartCreationGate>) -> Self {
        self.creation = gate;
        self
    }

    /// Seed the store with the last cart the backend confirmed.
    #[must_use]
    pub fn with_last_known(self, cart: Option<Cart>) -> Self {
        self.store().refresh(cart);
        self
    }

    /// The cart to render right now, including pending mutations.
    #[must_use]
    pub fn snapshot(&self) -> Option<Cart> {
        self.store().snapshot().cloned()
    }

    /// The last cart the backend confirmed.
    #[must_use]
    pub fn confirmed(&self) -> Option<Cart> {
        self.store().confirmed().cloned()
    }

    /// Whether mutations are still waiting on the backend.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.store().is_idle()
    }

    fn store(&self) -> MutexGuard<'_, OptimisticCart> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The confirmed cart, if the backend has assigned it an identity.
    fn confirmed_with_id(&self) -> Option<(CartId, Cart)> {
        let store = self.store();
        let cart = store.confirmed()?;
        cart.id.clone().map(|id| (id, cart.clone()))
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Fetch the stored cart from the backend and adopt it verbatim.
    ///
    /// Returns `None` when no cart identity is stored, or the stored cart
    /// expired (in which case the identity is cleared).
    ///
    /// # Errors
    ///
    /// Returns an error if the identity cannot be read or the backend fails.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<Option<Cart>, CartError> {
        let Some(cart_id) = self.identity.load().await? else {
            self.store().refresh(None);
            return Ok(None);
        };

        let cart = self.backend.get_cart(&cart_id).await?;
        if cart.is_none() {
            tracing::info!(cart_id = %cart_id, "Stored cart no longer exists");
            self.identity.clear().await?;
        }
        self.store().refresh(cart.clone());
        Ok(cart)
    }

    /// Return the current cart, creating one on the backend if needed.
    ///
    /// Concurrent callers share a single creation, across every controller
    /// holding the same [`CartCreationGate`]: the backend is asked for a new
    /// cart at most once.
    ///
    /// # Errors
    ///
    /// Returns an error if the identity store fails or the backend cannot
    /// create a cart.
    #[instrument(skip(self))]
    pub async fn get_or_create_cart(&self) -> Result<Cart, CartError> {
        if let Some((_, cart)) = self.confirmed_with_id() {
            return Ok(cart);
        }

        let mut created = self.creation.created.lock().await;
        if let Some((_, cart)) = self.confirmed_with_id() {
            return Ok(cart);
        }

        let stored = self.identity.load().await?;
        let known = stored.clone().or_else(|| created.clone());
        if let Some(cart_id) = known {
            match self.backend.get_cart(&cart_id).await {
                Ok(Some(cart)) => {
                    if stored.is_none() {
                        self.identity.save(&cart_id).await?;
                    }
                    self.store().establish(cart.clone());
                    return Ok(cart);
                }
                Ok(None) => {
                    tracing::info!(cart_id = %cart_id, "Stored cart expired, creating a new one");
                    if stored.is_some() {
                        self.identity.clear().await?;
                    }
                }
                Err(e) => {
                    tracing::warn!(cart_id = %cart_id, error = %e, "Could not load stored cart, creating a new one");
                }
            }
        }

        let cart_id = self.backend.create_cart().await?;
        self.identity.save(&cart_id).await?;
        *created = Some(cart_id.clone());
        tracing::info!(cart_id = %cart_id, "Created cart");

        let cart = Cart::empty(Some(cart_id), self.currency);
        self.store().establish(cart.clone());
        Ok(cart)
    }

    async fn cart_id(&self) -> Result<CartId, CartError> {
        self.get_or_create_cart().await?.id.ok_or(CartError::NoCart)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add one unit of a variant.
    #[instrument(skip(self, merchandise), fields(merchandise_id = %merchandise.id))]
    pub async fn add_item(&self, merchandise: Merchandise) -> MutationOutcome {
        let merchandise_id = merchandise.id.clone();
        let ticket = self.store().add_item(merchandise);

        let result = match self.cart_id().await {
            Ok(cart_id) => self
                .backend
                .add_line_item(&cart_id, &merchandise_id, 1)
                .await
                .map_err(CartError::from),
            Err(e) => Err(e),
        };
        self.settle(ticket, result).await
    }

    /// Change the quantity of the line holding a variant.
    ///
    /// A resulting quantity of zero removes the line.
    #[instrument(skip(self), fields(merchandise_id = %merchandise_id))]
    pub async fn update_item_quantity(
        &self,
        merchandise_id: MerchandiseId,
        update: QuantityUpdate,
    ) -> MutationOutcome {
        let (ticket, target) = {
            let mut store = self.store();
            let current = store
                .snapshot()
                .and_then(|cart| cart.line_for_merchandise(&merchandise_id))
                .map(|line| line.quantity);
            let Some(current) = current else {
                return MutationOutcome::Confirmed {
                    cart: store.snapshot().cloned(),
                };
            };
            let ticket = store.update_item_quantity(merchandise_id.clone(), update);
            (ticket, update.resolve(current))
        };

        let result = match self.cart_id().await {
            Ok(cart_id) => self
                .set_backend_quantity(&cart_id, &merchandise_id, target)
                .await
                .map_err(CartError::from),
            Err(e) => Err(e),
        };
        self.settle(ticket, result).await
    }

    /// Delete a line. A line that is already gone is not an error.
    #[instrument(skip(self), fields(line_id = %line_id))]
    pub async fn remove_item(&self, line_id: CartLineId) -> MutationOutcome {
        let (ticket, merchandise_id) = {
            let mut store = self.store();
            let merchandise_id = store
                .snapshot()
                .and_then(|cart| cart.line(&line_id))
                .map(|line| line.merchandise.id.clone());
            let Some(merchandise_id) = merchandise_id else {
                tracing::debug!("Line already removed");
                return MutationOutcome::Confirmed {
                    cart: store.snapshot().cloned(),
                };
            };
            (store.remove_item(line_id.clone()), merchandise_id)
        };

        let result = match self.cart_id().await {
            Ok(cart_id) if line_id.is_optimistic() => self
                .set_backend_quantity(&cart_id, &merchandise_id, 0)
                .await
                .map_err(CartError::from),
            Ok(cart_id) => self
                .backend
                .remove_line_item(&cart_id, &line_id)
                .await
                .map_err(CartError::from),
            Err(e) => Err(e),
        };
        self.settle(ticket, result).await
    }

    /// Hand the cart over to checkout.
    ///
    /// On success the cart identity is discarded. On failure local state is
    /// left untouched; retrying is up to the shopper.
    ///
    /// # Errors
    ///
    /// Returns `CartError::NoCart` if no cart is stored, or the backend error.
    #[instrument(skip(self))]
    pub async fn checkout(&self) -> Result<CheckoutRedirect, CartError> {
        let Some(cart_id) = self.identity.load().await? else {
            return Err(CartError::NoCart);
        };

        match self.backend.checkout(&cart_id).await {
            Ok(redirect) => {
                self.identity.clear().await?;
                self.creation.forget().await;
                self.store().discard();
                tracing::info!(cart_id = %cart_id, "Cart handed over to checkout");
                Ok(redirect)
            }
            Err(e) => {
                tracing::error!(cart_id = %cart_id, error = %e, "Checkout failed");
                Err(e.into())
            }
        }
    }

    // =========================================================================
    // Reconciliation
    // =========================================================================

    /// Bring the backend line for a variant to `quantity`, resolving the
    /// line against the backend's current cart.
    async fn set_backend_quantity(
        &self,
        cart_id: &CartId,
        merchandise_id: &MerchandiseId,
        quantity: u32,
    ) -> Result<Cart, BackendError> {
        let Some(cart) = self.backend.get_cart(cart_id).await? else {
            return Err(BackendError::CartNotFound(cart_id.clone()));
        };

        match cart.line_for_merchandise(merchandise_id) {
            Some(line) if quantity == 0 => self.backend.remove_line_item(cart_id, &line.id).await,
            Some(line) => {
                self.backend
                    .update_line_item(cart_id, &line.id, quantity)
                    .await
            }
            None if quantity > 0 => {
                self.backend
                    .add_line_item(cart_id, merchandise_id, quantity)
                    .await
            }
            None => Ok(cart),
        }
    }

    async fn settle(
        &self,
        ticket: MutationTicket,
        result: Result<Cart, CartError>,
    ) -> MutationOutcome {
        match result {
            Ok(cart) => {
                let (settlement, snapshot) = {
                    let mut store = self.store();
                    let settlement = store.confirm(ticket, cart);
                    (settlement, store.snapshot().cloned())
                };
                if settlement == Settlement::Superseded {
                    tracing::debug!(?ticket, "Confirmation superseded by a newer one");
                }
                MutationOutcome::Confirmed { cart: snapshot }
            }
            Err(error) => {
                if let CartError::Backend(BackendError::CartNotFound(cart_id)) = &error {
                    tracing::info!(cart_id = %cart_id, "Cart expired, forgetting it");
                    if let Err(e) = self.identity.clear().await {
                        tracing::warn!(error = %e, "Failed to clear stored cart identity");
                    }
                    self.creation.forget().await;
                    self.store().refresh(None);
                } else {
                    self.store().revert(ticket);
                }

                tracing::warn!(?ticket, error = %error, "Cart mutation reverted");
                add_breadcrumb(
                    "cart",
                    "Optimistic cart mutation reverted",
                    Some(&[("error", &error.to_string())]),
                );
                MutationOutcome::Reverted {
                    error,
                    cart: self.snapshot(),
                }
            }
        }
    }
}
