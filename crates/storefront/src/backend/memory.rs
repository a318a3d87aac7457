//! In-process commerce backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::instrument;

use storefront_cart_core::{
    Cart, CartId, CartLine, CartLineId, CurrencyCode, Merchandise, MerchandiseId, Money,
};

use super::{BackendError, CartBackend, CheckoutRedirect};

/// Backend that keeps carts and the catalog in memory.
///
/// Prices, tax and stock are enforced here the way a hosted backend would,
/// so the optimistic store can be checked against an authoritative answer.
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
    create_calls: AtomicUsize,
}

struct MemoryState {
    currency: CurrencyCode,
    tax_rate: Decimal,
    checkout_base_url: String,
    available: bool,
    catalog: HashMap<MerchandiseId, Merchandise>,
    stock: HashMap<MerchandiseId, u32>,
    carts: HashMap<CartId, Cart>,
    next_cart: u64,
    next_line: u64,
}

impl MemoryBackend {
    /// Create an empty backend pricing carts in `currency`.
    #[must_use]
    pub fn new(currency: CurrencyCode) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                currency,
                tax_rate: Decimal::ZERO,
                checkout_base_url: "https://checkout.invalid".to_string(),
                available: true,
                catalog: HashMap::new(),
                stock: HashMap::new(),
                carts: HashMap::new(),
                next_cart: 1,
                next_line: 1,
            }),
            create_calls: AtomicUsize::new(0),
        }
    }

    /// Set the tax rate applied to cart subtotals (e.g., 0.08 for 8%).
    #[must_use]
    pub fn with_tax_rate(self, tax_rate: Decimal) -> Self {
        self.state().tax_rate = tax_rate;
        self
    }

    /// Set the base URL that checkout redirects point at.
    #[must_use]
    pub fn with_checkout_base_url(self, url: impl Into<String>) -> Self {
        self.state().checkout_base_url = url.into();
        self
    }

    /// Add a variant to the catalog.
    #[must_use]
    pub fn with_merchandise(self, merchandise: Merchandise) -> Self {
        self.state()
            .catalog
            .insert(merchandise.id.clone(), merchandise);
        self
    }

    /// Add every variant of a catalog.
    #[must_use]
    pub fn with_catalog(self, catalog: impl IntoIterator<Item = Merchandise>) -> Self {
        {
            let mut state = self.state();
            for merchandise in catalog {
                state.catalog.insert(merchandise.id.clone(), merchandise);
            }
        }
        self
    }

    /// Limit how many units of a variant a single cart may hold.
    #[must_use]
    pub fn with_stock_limit(self, merchandise_id: MerchandiseId, available: u32) -> Self {
        self.state().stock.insert(merchandise_id, available);
        self
    }

    /// Simulate an outage: while unavailable every call fails.
    pub fn set_available(&self, available: bool) {
        self.state().available = available;
    }

    /// Drop a cart as if it had expired.
    pub fn expire_cart(&self, cart_id: &CartId) {
        self.state().carts.remove(cart_id);
    }

    /// Number of `create_cart` calls received so far.
    #[must_use]
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock the state, failing if the backend is simulating an outage.
    fn available_state(&self) -> Result<MutexGuard<'_, MemoryState>, BackendError> {
        let state = self.state();
        if state.available {
            Ok(state)
        } else {
            Err(BackendError::Unavailable(
                "memory backend is offline".to_string(),
            ))
        }
    }
}

impl MemoryState {
    fn cart_mut(&mut self, cart_id: &CartId) -> Result<&mut Cart, BackendError> {
        self.carts
            .get_mut(cart_id)
            .ok_or_else(|| BackendError::CartNotFound(cart_id.clone()))
    }

    fn check_stock(&self, merchandise_id: &MerchandiseId, quantity: u32) -> Result<(), BackendError> {
        match self.stock.get(merchandise_id) {
            Some(&available) if quantity > available => Err(BackendError::rejected(
                "NOT_ENOUGH_IN_STOCK",
                format!("Only {available} of this item can be added to your cart"),
            )),
            _ => Ok(()),
        }
    }

    /// Recompute line costs, tax and totals the way the backend prices a cart.
    fn reprice(&mut self, cart_id: &CartId) -> Result<Cart, BackendError> {
        let tax_rate = self.tax_rate;
        let cart = self.cart_mut(cart_id)?;
        cart.recompute_totals();
        let tax = (cart.cost.subtotal.amount * tax_rate).round_dp(2);
        cart.cost.total_tax = Money::new(tax, cart.currency_code());
        cart.recompute_totals();
        Ok(cart.clone())
    }

    fn mint_line_id(&mut self) -> CartLineId {
        let id = CartLineId::new(format!("gid://storefront/CartLine/{}", self.next_line));
        self.next_line += 1;
        id
    }
}

#[async_trait]
impl CartBackend for MemoryBackend {
    #[instrument(skip(self))]
    async fn create_cart(&self) -> Result<CartId, BackendError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        // Give concurrent callers a chance to interleave, as a remote call would.
        tokio::task::yield_now().await;

        let mut state = self.available_state()?;
        let cart_id = CartId::new(format!("gid://storefront/Cart/{}", state.next_cart));
        state.next_cart += 1;
        let cart = Cart::empty(Some(cart_id.clone()), state.currency);
        state.carts.insert(cart_id.clone(), cart);
        tracing::debug!(cart_id = %cart_id, "Created cart");
        Ok(cart_id)
    }

    #[instrument(skip(self), fields(cart_id = %cart_id, merchandise_id = %merchandise_id))]
    async fn add_line_item(
        &self,
        cart_id: &CartId,
        merchandise_id: &MerchandiseId,
        quantity: u32,
    ) -> Result<Cart, BackendError> {
        let mut state = self.available_state()?;
        let merchandise = state.catalog.get(merchandise_id).cloned().ok_or_else(|| {
            BackendError::rejected(
                "MERCHANDISE_NOT_FOUND",
                format!("The merchandise with id {merchandise_id} does not exist"),
            )
        })?;

        let existing = state
            .cart_mut(cart_id)?
            .line_for_merchandise(merchandise_id)
            .map_or(0, |line| line.quantity);
        let wanted = existing.saturating_add(quantity);
        state.check_stock(merchandise_id, wanted)?;

        let line_id = state.mint_line_id();
        let cart = state.cart_mut(cart_id)?;
        match cart.line_for_merchandise_mut(merchandise_id) {
            Some(line) => line.set_quantity(wanted),
            None => cart.lines.push(CartLine::new(line_id, merchandise, wanted)),
        }
        state.reprice(cart_id)
    }

    #[instrument(skip(self), fields(cart_id = %cart_id, line_id = %line_id))]
    async fn update_line_item(
        &self,
        cart_id: &CartId,
        line_id: &CartLineId,
        quantity: u32,
    ) -> Result<Cart, BackendError> {
        let mut state = self.available_state()?;
        let merchandise_id = state
            .cart_mut(cart_id)?
            .line(line_id)
            .map(|line| line.merchandise.id.clone())
            .ok_or_else(|| {
                BackendError::rejected("INVALID", format!("Cart line {line_id} does not exist"))
            })?;
        state.check_stock(&merchandise_id, quantity)?;

        let cart = state.cart_mut(cart_id)?;
        if quantity == 0 {
            cart.lines.retain(|line| &line.id != line_id);
        } else if let Some(line) = cart.lines.iter_mut().find(|line| &line.id == line_id) {
            line.set_quantity(quantity);
        }
        state.reprice(cart_id)
    }

    #[instrument(skip(self), fields(cart_id = %cart_id, line_id = %line_id))]
    async fn remove_line_item(
        &self,
        cart_id: &CartId,
        line_id: &CartLineId,
    ) -> Result<Cart, BackendError> {
        let mut state = self.available_state()?;
        state
            .cart_mut(cart_id)?
            .lines
            .retain(|line| &line.id != line_id);
        state.reprice(cart_id)
    }

    #[instrument(skip(self), fields(cart_id = %cart_id))]
    async fn get_cart(&self, cart_id: &CartId) -> Result<Option<Cart>, BackendError> {
        let state = self.available_state()?;
        Ok(state.carts.get(cart_id).cloned())
    }

    #[instrument(skip(self), fields(cart_id = %cart_id))]
    async fn checkout(&self, cart_id: &CartId) -> Result<CheckoutRedirect, BackendError> {
        let mut state = self.available_state()?;
        if state.carts.remove(cart_id).is_none() {
            return Err(BackendError::CartNotFound(cart_id.clone()));
        }
        let token = cart_id
            .as_str()
            .rsplit('/')
            .next()
            .unwrap_or(cart_id.as_str())
            .to_string();
        Ok(CheckoutRedirect {
            url: format!("{}/checkouts/{token}", state.checkout_base_url),
        })
    }

    #[instrument(skip(self), fields(merchandise_id = %merchandise_id))]
    async fn merchandise(
        &self,
        merchandise_id: &MerchandiseId,
    ) -> Result<Option<Merchandise>, BackendError> {
        let state = self.available_state()?;
        Ok(state.catalog.get(merchandise_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_cart_core::{Product, ProductId};

    fn tee() -> Merchandise {
        Merchandise {
            id: MerchandiseId::new("tee-m"),
            title: "M".to_string(),
            selected_options: Vec::new(),
            price: Money::from_cents(2500, CurrencyCode::USD),
            product: Product {
                id: ProductId::new("tee"),
                handle: "tee".to_string(),
                title: "Tee".to_string(),
                featured_image: None,
            },
        }
    }

    #[tokio::test]
    async fn test_add_and_reprice_with_tax() {
        let backend = MemoryBackend::new(CurrencyCode::USD)
            .with_tax_rate(Decimal::new(8, 2))
            .with_merchandise(tee());
        let cart_id = backend.create_cart().await.unwrap();

        let cart = backend
            .add_line_item(&cart_id, &MerchandiseId::new("tee-m"), 2)
            .await
            .unwrap();

        assert_eq!(cart.total_quantity, 2);
        assert_eq!(cart.cost.subtotal, Money::from_cents(5000, CurrencyCode::USD));
        assert_eq!(cart.cost.total_tax, Money::from_cents(400, CurrencyCode::USD));
        assert_eq!(cart.cost.total, Money::from_cents(5400, CurrencyCode::USD));
    }

    #[tokio::test]
    async fn test_adding_same_variant_merges_lines() {
        let backend = MemoryBackend::new(CurrencyCode::USD).with_merchandise(tee());
        let cart_id = backend.create_cart().await.unwrap();
        let id = MerchandiseId::new("tee-m");

        backend.add_line_item(&cart_id, &id, 1).await.unwrap();
        let cart = backend.add_line_item(&cart_id, &id, 1).await.unwrap();

        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.lines[0].quantity, 2);
    }

    #[tokio::test]
    async fn test_stock_limit_rejects() {
        let backend = MemoryBackend::new(CurrencyCode::USD)
            .with_merchandise(tee())
            .with_stock_limit(MerchandiseId::new("tee-m"), 1);
        let cart_id = backend.create_cart().await.unwrap();
        let id = MerchandiseId::new("tee-m");

        backend.add_line_item(&cart_id, &id, 1).await.unwrap();
        let err = backend.add_line_item(&cart_id, &id, 1).await.unwrap_err();
        assert!(matches!(err, BackendError::Rejected { .. }));
    }

    #[tokio::test]
    async fn test_update_to_zero_removes_line() {
        let backend = MemoryBackend::new(CurrencyCode::USD).with_merchandise(tee());
        let cart_id = backend.create_cart().await.unwrap();
        let cart = backend
            .add_line_item(&cart_id, &MerchandiseId::new("tee-m"), 3)
            .await
            .unwrap();
        let line_id = cart.lines[0].id.clone();

        let cart = backend.update_line_item(&cart_id, &line_id, 0).await.unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.total_quantity, 0);
    }

    #[tokio::test]
    async fn test_checkout_consumes_cart() {
        let backend = MemoryBackend::new(CurrencyCode::USD)
            .with_checkout_base_url("https://shop.test");
        let cart_id = backend.create_cart().await.unwrap();

        let redirect = backend.checkout(&cart_id).await.unwrap();
        assert_eq!(redirect.url, "https://shop.test/checkouts/1");
        assert_eq!(backend.get_cart(&cart_id).await.unwrap(), None);
        assert!(matches!(
            backend.checkout(&cart_id).await,
            Err(BackendError::CartNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_unavailable_backend_fails_every_call() {
        let backend = MemoryBackend::new(CurrencyCode::USD);
        backend.set_available(false);
        assert!(matches!(
            backend.create_cart().await,
            Err(BackendError::Unavailable(_))
        ));
        assert_eq!(backend.create_calls(), 1);
    }
}
