//! Integration tests for the cart controller against the in-memory backend.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::Notify;

use storefront_cart::backend::{BackendError, CartBackend, CheckoutRedirect, MemoryBackend};
use storefront_cart::cart::{
    CartController, CartIdentityStore, MemoryCartIdentity, MutationOutcome, QuantityUpdate,
};
use storefront_cart_core::{
    Cart, CartId, CartLineId, CurrencyCode, Merchandise, MerchandiseId, Money,
};
use storefront_cart_integration_tests::{
    APPLE_HAT, BANANA_SHIRT_SMALL, demo_backend, demo_merchandise,
};

fn controller_over(backend: Arc<dyn CartBackend>) -> (Arc<MemoryCartIdentity>, CartController) {
    let identity = Arc::new(MemoryCartIdentity::default());
    let controller = CartController::new(backend, identity.clone(), CurrencyCode::USD);
    (identity, controller)
}

/// Backend whose `add_line_item` waits until the test opens the gate.
struct GatedBackend {
    inner: MemoryBackend,
    gate: Notify,
}

#[async_trait]
impl CartBackend for GatedBackend {
    async fn create_cart(&self) -> Result<CartId, BackendError> {
        self.inner.create_cart().await
    }

    async fn add_line_item(
        &self,
        cart_id: &CartId,
        merchandise_id: &MerchandiseId,
        quantity: u32,
    ) -> Result<Cart, BackendError> {
        self.gate.notified().await;
        self.inner
            .add_line_item(cart_id, merchandise_id, quantity)
            .await
    }

    async fn update_line_item(
        &self,
        cart_id: &CartId,
        line_id: &CartLineId,
        quantity: u32,
    ) -> Result<Cart, BackendError> {
        self.inner.update_line_item(cart_id, line_id, quantity).await
    }

    async fn remove_line_item(
        &self,
        cart_id: &CartId,
        line_id: &CartLineId,
    ) -> Result<Cart, BackendError> {
        self.inner.remove_line_item(cart_id, line_id).await
    }

    async fn get_cart(&self, cart_id: &CartId) -> Result<Option<Cart>, BackendError> {
        self.inner.get_cart(cart_id).await
    }

    async fn checkout(&self, cart_id: &CartId) -> Result<CheckoutRedirect, BackendError> {
        self.inner.checkout(cart_id).await
    }

    async fn merchandise(
        &self,
        merchandise_id: &MerchandiseId,
    ) -> Result<Option<Merchandise>, BackendError> {
        self.inner.merchandise(merchandise_id).await
    }
}

#[tokio::test]
async fn test_snapshot_is_optimistic_while_backend_pending() {
    let backend = Arc::new(GatedBackend {
        inner: demo_backend(),
        gate: Notify::new(),
    });
    let (_identity, controller) = controller_over(backend.clone());

    let observe = async {
        let seen = controller.snapshot();
        let pending = controller.has_pending();
        backend.gate.notify_one();
        (seen, pending)
    };
    let (outcome, (seen, pending)) =
        tokio::join!(controller.add_item(demo_merchandise(APPLE_HAT)), observe);

    let seen = seen.unwrap();
    assert!(pending);
    assert_eq!(seen.total_quantity, 1);
    assert!(seen.id.is_none());
    assert!(seen.lines[0].id.is_optimistic());

    let settled = outcome.cart().unwrap();
    assert!(settled.id.is_some());
    assert!(!settled.lines[0].id.is_optimistic());
    assert!(!controller.has_pending());
}

#[tokio::test]
async fn test_quantity_scenario_with_backend_tax() {
    let backend = Arc::new(demo_backend().with_tax_rate(Decimal::new(10, 2)));
    let (_identity, controller) = controller_over(backend);
    let hat = demo_merchandise(APPLE_HAT);

    controller.add_item(hat.clone()).await;
    let outcome = controller.add_item(hat.clone()).await;
    let cart = outcome.cart().unwrap();
    assert_eq!(cart.lines.len(), 1);
    assert_eq!(cart.total_quantity, 2);
    assert_eq!(cart.cost.subtotal, Money::from_cents(3600, CurrencyCode::USD));
    assert_eq!(cart.cost.total_tax, Money::from_cents(360, CurrencyCode::USD));
    assert_eq!(cart.cost.total, Money::from_cents(3960, CurrencyCode::USD));

    let outcome = controller
        .update_item_quantity(hat.id.clone(), QuantityUpdate::Decrement)
        .await;
    assert_eq!(outcome.cart().unwrap().total_quantity, 1);

    let outcome = controller
        .update_item_quantity(hat.id.clone(), QuantityUpdate::Decrement)
        .await;
    let cart = outcome.cart().unwrap();
    assert!(cart.is_empty());
    assert_eq!(cart.total_quantity, 0);
    assert!(cart.cost.total.is_zero());
}

#[tokio::test]
async fn test_total_quantity_tracks_lines_through_mixed_mutations() {
    let backend = Arc::new(demo_backend());
    let (_identity, controller) = controller_over(backend);
    let hat = demo_merchandise(APPLE_HAT);
    let shirt = demo_merchandise(BANANA_SHIRT_SMALL);

    let outcomes = vec![
        controller.add_item(hat.clone()).await,
        controller.add_item(shirt.clone()).await,
        controller
            .update_item_quantity(shirt.id.clone(), QuantityUpdate::Set(5))
            .await,
        controller.add_item(hat.clone()).await,
        controller
            .update_item_quantity(hat.id.clone(), QuantityUpdate::Decrement)
            .await,
    ];

    for outcome in &outcomes {
        assert!(!outcome.is_reverted());
        let cart = outcome.cart().unwrap();
        let sum: u32 = cart.lines.iter().map(|l| l.quantity).sum();
        assert_eq!(cart.total_quantity, sum);
    }
    assert_eq!(outcomes[4].cart().unwrap().total_quantity, 6);
}

#[tokio::test]
async fn test_unavailable_backend_reverts_to_last_confirmed() {
    let backend = Arc::new(demo_backend());
    let (_identity, controller) = controller_over(backend.clone());
    let hat = demo_merchandise(APPLE_HAT);
    controller.add_item(hat.clone()).await;
    let before = controller.confirmed();
    backend.set_available(false);

    let outcome = controller
        .update_item_quantity(hat.id.clone(), QuantityUpdate::Increment)
        .await;

    match outcome {
        MutationOutcome::Reverted { cart, .. } => assert_eq!(cart, before),
        MutationOutcome::Confirmed { .. } => panic!("expected a revert"),
    }
}

#[tokio::test]
async fn test_removing_optimistic_line_resolves_by_merchandise() {
    let backend = Arc::new(demo_backend());
    let (_identity, controller) = controller_over(backend.clone());
    let hat = demo_merchandise(APPLE_HAT);
    let outcome = controller.add_item(hat).await;
    let cart_id = outcome.cart().unwrap().id.clone().unwrap();

    // Seed a controller whose snapshot only knows the line by an optimistic id.
    let identity = Arc::new(MemoryCartIdentity::with_cart_id(cart_id.clone()));
    let mut stale = backend.get_cart(&cart_id).await.unwrap().unwrap();
    let optimistic_id = CartLineId::optimistic();
    stale.lines[0].id = optimistic_id.clone();
    let other = CartController::new(backend.clone(), identity, CurrencyCode::USD)
        .with_last_known(Some(stale));

    let outcome = other.remove_item(optimistic_id).await;

    assert!(!outcome.is_reverted());
    assert!(outcome.cart().unwrap().is_empty());
    assert!(backend.get_cart(&cart_id).await.unwrap().unwrap().is_empty());
}

#[tokio::test]
async fn test_new_cart_after_checkout() {
    let backend = Arc::new(demo_backend());
    let (identity, controller) = controller_over(backend.clone());
    let hat = demo_merchandise(APPLE_HAT);
    let first = controller.add_item(hat.clone()).await;
    let first_id = first.cart().unwrap().id.clone();

    controller.checkout().await.unwrap();
    assert_eq!(identity.load().await.unwrap(), None);

    let second = controller.add_item(hat).await;
    let second_id = second.cart().unwrap().id.clone();
    assert_ne!(first_id, second_id);
    assert_eq!(backend.create_calls(), 2);
    assert_eq!(second.cart().unwrap().total_quantity, 1);
}
