//! Cart route handlers.
//!
//! Cart operations use HTMX for dynamic updates without full page reloads.
//! Each mutation is applied optimistically, sent to the backend and settled
//! before the panel is rendered; a rolled-back mutation renders the restored
//! panel with a notice. Cart IDs are stored in the session.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::HeaderMap,
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use storefront_cart_core::{CartLineId, MerchandiseId};

use crate::backend::BackendError;
use crate::cart::{CartController, CartError, CartPanelView, MutationOutcome, QuantityUpdate};
use crate::error::{AppError, Result};
use crate::routes::theme::ui_context;
use crate::state::AppState;
use crate::ui::UiContext;

/// Event fired after every cart mutation so other fragments can refresh.
const CART_UPDATED: (&str, &str) = ("HX-Trigger", "cart-updated");

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub merchandise_id: String,
}

/// How an update changes the quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateAction {
    Plus,
    Minus,
    Set,
}

/// Update cart form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub merchandise_id: String,
    pub action: UpdateAction,
    pub quantity: Option<u32>,
}

impl UpdateCartForm {
    fn quantity_update(&self) -> Result<QuantityUpdate> {
        match self.action {
            UpdateAction::Plus => Ok(QuantityUpdate::Increment),
            UpdateAction::Minus => Ok(QuantityUpdate::Decrement),
            UpdateAction::Set => self
                .quantity
                .map(QuantityUpdate::Set)
                .ok_or_else(|| AppError::BadRequest("quantity is required".to_string())),
        }
    }
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub line_id: String,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub panel: CartPanelView,
    pub ui: UiContext,
    pub notice: Option<String>,
}

/// Cart panel fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_panel.html")]
pub struct CartPanelTemplate {
    pub panel: CartPanelView,
    pub notice: Option<String>,
}

/// Cart count badge fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}

// =============================================================================
// Helpers
// =============================================================================

/// Load the visitor's cart, falling back to the last known cart if the
/// backend cannot be reached.
async fn load_panel(state: &AppState, controller: &CartController) -> CartPanelView {
    match controller.load().await {
        Ok(cart) => {
            state.remember_cart(cart.as_ref()).await;
            CartPanelView::from_snapshot(cart.as_ref())
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load cart, showing last known state");
            CartPanelView::from_snapshot(controller.snapshot().as_ref())
        }
    }
}

/// Make sure the controller knows the current cart before mutating it.
async fn prime(controller: &CartController) {
    if controller.confirmed().is_none()
        && let Err(e) = controller.load().await
    {
        tracing::warn!(error = %e, "Failed to load cart before mutation");
    }
}

/// Message shown to the shopper when a mutation was rolled back.
fn revert_notice(error: &CartError) -> String {
    match error {
        CartError::Backend(BackendError::Rejected { message, .. }) => message.clone(),
        CartError::Backend(BackendError::CartNotFound(_)) => {
            "Your cart has expired. Please try again.".to_string()
        }
        _ => "We couldn't update your cart. Please try again.".to_string(),
    }
}

/// Render the settled panel for a mutation.
async fn settled(state: &AppState, controller: &CartController, outcome: MutationOutcome) -> Response {
    state.remember_cart(controller.confirmed().as_ref()).await;

    let notice = match &outcome {
        MutationOutcome::Confirmed { .. } => None,
        MutationOutcome::Reverted { error, .. } => Some(revert_notice(error)),
    };

    (
        AppendHeaders([CART_UPDATED]),
        CartPanelTemplate {
            panel: CartPanelView::from_snapshot(outcome.cart()),
            notice,
        },
    )
        .into_response()
}

// =============================================================================
// Handlers
// =============================================================================

/// Display cart page with the panel open.
#[instrument(skip(state, session, headers))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
) -> impl IntoResponse {
    let ui = ui_context(&session, &headers).await.with_panel_open();
    let controller = state.cart_controller(session).await;
    let panel = load_panel(&state, &controller).await;

    CartShowTemplate {
        panel,
        ui,
        notice: None,
    }
}

/// Cart panel fragment (HTMX).
#[instrument(skip(state, session))]
pub async fn panel(State(state): State<AppState>, session: Session) -> impl IntoResponse {
    let controller = state.cart_controller(session).await;
    let panel = load_panel(&state, &controller).await;

    CartPanelTemplate {
        panel,
        notice: None,
    }
}

/// Get cart count badge (HTMX).
#[instrument(skip(state, session))]
pub async fn count(State(state): State<AppState>, session: Session) -> impl IntoResponse {
    let controller = state.cart_controller(session).await;
    let count = load_panel(&state, &controller).await.item_count;

    CartCountTemplate { count }
}

/// Add one unit of a variant to the cart (HTMX).
///
/// Creates the cart on first use.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<AddToCartForm>,
) -> Result<Response> {
    let merchandise_id = MerchandiseId::new(form.merchandise_id);
    let merchandise = state
        .backend()
        .merchandise(&merchandise_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("merchandise {merchandise_id}")))?;

    let controller = state.cart_controller(session).await;
    prime(&controller).await;
    let outcome = controller.add_item(merchandise).await;

    Ok(settled(&state, &controller, outcome).await)
}

/// Update cart item quantity (HTMX).
#[instrument(skip(state, session))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<UpdateCartForm>,
) -> Result<Response> {
    let update = form.quantity_update()?;

    let controller = state.cart_controller(session).await;
    prime(&controller).await;
    let outcome = controller
        .update_item_quantity(MerchandiseId::new(form.merchandise_id), update)
        .await;

    Ok(settled(&state, &controller, outcome).await)
}

/// Remove item from cart (HTMX).
#[instrument(skip(state, session))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RemoveFromCartForm>,
) -> Response {
    let controller = state.cart_controller(session).await;
    prime(&controller).await;
    let outcome = controller.remove_item(CartLineId::new(form.line_id)).await;

    settled(&state, &controller, outcome).await
}

/// Redirect to the backend's hosted checkout.
///
/// On failure the shopper is sent back to the cart, which is left as it was.
#[instrument(skip(state, session))]
pub async fn checkout(State(state): State<AppState>, session: Session) -> Response {
    let controller = state.cart_controller(session).await;
    prime(&controller).await;
    let cart_id = controller.confirmed().and_then(|cart| cart.id);

    match controller.checkout().await {
        Ok(redirect) => {
            if let Some(cart_id) = &cart_id {
                state.forget_cart(cart_id).await;
            }
            Redirect::to(&redirect.url).into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Checkout unavailable, returning to cart");
            Redirect::to("/cart").into_response()
        }
    }
}
