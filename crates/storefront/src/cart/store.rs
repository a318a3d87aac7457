//! Optimistic cart store.
//!
//! Holds the cart the shopper sees. Mutations apply to the visible snapshot
//! immediately and are remembered as pending until the backend answers.
//! The snapshot is always the last confirmed cart with the still-pending
//! mutations replayed on top, so settling one mutation (either way) never
//! loses another in flight.
//!
//! ```text
//! Idle -> Pending (optimistic value visible) -> Confirmed | Reverted
//! ```

use storefront_cart_core::{Cart, CartCost, CartLine, CartLineId, Merchandise, MerchandiseId};

/// How to change a line's quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityUpdate {
    /// One more unit.
    Increment,
    /// One fewer unit; reaching zero removes the line.
    Decrement,
    /// An exact quantity; zero removes the line.
    Set(u32),
}

impl QuantityUpdate {
    /// The quantity a line ends up with, starting from `current`.
    #[must_use]
    pub const fn resolve(self, current: u32) -> u32 {
        match self {
            Self::Increment => current.saturating_add(1),
            Self::Decrement => current.saturating_sub(1),
            Self::Set(quantity) => quantity,
        }
    }
}

/// A cart mutation as the shopper triggered it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartAction {
    /// Add one unit of a variant.
    AddItem {
        merchandise: Merchandise,
        /// ID used if the variant needs a new line.
        line_id: CartLineId,
    },
    /// Change the quantity of the line holding a variant.
    UpdateQuantity {
        merchandise_id: MerchandiseId,
        update: QuantityUpdate,
    },
    /// Delete a line.
    RemoveItem { line_id: CartLineId },
}

impl CartAction {
    /// Apply the action to a cart, recomputing line cost and aggregates.
    pub fn apply(&self, cart: &mut Option<Cart>) {
        match self {
            Self::AddItem {
                merchandise,
                line_id,
            } => {
                let currency = merchandise.price.currency_code;
                let cart = cart.get_or_insert_with(|| Cart::empty(None, currency));
                if cart.is_empty() && cart.cost.total_tax.is_zero() {
                    cart.cost = CartCost::zero(currency);
                }
                match cart.line_for_merchandise_mut(&merchandise.id) {
                    Some(line) => line.set_quantity(line.quantity.saturating_add(1)),
                    None => cart
                        .lines
                        .push(CartLine::new(line_id.clone(), merchandise.clone(), 1)),
                }
                cart.recompute_totals();
            }
            Self::UpdateQuantity {
                merchandise_id,
                update,
            } => {
                let Some(cart) = cart.as_mut() else {
                    return;
                };
                let Some(line) = cart.line_for_merchandise_mut(merchandise_id) else {
                    tracing::debug!(%merchandise_id, "No line to update, skipping");
                    return;
                };
                let quantity = update.resolve(line.quantity);
                if quantity == 0 {
                    cart.lines
                        .retain(|line| &line.merchandise.id != merchandise_id);
                } else {
                    line.set_quantity(quantity);
                }
                cart.recompute_totals();
            }
            Self::RemoveItem { line_id } => {
                if let Some(cart) = cart.as_mut() {
                    cart.lines.retain(|line| &line.id != line_id);
                    cart.recompute_totals();
                }
            }
        }
    }
}

/// Handle for one pending mutation. Later mutations get larger tickets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MutationTicket(u64);

/// How a pending mutation was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// The backend cart was adopted as the new confirmed base.
    Confirmed,
    /// The backend accepted the mutation, but a newer confirmation already
    /// replaced the base, so this answer was discarded.
    Superseded,
    /// The mutation was rolled back.
    Reverted,
}

#[derive(Debug, Clone)]
struct PendingMutation {
    ticket: MutationTicket,
    action: CartAction,
}

/// The client-visible cart and its pending mutations.
#[derive(Debug, Clone, Default)]
pub struct OptimisticCart {
    confirmed: Option<Cart>,
    pending: Vec<PendingMutation>,
    snapshot: Option<Cart>,
    next_ticket: u64,
    /// Tickets below this are older than the confirmed base.
    stale_below: u64,
}

impl OptimisticCart {
    /// Start from a backend-confirmed cart (or none).
    #[must_use]
    pub fn new(confirmed: Option<Cart>) -> Self {
        Self {
            snapshot: confirmed.clone(),
            confirmed,
            ..Self::default()
        }
    }

    /// The cart to render.
    #[must_use]
    pub const fn snapshot(&self) -> Option<&Cart> {
        self.snapshot.as_ref()
    }

    /// The last cart the backend confirmed.
    #[must_use]
    pub const fn confirmed(&self) -> Option<&Cart> {
        self.confirmed.as_ref()
    }

    /// Whether no mutation is waiting on the backend.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }

    /// Whether a mutation is still waiting on the backend.
    #[must_use]
    pub fn is_pending(&self, ticket: MutationTicket) -> bool {
        self.pending.iter().any(|p| p.ticket == ticket)
    }

    /// Number of mutations waiting on the backend.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Add one unit of `merchandise`.
    ///
    /// Increments the existing line for the same variant, or appends a new
    /// line priced at the variant's unit price.
    pub fn add_item(&mut self, merchandise: Merchandise) -> MutationTicket {
        self.record(CartAction::AddItem {
            merchandise,
            line_id: CartLineId::optimistic(),
        })
    }

    /// Change the quantity of the line holding `merchandise_id`.
    pub fn update_item_quantity(
        &mut self,
        merchandise_id: MerchandiseId,
        update: QuantityUpdate,
    ) -> MutationTicket {
        self.record(CartAction::UpdateQuantity {
            merchandise_id,
            update,
        })
    }

    /// Delete a line. Nothing happens if it is already gone.
    pub fn remove_item(&mut self, line_id: CartLineId) -> MutationTicket {
        self.record(CartAction::RemoveItem { line_id })
    }

    /// Settle a mutation with the cart the backend returned for it.
    pub fn confirm(&mut self, ticket: MutationTicket, cart: Cart) -> Settlement {
        self.take_pending(ticket);

        if ticket.0 < self.stale_below {
            tracing::debug!(?ticket, "Discarding confirmation older than the current base");
            self.rebuild();
            return Settlement::Superseded;
        }

        self.confirmed = Some(cart);
        self.stale_below = ticket.0 + 1;
        self.rebuild();
        Settlement::Confirmed
    }

    /// Roll a mutation back.
    pub fn revert(&mut self, ticket: MutationTicket) -> Settlement {
        if self.take_pending(ticket).is_none() {
            return Settlement::Superseded;
        }
        self.rebuild();
        Settlement::Reverted
    }

    /// Adopt a freshly fetched cart verbatim, dropping every pending mutation.
    pub fn refresh(&mut self, cart: Option<Cart>) {
        self.confirmed = cart;
        self.pending.clear();
        self.stale_below = self.next_ticket;
        self.rebuild();
    }

    /// Adopt a new confirmed base while keeping pending mutations.
    ///
    /// Used when a cart is created or re-fetched on behalf of mutations that
    /// have not been sent yet.
    pub fn establish(&mut self, cart: Cart) {
        self.confirmed = Some(cart);
        self.rebuild();
    }

    /// Forget the cart entirely (checkout consumed it).
    pub fn discard(&mut self) {
        self.refresh(None);
    }

    fn record(&mut self, action: CartAction) -> MutationTicket {
        let ticket = MutationTicket(self.next_ticket);
        self.next_ticket += 1;
        action.apply(&mut self.snapshot);
        self.pending.push(PendingMutation { ticket, action });
        ticket
    }

    fn take_pending(&mut self, ticket: MutationTicket) -> Option<CartAction> {
        let index = self.pending.iter().position(|p| p.ticket == ticket)?;
        Some(self.pending.remove(index).action)
    }

    fn rebuild(&mut self) {
        let mut snapshot = self.confirmed.clone();
        for pending in &self.pending {
            if pending.ticket.0 >= self.stale_below {
                pending.action.apply(&mut snapshot);
            }
        }
        self.snapshot = snapshot;
    }
}
