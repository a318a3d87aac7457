//! Cart model and aggregate cost recomputation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::catalog::Merchandise;
use super::id::{CartId, CartLineId, MerchandiseId};
use super::money::{CurrencyCode, Money};

/// Cost for a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLineCost {
    /// Price per unit.
    pub amount_per_quantity: Money,
    /// Unit price times quantity.
    pub total_amount: Money,
}

/// A line item in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Cart line ID.
    pub id: CartLineId,
    /// Quantity. Always positive for a line held in a cart.
    pub quantity: u32,
    /// Line cost.
    pub cost: CartLineCost,
    /// Product variant.
    pub merchandise: Merchandise,
}

impl CartLine {
    /// Create a line priced from the merchandise's unit price.
    #[must_use]
    pub fn new(id: CartLineId, merchandise: Merchandise, quantity: u32) -> Self {
        let unit = merchandise.price;
        Self {
            id,
            quantity,
            cost: CartLineCost {
                amount_per_quantity: unit,
                total_amount: unit.times(quantity),
            },
            merchandise,
        }
    }

    /// Change the quantity and recompute the line total.
    pub fn set_quantity(&mut self, quantity: u32) {
        self.quantity = quantity;
        self.cost.total_amount = self.cost.amount_per_quantity.times(quantity);
    }
}

/// Cart cost summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartCost {
    /// Sum of line totals.
    pub subtotal: Money,
    /// Tax estimate reported by the backend.
    pub total_tax: Money,
    /// Subtotal plus tax. Shipping is calculated at checkout.
    pub total: Money,
}

impl CartCost {
    /// All-zero cost in the given currency.
    #[must_use]
    pub const fn zero(currency_code: CurrencyCode) -> Self {
        Self {
            subtotal: Money::zero(currency_code),
            total_tax: Money::zero(currency_code),
            total: Money::zero(currency_code),
        }
    }
}

/// A shopping cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    /// Cart ID. `None` while the cart exists only locally.
    pub id: Option<CartId>,
    /// Cart lines in insertion order.
    pub lines: Vec<CartLine>,
    /// Cart cost summary.
    pub cost: CartCost,
    /// Total item quantity.
    pub total_quantity: u32,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub const fn empty(id: Option<CartId>, currency_code: CurrencyCode) -> Self {
        Self {
            id,
            lines: Vec::new(),
            cost: CartCost::zero(currency_code),
            total_quantity: 0,
        }
    }

    /// The currency the cart is priced in.
    #[must_use]
    pub const fn currency_code(&self) -> CurrencyCode {
        self.cost.subtotal.currency_code
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Find a line by its ID.
    #[must_use]
    pub fn line(&self, line_id: &CartLineId) -> Option<&CartLine> {
        self.lines.iter().find(|line| &line.id == line_id)
    }

    /// Find the line holding a given variant.
    #[must_use]
    pub fn line_for_merchandise(&self, merchandise_id: &MerchandiseId) -> Option<&CartLine> {
        self.lines
            .iter()
            .find(|line| &line.merchandise.id == merchandise_id)
    }

    /// Mutable lookup of the line holding a given variant.
    pub fn line_for_merchandise_mut(
        &mut self,
        merchandise_id: &MerchandiseId,
    ) -> Option<&mut CartLine> {
        self.lines
            .iter_mut()
            .find(|line| &line.merchandise.id == merchandise_id)
    }

    /// Recompute subtotal, total and total quantity from the lines.
    ///
    /// Tax is carried over unchanged: only the backend knows the rate.
    /// Lines priced in a currency other than the cart's are left out of the
    /// subtotal until the backend reprices them.
    pub fn recompute_totals(&mut self) {
        let currency = self.currency_code();

        let mut subtotal = Decimal::ZERO;
        for line in &self.lines {
            if line.cost.total_amount.currency_code == currency {
                subtotal += line.cost.total_amount.amount;
            } else {
                tracing::warn!(
                    line_id = %line.id,
                    line_currency = ?line.cost.total_amount.currency_code,
                    cart_currency = ?currency,
                    "Cart line priced in a different currency, excluded from subtotal"
                );
            }
        }
        self.cost.subtotal = Money::new(subtotal, currency);

        self.cost.total = self
            .cost
            .subtotal
            .checked_add(&self.cost.total_tax)
            .unwrap_or(self.cost.subtotal);

        self.total_quantity = self
            .lines
            .iter()
            .fold(0_u32, |sum, line| sum.saturating_add(line.quantity));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::catalog::Product;
    use crate::types::id::ProductId;

    fn merchandise(id: &str, cents: i64) -> Merchandise {
        Merchandise {
            id: MerchandiseId::new(id),
            title: "Default Title".to_string(),
            selected_options: Vec::new(),
            price: Money::from_cents(cents, CurrencyCode::USD),
            product: Product {
                id: ProductId::new(format!("product-{id}")),
                handle: id.to_string(),
                title: id.to_string(),
                featured_image: None,
            },
        }
    }

    #[test]
    fn test_line_cost_follows_quantity() {
        let mut line = CartLine::new(CartLineId::new("line-1"), merchandise("a", 1000), 1);
        assert_eq!(line.cost.total_amount, Money::from_cents(1000, CurrencyCode::USD));

        line.set_quantity(3);
        assert_eq!(line.cost.total_amount, Money::from_cents(3000, CurrencyCode::USD));
        assert_eq!(
            line.cost.amount_per_quantity,
            Money::from_cents(1000, CurrencyCode::USD)
        );
    }

    #[test]
    fn test_recompute_totals_keeps_tax() {
        let mut cart = Cart::empty(Some(CartId::new("cart-1")), CurrencyCode::USD);
        cart.cost.total_tax = Money::from_cents(150, CurrencyCode::USD);
        cart.lines
            .push(CartLine::new(CartLineId::new("l1"), merchandise("a", 1000), 2));
        cart.lines
            .push(CartLine::new(CartLineId::new("l2"), merchandise("b", 550), 1));

        cart.recompute_totals();

        assert_eq!(cart.total_quantity, 3);
        assert_eq!(cart.cost.subtotal, Money::from_cents(2550, CurrencyCode::USD));
        assert_eq!(cart.cost.total_tax, Money::from_cents(150, CurrencyCode::USD));
        assert_eq!(cart.cost.total, Money::from_cents(2700, CurrencyCode::USD));
    }

    #[test]
    fn test_recompute_totals_skips_foreign_currency_lines() {
        let mut cart = Cart::empty(None, CurrencyCode::USD);
        let mut euro = merchandise("e", 900);
        euro.price = Money::from_cents(900, CurrencyCode::EUR);
        cart.lines
            .push(CartLine::new(CartLineId::new("l1"), merchandise("a", 1000), 1));
        cart.lines.push(CartLine::new(CartLineId::new("l2"), euro, 1));

        cart.recompute_totals();

        assert_eq!(cart.total_quantity, 2);
        assert_eq!(cart.cost.subtotal, Money::from_cents(1000, CurrencyCode::USD));
    }

    #[test]
    fn test_lookup_by_line_and_merchandise() {
        let mut cart = Cart::empty(None, CurrencyCode::USD);
        cart.lines
            .push(CartLine::new(CartLineId::new("l1"), merchandise("a", 1000), 1));

        assert!(cart.line(&CartLineId::new("l1")).is_some());
        assert!(cart.line(&CartLineId::new("missing")).is_none());
        assert!(cart.line_for_merchandise(&MerchandiseId::new("a")).is_some());
        assert!(cart.line_for_merchandise(&MerchandiseId::new("b")).is_none());
    }
}
