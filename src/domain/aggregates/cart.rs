//! Cart Aggregate
//!
//! Session-scoped list of product snapshots with quantities. Lines snapshot
//! the product (id, name, price, image, category) so later catalog edits
//! never alter a cart or the order frozen from it.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Flat delivery fee in FCFA, charged on every non-empty order.
pub const SHIPPING_FEE: i64 = 2000;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: Uuid,
    pub name: String,
    pub price: i64,
    pub image: String,
    pub category: String,
    pub quantity: u32,
}

impl CartLine {
    pub fn line_total(&self) -> i64 {
        self.price * i64::from(self.quantity)
    }
}

#[derive(Clone, Debug, Default)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_lines(lines: Vec<CartLine>) -> Self {
        let mut cart = Self::new();
        for line in lines {
            cart.add_line(line);
        }
        cart
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Adds a line, merging quantities when the product is already present.
    /// A line can never enter the cart with quantity zero.
    pub fn add_line(&mut self, line: CartLine) {
        if line.quantity == 0 {
            return;
        }
        if let Some(existing) = self
            .lines
            .iter_mut()
            .find(|l| l.product_id == line.product_id)
        {
            existing.quantity = existing.quantity.saturating_add(line.quantity);
        } else {
            self.lines.push(line);
        }
    }

    /// Sets a line's quantity. Quantity below one removes the line; this is
    /// the explicit form of the storefront's decrement-to-zero behavior.
    pub fn set_quantity(&mut self, product_id: Uuid, quantity: u32) {
        if quantity == 0 {
            self.lines.retain(|l| l.product_id != product_id);
        } else if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product_id) {
            line.quantity = quantity;
        }
    }

    pub fn remove_line(&mut self, product_id: Uuid) {
        self.lines.retain(|l| l.product_id != product_id);
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn subtotal(&self) -> i64 {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Shipping is zero iff the cart is empty, else the flat fee.
    pub fn shipping(&self) -> i64 {
        if self.lines.is_empty() {
            0
        } else {
            SHIPPING_FEE
        }
    }

    pub fn total(&self) -> i64 {
        self.subtotal() + self.shipping()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: Uuid, price: i64, quantity: u32) -> CartLine {
        CartLine {
            product_id: id,
            name: "Article".into(),
            price,
            image: String::new(),
            category: "Vêtements".into(),
            quantity,
        }
    }

    #[test]
    fn test_totals() {
        let mut cart = Cart::new();
        cart.add_line(line(Uuid::now_v7(), 15000, 2));
        cart.add_line(line(Uuid::now_v7(), 7000, 1));
        assert_eq!(cart.subtotal(), 37000);
        assert_eq!(cart.shipping(), 2000);
        assert_eq!(cart.total(), 39000);
    }

    #[test]
    fn test_empty_cart_has_no_shipping() {
        let cart = Cart::new();
        assert_eq!(cart.shipping(), 0);
        assert_eq!(cart.total(), 0);
    }

    #[test]
    fn test_add_merges_quantities() {
        let id = Uuid::now_v7();
        let mut cart = Cart::new();
        cart.add_line(line(id, 5000, 2));
        cart.add_line(line(id, 5000, 1));
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity, 3);
    }

    #[test]
    fn test_quantity_below_one_removes_line() {
        let id = Uuid::now_v7();
        let mut cart = Cart::new();
        cart.add_line(line(id, 5000, 1));
        cart.set_quantity(id, 0);
        assert!(cart.is_empty());
        // zero-quantity lines never enter either
        cart.add_line(line(id, 5000, 0));
        assert!(cart.is_empty());
    }
}
