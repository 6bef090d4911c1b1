//! Cart Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::domain::aggregates::bundle::Bundle;
use crate::domain::aggregates::product::{Extension, Gate};
use crate::domain::value_objects::{Money, SessionId};

#[derive(Clone, Debug, Serialize)]
pub struct Cart {
    session_id: SessionId,
    items: Vec<CartItem>,
    subtotal: Money,
    currency: String,
    updated_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind { Gate, Extension, Bundle }

impl LineKind {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Gate => "gate", Self::Extension => "extension", Self::Bundle => "bundle" }
    }
    pub fn parse(value: &str) -> Option<Self> {
        match value { "gate" => Some(Self::Gate), "extension" => Some(Self::Extension), "bundle" => Some(Self::Bundle), _ => None }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct CartItem {
    pub line_key: String,
    pub kind: LineKind,
    /// Gate id for gate and bundle lines, extension id otherwise.
    pub product_id: i64,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Money,
    /// Built composition, present on bundle lines.
    pub bundle: Option<Bundle>,
}

impl CartItem {
    pub fn for_gate(gate: &Gate, quantity: u32, currency: &str) -> Self {
        Self {
            line_key: format!("gate:{}", gate.id()), kind: LineKind::Gate, product_id: gate.id(), name: gate.name().to_string(),
            quantity, unit_price: Money::from_catalog_price(gate.product.price, currency), bundle: None,
        }
    }

    pub fn for_extension(extension: &Extension, quantity: u32, currency: &str) -> Self {
        Self {
            line_key: format!("extension:{}", extension.id()), kind: LineKind::Extension, product_id: extension.id(),
            name: extension.name().to_string(), quantity, unit_price: Money::from_catalog_price(extension.product.price, currency), bundle: None,
        }
    }

    /// Expects a bundle whose metadata has been computed.
    pub fn for_bundle(bundle: &Bundle, quantity: u32, currency: &str) -> Self {
        Self {
            line_key: bundle.line_key(), kind: LineKind::Bundle, product_id: bundle.gate.id(), name: bundle.name.clone(),
            quantity, unit_price: Money::from_catalog_price(bundle.price, currency), bundle: Some(bundle.clone()),
        }
    }

    pub fn line_total(&self) -> Money { self.unit_price.multiply(self.quantity) }
}

impl Cart {
    pub fn new(session_id: SessionId, currency: &str) -> Self {
        Self { session_id, items: vec![], subtotal: Money::zero(currency), currency: currency.to_string(), updated_at: Utc::now() }
    }

    /// Rebuilds a cart from stored lines, merging duplicates.
    pub fn restore(session_id: SessionId, currency: &str, items: impl IntoIterator<Item = CartItem>) -> Self {
        let mut cart = Self::new(session_id, currency);
        for item in items { cart.merge(item); }
        cart.recalculate();
        cart
    }

    pub fn session_id(&self) -> &SessionId { &self.session_id }
    pub fn currency(&self) -> &str { &self.currency }
    pub fn items(&self) -> &[CartItem] { &self.items }
    pub fn subtotal(&self) -> &Money { &self.subtotal }
    pub fn item_count(&self) -> usize { self.items.len() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    pub fn add_item(&mut self, item: CartItem) -> Result<(), CartError> {
        if item.quantity == 0 { return Err(CartError::InvalidQuantity); }
        if item.unit_price.currency() != self.currency { return Err(CartError::CurrencyMismatch); }
        self.merge(item);
        self.recalculate();
        Ok(())
    }

    pub fn update_quantity(&mut self, line_key: &str, quantity: u32) -> Result<(), CartError> {
        let item = self.items.iter_mut().find(|i| i.line_key == line_key).ok_or(CartError::ItemNotFound)?;
        if quantity == 0 { self.items.retain(|i| i.line_key != line_key); }
        else { item.quantity = quantity; }
        self.recalculate();
        Ok(())
    }

    pub fn remove_item(&mut self, line_key: &str) -> Result<(), CartError> {
        let before = self.items.len();
        self.items.retain(|i| i.line_key != line_key);
        if self.items.len() == before { return Err(CartError::ItemNotFound); }
        self.recalculate();
        Ok(())
    }

    fn merge(&mut self, item: CartItem) {
        if let Some(existing) = self.items.iter_mut().find(|i| i.line_key == item.line_key) {
            existing.quantity = existing.quantity.saturating_add(item.quantity);
            existing.name = item.name;
            existing.unit_price = item.unit_price;
            existing.bundle = item.bundle;
        } else {
            self.items.push(item);
        }
    }

    fn recalculate(&mut self) {
        self.subtotal = self.items.iter().fold(Money::zero(&self.currency), |acc, i| acc.add(&i.line_total()).unwrap_or(acc));
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CartError {
    #[error("item not found")]
    ItemNotFound,
    #[error("quantity must be at least 1")]
    InvalidQuantity,
    #[error("currency mismatch")]
    CurrencyMismatch,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::product::Product;
    use rust_decimal::Decimal;

    fn session() -> SessionId { SessionId::new("sess-1").unwrap() }
    fn gate() -> Gate { Gate::new(Product::new(1, "Easy Close", 76.0, 40.0), 2.0) }

    #[test]
    fn test_cart_operations() {
        let mut cart = Cart::new(session(), "USD");
        cart.add_item(CartItem::for_gate(&gate(), 2, "USD")).unwrap();
        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.subtotal().amount(), Decimal::new(80, 0));
        cart.add_item(CartItem::for_gate(&gate(), 1, "USD")).unwrap();
        assert_eq!(cart.items()[0].quantity, 3); // Merged
        cart.update_quantity("gate:1", 0).unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.remove_item("gate:1"), Err(CartError::ItemNotFound));
    }
    #[test]
    fn test_update_quantity_reprices_line() {
        let mut cart = Cart::new(session(), "USD");
        cart.add_item(CartItem::for_gate(&gate(), 1, "USD")).unwrap();
        cart.update_quantity("gate:1", 3).unwrap();
        assert_eq!(cart.subtotal().amount(), Decimal::new(120, 0));
        assert_eq!(cart.update_quantity("gate:9", 1), Err(CartError::ItemNotFound));
        cart.remove_item("gate:1").unwrap();
        assert!(cart.is_empty());
    }
    #[test]
    fn test_readding_takes_current_price() {
        let mut cart = Cart::new(session(), "USD");
        cart.add_item(CartItem::for_gate(&gate(), 1, "USD")).unwrap();
        let repriced = Gate::new(Product::new(1, "Easy Close", 76.0, 45.0), 2.0);
        cart.add_item(CartItem::for_gate(&repriced, 1, "USD")).unwrap();
        assert_eq!(cart.items()[0].quantity, 2);
        assert_eq!(cart.items()[0].unit_price.amount(), Decimal::new(45, 0));
        assert_eq!(cart.subtotal().amount(), Decimal::new(90, 0));
    }
    #[test]
    fn test_bundle_line() {
        let mut bundle = Bundle::around(gate());
        bundle.place(&Extension::new(Product::new(9, "Ext 32", 32.0, 15.0)));
        bundle.name = "Easy Close and 1 extension.".into();
        bundle.price = 55.0;
        let mut cart = Cart::new(session(), "USD");
        cart.add_item(CartItem::for_bundle(&bundle, 1, "USD")).unwrap();
        let line = &cart.items()[0];
        assert_eq!(line.kind, LineKind::Bundle);
        assert_eq!(line.line_key, "bundle:1:9x1");
        assert_eq!(cart.subtotal().amount(), Decimal::new(55, 0));
    }
    #[test]
    fn test_rejects_bad_lines() {
        let mut cart = Cart::new(session(), "USD");
        assert_eq!(cart.add_item(CartItem::for_gate(&gate(), 0, "USD")), Err(CartError::InvalidQuantity));
        assert_eq!(cart.add_item(CartItem::for_gate(&gate(), 1, "EUR")), Err(CartError::CurrencyMismatch));
    }
    #[test]
    fn test_restore_merges_duplicates() {
        let cart = Cart::restore(session(), "USD", vec![CartItem::for_gate(&gate(), 1, "USD"), CartItem::for_gate(&gate(), 2, "USD")]);
        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.subtotal().amount(), Decimal::new(120, 0));
    }
}
