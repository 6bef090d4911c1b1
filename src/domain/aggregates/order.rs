//! Order Aggregate

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;
use crate::domain::aggregates::cart::{Cart, LineKind};
use crate::domain::value_objects::Money;
use crate::domain::events::{DomainEvent, OrderEvent};

#[derive(Clone, Debug, Serialize)]
pub struct Order {
    id: Uuid,
    order_number: String,
    session_id: String,
    email: String,
    status: OrderStatus,
    fulfillment: FulfillmentStatus,
    payment: PaymentStatus,
    items: Vec<LineItem>,
    subtotal: Money,
    shipping: Money,
    total: Money,
    shipping_address: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

#[derive(Clone, Debug, Serialize)]
pub struct LineItem { pub id: Uuid, pub line_key: String, pub kind: LineKind, pub product_id: i64, pub name: String, pub quantity: u32, pub unit_price: Money, pub total: Money }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus { #[default] Pending, Confirmed, Processing, Shipped, Delivered, Cancelled }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentStatus { #[default] Unfulfilled, Fulfilled }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus { #[default] Pending, Paid, Voided }

macro_rules! status_str {
    ($ty:ty { $($variant:ident => $s:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str { match self { $(Self::$variant => $s),+ } }
        }
    };
}

status_str!(OrderStatus { Pending => "pending", Confirmed => "confirmed", Processing => "processing", Shipped => "shipped", Delivered => "delivered", Cancelled => "cancelled" });
status_str!(FulfillmentStatus { Unfulfilled => "unfulfilled", Fulfilled => "fulfilled" });
status_str!(PaymentStatus { Pending => "pending", Paid => "paid", Voided => "voided" });

impl Order {
    /// Places an order for every line in `cart`.
    pub fn from_cart(cart: &Cart, email: impl Into<String>, shipping_address: serde_json::Value) -> Result<Self, OrderError> {
        if cart.is_empty() { return Err(OrderError::NoItems); }
        let id = Uuid::now_v7();
        let now = Utc::now();
        let currency = cart.currency();
        let items = cart.items().iter().map(|i| LineItem {
            id: Uuid::now_v7(), line_key: i.line_key.clone(), kind: i.kind, product_id: i.product_id, name: i.name.clone(),
            quantity: i.quantity, unit_price: i.unit_price.clone(), total: i.line_total(),
        }).collect();
        let mut order = Self {
            id, order_number: format!("ORD-{}", &id.simple().to_string()[20..].to_uppercase()),
            session_id: cart.session_id().to_string(), email: email.into(),
            status: OrderStatus::Pending, fulfillment: FulfillmentStatus::Unfulfilled, payment: PaymentStatus::Pending,
            items, subtotal: Money::zero(currency), shipping: Money::zero(currency), total: Money::zero(currency),
            shipping_address, created_at: now, updated_at: now, events: vec![],
        };
        order.recalculate();
        order.raise_event(DomainEvent::Order(OrderEvent::Placed { order_id: id, session_id: order.session_id.clone(), total: order.total.amount() }));
        Ok(order)
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn order_number(&self) -> &str { &self.order_number }
    pub fn session_id(&self) -> &str { &self.session_id }
    pub fn email(&self) -> &str { &self.email }
    pub fn status(&self) -> OrderStatus { self.status }
    pub fn payment_status(&self) -> PaymentStatus { self.payment }
    pub fn fulfillment_status(&self) -> FulfillmentStatus { self.fulfillment }
    pub fn subtotal(&self) -> &Money { &self.subtotal }
    pub fn total(&self) -> &Money { &self.total }
    pub fn items(&self) -> &[LineItem] { &self.items }
    pub fn shipping_address(&self) -> &serde_json::Value { &self.shipping_address }

    pub fn confirm(&mut self) -> Result<(), OrderError> {
        if self.status != OrderStatus::Pending { return Err(OrderError::InvalidTransition { from: self.status, to: OrderStatus::Confirmed }); }
        self.status = OrderStatus::Confirmed;
        self.touch();
        self.raise_event(DomainEvent::Order(OrderEvent::Confirmed { order_id: self.id, total: self.total.amount() }));
        Ok(())
    }

    pub fn mark_paid(&mut self) -> Result<(), OrderError> {
        if self.status != OrderStatus::Confirmed { return Err(OrderError::InvalidTransition { from: self.status, to: OrderStatus::Processing }); }
        self.payment = PaymentStatus::Paid;
        self.status = OrderStatus::Processing;
        self.touch();
        self.raise_event(DomainEvent::Order(OrderEvent::Paid { order_id: self.id }));
        Ok(())
    }

    pub fn ship(&mut self, tracking: Option<String>) -> Result<(), OrderError> {
        if self.status != OrderStatus::Processing { return Err(OrderError::InvalidTransition { from: self.status, to: OrderStatus::Shipped }); }
        self.status = OrderStatus::Shipped;
        self.fulfillment = FulfillmentStatus::Fulfilled;
        self.touch();
        self.raise_event(DomainEvent::Order(OrderEvent::Shipped { order_id: self.id, tracking }));
        Ok(())
    }

    pub fn deliver(&mut self) -> Result<(), OrderError> {
        if self.status != OrderStatus::Shipped { return Err(OrderError::InvalidTransition { from: self.status, to: OrderStatus::Delivered }); }
        self.status = OrderStatus::Delivered;
        self.touch();
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<(), OrderError> {
        if matches!(self.status, OrderStatus::Delivered | OrderStatus::Cancelled) { return Err(OrderError::CannotCancel); }
        if self.payment == PaymentStatus::Pending { self.payment = PaymentStatus::Voided; }
        self.status = OrderStatus::Cancelled;
        self.touch();
        self.raise_event(DomainEvent::Order(OrderEvent::Cancelled { order_id: self.id }));
        Ok(())
    }

    fn recalculate(&mut self) {
        self.subtotal = self.items.iter().fold(Money::zero(self.subtotal.currency()), |acc, i| acc.add(&i.total).unwrap_or(acc));
        self.total = self.subtotal.add(&self.shipping).unwrap_or(self.subtotal.clone());
        self.touch();
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderError {
    #[error("order has no items")]
    NoItems,
    #[error("order cannot be cancelled")]
    CannotCancel,
    #[error("cannot move order from {} to {}", .from.as_str(), .to.as_str())]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::cart::CartItem;
    use crate::domain::aggregates::product::{Gate, Product};
    use crate::domain::value_objects::SessionId;
    use rust_decimal::Decimal;

    fn cart() -> Cart {
        let mut cart = Cart::new(SessionId::new("sess-9").unwrap(), "USD");
        cart.add_item(CartItem::for_gate(&Gate::new(Product::new(1, "Widget Gate", 76.0, 10.0), 2.0), 2, "USD")).unwrap();
        cart
    }

    #[test]
    fn test_order_workflow() {
        let mut order = Order::from_cart(&cart(), "test@example.com", serde_json::json!({})).unwrap();
        assert_eq!(order.total().amount(), Decimal::new(20, 0));
        assert!(order.order_number().starts_with("ORD-"));
        order.confirm().unwrap();
        assert_eq!(order.status(), OrderStatus::Confirmed);
        order.mark_paid().unwrap();
        order.ship(None).unwrap();
        assert_eq!(order.status(), OrderStatus::Shipped);
        order.deliver().unwrap();
        assert_eq!(order.cancel(), Err(OrderError::CannotCancel));
        assert_eq!(order.take_events().len(), 4);
    }
    #[test]
    fn test_empty_cart_rejected() {
        let empty = Cart::new(SessionId::new("sess-0").unwrap(), "USD");
        assert_eq!(Order::from_cart(&empty, "a@b.co", serde_json::Value::Null).err(), Some(OrderError::NoItems));
    }
    #[test]
    fn test_cancel_voids_pending_payment() {
        let mut order = Order::from_cart(&cart(), "test@example.com", serde_json::json!({})).unwrap();
        assert!(order.mark_paid().is_err());
        order.cancel().unwrap();
        assert_eq!(order.payment_status(), PaymentStatus::Voided);
    }
}
