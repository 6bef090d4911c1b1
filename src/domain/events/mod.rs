//! Domain events
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "aggregate", rename_all = "snake_case")]
pub enum DomainEvent {
    Order(OrderEvent),
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OrderEvent {
    Placed { order_id: Uuid, session_id: String, total: Decimal },
    Confirmed { order_id: Uuid, total: Decimal },
    Paid { order_id: Uuid },
    Shipped { order_id: Uuid, tracking: Option<String> },
    Cancelled { order_id: Uuid },
}

impl DomainEvent {
    /// NATS subject the event is published on.
    pub fn subject(&self) -> String {
        match self {
            Self::Order(e) => {
                let name = match e {
                    OrderEvent::Placed { .. } => "placed",
                    OrderEvent::Confirmed { .. } => "confirmed",
                    OrderEvent::Paid { .. } => "paid",
                    OrderEvent::Shipped { .. } => "shipped",
                    OrderEvent::Cancelled { .. } => "cancelled",
                };
                format!("gatestore.order.{name}")
            }
        }
    }
}
