//! Aggregates module
pub mod product;
pub mod bundle;
pub mod order;
pub mod cart;

pub use product::{Extension, Gate, Product};
pub use bundle::Bundle;
pub use order::{Order, OrderError, OrderStatus, PaymentStatus, FulfillmentStatus, LineItem};
pub use cart::{Cart, CartError, CartItem, LineKind};
