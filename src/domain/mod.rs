//! Storefront domain: catalog products, bundles, carts and orders.
pub mod aggregates;
pub mod events;
pub mod services;
pub mod value_objects;
