//! Bundle value entity: one gate plus a multiset of extensions.

use serde::{Deserialize, Serialize};
use crate::domain::aggregates::product::{Extension, Gate};

/// A gate and the extensions assembled around it.
///
/// Only the builder creates bundles; derived fields stay unset until
/// [`compute_metadata`](crate::domain::services::compute_metadata) runs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    pub gate: Gate,
    /// Distinct extension ids; `product.quantity` carries the count.
    pub extensions: Vec<Extension>,
    pub name: String,
    pub price: f32,
    pub width: f32,
    pub color: String,
    pub image: String,
    pub tolerance: f32,
    pub quantity: u32,
}

impl Bundle {
    /// Starts a bundle around `gate`, clamping its quantity to at least one.
    pub fn around(mut gate: Gate) -> Self {
        gate.product.quantity = gate.product.quantity.max(1);
        Self {
            gate, extensions: vec![], name: String::new(), price: 0.0, width: 0.0,
            color: String::new(), image: String::new(), tolerance: 0.0, quantity: 0,
        }
    }

    /// Adds one unit of `extension`, merging with an existing entry of the same id.
    pub fn place(&mut self, extension: &Extension) {
        if let Some(existing) = self.extensions.iter_mut().find(|e| e.id() == extension.id()) {
            existing.product.quantity = existing.product.quantity.saturating_add(1);
        } else {
            let mut entry = extension.clone();
            entry.product.quantity = 1;
            self.extensions.push(entry);
        }
    }

    /// Total number of extension units.
    pub fn extension_units(&self) -> u32 { self.extensions.iter().map(|e| e.product.quantity).sum() }

    /// Width of the gate and all extension units.
    pub fn component_width(&self) -> f32 {
        let gate = &self.gate.product;
        self.extensions.iter().fold(gate.width * gate.quantity as f32, |acc, e| acc + e.width() * e.product.quantity as f32)
    }

    /// Price of the gate and all extension units.
    pub fn component_price(&self) -> f32 {
        let gate = &self.gate.product;
        self.extensions.iter().fold(gate.price * gate.quantity as f32, |acc, e| acc + e.product.price * e.product.quantity as f32)
    }

    /// Stable identity of the composition, e.g. `bundle:3:12x2,14x1`.
    pub fn line_key(&self) -> String {
        let mut parts: Vec<(i64, u32)> = self.extensions.iter().map(|e| (e.id(), e.product.quantity)).collect();
        parts.sort_unstable();
        let parts: Vec<String> = parts.iter().map(|(id, qty)| format!("{id}x{qty}")).collect();
        format!("bundle:{}:{}", self.gate.id(), parts.join(","))
    }

    /// Whether the total width sits within the gate's tolerance of `desired_width`.
    pub fn fits(&self, desired_width: f32) -> bool {
        (self.component_width() - desired_width).abs() <= self.gate.tolerance
    }
}
