//! Catalog products: gates and the extensions that widen them.

use serde::{Deserialize, Serialize};

use crate::domain::services::WIDTH_EPSILON;

/// Fields shared by every purchasable unit in the catalog.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    /// Width in centimetres.
    pub width: f32,
    pub price: f32,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub color: String,
    /// Units of this product held by the enclosing bundle. Catalog reads leave it at zero.
    #[serde(default)]
    pub quantity: u32,
}

impl Product {
    pub fn new(id: i64, name: impl Into<String>, width: f32, price: f32) -> Self {
        Self { id, name: name.into(), width, price, ..Default::default() }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self { self.color = color.into(); self }
    pub fn with_image(mut self, image: impl Into<String>) -> Self { self.image = image.into(); self }

    /// True when the width can take part in width arithmetic. Widths at or
    /// below the builder's tolerance would never close a gap.
    pub fn has_usable_width(&self) -> bool { self.width.is_finite() && self.width > WIDTH_EPSILON }
}

/// The anchor of every bundle.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Gate {
    #[serde(flatten)]
    pub product: Product,
    /// Allowed under/overshoot around the requested width.
    #[serde(default)]
    pub tolerance: f32,
}

impl Gate {
    pub fn new(product: Product, tolerance: f32) -> Self { Self { product, tolerance } }
    pub fn id(&self) -> i64 { self.product.id }
    pub fn name(&self) -> &str { &self.product.name }
    pub fn width(&self) -> f32 { self.product.width }
}

/// An add-on panel; compatibility with gates lives in the catalog.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Extension {
    #[serde(flatten)]
    pub product: Product,
}

impl Extension {
    pub fn new(product: Product) -> Self { Self { product } }
    pub fn id(&self) -> i64 { self.product.id }
    pub fn name(&self) -> &str { &self.product.name }
    pub fn width(&self) -> f32 { self.product.width }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn test_gate_accessors() {
        let gate = Gate::new(Product::new(7, "Easy Close", 76.0, 49.0).with_color("white"), 4.0);
        assert_eq!(gate.id(), 7);
        assert_eq!(gate.width(), 76.0);
        assert_eq!(gate.product.color, "white");
        assert_eq!(gate.product.quantity, 0);
    }
    #[test]
    fn test_usable_width() {
        assert!(Product::new(1, "E", 32.0, 10.0).has_usable_width());
        assert!(!Product::new(2, "E", 0.0, 10.0).has_usable_width());
        assert!(!Product::new(3, "E", f32::INFINITY, 10.0).has_usable_width());
        assert!(!Product::new(4, "E", 1e-7, 10.0).has_usable_width());
        assert!(!Product::new(5, "E", WIDTH_EPSILON, 10.0).has_usable_width());
    }
    #[test]
    fn test_gate_serializes_flat() {
        let gate = Gate::new(Product::new(1, "G", 80.0, 30.0), 2.5);
        let json = serde_json::to_value(&gate).unwrap();
        assert_eq!(json["id"], 1);
        assert_eq!(json["tolerance"], 2.5);
        assert!(json.get("product").is_none());
    }
}
