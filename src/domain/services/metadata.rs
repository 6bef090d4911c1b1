//! Derived bundle fields.

use crate::domain::aggregates::Bundle;

/// Fills in every derived field of `bundle` that is still unset.
///
/// Fields a caller has already set are left alone, so running this twice
/// yields the same bundle as running it once.
pub fn compute_metadata(bundle: &mut Bundle) {
    if bundle.quantity < 1 {
        bundle.quantity = 1;
    }
    if bundle.price == 0.0 {
        bundle.price = bundle.component_price();
    }
    if bundle.width == 0.0 {
        bundle.width = bundle.component_width();
    }
    if bundle.image.is_empty() {
        bundle.image = bundle.gate.product.image.clone();
    }
    if bundle.color.is_empty() {
        bundle.color = bundle.gate.product.color.clone();
    }
    if bundle.tolerance == 0.0 {
        bundle.tolerance = bundle.gate.tolerance;
    }
    if bundle.name.is_empty() {
        bundle.name = match bundle.extension_units() {
            0 => bundle.gate.name().to_string(),
            1 => format!("{} and 1 extension.", bundle.gate.name()),
            n => format!("{} and {n} extensions.", bundle.gate.name()),
        };
    }
}
