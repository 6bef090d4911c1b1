//! Pressure-fit bundle builder.
//!
//! Anchors a bundle on one gate and closes the remaining gap with compatible
//! extensions, widest first. When the gap left over is narrower than every
//! extension, the narrowest one is added anyway so the bundle never comes out
//! short.

use crate::domain::aggregates::{Bundle, Extension, Gate};

/// Gaps at or below this width count as closed.
pub const WIDTH_EPSILON: f32 = 1e-3;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BundleError {
    #[error("gate {gate_id} is {gate_width} wide, too big for requested width {desired_width}")]
    GateTooWide { gate_id: i64, gate_width: f32, desired_width: f32 },
    #[error("no extensions available to cover the {gap} gap left by gate {gate_id}")]
    NoExtensionsAvailable { gate_id: i64, gap: f32 },
    #[error("requested width must be positive, got {0}")]
    InvalidWidth(f32),
}

impl BundleError {
    /// Errors that rule out a single gate rather than the whole request.
    pub fn skips_gate(&self) -> bool {
        matches!(self, Self::GateTooWide { .. } | Self::NoExtensionsAvailable { .. })
    }
}

/// Builds a bundle of `gate` plus extensions approximating `desired_width`.
///
/// Metadata fields are left unset; run
/// [`compute_metadata`](super::compute_metadata) on the result.
pub fn build_bundle(desired_width: f32, gate: &Gate, candidates: &[Extension]) -> Result<Bundle, BundleError> {
    if !desired_width.is_finite() || desired_width <= 0.0 {
        return Err(BundleError::InvalidWidth(desired_width));
    }
    if gate.width() > desired_width {
        return Err(BundleError::GateTooWide { gate_id: gate.id(), gate_width: gate.width(), desired_width });
    }

    let mut bundle = Bundle::around(gate.clone());
    let mut remaining = desired_width - gate.width();
    if remaining <= WIDTH_EPSILON {
        return Ok(bundle);
    }

    let mut sorted: Vec<&Extension> = candidates
        .iter()
        .filter(|e| {
            let usable = e.product.has_usable_width();
            if !usable {
                tracing::warn!(extension_id = e.id(), width = e.width(), "discarding extension without a usable width");
            }
            usable
        })
        .collect();
    sorted.sort_by(|a, b| b.width().total_cmp(&a.width()));

    let Some(&smallest) = sorted.last() else {
        return Err(BundleError::NoExtensionsAvailable { gate_id: gate.id(), gap: remaining });
    };

    // Every pass either lowers `remaining` or advances the cursor. A width
    // too small to change `remaining` at f32 precision counts as not fitting.
    let mut cursor = 0;
    while remaining > WIDTH_EPSILON {
        let Some(&candidate) = sorted.get(cursor) else { break };
        if candidate.width() <= remaining + WIDTH_EPSILON {
            let next = remaining - candidate.width();
            if next >= remaining {
                tracing::warn!(extension_id = candidate.id(), width = candidate.width(), gap = remaining, "extension too narrow to close gap at this scale");
                cursor += 1;
                continue;
            }
            bundle.place(candidate);
            remaining = next;
        } else if remaining < smallest.width() {
            bundle.place(smallest);
            remaining -= smallest.width();
        } else {
            cursor += 1;
        }
    }

    Ok(bundle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::Product;

    fn gate(width: f32) -> Gate { Gate::new(Product::new(1, "Gate", width, 40.0), 3.0) }
    fn ext(id: i64, width: f32) -> Extension { Extension::new(Product::new(id, format!("Ext {width}"), width, 10.0)) }
    fn qty(bundle: &Bundle, id: i64) -> u32 {
        bundle.extensions.iter().find(|e| e.id() == id).map_or(0, |e| e.product.quantity)
    }

    #[test]
    fn test_single_extension_perfect_fit() {
        let bundle = build_bundle(108.0, &gate(76.0), &[ext(32, 32.0)]).unwrap();
        assert_eq!(bundle.extensions.len(), 1);
        assert_eq!(qty(&bundle, 32), 1);
        assert_eq!(bundle.component_width(), 108.0);
    }

    #[test]
    fn test_repeats_extension_until_gap_closed() {
        let bundle = build_bundle(140.0, &gate(76.0), &[ext(32, 32.0)]).unwrap();
        assert_eq!(bundle.extensions.len(), 1);
        assert_eq!(qty(&bundle, 32), 2);
        assert_eq!(bundle.component_width(), 140.0);
    }

    #[test]
    fn test_falls_through_to_narrower_extensions() {
        let bundle = build_bundle(100.0, &gate(80.0), &[ext(5, 5.0), ext(32, 32.0), ext(64, 64.0)]).unwrap();
        assert_eq!(bundle.extensions.len(), 1);
        assert_eq!(qty(&bundle, 5), 4);
        assert_eq!(bundle.component_width(), 100.0);
    }

    #[test]
    fn test_rounds_up_with_smallest_extension() {
        let bundle = build_bundle(102.0, &gate(80.0), &[ext(5, 5.0), ext(32, 32.0), ext(64, 64.0)]).unwrap();
        assert_eq!(qty(&bundle, 5), 5);
        assert_eq!(bundle.component_width(), 105.0);
    }

    #[test]
    fn test_largest_first() {
        let bundle = build_bundle(186.0, &gate(80.0), &[ext(5, 5.0), ext(32, 32.0), ext(64, 64.0)]).unwrap();
        assert_eq!(qty(&bundle, 64), 1);
        assert_eq!(qty(&bundle, 32), 1);
        assert_eq!(qty(&bundle, 5), 2);
        assert_eq!(bundle.extensions[0].id(), 64);
        assert_eq!(bundle.component_width(), 186.0);
    }

    #[test]
    fn test_gap_smaller_than_every_extension() {
        let bundle = build_bundle(83.0, &gate(80.0), &[ext(64, 64.0), ext(32, 32.0)]).unwrap();
        assert_eq!(bundle.extensions.len(), 1);
        assert_eq!(qty(&bundle, 32), 1);
        assert_eq!(bundle.component_width(), 112.0);
    }

    #[test]
    fn test_gap_equal_to_smallest_is_a_fit() {
        let bundle = build_bundle(112.0, &gate(80.0), &[ext(64, 64.0), ext(32, 32.0)]).unwrap();
        assert_eq!(qty(&bundle, 32), 1);
        assert_eq!(qty(&bundle, 64), 0);
        assert_eq!(bundle.component_width(), 112.0);
    }

    #[test]
    fn test_gate_too_wide() {
        let err = build_bundle(70.0, &gate(76.0), &[ext(32, 32.0)]).unwrap_err();
        assert!(matches!(err, BundleError::GateTooWide { gate_id: 1, .. }));
        assert!(err.skips_gate());
    }

    #[test]
    fn test_exact_gate_needs_no_extensions() {
        let bundle = build_bundle(76.0, &gate(76.0), &[]).unwrap();
        assert!(bundle.extensions.is_empty());
        assert_eq!(bundle.gate.product.quantity, 1);
    }

    #[test]
    fn test_no_extensions_for_gap() {
        let err = build_bundle(90.0, &gate(76.0), &[]).unwrap_err();
        assert_eq!(err, BundleError::NoExtensionsAvailable { gate_id: 1, gap: 14.0 });
    }

    #[test]
    fn test_unusable_extensions_are_ignored() {
        let err = build_bundle(90.0, &gate(76.0), &[ext(3, 0.0), ext(4, -2.0)]).unwrap_err();
        assert!(matches!(err, BundleError::NoExtensionsAvailable { .. }));
        let bundle = build_bundle(90.0, &gate(76.0), &[ext(3, 0.0), ext(7, 7.0)]).unwrap();
        assert_eq!(qty(&bundle, 7), 2);
        assert_eq!(qty(&bundle, 3), 0);
    }

    #[test]
    fn test_invalid_width() {
        assert_eq!(build_bundle(0.0, &gate(76.0), &[]).unwrap_err(), BundleError::InvalidWidth(0.0));
        assert!(!BundleError::InvalidWidth(0.0).skips_gate());
        assert!(build_bundle(f32::NAN, &gate(76.0), &[]).is_err());
    }

    #[test]
    fn test_sub_tolerance_extensions_are_ignored() {
        let err = build_bundle(100.0, &gate(76.0), &[ext(1, 1e-7)]).unwrap_err();
        assert!(matches!(err, BundleError::NoExtensionsAvailable { .. }));
        let bundle = build_bundle(100.0, &gate(76.0), &[ext(1, 1e-7), ext(2, 8.0)]).unwrap();
        assert_eq!(qty(&bundle, 1), 0);
        assert_eq!(qty(&bundle, 2), 3);
    }

    #[test]
    fn test_extension_lost_to_precision_is_skipped() {
        // 0.01 is below one f32 ulp at this scale, so subtracting it is a no-op.
        let bundle = build_bundle(1.0e6, &gate(10.0), &[ext(1, 0.01)]).unwrap();
        assert_eq!(qty(&bundle, 1), 0);
        let bundle = build_bundle(1.0e6, &gate(10.0), &[ext(1, 0.01), ext(2, 400_000.0)]).unwrap();
        assert_eq!(qty(&bundle, 2), 1);
        assert_eq!(qty(&bundle, 1), 0);
    }

    #[test]
    fn test_fractional_widths_terminate() {
        let bundle = build_bundle(100.3, &gate(76.1), &[ext(1, 7.1), ext(2, 3.3)]).unwrap();
        assert!(bundle.component_width() >= 100.3 - WIDTH_EPSILON);
        assert!(bundle.component_width() < 100.3 + 3.3 + WIDTH_EPSILON);
    }
}
