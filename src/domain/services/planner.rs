//! Pressure-fit batch planner: one bundle per gate that fits under a width.

use crate::catalog::{CatalogError, CatalogLookup, GateFilter};
use crate::domain::aggregates::Bundle;
use crate::domain::services::{build_bundle, compute_metadata, BundleError};

/// Widest opening the planner will try to fill.
pub const DEFAULT_MAX_WIDTH: f32 = 220.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlanOptions {
    /// Requested widths above this are clamped down to it.
    pub max_width: f32,
    /// Drop bundles structurally equal to an earlier one.
    pub dedup: bool,
}

impl Default for PlanOptions {
    fn default() -> Self { Self { max_width: DEFAULT_MAX_WIDTH, dedup: false } }
}

#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error(transparent)]
    Bundle(#[from] BundleError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Builds one finished bundle per gate narrower than `desired_width`.
///
/// Gates that cannot anchor a bundle are skipped; catalog failures abort the
/// whole plan. Bundles come back in catalog gate order.
#[tracing::instrument(skip(catalog), fields(clamped_width = tracing::field::Empty))]
pub async fn plan_bundles<C>(catalog: &C, options: PlanOptions, desired_width: f32) -> Result<Vec<Bundle>, PlanError>
where
    C: CatalogLookup + ?Sized,
{
    if !desired_width.is_finite() || desired_width <= 0.0 {
        return Err(BundleError::InvalidWidth(desired_width).into());
    }
    let width = desired_width.min(options.max_width);
    tracing::Span::current().record("clamped_width", width);

    let gates = catalog.list_gates(GateFilter::narrower_than(width)).await?;
    let mut bundles = Vec::with_capacity(gates.len());
    for gate in &gates {
        let extensions = catalog.extensions_compatible_with_gate(gate.id()).await?;
        match build_bundle(width, gate, &extensions) {
            Ok(mut bundle) => {
                compute_metadata(&mut bundle);
                tracing::trace!(gate_id = gate.id(), width = bundle.width, within_tolerance = bundle.fits(width), "built bundle");
                bundles.push(bundle);
            }
            Err(e) if e.skips_gate() => {
                tracing::debug!(gate_id = gate.id(), error = %e, "skipping gate");
            }
            Err(e) => return Err(e.into()),
        }
    }

    if options.dedup {
        bundles = dedup_bundles(bundles);
    }
    tracing::debug!(gates = gates.len(), bundles = bundles.len(), "planned bundles");
    Ok(bundles)
}

/// Keeps the first of every group of structurally equal bundles.
pub fn dedup_bundles(bundles: Vec<Bundle>) -> Vec<Bundle> {
    let mut kept: Vec<Bundle> = Vec::with_capacity(bundles.len());
    for bundle in bundles {
        if !kept.contains(&bundle) {
            kept.push(bundle);
        }
    }
    kept
}
