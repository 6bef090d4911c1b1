//! Bundle building, metadata derivation and batch planning.
mod builder;
mod metadata;
mod planner;

pub use builder::{build_bundle, BundleError, WIDTH_EPSILON};
pub use metadata::compute_metadata;
pub use planner::{dedup_bundles, plan_bundles, PlanError, PlanOptions, DEFAULT_MAX_WIDTH};
