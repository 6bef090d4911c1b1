//! Catalog boundary: where gates, extensions and their compatibility live.
//!
//! The bundle planner only reads through [`CatalogLookup`]. The admin routes
//! write through [`CatalogAdmin`], which is what lets [`CachedCatalog`]
//! invalidate on writes.

mod cache;
mod memory;
mod postgres;

pub use cache::{CachedCatalog, CacheSettings, InvalidationPolicy};
pub use memory::MemoryCatalog;
pub use postgres::PgCatalog;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::domain::aggregates::{Extension, Gate};
use crate::domain::services::WIDTH_EPSILON;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: i64 },
    #[error("invalid catalog entry: {0}")]
    Invalid(String),
    #[error("catalog storage error: {0}")]
    Database(#[from] sqlx::Error),
}

impl CatalogError {
    pub fn gate_not_found(id: i64) -> Self { Self::NotFound { kind: "gate", id } }
    pub fn extension_not_found(id: i64) -> Self { Self::NotFound { kind: "extension", id } }
}

/// Filter for [`CatalogLookup::list_gates`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GateFilter {
    /// Only gates strictly narrower than this width.
    pub narrower_than: Option<f32>,
}

impl GateFilter {
    pub fn narrower_than(width: f32) -> Self { Self { narrower_than: Some(width) } }
    pub fn matches(&self, gate: &Gate) -> bool { self.narrower_than.map_or(true, |w| gate.width() < w) }
}

/// Read side of the catalog. Listings come back in catalog (id) order.
#[async_trait]
pub trait CatalogLookup: Send + Sync + 'static {
    async fn gate_by_id(&self, id: i64) -> Result<Gate, CatalogError>;
    async fn extension_by_id(&self, id: i64) -> Result<Extension, CatalogError>;
    async fn extensions_compatible_with_gate(&self, gate_id: i64) -> Result<Vec<Extension>, CatalogError>;
    async fn list_gates(&self, filter: GateFilter) -> Result<Vec<Gate>, CatalogError>;
}

/// Write side of the catalog.
#[async_trait]
pub trait CatalogAdmin: CatalogLookup {
    /// Stores a new gate; the id on input is ignored and assigned by the store.
    async fn create_gate(&self, gate: Gate) -> Result<Gate, CatalogError>;
    /// Stores a new extension; the id on input is ignored and assigned by the store.
    async fn create_extension(&self, extension: Extension) -> Result<Extension, CatalogError>;
    /// Marks `extension_id` as compatible with `gate_id`. Linking twice is a no-op.
    async fn link_extension(&self, gate_id: i64, extension_id: i64) -> Result<(), CatalogError>;
}

pub(crate) fn validate_product(name: &str, width: f32, price: f32) -> Result<(), CatalogError> {
    if name.trim().is_empty() { return Err(CatalogError::Invalid("name must not be empty".into())); }
    if !width.is_finite() || width <= WIDTH_EPSILON { return Err(CatalogError::Invalid(format!("width must be greater than {WIDTH_EPSILON}, got {width}"))); }
    if !price.is_finite() || price < 0.0 { return Err(CatalogError::Invalid(format!("price must not be negative, got {price}"))); }
    Ok(())
}
