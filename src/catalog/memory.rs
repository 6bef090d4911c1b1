use crate::catalog::{validate_product, CatalogAdmin, CatalogError, CatalogLookup, GateFilter};
use crate::domain::aggregates::{Extension, Gate};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

/// In-process catalog for tests and fixtures.
#[derive(Default)]
pub struct MemoryCatalog {
    gates: RwLock<Vec<Gate>>,
    extensions: RwLock<Vec<Extension>>,
    compatible: RwLock<BTreeSet<(i64, i64)>>,
    lookups: AtomicU64,
}

impl MemoryCatalog {
    pub fn new() -> Self { Self::default() }

    /// Seeds the catalog with fixed ids, bypassing id assignment.
    pub fn seeded(gates: Vec<Gate>, extensions: Vec<Extension>, links: &[(i64, i64)]) -> Self {
        Self {
            gates: RwLock::new(gates),
            extensions: RwLock::new(extensions),
            compatible: RwLock::new(links.iter().copied().collect()),
            lookups: AtomicU64::new(0),
        }
    }

    /// Number of read calls served so far.
    pub fn lookups(&self) -> u64 { self.lookups.load(Ordering::Relaxed) }

    fn count(&self) { self.lookups.fetch_add(1, Ordering::Relaxed); }
}

#[async_trait]
impl CatalogLookup for MemoryCatalog {
    async fn gate_by_id(&self, id: i64) -> Result<Gate, CatalogError> {
        self.count();
        self.gates.read().await.iter().find(|g| g.id() == id).cloned().ok_or_else(|| CatalogError::gate_not_found(id))
    }

    async fn extension_by_id(&self, id: i64) -> Result<Extension, CatalogError> {
        self.count();
        self.extensions.read().await.iter().find(|e| e.id() == id).cloned().ok_or_else(|| CatalogError::extension_not_found(id))
    }

    async fn extensions_compatible_with_gate(&self, gate_id: i64) -> Result<Vec<Extension>, CatalogError> {
        self.count();
        let compatible = self.compatible.read().await;
        let mut out: Vec<Extension> = self
            .extensions
            .read()
            .await
            .iter()
            .filter(|e| compatible.contains(&(gate_id, e.id())))
            .cloned()
            .collect();
        out.sort_by_key(Extension::id);
        Ok(out)
    }

    async fn list_gates(&self, filter: GateFilter) -> Result<Vec<Gate>, CatalogError> {
        self.count();
        let mut out: Vec<Gate> = self.gates.read().await.iter().filter(|g| filter.matches(g)).cloned().collect();
        out.sort_by_key(Gate::id);
        Ok(out)
    }
}

#[async_trait]
impl CatalogAdmin for MemoryCatalog {
    async fn create_gate(&self, mut gate: Gate) -> Result<Gate, CatalogError> {
        validate_product(gate.name(), gate.width(), gate.product.price)?;
        let mut gates = self.gates.write().await;
        gate.product.id = gates.iter().map(Gate::id).max().unwrap_or(0) + 1;
        gates.push(gate.clone());
        Ok(gate)
    }

    async fn create_extension(&self, mut extension: Extension) -> Result<Extension, CatalogError> {
        validate_product(extension.name(), extension.width(), extension.product.price)?;
        let mut extensions = self.extensions.write().await;
        extension.product.id = extensions.iter().map(Extension::id).max().unwrap_or(0) + 1;
        extensions.push(extension.clone());
        Ok(extension)
    }

    async fn link_extension(&self, gate_id: i64, extension_id: i64) -> Result<(), CatalogError> {
        if !self.gates.read().await.iter().any(|g| g.id() == gate_id) {
            return Err(CatalogError::gate_not_found(gate_id));
        }
        if !self.extensions.read().await.iter().any(|e| e.id() == extension_id) {
            return Err(CatalogError::extension_not_found(extension_id));
        }
        self.compatible.write().await.insert((gate_id, extension_id));
        Ok(())
    }
}
