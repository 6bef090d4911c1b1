use crate::catalog::{CatalogAdmin, CatalogError, CatalogLookup, GateFilter};
use crate::domain::aggregates::{Extension, Gate};
use async_trait::async_trait;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// What a write through the cache drops.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InvalidationPolicy {
    /// Every entry.
    #[default]
    FlushAll,
    /// Only the keys the write can have changed.
    ByPrefix,
}

impl FromStr for InvalidationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "flush" | "flush_all" => Ok(Self::FlushAll),
            "prefix" | "by_prefix" => Ok(Self::ByPrefix),
            other => Err(format!("unknown invalidation policy '{other}', expected 'flush' or 'prefix'")),
        }
    }
}

#[derive(Clone, Debug)]
pub struct CacheSettings {
    /// Zero disables caching.
    pub ttl: Duration,
    pub max_entries: usize,
    pub invalidation: InvalidationPolicy,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { ttl: Duration::from_secs(300), max_entries: 1024, invalidation: InvalidationPolicy::FlushAll }
    }
}

#[derive(Clone)]
enum Cached {
    Gate(Gate),
    Extension(Extension),
    Extensions(Vec<Extension>),
    Gates(Vec<Gate>),
}

struct Entry {
    value: Cached,
    created_at: Instant,
}

/// Time-boxed cache in front of another catalog.
///
/// Reads may be up to `ttl` stale. Writes go to the inner catalog first and
/// then invalidate according to the configured policy.
pub struct CachedCatalog<C> {
    inner: C,
    settings: CacheSettings,
    entries: Mutex<HashMap<String, Entry>>,
}

impl<C> CachedCatalog<C> {
    pub fn new(inner: C, settings: CacheSettings) -> Self {
        Self { inner, settings, entries: Mutex::new(HashMap::new()) }
    }

    pub fn inner(&self) -> &C { &self.inner }

    pub async fn len(&self) -> usize { self.entries.lock().await.len() }

    async fn get(&self, key: &str) -> Option<Cached> {
        if self.settings.ttl.is_zero() {
            return None;
        }
        let ttl = self.settings.ttl;
        let mut entries = self.entries.lock().await;
        entries.retain(|_, e| e.created_at.elapsed() <= ttl);
        entries.get(key).map(|e| e.value.clone())
    }

    async fn put(&self, key: String, value: Cached) {
        if self.settings.ttl.is_zero() || self.settings.max_entries == 0 {
            return;
        }
        let ttl = self.settings.ttl;
        let mut entries = self.entries.lock().await;
        entries.retain(|_, e| e.created_at.elapsed() <= ttl);
        if entries.len() >= self.settings.max_entries && !entries.contains_key(&key) {
            if let Some(victim) = entries.iter().min_by_key(|(_, e)| e.created_at).map(|(k, _)| k.clone()) {
                entries.remove(&victim);
            }
        }
        entries.insert(key, Entry { value, created_at: Instant::now() });
    }

    async fn invalidate(&self, prefixes: &[String]) {
        let mut entries = self.entries.lock().await;
        match self.settings.invalidation {
            InvalidationPolicy::FlushAll => entries.clear(),
            InvalidationPolicy::ByPrefix => entries.retain(|k, _| !prefixes.iter().any(|p| k.starts_with(p.as_str()))),
        }
        tracing::debug!(policy = ?self.settings.invalidation, remaining = entries.len(), "catalog cache invalidated");
    }
}

fn gates_key(filter: GateFilter) -> String {
    match filter.narrower_than {
        Some(w) => format!("gates:<{w}"),
        None => "gates:all".to_string(),
    }
}

#[async_trait]
impl<C: CatalogLookup> CatalogLookup for CachedCatalog<C> {
    async fn gate_by_id(&self, id: i64) -> Result<Gate, CatalogError> {
        let key = format!("gate:{id}");
        if let Some(Cached::Gate(gate)) = self.get(&key).await {
            return Ok(gate);
        }
        let gate = self.inner.gate_by_id(id).await?;
        self.put(key, Cached::Gate(gate.clone())).await;
        Ok(gate)
    }

    async fn extension_by_id(&self, id: i64) -> Result<Extension, CatalogError> {
        let key = format!("extension:{id}");
        if let Some(Cached::Extension(extension)) = self.get(&key).await {
            return Ok(extension);
        }
        let extension = self.inner.extension_by_id(id).await?;
        self.put(key, Cached::Extension(extension.clone())).await;
        Ok(extension)
    }

    async fn extensions_compatible_with_gate(&self, gate_id: i64) -> Result<Vec<Extension>, CatalogError> {
        let key = format!("compat:{gate_id}:");
        if let Some(Cached::Extensions(extensions)) = self.get(&key).await {
            return Ok(extensions);
        }
        let extensions = self.inner.extensions_compatible_with_gate(gate_id).await?;
        self.put(key, Cached::Extensions(extensions.clone())).await;
        Ok(extensions)
    }

    async fn list_gates(&self, filter: GateFilter) -> Result<Vec<Gate>, CatalogError> {
        let key = gates_key(filter);
        if let Some(Cached::Gates(gates)) = self.get(&key).await {
            return Ok(gates);
        }
        let gates = self.inner.list_gates(filter).await?;
        self.put(key, Cached::Gates(gates.clone())).await;
        Ok(gates)
    }
}

#[async_trait]
impl<C: CatalogAdmin> CatalogAdmin for CachedCatalog<C> {
    async fn create_gate(&self, gate: Gate) -> Result<Gate, CatalogError> {
        let gate = self.inner.create_gate(gate).await?;
        self.invalidate(&["gates:".to_string()]).await;
        Ok(gate)
    }

    async fn create_extension(&self, extension: Extension) -> Result<Extension, CatalogError> {
        let extension = self.inner.create_extension(extension).await?;
        self.invalidate(&[]).await;
        Ok(extension)
    }

    async fn link_extension(&self, gate_id: i64, extension_id: i64) -> Result<(), CatalogError> {
        self.inner.link_extension(gate_id, extension_id).await?;
        self.invalidate(&[format!("compat:{gate_id}:")]).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use crate::domain::aggregates::Product;

    fn seeded() -> MemoryCatalog {
        MemoryCatalog::seeded(
            vec![Gate::new(Product::new(1, "A", 76.0, 40.0), 2.0), Gate::new(Product::new(12, "B", 90.0, 50.0), 2.0)],
            vec![Extension::new(Product::new(1, "7cm", 7.0, 9.0)), Extension::new(Product::new(2, "14cm", 14.0, 12.0))],
            &[(1, 1), (12, 1)],
        )
    }

    fn settings(invalidation: InvalidationPolicy) -> CacheSettings {
        CacheSettings { ttl: Duration::from_secs(60), max_entries: 16, invalidation }
    }

    #[tokio::test(start_paused = true)]
    async fn test_serves_repeat_reads_until_ttl() {
        let cache = CachedCatalog::new(seeded(), settings(InvalidationPolicy::FlushAll));
        cache.gate_by_id(1).await.unwrap();
        cache.gate_by_id(1).await.unwrap();
        assert_eq!(cache.inner().lookups(), 1);
        tokio::time::advance(Duration::from_secs(61)).await;
        cache.gate_by_id(1).await.unwrap();
        assert_eq!(cache.inner().lookups(), 2);
    }

    #[tokio::test]
    async fn test_not_found_is_not_cached() {
        let cache = CachedCatalog::new(seeded(), settings(InvalidationPolicy::FlushAll));
        assert!(cache.gate_by_id(99).await.is_err());
        assert!(cache.gate_by_id(99).await.is_err());
        assert_eq!(cache.inner().lookups(), 2);
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_flush_all_on_write() {
        let cache = CachedCatalog::new(seeded(), settings(InvalidationPolicy::FlushAll));
        cache.gate_by_id(1).await.unwrap();
        cache.list_gates(GateFilter::default()).await.unwrap();
        cache.create_extension(Extension::new(Product::new(0, "32cm", 32.0, 20.0))).await.unwrap();
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_prefix_invalidation_keeps_unrelated_keys() {
        let cache = CachedCatalog::new(seeded(), settings(InvalidationPolicy::ByPrefix));
        cache.gate_by_id(1).await.unwrap();
        cache.extensions_compatible_with_gate(1).await.unwrap();
        cache.extensions_compatible_with_gate(12).await.unwrap();
        cache.link_extension(1, 2).await.unwrap();
        assert_eq!(cache.len().await, 2);
        assert_eq!(cache.extensions_compatible_with_gate(1).await.unwrap().len(), 2);
        let before = cache.inner().lookups();
        cache.extensions_compatible_with_gate(12).await.unwrap();
        assert_eq!(cache.inner().lookups(), before);
    }

    #[tokio::test]
    async fn test_new_gate_shows_up_in_listings() {
        let cache = CachedCatalog::new(seeded(), settings(InvalidationPolicy::ByPrefix));
        assert_eq!(cache.list_gates(GateFilter::default()).await.unwrap().len(), 2);
        cache.create_gate(Gate::new(Product::new(0, "C", 100.0, 60.0), 2.0)).await.unwrap();
        assert_eq!(cache.list_gates(GateFilter::default()).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_evicts_oldest_when_full() {
        let cache = CachedCatalog::new(seeded(), CacheSettings { max_entries: 1, ..settings(InvalidationPolicy::FlushAll) });
        cache.gate_by_id(1).await.unwrap();
        cache.gate_by_id(12).await.unwrap();
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_zero_ttl_disables_cache() {
        let cache = CachedCatalog::new(seeded(), CacheSettings { ttl: Duration::ZERO, ..CacheSettings::default() });
        cache.gate_by_id(1).await.unwrap();
        cache.gate_by_id(1).await.unwrap();
        assert_eq!(cache.inner().lookups(), 2);
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!("flush".parse::<InvalidationPolicy>(), Ok(InvalidationPolicy::FlushAll));
        assert_eq!(" Prefix ".parse::<InvalidationPolicy>(), Ok(InvalidationPolicy::ByPrefix));
        assert!("lru".parse::<InvalidationPolicy>().is_err());
    }
}
