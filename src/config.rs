//! Runtime configuration read from the environment (after `.env` is loaded).

use std::str::FromStr;
use std::time::Duration;
use crate::catalog::{CacheSettings, InvalidationPolicy};
use crate::domain::services::{PlanOptions, DEFAULT_MAX_WIDTH};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has invalid value '{value}': {reason}")]
    Invalid { key: &'static str, value: String, reason: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub nats_url: Option<String>,
    pub port: u16,
    pub currency: String,
    pub admin_token: Option<String>,
    pub max_bundle_width: f32,
    pub cache: CacheSettings,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = CacheSettings::default();

        let max_bundle_width: f32 = parse(&get, "MAX_BUNDLE_WIDTH", DEFAULT_MAX_WIDTH)?;
        if !max_bundle_width.is_finite() || max_bundle_width <= 0.0 {
            return Err(ConfigError::Invalid { key: "MAX_BUNDLE_WIDTH", value: max_bundle_width.to_string(), reason: "must be positive".into() });
        }

        Ok(Self {
            database_url: get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?,
            nats_url: get("NATS_URL"),
            port: parse(&get, "PORT", 8083)?,
            currency: get("CURRENCY").map(|c| c.to_uppercase()).unwrap_or_else(|| "USD".to_string()),
            admin_token: get("ADMIN_TOKEN"),
            max_bundle_width,
            cache: CacheSettings {
                ttl: Duration::from_secs(parse(&get, "CATALOG_CACHE_TTL_SECS", defaults.ttl.as_secs())?),
                max_entries: parse(&get, "CATALOG_CACHE_MAX_ENTRIES", defaults.max_entries)?,
                invalidation: parse(&get, "CATALOG_CACHE_INVALIDATION", InvalidationPolicy::FlushAll)?,
            },
        })
    }

    pub fn plan_options(&self, dedup: bool) -> PlanOptions {
        PlanOptions { max_width: self.max_bundle_width, dedup }
    }
}

fn parse<T>(get: &impl Fn(&str) -> Option<String>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        None => Ok(default),
        Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid { key, reason: e.to_string(), value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|k| vars.get(k).cloned())
    }

    #[test]
    fn test_defaults() {
        let c = config(&[("DATABASE_URL", "postgres://localhost/gates")]).unwrap();
        assert_eq!(c.port, 8083);
        assert_eq!(c.currency, "USD");
        assert_eq!(c.max_bundle_width, 220.0);
        assert_eq!(c.cache.ttl, Duration::from_secs(300));
        assert_eq!(c.cache.invalidation, InvalidationPolicy::FlushAll);
        assert!(c.admin_token.is_none());
        assert!(!c.plan_options(false).dedup);
    }

    #[test]
    fn test_overrides() {
        let c = config(&[
            ("DATABASE_URL", "postgres://db/gates"),
            ("PORT", "9000"),
            ("CURRENCY", "gbp"),
            ("ADMIN_TOKEN", " secret "),
            ("MAX_BUNDLE_WIDTH", "180"),
            ("CATALOG_CACHE_TTL_SECS", "0"),
            ("CATALOG_CACHE_INVALIDATION", "prefix"),
            ("NATS_URL", ""),
        ])
        .unwrap();
        assert_eq!(c.port, 9000);
        assert_eq!(c.currency, "GBP");
        assert_eq!(c.admin_token.as_deref(), Some("secret"));
        assert_eq!(c.plan_options(true).max_width, 180.0);
        assert!(c.cache.ttl.is_zero());
        assert_eq!(c.cache.invalidation, InvalidationPolicy::ByPrefix);
        assert!(c.nats_url.is_none());
    }

    #[test]
    fn test_errors() {
        assert!(matches!(config(&[]), Err(ConfigError::Missing("DATABASE_URL"))));
        assert!(matches!(
            config(&[("DATABASE_URL", "x"), ("PORT", "eighty")]),
            Err(ConfigError::Invalid { key: "PORT", .. })
        ));
        assert!(matches!(
            config(&[("DATABASE_URL", "x"), ("MAX_BUNDLE_WIDTH", "-5")]),
            Err(ConfigError::Invalid { key: "MAX_BUNDLE_WIDTH", .. })
        ));
    }
}
