//! Typed configuration tree for the MCP enterprise server.
//!
//! Precedence (lowest to highest): built-in defaults, an optional
//! TOML/YAML file, environment variables (spec §4.A, §6). Optional
//! file-watch reload (`hot-reload` feature) debounces changes by 1s and
//! reverts to the last-valid snapshot on a parse failure.

mod sections;

pub use sections::{
    AiConfig, ApiConfig, CacheConfig, DatabaseConfig, EmbeddingModelConfig, KvCacheConfig, LoggingConfig,
    PoolConfig, VectorIndexConfig,
};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub kv_cache: KvCacheConfig,
    pub vector_index: VectorIndexConfig,
    pub embedding_model: EmbeddingModelConfig,
    pub cache: CacheConfig,
    pub pool: PoolConfig,
    pub api: ApiConfig,
    pub logging: LoggingConfig,
    pub ai: AiConfig,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read { path: String, #[source] source: std::io::Error },

    #[error("failed to parse config file {path}: {source}")]
    Parse { path: String, #[source] source: serde_yaml::Error },

    #[error("validation failed: {0}")]
    Invalid(String),
}

impl Config {
    /// Load defaults, layer an optional file on top, then environment
    /// variables, and validate the result.
    pub fn load(file_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(path) = file_path {
            if path.exists() {
                let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.display().to_string(),
                    source,
                })?;
                config = serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
                    path: path.display().to_string(),
                    source,
                })?;
            }
        }

        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Overlay recognized environment variables (spec §6) onto `self`.
    pub fn apply_env(&mut self) {
        use std::env::var;

        if let Ok(v) = var("DB_HOST") {
            self.database.host = v;
        }
        if let Ok(v) = var("DB_PORT").ok().and_then(|v| v.parse().ok()) {
            self.database.port = v;
        }
        if let Ok(v) = var("DB_USER") {
            self.database.user = v;
        }
        if let Ok(v) = var("DB_PASSWORD") {
            self.database.password = v;
        }
        if let Ok(v) = var("DB_NAME") {
            self.database.name = v;
        }
        if let Ok(v) = var("KV_HOST") {
            self.kv_cache.host = v;
        }
        if let Ok(v) = var("KV_PORT").ok().and_then(|v| v.parse().ok()) {
            self.kv_cache.port = v;
        }
        if let Ok(v) = var("KV_PASSWORD") {
            self.kv_cache.password = v;
        }
        if let Ok(v) = var("VECTOR_HOST") {
            self.vector_index.host = v;
        }
        if let Ok(v) = var("VECTOR_PORT").ok().and_then(|v| v.parse().ok()) {
            self.vector_index.port = v;
        }
        if let Ok(v) = var("API_KEYS") {
            self.api.api_keys = split_csv(&v);
        }
        if let Ok(v) = var("ALLOWED_IPS") {
            self.api.allowed_ips = split_csv(&v);
        }
        if let Ok(v) = var("RATE_LIMIT").ok().and_then(|v| v.parse().ok()) {
            self.api.rate_limit_rps = v;
        }
        if let Ok(v) = var("MAX_CONNECTIONS").ok().and_then(|v| v.parse().ok()) {
            self.api.max_connections = v;
        }
        if let Ok(v) = var("LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Ok(v) = var("AI_TOOLS_ENABLED").ok().and_then(|v| v.parse().ok()) {
            self.ai.enabled = v;
        }
    }

    /// Validate cross-field invariants that a bad file or env override
    /// can otherwise smuggle in.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pool.min > self.pool.max {
            return Err(ConfigError::Invalid(format!(
                "pool.min ({}) must be <= pool.max ({})",
                self.pool.min, self.pool.max
            )));
        }
        if !(0.0..=1.0).contains(&self.pool.high_util_threshold) {
            return Err(ConfigError::Invalid("pool.high_util_threshold must be in [0,1]".into()));
        }
        if !(0.0..=1.0).contains(&self.pool.low_util_threshold) {
            return Err(ConfigError::Invalid("pool.low_util_threshold must be in [0,1]".into()));
        }
        if self.pool.low_util_threshold >= self.pool.high_util_threshold {
            return Err(ConfigError::Invalid(
                "pool.low_util_threshold must be < pool.high_util_threshold".into(),
            ));
        }
        if self.cache.l1_capacity == 0 {
            return Err(ConfigError::Invalid("cache.l1_capacity must be > 0".into()));
        }
        Ok(())
    }
}

fn split_csv(v: &str) -> HashSet<String> {
    v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect()
}

#[cfg(feature = "hot-reload")]
pub mod reload;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn env_overrides_file_and_defaults() {
        // SAFETY: test runs single-threaded for env mutation via serial guard below.
        std::env::set_var("DB_HOST", "db.internal");
        std::env::set_var("RATE_LIMIT", "250");
        let mut config = Config::default();
        config.apply_env();
        assert_eq!(config.database.host, "db.internal");
        assert_eq!(config.api.rate_limit_rps, 250);
        std::env::remove_var("DB_HOST");
        std::env::remove_var("RATE_LIMIT");
    }

    #[test]
    fn rejects_inverted_pool_bounds() {
        let mut config = Config::default();
        config.pool.min = 100;
        config.pool.max = 10;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_overlapping_utilization_thresholds() {
        let mut config = Config::default();
        config.pool.low_util_threshold = 0.9;
        config.pool.high_util_threshold = 0.8;
        assert!(config.validate().is_err());
    }

    #[test]
    fn loads_from_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "api:\n  rate_limit_rps: 42\n").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.api.rate_limit_rps, 42);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = Config::load(Some(Path::new("/nonexistent/path/config.yaml"))).unwrap();
        assert_eq!(config, Config::default());
    }
}
