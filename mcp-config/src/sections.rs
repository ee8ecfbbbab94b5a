//! Typed configuration sections (spec §4.A).

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            user: "mcp".to_string(),
            password: String::new(),
            name: "mcp".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct KvCacheConfig {
    pub host: String,
    pub port: u16,
    pub password: String,
}

impl Default for KvCacheConfig {
    fn default() -> Self {
        Self { host: "localhost".to_string(), port: 6379, password: String::new() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VectorIndexConfig {
    pub host: String,
    pub port: u16,
}

impl Default for VectorIndexConfig {
    fn default() -> Self {
        Self { host: "localhost".to_string(), port: 6333 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingModelConfig {
    /// Local on-disk model path; no network access required.
    pub local_path: Option<String>,
    /// When true, `mcp-storage`'s `EmbeddingModel` adapter returns a
    /// deterministic no-op embedding instead of erroring.
    pub offline: bool,
    pub dimensions: usize,
}

impl Default for EmbeddingModelConfig {
    fn default() -> Self {
        Self { local_path: None, offline: false, dimensions: 384 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    pub l1_capacity: usize,
    pub l1_ttl_s: u64,
    pub category_ttl_s: HashMap<String, u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        let mut category_ttl_s = HashMap::new();
        category_ttl_s.insert("tool_catalog".to_string(), 30);
        category_ttl_s.insert("vector_search".to_string(), 120);
        category_ttl_s.insert("error_solutions".to_string(), 600);
        category_ttl_s.insert("stats".to_string(), 10);
        category_ttl_s.insert("db_query".to_string(), 60);
        Self { l1_capacity: 2000, l1_ttl_s: 30, category_ttl_s }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PoolConfig {
    pub min: usize,
    pub max: usize,
    pub min_overflow: usize,
    pub max_overflow: usize,
    pub sample_interval_s: u64,
    pub cooldown_s: u64,
    pub high_util_threshold: f64,
    pub low_util_threshold: f64,
    pub resize_step_up: f64,
    pub resize_step_down: f64,
    pub leak_threshold_s: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min: 5,
            max: 50,
            min_overflow: 0,
            max_overflow: 10,
            sample_interval_s: 60,
            cooldown_s: 120,
            high_util_threshold: 0.80,
            low_util_threshold: 0.20,
            resize_step_up: 1.2,
            resize_step_down: 0.8,
            leak_threshold_s: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub api_keys: HashSet<String>,
    pub allowed_ips: HashSet<String>,
    pub rate_limit_rps: u32,
    pub max_connections: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            api_keys: HashSet::new(),
            allowed_ips: HashSet::new(),
            rate_limit_rps: 100,
            max_connections: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    /// Directory for the daily-rotating file sink (spec §2 component A,
    /// "structured leveled logging with rotation"). `None` logs to the
    /// console stream only.
    pub directory: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: "text".to_string(), directory: None }
    }
}

/// Governs the optional AI-assisted tools group (spec §4.H, §9). Absent
/// or disabled, the group simply does not register — it is never
/// required to satisfy the rest of the tool registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AiConfig {
    pub enabled: bool,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self { enabled: false }
    }
}
