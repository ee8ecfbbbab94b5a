//! Strongly-typed identifiers shared across the server.
//!
//! Every id is a thin newtype over `String` following the same
//! `derive_more` idiom used throughout the codebase: `Display` for
//! logging, `From`/`Into` for ergonomic construction, `AsRef`/`Deref`
//! for borrowing the inner string without an explicit accessor.

use chrono::Utc;
use derive_more::{AsRef, Deref, Display, From, Into};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Display, From, AsRef, Deref, Into, Serialize, Deserialize, Default,
)]
pub struct ProjectId(String);

#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Display, From, AsRef, Deref, Into, Serialize, Deserialize, Default,
)]
pub struct MemoryId(String);

impl MemoryId {
    /// Generates a new id of the form `mem_<yyyymmddHHMMSS>_<8 hex>`.
    pub fn generate() -> Self {
        let stamp = Utc::now().format("%Y%m%d%H%M%S");
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!("mem_{stamp}_{}", &suffix[..8]))
    }
}

#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Display, From, AsRef, Deref, Into, Serialize, Deserialize, Default,
)]
pub struct ConnId(String);

impl ConnId {
    pub fn generate() -> Self {
        Self(format!("conn_{}", Uuid::new_v4().simple()))
    }
}

#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Display, From, AsRef, Deref, Into, Serialize, Deserialize, Default,
)]
pub struct InvocationId(String);

impl InvocationId {
    pub fn generate() -> Self {
        Self(format!("inv_{}", Uuid::new_v4().simple()))
    }
}

#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Display, From, AsRef, Deref, Into, Serialize, Deserialize, Default,
)]
pub struct ErrorId(String);

/// Storage tier for a memory record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Short,
    Mid,
    Long,
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Tier::Short => "short",
            Tier::Mid => "mid",
            Tier::Long => "long",
        };
        write!(f, "{s}")
    }
}

/// Firewall block severity for a stored error pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockLevel {
    None,
    Warning,
    Block,
}

/// Authenticated (or anonymous-local) caller identity attached to every invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub subject: String,
    pub authenticated: bool,
}

impl Principal {
    pub fn anonymous_local() -> Self {
        Self { subject: "stdio-local".to_string(), authenticated: true }
    }

    pub fn api_key(subject: impl Into<String>) -> Self {
        Self { subject: subject.into(), authenticated: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_id_has_expected_shape() {
        let id = MemoryId::generate();
        let s = id.as_ref();
        assert!(s.starts_with("mem_"));
        let rest = &s["mem_".len()..];
        let (ts, hex) = rest.split_once('_').expect("timestamp/hex separator");
        assert_eq!(ts.len(), 14);
        assert_eq!(hex.len(), 8);
    }

    #[test]
    fn ids_are_unique() {
        let a = MemoryId::generate();
        let b = MemoryId::generate();
        assert_ne!(a, b);
    }
}
