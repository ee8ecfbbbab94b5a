//! Error pattern record and decision shapes (spec §3, §4.F).

use chrono::{DateTime, Utc};
use mcp_core::{BlockLevel, ErrorId};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize)]
pub struct ErrorPattern {
    pub error_id: ErrorId,
    pub error_type: String,
    pub error_scene: String,
    pub feature_map: BTreeMap<String, serde_json::Value>,
    pub error_message: String,
    pub solution: String,
    pub solution_confidence: f64,
    pub block_level: BlockLevel,
    pub occurrence_count: u64,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Risk {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize)]
pub struct Decision {
    pub should_block: bool,
    pub risk: Risk,
    pub confidence: f64,
    pub matched: bool,
    pub error_id: Option<ErrorId>,
    pub solution: Option<String>,
}

impl Decision {
    pub fn no_match() -> Self {
        Self { should_block: false, risk: Risk::Low, confidence: 0.0, matched: false, error_id: None, solution: None }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ErrorFilter {
    pub error_type: Option<String>,
    pub block_level: Option<BlockLevel>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FirewallStats {
    pub total_patterns: usize,
    pub total_occurrences: u64,
    pub blocked_count: u64,
    pub warned_count: u64,
}
