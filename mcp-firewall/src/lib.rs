//! Error firewall: content-addressed error pattern matching against
//! in-flight operations (spec §4.F).

mod fingerprint;
pub mod model;

pub use model::{Decision, ErrorFilter, ErrorPattern, FirewallStats, Risk};

use chrono::Utc;
use dashmap::DashMap;
use mcp_core::{BlockLevel, Channel, ErrorId};
use mcp_pubsub::PubSubBus;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

pub struct ErrorFirewall {
    patterns: DashMap<ErrorId, ErrorPattern>,
    bus: Arc<PubSubBus>,
}

impl ErrorFirewall {
    pub fn new(bus: Arc<PubSubBus>) -> Arc<Self> {
        Arc::new(Self { patterns: DashMap::new(), bus })
    }

    /// Dispatches a pub/sub publish onto a background task so callers on
    /// the hot path never block on (or fail because of) delivery.
    fn publish_async(&self, channel: Channel, event_type: &'static str, payload: serde_json::Value) {
        let bus = self.bus.clone();
        tokio::spawn(async move {
            bus.publish(channel, event_type, payload);
            debug!(event_type, "firewall event dispatched");
        });
    }

    pub fn record_error(
        &self,
        error_type: &str,
        error_scene: &str,
        feature_map: BTreeMap<String, serde_json::Value>,
        error_message: &str,
        solution: &str,
        block_level: BlockLevel,
    ) -> (ErrorId, bool) {
        let error_id: ErrorId = fingerprint::fingerprint(error_type, &feature_map).into();
        let now = Utc::now();

        let is_new = !self.patterns.contains_key(&error_id);

        self.patterns
            .entry(error_id.clone())
            .and_modify(|existing| {
                existing.occurrence_count += 1;
                existing.last_seen_at = now;
                if !solution.is_empty() {
                    existing.solution = solution.to_string();
                }
            })
            .or_insert_with(|| ErrorPattern {
                error_id: error_id.clone(),
                error_type: error_type.to_string(),
                error_scene: error_scene.to_string(),
                feature_map,
                error_message: error_message.to_string(),
                solution: solution.to_string(),
                solution_confidence: if solution.is_empty() { 0.0 } else { 1.0 },
                block_level,
                occurrence_count: 1,
                created_at: now,
                last_seen_at: now,
            });

        if is_new {
            self.publish_async(
                Channel::ErrorFirewall,
                "error_recorded",
                serde_json::json!({
                    "error_id": error_id.to_string(),
                    "error_type": error_type,
                    "error_scene": error_scene,
                    "is_new": is_new,
                }),
            );
        }

        (error_id, is_new)
    }

    fn feature_overlap_confidence(
        stored: &BTreeMap<String, serde_json::Value>,
        operation_params: &BTreeMap<String, serde_json::Value>,
    ) -> f64 {
        if stored.is_empty() {
            return 0.0;
        }
        let mut credit = 0.0;
        for (key, stored_value) in stored {
            let Some(candidate) = operation_params.get(key) else { continue };
            credit += match (stored_value, candidate) {
                (serde_json::Value::String(a), serde_json::Value::String(b)) if a == b => 1.0,
                (serde_json::Value::String(a), serde_json::Value::String(b))
                    if a.to_lowercase() == b.to_lowercase() =>
                {
                    0.8
                }
                (a, b) if a == b => 1.0,
                _ => 0.0,
            };
        }
        credit / stored.len() as f64
    }

    pub fn check_operation(
        &self,
        operation_type: &str,
        operation_params: BTreeMap<String, serde_json::Value>,
    ) -> Decision {
        let exact_id: ErrorId = fingerprint::fingerprint(operation_type, &operation_params).into();
        if let Some(row) = self.patterns.get(&exact_id) {
            let decision = Decision {
                should_block: row.block_level == BlockLevel::Block,
                risk: Risk::High,
                confidence: 1.0,
                matched: true,
                error_id: Some(exact_id.clone()),
                solution: Some(row.solution.clone()),
            };
            self.emit_intercept_if_matched(&exact_id, operation_type, &row.error_message, &decision);
            return decision;
        }

        let mut best: Option<(f64, ErrorPattern)> = None;
        for entry in self.patterns.iter() {
            if entry.error_type != operation_type {
                continue;
            }
            let confidence = Self::feature_overlap_confidence(&entry.feature_map, &operation_params);
            let better = best.as_ref().map(|(best_conf, _)| confidence > *best_conf).unwrap_or(true);
            if better {
                best = Some((confidence, entry.value().clone()));
            }
        }

        let Some((confidence, row)) = best else {
            return Decision::no_match();
        };
        let error_id = row.error_id.clone();

        if confidence >= 0.50 && row.block_level != BlockLevel::None {
            let decision = Decision {
                should_block: row.block_level == BlockLevel::Block,
                risk: if confidence >= 0.85 { Risk::High } else { Risk::Medium },
                confidence,
                matched: true,
                error_id: Some(error_id.clone()),
                solution: Some(row.solution.clone()),
            };
            self.emit_intercept_if_matched(&error_id, operation_type, &row.error_message, &decision);
            return decision;
        }

        Decision::no_match()
    }

    fn emit_intercept_if_matched(&self, error_id: &ErrorId, operation_type: &str, message: &str, decision: &Decision) {
        if !decision.matched {
            return;
        }
        let action = if decision.should_block { "blocked" } else { "warned" };
        self.publish_async(
            Channel::ErrorFirewall,
            "error_intercepted",
            serde_json::json!({
                "error_id": error_id.to_string(),
                "operation_type": operation_type,
                "action": action,
                "match_confidence": decision.confidence,
                "solution": decision.solution,
                "message": message,
            }),
        );
    }

    pub fn query_errors(&self, filter: ErrorFilter) -> Vec<ErrorPattern> {
        self.patterns
            .iter()
            .filter(|entry| {
                filter.error_type.as_deref().is_none_or(|t| entry.error_type == t)
                    && filter.block_level.is_none_or(|b| entry.block_level == b)
            })
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn get_stats(&self) -> FirewallStats {
        let mut stats = FirewallStats { total_patterns: self.patterns.len(), ..Default::default() };
        for entry in self.patterns.iter() {
            stats.total_occurrences += entry.occurrence_count;
            match entry.block_level {
                BlockLevel::Block => stats.blocked_count += entry.occurrence_count,
                BlockLevel::Warning => stats.warned_count += entry.occurrence_count,
                BlockLevel::None => {}
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn features(pairs: &[(&str, &str)]) -> BTreeMap<String, serde_json::Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), json!(v))).collect()
    }

    #[tokio::test]
    async fn record_error_is_new_once_then_increments_occurrence() {
        let firewall = ErrorFirewall::new(PubSubBus::new());
        let feature_map = features(&[("host", "db.internal")]);
        let (id_a, is_new_a) = firewall.record_error(
            "timeout", "connect", feature_map.clone(), "connection timed out", "retry with backoff", BlockLevel::Warning,
        );
        assert!(is_new_a);
        let (id_b, is_new_b) =
            firewall.record_error("timeout", "connect", feature_map, "connection timed out", "", BlockLevel::Warning);
        assert!(!is_new_b);
        assert_eq!(id_a, id_b);

        let row = firewall.query_errors(ErrorFilter::default()).into_iter().find(|r| r.error_id == id_a).unwrap();
        assert_eq!(row.occurrence_count, 2);
        assert_eq!(row.solution, "retry with backoff");
    }

    #[tokio::test]
    async fn exact_match_blocks_when_block_level_is_block() {
        let firewall = ErrorFirewall::new(PubSubBus::new());
        let feature_map = features(&[("host", "db.internal")]);
        firewall.record_error("timeout", "connect", feature_map.clone(), "msg", "fix it", BlockLevel::Block);

        let decision = firewall.check_operation("timeout", feature_map);
        assert!(decision.matched);
        assert!(decision.should_block);
        assert_eq!(decision.confidence, 1.0);
    }

    #[tokio::test]
    async fn partial_feature_overlap_produces_medium_risk_warning() {
        let firewall = ErrorFirewall::new(PubSubBus::new());
        let stored = features(&[("host", "db.internal"), ("port", "5432")]);
        firewall.record_error("timeout", "connect", stored, "msg", "check network", BlockLevel::Warning);

        let candidate = features(&[("host", "DB.Internal"), ("port", "9999")]);
        let decision = firewall.check_operation("timeout", candidate);
        assert!(decision.matched);
        assert!(!decision.should_block);
        assert_eq!(decision.risk, Risk::Medium);
    }

    #[tokio::test]
    async fn unrelated_operation_does_not_match() {
        let firewall = ErrorFirewall::new(PubSubBus::new());
        firewall.record_error("timeout", "connect", features(&[("host", "x")]), "msg", "fix", BlockLevel::Block);
        let decision = firewall.check_operation("auth_failure", features(&[("host", "x")]));
        assert!(!decision.matched);
        assert_eq!(decision.risk, Risk::Low);
    }

    #[tokio::test]
    async fn stats_count_patterns_and_occurrences() {
        let firewall = ErrorFirewall::new(PubSubBus::new());
        firewall.record_error("timeout", "connect", features(&[("host", "a")]), "msg", "fix", BlockLevel::Block);
        firewall.record_error("timeout", "connect", features(&[("host", "a")]), "msg", "fix", BlockLevel::Block);
        let stats = firewall.get_stats();
        assert_eq!(stats.total_patterns, 1);
        assert_eq!(stats.blocked_count, 2);
    }
}
