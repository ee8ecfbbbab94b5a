//! `error_id` fingerprinting (spec §4.F).

use serde_json::Value;
use std::collections::BTreeMap;

/// Canonicalizes a feature map: keys sorted (via `BTreeMap`'s natural
/// ordering), string values lowercased, numbers rendered via their
/// canonical JSON form.
pub fn canonicalize(feature_map: &BTreeMap<String, Value>) -> String {
    feature_map
        .iter()
        .map(|(k, v)| format!("{k}={}", canonicalize_value(v)))
        .collect::<Vec<_>>()
        .join("&")
}

fn canonicalize_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.to_lowercase(),
        other => other.to_string(),
    }
}

pub fn fingerprint(error_type: &str, feature_map: &BTreeMap<String, Value>) -> String {
    let canonical = format!("{error_type}|{}", canonicalize(feature_map));
    hex::encode(md5::compute(canonical.as_bytes()).0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_order_does_not_affect_fingerprint() {
        let mut a = BTreeMap::new();
        a.insert("b".to_string(), json!("X"));
        a.insert("a".to_string(), json!("Y"));

        let mut b = BTreeMap::new();
        b.insert("a".to_string(), json!("Y"));
        b.insert("b".to_string(), json!("X"));

        assert_eq!(fingerprint("timeout", &a), fingerprint("timeout", &b));
    }

    #[test]
    fn string_case_does_not_affect_fingerprint() {
        let mut a = BTreeMap::new();
        a.insert("host".to_string(), json!("DB.Internal"));
        let mut b = BTreeMap::new();
        b.insert("host".to_string(), json!("db.internal"));
        assert_eq!(fingerprint("connect", &a), fingerprint("connect", &b));
    }

    #[test]
    fn different_error_types_produce_different_fingerprints() {
        let features = BTreeMap::new();
        assert_ne!(fingerprint("timeout", &features), fingerprint("auth", &features));
    }
}
