//! Response envelope
//!
//! Every API response body is a single JSON object keyed by what it carries:
//! `{"movie": {...}}`, `{"error": "..."}`, `{"movies": [...], "metadata": {...}}`.

use serde::Serialize;
use serde_json::{Map, Value};

/// Ordered string-to-value mapping serialized as one JSON object
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct Envelope(Map<String, Value>);

impl Envelope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert of an already-converted value
    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    /// Insert a serializable value, failing if it cannot be converted
    pub fn try_with(
        self,
        key: impl Into<String>,
        value: impl Serialize,
    ) -> Result<Self, serde_json::Error> {
        Ok(self.with(key, serde_json::to_value(value)?))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Look up a key (used by tests)
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serializes_as_single_object() {
        let envelope = Envelope::new()
            .with("status", json!("available"))
            .with("version", json!("1.0.0"));

        let out = serde_json::to_string(&envelope).unwrap();
        assert!(out.starts_with('{'));
        assert!(out.ends_with('}'));

        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["status"], "available");
        assert_eq!(parsed["version"], "1.0.0");
    }

    #[test]
    fn test_try_with_converts_serializable_values() {
        #[derive(Serialize)]
        struct Info {
            environment: &'static str,
        }

        let envelope = Envelope::new()
            .try_with("system_info", Info { environment: "development" })
            .unwrap();
        assert_eq!(envelope.get("system_info").unwrap()["environment"], "development");
    }

    #[test]
    fn test_same_envelope_always_serializes() {
        let envelope = Envelope::new().with("movie", json!({"id": 1}));
        let a = serde_json::to_string(&envelope).unwrap();
        let b = serde_json::to_string(&envelope).unwrap();
        assert_eq!(a, b);
    }
}
