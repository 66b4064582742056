//! Tool call types for agent interactions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::hash::{Hash, Hasher};

/// A tool call requested by the model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique identifier for this tool call
    pub id: String,
    /// Name of the tool being called
    pub name: String,
    /// Raw JSON arguments as produced by the backend
    pub arguments_json: String,
}

impl ToolCall {
    /// Create a new tool call
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments_json: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments_json: arguments_json.into(),
        }
    }

    /// Generate a unique ID for a tool call
    pub fn generate_id() -> String {
        format!("call_{}", &uuid::Uuid::new_v4().simple().to_string()[..24])
    }

    /// Parse the arguments, treating an empty string as `{}`
    pub fn arguments(&self) -> Result<Value, serde_json::Error> {
        if self.arguments_json.trim().is_empty() {
            return Ok(Value::Object(Default::default()));
        }
        serde_json::from_str(&self.arguments_json)
    }

    /// Stable hash of the arguments, insensitive to key order and whitespace
    pub fn input_hash(&self) -> String {
        input_hash(&self.arguments_json)
    }
}

/// SHA-256 (hex) of the canonical form of a JSON argument string.
///
/// Arguments that do not parse are hashed verbatim.
pub fn input_hash(arguments_json: &str) -> String {
    let canonical = match serde_json::from_str::<Value>(arguments_json) {
        Ok(value) => canonicalize(value).to_string(),
        Err(_) => arguments_json.to_string(),
    };
    let digest = Sha256::digest(canonical.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(entries.into_iter().map(|(k, v)| (k, canonicalize(v))).collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// Result of executing a tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Output handed back to the model
    pub content: String,
    /// Whether the tool failed
    #[serde(default)]
    pub is_error: bool,
}

impl ToolResult {
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
        }
    }

    /// Serialize a JSON value as the result content
    pub fn json(value: &Value) -> Self {
        Self::success(value.to_string())
    }
}

/// An executed call in the loop history.
///
/// Identity is `(name, input_hash)`; the timestamp is informational.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub name: String,
    pub input_hash: String,
    pub timestamp: DateTime<Utc>,
}

impl ToolCallRecord {
    pub fn new(name: impl Into<String>, input_hash: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            input_hash: input_hash.into(),
            timestamp: Utc::now(),
        }
    }

    /// Record for an executed call
    pub fn from_call(call: &ToolCall) -> Self {
        Self::new(call.name.clone(), call.input_hash())
    }
}

impl PartialEq for ToolCallRecord {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.input_hash == other.input_hash
    }
}

impl Eq for ToolCallRecord {}

impl Hash for ToolCallRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.input_hash.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_input_hash_ignores_key_order_and_whitespace() {
        let a = input_hash(r#"{"city":"Paris","units":"metric"}"#);
        let b = input_hash(r#"{ "units": "metric",  "city": "Paris" }"#);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, input_hash(r#"{"city":"Rome","units":"metric"}"#));
    }

    #[test]
    fn test_input_hash_of_invalid_json_uses_raw_text() {
        assert_eq!(input_hash("not json"), input_hash("not json"));
        assert_ne!(input_hash("not json"), input_hash("not  json"));
    }

    #[test]
    fn test_record_identity_ignores_timestamp() {
        let first = ToolCallRecord::new("search", "abc");
        let mut second = ToolCallRecord::new("search", "abc");
        second.timestamp = first.timestamp + chrono::Duration::seconds(30);

        assert_eq!(first, second);
        let set: HashSet<_> = [first, second].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_empty_arguments_parse_as_object() {
        let call = ToolCall::new("c", "now", "");
        assert_eq!(call.arguments().unwrap(), serde_json::json!({}));
    }

    #[test]
    fn test_generate_id() {
        let id = ToolCall::generate_id();
        assert!(id.starts_with("call_"));
        assert_eq!(id.len(), 29);
    }
}
