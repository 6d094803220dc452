//! Values flowing through the invocation engine

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use super::InvocationError;

/// Entity values keyed by entity name
pub type EntityMap = Map<String, JsonValue>;

/// A named value extracted from the user's question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedEntity {
    pub name: String,
    pub value: JsonValue,
    #[serde(default = "full_confidence")]
    pub confidence: f64,
}

fn full_confidence() -> f64 {
    1.0
}

impl ExtractedEntity {
    pub fn new(name: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            confidence: 1.0,
        }
    }
}

/// Collapse extracted entities into a name -> value map; later entries win
pub fn entity_map(entities: &[ExtractedEntity]) -> EntityMap {
    entities
        .iter()
        .map(|e| (e.name.clone(), e.value.clone()))
        .collect()
}

/// Outcome of one mapping's call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// `"METHOD path"` of the mapping
    pub endpoint: String,
    pub success: bool,
    pub data: JsonValue,
    pub error: Option<String>,
}

impl ExecutionResult {
    pub fn succeeded(endpoint: impl Into<String>, data: JsonValue) -> Self {
        Self {
            endpoint: endpoint.into(),
            success: true,
            data,
            error: None,
        }
    }

    pub fn failed(endpoint: impl Into<String>, error: &InvocationError) -> Self {
        Self {
            endpoint: endpoint.into(),
            success: false,
            data: JsonValue::Null,
            error: Some(error.to_string()),
        }
    }

    /// Succeeded with a non-empty body
    pub fn has_data(&self) -> bool {
        self.success && is_truthy(&self.data)
    }
}

/// Whether a response body counts as data
pub fn is_truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Bool(b) => *b,
        JsonValue::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        JsonValue::String(s) => !s.is_empty(),
        JsonValue::Array(items) => !items.is_empty(),
        JsonValue::Object(fields) => !fields.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_has_data_requires_success_and_content() {
        assert!(ExecutionResult::succeeded("GET /a", json!({"id": 1})).has_data());
        assert!(!ExecutionResult::succeeded("GET /a", json!({})).has_data());
        assert!(!ExecutionResult::succeeded("GET /a", json!(0)).has_data());
        assert!(!ExecutionResult::succeeded("GET /a", JsonValue::Null).has_data());
        let failed = ExecutionResult::failed("GET /a", &InvocationError::Timeout(5));
        assert!(!failed.has_data());
        assert_eq!(failed.error.as_deref(), Some("Request timeout after 5s"));
    }

    #[test]
    fn test_entity_map_later_entries_win() {
        let map = entity_map(&[
            ExtractedEntity::new("id", 1),
            ExtractedEntity::new("id", 2),
        ]);
        assert_eq!(map["id"], json!(2));
    }
}
