//! Offline executor returning canned or synthesized responses

use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue, json};
use std::collections::HashMap;
use std::sync::Arc;

use crate::execution::{ApiExecutor, EntityMap, InvocationError, RequestPlan};
use crate::infrastructure::openapi::{ApiSpec, HttpMethod};
use crate::scenarios::ApiMapping;

/// Answers calls without touching the network.
///
/// Lookup order: canned failure, canned response (keyed `METHOD:path`), the
/// first 2xx response example, a value synthesized from the first 2xx response
/// schema, then a generic acknowledgement.
#[derive(Debug, Clone)]
pub struct MockApiExecutor {
    spec: Arc<ApiSpec>,
    responses: HashMap<String, JsonValue>,
    failures: HashMap<String, String>,
}

impl MockApiExecutor {
    pub fn new(spec: Arc<ApiSpec>) -> Self {
        Self {
            spec,
            responses: HashMap::new(),
            failures: HashMap::new(),
        }
    }

    pub fn with_response(mut self, method: HttpMethod, path: &str, response: JsonValue) -> Self {
        self.responses.insert(mock_key(method, path), response);
        self
    }

    pub fn with_failure(mut self, method: HttpMethod, path: &str, message: &str) -> Self {
        self.failures
            .insert(mock_key(method, path), message.to_string());
        self
    }

    fn documented_response(&self, mapping: &ApiMapping) -> Option<JsonValue> {
        let endpoint = self
            .spec
            .find_endpoint(&mapping.endpoint_path, mapping.method)?;

        endpoint
            .responses
            .iter()
            .filter(|response| response.is_success())
            .find_map(|response| {
                if let Some(example) = response.example.as_ref().filter(|e| !e.is_null()) {
                    return Some(example.clone());
                }
                response
                    .schema
                    .as_object()
                    .filter(|schema| !schema.is_empty())
                    .map(synthesize)
            })
    }
}

#[async_trait]
impl ApiExecutor for MockApiExecutor {
    async fn execute_call(
        &self,
        mapping: &ApiMapping,
        entities: &EntityMap,
    ) -> Result<JsonValue, InvocationError> {
        let plan = RequestPlan::build(&self.spec, mapping, entities)?;
        tracing::debug!(method = %plan.method, path = %plan.path, "Mock API call");

        let key = mock_key(mapping.method, &mapping.endpoint_path);
        if let Some(message) = self.failures.get(&key) {
            return Err(InvocationError::Simulated(message.clone()));
        }
        if let Some(response) = self.responses.get(&key) {
            return Ok(response.clone());
        }

        Ok(self
            .documented_response(mapping)
            .unwrap_or_else(|| json!({ "message": "Mock response", "success": true })))
    }
}

fn mock_key(method: HttpMethod, path: &str) -> String {
    format!("{method}:{path}")
}

/// Build a sample object from schema properties, preferring property examples
fn synthesize(schema: &Map<String, JsonValue>) -> JsonValue {
    let mut result = Map::new();
    let Some(properties) = schema.get("properties").and_then(JsonValue::as_object) else {
        return JsonValue::Object(result);
    };

    for (name, property) in properties {
        let fallback = match property.get("type").and_then(JsonValue::as_str).unwrap_or("string") {
            "string" => json!(format!("mock_{name}")),
            "integer" => json!(123),
            "number" => json!(123.45),
            "boolean" => json!(true),
            "array" => json!([]),
            "object" => json!({}),
            _ => continue,
        };
        let value = property.get("example").cloned().unwrap_or(fallback);
        result.insert(name.clone(), value);
    }
    JsonValue::Object(result)
}
