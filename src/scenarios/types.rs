//! Declarative scenario definitions

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use super::ScenarioError;
use crate::infrastructure::openapi::HttpMethod;

pub const DEFAULT_ERROR_TEMPLATE: &str =
    "Sorry, the information could not be retrieved. Error: {{ error }}";
pub const DEFAULT_NO_DATA_TEMPLATE: &str = "No matching data found.";

/// A named question-answering recipe: which entities to collect, which calls to
/// make and how to render the result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default = "generate_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub sample_questions: Vec<String>,
    #[serde(default)]
    pub required_entities: Vec<String>,
    #[serde(default)]
    pub api_mappings: Vec<ApiMapping>,
    #[serde(default)]
    pub response_template: Option<ResponseTemplate>,
}

fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl Scenario {
    /// Build and validate a scenario
    pub fn new(
        name: impl Into<String>,
        api_mappings: Vec<ApiMapping>,
        response_template: Option<ResponseTemplate>,
    ) -> Result<Self, ScenarioError> {
        let scenario = Self {
            id: generate_id(),
            name: name.into(),
            description: String::new(),
            sample_questions: Vec::new(),
            required_entities: Vec::new(),
            api_mappings,
            response_template,
        };
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn with_required_entities<I, S>(mut self, entities: I) -> Result<Self, ScenarioError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_entities = entities.into_iter().map(Into::into).collect();
        self.validate()?;
        Ok(self)
    }

    pub fn from_json(content: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario =
            serde_json::from_str(content).map_err(|e| ScenarioError::Invalid(e.to_string()))?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario =
            serde_yaml::from_str(content).map_err(|e| ScenarioError::Invalid(e.to_string()))?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Check the structural rules every scenario must satisfy
    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.name.trim().is_empty() {
            return Err(ScenarioError::EmptyName);
        }
        if self.required_entities.iter().any(|e| e.trim().is_empty()) {
            return Err(ScenarioError::EmptyRequiredEntity(self.name.clone()));
        }
        self.api_mappings.iter().try_for_each(ApiMapping::validate)
    }

    /// Required entities that are not present in `provided`
    pub fn missing_entities<'a>(&'a self, provided: &[&str]) -> Vec<&'a str> {
        self.required_entities
            .iter()
            .map(String::as_str)
            .filter(|name| !provided.contains(name))
            .collect()
    }
}

/// One API call of a scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiMapping {
    pub endpoint_path: String,
    pub method: HttpMethod,
    #[serde(default)]
    pub parameter_mappings: Vec<ParameterMapping>,
    #[serde(default)]
    pub static_params: Map<String, JsonValue>,
}

impl ApiMapping {
    pub fn new(method: HttpMethod, endpoint_path: impl Into<String>) -> Self {
        Self {
            endpoint_path: endpoint_path.into(),
            method,
            parameter_mappings: Vec::new(),
            static_params: Map::new(),
        }
    }

    pub fn map(mut self, entity_name: &str, api_parameter: &str) -> Self {
        self.parameter_mappings
            .push(ParameterMapping::new(entity_name, api_parameter, None));
        self
    }

    pub fn map_with(mut self, entity_name: &str, api_parameter: &str, transform: &str) -> Self {
        self.parameter_mappings.push(ParameterMapping::new(
            entity_name,
            api_parameter,
            Some(transform),
        ));
        self
    }

    pub fn with_static(mut self, name: &str, value: JsonValue) -> Self {
        self.static_params.insert(name.to_string(), value);
        self
    }

    /// Label used in results, e.g. `GET /products/{id}`
    pub fn label(&self) -> String {
        format!("{} {}", self.method, self.endpoint_path)
    }

    pub fn validate(&self) -> Result<(), ScenarioError> {
        if !self.endpoint_path.starts_with('/') {
            return Err(ScenarioError::InvalidPath(self.endpoint_path.clone()));
        }
        for mapping in &self.parameter_mappings {
            let field = if mapping.entity_name.trim().is_empty() {
                "entity name"
            } else if mapping.api_parameter.trim().is_empty() {
                "API parameter name"
            } else {
                continue;
            };
            return Err(ScenarioError::EmptyMappingField {
                endpoint: self.label(),
                field,
            });
        }
        Ok(())
    }
}

/// Entity to API parameter binding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterMapping {
    pub entity_name: String,
    pub api_parameter: String,
    #[serde(default)]
    pub transform: Option<String>,
}

impl ParameterMapping {
    pub fn new(entity_name: &str, api_parameter: &str, transform: Option<&str>) -> Self {
        Self {
            entity_name: entity_name.to_string(),
            api_parameter: api_parameter.to_string(),
            transform: transform.map(String::from),
        }
    }
}

/// Templates used to render a scenario's answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseTemplate {
    pub template: String,
    #[serde(default = "default_error_template")]
    pub error_template: String,
    #[serde(default = "default_no_data_template")]
    pub no_data_template: String,
}

fn default_error_template() -> String {
    DEFAULT_ERROR_TEMPLATE.to_string()
}

fn default_no_data_template() -> String {
    DEFAULT_NO_DATA_TEMPLATE.to_string()
}

impl ResponseTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            error_template: default_error_template(),
            no_data_template: default_no_data_template(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scenario_from_json_applies_defaults() {
        let scenario = Scenario::from_json(
            r#"{
                "name": "product_price",
                "required_entities": ["product_id"],
                "api_mappings": [{
                    "endpoint_path": "/products/{id}",
                    "method": "get",
                    "parameter_mappings": [{ "entity_name": "product_id", "api_parameter": "id" }]
                }],
                "response_template": { "template": "{{ name }}" }
            }"#,
        )
        .unwrap();

        assert!(!scenario.id.is_empty());
        assert_eq!(scenario.api_mappings[0].method, HttpMethod::Get);
        assert!(scenario.api_mappings[0].static_params.is_empty());
        let template = scenario.response_template.unwrap();
        assert_eq!(template.error_template, DEFAULT_ERROR_TEMPLATE);
        assert_eq!(template.no_data_template, DEFAULT_NO_DATA_TEMPLATE);
    }

    #[test]
    fn test_scenario_from_yaml() {
        let scenario = Scenario::from_yaml(
            "id: s1\nname: orders\napi_mappings:\n  - endpoint_path: /orders\n    method: POST\n    static_params:\n      status: open\n",
        )
        .unwrap();
        assert_eq!(scenario.id, "s1");
        assert_eq!(scenario.api_mappings[0].static_params["status"], json!("open"));
    }

    #[test]
    fn test_unknown_method_is_rejected() {
        let err = Scenario::from_json(
            r#"{"name": "x", "api_mappings": [{"endpoint_path": "/a", "method": "TRACE"}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ScenarioError::Invalid(_)));
    }

    #[test]
    fn test_validation_rules() {
        assert_eq!(
            Scenario::new(" ", vec![], None).unwrap_err(),
            ScenarioError::EmptyName
        );
        assert_eq!(
            Scenario::new("s", vec![ApiMapping::new(HttpMethod::Get, "items")], None).unwrap_err(),
            ScenarioError::InvalidPath("items".to_string())
        );
        assert_eq!(
            Scenario::new("s", vec![ApiMapping::new(HttpMethod::Get, "/items").map("", "id")], None)
                .unwrap_err(),
            ScenarioError::EmptyMappingField {
                endpoint: "GET /items".to_string(),
                field: "entity name",
            }
        );
        let scenario = Scenario::new("s", vec![], None).unwrap();
        assert_eq!(
            scenario.with_required_entities(["a", ""]).unwrap_err(),
            ScenarioError::EmptyRequiredEntity("s".to_string())
        );
    }

    #[test]
    fn test_missing_entities_preserves_declaration_order() {
        let scenario = Scenario::new("s", vec![], None)
            .unwrap()
            .with_required_entities(["city", "date", "guests"])
            .unwrap();
        assert_eq!(scenario.missing_entities(&["date"]), vec!["city", "guests"]);
    }
}
