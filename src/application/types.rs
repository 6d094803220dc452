//! Data exchanged with callers of the application layer

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use super::DefinitionError;
use crate::execution::{ExecutionResult, ExtractedEntity};
use crate::infrastructure::http::AuthConfig;
use crate::scenarios::Scenario;

/// What the matching collaborator decided for a question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioMatch {
    /// Scenario id or name
    pub scenario: String,
    pub confidence: f64,
    #[serde(default)]
    pub entities: Vec<ExtractedEntity>,
}

impl ScenarioMatch {
    pub fn new(scenario: impl Into<String>, confidence: f64) -> Self {
        Self {
            scenario: scenario.into(),
            confidence,
            entities: Vec::new(),
        }
    }

    pub fn with_entities(mut self, entities: Vec<ExtractedEntity>) -> Self {
        self.entities = entities;
        self
    }
}

/// One call made while answering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiCallSummary {
    pub endpoint: String,
    pub success: bool,
}

/// Answer to a question plus a trace of what produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentResponse {
    pub answer: String,
    pub scenario_used: Option<String>,
    pub api_calls_made: Vec<ApiCallSummary>,
    pub raw_api_responses: Vec<ExecutionResult>,
}

impl AgentResponse {
    /// An answer produced without calling the API
    pub fn text(answer: impl Into<String>, scenario_used: Option<String>) -> Self {
        Self {
            answer: answer.into(),
            scenario_used,
            api_calls_made: Vec::new(),
            raw_api_responses: Vec::new(),
        }
    }

    pub fn with_results(
        answer: impl Into<String>,
        scenario_used: String,
        results: Vec<ExecutionResult>,
    ) -> Self {
        Self {
            answer: answer.into(),
            scenario_used: Some(scenario_used),
            api_calls_made: results
                .iter()
                .map(|r| ApiCallSummary {
                    endpoint: r.endpoint.clone(),
                    success: r.success,
                })
                .collect(),
            raw_api_responses: results,
        }
    }
}

/// Scenario summary shown to end users
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capability {
    pub name: String,
    pub description: String,
    pub sample_questions: Vec<String>,
    pub required_info: Vec<String>,
}

impl From<&Scenario> for Capability {
    fn from(scenario: &Scenario) -> Self {
        Self {
            name: scenario.name.clone(),
            description: scenario.description.clone(),
            sample_questions: scenario.sample_questions.clone(),
            required_info: scenario.required_entities.clone(),
        }
    }
}

/// Agent configuration: identity, scenarios and optional credentials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDefinition {
    #[serde(default = "default_agent_name")]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub scenarios: Vec<Scenario>,
    #[serde(default)]
    pub auth: Option<AuthConfig>,
}

fn default_agent_name() -> String {
    "API Agent".to_string()
}

impl AgentDefinition {
    pub fn new(name: impl Into<String>, scenarios: Vec<Scenario>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            scenarios,
            auth: None,
        }
    }

    pub fn from_json(content: &str) -> Result<Self, DefinitionError> {
        let definition: Self =
            serde_json::from_str(content).map_err(|e| DefinitionError::Invalid(e.to_string()))?;
        definition.validate()?;
        Ok(definition)
    }

    pub fn from_yaml(content: &str) -> Result<Self, DefinitionError> {
        let definition: Self =
            serde_yaml::from_str(content).map_err(|e| DefinitionError::Invalid(e.to_string()))?;
        definition.validate()?;
        Ok(definition)
    }

    /// Pick JSON or YAML from the file extension; anything but `.json` is YAML
    pub fn from_path_content(path: &Path, content: &str) -> Result<Self, DefinitionError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::from_json(content),
            _ => Self::from_yaml(content),
        }
    }

    pub fn validate(&self) -> Result<(), DefinitionError> {
        if self.scenarios.is_empty() {
            return Err(DefinitionError::NoScenarios);
        }
        let mut seen = HashSet::new();
        for scenario in &self.scenarios {
            scenario.validate()?;
            if !seen.insert(scenario.name.as_str()) {
                return Err(DefinitionError::DuplicateScenario(scenario.name.clone()));
            }
        }
        if let Some(auth) = &self.auth {
            auth.validate()
                .map_err(|e| DefinitionError::Invalid(e.to_string()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const DEFINITION: &str = r#"
name: Shop assistant
scenarios:
  - name: product_price
    description: Price of a product
    sample_questions: ["How much is P1?"]
    required_entities: [product_id]
    api_mappings:
      - endpoint_path: /products/{id}
        method: GET
        parameter_mappings:
          - entity_name: product_id
            api_parameter: id
    response_template:
      template: "{{ name }}: {{ price }}"
auth:
  type: bearer
  token: secret-token
"#;

    #[test]
    fn test_definition_from_yaml() {
        let definition = AgentDefinition::from_yaml(DEFINITION).unwrap();
        assert_eq!(definition.name, "Shop assistant");
        assert_eq!(definition.scenarios.len(), 1);
        assert!(definition.auth.is_some());
        assert!(!definition.scenarios[0].id.is_empty());
    }

    #[test]
    fn test_definition_requires_scenarios() {
        let err = AgentDefinition::from_json(r#"{"scenarios": []}"#).unwrap_err();
        assert!(matches!(err, DefinitionError::NoScenarios));
    }

    #[test]
    fn test_definition_rejects_duplicate_names() {
        let content = json!({
            "scenarios": [{ "name": "a" }, { "name": "a" }]
        })
        .to_string();
        let err = AgentDefinition::from_json(&content).unwrap_err();
        assert!(matches!(err, DefinitionError::DuplicateScenario(name) if name == "a"));
    }

    #[test]
    fn test_response_serializes_camel_case() {
        let response = AgentResponse::with_results(
            "ok",
            "product_price".to_string(),
            vec![ExecutionResult::succeeded("GET /products/P1", json!({"price": 1}))],
        );
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["scenarioUsed"], "product_price");
        assert_eq!(value["apiCallsMade"][0]["endpoint"], "GET /products/P1");
        assert_eq!(value["apiCallsMade"][0]["success"], true);
        assert_eq!(value["rawApiResponses"][0]["data"]["price"], 1);
    }

    #[test]
    fn test_capability_from_scenario() {
        let definition = AgentDefinition::from_yaml(DEFINITION).unwrap();
        let capability = Capability::from(&definition.scenarios[0]);
        assert_eq!(capability.required_info, vec!["product_id"]);
        assert_eq!(capability.sample_questions, vec!["How much is P1?"]);
    }
}
