//! Question answering over one API

use serde_json::{Map, Value as JsonValue};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{AgentDefinition, AgentResponse, Capability, ScenarioMatch, ScenarioMatcher};
use crate::core::Settings;
use crate::execution::{ApiExecutor, ExecutionResult};
use crate::infrastructure::templates::TemplateRenderer;
use crate::scenarios::Scenario;

/// An agent bound to one API description and a fixed set of scenarios
pub struct QaAgent {
    id: String,
    definition: AgentDefinition,
    executor: Arc<dyn ApiExecutor>,
    matcher: Arc<dyn ScenarioMatcher>,
    renderer: Arc<TemplateRenderer>,
    settings: Arc<Settings>,
}

impl QaAgent {
    pub fn new(
        id: impl Into<String>,
        definition: AgentDefinition,
        executor: Arc<dyn ApiExecutor>,
        matcher: Arc<dyn ScenarioMatcher>,
        renderer: Arc<TemplateRenderer>,
        settings: Arc<Settings>,
    ) -> Self {
        Self {
            id: id.into(),
            definition,
            executor,
            matcher,
            renderer,
            settings,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn description(&self) -> &str {
        &self.definition.description
    }

    pub fn scenarios(&self) -> &[Scenario] {
        &self.definition.scenarios
    }

    /// Answer a question. Every failure ends up as text in the response.
    pub async fn answer(&self, question: &str) -> AgentResponse {
        let messages = &self.settings.messages;

        let Some((scenario, decision)) = self.select_scenario(question).await else {
            return AgentResponse::text(&messages.low_confidence, None);
        };
        info!(agent = %self.id, scenario = %scenario.name, "Scenario selected");

        let provided: Vec<&str> = decision.entities.iter().map(|e| e.name.as_str()).collect();
        let missing = scenario.missing_entities(&provided);
        if !missing.is_empty() {
            debug!(?missing, "Required entities missing");
            return AgentResponse::text(
                format!("{} {}", messages.missing_entities, missing.join(", ")),
                Some(scenario.name.clone()),
            );
        }

        let results = self
            .executor
            .execute_scenario(scenario, &decision.entities)
            .await;
        let answer = self.compose(question, scenario, &results).await;
        AgentResponse::with_results(answer, scenario.name.clone(), results)
    }

    /// Name, description, sample questions and required entities of each scenario
    pub fn list_capabilities(&self) -> Vec<Capability> {
        self.scenarios().iter().map(Capability::from).collect()
    }

    pub fn scenario_by_name(&self, name: &str) -> Option<&Scenario> {
        self.scenarios().iter().find(|s| s.name == name)
    }

    async fn select_scenario(&self, question: &str) -> Option<(&Scenario, ScenarioMatch)> {
        let decision = match self.matcher.match_scenario(question, self.scenarios()).await {
            Ok(Some(decision)) => decision,
            Ok(None) => {
                debug!("No scenario matched");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "Scenario matcher failed");
                return None;
            }
        };

        let threshold = self.settings.matching.confidence_threshold;
        // NaN compares false against everything and must not pass the gate
        if decision.confidence.is_nan() || decision.confidence < threshold {
            debug!(
                confidence = decision.confidence,
                threshold, "Match below confidence threshold"
            );
            return None;
        }

        let scenario = self
            .scenarios()
            .iter()
            .find(|s| s.id == decision.scenario)
            .or_else(|| self.scenario_by_name(&decision.scenario));
        match scenario {
            Some(scenario) => Some((scenario, decision)),
            None => {
                warn!(scenario = %decision.scenario, "Matcher chose an unknown scenario");
                None
            }
        }
    }

    async fn compose(
        &self,
        question: &str,
        scenario: &Scenario,
        results: &[ExecutionResult],
    ) -> String {
        if let Some(template) = &scenario.response_template {
            return self.renderer.render_invocation_results(
                &template.template,
                results,
                &template.error_template,
                &template.no_data_template,
            );
        }

        let mut data: Vec<JsonValue> = results
            .iter()
            .filter(|r| r.has_data())
            .map(|r| r.data.clone())
            .collect();

        if data.is_empty() {
            let errors: Vec<&str> = results.iter().filter_map(|r| r.error.as_deref()).collect();
            if errors.is_empty() {
                return self.renderer.render(
                    &self.settings.messages.no_data_template,
                    &Map::new(),
                    None,
                );
            }
            return format!("{} {}", self.settings.messages.all_failed, errors.join("; "));
        }

        let data = if data.len() == 1 {
            data.remove(0)
        } else {
            JsonValue::Array(data)
        };
        if let Some(answer) = self.matcher.compose_answer(question, scenario, &data).await {
            return answer;
        }
        serde_json::to_string_pretty(&data).unwrap_or_else(|_| data.to_string())
    }
}
