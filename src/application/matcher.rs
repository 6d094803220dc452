//! Port to the question-understanding collaborator

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use super::{MatchError, ScenarioMatch};
use crate::execution::ExtractedEntity;
use crate::scenarios::Scenario;

/// Picks a scenario for a question and extracts its entities.
///
/// Implementations usually call out to a language model; this crate only
/// consumes the decision.
#[async_trait]
pub trait ScenarioMatcher: Send + Sync {
    /// Choose among `scenarios`; `None` when nothing fits
    async fn match_scenario(
        &self,
        question: &str,
        scenarios: &[Scenario],
    ) -> Result<Option<ScenarioMatch>, MatchError>;

    /// Phrase an answer from raw data for scenarios without a template.
    /// `None` lets the agent fall back to the data itself.
    async fn compose_answer(
        &self,
        _question: &str,
        _scenario: &Scenario,
        _data: &JsonValue,
    ) -> Option<String> {
        None
    }
}

/// Matcher that always returns the same decision
#[derive(Debug, Clone, Default)]
pub struct PresetMatcher {
    decision: Option<ScenarioMatch>,
    answer: Option<String>,
}

impl PresetMatcher {
    /// Match `scenario` (id or name) with full confidence
    pub fn new(scenario: impl Into<String>, entities: Vec<ExtractedEntity>) -> Self {
        Self {
            decision: Some(ScenarioMatch::new(scenario, 1.0).with_entities(entities)),
            answer: None,
        }
    }

    /// Never match anything
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        if let Some(decision) = self.decision.as_mut() {
            decision.confidence = confidence;
        }
        self
    }

    /// Text returned from `compose_answer`
    pub fn with_answer(mut self, answer: impl Into<String>) -> Self {
        self.answer = Some(answer.into());
        self
    }
}

#[async_trait]
impl ScenarioMatcher for PresetMatcher {
    async fn match_scenario(
        &self,
        _question: &str,
        _scenarios: &[Scenario],
    ) -> Result<Option<ScenarioMatch>, MatchError> {
        Ok(self.decision.clone())
    }

    async fn compose_answer(
        &self,
        _question: &str,
        _scenario: &Scenario,
        _data: &JsonValue,
    ) -> Option<String> {
        self.answer.clone()
    }
}
