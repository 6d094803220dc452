//! Application layer error types

use thiserror::Error;

/// Failure reported by a [`ScenarioMatcher`](super::ScenarioMatcher)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatchError {
    #[error("Scenario matching failed: {0}")]
    Failed(String),

    #[error("Matcher unavailable: {0}")]
    Unavailable(String),
}

/// Problems with an agent definition file
#[derive(Error, Debug)]
pub enum DefinitionError {
    #[error("Invalid agent definition: {0}")]
    Invalid(String),

    #[error("Agent definition has no scenarios")]
    NoScenarios,

    #[error("Duplicate scenario name: {0}")]
    DuplicateScenario(String),

    #[error(transparent)]
    Scenario(#[from] crate::scenarios::ScenarioError),
}
