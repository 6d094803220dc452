//! Executor port

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use super::{EntityMap, ExecutionResult, ExtractedEntity, InvocationError, entity_map};
use crate::scenarios::{ApiMapping, Scenario};

/// Performs the API calls of a scenario
#[async_trait]
pub trait ApiExecutor: Send + Sync {
    /// Execute a single mapping against the API
    async fn execute_call(
        &self,
        mapping: &ApiMapping,
        entities: &EntityMap,
    ) -> Result<JsonValue, InvocationError>;

    /// Execute every mapping of `scenario` in declaration order.
    ///
    /// Calls run sequentially and a failed call never prevents the next one;
    /// the result list always has one entry per mapping.
    async fn execute_scenario(
        &self,
        scenario: &Scenario,
        entities: &[ExtractedEntity],
    ) -> Vec<ExecutionResult> {
        let entities = entity_map(entities);
        let mut results = Vec::with_capacity(scenario.api_mappings.len());

        for mapping in &scenario.api_mappings {
            let label = mapping.label();
            match self.execute_call(mapping, &entities).await {
                Ok(data) => {
                    tracing::info!(endpoint = %label, "API call succeeded");
                    results.push(ExecutionResult::succeeded(label, data));
                }
                Err(e) => {
                    tracing::warn!(endpoint = %label, error = %e, "API call failed");
                    results.push(ExecutionResult::failed(label, &e));
                }
            }
        }
        results
    }
}
