//! Process-wide state shared by every request

use serde_json::{Map, Value as JsonValue};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use super::{AgentDefinition, AgentResponse, QaAgent, ScenarioMatcher};
use crate::core::{Error, Result, Settings};
use crate::execution::ApiExecutor;
use crate::infrastructure::http::{HttpApiExecutor, MockApiExecutor};
use crate::infrastructure::openapi::{ApiSpec, LoadedSpec, SpecFormat, parse_document};
use crate::infrastructure::templates::TemplateRenderer;

/// Settings, the shared renderer, the matcher and the live agents.
///
/// Built once at start-up and passed explicitly to whoever needs it.
pub struct AppContext {
    settings: Arc<Settings>,
    renderer: Arc<TemplateRenderer>,
    matcher: Arc<dyn ScenarioMatcher>,
    agents: RwLock<HashMap<String, Arc<QaAgent>>>,
}

impl AppContext {
    pub fn new(settings: Settings, matcher: Arc<dyn ScenarioMatcher>) -> Self {
        Self {
            settings: Arc::new(settings),
            renderer: Arc::new(TemplateRenderer::new()),
            matcher,
            agents: RwLock::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn renderer(&self) -> &TemplateRenderer {
        &self.renderer
    }

    /// Normalize an uploaded API description; warnings come back as issues
    pub fn upload_spec(&self, content: &str, format: Option<SpecFormat>) -> Result<LoadedSpec> {
        let format = format.unwrap_or_else(|| SpecFormat::detect(content));
        let loaded = parse_document(content, format)?;
        info!(
            title = %loaded.spec.title,
            endpoints = loaded.spec.endpoints.len(),
            warnings = loaded.warnings.len(),
            "API description uploaded"
        );
        Ok(loaded)
    }

    /// Create an agent calling the real API, or the offline executor when
    /// `use_mock` is set. Returns the new agent's id.
    pub async fn create_agent(
        &self,
        definition: AgentDefinition,
        spec: Arc<ApiSpec>,
        use_mock: bool,
    ) -> Result<String> {
        definition.validate()?;
        let executor: Arc<dyn ApiExecutor> = if use_mock {
            Arc::new(MockApiExecutor::new(spec))
        } else {
            let auth = definition.auth.clone().or_else(|| self.settings.auth.clone());
            Arc::new(HttpApiExecutor::new(spec, &self.settings.http)?.with_auth(auth))
        };
        self.create_agent_with_executor(definition, executor).await
    }

    /// Create an agent around an already-built executor
    pub async fn create_agent_with_executor(
        &self,
        definition: AgentDefinition,
        executor: Arc<dyn ApiExecutor>,
    ) -> Result<String> {
        definition.validate()?;
        let id = uuid::Uuid::new_v4().to_string();
        let agent = QaAgent::new(
            id.clone(),
            definition,
            executor,
            Arc::clone(&self.matcher),
            Arc::clone(&self.renderer),
            Arc::clone(&self.settings),
        );
        info!(agent = %id, name = %agent.name(), "Agent created");
        self.agents.write().await.insert(id.clone(), Arc::new(agent));
        Ok(id)
    }

    pub async fn get_agent(&self, id: &str) -> Option<Arc<QaAgent>> {
        self.agents.read().await.get(id).cloned()
    }

    /// Returns whether an agent was removed
    pub async fn remove_agent(&self, id: &str) -> bool {
        self.agents.write().await.remove(id).is_some()
    }

    /// Ids of all agents, sorted
    pub async fn list_agents(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.agents.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub async fn answer(&self, agent_id: &str, question: &str) -> Result<AgentResponse> {
        let agent = self
            .get_agent(agent_id)
            .await
            .ok_or_else(|| Error::AgentNotFound(agent_id.to_string()))?;
        Ok(agent.answer(question).await)
    }

    /// Render `template` against sample data. Objects are used as the context
    /// directly; any other value is bound as `data`.
    pub fn preview_template(&self, template: &str, sample: &JsonValue) -> String {
        let context = match sample {
            JsonValue::Object(fields) => fields.clone(),
            other => {
                let mut context = Map::new();
                context.insert("data".to_string(), other.clone());
                context
            }
        };
        self.renderer.render(
            template,
            &context,
            Some(&self.settings.messages.error_template),
        )
    }

    pub fn validate_template(&self, template: &str) -> (bool, Option<String>) {
        self.renderer.validate_template(template)
    }

    pub fn extract_variables(&self, template: &str) -> BTreeSet<String> {
        self.renderer.extract_variables(template)
    }
}
