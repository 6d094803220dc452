//! reqwest-backed API executor

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::{Value as JsonValue, json};
use std::sync::Arc;
use std::time::Duration;

use super::AuthConfig;
use crate::core::config::HttpSettings;
use crate::execution::{ApiExecutor, EntityMap, InvocationError, RequestPlan};
use crate::infrastructure::openapi::{ApiSpec, HttpMethod};
use crate::scenarios::ApiMapping;

/// Executes mappings against the live API described by an [`ApiSpec`]
#[derive(Debug, Clone)]
pub struct HttpApiExecutor {
    spec: Arc<ApiSpec>,
    client: Client,
    base_url: String,
    auth: Option<AuthConfig>,
    timeout: Duration,
}

impl HttpApiExecutor {
    pub fn new(spec: Arc<ApiSpec>, settings: &HttpSettings) -> Result<Self, InvocationError> {
        let client = Client::builder()
            .user_agent(settings.user_agent.as_str())
            .build()
            .map_err(|e| InvocationError::Transport(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url: spec.base_url.clone(),
            spec,
            client,
            auth: None,
            timeout: Duration::from_secs(settings.timeout_secs),
        })
    }

    pub fn with_auth(mut self, auth: Option<AuthConfig>) -> Self {
        if let Some(auth) = &auth {
            if !auth.is_attached() {
                tracing::warn!(
                    "API key configured for the query string is not attached to requests"
                );
            }
        }
        self.auth = auth;
        self
    }

    /// Send requests to `base_url` instead of the spec's first server
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn request_error(&self, error: reqwest::Error) -> InvocationError {
        if error.is_timeout() {
            InvocationError::Timeout(self.timeout.as_secs())
        } else {
            InvocationError::Transport(error.to_string())
        }
    }
}

#[async_trait]
impl ApiExecutor for HttpApiExecutor {
    async fn execute_call(
        &self,
        mapping: &ApiMapping,
        entities: &EntityMap,
    ) -> Result<JsonValue, InvocationError> {
        let mut plan = RequestPlan::build(&self.spec, mapping, entities)?;
        if let Some((name, value)) = self.auth.as_ref().and_then(AuthConfig::header) {
            plan.add_header_if_absent(&name, value);
        }
        let url = plan.url(&self.base_url)?;
        tracing::debug!(method = %plan.method, %url, query = ?plan.query, "Executing API call");

        let mut request = self
            .client
            .request(to_reqwest(plan.method), url)
            .timeout(self.timeout);
        for (name, value) in &plan.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if !plan.query.is_empty() {
            request = request.query(&plan.query);
        }
        if let Some(body) = &plan.body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| self.request_error(e))?;
        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();
        let text = response.text().await.map_err(|e| self.request_error(e))?;

        if !(status.is_success() || status.is_redirection()) {
            return Err(InvocationError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        if content_type.contains("application/json") {
            if text.trim().is_empty() {
                return Ok(JsonValue::Null);
            }
            serde_json::from_str(&text)
                .map_err(|e| InvocationError::Transport(format!("Invalid JSON response: {e}")))
        } else {
            Ok(json!({ "rawResponse": text }))
        }
    }
}

fn to_reqwest(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}
