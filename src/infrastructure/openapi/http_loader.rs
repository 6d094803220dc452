//! HTTP-based API description loader

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::{LoadError, LoadedSpec, SpecFormat, SpecLoader, parse_document};

/// Loads API descriptions from HTTP/HTTPS URLs
#[derive(Debug, Clone)]
pub struct HttpSpecLoader {
    client: Client,
}

impl HttpSpecLoader {
    pub fn new() -> Result<Self, LoadError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .map_err(|e| LoadError::Http(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// Use a preconfigured client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SpecLoader for HttpSpecLoader {
    async fn load(&self, source: &str) -> Result<LoadedSpec, LoadError> {
        if !source.starts_with("http://") && !source.starts_with("https://") {
            return Err(LoadError::Http(format!(
                "HttpSpecLoader only handles HTTP(S) URLs, got: {source}"
            )));
        }

        let response = self.client.get(source).send().await.map_err(|e| {
            LoadError::Http(format!("Failed to fetch API description from {source}: {e}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::Http(format!("HTTP {status} when fetching {source}")));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();

        let content = response
            .text()
            .await
            .map_err(|e| LoadError::Http(format!("Failed to read response body: {e}")))?;

        let format = if content_type.contains("json") {
            SpecFormat::Json
        } else if content_type.contains("yaml") {
            SpecFormat::Yaml
        } else {
            SpecFormat::from_extension(source).unwrap_or_else(|| SpecFormat::detect(&content))
        };

        parse_document(&content, format)
    }
}
