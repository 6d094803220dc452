//! Application settings
//!
//! Settings are read from TOML. Every section is optional and falls back to
//! its defaults:
//!
//! ```toml
//! [http]
//! timeout_secs = 30
//!
//! [matching]
//! confidence_threshold = 0.3
//!
//! [messages]
//! low_confidence = "Sorry, I did not understand the question."
//!
//! [auth]
//! type = "bearer"
//! token = "..."
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::{Error, Result};
use crate::infrastructure::http::AuthConfig;
use crate::scenarios::{DEFAULT_ERROR_TEMPLATE, DEFAULT_NO_DATA_TEMPLATE};

const CONFIG_DIR: &str = "api-agent";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub http: HttpSettings,
    pub matching: MatchingSettings,
    pub messages: Messages,
    pub auth: Option<AuthConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"))
                .to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingSettings {
    /// Matches below this confidence are treated as "no match"
    pub confidence_threshold: f64,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.3,
        }
    }
}

/// User-facing texts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Messages {
    pub low_confidence: String,
    /// Prefix followed by the comma-separated missing entity names
    pub missing_entities: String,
    pub error_template: String,
    pub no_data_template: String,
    /// Prefix of the joined call errors when no call succeeded and the scenario
    /// has no template
    pub all_failed: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            low_confidence: "Sorry, I could not understand your question. Please try rephrasing it."
                .to_string(),
            missing_entities: "Please provide more information:".to_string(),
            error_template: DEFAULT_ERROR_TEMPLATE.to_string(),
            no_data_template: DEFAULT_NO_DATA_TEMPLATE.to_string(),
            all_failed: "Sorry, the information could not be retrieved. Error:".to_string(),
        }
    }
}

impl Settings {
    /// Default location: `<config dir>/api-agent/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let settings: Settings =
            toml::from_str(content).map_err(|e| Error::config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load from `path`, or from the default location when `path` is `None`.
    ///
    /// A missing default file yields defaults; a missing explicit file is an error.
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => match Self::default_path() {
                Some(path) => (path, false),
                None => return Ok(Self::default()),
            },
        };

        match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                tracing::debug!("Loading settings from {}", path.display());
                Self::from_toml(&content)
            }
            Err(e) if !explicit && e.kind() == std::io::ErrorKind::NotFound => {
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.http.timeout_secs == 0 {
            return Err(Error::config("http.timeout_secs must be greater than zero"));
        }
        if !(0.0..=1.0).contains(&self.matching.confidence_threshold) {
            return Err(Error::config(
                "matching.confidence_threshold must be between 0 and 1",
            ));
        }
        if let Some(auth) = &self.auth {
            auth.validate().map_err(|e| Error::config(e.to_string()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings = Settings::from_toml("[http]\ntimeout_secs = 5\n").unwrap();
        assert_eq!(settings.http.timeout_secs, 5);
        assert!(settings.http.user_agent.starts_with("api-agent/"));
        assert_eq!(settings.matching.confidence_threshold, 0.3);
        assert_eq!(settings.messages.error_template, DEFAULT_ERROR_TEMPLATE);
        assert!(settings.auth.is_none());
    }

    #[test]
    fn test_auth_section() {
        let settings = Settings::from_toml(
            "[auth]\ntype = \"api_key\"\nkey_name = \"X-Token\"\nkey_value = \"abc\"\n",
        )
        .unwrap();
        assert_eq!(
            settings.auth.unwrap().header(),
            Some(("X-Token".to_string(), "abc".to_string()))
        );
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let err = Settings::from_toml("[matching]\nconfidence_threshold = 1.5\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(Settings::from_toml("[http]\ntimeout_secs = 0\n").is_err());
        assert!(Settings::from_toml("[http]\ntimeout_secs = \"soon\"\n").is_err());
    }

    #[tokio::test]
    async fn test_load_explicit_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[messages]\nlow_confidence = \"Try again\"").unwrap();
        let settings = Settings::load(Some(file.path())).await.unwrap();
        assert_eq!(settings.messages.low_confidence, "Try again");
    }

    #[tokio::test]
    async fn test_missing_explicit_file_is_an_error() {
        let err = Settings::load(Some(Path::new("/nonexistent/api-agent.toml")))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
