//! Error handling for the api-agent library.
//!
//! Each layer defines its own error enum; this module aggregates them into the
//! crate-level `Error` with a convenient `Result` alias.
//!
//! # Examples
//!
//! ```
//! use api_agent::core::error::{Error, Result};
//!
//! fn might_fail() -> Result<()> {
//!     Err(Error::config("missing base URL"))
//! }
//!
//! assert!(might_fail().is_err());
//! ```

use thiserror::Error;

use crate::application::DefinitionError;
use crate::execution::InvocationError;
use crate::infrastructure::openapi::{LoadError, ParseError};
use crate::scenarios::ScenarioError;

/// Result type for api-agent operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for api-agent operations
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// API description could not be parsed
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// API description could not be loaded
    #[error("Failed to load API description: {0}")]
    Load(#[from] LoadError),

    /// Invalid scenario definition
    #[error("Scenario error: {0}")]
    Scenario(#[from] ScenarioError),

    /// A single API call failed
    #[error("Invocation error: {0}")]
    Invocation(#[from] InvocationError),

    /// Invalid agent definition
    #[error(transparent)]
    Definition(#[from] DefinitionError),

    /// Unknown agent id
    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_error_config_creation() {
        let error = Error::config("Invalid configuration");
        assert!(matches!(error, Error::Config(_)));
        assert_eq!(
            error.to_string(),
            "Configuration error: Invalid configuration"
        );
    }

    #[test]
    fn test_parse_error_is_surfaced_verbatim() {
        let error: Error = ParseError::MissingVersion.into();
        assert_eq!(error.to_string(), "Missing 'openapi' version field");
    }

    #[test]
    fn test_error_from_io_error() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let error: Error = io_error.into();
        assert!(matches!(error, Error::Io(_)));
        assert!(error.to_string().contains("File not found"));
    }

    #[test]
    fn test_error_from_scenario_error() {
        let error: Error = ScenarioError::EmptyName.into();
        assert_eq!(
            error.to_string(),
            "Scenario error: Scenario name cannot be empty"
        );
    }

    #[test]
    fn test_error_debug_display() {
        let error = Error::AgentNotFound("a-1".to_string());
        let debug_str = format!("{error:?}");
        assert!(debug_str.contains("AgentNotFound"));
        assert!(debug_str.contains("a-1"));
    }
}
