//! Error types for OpenAPI normalization and loading

use thiserror::Error;

/// Fatal problems with an API description. A parse that fails never produces a
/// partial [`ApiSpec`](super::ApiSpec).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Invalid YAML format: {0}")]
    InvalidYaml(String),

    #[error("Invalid JSON format: {0}")]
    InvalidJson(String),

    #[error("API spec must be a valid object/dictionary")]
    NotAnObject,

    #[error("Missing 'openapi' version field")]
    MissingVersion,

    #[error("Unsupported OpenAPI version: {version}. Supported versions: {supported}")]
    UnsupportedVersion { version: String, supported: String },

    #[error("Unknown spec format: {0}")]
    UnknownFormat(String),
}

/// Errors raised while fetching an API description before it is parsed
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
}
