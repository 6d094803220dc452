//! OpenAPI normalization and loading

pub mod composite_loader;
pub mod errors;
pub mod file_loader;
pub mod http_loader;
pub mod parser;
pub mod reference;
pub mod types;

use async_trait::async_trait;

pub use composite_loader::CompositeSpecLoader;
pub use errors::{LoadError, ParseError};
pub use file_loader::FileSpecLoader;
pub use http_loader::HttpSpecLoader;
pub use parser::{OpenApiParser, SUPPORTED_VERSIONS, SpecFormat, generate_operation_id};
pub use types::*;

/// A parsed API description together with the parser's warnings
#[derive(Debug, Clone)]
pub struct LoadedSpec {
    pub spec: ApiSpec,
    pub warnings: Vec<String>,
}

/// Fetches and normalizes an API description from some source
#[async_trait]
pub trait SpecLoader: Send + Sync {
    async fn load(&self, source: &str) -> Result<LoadedSpec, LoadError>;
}

/// Parse already-fetched content with a fresh parser
pub fn parse_document(content: &str, format: SpecFormat) -> Result<LoadedSpec, LoadError> {
    let mut parser = OpenApiParser::new();
    let spec = parser.parse(content, format)?;
    Ok(LoadedSpec {
        spec,
        warnings: parser.warnings().to_vec(),
    })
}
