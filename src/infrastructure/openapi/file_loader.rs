//! File-based API description loader
//!
//! This loader handles only file I/O. Parsing is done by [`OpenApiParser`](super::OpenApiParser).

use async_trait::async_trait;
use tokio::fs;

use super::{LoadError, LoadedSpec, SpecFormat, SpecLoader, parse_document};

/// Loads API descriptions from local files
#[derive(Debug, Default)]
pub struct FileSpecLoader;

impl FileSpecLoader {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SpecLoader for FileSpecLoader {
    async fn load(&self, source: &str) -> Result<LoadedSpec, LoadError> {
        let content = fs::read_to_string(source).await?;
        let format =
            SpecFormat::from_extension(source).unwrap_or_else(|| SpecFormat::detect(&content));

        tracing::debug!("Loading {format} API description from {source}");
        parse_document(&content, format)
    }
}
