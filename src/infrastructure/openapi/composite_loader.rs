//! Loader that dispatches on the shape of the source

use async_trait::async_trait;

use super::{FileSpecLoader, HttpSpecLoader, LoadError, LoadedSpec, SpecLoader};

/// Uses the HTTP loader for URLs and the file loader for everything else
#[derive(Debug)]
pub struct CompositeSpecLoader {
    http: HttpSpecLoader,
    file: FileSpecLoader,
}

impl CompositeSpecLoader {
    pub fn new() -> Result<Self, LoadError> {
        Ok(Self {
            http: HttpSpecLoader::new()?,
            file: FileSpecLoader::new(),
        })
    }
}

#[async_trait]
impl SpecLoader for CompositeSpecLoader {
    async fn load(&self, source: &str) -> Result<LoadedSpec, LoadError> {
        if source.starts_with("http://") || source.starts_with("https://") {
            tracing::debug!("CompositeSpecLoader: using HTTP loader for {source}");
            self.http.load(source).await
        } else {
            tracing::debug!("CompositeSpecLoader: using file loader for {source}");
            self.file.load(source).await
        }
    }
}
