//! Async facade for request handlers.
//!
//! Discovery and install do blocking filesystem work, so they run on
//! tokio's blocking pool. Lookups only clone the current snapshot and stay
//! synchronous.

use crate::artifact::ArtifactDescriptor;
use crate::bundled::BundledReport;
use crate::catalog::Catalog;
use crate::error::{LumenError, Result};
use crate::handler::HandlerInfo;
use crate::manager::ModelCatalog;
use crate::registry::HandlerRegistry;
use crate::upload::UploadedFile;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Cloneable handle to a shared [`ModelCatalog`].
#[derive(Debug, Clone)]
pub struct ModelStoreApi {
    catalog: Arc<ModelCatalog>,
}

impl ModelStoreApi {
    /// Create the store and run the initial discovery.
    pub async fn new(registry: HandlerRegistry, models_root: impl Into<PathBuf>) -> Result<Self> {
        let api = Self::from_catalog(Arc::new(ModelCatalog::new(registry, models_root)));
        let catalog = api.discover().await?;
        info!(
            "Model store ready at {} ({})",
            api.models_root().display(),
            catalog.summary()
        );
        Ok(api)
    }

    pub fn from_catalog(catalog: Arc<ModelCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Arc<ModelCatalog> {
        &self.catalog
    }

    pub fn models_root(&self) -> &Path {
        self.catalog.models_root()
    }

    pub async fn discover(&self) -> Result<Arc<Catalog>> {
        let catalog = Arc::clone(&self.catalog);
        tokio::task::spawn_blocking(move || catalog.discover())
            .await
            .map_err(|e| LumenError::Other(format!("Discovery task failed: {}", e)))
    }

    /// Install an uploaded pair. Returns the catalog published afterwards.
    pub async fn install_upload<M, L>(&self, model: M, labels: L) -> Result<Arc<Catalog>>
    where
        M: UploadedFile + 'static,
        L: UploadedFile + 'static,
    {
        let catalog = Arc::clone(&self.catalog);
        tokio::task::spawn_blocking(move || catalog.install_upload(&model, &labels))
            .await
            .map_err(|e| LumenError::Other(format!("Install task failed: {}", e)))?
    }

    pub async fn extract_bundled(&self, source_dir: impl Into<PathBuf>) -> Result<BundledReport> {
        let catalog = Arc::clone(&self.catalog);
        let source_dir = source_dir.into();
        tokio::task::spawn_blocking(move || catalog.extract_bundled(&source_dir))
            .await
            .map_err(|e| LumenError::Other(format!("Bundled extraction task failed: {}", e)))?
    }

    pub fn snapshot(&self) -> Arc<Catalog> {
        self.catalog.snapshot()
    }

    pub fn list_backends(&self) -> Vec<&'static str> {
        self.catalog.list_backends()
    }

    pub fn list_artifacts(&self, backend: &str) -> Vec<ArtifactDescriptor> {
        self.catalog.list_artifacts(backend)
    }

    pub fn find_by_name(&self, name: &str) -> Option<ArtifactDescriptor> {
        self.catalog.find_by_name(name)
    }

    pub fn default_artifact(&self) -> Option<ArtifactDescriptor> {
        self.catalog.default_artifact()
    }

    pub fn supported_backends(&self) -> Vec<HandlerInfo> {
        self.catalog.supported_backends()
    }
}
