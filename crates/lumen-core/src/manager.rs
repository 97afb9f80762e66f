//! The model catalog manager.
//!
//! Owns the handler registry and the current [`Catalog`] snapshot. Readers
//! take an `Arc<Catalog>` and keep using it even if a discovery swaps in a
//! newer one. Discovery and install run one at a time under a writer lock,
//! and a new catalog is built in full before it is published.

use crate::artifact::ArtifactDescriptor;
use crate::bundled::{self, BundledReport};
use crate::catalog::Catalog;
use crate::detector::DetectorFactory;
use crate::discovery;
use crate::error::{LumenError, Result};
use crate::handler::HandlerInfo;
use crate::registry::HandlerRegistry;
use crate::upload::UploadedFile;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tracing::{error, info, warn};

/// Catalog of installed model artifacts in one models directory.
pub struct ModelCatalog {
    registry: HandlerRegistry,
    models_root: PathBuf,
    current: RwLock<Arc<Catalog>>,
    /// Serializes discovery and install.
    write_lock: Mutex<()>,
}

impl std::fmt::Debug for ModelCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelCatalog")
            .field("registry", &self.registry)
            .field("models_root", &self.models_root)
            .finish_non_exhaustive()
    }
}

impl ModelCatalog {
    /// Create a manager with an empty catalog. Call [`discover`](Self::discover)
    /// to populate it.
    pub fn new(registry: HandlerRegistry, models_root: impl Into<PathBuf>) -> Self {
        let empty = Catalog::empty(&registry.backend_names());
        Self {
            registry,
            models_root: models_root.into(),
            current: RwLock::new(Arc::new(empty)),
            write_lock: Mutex::new(()),
        }
    }

    pub fn models_root(&self) -> &Path {
        &self.models_root
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Rescan the models directory and publish the result.
    pub fn discover(&self) -> Arc<Catalog> {
        let _guard = self.lock_writer();
        self.discover_locked()
    }

    fn discover_locked(&self) -> Arc<Catalog> {
        let catalog = Arc::new(discovery::discover(&self.models_root, &self.registry));
        *self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::clone(&catalog);
        catalog
    }

    // A panic while holding either lock cannot leave the catalog half
    // written, so poisoning is ignored.
    fn lock_writer(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The current catalog.
    pub fn snapshot(&self) -> Arc<Catalog> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Backends that currently have at least one artifact.
    pub fn list_backends(&self) -> Vec<&'static str> {
        self.snapshot().backends()
    }

    /// Artifacts of `backend`, sorted by display name.
    pub fn list_artifacts(&self, backend: &str) -> Vec<ArtifactDescriptor> {
        self.snapshot().artifacts(backend).to_vec()
    }

    pub fn find_by_name(&self, name: &str) -> Option<ArtifactDescriptor> {
        self.snapshot().find_by_name(name).cloned()
    }

    /// Artifact to use when none was chosen explicitly.
    pub fn default_artifact(&self) -> Option<ArtifactDescriptor> {
        self.snapshot().default_artifact().cloned()
    }

    /// Registered backends and their upload types.
    pub fn supported_backends(&self) -> Vec<HandlerInfo> {
        self.registry.supported_backends()
    }

    /// Route an uploaded pair to its handler, install it and rescan.
    ///
    /// On success the new artifact is visible in every snapshot taken after
    /// this returns. On failure nothing was left on disk and the catalog is
    /// unchanged.
    pub fn install_upload(
        &self,
        model: &dyn UploadedFile,
        labels: &dyn UploadedFile,
    ) -> Result<Arc<Catalog>> {
        let handler = self
            .registry
            .find_upload_handler(model.filename(), labels.filename())
            .ok_or_else(|| {
                error!(
                    "No handler accepts model {} with labels {}",
                    model.filename(),
                    labels.filename()
                );
                LumenError::NoHandlerForUpload {
                    model: model.filename().to_string(),
                    labels: labels.filename().to_string(),
                    accepted: self.registry.accepted_upload_types(),
                }
            })?;

        if let Some(reason) = handler.validate_upload_content(model, labels) {
            warn!("Rejected upload {}: {}", model.filename(), reason);
            return Err(LumenError::UploadRejected(reason));
        }

        handler.verify_naming(model.filename(), labels.filename())?;

        let _guard = self.lock_writer();
        handler.install(model, labels, &self.models_root)?;
        info!(
            "Installed {} model {}. Rescanning {}",
            handler.backend_name(),
            model.filename(),
            self.models_root.display()
        );
        Ok(self.discover_locked())
    }

    /// Seed the models directory from `source_dir` and rescan.
    pub fn extract_bundled(&self, source_dir: &Path) -> Result<BundledReport> {
        let _guard = self.lock_writer();
        let report = bundled::extract_bundled(source_dir, &self.models_root)?;
        if report.copied > 0 {
            self.discover_locked();
        }
        Ok(report)
    }

    /// Hand the named artifact to an inference engine.
    pub fn load_detector<F: DetectorFactory>(&self, name: &str, factory: &F) -> Result<F::Detector> {
        let artifact = self
            .find_by_name(name)
            .ok_or_else(|| LumenError::ModelNotFound(name.to_string()))?;
        factory.load(&artifact)
    }
}
