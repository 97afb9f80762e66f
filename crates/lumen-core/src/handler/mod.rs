//! Format handlers.
//!
//! A handler owns one artifact kind: it recognizes stored artifacts and
//! uploaded pairs by shape and extension, validates names, loads
//! descriptors and tells the installer where an upload lands.
//!
//! # Variants
//!
//! ```text
//! FormatHandler
//!     │
//!     ├── SingleFileHandler        - RKNN (.rknn), CoreML file (.mlmodel)
//!     │
//!     └── PackageDirectoryHandler  - CoreML package (.mlpackage/, uploaded as .mlpackage.zip)
//! ```

mod package;
mod single_file;

pub use package::PackageDirectoryHandler;
pub use single_file::SingleFileHandler;

use crate::artifact::{ArtifactDescriptor, ArtifactKind};
use crate::config::NamingConfig;
use crate::error::{LumenError, NamingError, Result};
use crate::installer::{InstallTarget, Installer};
use crate::naming::{self, ArtifactName};
use crate::upload::UploadedFile;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Basic information about a handler for the frontend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlerInfo {
    pub name: &'static str,
    pub upload_accept_type: &'static str,
}

/// Contract for one artifact format.
pub trait FormatHandler: Send + Sync {
    /// Unique backend identifier, e.g. `"RKNN"`.
    fn backend_name(&self) -> &'static str;

    /// Value for an HTML file input `accept` attribute, e.g. `".rknn"`.
    fn upload_accept_type(&self) -> &'static str;

    /// Whether stored artifacts are files or directories.
    fn kind(&self) -> ArtifactKind;

    /// Suffix of stored artifacts, e.g. `".mlpackage"`.
    fn storage_extension(&self) -> &'static str;

    /// Suffix the naming grammar expects on the uploaded model file.
    fn upload_suffix(&self) -> &'static str;

    fn info(&self) -> HandlerInfo {
        HandlerInfo {
            name: self.backend_name(),
            upload_accept_type: self.upload_accept_type(),
        }
    }

    /// True iff `path` has this handler's shape and storage extension.
    fn owns_storage_path(&self, path: &Path) -> bool {
        self.kind().matches(path)
            && path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(self.storage_extension()))
    }

    /// Cheap filename check used to pick a handler before validation.
    fn owns_upload_pair(&self, model_filename: &str, labels_filename: &str) -> bool {
        model_filename.ends_with(self.upload_suffix())
            && labels_filename.ends_with(NamingConfig::LABELS_SUFFIX)
    }

    /// Check the declared extensions of the uploads. Returns a message
    /// describing the first problem, if any.
    fn validate_upload_content(
        &self,
        model: &dyn UploadedFile,
        labels: &dyn UploadedFile,
    ) -> Option<String>;

    /// Full grammar and companion check of an upload pair.
    fn verify_naming(
        &self,
        model_filename: &str,
        labels_filename: &str,
    ) -> std::result::Result<ArtifactName, NamingError> {
        naming::verify_match(model_filename, self.upload_suffix(), labels_filename)
    }

    /// Where an upload with `name` is written inside `models_root`.
    fn install_target(&self, name: &ArtifactName, models_root: &Path) -> InstallTarget;

    /// Build a descriptor for a path already confirmed owned.
    fn load_artifact(&self, path: &Path, models_root: &Path) -> Result<ArtifactDescriptor> {
        load_with_labels(self, path, models_root)
    }

    /// Validate and transactionally install an upload pair.
    fn install(
        &self,
        model: &dyn UploadedFile,
        labels: &dyn UploadedFile,
        models_root: &Path,
    ) -> Result<()> {
        Installer::new(models_root).run(self, model, labels)
    }
}

/// Shared `load_artifact`: parse the stored name, find the companion labels
/// file next to it in `models_root` and read the labels.
pub(crate) fn load_with_labels<H: FormatHandler + ?Sized>(
    handler: &H,
    path: &Path,
    models_root: &Path,
) -> Result<ArtifactDescriptor> {
    if !handler.kind().matches(path) {
        return Err(LumenError::NotOwned {
            path: path.to_path_buf(),
            expected: format!("{} {}", handler.backend_name(), handler.kind().as_str()),
        });
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = naming::parse(&file_name, handler.storage_extension())?;

    let labels_path = models_root.join(name.labels_file_name());
    if !labels_path.is_file() {
        return Err(LumenError::MissingLabelsFile(labels_path));
    }
    let labels = read_labels(&labels_path)?;
    debug!("Read {} labels from {}", labels.len(), labels_path.display());

    Ok(ArtifactDescriptor::new(
        path.to_path_buf(),
        handler.kind(),
        handler.backend_name(),
        name,
        labels,
    ))
}

/// Read a labels file: one label per line, empty lines dropped.
pub fn read_labels(path: &Path) -> Result<Vec<String>> {
    let contents = fs::read_to_string(path).map_err(|e| LumenError::UnreadableLabelsFile {
        path: path.to_path_buf(),
        message: e.to_string(),
        source: Some(e),
    })?;

    Ok(contents
        .lines()
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Extension check shared by all handlers.
pub(crate) fn check_upload_extensions(
    model: &dyn UploadedFile,
    expected_model_extension: &str,
    labels: &dyn UploadedFile,
) -> Option<String> {
    let model_extension = model.extension();
    if model_extension != expected_model_extension {
        return Some(format!(
            "Invalid model file type. Expected '{}' but got '{}'",
            expected_model_extension, model_extension
        ));
    }

    let labels_extension = labels.extension();
    if labels_extension != NamingConfig::LABELS_EXTENSION {
        return Some(format!(
            "Invalid labels file type. Expected '{}' but got '{}'",
            NamingConfig::LABELS_EXTENSION,
            labels_extension
        ));
    }

    None
}
