//! Discovered artifact descriptors.

use crate::naming::{ArtifactName, ModelVersion};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Storage shape of an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// A single weights file (`.rknn`, `.mlmodel`).
    File,
    /// A package directory (`.mlpackage`).
    Directory,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::File => "file",
            ArtifactKind::Directory => "directory",
        }
    }

    /// Whether `path` currently exists with this shape.
    pub fn matches(&self, path: &Path) -> bool {
        match self {
            ArtifactKind::File => path.is_file(),
            ArtifactKind::Directory => path.is_dir(),
        }
    }
}

/// One discovered artifact with its labels.
///
/// Only a handler's `load_artifact` creates these; the catalog owns them
/// until the next discovery replaces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactDescriptor {
    storage_path: PathBuf,
    kind: ArtifactKind,
    backend: &'static str,
    name: ArtifactName,
    labels: Vec<String>,
}

impl ArtifactDescriptor {
    pub(crate) fn new(
        storage_path: PathBuf,
        kind: ArtifactKind,
        backend: &'static str,
        name: ArtifactName,
        labels: Vec<String>,
    ) -> Self {
        Self {
            storage_path,
            kind,
            backend,
            name,
            labels,
        }
    }

    pub fn storage_path(&self) -> &Path {
        &self.storage_path
    }

    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    /// Backend that loaded this artifact.
    pub fn backend(&self) -> &'static str {
        self.backend
    }

    pub fn parsed_name(&self) -> &ArtifactName {
        &self.name
    }

    /// Labels in index order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn input_width(&self) -> u32 {
        self.name.width()
    }

    pub fn input_height(&self) -> u32 {
        self.name.height()
    }

    pub fn version_tag(&self) -> &str {
        self.name.version_tag()
    }

    pub fn model_version(&self) -> ModelVersion {
        self.name.model_version()
    }

    /// Name shown to users and used for lookups: the file or directory name.
    pub fn display_name(&self) -> String {
        self.storage_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::parse;

    #[test]
    fn test_descriptor_accessors() {
        let name = parse("note-640-480-yolov8n.rknn", ".rknn").unwrap();
        let descriptor = ArtifactDescriptor::new(
            PathBuf::from("/models/note-640-480-yolov8n.rknn"),
            ArtifactKind::File,
            "RKNN",
            name,
            vec!["person".into(), "car".into()],
        );

        assert_eq!(descriptor.display_name(), "note-640-480-yolov8n.rknn");
        assert_eq!(descriptor.input_width(), 640);
        assert_eq!(descriptor.input_height(), 480);
        assert_eq!(descriptor.version_tag(), "yolov8n");
        assert_eq!(descriptor.model_version(), ModelVersion::YoloV8);
        assert_eq!(descriptor.labels(), &["person".to_string(), "car".to_string()]);
    }

    #[test]
    fn test_kind_matches() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        assert!(ArtifactKind::Directory.matches(temp_dir.path()));
        assert!(!ArtifactKind::File.matches(temp_dir.path()));
    }
}
