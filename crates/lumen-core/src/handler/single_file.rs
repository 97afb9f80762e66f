//! Handler for artifacts stored as one weights file.

use super::{check_upload_extensions, FormatHandler};
use crate::artifact::ArtifactKind;
use crate::config::FormatConfig;
use crate::installer::InstallTarget;
use crate::naming::ArtifactName;
use crate::upload::UploadedFile;
use std::path::Path;

/// A format whose artifact is a single file uploaded as-is.
#[derive(Debug, Clone)]
pub struct SingleFileHandler {
    backend_name: &'static str,
    extension: &'static str,
}

impl SingleFileHandler {
    pub const fn new(backend_name: &'static str, extension: &'static str) -> Self {
        Self {
            backend_name,
            extension,
        }
    }

    /// Rockchip NPU models (`.rknn`).
    pub const fn rknn() -> Self {
        Self::new(FormatConfig::RKNN_BACKEND, FormatConfig::RKNN_EXTENSION)
    }

    /// Compiled CoreML models (`.mlmodel`).
    pub const fn coreml_file() -> Self {
        Self::new(
            FormatConfig::COREML_FILE_BACKEND,
            FormatConfig::COREML_FILE_EXTENSION,
        )
    }
}

impl FormatHandler for SingleFileHandler {
    fn backend_name(&self) -> &'static str {
        self.backend_name
    }

    fn upload_accept_type(&self) -> &'static str {
        self.extension
    }

    fn kind(&self) -> ArtifactKind {
        ArtifactKind::File
    }

    fn storage_extension(&self) -> &'static str {
        self.extension
    }

    fn upload_suffix(&self) -> &'static str {
        self.extension
    }

    fn validate_upload_content(
        &self,
        model: &dyn UploadedFile,
        labels: &dyn UploadedFile,
    ) -> Option<String> {
        check_upload_extensions(model, self.extension, labels)
    }

    fn install_target(&self, name: &ArtifactName, models_root: &Path) -> InstallTarget {
        InstallTarget::File {
            model_path: models_root.join(name.file_name(self.extension)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LumenError;
    use crate::upload::InMemoryUpload;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_owns_storage_path_requires_file() {
        let temp_dir = TempDir::new().unwrap();
        let handler = SingleFileHandler::rknn();

        let file = temp_dir.path().join("note-640-640-yolov5s.rknn");
        fs::write(&file, b"w").unwrap();
        assert!(handler.owns_storage_path(&file));

        let dir = temp_dir.path().join("odd-640-640-yolov5s.rknn");
        fs::create_dir(&dir).unwrap();
        assert!(!handler.owns_storage_path(&dir));

        let other = temp_dir.path().join("note-640-640-yolov5s.mlmodel");
        fs::write(&other, b"w").unwrap();
        assert!(!handler.owns_storage_path(&other));
        assert!(SingleFileHandler::coreml_file().owns_storage_path(&other));
    }

    #[test]
    fn test_owns_upload_pair() {
        let handler = SingleFileHandler::rknn();
        assert!(handler.owns_upload_pair("a.rknn", "a-labels.txt"));
        assert!(!handler.owns_upload_pair("a.rknn", "a.txt"));
        assert!(!handler.owns_upload_pair("a.mlmodel", "a-labels.txt"));
    }

    #[test]
    fn test_validate_upload_content() {
        let handler = SingleFileHandler::coreml_file();
        let labels = InMemoryUpload::new("m-1-1-yolov8-labels.txt", vec![]);

        let good = InMemoryUpload::new("m-1-1-yolov8.mlmodel", vec![]);
        assert!(handler.validate_upload_content(&good, &labels).is_none());

        let bad = InMemoryUpload::new("m-1-1-yolov8.rknn", vec![]);
        let msg = handler.validate_upload_content(&bad, &labels).unwrap();
        assert!(msg.contains(".mlmodel"));

        let bad_labels = InMemoryUpload::new("m-1-1-yolov8-labels.csv", vec![]);
        assert!(handler.validate_upload_content(&good, &bad_labels).is_some());
    }

    #[test]
    fn test_load_artifact_reads_companion_labels() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let model = root.join("note-640-480-yolov5s.rknn");
        fs::write(&model, b"w").unwrap();
        fs::write(root.join("note-640-480-yolov5s-labels.txt"), "coral\nalgae\n").unwrap();

        let descriptor = SingleFileHandler::rknn().load_artifact(&model, root).unwrap();
        assert_eq!(descriptor.backend(), "RKNN");
        assert_eq!(descriptor.kind(), ArtifactKind::File);
        assert_eq!(descriptor.input_width(), 640);
        assert_eq!(descriptor.input_height(), 480);
        assert_eq!(descriptor.labels(), &["coral".to_string(), "algae".to_string()]);
    }

    #[test]
    fn test_load_artifact_missing_labels() {
        let temp_dir = TempDir::new().unwrap();
        let model = temp_dir.path().join("note-640-640-yolov5s.rknn");
        fs::write(&model, b"w").unwrap();

        let err = SingleFileHandler::rknn()
            .load_artifact(&model, temp_dir.path())
            .unwrap_err();
        assert!(matches!(err, LumenError::MissingLabelsFile(_)));
    }

    #[test]
    fn test_load_artifact_malformed_name() {
        let temp_dir = TempDir::new().unwrap();
        let model = temp_dir.path().join("yolo.rknn");
        fs::write(&model, b"w").unwrap();

        let err = SingleFileHandler::rknn()
            .load_artifact(&model, temp_dir.path())
            .unwrap_err();
        assert!(matches!(err, LumenError::Naming(_)));
    }

    #[test]
    fn test_install_target() {
        let name = crate::naming::parse("note-640-640-yolov5s.rknn", ".rknn").unwrap();
        let target = SingleFileHandler::rknn().install_target(&name, Path::new("/models"));
        assert_eq!(
            target,
            InstallTarget::File {
                model_path: Path::new("/models/note-640-640-yolov5s.rknn").to_path_buf()
            }
        );
    }
}
