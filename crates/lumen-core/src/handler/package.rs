//! Handler for artifacts stored as package directories.
//!
//! Packages are uploaded as a zip archive named
//! `base-w-h-tag.mlpackage.zip` and unpacked into `base-w-h-tag.mlpackage/`.

use super::{check_upload_extensions, FormatHandler};
use crate::artifact::ArtifactKind;
use crate::config::FormatConfig;
use crate::installer::InstallTarget;
use crate::naming::ArtifactName;
use crate::upload::UploadedFile;
use std::path::Path;

/// A format whose artifact is a directory, uploaded as an archive.
#[derive(Debug, Clone)]
pub struct PackageDirectoryHandler {
    backend_name: &'static str,
    extension: &'static str,
    archive_suffix: &'static str,
}

impl PackageDirectoryHandler {
    pub const fn new(
        backend_name: &'static str,
        extension: &'static str,
        archive_suffix: &'static str,
    ) -> Self {
        Self {
            backend_name,
            extension,
            archive_suffix,
        }
    }

    /// CoreML packages (`.mlpackage/`, uploaded as `.mlpackage.zip`).
    pub const fn coreml_package() -> Self {
        Self::new(
            FormatConfig::COREML_PACKAGE_BACKEND,
            FormatConfig::COREML_PACKAGE_EXTENSION,
            FormatConfig::COREML_PACKAGE_ARCHIVE_SUFFIX,
        )
    }
}

impl FormatHandler for PackageDirectoryHandler {
    fn backend_name(&self) -> &'static str {
        self.backend_name
    }

    fn upload_accept_type(&self) -> &'static str {
        FormatConfig::ARCHIVE_EXTENSION
    }

    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Directory
    }

    fn storage_extension(&self) -> &'static str {
        self.extension
    }

    fn upload_suffix(&self) -> &'static str {
        self.archive_suffix
    }

    fn validate_upload_content(
        &self,
        model: &dyn UploadedFile,
        labels: &dyn UploadedFile,
    ) -> Option<String> {
        check_upload_extensions(model, FormatConfig::ARCHIVE_EXTENSION, labels)
    }

    fn install_target(&self, name: &ArtifactName, models_root: &Path) -> InstallTarget {
        // The upload-only ".zip" is dropped: the directory carries the
        // storage extension.
        InstallTarget::Package {
            package_dir: models_root.join(name.file_name(self.extension)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::InMemoryUpload;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_owns_storage_path_requires_directory() {
        let temp_dir = TempDir::new().unwrap();
        let handler = PackageDirectoryHandler::coreml_package();

        let package = temp_dir.path().join("demo-640-640-yolov8n.mlpackage");
        fs::create_dir(&package).unwrap();
        assert!(handler.owns_storage_path(&package));

        let file = temp_dir.path().join("flat-640-640-yolov8n.mlpackage");
        fs::write(&file, b"w").unwrap();
        assert!(!handler.owns_storage_path(&file));
    }

    #[test]
    fn test_owns_upload_pair_needs_package_archive() {
        let handler = PackageDirectoryHandler::coreml_package();
        assert!(handler.owns_upload_pair(
            "demo-640-640-yolov8n.mlpackage.zip",
            "demo-640-640-yolov8n-labels.txt"
        ));
        assert!(!handler.owns_upload_pair("demo.zip", "demo-640-640-yolov8n-labels.txt"));
        assert!(!handler.owns_upload_pair("demo-640-640-yolov8n.mlpackage.zip", "demo.txt"));
    }

    #[test]
    fn test_verify_naming_uses_archive_grammar() {
        let handler = PackageDirectoryHandler::coreml_package();
        let name = handler
            .verify_naming(
                "note-640-640-yolov5s.mlpackage.zip",
                "note-640-640-yolov5s-labels.txt",
            )
            .unwrap();
        assert_eq!(name.base_name(), "note");

        let err = handler
            .verify_naming(
                "note-640-640-yolov5s.mlpackage.zip",
                "note-640-640-yolov8s-labels.txt",
            )
            .unwrap_err();
        assert!(err.is_mismatch());
    }

    #[test]
    fn test_validate_upload_content() {
        let handler = PackageDirectoryHandler::coreml_package();
        let labels = InMemoryUpload::new("d-1-1-yolov8-labels.txt", vec![]);
        let archive = InMemoryUpload::new("d-1-1-yolov8.mlpackage.zip", vec![]);
        assert!(handler.validate_upload_content(&archive, &labels).is_none());

        let tarball = InMemoryUpload::new("d-1-1-yolov8.mlpackage.tar", vec![]);
        assert!(handler.validate_upload_content(&tarball, &labels).is_some());
    }

    #[test]
    fn test_install_target_strips_archive_suffix() {
        let name = crate::naming::parse("demo-640-640-yolov8n.mlpackage.zip", ".mlpackage.zip").unwrap();
        let target = PackageDirectoryHandler::coreml_package().install_target(&name, Path::new("/m"));
        assert_eq!(
            target,
            InstallTarget::Package {
                package_dir: Path::new("/m/demo-640-640-yolov8n.mlpackage").to_path_buf()
            }
        );
    }

    #[test]
    fn test_load_artifact_from_package_dir() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let package = root.join("demo-320-320-yolov11n.mlpackage");
        fs::create_dir_all(package.join("Data")).unwrap();
        fs::write(root.join("demo-320-320-yolov11n-labels.txt"), "a\nb\nc\n").unwrap();

        let descriptor = PackageDirectoryHandler::coreml_package()
            .load_artifact(&package, root)
            .unwrap();
        assert_eq!(descriptor.kind(), ArtifactKind::Directory);
        assert_eq!(descriptor.display_name(), "demo-320-320-yolov11n.mlpackage");
        assert_eq!(descriptor.labels().len(), 3);
    }
}
