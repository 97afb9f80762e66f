//! Centralized configuration for the Lumen model store.
//!
//! Constants for the naming convention, the install pipeline and on-disk
//! locations live here so handlers and the installer agree on them.

use std::path::PathBuf;

/// Naming convention constants shared by every artifact kind.
pub struct NamingConfig;

impl NamingConfig {
    pub const LABELS_SUFFIX: &'static str = "-labels.txt";
    pub const LABELS_EXTENSION: &'static str = ".txt";
}

/// Per-format extensions.
pub struct FormatConfig;

impl FormatConfig {
    pub const RKNN_BACKEND: &'static str = "RKNN";
    pub const RKNN_EXTENSION: &'static str = ".rknn";

    pub const COREML_FILE_BACKEND: &'static str = "COREML_FILE";
    pub const COREML_FILE_EXTENSION: &'static str = ".mlmodel";

    pub const COREML_PACKAGE_BACKEND: &'static str = "COREML_PACKAGE";
    pub const COREML_PACKAGE_EXTENSION: &'static str = ".mlpackage";
    pub const COREML_PACKAGE_ARCHIVE_SUFFIX: &'static str = ".mlpackage.zip";
    pub const ARCHIVE_EXTENSION: &'static str = ".zip";
}

/// Configuration for the install pipeline.
pub struct InstallConfig;

impl InstallConfig {
    /// Prefix for archives staged inside the models directory.
    pub const TEMP_UPLOAD_PREFIX: &'static str = ".tmp_upload_";
    /// Prefix for directories holding an artifact that is being replaced.
    pub const TEMP_BACKUP_PREFIX: &'static str = ".tmp_backup_";
    /// Archive entries produced by macOS Finder that are never extracted.
    pub const MACOS_METADATA_DIR: &'static str = "__MACOSX/";
    pub const MACOS_METADATA_FILE: &'static str = ".DS_Store";
}

/// Shared directory and path configurations.
pub struct PathsConfig;

impl PathsConfig {
    pub const APP_DIR_NAME: &'static str = "lumen";
    pub const MODELS_DIR_NAME: &'static str = "models";
}

/// Default models directory (`<data dir>/lumen/models`), falling back to
/// `./models` when the platform has no data directory.
pub fn default_models_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join(PathsConfig::APP_DIR_NAME).join(PathsConfig::MODELS_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(PathsConfig::MODELS_DIR_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_models_dir_ends_with_models() {
        assert!(default_models_dir().ends_with(PathsConfig::MODELS_DIR_NAME));
    }

    #[test]
    fn test_archive_suffix_extends_package_extension() {
        assert!(FormatConfig::COREML_PACKAGE_ARCHIVE_SUFFIX
            .starts_with(FormatConfig::COREML_PACKAGE_EXTENSION));
        assert!(FormatConfig::COREML_PACKAGE_ARCHIVE_SUFFIX.ends_with(FormatConfig::ARCHIVE_EXTENSION));
    }
}
