//! Filesystem discovery of installed artifacts.

use crate::catalog::{BackendArtifacts, Catalog};
use crate::registry::HandlerRegistry;
use std::path::Path;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

/// Walk `models_root` and build a fresh catalog.
///
/// Each path is offered to the handlers in registration order; the first
/// handler that owns it loads it. A path whose load fails is logged and
/// left unclaimed, so a later handler may still take it. Every path under
/// the root is offered, including paths inside claimed package
/// directories. Never fails: a missing or
/// unreadable root yields an empty catalog.
pub fn discover(models_root: &Path, registry: &HandlerRegistry) -> Catalog {
    let mut buckets: Vec<BackendArtifacts> = registry
        .handlers()
        .iter()
        .map(|h| BackendArtifacts {
            backend: h.backend_name(),
            artifacts: Vec::new(),
        })
        .collect();

    if !models_root.is_dir() {
        error!(
            "Models folder {} does not exist or is not a directory",
            models_root.display()
        );
        return Catalog::from_buckets(buckets);
    }

    for entry in WalkDir::new(models_root).min_depth(1).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry while scanning models: {}", e);
                continue;
            }
        };
        let path = entry.path();

        for (index, handler) in registry.handlers().iter().enumerate() {
            if !handler.owns_storage_path(path) {
                continue;
            }
            match handler.load_artifact(path, models_root) {
                Ok(descriptor) => {
                    debug!(
                        "Loaded {} model {}",
                        handler.backend_name(),
                        descriptor.display_name()
                    );
                    buckets[index].artifacts.push(descriptor);
                    break;
                }
                Err(e) => {
                    warn!(
                        "Failed to load model at {} with {}: {}",
                        path.display(),
                        handler.backend_name(),
                        e
                    );
                }
            }
        }
    }

    let catalog = Catalog::from_buckets(buckets);
    info!(
        "Discovered {} model(s) in {} ({})",
        catalog.len(),
        models_root.display(),
        catalog.summary()
    );
    catalog
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Capabilities;
    use std::fs;
    use tempfile::TempDir;

    fn all_handlers() -> HandlerRegistry {
        HandlerRegistry::from_capabilities(Capabilities::all())
    }

    #[test]
    fn test_missing_root_gives_empty_catalog() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = discover(&temp_dir.path().join("absent"), &all_handlers());
        assert!(catalog.is_empty());
        assert_eq!(catalog.buckets().len(), 3);
    }

    #[test]
    fn test_discovers_each_kind() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("a-640-640-yolov5s.rknn"), b"w").unwrap();
        fs::write(root.join("a-640-640-yolov5s-labels.txt"), "x\n").unwrap();
        fs::write(root.join("b-320-320-yolov8n.mlmodel"), b"w").unwrap();
        fs::write(root.join("b-320-320-yolov8n-labels.txt"), "y\n").unwrap();
        fs::create_dir_all(root.join("c-640-480-yolov11m.mlpackage/Data")).unwrap();
        fs::write(root.join("c-640-480-yolov11m-labels.txt"), "z\n").unwrap();

        let catalog = discover(root, &all_handlers());
        assert_eq!(catalog.backends(), vec!["RKNN", "COREML_FILE", "COREML_PACKAGE"]);
        assert_eq!(catalog.len(), 3);
        assert_eq!(
            catalog.artifacts("COREML_PACKAGE")[0].display_name(),
            "c-640-480-yolov11m.mlpackage"
        );
    }

    #[test]
    fn test_bad_entries_are_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        // Malformed name, missing labels, unrelated file.
        fs::write(root.join("yolo.rknn"), b"w").unwrap();
        fs::write(root.join("nolabels-640-640-yolov5s.rknn"), b"w").unwrap();
        fs::write(root.join("notes.md"), b"hi").unwrap();
        fs::write(root.join("ok-640-640-yolov5s.rknn"), b"w").unwrap();
        fs::write(root.join("ok-640-640-yolov5s-labels.txt"), "x\n").unwrap();

        let catalog = discover(root, &all_handlers());
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.artifacts("RKNN")[0].display_name(), "ok-640-640-yolov5s.rknn");
    }

    #[test]
    fn test_artifacts_nested_in_packages_are_discovered() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let package = root.join("p-640-640-yolov8n.mlpackage");
        fs::create_dir_all(&package).unwrap();
        fs::write(package.join("inner-640-640-yolov8n.mlmodel"), b"w").unwrap();
        fs::write(root.join("p-640-640-yolov8n-labels.txt"), "x\n").unwrap();
        fs::write(root.join("inner-640-640-yolov8n-labels.txt"), "x\n").unwrap();

        let catalog = discover(root, &all_handlers());
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.artifacts("COREML_PACKAGE").len(), 1);
        let nested = &catalog.artifacts("COREML_FILE")[0];
        assert_eq!(nested.display_name(), "inner-640-640-yolov8n.mlmodel");
        assert_eq!(nested.storage_path(), package.join("inner-640-640-yolov8n.mlmodel"));
    }

    #[test]
    fn test_unregistered_formats_are_ignored() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("a-640-640-yolov5s.mlmodel"), b"w").unwrap();
        fs::write(root.join("a-640-640-yolov5s-labels.txt"), "x\n").unwrap();

        let rknn_only = HandlerRegistry::from_capabilities(Capabilities {
            rknn: true,
            coreml: false,
        });
        assert!(discover(root, &rknn_only).is_empty());
    }
}
