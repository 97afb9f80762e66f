//! Immutable snapshot of discovered artifacts.

use crate::artifact::ArtifactDescriptor;
use serde::Serialize;

/// Artifacts of one backend, sorted by display name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BackendArtifacts {
    pub backend: &'static str,
    pub artifacts: Vec<ArtifactDescriptor>,
}

/// Result of one discovery pass.
///
/// Holds one bucket per registered backend, in registration order, even
/// when the bucket is empty. A catalog is never modified after it is built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Catalog {
    backends: Vec<BackendArtifacts>,
}

impl Catalog {
    /// Catalog with an empty bucket for each backend.
    pub fn empty(backends: &[&'static str]) -> Self {
        Self {
            backends: backends
                .iter()
                .map(|&backend| BackendArtifacts {
                    backend,
                    artifacts: Vec::new(),
                })
                .collect(),
        }
    }

    pub(crate) fn from_buckets(mut backends: Vec<BackendArtifacts>) -> Self {
        for bucket in &mut backends {
            bucket
                .artifacts
                .sort_by_key(|artifact| artifact.display_name());
        }
        Self { backends }
    }

    /// Backends with at least one artifact, in registration order.
    pub fn backends(&self) -> Vec<&'static str> {
        self.backends
            .iter()
            .filter(|b| !b.artifacts.is_empty())
            .map(|b| b.backend)
            .collect()
    }

    /// Every bucket, empty ones included.
    pub fn buckets(&self) -> &[BackendArtifacts] {
        &self.backends
    }

    /// Artifacts of `backend`; empty for unknown backends.
    pub fn artifacts(&self, backend: &str) -> &[ArtifactDescriptor] {
        self.backends
            .iter()
            .find(|b| b.backend == backend)
            .map(|b| b.artifacts.as_slice())
            .unwrap_or(&[])
    }

    /// All artifacts, bucket by bucket.
    pub fn iter(&self) -> impl Iterator<Item = &ArtifactDescriptor> {
        self.backends.iter().flat_map(|b| b.artifacts.iter())
    }

    pub fn len(&self) -> usize {
        self.backends.iter().map(|b| b.artifacts.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Artifact whose display name equals `name`, searched across all
    /// backends in registration order.
    pub fn find_by_name(&self, name: &str) -> Option<&ArtifactDescriptor> {
        self.iter().find(|artifact| artifact.display_name() == name)
    }

    /// First artifact of the first registered backend; if that backend has
    /// none, the first artifact of the first non-empty backend.
    pub fn default_artifact(&self) -> Option<&ArtifactDescriptor> {
        self.backends
            .iter()
            .find_map(|b| b.artifacts.first())
    }

    /// One-line summary for logs, e.g. `RKNN: 2, COREML_FILE: 0`.
    pub fn summary(&self) -> String {
        self.backends
            .iter()
            .map(|b| format!("{}: {}", b.backend, b.artifacts.len()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::ArtifactKind;
    use crate::naming::parse;
    use std::path::PathBuf;

    fn descriptor(backend: &'static str, file_name: &str, suffix: &str) -> ArtifactDescriptor {
        ArtifactDescriptor::new(
            PathBuf::from("/models").join(file_name),
            ArtifactKind::File,
            backend,
            parse(file_name, suffix).unwrap(),
            vec!["a".into()],
        )
    }

    fn sample() -> Catalog {
        Catalog::from_buckets(vec![
            BackendArtifacts {
                backend: "RKNN",
                artifacts: vec![],
            },
            BackendArtifacts {
                backend: "COREML_FILE",
                artifacts: vec![
                    descriptor("COREML_FILE", "zeta-640-640-yolov8n.mlmodel", ".mlmodel"),
                    descriptor("COREML_FILE", "alpha-320-320-yolov5s.mlmodel", ".mlmodel"),
                ],
            },
        ])
    }

    #[test]
    fn test_buckets_sorted_by_display_name() {
        let catalog = sample();
        let names: Vec<String> = catalog
            .artifacts("COREML_FILE")
            .iter()
            .map(|a| a.display_name())
            .collect();
        assert_eq!(
            names,
            vec!["alpha-320-320-yolov5s.mlmodel", "zeta-640-640-yolov8n.mlmodel"]
        );
    }

    #[test]
    fn test_backends_skip_empty_buckets() {
        let catalog = sample();
        assert_eq!(catalog.backends(), vec!["COREML_FILE"]);
        assert_eq!(catalog.buckets().len(), 2);
        assert!(catalog.artifacts("RKNN").is_empty());
        assert!(catalog.artifacts("TFLITE").is_empty());
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.summary(), "RKNN: 0, COREML_FILE: 2");
    }

    #[test]
    fn test_default_falls_back_to_first_non_empty() {
        let catalog = sample();
        assert_eq!(
            catalog.default_artifact().unwrap().display_name(),
            "alpha-320-320-yolov5s.mlmodel"
        );
        assert!(Catalog::empty(&["RKNN"]).default_artifact().is_none());
    }

    #[test]
    fn test_find_by_name() {
        let catalog = sample();
        assert!(catalog.find_by_name("zeta-640-640-yolov8n.mlmodel").is_some());
        assert!(catalog.find_by_name("zeta-640-640-yolov8n").is_none());
    }
}
