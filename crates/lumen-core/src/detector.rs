//! Boundary to inference engines.
//!
//! The store never runs models. An engine implements [`DetectorFactory`]
//! and receives the descriptor of the artifact it should load.

use crate::artifact::ArtifactDescriptor;
use crate::error::Result;

/// Builds a detector for one artifact.
pub trait DetectorFactory {
    type Detector;

    /// Load the artifact described by `artifact`. The descriptor carries
    /// the storage path, input size, model version and labels.
    fn load(&self, artifact: &ArtifactDescriptor) -> Result<Self::Detector>;
}

impl<F, D> DetectorFactory for F
where
    F: Fn(&ArtifactDescriptor) -> Result<D>,
{
    type Detector = D;

    fn load(&self, artifact: &ArtifactDescriptor) -> Result<D> {
        self(artifact)
    }
}
