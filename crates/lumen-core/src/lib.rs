//! Lumen Core - model artifact store for on-device vision pipelines.
//!
//! Discovers model artifacts (single weight files and package directories)
//! in a models directory, checks each against its companion labels file and
//! installs uploaded model/labels pairs transactionally. Running the models
//! is left to the inference engine behind [`DetectorFactory`].
//!
//! Artifacts follow the naming convention
//! `name-width-height-version<suffix>`, e.g. `note-640-640-yolov5s.rknn`
//! next to `note-640-640-yolov5s-labels.txt`.
//!
//! # Example
//!
//! ```rust,ignore
//! use lumen_core::{Capabilities, FileUpload, HandlerRegistry, ModelStoreApi};
//!
//! #[tokio::main]
//! async fn main() -> lumen_core::Result<()> {
//!     let registry = HandlerRegistry::from_capabilities(Capabilities::detect());
//!     let store = ModelStoreApi::new(registry, "/opt/lumen/models").await?;
//!
//!     store
//!         .install_upload(
//!             FileUpload::from_path("note-640-640-yolov5s.rknn"),
//!             FileUpload::from_path("note-640-640-yolov5s-labels.txt"),
//!         )
//!         .await?;
//!
//!     if let Some(model) = store.default_artifact() {
//!         println!("Default model: {}", model.display_name());
//!     }
//!     Ok(())
//! }
//! ```

pub mod artifact;
pub mod bundled;
pub mod catalog;
pub mod config;
pub mod detector;
pub mod discovery;
pub mod error;
pub mod handler;
pub mod installer;
pub mod manager;
pub mod naming;
pub mod platform;
pub mod registry;
pub mod upload;

mod api;

// Re-export commonly used types
pub use api::ModelStoreApi;
pub use artifact::{ArtifactDescriptor, ArtifactKind};
pub use bundled::BundledReport;
pub use catalog::Catalog;
pub use detector::DetectorFactory;
pub use error::{LumenError, NamingError, Result};
pub use handler::{FormatHandler, HandlerInfo, PackageDirectoryHandler, SingleFileHandler};
pub use installer::{InstallState, InstallTarget};
pub use manager::ModelCatalog;
pub use naming::{ArtifactName, ModelVersion};
pub use registry::{Capabilities, HandlerRegistry};
pub use upload::{FileUpload, InMemoryUpload, UploadedFile};
