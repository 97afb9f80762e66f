//! Handler registration.
//!
//! The registry is an ordered, immutable list of handlers built once at
//! startup. Order matters: discovery and upload routing both pick the
//! first handler that claims a path or upload pair, and the default
//! artifact comes from the first backend.

use crate::handler::{FormatHandler, HandlerInfo, PackageDirectoryHandler, SingleFileHandler};
use crate::platform;
use serde::Serialize;
use tracing::info;

/// Accelerators available on this host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    /// Rockchip NPU (`.rknn`).
    pub rknn: bool,
    /// Apple CoreML (`.mlmodel` files and `.mlpackage` directories).
    pub coreml: bool,
}

impl Capabilities {
    /// Probe the host.
    pub fn detect() -> Self {
        let caps = Self {
            rknn: platform::is_rk3588(),
            coreml: platform::is_mac(),
        };
        info!(
            "Detected capabilities on {}: rknn={}, coreml={}",
            platform::current_platform(),
            caps.rknn,
            caps.coreml
        );
        caps
    }

    /// Every accelerator enabled. Useful on build hosts that only manage
    /// files for other devices.
    pub fn all() -> Self {
        Self {
            rknn: true,
            coreml: true,
        }
    }
}

/// Ordered set of format handlers.
pub struct HandlerRegistry {
    handlers: Vec<Box<dyn FormatHandler>>,
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.handlers.iter().map(|h| h.backend_name()))
            .finish()
    }
}

impl HandlerRegistry {
    /// Build a registry from handlers in priority order.
    pub fn new(handlers: Vec<Box<dyn FormatHandler>>) -> Self {
        Self { handlers }
    }

    /// Standard handlers for `caps`: RKNN first, then CoreML file, then
    /// CoreML package.
    pub fn from_capabilities(caps: Capabilities) -> Self {
        let mut handlers: Vec<Box<dyn FormatHandler>> = Vec::new();
        if caps.rknn {
            handlers.push(Box::new(SingleFileHandler::rknn()));
        }
        if caps.coreml {
            handlers.push(Box::new(SingleFileHandler::coreml_file()));
            handlers.push(Box::new(PackageDirectoryHandler::coreml_package()));
        }

        let registry = Self::new(handlers);
        info!("Registered model handlers: {:?}", registry);
        registry
    }

    pub fn handlers(&self) -> &[Box<dyn FormatHandler>] {
        &self.handlers
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Backend names in registration order.
    pub fn backend_names(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|h| h.backend_name()).collect()
    }

    /// First handler whose filename check accepts the pair.
    pub fn find_upload_handler(
        &self,
        model_filename: &str,
        labels_filename: &str,
    ) -> Option<&dyn FormatHandler> {
        self.handlers
            .iter()
            .find(|h| h.owns_upload_pair(model_filename, labels_filename))
            .map(|h| h.as_ref())
    }

    /// Name and upload type of every handler, for the frontend.
    pub fn supported_backends(&self) -> Vec<HandlerInfo> {
        self.handlers.iter().map(|h| h.info()).collect()
    }

    /// Comma-separated upload suffixes, for error messages.
    pub fn accepted_upload_types(&self) -> String {
        self.handlers
            .iter()
            .map(|h| h.upload_suffix())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_capabilities_order() {
        let registry = HandlerRegistry::from_capabilities(Capabilities::all());
        assert_eq!(
            registry.backend_names(),
            vec!["RKNN", "COREML_FILE", "COREML_PACKAGE"]
        );

        let mac = HandlerRegistry::from_capabilities(Capabilities {
            rknn: false,
            coreml: true,
        });
        assert_eq!(mac.backend_names(), vec!["COREML_FILE", "COREML_PACKAGE"]);

        assert!(HandlerRegistry::from_capabilities(Capabilities::default()).is_empty());
    }

    #[test]
    fn test_find_upload_handler() {
        let registry = HandlerRegistry::from_capabilities(Capabilities::all());

        let handler = registry
            .find_upload_handler("a-1-1-yolov8.mlpackage.zip", "a-1-1-yolov8-labels.txt")
            .unwrap();
        assert_eq!(handler.backend_name(), "COREML_PACKAGE");

        let handler = registry
            .find_upload_handler("a-1-1-yolov8.rknn", "a-1-1-yolov8-labels.txt")
            .unwrap();
        assert_eq!(handler.backend_name(), "RKNN");

        assert!(registry
            .find_upload_handler("a-1-1-yolov8.onnx", "a-1-1-yolov8-labels.txt")
            .is_none());
    }

    #[test]
    fn test_supported_backends() {
        let registry = HandlerRegistry::from_capabilities(Capabilities::all());
        let infos = registry.supported_backends();
        assert_eq!(infos.len(), 3);
        assert_eq!(infos[2].upload_accept_type, ".zip");
        assert_eq!(
            registry.accepted_upload_types(),
            ".rknn, .mlmodel, .mlpackage.zip"
        );
    }
}
