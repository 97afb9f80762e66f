//! Host detection used to pick the default set of format handlers.
//!
//! All `cfg!(target_os)` checks and device-tree probing live here.

use std::fs;
use std::path::Path;
use tracing::debug;

/// Device-tree node listing the SoC compatibility strings on ARM boards.
const DEVICE_TREE_COMPATIBLE: &str = "/proc/device-tree/compatible";

/// Device-tree node with the board's human-readable model name.
const DEVICE_TREE_MODEL: &str = "/proc/device-tree/model";

/// Returns the current platform name.
pub fn current_platform() -> &'static str {
    if cfg!(target_os = "linux") {
        "linux"
    } else if cfg!(target_os = "macos") {
        "macos"
    } else if cfg!(target_os = "windows") {
        "windows"
    } else {
        "unknown"
    }
}

/// True on macOS hosts, where CoreML is available.
pub fn is_mac() -> bool {
    cfg!(target_os = "macos")
}

/// True on Linux boards built around the Rockchip RK3588 family, which
/// carry the NPU that runs `.rknn` models.
pub fn is_rk3588() -> bool {
    if !cfg!(target_os = "linux") {
        return false;
    }
    [DEVICE_TREE_COMPATIBLE, DEVICE_TREE_MODEL]
        .iter()
        .any(|node| device_tree_mentions(Path::new(node), "rk3588"))
}

/// Check a device-tree node for `needle`. Nodes hold NUL-separated strings.
fn device_tree_mentions(node: &Path, needle: &str) -> bool {
    match fs::read(node) {
        Ok(bytes) => {
            let found = bytes
                .split(|b| *b == 0)
                .map(String::from_utf8_lossy)
                .any(|entry| entry.to_ascii_lowercase().contains(needle));
            debug!("Device tree {} mentions {}: {}", node.display(), needle, found);
            found
        }
        Err(_) => false,
    }
}
