//! Seeding the models directory with artifacts shipped alongside the
//! application.
//!
//! Existing files are never overwritten, so artifacts a user replaced or
//! re-uploaded survive a restart.

use crate::error::{LumenError, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Outcome of one extraction run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BundledReport {
    pub copied: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Copy every regular file under `source_dir` into `models_root`, keeping
/// relative paths. Per-file failures are logged and counted; only a missing
/// source or an uncreatable models directory fails the run.
pub fn extract_bundled(source_dir: &Path, models_root: &Path) -> Result<BundledReport> {
    if !source_dir.is_dir() {
        return Err(LumenError::Io {
            message: "Bundled models directory not found".to_string(),
            path: Some(source_dir.to_path_buf()),
            source: None,
        });
    }
    fs::create_dir_all(models_root).map_err(|e| LumenError::io_with_path(e, models_root))?;

    let mut report = BundledReport::default();
    for entry in WalkDir::new(source_dir)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let relative = match entry.path().strip_prefix(source_dir) {
            Ok(relative) => relative,
            Err(_) => continue,
        };
        let dest = models_root.join(relative);

        if dest.exists() {
            debug!("Skipping bundled {}: already present", relative.display());
            report.skipped += 1;
            continue;
        }

        let copied = dest
            .parent()
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|_| fs::copy(entry.path(), &dest));
        match copied {
            Ok(_) => {
                debug!("Extracted bundled model file {}", relative.display());
                report.copied += 1;
            }
            Err(e) => {
                warn!("Failed to extract bundled file {}: {}", relative.display(), e);
                report.failed += 1;
            }
        }
    }

    info!(
        "Bundled models: {} copied, {} already present, {} failed",
        report.copied, report.skipped, report.failed
    );
    Ok(report)
}
