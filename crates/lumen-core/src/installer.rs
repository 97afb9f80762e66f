//! Transactional installation of uploaded artifact pairs.
//!
//! One install walks these states:
//!
//! ```text
//! Start ──► LabelsStaged ──► ArchiveStaged ──► Unpacked ──► Committed
//!   │            │                 │               (package handlers only)
//!   └────────────┴─────────────────┴──► failed: journal rolled back
//! ```
//!
//! Every file or directory created along the way is recorded in a
//! rollback journal. An artifact that would be replaced is first moved
//! into a hidden backup directory and recorded too. Unless the journal is
//! committed, dropping it deletes the new artifacts and moves the backups
//! back, most-recent first, so an error returned with `?` (or a panic)
//! leaves the models directory as it was before the install.

use crate::config::InstallConfig;
use crate::error::{LumenError, Result};
use crate::handler::FormatHandler;
use crate::naming::ArtifactName;
use crate::upload::UploadedFile;
use serde::Serialize;
use std::fmt;
use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::{self, BufReader, Write};
use std::path::{Component, Path, PathBuf};
use tempfile::{TempDir, TempPath};
use tracing::{debug, error, info, warn};

/// Progress of one install attempt. A failure carries the last state
/// reached before the failing step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum InstallState {
    Start,
    LabelsStaged,
    ArchiveStaged,
    Unpacked,
    Committed,
}

impl fmt::Display for InstallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Names the step that runs next from this state.
        let step = match self {
            InstallState::Start => "staging the labels file",
            InstallState::LabelsStaged => "staging the model upload",
            InstallState::ArchiveStaged => "unpacking the package archive",
            InstallState::Unpacked => "committing",
            InstallState::Committed => "committed",
        };
        f.write_str(step)
    }
}

/// Where the model half of an upload is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallTarget {
    /// Model bytes are written straight to `model_path`.
    File { model_path: PathBuf },
    /// The upload is an archive staged next to, then unpacked into,
    /// `package_dir`.
    Package { package_dir: PathBuf },
}

/// Something the install created and must undo on rollback.
#[derive(Debug)]
enum Created {
    File(PathBuf),
    Directory(PathBuf),
    TempArchive(TempPath),
    /// `original` was moved to `backup`, inside `backup_dir`.
    Backup {
        original: PathBuf,
        backup: PathBuf,
        backup_dir: TempDir,
    },
}

/// Rollback journal for one install.
#[derive(Debug, Default)]
struct InstallJournal {
    created: Vec<Created>,
    committed: bool,
}

impl InstallJournal {
    fn record(&mut self, created: Created) {
        self.created.push(created);
    }

    /// Keep the installed artifacts. Temporary archives and backups of
    /// replaced artifacts are removed here; failing to remove one does not
    /// undo the install.
    fn commit(mut self) {
        self.committed = true;
        for created in self.created.drain(..) {
            match created {
                Created::TempArchive(temp) => {
                    let temp_display = temp.display().to_string();
                    if let Err(e) = temp.close() {
                        warn!(
                            "Failed to delete temporary archive after successful unpack: {}: {}",
                            temp_display, e
                        );
                    }
                }
                Created::Backup {
                    original,
                    backup_dir,
                    ..
                } => {
                    debug!("Replaced {}", original.display());
                    let backup_display = backup_dir.path().display().to_string();
                    if let Err(e) = backup_dir.close() {
                        warn!("Failed to delete backup {}: {}", backup_display, e);
                    }
                }
                Created::File(_) | Created::Directory(_) => {}
            }
        }
    }

    /// Undo everything recorded, newest first. Errors are logged only.
    fn rollback(&mut self) {
        while let Some(created) = self.created.pop() {
            match created {
                Created::File(path) => {
                    log_cleanup(&path, remove_if_exists(&path, |p| fs::remove_file(p)));
                }
                Created::Directory(path) => {
                    log_cleanup(&path, remove_if_exists(&path, |p| fs::remove_dir_all(p)));
                }
                Created::TempArchive(temp) => {
                    let temp_display = temp.display().to_string();
                    if let Err(e) = temp.close() {
                        error!("Failed to clean up temporary archive {}: {}", temp_display, e);
                    } else {
                        warn!("Cleaned up temporary archive {}", temp_display);
                    }
                }
                Created::Backup {
                    original,
                    backup,
                    backup_dir,
                } => restore_backup(&original, &backup, backup_dir),
            }
        }
    }
}

fn log_cleanup(path: &Path, outcome: io::Result<()>) {
    match outcome {
        Ok(()) => warn!("Cleaned up {}", path.display()),
        Err(e) => error!("Failed to clean up {}: {}", path.display(), e),
    }
}

/// Move a replaced artifact back. If that fails the backup directory is
/// kept on disk so nothing is lost.
fn restore_backup(original: &Path, backup: &Path, backup_dir: TempDir) {
    match fs::rename(backup, original) {
        Ok(()) => {
            warn!("Restored {}", original.display());
            if let Err(e) = backup_dir.close() {
                error!("Failed to clean up empty backup directory: {}", e);
            }
        }
        Err(e) => {
            let kept = backup_dir.keep();
            error!(
                "Failed to restore {} from {}: {}. Backup kept in {}",
                original.display(),
                backup.display(),
                e,
                kept.display()
            );
        }
    }
}

/// Move an existing artifact at `path` out of the way and record it, so a
/// rollback can put it back. Does nothing if `path` does not exist.
fn back_up_existing(journal: &mut InstallJournal, path: &Path) -> io::Result<()> {
    if fs::symlink_metadata(path).is_err() {
        return Ok(());
    }

    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let backup_dir = tempfile::Builder::new()
        .prefix(InstallConfig::TEMP_BACKUP_PREFIX)
        .tempdir_in(parent)?;
    let backup = backup_dir
        .path()
        .join(path.file_name().unwrap_or_else(|| OsStr::new("artifact")));
    fs::rename(path, &backup)?;

    debug!("Moved existing {} to {}", path.display(), backup.display());
    journal.record(Created::Backup {
        original: path.to_path_buf(),
        backup,
        backup_dir,
    });
    Ok(())
}

impl Drop for InstallJournal {
    fn drop(&mut self) {
        if !self.committed && !self.created.is_empty() {
            error!("Install failed. Rolling back {} staged item(s)", self.created.len());
            self.rollback();
        }
    }
}

fn remove_if_exists(path: &Path, remove: impl Fn(&Path) -> io::Result<()>) -> io::Result<()> {
    match remove(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Runs the save pipeline for one handler into one models directory.
#[derive(Debug, Clone)]
pub struct Installer {
    models_root: PathBuf,
}

impl Installer {
    pub fn new(models_root: impl Into<PathBuf>) -> Self {
        Self {
            models_root: models_root.into(),
        }
    }

    pub fn models_root(&self) -> &Path {
        &self.models_root
    }

    /// Validate, stage, unpack and commit an upload pair for `handler`.
    ///
    /// Naming failures return before anything touches the filesystem. Any
    /// later failure is rolled back before the error is returned.
    pub fn run<H: FormatHandler + ?Sized>(
        &self,
        handler: &H,
        model: &dyn UploadedFile,
        labels: &dyn UploadedFile,
    ) -> Result<()> {
        let name = handler.verify_naming(model.filename(), labels.filename())?;
        let target = handler.install_target(&name, &self.models_root);

        info!(
            "Saving {} upload {} to {}",
            handler.backend_name(),
            model.filename(),
            self.models_root.display()
        );

        fs::create_dir_all(&self.models_root).map_err(|e| {
            LumenError::install_step(
                InstallState::Start,
                format!("Failed to create models directory {}", self.models_root.display()),
                Some(e),
            )
        })?;

        let mut journal = InstallJournal::default();
        self.stage_labels(&mut journal, &name, labels)?;

        match &target {
            InstallTarget::File { model_path } => {
                stage_model_file(&mut journal, model, model_path)?;
            }
            InstallTarget::Package { package_dir } => {
                let archive = self.stage_archive(&mut journal, model)?;
                unpack_package(&mut journal, &archive, package_dir)?;
            }
        }

        journal.commit();
        info!("Successfully saved {} ({})", name, handler.backend_name());
        Ok(())
    }

    /// Start → LabelsStaged
    fn stage_labels(
        &self,
        journal: &mut InstallJournal,
        name: &ArtifactName,
        labels: &dyn UploadedFile,
    ) -> Result<()> {
        let labels_path = self.models_root.join(name.labels_file_name());
        debug!("Saving labels file to {}", labels_path.display());

        let fail = |e: io::Error| {
            LumenError::install_step(
                InstallState::Start,
                format!("Failed to save labels file {}", labels_path.display()),
                Some(e),
            )
        };

        let mut reader = labels.content().map_err(fail)?;
        back_up_existing(journal, &labels_path).map_err(fail)?;
        journal.record(Created::File(labels_path.clone()));
        write_stream(&mut reader, &labels_path).map_err(fail)?;
        Ok(())
    }

    /// LabelsStaged → ArchiveStaged for package uploads: the archive is
    /// written to a hidden temporary file inside the models directory.
    fn stage_archive(
        &self,
        journal: &mut InstallJournal,
        model: &dyn UploadedFile,
    ) -> Result<PathBuf> {
        let fail = |e: io::Error| {
            LumenError::install_step(
                InstallState::LabelsStaged,
                format!("Failed to save temporary archive for {}", model.filename()),
                Some(e),
            )
        };

        let mut reader = model.content().map_err(fail)?;
        let mut temp = tempfile::Builder::new()
            .prefix(InstallConfig::TEMP_UPLOAD_PREFIX)
            .suffix(".zip")
            .tempfile_in(&self.models_root)
            .map_err(fail)?;

        // Until recorded, `temp` deletes itself on drop.
        io::copy(&mut reader, temp.as_file_mut()).map_err(fail)?;
        temp.as_file_mut().flush().map_err(fail)?;

        let temp_path = temp.into_temp_path();
        let path = temp_path.to_path_buf();
        debug!("Staged archive at {}", path.display());
        journal.record(Created::TempArchive(temp_path));
        Ok(path)
    }
}

/// LabelsStaged → ArchiveStaged for single-file uploads.
fn stage_model_file(
    journal: &mut InstallJournal,
    model: &dyn UploadedFile,
    model_path: &Path,
) -> Result<()> {
    debug!("Saving model file to {}", model_path.display());

    let fail = |e: io::Error| {
        LumenError::install_step(
            InstallState::LabelsStaged,
            format!("Failed to save model file {}", model_path.display()),
            Some(e),
        )
    };

    let mut reader = model.content().map_err(fail)?;
    back_up_existing(journal, model_path).map_err(fail)?;
    journal.record(Created::File(model_path.to_path_buf()));
    write_stream(&mut reader, model_path).map_err(fail)?;
    Ok(())
}

/// ArchiveStaged → Unpacked. An existing package directory of the same name
/// is replaced; it is restored if unpacking fails.
fn unpack_package(
    journal: &mut InstallJournal,
    archive: &Path,
    package_dir: &Path,
) -> Result<()> {
    let fail = |message: String, e: io::Error| {
        LumenError::install_step(InstallState::ArchiveStaged, message, Some(e))
    };

    if package_dir.exists() {
        warn!(
            "Target package directory {} already exists. Overwriting it",
            package_dir.display()
        );
        back_up_existing(journal, package_dir).map_err(|e| {
            fail(
                format!("Failed to move existing package directory {}", package_dir.display()),
                e,
            )
        })?;
    }

    fs::create_dir_all(package_dir).map_err(|e| {
        fail(
            format!("Failed to create package directory {}", package_dir.display()),
            e,
        )
    })?;
    journal.record(Created::Directory(package_dir.to_path_buf()));

    let extracted = extract_archive(archive, package_dir)?;
    info!(
        "Unpacked {} entries into {}",
        extracted,
        package_dir.display()
    );
    Ok(())
}

/// Copy `reader` into a new file at `dest`. A partially written file is
/// removed before the error is returned.
fn write_stream(reader: &mut dyn io::Read, dest: &Path) -> io::Result<u64> {
    let result = File::create(dest).and_then(|mut file| {
        let written = io::copy(reader, &mut file)?;
        file.flush()?;
        Ok(written)
    });

    if result.is_err() {
        if let Err(e) = remove_if_exists(dest, |p| fs::remove_file(p)) {
            error!("Failed to remove partial file {}: {}", dest.display(), e);
        }
    }
    result
}

/// Extract every entry of the zip at `archive` into `target_dir`.
///
/// Entries whose normalized destination leaves `target_dir` fail the whole
/// extraction with [`LumenError::PathTraversalRejected`]. macOS bookkeeping
/// entries are skipped. If every remaining entry sits under a folder named
/// like `target_dir` (an archive of the package folder itself), that folder
/// level is removed; otherwise all entries keep their paths. Unix modes
/// stored in the archive are applied to extracted files.
pub fn extract_archive(archive: &Path, target_dir: &Path) -> Result<usize> {
    let fail = |message: String, source: Option<io::Error>| {
        LumenError::install_step(InstallState::ArchiveStaged, message, source)
    };

    let file = File::open(archive).map_err(|e| {
        fail(format!("Failed to open archive {}", archive.display()), Some(e))
    })?;
    let mut zip = zip::ZipArchive::new(BufReader::new(file))
        .map_err(|e| fail(format!("Invalid zip archive: {}", e), None))?;

    let wrapper = target_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let strip = has_single_wrapper(zip.file_names(), &wrapper);
    if strip {
        debug!("Archive is wrapped in {}/, unpacking its contents", wrapper);
    }

    let mut extracted = 0;
    for i in 0..zip.len() {
        let mut entry = zip
            .by_index(i)
            .map_err(|e| fail(format!("Failed to read zip entry {}: {}", i, e), None))?;

        let raw_name = entry.name().replace('\\', "/");
        if is_platform_metadata(&raw_name) {
            debug!("Skipping macOS metadata entry: {}", raw_name);
            continue;
        }

        let relative = if strip {
            strip_wrapper(&raw_name, &wrapper)
        } else {
            raw_name.as_str()
        };
        let out_path = resolve_entry_path(target_dir, relative).map_err(|_| {
            LumenError::PathTraversalRejected {
                entry: entry.name().to_string(),
                target: target_dir.to_path_buf(),
            }
        })?;

        if entry.is_dir() {
            fs::create_dir_all(&out_path).map_err(|e| {
                fail(format!("Failed to create directory {}", out_path.display()), Some(e))
            })?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                fail(format!("Failed to create directory {}", parent.display()), Some(e))
            })?;
        }
        write_stream(&mut entry, &out_path).map_err(|e| {
            fail(format!("Failed to extract {}", raw_name), Some(e))
        })?;

        // Set permissions on Unix
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                if let Err(e) = fs::set_permissions(&out_path, fs::Permissions::from_mode(mode)) {
                    warn!("Failed to set permissions on {}: {}", out_path.display(), e);
                }
            }
        }
        extracted += 1;
    }

    Ok(extracted)
}

/// Finder and Archive Utility bookkeeping entries.
fn is_platform_metadata(entry_name: &str) -> bool {
    entry_name.starts_with(InstallConfig::MACOS_METADATA_DIR)
        || entry_name == InstallConfig::MACOS_METADATA_FILE
        || entry_name.ends_with(&format!("/{}", InstallConfig::MACOS_METADATA_FILE))
}

/// True when every non-metadata entry name is `<wrapper>` or lies under
/// `<wrapper>/`.
fn has_single_wrapper<'a>(names: impl Iterator<Item = &'a str>, wrapper: &str) -> bool {
    if wrapper.is_empty() {
        return false;
    }
    let mut any = false;
    for name in names {
        let name = name.replace('\\', "/");
        if is_platform_metadata(&name) {
            continue;
        }
        match name.strip_prefix(wrapper) {
            Some(rest) if rest.is_empty() || rest.starts_with('/') => any = true,
            _ => return false,
        }
    }
    any
}

/// Drop a leading `<wrapper>/` component.
fn strip_wrapper<'a>(entry_name: &'a str, wrapper: &str) -> &'a str {
    if wrapper.is_empty() {
        return entry_name;
    }
    match entry_name.strip_prefix(wrapper) {
        Some(rest) if rest.is_empty() => "",
        Some(rest) if rest.starts_with('/') => rest.trim_start_matches('/'),
        _ => entry_name,
    }
}

/// Lexically resolve `entry_name` under `target_dir`, refusing anything
/// that is absolute or steps above `target_dir` at any point.
fn resolve_entry_path(target_dir: &Path, entry_name: &str) -> std::result::Result<PathBuf, ()> {
    let mut resolved = target_dir.to_path_buf();
    for component in Path::new(entry_name).components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !resolved.pop() || !resolved.starts_with(target_dir) {
                    return Err(());
                }
            }
            Component::RootDir | Component::Prefix(_) => return Err(()),
        }
    }

    if resolved.starts_with(target_dir) {
        Ok(resolved)
    } else {
        Err(())
    }
}
