//! Upload boundary.
//!
//! The HTTP layer hands the store two opaque uploads. The store only reads
//! their declared filename and streams their content to disk.

use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::PathBuf;

/// An uploaded file: a declared name plus a readable byte stream.
pub trait UploadedFile: Send + Sync {
    /// Filename as declared by the client.
    fn filename(&self) -> &str;

    /// Open a fresh reader over the uploaded bytes.
    fn content(&self) -> io::Result<Box<dyn Read + Send + '_>>;

    /// Declared extension including the dot (`".zip"`), or an empty string.
    fn extension(&self) -> String {
        let name = self.filename();
        name.rfind('.')
            .map(|pos| name[pos..].to_lowercase())
            .unwrap_or_default()
    }
}

/// Upload held entirely in memory.
#[derive(Debug, Clone)]
pub struct InMemoryUpload {
    filename: String,
    bytes: Vec<u8>,
}

impl InMemoryUpload {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }
}

impl UploadedFile for InMemoryUpload {
    fn filename(&self) -> &str {
        &self.filename
    }

    fn content(&self) -> io::Result<Box<dyn Read + Send + '_>> {
        Ok(Box::new(Cursor::new(self.bytes.as_slice())))
    }
}

/// Upload backed by a file already on disk (e.g. a multipart spool file or
/// a CLI argument). The declared filename may differ from the path's name.
#[derive(Debug, Clone)]
pub struct FileUpload {
    filename: String,
    path: PathBuf,
}

impl FileUpload {
    pub fn new(filename: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            filename: filename.into(),
            path: path.into(),
        }
    }

    /// Use the path's own file name as the declared filename.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { filename, path }
    }
}

impl UploadedFile for FileUpload {
    fn filename(&self) -> &str {
        &self.filename
    }

    fn content(&self) -> io::Result<Box<dyn Read + Send + '_>> {
        Ok(Box::new(File::open(&self.path)?))
    }
}
