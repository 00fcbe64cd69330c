//! Filesystem access for exported frames.
//!
//! The exporter only ever creates directories, writes whole files and
//! removes files. [`FileSystem`] abstracts those three calls so tests can
//! inject failures; [`StdFileSystem`] is the default.

use std::fs;
use std::io::Result as IoResult;
use std::path::Path;

use crate::export::ExportStatus;

/// The file operations an export performs.
pub trait FileSystem: Send + Sync {
    /// Create `path` and any missing parents.
    fn create_dir_all(&self, path: &Path) -> IoResult<()>;

    /// Write `contents` to `path`, replacing any existing file.
    fn write(&self, path: &Path, contents: &[u8]) -> IoResult<()>;

    /// Remove the file at `path`.
    fn remove_file(&self, path: &Path) -> IoResult<()>;
}

/// [`FileSystem`] backed by [`std::fs`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFileSystem;

impl FileSystem for StdFileSystem {
    fn create_dir_all(&self, path: &Path) -> IoResult<()> {
        fs::create_dir_all(path)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> IoResult<()> {
        fs::write(path, contents)
    }

    fn remove_file(&self, path: &Path) -> IoResult<()> {
        fs::remove_file(path)
    }
}

/// Remove every file referenced by `status`.
///
/// This is cleanup, so it never fails: errors are logged and skipped.
/// Statuses without files ([`ExportStatus::Cancelled`],
/// [`ExportStatus::Failed`]) are a no-op.
pub fn delete_files(status: &ExportStatus, file_system: &dyn FileSystem) {
    for path in status.files() {
        if let Err(error) = file_system.remove_file(path) {
            log::warn!("Could not remove {}: {error}", path.display());
        }
    }
}
