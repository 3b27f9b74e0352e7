//! Filesystem port for reading the local files to commit.

use std::path::Path;

/// Reads local files.
///
/// Abstracting the filesystem keeps the commit command testable without
/// touching the real disk.
pub trait FileSystem: Send + Sync {
    /// Reads the entire contents of a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist or cannot be read.
    fn read(&self, path: &Path) -> Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>>;
}
