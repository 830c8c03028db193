//! File system utility functions
//!
//! Provides file operations on build artifacts with proper error handling.

use flate2::{Compression, write::GzEncoder};
use std::{
    ffi::OsString,
    fs::{self, File},
    io::{self, BufReader, BufWriter},
    path::{Path, PathBuf},
};
use tracing::{debug, instrument};

/// Utility struct for file system operations
#[derive(Debug, Default, Clone, Copy)]
pub struct FileSystemUtils;

impl FileSystemUtils {
    /// Create a new file system utilities instance
    pub fn new() -> Self {
        Self
    }

    /// `path` with `suffix` appended to its file name (`a.js` -> `a.js.gz`)
    pub fn sibling_with_suffix(&self, path: &Path, suffix: &str) -> PathBuf {
        let mut name = path
            .file_name()
            .map_or_else(OsString::new, ToOwned::to_owned);
        name.push(suffix);
        path.with_file_name(name)
    }

    /// Write a gzip-compressed copy next to `path`, leaving `path` untouched
    #[instrument(skip(self))]
    pub fn gzip_sibling(&self, path: &Path) -> io::Result<PathBuf> {
        let target = self.sibling_with_suffix(path, ".gz");
        debug!("Compressing {} -> {}", path.display(), target.display());

        let mut reader = BufReader::new(File::open(path)?);
        let writer = BufWriter::new(File::create(&target)?);
        let mut encoder = GzEncoder::new(writer, Compression::best());
        io::copy(&mut reader, &mut encoder)?;
        encoder.finish()?.into_inner().map_err(io::IntoInnerError::into_error)?;

        debug!("Compressed {} bytes", self.file_size(&target)?);
        Ok(target)
    }

    /// Get file size in bytes
    pub fn file_size(&self, path: &Path) -> io::Result<u64> {
        Ok(fs::metadata(path)?.len())
    }

    /// Check if a path exists and is a file
    pub fn is_file<P: AsRef<Path>>(&self, path: P) -> bool {
        path.as_ref().is_file()
    }

    /// Check if a path exists and is a directory
    pub fn is_dir<P: AsRef<Path>>(&self, path: P) -> bool {
        path.as_ref().is_dir()
    }
}
