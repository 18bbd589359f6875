//! Generated files and writing them to disk.

use crate::error::CodegenError;
use std::fs;
use std::path::{Path, PathBuf};

/// One emitted source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    /// Path relative to the output directory (`gtk/widget.ts`).
    pub path: PathBuf,
    /// File contents.
    pub contents: String,
}

impl GeneratedFile {
    /// Creates a generated file.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
        }
    }
}

/// Writes `files` below `out_dir`, creating directories as needed.
///
/// # Errors
/// Returns an IO error if a directory or file cannot be written.
pub fn write_files(files: &[GeneratedFile], out_dir: impl AsRef<Path>) -> Result<(), CodegenError> {
    let out_dir = out_dir.as_ref();
    for file in files {
        let path = out_dir.join(&file.path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, &file.contents)?;
        tracing::debug!("wrote {}", path.display());
    }
    tracing::info!("wrote {} files to {}", files.len(), out_dir.display());
    Ok(())
}
