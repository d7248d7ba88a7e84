//! Scoped temporary files for uploads and converted output.
//!
//! Every request owns at most two files on disk: the uploaded original and the
//! encoded WebP. Both are held as [`TempPath`]s, so the file is removed on
//! every exit path, including early returns, timeouts and dropped response
//! bodies.
//!
//! # Naming
//!
//! Names combine a millisecond timestamp, a random token chosen by `tempfile`
//! (created exclusively, so never shared) and a sanitised copy of the
//! client-supplied name:
//!
//! ```text
//! uploads/1718035200123-Xk3f9Q-holiday.jpg
//! output/1718035200456-b7TzQe-holiday.webp
//! ```

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tempfile::{Builder, TempPath};

/// Longest sanitised name component kept in a temporary filename.
const MAX_NAME_LEN: usize = 64;

// =============================================================================
// Scratch Space
// =============================================================================

/// The pair of directories used for per-request temporaries.
#[derive(Debug, Clone)]
pub struct ScratchSpace {
    upload_dir: PathBuf,
    output_dir: PathBuf,
}

impl ScratchSpace {
    pub fn new(upload_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    /// Create both directories if they do not exist yet.
    pub fn ensure_dirs(&self) -> io::Result<()> {
        std::fs::create_dir_all(&self.upload_dir)?;
        std::fs::create_dir_all(&self.output_dir)?;
        Ok(())
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Create a fresh upload file, returning the open handle and its guard.
    pub fn create_upload(&self, original_name: &str) -> io::Result<(File, TempPath)> {
        let file = create_in(&self.upload_dir, &format!("-{}", sanitize_component(original_name)))?;
        Ok(file.into_parts())
    }

    /// Create a fresh, empty output file with the given extension.
    pub fn create_output(&self, base_name: &str, extension: &str) -> io::Result<TempPath> {
        let suffix = format!("-{}.{}", sanitize_component(base_name), extension);
        Ok(create_in(&self.output_dir, &suffix)?.into_temp_path())
    }
}

fn create_in(dir: &Path, suffix: &str) -> io::Result<tempfile::NamedTempFile> {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();

    Builder::new()
        .prefix(&format!("{}-", millis))
        .suffix(suffix)
        .tempfile_in(dir)
}

/// Reduce a client-supplied name to a single safe path component.
///
/// Directory parts are dropped and anything outside `[A-Za-z0-9._-]` becomes
/// `_`. Leading dots are stripped so the result is never hidden or `..`.
pub fn sanitize_component(name: &str) -> String {
    let last = name.rsplit(&['/', '\\'][..]).next().unwrap_or(name);

    let cleaned: String = last
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_NAME_LEN)
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.to_string()
    }
}

// =============================================================================
// Tests
// =============================================================================
