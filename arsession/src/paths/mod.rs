//! Path handling for engine data files.
//!
//! The engine loads trackable datasets from a cache directory the host
//! provides. This module validates that directory, normalizes it to a
//! clean absolute form, and escapes it for engine APIs that take a plain
//! byte string rather than a native path.

use std::path::{Component, Path, PathBuf};

use thiserror::Error;

/// Directory name appended to the platform cache root for the default
/// cache location.
pub const CACHE_DIR_NAME: &str = "arsession";

/// Errors from cache directory validation.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum PathError {
    /// The path was empty.
    #[error("path is empty")]
    Empty,

    /// The path was not absolute.
    #[error("path must be absolute: {0}")]
    NotAbsolute(PathBuf),
}

/// Returns the default cache directory under the platform cache root, or
/// `None` when the platform provides no cache root.
pub fn default_cache_dir() -> Option<PathBuf> {
    dirs::cache_dir().map(|root| root.join(CACHE_DIR_NAME))
}

/// Validates and normalizes a cache directory path.
///
/// The path must be absolute and non-empty. `.` components are removed and
/// trailing separators dropped; the path is not resolved against the
/// filesystem (it may not exist yet).
pub fn normalize_cache_dir(path: &Path) -> Result<PathBuf, PathError> {
    if path.as_os_str().is_empty() {
        return Err(PathError::Empty);
    }
    if !path.is_absolute() {
        return Err(PathError::NotAbsolute(path.to_path_buf()));
    }

    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            other => normalized.push(other),
        }
    }
    Ok(normalized)
}

/// Escapes a path for engine APIs that take a plain byte string.
///
/// Bytes outside `[A-Za-z0-9_.~/-]` are percent-encoded, `%` itself
/// included, so the result round-trips unambiguously.
pub fn file_system_escaped(path: &Path) -> String {
    let raw = path.to_string_lossy();
    let mut escaped = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_' | b'.' | b'~' | b'/' | b'-' => {
                escaped.push(byte as char);
            }
            other => {
                escaped.push('%');
                escaped.push_str(&format!("{:02X}", other));
            }
        }
    }
    escaped
}

// =============================================================================
// Tests
// =============================================================================
