// SPDX-License-Identifier: GPL-3.0-or-later
use std::path::PathBuf;

use thiserror::Error;

/// A caller supplied path was refused. Never corrected silently.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SecurityError {
    #[error("path is not valid percent-encoded UTF-8")]
    Decode,

    #[error("path contains a null byte")]
    NullByte,

    #[error("path segment '{0}' is a reserved device name")]
    ReservedName(String),

    #[error("path escapes the library root")]
    OutsideRoot,
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Security(#[from] SecurityError),

    #[error("path does not exist: {0}")]
    NotFound(PathBuf),

    #[error("path is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ScanError {
    pub(crate) fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path),
            _ => Self::Io { path, source },
        }
    }
}
