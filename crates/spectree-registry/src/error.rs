//! Error types for the registry
//!
//! Every filesystem failure carries the path it happened on. A missing
//! entry is its own variant so callers can tell "gone" apart from "broken".

use spectree_docstring::HashError;
use std::io;
use std::path::{Path, PathBuf};

/// Errors raised by registry storage operations
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Referenced docstring file or edge marker does not exist
    #[error("registry entry not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// Any other IO failure
    #[error("io error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A file inside an edge directory is not named by a content hash
    #[error("invalid registry entry {}: {source}", path.display())]
    InvalidEntry {
        path: PathBuf,
        #[source]
        source: HashError,
    },

    /// Stored docstring bytes are not UTF-8
    #[error("docstring at {} is not valid utf-8", path.display())]
    InvalidText { path: PathBuf },
}

impl RegistryError {
    /// Classify an IO error, mapping `NotFound` to [`RegistryError::NotFound`]
    pub fn from_io(path: impl AsRef<Path>, source: io::Error) -> Self {
        let path = path.as_ref().to_path_buf();
        if source.kind() == io::ErrorKind::NotFound {
            Self::NotFound { path }
        } else {
            Self::Io { path, source }
        }
    }

    /// Whether this is a missing-entry error
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type alias for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_classified() {
        let err = RegistryError::from_io("/tmp/x", io::Error::from(io::ErrorKind::NotFound));
        assert!(err.is_not_found());
        assert!(err.to_string().contains("/tmp/x"));
    }

    #[test]
    fn other_io_errors_are_not_not_found() {
        let err = RegistryError::from_io(
            "/tmp/x",
            io::Error::from(io::ErrorKind::PermissionDenied),
        );
        assert!(!err.is_not_found());
        assert!(matches!(err, RegistryError::Io { .. }));
    }
}
