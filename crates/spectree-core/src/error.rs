//! Error types for Spectree Core
//!
//! Provides error handling for:
//! - Registry failures during expansion and rewiring
//! - Completion and nearest-neighbor backend failures
//! - Structured responses that never parsed
//! - Configuration loading and validation

use spectree_registry::RegistryError;
use std::path::PathBuf;

/// Main decomposition error type
#[derive(Debug, thiserror::Error)]
pub enum DecomposeError {
    /// Registry storage failed; `NotFound` here is fatal to the traversal
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// External completion or neighbor service failed
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// The repair loop hit its attempt cap without valid JSON
    #[error("no valid structured response after {attempts} attempts: {last_error}")]
    RepairExhausted { attempts: u32, last_error: String },

    /// The backend produced a blank root docstring
    #[error("root docstring is empty")]
    EmptyRoot,

    /// Configuration file could not be read
    #[error("cannot read config {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration is malformed or out of range
    #[error("configuration error: {0}")]
    InvalidConfig(String),
}

impl DecomposeError {
    /// Check if error is a missing registry entry
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Registry(e) if e.is_not_found())
    }

    /// Check if error is worth retrying the whole decomposition for
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Gateway(GatewayError::Timeout { .. } | GatewayError::Unavailable(_))
                | Self::RepairExhausted { .. }
        )
    }
}

/// Failures reported by external collaborators
///
/// The core never inspects these beyond classification; transport details
/// belong to the backend.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Backend rejected or failed the request
    #[error("backend request failed: {0}")]
    Backend(String),

    /// Backend could not be reached
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// Nearest-neighbor lookup failed
    #[error("neighbor search failed: {0}")]
    Neighbors(String),

    /// Backend-side timeout
    #[error("operation timed out after {duration_secs}s")]
    Timeout { duration_secs: u64 },
}

/// Result type alias for decomposition operations
pub type DecomposeResult<T> = Result<T, DecomposeError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn not_found_classification() {
        let err: DecomposeError = RegistryError::from_io(
            "/reg/dependencies/a/b",
            io::Error::from(io::ErrorKind::NotFound),
        )
        .into();
        assert!(err.is_not_found());
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("registry error"));
    }

    #[test]
    fn retryable_classification() {
        assert!(DecomposeError::from(GatewayError::Timeout { duration_secs: 30 }).is_retryable());
        assert!(DecomposeError::RepairExhausted {
            attempts: 3,
            last_error: "eof".into()
        }
        .is_retryable());
        assert!(!DecomposeError::from(GatewayError::Backend("400".into())).is_retryable());
        assert!(!DecomposeError::EmptyRoot.is_retryable());
    }

    #[test]
    fn repair_exhausted_display() {
        let err = DecomposeError::RepairExhausted {
            attempts: 8,
            last_error: "expected value at line 1 column 1".into(),
        };
        assert_eq!(
            err.to_string(),
            "no valid structured response after 8 attempts: expected value at line 1 column 1"
        );
    }
}
