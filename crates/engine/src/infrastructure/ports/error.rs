//! Error types for port operations.

use std::io;
use std::path::{Path, PathBuf};

/// Failures reported by the host process.
#[derive(Debug, Clone, thiserror::Error)]
pub enum HostError {
    /// The host refused or failed an operation - includes operation name for tracing.
    #[error("Host failed to {operation}: {message}")]
    Rejected {
        operation: &'static str,
        message: String,
    },

    /// The host is no longer accepting work.
    #[error("Host is shutting down")]
    ShuttingDown,
}

impl HostError {
    /// Create a Rejected error with operation context.
    pub fn rejected(operation: &'static str, message: impl ToString) -> Self {
        Self::Rejected {
            operation,
            message: message.to_string(),
        }
    }
}

/// Filesystem store errors with path context.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O failed - includes operation and path for actionable messages.
    #[error("I/O error during {operation} on {}: {source}", .path.display())]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// File was readable but its content could not be used.
    #[error("Malformed {what} at {}: {message}", .path.display())]
    Malformed {
        what: &'static str,
        path: PathBuf,
        message: String,
    },
}

impl StoreError {
    /// Create an Io error with operation and path context.
    pub fn io(operation: &'static str, path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Create a Malformed error.
    pub fn malformed(what: &'static str, path: impl AsRef<Path>, message: impl ToString) -> Self {
        Self::Malformed {
            what,
            path: path.as_ref().to_path_buf(),
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_names_operation_and_path() {
        let err = StoreError::io(
            "read marker",
            "/srv/hc_reset.flag",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(
            err.to_string(),
            "I/O error during read marker on /srv/hc_reset.flag: denied"
        );
    }

    #[test]
    fn malformed_error_names_what_and_path() {
        assert_eq!(
            StoreError::malformed("marker", "/srv/hc_reset.flag", "bad time").to_string(),
            "Malformed marker at /srv/hc_reset.flag: bad time"
        );
    }
}
