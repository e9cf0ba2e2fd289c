//! Error types.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result alias for DNS operations.
pub type Result<T> = std::result::Result<T, DnsError>;

/// Errors returned by DNS operations.
#[derive(Debug, Error)]
pub enum DnsError {
    /// A string that should be a dotted-quad IPv4 address is not one.
    #[error("invalid IPv4 address: {0}")]
    InvalidAddress(String),

    /// The server-list source could not be turned into a usable list.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// The executable for a method is not installed.
    #[error("command not found: {tool}")]
    ToolAbsent {
        /// Program name that failed to spawn.
        tool: String,
    },

    /// The executable ran but reported failure, or its output could not be parsed.
    #[error("{tool} failed ({status}): {message}")]
    ToolFailed {
        /// Program name.
        tool: String,
        /// Exit status description (`exit 1`, `signal`, `parse`).
        status: String,
        /// Trimmed stderr, or stdout when stderr is empty.
        message: String,
    },

    /// The executable did not finish within its time budget and was killed.
    #[error("{tool} timed out after {after:?}")]
    ToolTimedOut {
        /// Program name.
        tool: String,
        /// Budget that was exceeded.
        after: Duration,
    },

    /// The Safety Gate vetoed a direct edit of a shared resolver file.
    #[error("refusing to edit {}: {reason}", path.display())]
    SafetyRefusal {
        /// The resolver file that was not touched.
        path: PathBuf,
        /// Why the file is considered owned by another service.
        reason: String,
    },

    /// No snapshot could be captured or found for this platform.
    #[error("DNS snapshot unavailable: {0}")]
    SnapshotUnavailable(String),

    /// Some attachment points could not be restored.
    #[error("restore incomplete: {} point(s) failed", failed.len())]
    RestoreIncomplete {
        /// Identifiers of the attachment points that failed.
        failed: Vec<String>,
    },

    /// The process lacks root/administrator rights.
    #[error("insufficient privileges: run as root (sudo) or Administrator")]
    PrivilegeDenied,

    /// The host OS is not one of Windows, Linux or macOS.
    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// The direct-file backup is missing, so the file cannot be put back.
    #[error("backup not found: {}", path.display())]
    BackupMissing {
        /// The canonical backup path that was checked.
        path: PathBuf,
    },

    /// A snapshot entry carries nothing that can be written back.
    #[error("cannot restore {point}: {reason}")]
    NotRestorable {
        /// The attachment point.
        point: String,
        /// What is missing from the entry.
        reason: String,
    },

    /// The listing facility returned no active attachment points.
    #[error("no active attachment points found by {tool}")]
    NoAttachmentPoints {
        /// Program used for listing.
        tool: String,
    },

    /// Filesystem I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The snapshot document could not be encoded or decoded.
    #[error("snapshot format error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DnsError {
    /// Returns `true` if the method's executable is missing.
    #[must_use]
    pub const fn is_tool_absent(&self) -> bool {
        matches!(self, Self::ToolAbsent { .. })
    }

    /// Returns `true` if the underlying I/O error is `PermissionDenied`.
    #[must_use]
    pub fn is_permission_denied(&self) -> bool {
        match self {
            Self::PrivilegeDenied => true,
            Self::Io(e) => e.kind() == std::io::ErrorKind::PermissionDenied,
            _ => false,
        }
    }

    pub(crate) fn parse(tool: &str, message: impl Into<String>) -> Self {
        Self::ToolFailed {
            tool: tool.to_string(),
            status: "parse".to_string(),
            message: message.into(),
        }
    }
}
