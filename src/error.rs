//! Error types.

use crate::outcome::InterfaceFailure;
use std::time::Duration;
use thiserror::Error;

/// Result alias for DNS configuration operations.
pub type Result<T> = std::result::Result<T, ChangerError>;

/// Errors returned by apply/restore and their building blocks.
#[derive(Debug, Error)]
pub enum ChangerError {
    /// Malformed input: address syntax, missing server pair, bad options.
    #[error("invalid input: {0}")]
    Validation(String),

    /// The process lacks the privilege needed to change DNS settings, or the
    /// user dismissed the admin prompt.
    #[error("permission denied: {0}")]
    Permission(String),

    /// The admin prompt was not answered in time.
    #[error("elevation prompt timed out after {timeout:?}")]
    ElevationTimeout {
        /// The configured bound.
        timeout: Duration,
    },

    /// An expected backup artifact does not exist.
    #[error("backup not found: {path}")]
    NotFound {
        /// Where the artifact was expected.
        path: String,
    },

    /// An external command exited non-zero (or could not be started).
    #[error("command `{command}` failed ({}): {stderr}", code_label(*.code))]
    Command {
        /// The literal command line.
        command: String,
        /// Exit code, `None` if the process never ran or was killed.
        code: Option<i32>,
        /// Captured standard error, trimmed.
        stderr: String,
    },

    /// A backup could not be taken or parsed.
    #[error("backup error: {0}")]
    Backup(String),

    /// Filesystem I/O failed (typically `PermissionDenied` on `/etc`).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Strict mode: one or more interfaces could not be configured.
    #[error("{} interface(s) failed: {}", .0.len(), join_failures(.0))]
    Interfaces(Vec<InterfaceFailure>),
}

impl ChangerError {
    /// Returns `true` for privilege failures, including an underlying
    /// `PermissionDenied` I/O error.
    #[must_use]
    pub fn is_permission_denied(&self) -> bool {
        match self {
            Self::Permission(_) | Self::ElevationTimeout { .. } => true,
            Self::Io(e) => e.kind() == std::io::ErrorKind::PermissionDenied,
            _ => false,
        }
    }

    /// Returns `true` if a backup artifact was missing.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

fn code_label(code: Option<i32>) -> String {
    code.map_or_else(|| "no exit code".to_string(), |c| format!("exit code {c}"))
}

fn join_failures(failures: &[InterfaceFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{}: {}", f.interface, f.reason))
        .collect::<Vec<_>>()
        .join("; ")
}
