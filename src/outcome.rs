//! Operation results.

/// Why a single interface could not be configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceFailure {
    /// Service (macOS) or adapter (Windows) name.
    pub interface: String,
    /// Human-readable cause, usually the failing command's stderr.
    pub reason: String,
}

impl InterfaceFailure {
    /// Creates a failure record.
    #[must_use]
    pub fn new(interface: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
            reason: reason.into(),
        }
    }
}

/// Per-interface breakdown of a completed operation.
///
/// Interfaces are configured independently, so a failure on one never stops
/// the others. Callers that want all-or-nothing semantics can set
/// [`ChangerOptions::with_require_all_interfaces`](crate::ChangerOptions::with_require_all_interfaces).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    /// Interfaces whose command succeeded, in enumeration order.
    pub succeeded: Vec<String>,
    /// Interfaces whose command failed.
    pub failed: Vec<InterfaceFailure>,
    /// Interfaces skipped by the ignore-set.
    pub ignored: Vec<String>,
}

impl Report {
    /// Returns `true` if no interface failed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Terminal state of an apply or restore call that did not error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The configuration was changed.
    Succeeded(Report),
    /// Nothing was done: unsupported platform or nothing to restore.
    Skipped {
        /// Diagnostic explanation.
        reason: String,
    },
}

impl Outcome {
    pub(crate) fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }

    /// `true` on success, `false` on a graceful skip.
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }

    /// The per-interface report, if the operation ran.
    #[must_use]
    pub const fn report(&self) -> Option<&Report> {
        match self {
            Self::Succeeded(report) => Some(report),
            Self::Skipped { .. } => None,
        }
    }
}
