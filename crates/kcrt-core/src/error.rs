//! Runtime error taxonomy.
//!
//! Everything here is foundational: callers above the core never see these
//! as recoverable values. The `try_*` entry points return them so the fatal
//! path in [`crate::fatal`] has a single place to report from.

use thiserror::Error;

/// Errors raised by the runtime core.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// Every thread-local slot index is in use.
    #[error("thread-local slots exhausted (limit {limit})")]
    SlotsExhausted { limit: usize },
    /// The calling thread could not record a binding for a slot.
    #[error("failed to bind thread-local slot {index} for the calling thread")]
    BindFailed { index: usize },
    /// A slot was dereferenced on a thread that never bound a value.
    #[error("thread-local slot {index} has no value bound for the calling thread")]
    Unbound { index: usize },
    /// A handler was registered after the exit table ran.
    #[error("exit table already ran; handler not registered")]
    ExitTableClosed,
    /// Memory for a locale or facet structure could not be obtained.
    #[error("allocation of {size} bytes failed while constructing {what}")]
    AllocationFailed { what: &'static str, size: usize },
}

impl RuntimeError {
    /// Stable short name used as the structured log event suffix.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::SlotsExhausted { .. } => "slots_exhausted",
            Self::BindFailed { .. } => "bind_failed",
            Self::Unbound { .. } => "unbound",
            Self::ExitTableClosed => "exit_table_closed",
            Self::AllocationFailed { .. } => "allocation_failed",
        }
    }
}

/// Result alias for the runtime core.
pub type Result<T> = std::result::Result<T, RuntimeError>;
