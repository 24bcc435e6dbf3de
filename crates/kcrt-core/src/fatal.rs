//! Non-returning error reporting.
//!
//! The host builds with `panic = "abort"`, so [`raise`] terminates the
//! calling path the same way a CRT runtime-error would. Allocation failures
//! go through the global allocation error handler instead.

use std::alloc::Layout;

use crate::error::RuntimeError;
use crate::metrics::{RuntimeMetrics, global_metrics};
use crate::structured_log::{self, LogEntry, LogLevel};

/// Report `err` and stop the calling path.
#[cold]
#[track_caller]
pub fn raise(err: RuntimeError) -> ! {
    RuntimeMetrics::inc(&global_metrics().fatal_errors);
    structured_log::emit(
        LogEntry::new(LogLevel::Fatal, format!("fatal.{}", err.kind()))
            .with_component("runtime")
            .with_message(err.to_string()),
    );
    panic!("kcrt fatal: {err}");
}

/// Report an allocation failure for `what` and hand off to the allocation
/// error handler.
#[cold]
pub fn alloc_failure(what: &'static str, layout: Layout) -> ! {
    RuntimeMetrics::inc(&global_metrics().fatal_errors);
    let err = RuntimeError::AllocationFailed {
        what,
        size: layout.size(),
    };
    structured_log::emit(
        LogEntry::new(LogLevel::Fatal, format!("fatal.{}", err.kind()))
            .with_component("runtime")
            .with_message(err.to_string()),
    );
    std::alloc::handle_alloc_error(layout)
}
