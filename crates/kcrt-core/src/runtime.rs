//! Runtime startup and library teardown.
//!
//! [`initialize`] runs from the host's entry hook before any other runtime
//! use; [`shutdown`] runs from the unload hook and drives the exit table,
//! which in turn tears down the locale registry.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::config;
use crate::locale::LocaleRegistry;
use crate::metrics::global_metrics;
use crate::onexit::global_table;
use crate::structured_log::{self, LogEntry, LogLevel};

static STARTED: AtomicBool = AtomicBool::new(false);

/// Load configuration, install the log sink and prepare the locale registry.
///
/// Returns false if the runtime was already started.
pub fn initialize() -> bool {
    if STARTED.swap(true, Ordering::AcqRel) {
        return false;
    }
    let cfg = config();
    structured_log::configure(cfg);
    LocaleRegistry::global().ensure_initialized();
    structured_log::emit(
        LogEntry::new(LogLevel::Info, "runtime.start")
            .with_component("runtime")
            .with_details(serde_json::json!({
                "tls_slot_limit": cfg.tls_slot_limit,
                "log_file": cfg.log_file.as_ref().map(|p| p.display().to_string()),
            })),
    );
    true
}

#[must_use]
pub fn is_started() -> bool {
    STARTED.load(Ordering::Acquire)
}

/// Run the process exit table. Only the first call does any work.
///
/// Returns the number of teardown handlers executed.
pub fn shutdown() -> usize {
    let ran = global_table().run();
    if ran > 0 {
        structured_log::emit(
            LogEntry::new(LogLevel::Info, "runtime.shutdown")
                .with_component("runtime")
                .with_details(
                    serde_json::to_value(global_metrics().snapshot()).unwrap_or_default(),
                ),
        );
    }
    ran
}
