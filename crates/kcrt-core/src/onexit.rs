//! Library teardown handlers (`_onexit`/`atexit` table).
//!
//! Handlers run in reverse registration order, exactly once. The table lock
//! is released before any handler runs so a handler may itself touch
//! registries that register further work.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::error::{Result, RuntimeError};
use crate::metrics::{RuntimeMetrics, global_metrics};
use crate::structured_log::{self, LogEntry, LogLevel};

/// A teardown handler.
pub type ExitHandler = Box<dyn FnOnce() + Send>;

/// Ordered collection of teardown handlers.
pub struct OnExitTable {
    handlers: Mutex<Vec<ExitHandler>>,
    ran: AtomicBool,
}

impl OnExitTable {
    /// Create an empty table.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            handlers: parking_lot::const_mutex(Vec::new()),
            ran: AtomicBool::new(false),
        }
    }

    /// Append a handler. Fails once the table has run.
    pub fn register<F>(&self, handler: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let mut handlers = self.handlers.lock();
        if self.ran.load(Ordering::Acquire) {
            return Err(RuntimeError::ExitTableClosed);
        }
        handlers.push(Box::new(handler));
        Ok(())
    }

    /// Number of pending handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true once [`run`](Self::run) has started.
    #[must_use]
    pub fn has_run(&self) -> bool {
        self.ran.load(Ordering::Acquire)
    }

    /// Run every handler newest-first and close the table.
    ///
    /// Returns the number of handlers executed; later calls return 0.
    pub fn run(&self) -> usize {
        let handlers = {
            let mut lock = self.handlers.lock();
            if self.ran.swap(true, Ordering::AcqRel) {
                return 0;
            }
            std::mem::take(&mut *lock)
        };

        let count = handlers.len();
        for handler in handlers.into_iter().rev() {
            handler();
            RuntimeMetrics::inc(&global_metrics().exit_handlers_run);
        }
        structured_log::emit(
            LogEntry::new(LogLevel::Debug, "onexit.run")
                .with_component("onexit")
                .with_details(serde_json::json!({ "handlers": count })),
        );
        count
    }
}

impl Default for OnExitTable {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL_TABLE: OnceLock<OnExitTable> = OnceLock::new();

/// The process-wide exit table, run by [`crate::runtime::shutdown`].
#[must_use]
pub fn global_table() -> &'static OnExitTable {
    GLOBAL_TABLE.get_or_init(OnExitTable::new)
}
