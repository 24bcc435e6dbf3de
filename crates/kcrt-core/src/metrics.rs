//! Atomic counters for runtime observability.
//!
//! All counters use relaxed ordering. They are diagnostic only and never
//! synchronize anything.

use std::sync::atomic::{AtomicU64, Ordering};

/// Global runtime operation counters.
pub struct RuntimeMetrics {
    /// Locale implementation objects built (classic, empty, combined).
    pub locales_constructed: AtomicU64,
    /// Locale implementation objects dropped after their last handle.
    pub locales_destroyed: AtomicU64,
    /// Facets recorded with a lazy facet registry.
    pub facets_registered: AtomicU64,
    /// Facet references released by registry teardown.
    pub facets_released: AtomicU64,
    /// Facets created on demand by `use_facet`.
    pub lazy_facets_created: AtomicU64,
    /// Thread-local slot indices handed out.
    pub tls_slots_allocated: AtomicU64,
    /// Thread-local slot indices returned.
    pub tls_slots_released: AtomicU64,
    /// Per-thread values bound into slots.
    pub tls_values_bound: AtomicU64,
    /// Per-thread values freed at slot destruction.
    pub tls_values_freed: AtomicU64,
    /// Exit-table handlers executed.
    pub exit_handlers_run: AtomicU64,
    /// Fatal errors raised.
    pub fatal_errors: AtomicU64,
}

impl RuntimeMetrics {
    /// Create a new zeroed metrics instance.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            locales_constructed: AtomicU64::new(0),
            locales_destroyed: AtomicU64::new(0),
            facets_registered: AtomicU64::new(0),
            facets_released: AtomicU64::new(0),
            lazy_facets_created: AtomicU64::new(0),
            tls_slots_allocated: AtomicU64::new(0),
            tls_slots_released: AtomicU64::new(0),
            tls_values_bound: AtomicU64::new(0),
            tls_values_freed: AtomicU64::new(0),
            exit_handlers_run: AtomicU64::new(0),
            fatal_errors: AtomicU64::new(0),
        }
    }

    /// Increment a counter by 1.
    pub fn inc(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment a counter by `n`.
    pub fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    /// Read a counter value.
    pub fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }

    /// Snapshot all counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            locales_constructed: Self::get(&self.locales_constructed),
            locales_destroyed: Self::get(&self.locales_destroyed),
            facets_registered: Self::get(&self.facets_registered),
            facets_released: Self::get(&self.facets_released),
            lazy_facets_created: Self::get(&self.lazy_facets_created),
            tls_slots_allocated: Self::get(&self.tls_slots_allocated),
            tls_slots_released: Self::get(&self.tls_slots_released),
            tls_values_bound: Self::get(&self.tls_values_bound),
            tls_values_freed: Self::get(&self.tls_values_freed),
            exit_handlers_run: Self::get(&self.exit_handlers_run),
            fatal_errors: Self::get(&self.fatal_errors),
        }
    }
}

impl Default for RuntimeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time snapshot of all runtime counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    pub locales_constructed: u64,
    pub locales_destroyed: u64,
    pub facets_registered: u64,
    pub facets_released: u64,
    pub lazy_facets_created: u64,
    pub tls_slots_allocated: u64,
    pub tls_slots_released: u64,
    pub tls_values_bound: u64,
    pub tls_values_freed: u64,
    pub exit_handlers_run: u64,
    pub fatal_errors: u64,
}

/// Global metrics instance.
static GLOBAL_METRICS: RuntimeMetrics = RuntimeMetrics::new();

/// Access the global metrics singleton.
#[must_use]
pub fn global_metrics() -> &'static RuntimeMetrics {
    &GLOBAL_METRICS
}
