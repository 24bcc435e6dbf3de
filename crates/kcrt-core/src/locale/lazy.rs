//! Registry of lazily surfaced facets.
//!
//! Facets created on demand are not owned by any one locale, so the registry
//! keeps one reference to each until library teardown releases them all.

use std::sync::Arc;

use parking_lot::Mutex;

use super::facet::{Facet, FacetRef};
use crate::metrics::{RuntimeMetrics, global_metrics};
use crate::structured_log::{self, LogEntry, LogLevel};

/// Facet references held for deferred release.
pub struct FacetRegistry {
    entries: Mutex<Vec<FacetRef>>,
}

impl FacetRegistry {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: parking_lot::const_mutex(Vec::new()),
        }
    }

    /// Hold one reference to `facet` until [`teardown`](Self::teardown).
    ///
    /// Entries are not deduplicated; registering the same facet twice
    /// releases two references at teardown.
    pub fn register(&self, facet: FacetRef) {
        self.push(facet, None);
    }

    /// Typed form of [`register`](Self::register); the log entry carries
    /// the facet id.
    pub fn register_facet<F: Facet>(&self, facet: Arc<F>) {
        self.push(facet, Some(F::id().index()));
    }

    fn push(&self, facet: FacetRef, facet_id: Option<usize>) {
        let count = {
            let mut entries = self.entries.lock();
            entries.push(facet);
            entries.len()
        };
        RuntimeMetrics::inc(&global_metrics().facets_registered);
        let mut entry = LogEntry::new(LogLevel::Trace, "facet.register")
            .with_component("facet_registry")
            .with_details(serde_json::json!({ "entries": count }));
        if let Some(id) = facet_id {
            entry = entry.with_facet_id(id);
        }
        structured_log::emit(entry);
    }

    /// Release every entry, newest first. Returns the number released.
    ///
    /// Facets whose last reference was held here are freed. A later call
    /// finds the registry empty.
    pub fn teardown(&self) -> usize {
        let entries = std::mem::take(&mut *self.entries.lock());
        let released = entries.len();
        for facet in entries.into_iter().rev() {
            drop(facet);
        }
        RuntimeMetrics::add(&global_metrics().facets_released, released as u64);
        structured_log::emit(
            LogEntry::new(LogLevel::Debug, "facet.teardown")
                .with_component("facet_registry")
                .with_details(serde_json::json!({ "released": released })),
        );
        released
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for FacetRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FacetRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FacetRegistry")
            .field("entries", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locale::FacetId;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counted {
        tag: usize,
        drops: Arc<Mutex<Vec<usize>>>,
    }

    impl Drop for Counted {
        fn drop(&mut self) {
            self.drops.lock().push(self.tag);
        }
    }

    impl Facet for Counted {
        fn id() -> &'static FacetId {
            static ID: FacetId = FacetId::new();
            &ID
        }
    }

    #[test]
    fn teardown_releases_newest_first() {
        let registry = FacetRegistry::new();
        let drops = Arc::new(Mutex::new(Vec::new()));
        for tag in 0..5 {
            registry.register_facet(Arc::new(Counted {
                tag,
                drops: Arc::clone(&drops),
            }));
        }
        assert_eq!(registry.len(), 5);
        assert_eq!(registry.teardown(), 5);
        assert_eq!(*drops.lock(), vec![4, 3, 2, 1, 0]);
        assert!(registry.is_empty());
    }

    #[test]
    fn second_teardown_is_noop() {
        let registry = FacetRegistry::new();
        let drops = Arc::new(Mutex::new(Vec::new()));
        registry.register_facet(Arc::new(Counted {
            tag: 1,
            drops: Arc::clone(&drops),
        }));
        assert_eq!(registry.teardown(), 1);
        assert_eq!(registry.teardown(), 0);
        assert_eq!(drops.lock().len(), 1);
    }

    #[test]
    fn facet_held_elsewhere_survives_teardown() {
        let registry = FacetRegistry::new();
        let drops = Arc::new(Mutex::new(Vec::new()));
        let facet = Arc::new(Counted {
            tag: 9,
            drops: Arc::clone(&drops),
        });
        registry.register_facet(Arc::clone(&facet));
        registry.teardown();
        assert!(drops.lock().is_empty());
        assert_eq!(facet.tag, 9);
        drop(facet);
        assert_eq!(*drops.lock(), vec![9]);
    }

    #[test]
    fn concurrent_registration_keeps_every_entry() {
        static REGISTRY: FacetRegistry = FacetRegistry::new();
        let live = Arc::new(AtomicUsize::new(0));
        std::thread::scope(|s| {
            for _ in 0..4 {
                let live = Arc::clone(&live);
                s.spawn(move || {
                    for _ in 0..25 {
                        let erased: FacetRef = Arc::new(Arc::clone(&live));
                        live.fetch_add(1, Ordering::SeqCst);
                        REGISTRY.register(erased);
                    }
                });
            }
        });
        assert_eq!(REGISTRY.len(), 100);
        assert_eq!(REGISTRY.teardown(), 100);
        assert_eq!(Arc::strong_count(&live), 1);
    }
}
