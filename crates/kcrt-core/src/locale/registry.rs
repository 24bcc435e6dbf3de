//! Process-wide locale registry.
//!
//! The classic and global locale pointers are published with release stores
//! after the locale is fully built and read with acquire loads, so the fast
//! path never takes a lock. Construction, replacement and teardown run under
//! the registry mutex.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use serde::Serialize;

use super::facet::{Facet, FacetRef, LazyFacet};
use super::imp::{Locale, LocaleImpl};
use super::lazy::FacetRegistry;
use crate::metrics::{RuntimeMetrics, global_metrics};
use crate::onexit::{self, OnExitTable};
use crate::structured_log::{self, LogEntry, LogLevel};
use crate::tls::ThreadLocal;

#[derive(Default)]
struct RegistryState {
    /// Set once the teardown callback is queued with the exit table.
    teardown_registered: bool,
    /// Lazily created facets by facet index.
    lazy: HashMap<usize, FacetRef>,
}

/// What [`LocaleRegistry::teardown`] released.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TeardownReport {
    pub released_classic: bool,
    pub released_global: bool,
    pub thread_locales: usize,
    pub lazy_facets: usize,
    pub facets_torn_down: usize,
}

/// Owner of the classic/global locale and the lazy facet registry.
pub struct LocaleRegistry {
    classic: ArcSwapOption<LocaleImpl>,
    global: ArcSwapOption<LocaleImpl>,
    state: Mutex<RegistryState>,
    facets: FacetRegistry,
    per_thread: ThreadLocal<Mutex<Option<Locale>>>,
    exit_table: &'static OnExitTable,
}

static GLOBAL_REGISTRY: OnceLock<LocaleRegistry> = OnceLock::new();

impl LocaleRegistry {
    /// An uninitialized registry whose teardown runs with `exit_table`.
    #[must_use]
    pub fn new(exit_table: &'static OnExitTable) -> Self {
        Self {
            classic: ArcSwapOption::empty(),
            global: ArcSwapOption::empty(),
            state: Mutex::new(RegistryState::default()),
            facets: FacetRegistry::new(),
            per_thread: ThreadLocal::new(Mutex::new(None)),
            exit_table,
        }
    }

    /// The process registry, torn down by the process exit table.
    #[must_use]
    pub fn global() -> &'static LocaleRegistry {
        GLOBAL_REGISTRY.get_or_init(|| LocaleRegistry::new(onexit::global_table()))
    }

    /// Registry of lazily surfaced facets.
    #[must_use]
    pub fn facets(&self) -> &FacetRegistry {
        &self.facets
    }

    /// The current global locale, if initialized. Never blocks.
    #[must_use]
    pub fn get_global(&self) -> Option<Locale> {
        self.global.load_full().map(Locale::from_arc)
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.global.load().is_some()
    }

    /// Replace the global locale; returns the previous one.
    ///
    /// Initializes the registry first so the classic locale always exists
    /// alongside a replaced global.
    pub fn set_global(&'static self, locale: &Locale) -> Locale {
        let previous = {
            let mut state = self.state.lock();
            let (_, previous) = self.init_locked(&mut state);
            self.global.store(Some(Arc::clone(locale.as_arc())));
            previous
        };
        structured_log::emit(
            LogEntry::new(LogLevel::Debug, "locale.set_global")
                .with_component("locale_registry")
                .with_locale(locale.name()),
        );
        Locale::from_arc(previous)
    }

    /// Build the classic locale if needed.
    pub fn ensure_initialized(&'static self) {
        if self.classic.load().is_some() && self.global.load().is_some() {
            return;
        }
        let mut state = self.state.lock();
        self.init_locked(&mut state);
    }

    /// The global locale, building it first if needed.
    ///
    /// The returned handle is acquired together with initialization, so it
    /// stays valid even if another thread replaces the global locale.
    #[must_use]
    pub fn initialize(&'static self) -> Locale {
        if let Some(global) = self.global.load_full() {
            return Locale::from_arc(global);
        }
        let mut state = self.state.lock();
        let (_, global) = self.init_locked(&mut state);
        Locale::from_arc(global)
    }

    /// The classic `"C"` locale; the same object until teardown.
    #[must_use]
    pub fn classic(&'static self) -> Locale {
        if let Some(classic) = self.classic.load_full() {
            return Locale::from_arc(classic);
        }
        let mut state = self.state.lock();
        let (classic, _) = self.init_locked(&mut state);
        Locale::from_arc(classic)
    }

    /// A new transparent locale, independent of classic and global.
    #[must_use]
    pub fn empty(&'static self) -> Locale {
        self.ensure_initialized();
        Locale::from_impl(LocaleImpl::transparent())
    }

    /// `F` from the locale itself or, for a transparent locale, from the
    /// global locale. Never creates a facet.
    #[must_use]
    pub fn find_facet<F: Facet>(&'static self, locale: &Locale) -> Option<Arc<F>> {
        match locale.facet::<F>() {
            Some(facet) => Some(facet),
            None if locale.is_transparent() => self.initialize().facet::<F>(),
            None => None,
        }
    }

    /// `F` as seen through `locale`.
    ///
    /// Looks in the locale's own facets, then (for a transparent locale) in
    /// the global locale, then in the lazy cache, creating and registering
    /// the facet on first use.
    pub fn use_facet<F: LazyFacet>(&'static self, locale: &Locale) -> Arc<F> {
        if let Some(facet) = self.find_facet::<F>(locale) {
            return facet;
        }

        let index = F::id().index();
        let mut state = self.state.lock();
        if let Some(cached) = state.lazy.get(&index) {
            if let Ok(facet) = Arc::clone(cached).downcast::<F>() {
                return facet;
            }
        }
        let facet = Arc::new(F::create(locale.name()));
        state.lazy.insert(index, Arc::clone(&facet) as FacetRef);
        self.facets.register_facet(Arc::clone(&facet));
        drop(state);

        RuntimeMetrics::inc(&global_metrics().lazy_facets_created);
        structured_log::emit(
            LogEntry::new(LogLevel::Debug, "facet.lazy_create")
                .with_component("locale_registry")
                .with_locale(locale.name())
                .with_facet_id(index),
        );
        facet
    }

    /// Set the calling thread's locale; `None` reverts to the global locale.
    /// Returns the thread's previous setting.
    ///
    /// The setting is released when the thread exits.
    pub fn set_thread_locale(&self, locale: Option<Locale>) -> Option<Locale> {
        let cell = self.per_thread.get_or(|| Mutex::new(None));
        std::mem::replace(&mut *cell.lock(), locale)
    }

    /// The calling thread's locale, or the global locale if none is set.
    #[must_use]
    pub fn thread_locale(&'static self) -> Locale {
        let own = self.per_thread.get().and_then(|cell| cell.lock().clone());
        match own {
            Some(locale) => locale,
            None => self.initialize(),
        }
    }

    /// Release the classic and global locales, every thread's locale, and
    /// every lazily registered facet.
    ///
    /// Objects still referenced by outstanding handles survive until those
    /// handles drop. Normally run once by the exit table; once the table has
    /// run, a later initialization tries to queue teardown again.
    pub fn teardown(&self) -> TeardownReport {
        let (classic, global, lazy) = {
            let mut state = self.state.lock();
            if self.exit_table.has_run() {
                state.teardown_registered = false;
            }
            (
                self.classic.swap(None),
                self.global.swap(None),
                std::mem::take(&mut state.lazy),
            )
        };

        let mut thread_locales = Vec::new();
        self.per_thread.for_each_bound(|cell| {
            if let Some(locale) = cell.lock().take() {
                thread_locales.push(locale);
            }
        });

        let mut report = TeardownReport {
            released_classic: classic.is_some(),
            released_global: global.is_some(),
            thread_locales: thread_locales.len(),
            lazy_facets: lazy.len(),
            facets_torn_down: 0,
        };
        drop(thread_locales);
        drop(global);
        drop(classic);
        drop(lazy);
        report.facets_torn_down = self.facets.teardown();

        structured_log::emit(
            LogEntry::new(LogLevel::Info, "locale.teardown")
                .with_component("locale_registry")
                .with_details(serde_json::to_value(report).unwrap_or_default()),
        );
        report
    }

    /// Publish the classic and global locales if missing and queue teardown
    /// on first use. Returns `(classic, global)`.
    fn init_locked(
        &'static self,
        state: &mut RegistryState,
    ) -> (Arc<LocaleImpl>, Arc<LocaleImpl>) {
        let classic = match self.classic.load_full() {
            Some(classic) => classic,
            None => {
                let classic = Arc::new(LocaleImpl::classic());
                self.classic.store(Some(Arc::clone(&classic)));
                structured_log::emit(
                    LogEntry::new(LogLevel::Debug, "locale.classic_init")
                        .with_component("locale_registry")
                        .with_locale(super::CLASSIC_NAME),
                );
                classic
            }
        };
        let global = match self.global.load_full() {
            Some(global) => global,
            None => {
                self.global.store(Some(Arc::clone(&classic)));
                Arc::clone(&classic)
            }
        };

        if !state.teardown_registered {
            state.teardown_registered = true;
            if let Err(err) = self.exit_table.register(move || {
                self.teardown();
            }) {
                structured_log::emit(
                    LogEntry::new(LogLevel::Warn, "locale.teardown_unregistered")
                        .with_component("locale_registry")
                        .with_message(err.to_string()),
                );
            }
        }
        (classic, global)
    }
}

impl std::fmt::Debug for LocaleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocaleRegistry")
            .field("initialized", &self.is_initialized())
            .field("facets", &self.facets)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locale::builtin::{CType, NumPunct, Utf16Codecvt};

    fn fresh() -> (&'static OnExitTable, &'static LocaleRegistry) {
        let table: &'static OnExitTable = Box::leak(Box::new(OnExitTable::new()));
        let registry = Box::leak(Box::new(LocaleRegistry::new(table)));
        (table, registry)
    }

    #[test]
    fn starts_uninitialized() {
        let (table, registry) = fresh();
        assert!(!registry.is_initialized());
        assert!(registry.get_global().is_none());
        assert!(table.is_empty());
    }

    #[test]
    fn classic_is_stable_and_named_c() {
        let (_, registry) = fresh();
        let a = registry.classic();
        let b = registry.classic();
        assert!(Locale::ptr_eq(&a, &b));
        assert_eq!(a.name(), "C");
        assert!(a.is_classic());
        let global = registry.get_global().unwrap();
        assert!(Locale::ptr_eq(&a, &global));
    }

    #[test]
    fn teardown_registers_once() {
        let (table, registry) = fresh();
        let _ = registry.classic();
        let _ = registry.initialize();
        registry.ensure_initialized();
        let _ = registry.empty();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn empty_is_independent() {
        let (_, registry) = fresh();
        let classic = registry.classic();
        let e1 = registry.empty();
        let e2 = registry.empty();
        assert!(e1.is_transparent());
        assert!(!Locale::ptr_eq(&e1, &e2));
        assert!(!Locale::ptr_eq(&e1, &classic));
        assert_eq!(e1.name(), "*");
    }

    #[test]
    fn set_global_keeps_classic() {
        let (_, registry) = fresh();
        let classic = registry.classic();
        let custom = classic.with_facet(NumPunct {
            decimal_point: ',',
            ..NumPunct::classic()
        });
        let previous = registry.set_global(&custom);
        assert!(Locale::ptr_eq(&previous, &classic));
        assert!(Locale::ptr_eq(&registry.get_global().unwrap(), &custom));
        assert!(Locale::ptr_eq(&registry.classic(), &classic));
    }

    #[test]
    fn set_global_before_initialize_builds_classic() {
        let (table, registry) = fresh();
        let standalone = Locale::from_impl(LocaleImpl::transparent());
        let previous = registry.set_global(&standalone);
        assert!(previous.is_classic());
        assert!(registry.classic().is_classic());
        assert!(Locale::ptr_eq(&registry.initialize(), &standalone));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn use_facet_prefers_own_then_global_then_lazy() {
        let (_, registry) = fresh();
        let classic = registry.classic();
        let own = registry.find_facet::<CType>(&classic).unwrap();
        assert!(Arc::ptr_eq(&own, &classic.facet::<CType>().unwrap()));

        let empty = registry.empty();
        let via_global = registry.find_facet::<CType>(&empty).unwrap();
        assert!(Arc::ptr_eq(&own, &via_global));

        assert!(registry.facets().is_empty());
        let lazy = registry.use_facet::<Utf16Codecvt>(&classic);
        assert_eq!(lazy.locale_name(), "C");
        let again = registry.use_facet::<Utf16Codecvt>(&empty);
        assert!(Arc::ptr_eq(&lazy, &again));
        assert_eq!(registry.facets().len(), 1);
    }

    #[test]
    fn thread_locale_falls_back_to_global() {
        let (_, registry) = fresh();
        let classic = registry.classic();
        assert!(Locale::ptr_eq(&registry.thread_locale(), &classic));

        let custom = classic.with_facet(CType::classic());
        assert!(registry.set_thread_locale(Some(custom.clone())).is_none());
        assert!(Locale::ptr_eq(&registry.thread_locale(), &custom));

        std::thread::scope(|s| {
            s.spawn(|| {
                assert!(Locale::ptr_eq(&registry.thread_locale(), &classic));
            });
        });

        let previous = registry.set_thread_locale(None).unwrap();
        assert!(Locale::ptr_eq(&previous, &custom));
        assert!(Locale::ptr_eq(&registry.thread_locale(), &classic));
    }

    #[test]
    fn exited_threads_release_their_locale() {
        let (_, registry) = fresh();
        let custom = registry.classic().with_facet(NumPunct {
            decimal_point: ',',
            ..NumPunct::classic()
        });
        let baseline = registry.per_thread.bound_count();

        let handles: Vec<_> = (0..200)
            .map(|_| {
                let custom = custom.clone();
                std::thread::spawn(move || {
                    registry.set_thread_locale(Some(custom.clone()));
                    assert!(Locale::ptr_eq(&registry.thread_locale(), &custom));
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(custom.ref_count(), 1);
        assert_eq!(registry.per_thread.bound_count(), baseline);
    }

    #[test]
    fn clearing_thread_locale_drops_reference() {
        let (_, registry) = fresh();
        let custom = registry.classic().with_facet(CType::classic());
        registry.set_thread_locale(Some(custom.clone()));
        assert_eq!(custom.ref_count(), 2);
        registry.set_thread_locale(None);
        assert_eq!(custom.ref_count(), 1);
    }

    #[test]
    fn reinitialization_after_exit_is_not_queued() {
        let (table, registry) = fresh();
        let first = registry.classic();
        assert_eq!(table.run(), 1);
        assert!(!registry.state.lock().teardown_registered);

        let second = registry.classic();
        assert!(!Locale::ptr_eq(&first, &second));
        assert!(table.is_empty());
        assert!(registry.state.lock().teardown_registered);

        let report = registry.teardown();
        assert!(report.released_classic);
        assert_eq!(second.ref_count(), 1);
    }

    #[test]
    fn exit_table_runs_teardown() {
        let (table, registry) = fresh();
        let classic = registry.classic();
        let lazy = registry.use_facet::<Utf16Codecvt>(&classic);
        std::thread::scope(|s| {
            s.spawn(|| {
                registry.set_thread_locale(Some(registry.empty()));
            });
        });
        assert_eq!(Arc::strong_count(&lazy), 3);

        assert_eq!(table.run(), 1);
        assert!(!registry.is_initialized());
        assert!(registry.facets().is_empty());
        assert_eq!(Arc::strong_count(&lazy), 1);
        // Our handle keeps the old classic alive.
        assert_eq!(classic.ref_count(), 1);
        assert_eq!(classic.name(), "C");
    }

    #[test]
    fn teardown_report_counts() {
        let (_, registry) = fresh();
        let classic = registry.classic();
        let _ = registry.use_facet::<Utf16Codecvt>(&classic);
        registry.set_thread_locale(Some(classic.clone()));
        let report = registry.teardown();
        assert_eq!(
            report,
            TeardownReport {
                released_classic: true,
                released_global: true,
                thread_locales: 1,
                lazy_facets: 1,
                facets_torn_down: 1,
            }
        );
        assert_eq!(registry.teardown(), TeardownReport::default());
    }
}
