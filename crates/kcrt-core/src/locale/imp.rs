//! Locale implementation object and its shared handle.

use std::alloc::Layout;
use std::fmt;
use std::sync::Arc;

use super::builtin::{CType, Collate, NumPunct};
use super::facet::{Facet, FacetRef};
use super::{CLASSIC_NAME, Category, LocaleRegistry, UNNAMED};
use crate::fatal;
use crate::metrics::{RuntimeMetrics, global_metrics};
use crate::structured_log::{self, LogEntry, LogLevel};

/// Immutable locale state shared by every [`Locale`] handle that refers to it.
pub struct LocaleImpl {
    name: String,
    categories: Category,
    /// Indexed by [`FacetId::index`](super::FacetId::index).
    facets: Vec<Option<FacetRef>>,
    transparent: bool,
    classic: bool,
}

impl LocaleImpl {
    fn build(
        name: String,
        categories: Category,
        facets: Vec<Option<FacetRef>>,
        transparent: bool,
        classic: bool,
    ) -> Self {
        RuntimeMetrics::inc(&global_metrics().locales_constructed);
        structured_log::emit(
            LogEntry::new(LogLevel::Trace, "locale.construct")
                .with_component("locale")
                .with_locale(name.as_str()),
        );
        Self {
            name,
            categories,
            facets,
            transparent,
            classic,
        }
    }

    /// The classic `"C"` locale with its built-in facets.
    pub(crate) fn classic() -> Self {
        let mut facets = Vec::new();
        place::<CType>(&mut facets, Arc::new(CType::classic()));
        place::<NumPunct>(&mut facets, Arc::new(NumPunct::classic()));
        place::<Collate>(&mut facets, Arc::new(Collate));
        Self::build(
            CLASSIC_NAME.to_owned(),
            Category::ALL,
            facets,
            false,
            true,
        )
    }

    /// A facet-less locale that defers lookups to the global locale.
    pub(crate) fn transparent() -> Self {
        Self::build(UNNAMED.to_owned(), Category::empty(), Vec::new(), true, false)
    }

    fn facet_ref(&self, index: usize) -> Option<&FacetRef> {
        self.facets.get(index).and_then(Option::as_ref)
    }
}

impl Drop for LocaleImpl {
    fn drop(&mut self) {
        RuntimeMetrics::inc(&global_metrics().locales_destroyed);
        structured_log::emit(
            LogEntry::new(LogLevel::Trace, "locale.destroy")
                .with_component("locale")
                .with_locale(self.name.as_str()),
        );
    }
}

impl fmt::Debug for LocaleImpl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocaleImpl")
            .field("name", &self.name)
            .field("categories", &self.categories)
            .field("facets", &self.facets.iter().flatten().count())
            .field("transparent", &self.transparent)
            .field("classic", &self.classic)
            .finish()
    }
}

/// Store `facet` at `F`'s index, growing the vector as needed.
fn place<F: Facet>(facets: &mut Vec<Option<FacetRef>>, facet: Arc<F>) {
    let index = F::id().index();
    if facets.len() <= index {
        let additional = index + 1 - facets.len();
        if facets.try_reserve_exact(additional).is_err() {
            let layout = Layout::array::<Option<FacetRef>>(index + 1)
                .unwrap_or_else(|_| Layout::new::<Option<FacetRef>>());
            fatal::alloc_failure("locale facet vector", layout);
        }
        facets.resize(index + 1, None);
    }
    let facet: FacetRef = facet;
    facets[index] = Some(facet);
}

/// Shared handle to a locale.
///
/// Cloning is a reference-count increment; the underlying [`LocaleImpl`]
/// and its facets stay alive until the last handle is dropped.
#[derive(Clone)]
pub struct Locale {
    imp: Arc<LocaleImpl>,
}

impl Locale {
    pub(crate) fn from_impl(imp: LocaleImpl) -> Self {
        Self { imp: Arc::new(imp) }
    }

    pub(crate) fn from_arc(imp: Arc<LocaleImpl>) -> Self {
        Self { imp }
    }

    pub(crate) fn as_arc(&self) -> &Arc<LocaleImpl> {
        &self.imp
    }

    /// The classic `"C"` locale of the process registry.
    #[must_use]
    pub fn classic() -> Self {
        LocaleRegistry::global().classic()
    }

    /// The current global locale of the process registry.
    #[must_use]
    pub fn global() -> Self {
        LocaleRegistry::global().initialize()
    }

    /// A fresh transparent locale from the process registry.
    #[must_use]
    pub fn empty() -> Self {
        LocaleRegistry::global().empty()
    }

    /// Make `locale` the process-wide global locale; returns the previous one.
    pub fn set_global(locale: &Locale) -> Locale {
        LocaleRegistry::global().set_global(locale)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.imp.name
    }

    #[must_use]
    pub fn categories(&self) -> Category {
        self.imp.categories
    }

    /// True if the locale carries every category in `category`.
    #[must_use]
    pub fn covers(&self, category: Category) -> bool {
        self.imp.categories.contains(category)
    }

    #[must_use]
    pub fn is_transparent(&self) -> bool {
        self.imp.transparent
    }

    #[must_use]
    pub fn is_classic(&self) -> bool {
        self.imp.classic
    }

    /// The locale's own `F` facet, without lazy creation or fallback.
    #[must_use]
    pub fn facet<F: Facet>(&self) -> Option<Arc<F>> {
        let facet = self.imp.facet_ref(F::id().index())?;
        Arc::clone(facet).downcast::<F>().ok()
    }

    #[must_use]
    pub fn has_facet<F: Facet>(&self) -> bool {
        self.imp.facet_ref(F::id().index()).is_some()
    }

    /// Number of facets stored in this locale.
    #[must_use]
    pub fn facet_count(&self) -> usize {
        self.imp.facets.iter().flatten().count()
    }

    /// A new unnamed locale equal to this one with `facet` replacing `F`.
    #[must_use]
    pub fn with_facet<F: Facet>(&self, facet: F) -> Locale {
        self.with_facet_arc(Arc::new(facet))
    }

    /// As [`with_facet`](Self::with_facet), sharing an existing facet.
    #[must_use]
    pub fn with_facet_arc<F: Facet>(&self, facet: Arc<F>) -> Locale {
        let mut facets = self.imp.facets.clone();
        place::<F>(&mut facets, facet);
        Self::from_impl(LocaleImpl::build(
            UNNAMED.to_owned(),
            self.imp.categories,
            facets,
            false,
            false,
        ))
    }

    /// Number of live handles to this locale, including this one.
    #[must_use]
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.imp)
    }

    /// Returns true if both handles refer to the same locale object.
    #[must_use]
    pub fn ptr_eq(a: &Locale, b: &Locale) -> bool {
        Arc::ptr_eq(&a.imp, &b.imp)
    }

    /// Give up this handle as an opaque pointer. The reference stays held
    /// until passed back to [`from_raw`](Self::from_raw).
    #[must_use]
    pub fn into_raw(self) -> *const LocaleImpl {
        Arc::into_raw(self.imp)
    }

    /// Reclaim a handle produced by [`into_raw`](Self::into_raw).
    ///
    /// # Safety
    ///
    /// `ptr` must come from `into_raw` and must not be reclaimed twice.
    #[allow(unsafe_code)]
    pub unsafe fn from_raw(ptr: *const LocaleImpl) -> Locale {
        // SAFETY: caller guarantees `ptr` came from `Arc::into_raw` and owns
        // one strong count.
        Self {
            imp: unsafe { Arc::from_raw(ptr) },
        }
    }

    /// Add a reference to the locale behind `ptr` without reclaiming it.
    ///
    /// # Safety
    ///
    /// `ptr` must come from [`into_raw`](Self::into_raw) and still own its
    /// reference.
    #[allow(unsafe_code)]
    pub unsafe fn increment_raw(ptr: *const LocaleImpl) {
        // SAFETY: caller guarantees `ptr` is a live `Arc::into_raw` pointer.
        unsafe { Arc::increment_strong_count(ptr) }
    }
}

/// Same object, or both named and equal by name.
impl PartialEq for Locale {
    fn eq(&self, other: &Self) -> bool {
        Locale::ptr_eq(self, other) || (self.name() != UNNAMED && self.name() == other.name())
    }
}

impl Eq for Locale {}

impl fmt::Debug for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Locale")
            .field("name", &self.name())
            .field("transparent", &self.is_transparent())
            .field("refs", &self.ref_count())
            .finish()
    }
}
