//! Facet identity and traits.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Type-erased, reference-counted facet.
pub type FacetRef = Arc<dyn Any + Send + Sync>;

/// Next id to hand out. Ids are never reused.
static NEXT_FACET_ID: AtomicUsize = AtomicUsize::new(1);

/// Process-wide identity of one facet type.
///
/// Declared as a `static` per facet type; the numeric id is assigned on
/// first use and stays fixed for the life of the process.
pub struct FacetId {
    /// Assigned id + 1; 0 while unassigned.
    raw: AtomicUsize,
}

impl FacetId {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            raw: AtomicUsize::new(0),
        }
    }

    /// Index of this facet type in a locale's facet vector.
    pub fn index(&self) -> usize {
        let raw = self.raw.load(Ordering::Acquire);
        if raw != 0 {
            return raw - 1;
        }
        // Losing the race burns one id; the winner's id is used.
        let fresh = NEXT_FACET_ID.fetch_add(1, Ordering::Relaxed);
        match self
            .raw
            .compare_exchange(0, fresh, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => fresh - 1,
            Err(existing) => existing - 1,
        }
    }

    #[must_use]
    pub fn is_assigned(&self) -> bool {
        self.raw.load(Ordering::Acquire) != 0
    }
}

impl Default for FacetId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FacetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.raw.load(Ordering::Acquire) {
            0 => f.write_str("FacetId(unassigned)"),
            raw => write!(f, "FacetId({})", raw - 1),
        }
    }
}

/// A unit of locale-specific behavior.
///
/// ```
/// use kcrt_core::locale::{Facet, FacetId};
///
/// struct Greeting(&'static str);
///
/// impl Facet for Greeting {
///     fn id() -> &'static FacetId {
///         static ID: FacetId = FacetId::new();
///         &ID
///     }
/// }
/// ```
pub trait Facet: Send + Sync + 'static {
    /// The facet type's identity.
    fn id() -> &'static FacetId;
}

/// A facet that can be built on demand for a locale that lacks it.
///
/// Instances created this way are cached per type and recorded with the
/// registry's [`FacetRegistry`](super::FacetRegistry) for teardown.
pub trait LazyFacet: Facet + Sized {
    fn create(locale_name: &str) -> Self;
}
