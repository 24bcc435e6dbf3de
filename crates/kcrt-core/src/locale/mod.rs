//! Locale support.
//!
//! - [`Locale`]: a cheap, reference-counted handle to an immutable locale.
//! - [`LocaleRegistry`]: the process-wide classic/global locale, built lazily
//!   under a lock and read lock-free once published.
//! - [`FacetRegistry`]: facets surfaced on demand, released at teardown.
//! - [`builtin`]: the facets the classic locale carries, plus lazily
//!   surfaced ones.

pub mod builtin;
mod facet;
mod imp;
mod lazy;
mod registry;

use bitflags::bitflags;

pub use facet::{Facet, FacetId, FacetRef, LazyFacet};
pub use imp::{Locale, LocaleImpl};
pub use lazy::FacetRegistry;
pub use registry::{LocaleRegistry, TeardownReport};

/// Name of the classic locale.
pub const CLASSIC_NAME: &str = "C";

/// Name given to unnamed and transparent locales.
pub const UNNAMED: &str = "*";

// Category numbers as the host C headers define them.
pub const LC_ALL: i32 = 0;
pub const LC_COLLATE: i32 = 1;
pub const LC_CTYPE: i32 = 2;
pub const LC_MONETARY: i32 = 3;
pub const LC_NUMERIC: i32 = 4;
pub const LC_TIME: i32 = 5;

bitflags! {
    /// Set of locale categories a locale (or facet) covers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Category: u32 {
        const COLLATE = 1 << 0;
        const CTYPE = 1 << 1;
        const MONETARY = 1 << 2;
        const NUMERIC = 1 << 3;
        const TIME = 1 << 4;
        const MESSAGES = 1 << 5;
        const ALL = Self::COLLATE.bits()
            | Self::CTYPE.bits()
            | Self::MONETARY.bits()
            | Self::NUMERIC.bits()
            | Self::TIME.bits()
            | Self::MESSAGES.bits();
    }
}

impl Category {
    /// Mask for a C `LC_*` number; `None` if the host defines no such
    /// category.
    #[must_use]
    pub fn from_lc(category: i32) -> Option<Self> {
        match category {
            LC_ALL => Some(Self::ALL),
            LC_COLLATE => Some(Self::COLLATE),
            LC_CTYPE => Some(Self::CTYPE),
            LC_MONETARY => Some(Self::MONETARY),
            LC_NUMERIC => Some(Self::NUMERIC),
            LC_TIME => Some(Self::TIME),
            _ => None,
        }
    }
}

/// Returns `true` if `name` refers to the classic locale.
#[inline]
pub fn is_classic_name(name: &str) -> bool {
    matches!(name, "C" | "POSIX")
}
