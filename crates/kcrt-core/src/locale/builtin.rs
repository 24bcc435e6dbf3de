//! Facets carried by the classic locale, plus lazily surfaced ones.

use std::cmp::Ordering;

use bitflags::bitflags;

use super::facet::{Facet, FacetId, LazyFacet};
use super::is_classic_name;

// ---------------------------------------------------------------------------
// CType
// ---------------------------------------------------------------------------

bitflags! {
    /// Character classification bits (`ctype_base::mask`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CTypeMask: u16 {
        const UPPER = 0x0001;
        const LOWER = 0x0002;
        const DIGIT = 0x0004;
        const SPACE = 0x0008;
        const PUNCT = 0x0010;
        const CNTRL = 0x0020;
        const BLANK = 0x0040;
        const XDIGIT = 0x0080;
        const ALPHA = 0x0100;
        const PRINT = 0x0200;
        const GRAPH = Self::ALPHA.bits() | Self::DIGIT.bits() | Self::PUNCT.bits();
        const ALNUM = Self::ALPHA.bits() | Self::DIGIT.bits();
    }
}

const fn classify(c: u8) -> CTypeMask {
    let mut bits = 0u16;
    if c.is_ascii_uppercase() {
        bits |= CTypeMask::UPPER.bits() | CTypeMask::ALPHA.bits();
    }
    if c.is_ascii_lowercase() {
        bits |= CTypeMask::LOWER.bits() | CTypeMask::ALPHA.bits();
    }
    if c.is_ascii_digit() {
        bits |= CTypeMask::DIGIT.bits();
    }
    if c.is_ascii_hexdigit() {
        bits |= CTypeMask::XDIGIT.bits();
    }
    // ' ', \t, \n, \v, \f, \r
    if c == b' ' || (c >= 0x09 && c <= 0x0D) {
        bits |= CTypeMask::SPACE.bits();
    }
    if c == b' ' || c == b'\t' {
        bits |= CTypeMask::BLANK.bits();
    }
    if c.is_ascii_punctuation() {
        bits |= CTypeMask::PUNCT.bits();
    }
    if c.is_ascii_control() {
        bits |= CTypeMask::CNTRL.bits();
    }
    if c >= 0x20 && c <= 0x7E {
        bits |= CTypeMask::PRINT.bits();
    }
    CTypeMask::from_bits_retain(bits)
}

const fn build_table() -> [CTypeMask; 256] {
    let mut table = [CTypeMask::empty(); 256];
    let mut i = 0;
    while i < 256 {
        table[i] = classify(i as u8);
        i += 1;
    }
    table
}

static CLASSIC_TABLE: [CTypeMask; 256] = build_table();

/// Narrow-character classification and conversion (`ctype<char>`).
///
/// The classic table covers 7-bit ASCII; bytes `0x80..=0xFF` have no class.
#[derive(Debug)]
pub struct CType {
    table: &'static [CTypeMask; 256],
}

impl CType {
    #[must_use]
    pub fn classic() -> Self {
        Self {
            table: &CLASSIC_TABLE,
        }
    }

    /// Classification bits of `c`.
    #[inline]
    #[must_use]
    pub fn mask(&self, c: u8) -> CTypeMask {
        self.table[usize::from(c)]
    }

    /// Returns true if `c` has any bit of `mask`.
    #[inline]
    #[must_use]
    pub fn is(&self, mask: CTypeMask, c: u8) -> bool {
        self.mask(c).intersects(mask)
    }

    /// Position of the first byte matching `mask`.
    #[must_use]
    pub fn scan_is(&self, mask: CTypeMask, s: &[u8]) -> Option<usize> {
        s.iter().position(|&c| self.is(mask, c))
    }

    /// Position of the first byte not matching `mask`.
    #[must_use]
    pub fn scan_not(&self, mask: CTypeMask, s: &[u8]) -> Option<usize> {
        s.iter().position(|&c| !self.is(mask, c))
    }

    #[inline]
    #[must_use]
    pub fn to_upper(&self, c: u8) -> u8 {
        c.to_ascii_uppercase()
    }

    #[inline]
    #[must_use]
    pub fn to_lower(&self, c: u8) -> u8 {
        c.to_ascii_lowercase()
    }

    /// Widen a narrow character to a 16-bit `wchar_t`.
    #[inline]
    #[must_use]
    pub fn widen(&self, c: u8) -> u16 {
        u16::from(c)
    }

    /// Narrow a wide character, substituting `default` outside the byte range.
    #[inline]
    #[must_use]
    pub fn narrow(&self, c: u16, default: u8) -> u8 {
        u8::try_from(c).unwrap_or(default)
    }
}

impl Facet for CType {
    fn id() -> &'static FacetId {
        static ID: FacetId = FacetId::new();
        &ID
    }
}

// ---------------------------------------------------------------------------
// NumPunct
// ---------------------------------------------------------------------------

/// Numeric punctuation (`numpunct<char>`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumPunct {
    pub decimal_point: char,
    pub thousands_sep: char,
    /// Digit group sizes, innermost first; empty means no grouping.
    pub grouping: Vec<u8>,
    pub truename: String,
    pub falsename: String,
}

impl NumPunct {
    #[must_use]
    pub fn classic() -> Self {
        Self {
            decimal_point: '.',
            thousands_sep: ',',
            grouping: Vec::new(),
            truename: "true".to_owned(),
            falsename: "false".to_owned(),
        }
    }

    /// Spelling of a boolean.
    #[must_use]
    pub fn bool_name(&self, value: bool) -> &str {
        if value { &self.truename } else { &self.falsename }
    }
}

impl Facet for NumPunct {
    fn id() -> &'static FacetId {
        static ID: FacetId = FacetId::new();
        &ID
    }
}

// ---------------------------------------------------------------------------
// Collate
// ---------------------------------------------------------------------------

/// String collation (`collate<char>`). The classic locale compares bytes.
#[derive(Debug, Default)]
pub struct Collate;

impl Collate {
    #[must_use]
    pub fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        a.cmp(b)
    }

    /// Key whose byte order equals [`compare`](Self::compare) order.
    #[must_use]
    pub fn transform(&self, s: &[u8]) -> Vec<u8> {
        s.to_vec()
    }

    /// FNV-1a over the collation key.
    #[must_use]
    pub fn hash(&self, s: &[u8]) -> u64 {
        const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
        const PRIME: u64 = 0x0000_0100_0000_01b3;
        s.iter().fold(OFFSET, |h, &b| (h ^ u64::from(b)).wrapping_mul(PRIME))
    }
}

impl Facet for Collate {
    fn id() -> &'static FacetId {
        static ID: FacetId = FacetId::new();
        &ID
    }
}

// ---------------------------------------------------------------------------
// Utf16Codecvt
// ---------------------------------------------------------------------------

/// Conversion failure at `position` (code units consumed before the error).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid sequence at position {position}")]
pub struct ConvError {
    pub position: usize,
}

/// UTF-8 ↔ UTF-16 conversion (`codecvt<char16_t, char, mbstate_t>`).
///
/// Not part of the classic facet vector; surfaced on first use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utf16Codecvt {
    locale_name: String,
}

impl Utf16Codecvt {
    /// Name of the locale this facet was first requested for.
    #[must_use]
    pub fn locale_name(&self) -> &str {
        &self.locale_name
    }

    /// Returns true when created for the classic locale.
    #[must_use]
    pub fn is_classic(&self) -> bool {
        is_classic_name(&self.locale_name)
    }

    /// Encode UTF-8 bytes as UTF-16 code units.
    pub fn to_utf16(&self, s: &[u8]) -> Result<Vec<u16>, ConvError> {
        let text = std::str::from_utf8(s).map_err(|e| ConvError {
            position: e.valid_up_to(),
        })?;
        Ok(text.encode_utf16().collect())
    }

    /// Decode UTF-16 code units to UTF-8.
    pub fn to_utf8(&self, s: &[u16]) -> Result<String, ConvError> {
        let mut out = String::with_capacity(s.len());
        let mut position = 0;
        for decoded in char::decode_utf16(s.iter().copied()) {
            let c = decoded.map_err(|_| ConvError { position })?;
            position += c.len_utf16();
            out.push(c);
        }
        Ok(out)
    }

    /// Most UTF-8 bytes consumed for one character.
    #[must_use]
    pub fn max_length(&self) -> usize {
        4
    }
}

impl Facet for Utf16Codecvt {
    fn id() -> &'static FacetId {
        static ID: FacetId = FacetId::new();
        &ID
    }
}

impl LazyFacet for Utf16Codecvt {
    fn create(locale_name: &str) -> Self {
        Self {
            locale_name: locale_name.to_owned(),
        }
    }
}
