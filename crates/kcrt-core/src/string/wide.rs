//! `wcslen`, `wcsncpy`, `wcsrchr`, `wcscmp` over 16-bit `wchar_t`.

use std::cmp::Ordering;

/// Host `wchar_t`.
pub type WChar = u16;

/// Units before the first NUL, or the slice length if there is none.
#[inline]
pub fn wcslen(s: &[WChar]) -> usize {
    s.iter().position(|&c| c == 0).unwrap_or(s.len())
}

/// Copy at most `n` units of `src` into `dest`, NUL-padding the rest of the
/// first `n` units.
///
/// # Panics
///
/// If `dest` is shorter than `n`.
pub fn wcsncpy(dest: &mut [WChar], src: &[WChar], n: usize) {
    assert!(
        n <= dest.len(),
        "wcsncpy: count {n} exceeds {}-unit buffer",
        dest.len()
    );
    let len = wcslen(src).min(n);
    dest[..len].copy_from_slice(&src[..len]);
    dest[len..n].fill(0);
}

/// Index of the last `c` in the string. Searching for NUL finds the
/// terminator, if the slice has one.
pub fn wcsrchr(s: &[WChar], c: WChar) -> Option<usize> {
    let len = wcslen(s);
    if c == 0 {
        return (len < s.len()).then_some(len);
    }
    s[..len].iter().rposition(|&x| x == c)
}

/// Unit-wise comparison of two wide strings.
pub fn wcscmp(a: &[WChar], b: &[WChar]) -> Ordering {
    a[..wcslen(a)].cmp(&b[..wcslen(b)])
}
