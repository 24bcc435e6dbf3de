//! `strlen`, `strnlen`, `strcpy`, `strncpy`.

/// Bytes before the first NUL, or the slice length if there is none.
#[inline]
pub fn strlen(s: &[u8]) -> usize {
    s.iter().position(|&b| b == 0).unwrap_or(s.len())
}

/// [`strlen`] bounded by `max`.
#[inline]
pub fn strnlen(s: &[u8], max: usize) -> usize {
    strlen(&s[..s.len().min(max)])
}

/// Copy the string in `src` and its terminator into `dest`.
///
/// Returns the number of bytes written, terminator included.
///
/// # Panics
///
/// If `dest` cannot hold the string plus its terminator.
pub fn strcpy(dest: &mut [u8], src: &[u8]) -> usize {
    let len = strlen(src);
    assert!(
        len < dest.len(),
        "strcpy: {len}-byte string does not fit a {}-byte buffer",
        dest.len()
    );
    dest[..len].copy_from_slice(&src[..len]);
    dest[len] = 0;
    len + 1
}

/// Copy at most `n` bytes of `src` into `dest`, NUL-padding the rest of the
/// first `n` bytes. `dest` is left unterminated when `src` has `n` or more
/// bytes.
///
/// # Panics
///
/// If `dest` is shorter than `n`.
pub fn strncpy(dest: &mut [u8], src: &[u8], n: usize) {
    assert!(
        n <= dest.len(),
        "strncpy: count {n} exceeds {}-byte buffer",
        dest.len()
    );
    let len = strnlen(src, n);
    let (head, tail) = dest[..n].split_at_mut(len);
    head.copy_from_slice(&src[..len]);
    tail.fill(0);
}
