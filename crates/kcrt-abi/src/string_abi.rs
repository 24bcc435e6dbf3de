//! `<string.h>`/`<wchar.h>` entry points over raw pointers.
//!
//! Each entry measures its NUL-terminated inputs, forms slices of exactly
//! that extent and delegates to `kcrt_core::string`. Callers must pass
//! valid, NUL-terminated strings and destination buffers large enough for
//! the C contract of each function.

use std::ffi::c_char;
use std::slice;

use kcrt_core::string::{self as core_string, WChar};

/// Units before the first NUL at `s`, scanning at most `max`.
unsafe fn scan<T: Copy + PartialEq + Default>(s: *const T, max: usize) -> usize {
    let zero = T::default();
    let mut n = 0;
    // SAFETY: caller guarantees `s` is readable up to its terminator or `max`.
    while n < max && unsafe { *s.add(n) } != zero {
        n += 1;
    }
    n
}

#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn strlen(s: *const c_char) -> usize {
    // SAFETY: caller passes a NUL-terminated string.
    unsafe { scan(s.cast::<u8>(), usize::MAX) }
}

#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn strcpy(dest: *mut c_char, src: *const c_char) -> *mut c_char {
    // SAFETY: caller passes a NUL-terminated `src` and a `dest` large enough
    // to hold it; the regions do not overlap.
    unsafe {
        let len = scan(src.cast::<u8>(), usize::MAX);
        let src = slice::from_raw_parts(src.cast::<u8>(), len + 1);
        let out = slice::from_raw_parts_mut(dest.cast::<u8>(), len + 1);
        core_string::strcpy(out, src);
    }
    dest
}

#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn strncpy(dest: *mut c_char, src: *const c_char, n: usize) -> *mut c_char {
    // SAFETY: `src` is readable up to its terminator or `n` bytes, `dest` is
    // writable for `n` bytes, no overlap.
    unsafe {
        let len = scan(src.cast::<u8>(), n);
        let src = slice::from_raw_parts(src.cast::<u8>(), len);
        let out = slice::from_raw_parts_mut(dest.cast::<u8>(), n);
        core_string::strncpy(out, src, n);
    }
    dest
}

#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn wcslen(s: *const WChar) -> usize {
    // SAFETY: caller passes a NUL-terminated wide string.
    unsafe { scan(s, usize::MAX) }
}

#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn wcsncpy(dest: *mut WChar, src: *const WChar, n: usize) -> *mut WChar {
    // SAFETY: as for `strncpy`, in 16-bit units.
    unsafe {
        let len = scan(src, n);
        let src = slice::from_raw_parts(src, len);
        let out = slice::from_raw_parts_mut(dest, n);
        core_string::wcsncpy(out, src, n);
    }
    dest
}

#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn wcsrchr(s: *const WChar, c: WChar) -> *const WChar {
    // SAFETY: caller passes a NUL-terminated wide string; the slice includes
    // the terminator so searching for NUL finds it.
    unsafe {
        let len = scan(s, usize::MAX);
        let units = slice::from_raw_parts(s, len + 1);
        match core_string::wcsrchr(units, c) {
            Some(i) => s.add(i),
            None => std::ptr::null(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrow_entries() {
        let src = b"kernel\0";
        let mut buf = [0x55_u8; 10];
        unsafe {
            assert_eq!(strlen(src.as_ptr().cast()), 6);
            strcpy(buf.as_mut_ptr().cast(), src.as_ptr().cast());
            assert_eq!(&buf[..7], src);

            let mut padded = [0x55_u8; 6];
            strncpy(padded.as_mut_ptr().cast(), b"ab\0".as_ptr().cast(), 4);
            assert_eq!(padded, [b'a', b'b', 0, 0, 0x55, 0x55]);
        }
    }

    #[test]
    fn wide_entries() {
        let src: Vec<WChar> = "a.b.c".encode_utf16().chain([0]).collect();
        unsafe {
            assert_eq!(wcslen(src.as_ptr()), 5);
            let last = wcsrchr(src.as_ptr(), u16::from(b'.'));
            assert_eq!(last.offset_from(src.as_ptr()), 3);
            assert!(wcsrchr(src.as_ptr(), u16::from(b'z')).is_null());
            assert_eq!(wcsrchr(src.as_ptr(), 0).offset_from(src.as_ptr()), 5);

            let mut out = [0xFFFF_u16; 4];
            wcsncpy(out.as_mut_ptr(), src.as_ptr(), 3);
            assert_eq!(out, [0x61, 0x2E, 0x62, 0xFFFF]);
        }
    }
}
