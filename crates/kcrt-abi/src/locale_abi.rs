//! Opaque locale handles.
//!
//! Every handle returned here owns one reference and must be released with
//! [`kcrt_locale_release`] (or consumed by another call that says so).
//! Null is accepted wherever a handle is expected and treated as "no
//! locale".

use std::ffi::{c_char, c_int};
use std::mem::ManuallyDrop;

use kcrt_core::locale::LocaleImpl;
use kcrt_core::{Category, Locale};

/// Opaque locale handle as seen from C.
pub type KcrtLocale = *const LocaleImpl;

/// Borrow the locale behind `handle` without touching its count.
unsafe fn with_locale<R>(handle: KcrtLocale, f: impl FnOnce(&Locale) -> R) -> Option<R> {
    if handle.is_null() {
        return None;
    }
    // SAFETY: caller passes a handle from this module that still owns its
    // reference; ManuallyDrop keeps that reference with the caller.
    let locale = ManuallyDrop::new(unsafe { Locale::from_raw(handle) });
    Some(f(&locale))
}

/// The classic `"C"` locale.
#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub extern "C" fn kcrt_locale_classic() -> KcrtLocale {
    Locale::classic().into_raw()
}

/// The current global locale, initializing the registry if needed.
#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub extern "C" fn kcrt_locale_global() -> KcrtLocale {
    Locale::global().into_raw()
}

/// A new transparent locale.
#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub extern "C" fn kcrt_locale_empty() -> KcrtLocale {
    Locale::empty().into_raw()
}

/// Make `handle` the global locale and return the previous global.
///
/// `handle` is borrowed. Null leaves the global locale unchanged and
/// returns null.
#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn kcrt_locale_set_global(handle: KcrtLocale) -> KcrtLocale {
    // SAFETY: forwarded caller contract.
    unsafe { with_locale(handle, |locale| Locale::set_global(locale).into_raw()) }
        .unwrap_or(std::ptr::null())
}

/// Take one more reference to `handle`.
#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn kcrt_locale_addref(handle: KcrtLocale) {
    if handle.is_null() {
        return;
    }
    // SAFETY: caller passes a live handle from this module.
    unsafe { Locale::increment_raw(handle) }
}

/// Drop one reference to `handle`. The locale is freed with its last
/// reference.
#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn kcrt_locale_release(handle: KcrtLocale) {
    if handle.is_null() {
        return;
    }
    // SAFETY: caller gives up the reference owned by `handle`.
    drop(unsafe { Locale::from_raw(handle) });
}

/// Copy the locale name into `buf` (NUL-terminated, truncated to `len - 1`
/// bytes). Returns the full name length, excluding the terminator; a null
/// handle yields 0 and an empty string.
#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn kcrt_locale_name(
    handle: KcrtLocale,
    buf: *mut c_char,
    len: usize,
) -> usize {
    // SAFETY: forwarded caller contract.
    let name = unsafe { with_locale(handle, |locale| locale.name().to_owned()) }.unwrap_or_default();
    if !buf.is_null() && len > 0 {
        let copy = name.len().min(len - 1);
        // SAFETY: caller guarantees `buf` is writable for `len` bytes and
        // `copy < len`.
        unsafe {
            std::ptr::copy_nonoverlapping(name.as_ptr(), buf.cast::<u8>(), copy);
            *buf.add(copy) = 0;
        }
    }
    name.len()
}

/// 1 if `handle` is a transparent locale, 0 otherwise (including null).
#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn kcrt_locale_is_transparent(handle: KcrtLocale) -> c_int {
    // SAFETY: forwarded caller contract.
    let transparent = unsafe { with_locale(handle, Locale::is_transparent) }.unwrap_or(false);
    c_int::from(transparent)
}

/// 1 if `handle` carries the `LC_*` `category`, 0 if it does not (or is
/// null), -1 if `category` is not a known category number.
#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn kcrt_locale_has_category(handle: KcrtLocale, category: c_int) -> c_int {
    let Some(mask) = Category::from_lc(category) else {
        return -1;
    };
    // SAFETY: forwarded caller contract.
    let covered = unsafe { with_locale(handle, |locale| locale.covers(mask)) }.unwrap_or(false);
    c_int::from(covered)
}

/// 1 if both handles name the same locale object, 0 otherwise.
#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub extern "C" fn kcrt_locale_same(a: KcrtLocale, b: KcrtLocale) -> c_int {
    c_int::from(!a.is_null() && std::ptr::eq(a, b))
}
