//! Integration tests for the locale handle ABI.

use std::ffi::{CStr, c_char};

use kcrt_abi::locale_abi::{
    KcrtLocale, kcrt_locale_addref, kcrt_locale_classic, kcrt_locale_empty, kcrt_locale_global,
    kcrt_locale_has_category, kcrt_locale_is_transparent, kcrt_locale_name, kcrt_locale_release, kcrt_locale_same,
    kcrt_locale_set_global,
};
use kcrt_abi::startup_abi::kcrt_initialize;
use kcrt_core::Locale;
use kcrt_core::locale::{LC_ALL, LC_COLLATE, LC_CTYPE, LC_TIME};

fn name_of(handle: KcrtLocale) -> String {
    let mut buf = [0 as c_char; 16];
    let len = unsafe { kcrt_locale_name(handle, buf.as_mut_ptr(), buf.len()) };
    let name = unsafe { CStr::from_ptr(buf.as_ptr()) }
        .to_string_lossy()
        .into_owned();
    assert_eq!(name.len(), len.min(buf.len() - 1));
    name
}

#[test]
fn classic_handle_is_shared_and_named_c() {
    kcrt_initialize();
    let a = kcrt_locale_classic();
    let b = kcrt_locale_classic();
    assert!(!a.is_null());
    assert_eq!(kcrt_locale_same(a, b), 1);
    assert_eq!(name_of(a), "C");
    assert_eq!(unsafe { kcrt_locale_is_transparent(a) }, 0);
    unsafe {
        kcrt_locale_release(a);
        kcrt_locale_release(b);
    }
}

#[test]
fn empty_handles_are_distinct_and_transparent() {
    let a = kcrt_locale_empty();
    let b = kcrt_locale_empty();
    assert_eq!(kcrt_locale_same(a, b), 0);
    assert_eq!(unsafe { kcrt_locale_is_transparent(a) }, 1);
    assert_eq!(name_of(a), "*");
    unsafe {
        kcrt_locale_release(a);
        kcrt_locale_release(b);
    }
}

#[test]
fn addref_and_release_balance() {
    let probe = unsafe { Locale::from_raw(kcrt_locale_empty()) };
    let handle = probe.clone().into_raw();
    assert_eq!(probe.ref_count(), 2);
    unsafe { kcrt_locale_addref(handle) };
    assert_eq!(probe.ref_count(), 3);
    unsafe {
        kcrt_locale_release(handle);
        kcrt_locale_release(handle);
    }
    assert_eq!(probe.ref_count(), 1);
}

#[test]
fn name_truncates_to_buffer() {
    let handle = kcrt_locale_classic();
    let mut buf = [0x7f as c_char; 1];
    let len = unsafe { kcrt_locale_name(handle, buf.as_mut_ptr(), buf.len()) };
    assert_eq!(len, 1);
    assert_eq!(buf[0], 0);
    assert_eq!(unsafe { kcrt_locale_name(handle, std::ptr::null_mut(), 0) }, 1);
    unsafe { kcrt_locale_release(handle) };
}

#[test]
fn null_handles_are_tolerated() {
    unsafe {
        kcrt_locale_release(std::ptr::null());
        kcrt_locale_addref(std::ptr::null());
        assert_eq!(kcrt_locale_is_transparent(std::ptr::null()), 0);
        assert!(kcrt_locale_set_global(std::ptr::null()).is_null());
        let mut buf = [0x7f as c_char; 4];
        assert_eq!(kcrt_locale_name(std::ptr::null(), buf.as_mut_ptr(), 4), 0);
        assert_eq!(buf[0], 0);
    }
    assert_eq!(kcrt_locale_same(std::ptr::null(), std::ptr::null()), 0);
}

#[test]
fn set_global_round_trip() {
    let original = kcrt_locale_global();
    let replacement = Locale::classic()
        .with_facet(kcrt_core::locale::builtin::Collate)
        .into_raw();

    let previous = unsafe { kcrt_locale_set_global(replacement) };
    let now = kcrt_locale_global();
    assert_eq!(kcrt_locale_same(now, replacement), 1);

    let back = unsafe { kcrt_locale_set_global(previous) };
    assert_eq!(kcrt_locale_same(back, replacement), 1);
    let restored = kcrt_locale_global();
    assert_eq!(kcrt_locale_same(restored, previous), 1);
    assert_eq!(name_of(restored), name_of(original));

    unsafe {
        for h in [original, replacement, previous, now, back, restored] {
            kcrt_locale_release(h);
        }
    }
}

#[test]
fn category_queries_follow_lc_numbers() {
    let classic = kcrt_locale_classic();
    let empty = kcrt_locale_empty();
    unsafe {
        for category in [LC_ALL, LC_COLLATE, LC_CTYPE, LC_TIME] {
            assert_eq!(kcrt_locale_has_category(classic, category), 1);
            assert_eq!(kcrt_locale_has_category(empty, category), 0);
        }
        assert_eq!(kcrt_locale_has_category(classic, LC_TIME + 1), -1);
        assert_eq!(kcrt_locale_has_category(classic, -1), -1);
        assert_eq!(kcrt_locale_has_category(std::ptr::null(), LC_CTYPE), 0);
        kcrt_locale_release(classic);
        kcrt_locale_release(empty);
    }
}
