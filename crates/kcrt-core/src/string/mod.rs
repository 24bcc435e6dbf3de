//! CRT string primitives over slices.
//!
//! A C string is modelled as a slice whose logical end is the first NUL
//! element; a slice without NUL is treated as ending at its last element.
//! `wchar_t` is 16 bits on the host, so wide strings are `u16` slices.

pub mod narrow;
pub mod wide;

pub use narrow::{strcpy, strlen, strncpy, strnlen};
pub use wide::{WChar, wcscmp, wcslen, wcsncpy, wcsrchr};
