// Every extern "C" entry takes raw pointers from C callers and documents its
// contract once at module level.
#![allow(clippy::missing_safety_doc)]
//! # kcrt-abi
//!
//! `extern "C"` boundary of the kcrt runtime.
//!
//! ```text
//! C/C++ caller -> ABI entry (this crate) -> kcrt-core -> return
//! ```
//!
//! Symbols are exported unmangled only in release builds so debug test
//! binaries keep linking against the host libc.

pub mod locale_abi;
pub mod startup_abi;
pub mod string_abi;
