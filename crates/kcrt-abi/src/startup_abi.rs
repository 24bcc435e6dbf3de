//! Host entry and unload hooks.

use std::ffi::c_int;

use kcrt_core::runtime;

/// Start the runtime. Returns 1 on the first call, 0 if already started.
#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub extern "C" fn kcrt_initialize() -> c_int {
    c_int::from(runtime::initialize())
}

/// Run library teardown. Only the first call does any work; returns the
/// number of teardown handlers executed.
#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub extern "C" fn kcrt_uninitialize() -> c_int {
    c_int::try_from(runtime::shutdown()).unwrap_or(c_int::MAX)
}
