//! Process-level startup and teardown. Kept in its own test binary because
//! shutdown closes the process exit table.

use kcrt_core::locale::builtin::Utf16Codecvt;
use kcrt_core::onexit::global_table;
use kcrt_core::{Locale, LocaleRegistry, runtime};

#[test]
fn shutdown_tears_down_process_registry_once() {
    runtime::initialize();
    let registry = LocaleRegistry::global();
    assert!(registry.is_initialized());

    let classic = Locale::classic();
    let codecvt = registry.use_facet::<Utf16Codecvt>(&classic);
    let weak = std::sync::Arc::downgrade(&codecvt);
    drop(codecvt);

    assert!(runtime::shutdown() >= 1);
    assert!(global_table().has_run());
    assert!(!registry.is_initialized());
    assert!(weak.upgrade().is_none());
    assert_eq!(classic.name(), "C", "outstanding handles stay valid");

    assert_eq!(runtime::shutdown(), 0);
}
