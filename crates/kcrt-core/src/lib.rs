//! # kcrt-core
//!
//! Runtime core of the kcrt kernel-mode C/C++ runtime.
//!
//! This crate provides the parts of a hosted C++ runtime that carry real
//! lifecycle and concurrency invariants when the host offers no user-mode
//! OS services:
//!
//! - **Locale registry** (`locale`): the process-wide classic/global locale,
//!   lazily built under a lock and read lock-free afterwards.
//! - **Lazy facet registry** (`locale::FacetRegistry`): facets surfaced on
//!   demand, kept until library teardown.
//! - **Thread-local slots** (`tls`): typed per-thread storage on top of a
//!   managed slot table.
//! - **Exit table** (`onexit`) and **runtime lifecycle** (`runtime`).
//! - **Configuration** (`config`), **structured logging**
//!   (`structured_log`), **metrics** (`metrics`) and fatal error reporting
//!   (`error`, `fatal`).
//! - CRT string primitives (`string`).
//!
//! `unsafe` is denied at the crate level; the thread-local module and the raw
//! handle conversions of [`Locale`] opt in.

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod fatal;
pub mod locale;
pub mod metrics;
pub mod onexit;
pub mod runtime;
pub mod string;
pub mod structured_log;
pub mod tls;

pub use config::RuntimeConfig;
pub use error::{Result, RuntimeError};
pub use locale::{
    Category, Facet, FacetId, FacetRef, FacetRegistry, LazyFacet, Locale, LocaleRegistry,
};
pub use metrics::RuntimeMetrics;
pub use onexit::OnExitTable;
pub use tls::ThreadLocal;
