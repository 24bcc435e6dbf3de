//! Runtime configuration.
//!
//! Read once from the environment on first use and cached thereafter:
//! - `KCRT_TLS_SLOTS`: number of thread-local slot indices the slot table
//!   hands out. Defaults to `TLS_MINIMUM_AVAILABLE + TLS_EXPANSION_SLOTS`
//!   (1088). Values of 0 or garbage fall back to the default.
//! - `KCRT_LOG_LEVEL`: `off` (default), `fatal`, `error`, `warn`, `info`,
//!   `debug`, `trace`. Anything unrecognised means `off`.
//! - `KCRT_LOG_FILE`: path of a JSONL file for structured log output. When
//!   logging is enabled without a file, entries go to stderr.

use std::path::PathBuf;
use std::sync::OnceLock;

use crate::structured_log::LogLevel;
use crate::tls::{TLS_EXPANSION_SLOTS, TLS_MINIMUM_AVAILABLE};

/// Environment variable naming the thread-local slot capacity.
pub const ENV_TLS_SLOTS: &str = "KCRT_TLS_SLOTS";
/// Environment variable naming the structured log threshold.
pub const ENV_LOG_LEVEL: &str = "KCRT_LOG_LEVEL";
/// Environment variable naming the structured log file.
pub const ENV_LOG_FILE: &str = "KCRT_LOG_FILE";

/// Default thread-local slot capacity.
pub const DEFAULT_TLS_SLOT_LIMIT: usize = TLS_MINIMUM_AVAILABLE + TLS_EXPANSION_SLOTS;

/// Process-wide runtime settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Maximum number of live thread-local slots.
    pub tls_slot_limit: usize,
    /// Minimum level written to the log sink; `None` disables logging.
    pub log_level: Option<LogLevel>,
    /// Destination file for structured logs.
    pub log_file: Option<PathBuf>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            tls_slot_limit: DEFAULT_TLS_SLOT_LIMIT,
            log_level: None,
            log_file: None,
        }
    }
}

impl RuntimeConfig {
    /// Build a configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let tls_slot_limit = lookup(ENV_TLS_SLOTS)
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|&n| n > 0)
            .unwrap_or(DEFAULT_TLS_SLOT_LIMIT);
        let log_level = lookup(ENV_LOG_LEVEL).and_then(|v| parse_log_level(&v));
        let log_file = lookup(ENV_LOG_FILE)
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        Self {
            tls_slot_limit,
            log_level,
            log_file,
        }
    }
}

/// Parse a log threshold (case-insensitive). `None` means logging is off.
#[must_use]
pub fn parse_log_level(s: &str) -> Option<LogLevel> {
    match s.trim().to_ascii_lowercase().as_str() {
        "trace" => Some(LogLevel::Trace),
        "debug" => Some(LogLevel::Debug),
        "info" => Some(LogLevel::Info),
        "warn" | "warning" => Some(LogLevel::Warn),
        "error" => Some(LogLevel::Error),
        "fatal" => Some(LogLevel::Fatal),
        _ => None,
    }
}

static GLOBAL_CONFIG: OnceLock<RuntimeConfig> = OnceLock::new();

/// Get the process configuration (reads the environment on first call).
#[must_use]
pub fn config() -> &'static RuntimeConfig {
    GLOBAL_CONFIG.get_or_init(RuntimeConfig::from_env)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = RuntimeConfig::from_lookup(|_| None);
        assert_eq!(cfg, RuntimeConfig::default());
        assert_eq!(cfg.tls_slot_limit, 1088);
        assert!(cfg.log_level.is_none());
    }

    #[test]
    fn parses_all_fields() {
        let cfg = RuntimeConfig::from_lookup(lookup_from(&[
            (ENV_TLS_SLOTS, " 128 "),
            (ENV_LOG_LEVEL, "DEBUG"),
            (ENV_LOG_FILE, "/tmp/kcrt.jsonl"),
        ]));
        assert_eq!(cfg.tls_slot_limit, 128);
        assert_eq!(cfg.log_level, Some(LogLevel::Debug));
        assert_eq!(cfg.log_file, Some(PathBuf::from("/tmp/kcrt.jsonl")));
    }

    #[test]
    fn bad_slot_counts_fall_back() {
        for bad in ["0", "-3", "many", ""] {
            let cfg = RuntimeConfig::from_lookup(lookup_from(&[(ENV_TLS_SLOTS, bad)]));
            assert_eq!(cfg.tls_slot_limit, DEFAULT_TLS_SLOT_LIMIT, "input {bad:?}");
        }
    }

    #[test]
    fn parse_log_levels() {
        assert_eq!(parse_log_level("trace"), Some(LogLevel::Trace));
        assert_eq!(parse_log_level("Warning"), Some(LogLevel::Warn));
        assert_eq!(parse_log_level("fatal"), Some(LogLevel::Fatal));
        assert_eq!(parse_log_level("off"), None);
        assert_eq!(parse_log_level("loud"), None);
    }

    #[test]
    fn blank_log_file_is_ignored() {
        let cfg = RuntimeConfig::from_lookup(lookup_from(&[(ENV_LOG_FILE, "  ")]));
        assert!(cfg.log_file.is_none());
    }
}
