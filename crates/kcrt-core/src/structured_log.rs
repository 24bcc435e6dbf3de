//! Structured JSONL logging for runtime lifecycle events.
//!
//! Provides:
//! - [`LogEntry`]: one JSONL record with required + optional fields.
//! - [`LogEmitter`]: writes records to a file, stderr, or an in-memory buffer.
//! - A process-wide sink ([`install`], [`emit`]) gated by a level threshold.
//!
//! The sink configures itself from [`crate::config`] the first time anything
//! is emitted. With logging off (the default) [`emit`] costs one relaxed
//! atomic load.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::config::{RuntimeConfig, config};

// ---------------------------------------------------------------------------
// Log entry
// ---------------------------------------------------------------------------

/// Severity level for log entries, least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl LogLevel {
    const fn rank(self) -> u8 {
        self as u8 + 1
    }
}

/// Canonical structured log entry.
///
/// Required fields: `timestamp`, `trace_id`, `level`, `event`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    // Required
    pub timestamp: String,
    pub trace_id: String,
    pub level: LogLevel,
    pub event: String,

    // Optional
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    /// Locale name the event concerns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facet_id: Option<usize>,
    /// Thread-local slot index.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl LogEntry {
    /// Create an entry with required fields only. The trace id is assigned
    /// by the emitter.
    #[must_use]
    pub fn new(level: LogLevel, event: impl Into<String>) -> Self {
        Self {
            timestamp: now_utc(),
            trace_id: String::new(),
            level,
            event: event.into(),
            component: None,
            locale: None,
            facet_id: None,
            slot: None,
            message: None,
            details: None,
        }
    }

    #[must_use]
    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }

    #[must_use]
    pub fn with_locale(mut self, name: impl Into<String>) -> Self {
        self.locale = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_facet_id(mut self, id: usize) -> Self {
        self.facet_id = Some(id);
        self
    }

    #[must_use]
    pub fn with_slot(mut self, index: usize) -> Self {
        self.slot = Some(index);
        self
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Set free-form details.
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Serialize to a single JSONL line (no trailing newline).
    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Parse one JSONL line back into an entry.
pub fn parse_log_line(line: &str) -> Result<LogEntry, serde_json::Error> {
    serde_json::from_str(line)
}

// ---------------------------------------------------------------------------
// Log emitter
// ---------------------------------------------------------------------------

/// Cloneable in-memory writer, readable while an emitter owns a handle to it.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    /// Everything written so far, lossily decoded.
    #[must_use]
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.bytes.lock()).into_owned()
    }

    /// Parsed entries written so far; unparsable lines are skipped.
    #[must_use]
    pub fn entries(&self) -> Vec<LogEntry> {
        self.contents()
            .lines()
            .filter_map(|line| parse_log_line(line).ok())
            .collect()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Writes structured JSONL log entries to a destination.
pub struct LogEmitter {
    writer: Box<dyn Write + Send>,
    seq: u64,
    run_id: String,
}

impl LogEmitter {
    /// Create an emitter over any writer.
    #[must_use]
    pub fn to_writer(writer: Box<dyn Write + Send>, run_id: &str) -> Self {
        Self {
            writer,
            seq: 0,
            run_id: run_id.to_string(),
        }
    }

    /// Create an emitter that appends to a file.
    pub fn to_file(path: &Path, run_id: &str) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::to_writer(
            Box::new(io::LineWriter::new(file)),
            run_id,
        ))
    }

    /// Create an emitter that writes to stderr.
    #[must_use]
    pub fn to_stderr(run_id: &str) -> Self {
        Self::to_writer(Box::new(io::stderr()), run_id)
    }

    /// Create an emitter over a fresh in-memory buffer (for testing).
    #[must_use]
    pub fn to_buffer(run_id: &str) -> (Self, SharedBuffer) {
        let buffer = SharedBuffer::default();
        (Self::to_writer(Box::new(buffer.clone()), run_id), buffer)
    }

    fn next_trace_id(&mut self, component: Option<&str>) -> String {
        self.seq += 1;
        format!(
            "kcrt::{}::{}::{:06}",
            self.run_id,
            component.unwrap_or("core"),
            self.seq
        )
    }

    /// Emit a fully-populated entry, assigning a trace id if it has none.
    pub fn emit_entry(&mut self, mut entry: LogEntry) -> io::Result<()> {
        if entry.trace_id.is_empty() {
            entry.trace_id = self.next_trace_id(entry.component.as_deref());
        }
        let line = entry.to_jsonl().map_err(io::Error::other)?;
        writeln!(self.writer, "{line}")
    }

    /// Flush the underlying writer.
    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

// ---------------------------------------------------------------------------
// Process-wide sink
// ---------------------------------------------------------------------------

const THRESHOLD_UNCONFIGURED: u8 = u8::MAX;
const THRESHOLD_OFF: u8 = 0;

/// Encoded threshold: 0 = off, `level.rank()` otherwise.
static THRESHOLD: AtomicU8 = AtomicU8::new(THRESHOLD_UNCONFIGURED);
static SINK: Mutex<Option<LogEmitter>> = parking_lot::const_mutex(None);

fn encode(level: Option<LogLevel>) -> u8 {
    level.map_or(THRESHOLD_OFF, LogLevel::rank)
}

/// Install `emitter` as the process sink with the given threshold,
/// returning the previous emitter.
pub fn install(emitter: LogEmitter, threshold: Option<LogLevel>) -> Option<LogEmitter> {
    let mut sink = SINK.lock();
    let previous = sink.replace(emitter);
    THRESHOLD.store(encode(threshold), Ordering::Release);
    previous
}

/// Remove the process sink and turn logging off.
pub fn uninstall() -> Option<LogEmitter> {
    let mut sink = SINK.lock();
    THRESHOLD.store(THRESHOLD_OFF, Ordering::Release);
    sink.take()
}

/// Configure the sink from `cfg` unless something is already installed.
pub fn configure(cfg: &RuntimeConfig) {
    let mut sink = SINK.lock();
    if THRESHOLD.load(Ordering::Acquire) != THRESHOLD_UNCONFIGURED {
        return;
    }
    if cfg.log_level.is_some() && sink.is_none() {
        let emitter = cfg
            .log_file
            .as_deref()
            .and_then(|path| LogEmitter::to_file(path, "runtime").ok())
            .unwrap_or_else(|| LogEmitter::to_stderr("runtime"));
        *sink = Some(emitter);
    }
    THRESHOLD.store(encode(cfg.log_level), Ordering::Release);
}

/// Returns true if entries at `level` would be written.
#[must_use]
pub fn enabled(level: LogLevel) -> bool {
    let mut threshold = THRESHOLD.load(Ordering::Acquire);
    if threshold == THRESHOLD_UNCONFIGURED {
        configure(config());
        threshold = THRESHOLD.load(Ordering::Acquire);
    }
    threshold != THRESHOLD_OFF && level.rank() >= threshold
}

/// Write `entry` to the process sink if its level passes the threshold.
///
/// Write failures are dropped; logging never changes runtime behavior.
pub fn emit(entry: LogEntry) {
    if !enabled(entry.level) {
        return;
    }
    if let Some(emitter) = SINK.lock().as_mut() {
        let _ = emitter.emit_entry(entry);
    }
}

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

/// RFC 3339 UTC timestamp with millisecond precision.
fn now_utc() -> String {
    let duration = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    let secs = duration.as_secs();
    let (year, month, day) = civil_from_days((secs / 86_400) as i64);
    format!(
        "{year:04}-{month:02}-{day:02}T{:02}:{:02}:{:02}.{:03}Z",
        (secs % 86_400) / 3600,
        (secs % 3600) / 60,
        secs % 60,
        duration.subsec_millis(),
    )
}

/// Days since 1970-01-01 to a proleptic Gregorian date.
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_entry_serializes_required_fields() {
        let entry = LogEntry::new(LogLevel::Info, "locale.init");
        let json = entry.to_jsonl().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(parsed["timestamp"].is_string());
        assert_eq!(parsed["level"], "info");
        assert_eq!(parsed["event"], "locale.init");
        assert!(parsed.get("component").is_none());
        assert!(parsed.get("slot").is_none());
    }

    #[test]
    fn optional_fields_round_trip() {
        let entry = LogEntry::new(LogLevel::Debug, "facet.register")
            .with_component("locale")
            .with_locale("C")
            .with_facet_id(3)
            .with_details(serde_json::json!({ "registered": 5 }));
        let parsed = parse_log_line(&entry.to_jsonl().unwrap()).unwrap();
        assert_eq!(parsed, entry);
    }

    #[test]
    fn emitter_assigns_sequential_trace_ids() {
        let (mut emitter, buffer) = LogEmitter::to_buffer("t1");
        emitter
            .emit_entry(LogEntry::new(LogLevel::Info, "a").with_component("tls"))
            .unwrap();
        emitter.emit_entry(LogEntry::new(LogLevel::Info, "b")).unwrap();

        let entries = buffer.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].trace_id, "kcrt::t1::tls::000001");
        assert_eq!(entries[1].trace_id, "kcrt::t1::core::000002");
    }

    #[test]
    fn emitter_keeps_explicit_trace_id() {
        let (mut emitter, buffer) = LogEmitter::to_buffer("t2");
        let mut entry = LogEntry::new(LogLevel::Warn, "x");
        entry.trace_id = "fixed".to_string();
        emitter.emit_entry(entry).unwrap();
        assert_eq!(buffer.entries()[0].trace_id, "fixed");
    }

    #[test]
    fn process_sink_filters_by_threshold() {
        let (emitter, buffer) = LogEmitter::to_buffer("sink");
        install(emitter, Some(LogLevel::Warn));
        assert!(enabled(LogLevel::Error));
        assert!(!enabled(LogLevel::Info));

        emit(LogEntry::new(LogLevel::Info, "sink.test.quiet"));
        emit(LogEntry::new(LogLevel::Error, "sink.test.loud").with_component("test"));
        uninstall();
        assert!(!enabled(LogLevel::Fatal));

        let events: Vec<String> = buffer
            .entries()
            .into_iter()
            .map(|e| e.event)
            .filter(|e| e.starts_with("sink.test."))
            .collect();
        assert_eq!(events, vec!["sink.test.loud".to_string()]);
    }

    #[test]
    fn levels_are_ordered() {
        assert!(LogLevel::Trace < LogLevel::Debug);
        assert!(LogLevel::Warn < LogLevel::Error);
        assert!(LogLevel::Error < LogLevel::Fatal);
    }

    #[test]
    fn civil_dates() {
        assert_eq!(civil_from_days(0), (1970, 1, 1));
        assert_eq!(civil_from_days(31), (1970, 2, 1));
        assert_eq!(civil_from_days(11_016), (2000, 2, 29));
        assert_eq!(civil_from_days(19_723), (2024, 1, 1));
    }

    #[test]
    fn timestamp_shape() {
        let ts = now_utc();
        assert_eq!(ts.len(), "2024-01-01T00:00:00.000Z".len());
        assert!(ts.ends_with('Z'));
        assert_eq!(&ts[4..5], "-");
        assert_eq!(&ts[10..11], "T");
    }
}
