//! Unit tests for log.rs
//!
//! Tests LogSeverity, LogEntry, the global logger slot and the severity filter.

use crate::log::{self, Logger, LogEntry, LogSeverity, DefaultLogger};
use serial_test::serial;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

struct CaptureLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl CaptureLogger {
    fn new() -> (Self, Arc<Mutex<Vec<LogEntry>>>) {
        let entries = Arc::new(Mutex::new(Vec::new()));
        (Self { entries: entries.clone() }, entries)
    }
}

impl Logger for CaptureLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

// ============================================================================
// LOG SEVERITY TESTS
// ============================================================================

#[test]
fn test_log_severity_ordering() {
    assert!(LogSeverity::Trace < LogSeverity::Debug);
    assert!(LogSeverity::Debug < LogSeverity::Info);
    assert!(LogSeverity::Info < LogSeverity::Warn);
    assert!(LogSeverity::Warn < LogSeverity::Error);
}

#[test]
fn test_log_severity_parse() {
    assert_eq!("trace".parse::<LogSeverity>(), Ok(LogSeverity::Trace));
    assert_eq!(" Debug ".parse::<LogSeverity>(), Ok(LogSeverity::Debug));
    assert_eq!("INFO".parse::<LogSeverity>(), Ok(LogSeverity::Info));
    assert_eq!("warning".parse::<LogSeverity>(), Ok(LogSeverity::Warn));
    assert_eq!("error".parse::<LogSeverity>(), Ok(LogSeverity::Error));
    assert!("loud".parse::<LogSeverity>().is_err());
}

#[test]
fn test_log_severity_display() {
    assert_eq!(LogSeverity::Warn.to_string(), "WARN");
    assert_eq!(LogSeverity::Error.to_string(), "ERROR");
}

// ============================================================================
// LOG ENTRY TESTS
// ============================================================================

#[test]
fn test_default_logger_prints_both_formats() {
    let logger = DefaultLogger;
    logger.log(&LogEntry {
        severity: LogSeverity::Info,
        timestamp: SystemTime::now(),
        source: "cadence::test".to_string(),
        message: "plain".to_string(),
        file: None,
        line: None,
    });
    logger.log(&LogEntry {
        severity: LogSeverity::Error,
        timestamp: SystemTime::now(),
        source: "cadence::test".to_string(),
        message: "detailed".to_string(),
        file: Some("scheduler.rs"),
        line: Some(12),
    });
}

// ============================================================================
// GLOBAL LOGGER TESTS
// ============================================================================

#[test]
#[serial]
fn test_macros_route_to_custom_logger() {
    let (logger, entries) = CaptureLogger::new();
    log::set_logger(logger);

    crate::cadence_trace!("cadence::test", "t {}", 1);
    crate::cadence_debug!("cadence::test", "d");
    crate::cadence_info!("cadence::test", "i");
    crate::cadence_warn!("cadence::test", "w");
    crate::cadence_error!("cadence::test", "e {}", "x");

    let entries = entries.lock().unwrap();
    let severities: Vec<LogSeverity> = entries.iter().map(|e| e.severity).collect();
    assert_eq!(
        severities,
        vec![
            LogSeverity::Trace,
            LogSeverity::Debug,
            LogSeverity::Info,
            LogSeverity::Warn,
            LogSeverity::Error,
        ]
    );
    assert_eq!(entries[0].message, "t 1");
    assert!(entries[3].file.is_none());
    assert!(entries[4].file.is_some());
    assert_eq!(entries[4].message, "e x");
    drop(entries);

    log::reset_logger();
}

#[test]
#[serial]
fn test_min_severity_filters_entries() {
    let (logger, entries) = CaptureLogger::new();
    log::set_logger(logger);
    log::set_min_severity(LogSeverity::Warn);
    assert_eq!(log::min_severity(), LogSeverity::Warn);

    crate::cadence_debug!("cadence::test", "hidden");
    crate::cadence_info!("cadence::test", "hidden");
    crate::cadence_warn!("cadence::test", "shown");
    crate::cadence_error!("cadence::test", "shown");

    assert_eq!(entries.lock().unwrap().len(), 2);

    log::reset_logger();
    assert_eq!(log::min_severity(), LogSeverity::Trace);
}

#[test]
#[serial]
fn test_reset_logger_detaches_custom_logger() {
    let (logger, entries) = CaptureLogger::new();
    log::set_logger(logger);
    log::reset_logger();

    crate::cadence_info!("cadence::test", "goes to stdout");
    assert!(entries.lock().unwrap().is_empty());
}
