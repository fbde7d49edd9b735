//! Unit tests for error.rs
//!
//! Tests Error variants, Display output, fatality classification and the error macros.

use crate::error::{Error, Result};
use crate::log::{self, Logger, LogEntry, LogSeverity};
use serial_test::serial;
use std::sync::{Arc, Mutex};

// ============================================================================
// ERROR DISPLAY TESTS
// ============================================================================

#[test]
fn test_backend_creation_failed_display() {
    let err = Error::BackendCreationFailed("no adapter".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Backend creation failed"));
    assert!(display.contains("no adapter"));
}

#[test]
fn test_zero_size_surface_display() {
    assert_eq!(format!("{}", Error::ZeroSizeSurface), "Surface has zero size");
}

#[test]
fn test_invalid_state_display() {
    let err = Error::InvalidState("compute pass after graphics pass".to_string());
    let display = format!("{}", err);
    assert!(display.starts_with("Invalid state"));
    assert!(display.contains("compute pass after graphics pass"));
}

#[test]
fn test_device_lost_display() {
    assert_eq!(format!("{}", Error::DeviceLost), "Device lost");
}

// ============================================================================
// ERROR CLASSIFICATION
// ============================================================================

#[test]
fn test_fatal_errors() {
    assert!(Error::BackendCreationFailed("x".to_string()).is_fatal());
    assert!(Error::DeviceLost.is_fatal());
}

#[test]
fn test_recoverable_errors() {
    assert!(!Error::SwapchainAcquisitionFailed("x".to_string()).is_fatal());
    assert!(!Error::ZeroSizeSurface.is_fatal());
    assert!(!Error::ResourceCreationFailed("x".to_string()).is_fatal());
    assert!(!Error::ShaderCompileFailed("x".to_string()).is_fatal());
    assert!(!Error::ResourceUnavailable("x".to_string()).is_fatal());
    assert!(!Error::InvalidState("x".to_string()).is_fatal());
}

// ============================================================================
// ERROR TRAIT IMPLEMENTATIONS
// ============================================================================

#[test]
fn test_error_is_std_error() {
    let err = Error::ZeroSizeSurface;
    let _: &dyn std::error::Error = &err;
}

#[test]
fn test_error_clone_and_eq() {
    let err = Error::InvalidResource("buffer 3".to_string());
    assert_eq!(err.clone(), err);
    assert_ne!(err, Error::InvalidResource("buffer 4".to_string()));
}

#[test]
fn test_result_question_mark_propagation() {
    fn inner() -> Result<u32> {
        Err(Error::ShaderCompileFailed("empty module".to_string()))
    }
    fn outer() -> Result<u32> {
        let value = inner()?;
        Ok(value + 1)
    }
    assert_eq!(outer(), Err(Error::ShaderCompileFailed("empty module".to_string())));
}

// ============================================================================
// ERROR MACROS
// ============================================================================

struct CaptureLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl Logger for CaptureLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

#[test]
#[serial]
fn test_err_macro_logs_with_location() {
    let entries = Arc::new(Mutex::new(Vec::new()));
    log::set_logger(CaptureLogger { entries: entries.clone() });

    let err = crate::cadence_err!("cadence::test", "submit failed: {}", 42);
    assert_eq!(err, Error::BackendError("submit failed: 42".to_string()));

    let entries = entries.lock().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].severity, LogSeverity::Error);
    assert_eq!(entries[0].source, "cadence::test");
    assert!(entries[0].file.is_some());
    assert!(entries[0].line.is_some());
    drop(entries);

    log::reset_logger();
}

#[test]
#[serial]
fn test_bail_macro_returns_early() {
    let entries = Arc::new(Mutex::new(Vec::new()));
    log::set_logger(CaptureLogger { entries: entries.clone() });

    fn guarded(fail: bool) -> Result<&'static str> {
        if fail {
            crate::cadence_bail!("cadence::test", "refusing");
        }
        Ok("ran")
    }

    assert_eq!(guarded(false), Ok("ran"));
    assert_eq!(guarded(true), Err(Error::BackendError("refusing".to_string())));
    assert_eq!(entries.lock().unwrap().len(), 1);

    log::reset_logger();
}
