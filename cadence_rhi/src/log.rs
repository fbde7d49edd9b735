//! Logging for Cadence
//!
//! Every entry goes through one process-wide `Logger` (colored console output
//! unless replaced with `set_logger`). Entries carry a severity, a source string
//! such as `"cadence::FrameScheduler"` and, for errors, the file:line that
//! raised them. `set_min_severity` filters before the logger is reached.
//!
//! The logger slot is the only global state of the crate.

use colored::*;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{OnceLock, RwLock};
use std::time::SystemTime;
use chrono::{DateTime, Local};

/// Installed logger, `DefaultLogger` until replaced
static LOGGER: OnceLock<RwLock<Box<dyn Logger>>> = OnceLock::new();

/// Global minimum severity, stored as `LogSeverity as u8`
static MIN_SEVERITY: AtomicU8 = AtomicU8::new(LogSeverity::Trace as u8);

/// Destination of log entries
///
/// Implement it to send entries to a file or capture them in tests.
///
/// # Example
///
/// ```no_run
/// use cadence_rhi::cadence::log::{Logger, LogEntry};
///
/// struct FileLogger {
///     file: std::fs::File,
/// }
///
/// impl Logger for FileLogger {
///     fn log(&self, entry: &LogEntry) {
///         // Write to file...
///     }
/// }
/// ```
pub trait Logger: Send + Sync {
    fn log(&self, entry: &LogEntry);
}

/// One log message with its metadata
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub severity: LogSeverity,
    pub timestamp: SystemTime,
    /// Emitting component, e.g. "cadence::FrameScheduler" or "cadence::headless"
    pub source: String,
    pub message: String,
    /// Location of the call site, set by `cadence_error!` only
    pub file: Option<&'static str>,
    pub line: Option<u32>,
}

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogSeverity {
    /// Very verbose information (per-draw, per-record)
    Trace,

    /// Development information (per-frame)
    Debug,

    /// Lifecycle events (backend created, swapchain resized)
    Info,

    /// Recoverable problems (skipped frames, failed lazy setup)
    Warn,

    /// Errors, reported with file:line details
    Error,
}

impl LogSeverity {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => LogSeverity::Trace,
            1 => LogSeverity::Debug,
            2 => LogSeverity::Info,
            3 => LogSeverity::Warn,
            _ => LogSeverity::Error,
        }
    }
}

impl fmt::Display for LogSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogSeverity::Trace => "TRACE",
            LogSeverity::Debug => "DEBUG",
            LogSeverity::Info => "INFO",
            LogSeverity::Warn => "WARN",
            LogSeverity::Error => "ERROR",
        };
        f.write_str(name)
    }
}

impl FromStr for LogSeverity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(LogSeverity::Trace),
            "debug" => Ok(LogSeverity::Debug),
            "info" => Ok(LogSeverity::Info),
            "warn" | "warning" => Ok(LogSeverity::Warn),
            "error" => Ok(LogSeverity::Error),
            other => Err(format!("unknown log severity '{}'", other)),
        }
    }
}

/// Colored console logger
///
/// `[2024-01-01 12:00:00.000] [WARN ] [cadence::FrameScheduler] message`, with
/// ` (file:line)` appended when the entry has a location. Warnings and errors
/// go to stderr, everything else to stdout.
pub struct DefaultLogger;

impl DefaultLogger {
    fn label(severity: LogSeverity) -> ColoredString {
        match severity {
            LogSeverity::Trace => "TRACE".dimmed(),
            LogSeverity::Debug => "DEBUG".cyan(),
            LogSeverity::Info => "INFO ".green(),
            LogSeverity::Warn => "WARN ".yellow(),
            LogSeverity::Error => "ERROR".red().bold(),
        }
    }
}

impl Logger for DefaultLogger {
    fn log(&self, entry: &LogEntry) {
        let local: DateTime<Local> = entry.timestamp.into();
        let mut line = format!(
            "[{}] [{}] [{}] {}",
            local.format("%Y-%m-%d %H:%M:%S%.3f"),
            Self::label(entry.severity),
            entry.source.blue(),
            entry.message
        );
        if let (Some(file), Some(number)) = (entry.file, entry.line) {
            line.push_str(&format!(" ({}:{})", file, number));
        }

        if entry.severity >= LogSeverity::Warn {
            eprintln!("{}", line);
        } else {
            println!("{}", line);
        }
    }
}

// ===== GLOBAL LOGGER ACCESS =====

fn logger_slot() -> &'static RwLock<Box<dyn Logger>> {
    LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)))
}

/// Replace the global logger
pub fn set_logger<L: Logger + 'static>(logger: L) {
    if let Ok(mut lock) = logger_slot().write() {
        *lock = Box::new(logger);
    }
}

/// Reset the global logger to DefaultLogger and clear the severity filter
pub fn reset_logger() {
    if let Ok(mut lock) = logger_slot().write() {
        *lock = Box::new(DefaultLogger);
    }
    set_min_severity(LogSeverity::Trace);
}

/// Drop every entry below `severity`
pub fn set_min_severity(severity: LogSeverity) {
    MIN_SEVERITY.store(severity as u8, Ordering::Relaxed);
}

/// Current minimum severity
pub fn min_severity() -> LogSeverity {
    LogSeverity::from_u8(MIN_SEVERITY.load(Ordering::Relaxed))
}

/// Log without file:line (used by the cadence_* macros)
pub fn log(severity: LogSeverity, source: &str, message: String) {
    dispatch(severity, source, message, None, None);
}

/// Log with file:line (used by cadence_error!)
pub fn log_detailed(
    severity: LogSeverity,
    source: &str,
    message: String,
    file: &'static str,
    line: u32,
) {
    dispatch(severity, source, message, Some(file), Some(line));
}

fn dispatch(
    severity: LogSeverity,
    source: &str,
    message: String,
    file: Option<&'static str>,
    line: Option<u32>,
) {
    if severity < min_severity() {
        return;
    }
    if let Ok(lock) = logger_slot().read() {
        lock.log(&LogEntry {
            severity,
            timestamp: SystemTime::now(),
            source: source.to_string(),
            message,
            file,
            line,
        });
    }
}

// ===== LOGGING MACROS =====

/// Log a TRACE message (very verbose)
///
/// # Example
///
/// ```no_run
/// # use cadence_rhi::cadence_trace;
/// cadence_trace!("cadence::Frame", "draw({}, {})", 3, 0);
/// ```
#[macro_export]
macro_rules! cadence_trace {
    ($source:expr, $($arg:tt)*) => {
        $crate::log::log(
            $crate::log::LogSeverity::Trace,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log a DEBUG message (development information)
///
/// # Example
///
/// ```no_run
/// # use cadence_rhi::cadence_debug;
/// cadence_debug!("cadence::FrameScheduler", "Frame {} skipped", 12);
/// ```
#[macro_export]
macro_rules! cadence_debug {
    ($source:expr, $($arg:tt)*) => {
        $crate::log::log(
            $crate::log::LogSeverity::Debug,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log an INFO message (lifecycle events)
///
/// # Example
///
/// ```no_run
/// # use cadence_rhi::cadence_info;
/// cadence_info!("cadence::FrameScheduler", "Swapchain resized to {}x{}", 800, 600);
/// ```
#[macro_export]
macro_rules! cadence_info {
    ($source:expr, $($arg:tt)*) => {
        $crate::log::log(
            $crate::log::LogSeverity::Info,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log a WARN message (recoverable problems)
///
/// # Example
///
/// ```no_run
/// # use cadence_rhi::cadence_warn;
/// cadence_warn!("cadence::FrameScheduler", "begin_frame failed, will retry");
/// ```
#[macro_export]
macro_rules! cadence_warn {
    ($source:expr, $($arg:tt)*) => {
        $crate::log::log(
            $crate::log::LogSeverity::Warn,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log an ERROR message with file:line information
///
/// # Example
///
/// ```no_run
/// # use cadence_rhi::cadence_error;
/// cadence_error!("cadence::FrameScheduler", "Device lost during frame {}", 3);
/// ```
#[macro_export]
macro_rules! cadence_error {
    ($source:expr, $($arg:tt)*) => {
        $crate::log::log_detailed(
            $crate::log::LogSeverity::Error,
            $source,
            format!($($arg)*),
            file!(),
            line!()
        )
    };
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
