/// Scheduler configuration
///
/// Plain data with sensible defaults. `from_env` layers the `CADENCE_BACKEND`
/// and `CADENCE_LOG` environment variables on top of the defaults.

use std::env;
use crate::backend::SwapchainDesc;
use crate::log::{self, LogSeverity};

/// Environment variable selecting the backend by registry name
pub const BACKEND_ENV: &str = "CADENCE_BACKEND";

/// Environment variable selecting the minimum log severity
pub const LOG_ENV: &str = "CADENCE_LOG";

/// Configuration consumed by `FrameScheduler` and handed to backend factories
#[derive(Debug, Clone)]
pub struct Config {
    /// Registry name of the backend to instantiate on first exposure
    pub backend: String,

    /// Application name reported to the backend
    pub app_name: String,

    /// Application version (major, minor, patch)
    pub app_version: (u32, u32, u32),

    /// Ask the backend for extra validation (debug layers, hazard checks)
    pub enable_validation: bool,

    /// Presentable surface configuration
    pub swapchain: SwapchainDesc,

    /// Entries below this severity are dropped by the global logger
    pub min_log_severity: LogSeverity,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: "headless".to_string(),
            app_name: "Cadence Application".to_string(),
            app_version: (0, 1, 0),
            enable_validation: cfg!(debug_assertions),
            swapchain: SwapchainDesc::default(),
            min_log_severity: LogSeverity::Info,
        }
    }
}

impl Config {
    /// Defaults overridden by the process environment
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply `CADENCE_BACKEND` / `CADENCE_LOG` overrides, ignoring empty or invalid values
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(name) = env::var(BACKEND_ENV) {
            let name = name.trim();
            if !name.is_empty() {
                self.backend = name.to_string();
            }
        }
        if let Ok(level) = env::var(LOG_ENV) {
            match level.parse::<LogSeverity>() {
                Ok(severity) => self.min_log_severity = severity,
                Err(msg) => {
                    crate::cadence_warn!("cadence::Config", "Ignoring {}: {}", LOG_ENV, msg);
                }
            }
        }
        self
    }

    /// Builder-style backend selection
    pub fn with_backend(mut self, name: impl Into<String>) -> Self {
        self.backend = name.into();
        self
    }

    /// Push `min_log_severity` into the global logger
    pub fn apply_logging(&self) {
        log::set_min_severity(self.min_log_severity);
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
