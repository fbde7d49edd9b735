//! Error types for Cadence
//!
//! One enum covers the whole frame orchestration layer. Variants map onto
//! a recovery policy: fatal errors abort startup or stop the scheduler,
//! everything else is absorbed per frame or per pass.

use std::fmt;

/// Result type for Cadence operations
pub type Result<T> = std::result::Result<T, Error>;

/// Cadence errors
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// The backend (device, instance) could not be created. Fatal.
    BackendCreationFailed(String),

    /// Acquiring the next presentable image failed for a reason other than staleness
    SwapchainAcquisitionFailed(String),

    /// The surface has no pixels; nothing can be presented until it grows again
    ZeroSizeSurface,

    /// A buffer, texture, render target, bindings set or pipeline could not be created
    ResourceCreationFailed(String),

    /// Shader input was rejected while building a pipeline
    ShaderCompileFailed(String),

    /// Unknown or released resource id, wrong buffer kind, out-of-range upload
    InvalidResource(String),

    /// API misuse (pass ordering, no open frame, attachment mismatch, feedback hazard)
    InvalidState(String),

    /// A pass needs a resource whose creation previously failed
    ResourceUnavailable(String),

    /// Backend-specific error
    BackendError(String),

    /// The device is gone; no further frame can be rendered. Fatal.
    DeviceLost,
}

impl Error {
    /// Returns true when no further frame can be produced after this error
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::BackendCreationFailed(_) | Error::DeviceLost)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendCreationFailed(msg) => write!(f, "Backend creation failed: {}", msg),
            Error::SwapchainAcquisitionFailed(msg) => write!(f, "Swapchain acquisition failed: {}", msg),
            Error::ZeroSizeSurface => write!(f, "Surface has zero size"),
            Error::ResourceCreationFailed(msg) => write!(f, "Resource creation failed: {}", msg),
            Error::ShaderCompileFailed(msg) => write!(f, "Shader compilation failed: {}", msg),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
            Error::ResourceUnavailable(msg) => write!(f, "Resource unavailable: {}", msg),
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::DeviceLost => write!(f, "Device lost"),
        }
    }
}

impl std::error::Error for Error {}

// ===== ERROR MACROS =====

/// Log an ERROR message (with file:line) and build an `Error::BackendError` from it
///
/// # Example
///
/// ```no_run
/// # use cadence_rhi::cadence_err;
/// let err = cadence_err!("cadence::headless", "Queue submit failed: {}", 7);
/// ```
#[macro_export]
macro_rules! cadence_err {
    ($source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::cadence_error!($source, "{}", message);
        $crate::cadence::Error::BackendError(message)
    }};
}

/// Log an ERROR message and return early with an `Error::BackendError`
///
/// # Example
///
/// ```no_run
/// # use cadence_rhi::cadence_bail;
/// fn submit() -> cadence_rhi::cadence::Result<()> {
///     cadence_bail!("cadence::headless", "Nothing to submit");
/// }
/// ```
#[macro_export]
macro_rules! cadence_bail {
    ($source:expr, $($arg:tt)*) => {
        return Err($crate::cadence_err!($source, $($arg)*))
    };
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
