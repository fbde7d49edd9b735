/*!
# Cadence RHI

Frame orchestration layer sitting between application rendering code and a
native graphics backend.

The crate does not talk to any graphics API itself. Backends (see the
`cadence_rhi_headless` crate for a CPU reference) implement the [`Backend`]
and [`CommandBuffer`] traits and are instantiated by name through a
[`BackendRegistry`].

## Architecture

- **GatedAction**: one-shot deferred trigger (request once, fires once)
- **ResourceUpdateBatch**: uploads, dynamic updates and readbacks applied
  atomically at a pass boundary
- **FrameScheduler**: surface/swapchain state machine driving frame begin/end
- **PassCoordinator**: compute and graphics pass sequencing inside one frame,
  including MRT and ping-pong feedback targets

[`Backend`]: crate::backend::Backend
[`CommandBuffer`]: crate::backend::CommandBuffer
[`BackendRegistry`]: crate::backend::BackendRegistry
*/

// Internal modules
mod error;
mod config;
pub mod log;
pub mod backend;
pub mod frame;
pub mod pass;

// Main cadence namespace module
pub mod cadence {
    // Error types
    pub use crate::error::{Error, Result};

    // Configuration
    pub use crate::config::Config;

    // Most used entry points
    pub use crate::backend::{Backend, BackendRegistry, CommandBuffer};
    pub use crate::frame::{FrameScheduler, FrameRenderer, GatedAction, ResourceUpdateBatch};
    pub use crate::pass::{PassCoordinator, PassProgram, PingPongSelector};

    // Logging sub-module (types and global logger access)
    pub mod log {
        pub use crate::log::{
            Logger, LogEntry, LogSeverity, DefaultLogger,
            set_logger, reset_logger, set_min_severity, min_severity,
            log, log_detailed,
        };
    }

    // Backend boundary: traits, descriptors, resource ids
    pub mod backend {
        pub use crate::backend::*;
    }

    // Frame lifecycle: scheduler, frames, batches
    pub mod frame {
        pub use crate::frame::*;
    }

    // Pass sequencing
    pub mod pass {
        pub use crate::pass::*;
    }
}

// Re-export math and byte-casting libraries at crate root
pub use glam;
pub use bytemuck;
