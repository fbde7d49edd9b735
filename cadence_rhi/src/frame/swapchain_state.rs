/// Scheduler-side view of a backend swapchain

use crate::backend::SwapchainId;
use crate::frame::SurfaceSize;

/// Tracked size and validity of one swapchain
///
/// Valid means the last `create_or_resize` succeeded and produced `tracked_size`.
/// A valid state whose tracked size differs from the surface's actual size is
/// stale and must be recreated before a frame begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapchainState {
    id: SwapchainId,
    tracked_size: SurfaceSize,
    valid: bool,
}

impl SwapchainState {
    /// Freshly created, not yet sized
    pub fn new(id: SwapchainId) -> Self {
        Self { id, tracked_size: SurfaceSize::default(), valid: false }
    }

    pub fn id(&self) -> SwapchainId {
        self.id
    }

    pub fn tracked_size(&self) -> SurfaceSize {
        self.tracked_size
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Needs a recreation before use given the surface's actual size
    pub fn is_stale(&self, actual: SurfaceSize) -> bool {
        !self.valid || self.tracked_size != actual
    }

    /// Record the outcome of a `create_or_resize` call
    pub(crate) fn record_resize(&mut self, size: SurfaceSize, usable: bool) {
        self.tracked_size = size;
        self.valid = usable && !size.is_empty();
    }

    pub(crate) fn invalidate(&mut self) {
        self.valid = false;
    }
}
