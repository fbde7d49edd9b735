/// HeadlessSurface - stand-in for a platform window surface
///
/// Cloneable handle shared between whoever plays the platform (a test, the
/// demo) and the backend. The platform side sets the pixel size; the backend
/// compares it against its swapchains on every acquire.

use std::sync::{Arc, Mutex, MutexGuard};
use cadence_rhi::cadence::frame::SurfaceSize;

#[derive(Debug, Default)]
struct SurfaceState {
    size: SurfaceSize,
    /// Acquires still forced to report out-of-date
    out_of_date: u32,
}

#[derive(Debug, Clone, Default)]
pub struct HeadlessSurface {
    state: Arc<Mutex<SurfaceState>>,
}

impl HeadlessSurface {
    pub fn new(size: SurfaceSize) -> Self {
        Self {
            state: Arc::new(Mutex::new(SurfaceState { size, out_of_date: 0 })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SurfaceState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current pixel size
    pub fn size(&self) -> SurfaceSize {
        self.lock().size
    }

    pub fn set_size(&self, size: SurfaceSize) {
        self.lock().size = size;
    }

    /// Make the next `count` acquires report out-of-date, like a resize racing the acquire
    pub fn inject_out_of_date(&self, count: u32) {
        self.lock().out_of_date += count;
    }

    pub fn pending_out_of_date(&self) -> u32 {
        self.lock().out_of_date
    }

    /// Consume one injected out-of-date, if any
    pub(crate) fn take_out_of_date(&self) -> bool {
        let mut state = self.lock();
        if state.out_of_date > 0 {
            state.out_of_date -= 1;
            true
        } else {
            false
        }
    }
}
