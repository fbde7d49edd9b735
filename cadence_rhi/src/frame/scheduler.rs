/// Frame scheduler - surface/swapchain state machine
///
/// States: `Uninitialized -> Initializing -> Ready <-> Suspended -> Destroyed`.
///
/// The platform forwards exposure, resize and tick events. The scheduler
/// creates the backend on the first presentable exposure, keeps the swapchain
/// sized to the surface, opens a `Frame` only when frame-begin succeeded, and
/// asks for another tick after every frame (continuous redraw; pacing comes
/// from the platform's presentation).

use crate::backend::{Backend, BackendRegistry, FrameOpResult, SwapchainId};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::frame::{
    view_projection, Frame, FrameInfo, GatedAction, Surface, SurfaceSize, SwapchainState,
};

const SOURCE: &str = "cadence::FrameScheduler";

/// Per-frame rendering hooks driven by the scheduler
pub trait FrameRenderer {
    /// Record the frame's passes. Only called with an open frame.
    fn on_frame(&mut self, frame: &mut Frame<'_>) -> Result<()>;

    /// The swapchain was (re)created at `info.size`
    fn on_resize(&mut self, _backend: &mut dyn Backend, _info: &FrameInfo) -> Result<()> {
        Ok(())
    }

    /// Release backend resources; called before the swapchain and the backend go away
    fn on_release(&mut self, _backend: &mut dyn Backend) {}
}

/// Scheduler lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchedulerState {
    /// No backend yet; waiting for a presentable exposure
    Uninitialized,
    /// Backend and swapchain exist; the swapchain is sized on the next tick
    Initializing,
    /// Frames are rendered on every tick
    Ready,
    /// Surface hidden or zero-sized; no frame-begin is attempted
    Suspended,
    /// Surface torn down; every event is ignored
    Destroyed,
}

/// Why a tick did not produce a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    Suspended,
    /// Recreation produced no usable swapchain (zero-sized surface)
    SwapchainUnusable,
    /// Still out of date after one recreate-and-retry
    OutOfDate,
    /// Frame-begin failed with a recoverable error
    AcquireFailed,
}

/// Result of one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TickOutcome {
    Rendered { frame_index: u64 },
    Skipped(SkipReason),
    /// Nothing to do (not initialized, or destroyed)
    Idle,
}

/// Scheduler counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub frames_rendered: u64,
    pub swapchain_recreations: u64,
    pub out_of_date_retries: u64,
    pub skipped_ticks: u64,
    /// Recoverable errors reported by the renderer or by frame-end
    pub frame_errors: u64,
}

pub struct FrameScheduler {
    config: Config,
    registry: BackendRegistry,
    state: SchedulerState,
    /// State to return to when leaving Suspended
    resume_state: SchedulerState,
    surface: Surface,
    swapchain: Option<SwapchainState>,
    backend: Option<Box<dyn Backend>>,
    frame_info: FrameInfo,
    recreate_pending: bool,
    redraw: GatedAction,
    stats: SchedulerStats,
}

impl FrameScheduler {
    /// Scheduler that will instantiate `config.backend` from `registry` on first exposure
    pub fn new(config: Config, registry: BackendRegistry) -> Self {
        Self {
            config,
            registry,
            state: SchedulerState::Uninitialized,
            resume_state: SchedulerState::Ready,
            surface: Surface::default(),
            swapchain: None,
            backend: None,
            frame_info: FrameInfo::default(),
            recreate_pending: false,
            redraw: GatedAction::new(),
            stats: SchedulerStats::default(),
        }
    }

    // ===== ACCESSORS =====

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Last observed surface state
    pub fn surface(&self) -> Surface {
        self.surface
    }

    pub fn swapchain(&self) -> Option<SwapchainState> {
        self.swapchain
    }

    /// Data of the last rendered frame (size and view-projection of the current swapchain)
    pub fn frame_info(&self) -> &FrameInfo {
        &self.frame_info
    }

    pub fn backend(&self) -> Option<&dyn Backend> {
        self.backend.as_deref()
    }

    pub fn backend_mut(&mut self) -> Option<&mut dyn Backend> {
        let backend: &mut dyn Backend = self.backend.as_deref_mut()?;
        Some(backend)
    }

    /// Poll-and-consume the "schedule another tick" signal
    pub fn take_redraw_request(&mut self) -> bool {
        self.redraw.ensure()
    }

    /// Ask for a tick without rendering now
    pub fn request_redraw(&mut self) {
        self.redraw.request();
    }

    // ===== PLATFORM EVENTS =====

    /// Exposure change; renders immediately when the surface is presentable
    ///
    /// The first presentable exposure creates the backend. A backend creation
    /// failure is returned as `Error::BackendCreationFailed` and is fatal.
    pub fn on_expose(
        &mut self,
        exposed: bool,
        size: SurfaceSize,
        renderer: &mut dyn FrameRenderer,
    ) -> Result<()> {
        if self.state == SchedulerState::Destroyed {
            return Ok(());
        }
        self.surface.set_exposed(exposed);
        self.surface.set_size(size);

        match self.state {
            SchedulerState::Uninitialized => {
                if !self.surface.is_presentable() {
                    return Ok(());
                }
                self.initialize()?;
            }
            SchedulerState::Initializing | SchedulerState::Ready => {
                if !self.surface.is_presentable() {
                    self.suspend();
                    return Ok(());
                }
            }
            SchedulerState::Suspended => {
                if !self.surface.is_presentable() {
                    return Ok(());
                }
                self.resume();
            }
            SchedulerState::Destroyed => return Ok(()),
        }

        self.tick(renderer).map(|_| ())
    }

    /// Pixel size change; recreation itself happens on the next tick
    pub fn on_resize(&mut self, size: SurfaceSize) {
        self.surface.set_size(size);
        match self.state {
            SchedulerState::Initializing | SchedulerState::Ready if !self.surface.is_presentable() => {
                self.suspend();
            }
            SchedulerState::Suspended if self.surface.is_presentable() => {
                self.resume();
            }
            SchedulerState::Initializing | SchedulerState::Ready => {
                self.redraw.request();
            }
            _ => {}
        }
    }

    /// Surface teardown: renderer resources, then swapchain, then backend
    pub fn on_surface_destroyed(&mut self, renderer: &mut dyn FrameRenderer) {
        if self.state == SchedulerState::Destroyed {
            return;
        }
        if let Some(backend) = self.backend.as_deref_mut() {
            renderer.on_release(backend);
        }
        self.release_backend();
        self.state = SchedulerState::Destroyed;
        crate::cadence_info!(SOURCE, "Surface destroyed, scheduler shut down");
    }

    /// One render tick
    ///
    /// Recoverable conditions (suspension, zero-size swapchain, staleness after one
    /// retry, failed acquisition, renderer errors) are absorbed and reported in the
    /// outcome and the stats. Only fatal errors are returned.
    pub fn tick(&mut self, renderer: &mut dyn FrameRenderer) -> Result<TickOutcome> {
        match self.state {
            SchedulerState::Uninitialized | SchedulerState::Destroyed => return Ok(TickOutcome::Idle),
            SchedulerState::Suspended => return Ok(self.skip(SkipReason::Suspended, false)),
            SchedulerState::Initializing | SchedulerState::Ready => {}
        }
        let (Some(swapchain), Some(backend)) = (self.swapchain, self.backend.as_deref()) else {
            return Ok(TickOutcome::Idle);
        };
        let id = swapchain.id();

        // Size check against what the surface actually is right now
        let actual = backend.surface_pixel_size(id);
        if (self.recreate_pending || swapchain.is_stale(actual)) && !self.recreate_swapchain(renderer)? {
            return Ok(self.skip(SkipReason::SwapchainUnusable, false));
        }
        if self.state == SchedulerState::Initializing {
            self.state = SchedulerState::Ready;
            crate::cadence_info!(SOURCE, "Swapchain ready at {}", self.frame_info.size);
        }

        if let Some(reason) = self.acquire(id, renderer)? {
            return Ok(self.skip(reason, true));
        }

        self.frame_info.index += 1;
        let info = self.frame_info;
        let recorded = {
            let backend = self.active_backend()?;
            let mut frame = Frame::new(backend, info);
            renderer.on_frame(&mut frame)
        };
        let ended = self.active_backend()?.end_frame(id);

        self.stats.frames_rendered += 1;
        self.redraw.request();

        let mut fatal = None;
        for (step, result) in [("recording", recorded), ("end_frame", ended)] {
            if let Err(err) = result {
                if err.is_fatal() {
                    crate::cadence_error!(SOURCE, "Frame {} {} failed: {}", info.index, step, err);
                    if fatal.is_none() {
                        fatal = Some(err);
                    }
                } else {
                    self.stats.frame_errors += 1;
                    crate::cadence_debug!(SOURCE, "Frame {} {} failed: {}", info.index, step, err);
                }
            }
        }
        match fatal {
            Some(err) => Err(err),
            None => Ok(TickOutcome::Rendered { frame_index: info.index }),
        }
    }

    // ===== INTERNALS =====

    fn active_backend(&mut self) -> Result<&mut dyn Backend> {
        let Some(backend) = self.backend.as_deref_mut() else {
            return Err(Error::InvalidState("scheduler has no backend".to_string()));
        };
        let backend: &mut dyn Backend = backend;
        Ok(backend)
    }

    fn initialize(&mut self) -> Result<()> {
        let mut backend = match self.registry.create_backend(&self.config) {
            Ok(backend) => backend,
            Err(err) => {
                crate::cadence_error!(SOURCE, "Cannot create backend: {}", err);
                return Err(err);
            }
        };
        let id = match backend.new_swapchain(&self.config.swapchain) {
            Ok(id) => id,
            Err(err) => {
                crate::cadence_error!(SOURCE, "Cannot create swapchain: {}", err);
                return Err(Error::BackendCreationFailed(format!("swapchain creation failed: {}", err)));
            }
        };

        self.frame_info.swapchain = Some(id);
        self.swapchain = Some(SwapchainState::new(id));
        self.backend = Some(backend);
        self.state = SchedulerState::Initializing;
        self.recreate_pending = true;
        crate::cadence_info!(SOURCE, "Backend '{}' initialized for {}", self.config.backend, self.config.app_name);
        Ok(())
    }

    fn suspend(&mut self) {
        self.resume_state = self.state;
        self.state = SchedulerState::Suspended;
        if let Some(swapchain) = self.swapchain.as_mut() {
            swapchain.invalidate();
        }
        crate::cadence_info!(SOURCE, "Surface not presentable ({}), suspending", self.surface.size());
    }

    fn resume(&mut self) {
        self.state = self.resume_state;
        self.recreate_pending = true;
        self.redraw.request();
        crate::cadence_info!(SOURCE, "Surface presentable again ({}), resuming", self.surface.size());
    }

    /// Release + create the swapchain at the surface's current size
    ///
    /// Returns false when the result is unusable (zero-sized).
    fn recreate_swapchain(&mut self, renderer: &mut dyn FrameRenderer) -> Result<bool> {
        let (Some(mut swapchain), Some(backend)) = (self.swapchain, self.backend.as_deref_mut()) else {
            return Ok(false);
        };
        let id = swapchain.id();

        let usable = backend.create_or_resize(id);
        let size = backend.swapchain_pixel_size(id);
        swapchain.record_resize(size, usable);
        self.swapchain = Some(swapchain);
        self.recreate_pending = false;
        self.stats.swapchain_recreations += 1;

        if !swapchain.is_valid() {
            crate::cadence_debug!(SOURCE, "Swapchain unusable at {}, skipping", size);
            return Ok(false);
        }

        self.frame_info.swapchain = Some(id);
        self.frame_info.size = size;
        self.frame_info.view_projection = view_projection(backend.info().clip_space_correction, size);
        crate::cadence_info!(SOURCE, "Swapchain sized to {}", size);

        let info = self.frame_info;
        if let Err(err) = renderer.on_resize(backend, &info) {
            if err.is_fatal() {
                return Err(err);
            }
            crate::cadence_warn!(SOURCE, "Renderer resize hook failed: {}", err);
        }
        Ok(true)
    }

    /// Frame-begin with one recreate-and-retry on staleness
    ///
    /// `Ok(None)` means the frame is open.
    fn acquire(&mut self, id: SwapchainId, renderer: &mut dyn FrameRenderer) -> Result<Option<SkipReason>> {
        let result = match self.active_backend()?.begin_frame(id) {
            FrameOpResult::OutOfDate => {
                self.stats.out_of_date_retries += 1;
                crate::cadence_debug!(SOURCE, "Swapchain out of date, recreating and retrying once");
                if !self.recreate_swapchain(renderer)? {
                    return Ok(Some(SkipReason::SwapchainUnusable));
                }
                self.active_backend()?.begin_frame(id)
            }
            other => other,
        };

        match result {
            FrameOpResult::Success => Ok(None),
            FrameOpResult::OutOfDate => {
                crate::cadence_warn!(SOURCE, "Swapchain still out of date after recreation, will retry");
                Ok(Some(SkipReason::OutOfDate))
            }
            FrameOpResult::Failed(err) if err.is_fatal() => {
                crate::cadence_error!(SOURCE, "begin_frame failed: {}", err);
                Err(err)
            }
            FrameOpResult::Failed(err) => {
                crate::cadence_warn!(SOURCE, "begin_frame failed ({}), will retry", err);
                Ok(Some(SkipReason::AcquireFailed))
            }
        }
    }

    fn skip(&mut self, reason: SkipReason, retry: bool) -> TickOutcome {
        self.stats.skipped_ticks += 1;
        if retry {
            self.redraw.request();
        }
        crate::cadence_trace!(SOURCE, "Tick skipped: {:?}", reason);
        TickOutcome::Skipped(reason)
    }

    fn release_backend(&mut self) {
        if let Some(mut backend) = self.backend.take() {
            if let Some(swapchain) = self.swapchain.take() {
                backend.release_swapchain(swapchain.id());
            }
            // Backend goes last: everything above depends on it
            drop(backend);
        }
        self.swapchain = None;
    }
}

impl Drop for FrameScheduler {
    fn drop(&mut self) {
        self.release_backend();
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
