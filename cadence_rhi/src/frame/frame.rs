/// Frame token - one open submission cycle
///
/// A `Frame` exists only between a successful frame-begin and the matching
/// frame-end; the scheduler builds it after `begin_frame` succeeds and ends the
/// frame once the renderer returns. It mutably borrows the backend, so no second
/// frame can be opened while one is alive.

use glam::{Mat4, Vec3};
use crate::backend::{
    Backend, BackendInfo, ClearValue, FrameOpResult, RenderTargetRef, SwapchainId,
};
use crate::error::{Error, Result};
use crate::frame::{ComputePass, FrameRenderer, GraphicsPass, ResourceUpdateBatch, SurfaceSize};

/// Per-frame data handed to renderers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInfo {
    /// Monotonic frame counter (starts at 1 for the first rendered frame)
    pub index: u64,
    /// Swapchain presented by this frame, `None` for off-screen frames
    pub swapchain: Option<SwapchainId>,
    /// Pixel size of the presentable surface (or of the off-screen output)
    pub size: SurfaceSize,
    /// Clip-space corrected projection * view, recomputed on every resize
    pub view_projection: Mat4,
}

impl FrameInfo {
    pub fn offscreen(size: SurfaceSize, clip_space_correction: Mat4) -> Self {
        Self {
            index: 0,
            swapchain: None,
            size,
            view_projection: view_projection(clip_space_correction, size),
        }
    }
}

impl Default for FrameInfo {
    fn default() -> Self {
        Self {
            index: 0,
            swapchain: None,
            size: SurfaceSize::default(),
            view_projection: Mat4::IDENTITY,
        }
    }
}

/// Default camera: 45° perspective looking at the origin from z = 4
pub fn view_projection(clip_space_correction: Mat4, size: SurfaceSize) -> Mat4 {
    let projection = Mat4::perspective_rh_gl(45f32.to_radians(), size.aspect_ratio(), 0.01, 1000.0);
    let view = Mat4::from_translation(Vec3::new(0.0, 0.0, -4.0));
    clip_space_correction * projection * view
}

/// Workgroup count covering `size` with `local` sized groups (ceiling division)
pub fn workgroups_covering(size: SurfaceSize, local: (u32, u32)) -> Result<(u32, u32)> {
    if local.0 == 0 || local.1 == 0 {
        return Err(Error::InvalidState(format!(
            "workgroup size {}x{} has a zero dimension",
            local.0, local.1
        )));
    }
    Ok((size.width.div_ceil(local.0), size.height.div_ceil(local.1)))
}

/// Open frame
pub struct Frame<'a> {
    pub(super) backend: &'a mut dyn Backend,
    info: FrameInfo,
    compute_recorded: bool,
    graphics_recorded: bool,
    passes: u32,
}

impl<'a> Frame<'a> {
    pub(crate) fn new(backend: &'a mut dyn Backend, info: FrameInfo) -> Self {
        Self {
            backend,
            info,
            compute_recorded: false,
            graphics_recorded: false,
            passes: 0,
        }
    }

    pub fn info(&self) -> &FrameInfo {
        &self.info
    }

    pub fn index(&self) -> u64 {
        self.info.index
    }

    /// Backend access for lazy resource creation inside a frame
    pub fn backend(&mut self) -> &mut dyn Backend {
        &mut *self.backend
    }

    pub fn backend_info(&self) -> &BackendInfo {
        self.backend.info()
    }

    /// Number of passes (compute and graphics) begun so far
    pub fn pass_count(&self) -> u32 {
        self.passes
    }

    pub fn next_resource_update_batch(&mut self) -> ResourceUpdateBatch {
        self.backend.next_resource_update_batch()
    }

    /// Target for rendering into the presentable buffer of this frame
    pub fn swapchain_target(&self) -> Result<RenderTargetRef> {
        self.info
            .swapchain
            .map(RenderTargetRef::Swapchain)
            .ok_or_else(|| Error::InvalidState("off-screen frame has no swapchain target".to_string()))
    }

    /// Submit a batch outside of any pass
    pub fn resource_update(&mut self, updates: ResourceUpdateBatch) -> Result<()> {
        self.backend.command_buffer()?.resource_update(updates)
    }

    /// Open the frame's compute pass
    ///
    /// At most one compute pass per frame, and only before the first graphics pass.
    pub fn begin_compute_pass(
        &mut self,
        updates: Option<ResourceUpdateBatch>,
    ) -> Result<ComputePass<'_, 'a>> {
        if self.graphics_recorded {
            return Err(Error::InvalidState(
                "compute pass must precede every graphics pass of the frame".to_string(),
            ));
        }
        if self.compute_recorded {
            return Err(Error::InvalidState("frame already recorded its compute pass".to_string()));
        }

        self.backend.command_buffer()?.begin_compute_pass(updates)?;
        self.compute_recorded = true;
        self.passes += 1;
        crate::cadence_trace!("cadence::Frame", "Frame {}: compute pass begun", self.info.index);
        Ok(ComputePass::new(self))
    }

    /// Open a graphics pass on `target`, clearing its attachments
    pub fn begin_graphics_pass(
        &mut self,
        target: RenderTargetRef,
        clear: ClearValue,
        updates: Option<ResourceUpdateBatch>,
    ) -> Result<GraphicsPass<'_, 'a>> {
        if let (RenderTargetRef::Swapchain(requested), current) = (target, self.info.swapchain) {
            if current != Some(requested) {
                return Err(Error::InvalidState(
                    "graphics pass targets a swapchain that is not presented by this frame".to_string(),
                ));
            }
        }

        let target_info = self.backend.render_target_info(target)?;
        self.backend.command_buffer()?.begin_pass(target, clear, updates)?;
        self.graphics_recorded = true;
        self.passes += 1;
        crate::cadence_trace!(
            "cadence::Frame",
            "Frame {}: graphics pass {} begun on {} ({} color attachments)",
            self.info.index,
            self.passes,
            target_info.size,
            target_info.color_attachment_count()
        );
        Ok(GraphicsPass::new(self, target, target_info))
    }
}

/// Record one off-screen frame: begin, let `renderer` record, end
///
/// The frame ends even when the renderer fails; the first error is returned.
pub fn run_offscreen_frame(
    backend: &mut dyn Backend,
    size: SurfaceSize,
    renderer: &mut dyn FrameRenderer,
) -> Result<()> {
    match backend.begin_offscreen_frame() {
        FrameOpResult::Success => {}
        FrameOpResult::OutOfDate => {
            return Err(Error::InvalidState(
                "off-screen frame reported an out of date swapchain".to_string(),
            ));
        }
        FrameOpResult::Failed(err) => return Err(err),
    }

    let info = FrameInfo::offscreen(size, backend.info().clip_space_correction);
    let recorded = {
        let mut frame = Frame::new(&mut *backend, info);
        renderer.on_frame(&mut frame)
    };
    let ended = backend.end_offscreen_frame();
    recorded.and(ended)
}

#[cfg(test)]
#[path = "frame_tests.rs"]
mod tests;
