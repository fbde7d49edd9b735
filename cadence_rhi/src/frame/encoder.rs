/// Pass encoders
///
/// A pass encoder mutably borrows its `Frame`, so passes cannot overlap and a
/// closed pass cannot be reopened. `end` consumes the encoder; dropping an
/// encoder that was not ended closes the pass with a warning.

use std::any::Any;
use crate::backend::{
    BindingsId, CommandBuffer, PipelineId, RenderTargetInfo, RenderTargetRef, VertexInput,
    Viewport,
};
use crate::error::{Error, Result};
use crate::frame::{workgroups_covering, Frame, FrameInfo, ResourceUpdateBatch, SurfaceSize};

/// Run `f` against the command buffer's native handles between begin/end_external
fn with_native<R>(
    cmd: &mut dyn CommandBuffer,
    f: impl FnOnce(&mut dyn Any) -> Result<R>,
) -> Result<R> {
    cmd.begin_external()?;
    let result = match cmd.native_handles() {
        Some(native) => f(native),
        None => Err(Error::InvalidState("backend exposes no native command handles".to_string())),
    };
    cmd.end_external()?;
    result
}

// ============================================================================
// Graphics pass
// ============================================================================

/// Open graphics pass
pub struct GraphicsPass<'f, 'a> {
    frame: &'f mut Frame<'a>,
    target: RenderTargetRef,
    target_info: RenderTargetInfo,
    open: bool,
}

impl<'f, 'a> GraphicsPass<'f, 'a> {
    pub(super) fn new(frame: &'f mut Frame<'a>, target: RenderTargetRef, target_info: RenderTargetInfo) -> Self {
        Self { frame, target, target_info, open: true }
    }

    pub fn target(&self) -> RenderTargetRef {
        self.target
    }

    pub fn target_info(&self) -> &RenderTargetInfo {
        &self.target_info
    }

    /// Current pixel size of the target
    pub fn size(&self) -> SurfaceSize {
        self.target_info.size
    }

    pub fn frame_info(&self) -> &FrameInfo {
        self.frame.info()
    }

    /// Raw command buffer, for calls the encoder does not wrap
    pub fn command_buffer(&mut self) -> Result<&mut dyn CommandBuffer> {
        self.frame.backend.command_buffer()
    }

    pub fn set_pipeline(&mut self, pipeline: PipelineId) -> Result<()> {
        self.command_buffer()?.set_graphics_pipeline(pipeline)
    }

    pub fn set_shader_resources(&mut self, bindings: Option<BindingsId>) -> Result<()> {
        self.command_buffer()?.set_shader_resources(bindings)
    }

    pub fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.command_buffer()?.set_viewport(viewport)
    }

    /// Viewport matching the target's current pixel size
    pub fn set_full_viewport(&mut self) -> Result<()> {
        let viewport = Viewport::full(self.target_info.size);
        self.set_viewport(viewport)
    }

    pub fn set_vertex_input(&mut self, input: &VertexInput) -> Result<()> {
        self.command_buffer()?.set_vertex_input(input)
    }

    pub fn draw(&mut self, vertex_count: u32, first_vertex: u32) -> Result<()> {
        self.command_buffer()?.draw(vertex_count, first_vertex)
    }

    pub fn draw_indexed(&mut self, index_count: u32, first_index: u32, vertex_offset: i32) -> Result<()> {
        self.command_buffer()?.draw_indexed(index_count, first_index, vertex_offset)
    }

    /// Record native commands; `f` receives the backend's native command object
    pub fn with_native_commands<R>(&mut self, f: impl FnOnce(&mut dyn Any) -> Result<R>) -> Result<R> {
        with_native(self.command_buffer()?, f)
    }

    /// Close the pass; `updates` is applied after the pass contents
    pub fn end(mut self, updates: Option<ResourceUpdateBatch>) -> Result<()> {
        self.open = false;
        self.frame.backend.command_buffer()?.end_pass(updates)
    }
}

impl Drop for GraphicsPass<'_, '_> {
    fn drop(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        crate::cadence_warn!(
            "cadence::GraphicsPass",
            "Graphics pass dropped without end(), closing it"
        );
        let closed = self.frame.backend.command_buffer().and_then(|cmd| cmd.end_pass(None));
        if let Err(err) = closed {
            crate::cadence_warn!("cadence::GraphicsPass", "Implicit end_pass failed: {}", err);
        }
    }
}

// ============================================================================
// Compute pass
// ============================================================================

/// Open compute pass
pub struct ComputePass<'f, 'a> {
    frame: &'f mut Frame<'a>,
    open: bool,
}

impl<'f, 'a> ComputePass<'f, 'a> {
    pub(super) fn new(frame: &'f mut Frame<'a>) -> Self {
        Self { frame, open: true }
    }

    pub fn frame_info(&self) -> &FrameInfo {
        self.frame.info()
    }

    pub fn command_buffer(&mut self) -> Result<&mut dyn CommandBuffer> {
        self.frame.backend.command_buffer()
    }

    pub fn set_pipeline(&mut self, pipeline: PipelineId) -> Result<()> {
        self.command_buffer()?.set_compute_pipeline(pipeline)
    }

    pub fn set_shader_resources(&mut self, bindings: Option<BindingsId>) -> Result<()> {
        self.command_buffer()?.set_shader_resources(bindings)
    }

    pub fn dispatch(&mut self, x: u32, y: u32, z: u32) -> Result<()> {
        self.command_buffer()?.dispatch(x, y, z)
    }

    /// Dispatch `ceil(width / local_x) x ceil(height / local_y) x 1` workgroups
    pub fn dispatch_covering(&mut self, size: SurfaceSize, local: (u32, u32)) -> Result<(u32, u32)> {
        let (x, y) = workgroups_covering(size, local)?;
        self.dispatch(x, y, 1)?;
        Ok((x, y))
    }

    pub fn with_native_commands<R>(&mut self, f: impl FnOnce(&mut dyn Any) -> Result<R>) -> Result<R> {
        with_native(self.command_buffer()?, f)
    }

    pub fn end(mut self, updates: Option<ResourceUpdateBatch>) -> Result<()> {
        self.open = false;
        self.frame.backend.command_buffer()?.end_compute_pass(updates)
    }
}

impl Drop for ComputePass<'_, '_> {
    fn drop(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        crate::cadence_warn!("cadence::ComputePass", "Compute pass dropped without end(), closing it");
        let closed = self
            .frame
            .backend
            .command_buffer()
            .and_then(|cmd| cmd.end_compute_pass(None));
        if let Err(err) = closed {
            crate::cadence_warn!("cadence::ComputePass", "Implicit end_compute_pass failed: {}", err);
        }
    }
}
