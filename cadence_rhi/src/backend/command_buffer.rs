/// CommandBuffer trait - per-frame recording of passes, bindings and draws

use std::any::Any;
use crate::error::Result;
use crate::frame::{ResourceUpdateBatch, SurfaceSize};
use crate::backend::{BindingsId, BufferId, IndexFormat, PipelineId, RenderTargetRef};

/// Command recording target of the current frame
///
/// Only valid between a successful `begin_frame`/`begin_offscreen_frame` and the
/// matching end call. Batches passed to pass-begin become visible to every draw and
/// dispatch of that pass; batches passed to pass-end are applied after its contents.
pub trait CommandBuffer {
    /// Submit a batch outside of any pass
    fn resource_update(&mut self, updates: ResourceUpdateBatch) -> Result<()>;

    /// Begin a graphics pass, clearing the target's attachments
    fn begin_pass(
        &mut self,
        target: RenderTargetRef,
        clear: ClearValue,
        updates: Option<ResourceUpdateBatch>,
    ) -> Result<()>;

    /// End the current graphics pass
    fn end_pass(&mut self, updates: Option<ResourceUpdateBatch>) -> Result<()>;

    /// Begin a compute pass
    fn begin_compute_pass(&mut self, updates: Option<ResourceUpdateBatch>) -> Result<()>;

    /// End the current compute pass
    fn end_compute_pass(&mut self, updates: Option<ResourceUpdateBatch>) -> Result<()>;

    fn set_graphics_pipeline(&mut self, pipeline: PipelineId) -> Result<()>;

    fn set_compute_pipeline(&mut self, pipeline: PipelineId) -> Result<()>;

    /// Bind a shader resource bindings set; `None` binds the pipeline's default set
    fn set_shader_resources(&mut self, bindings: Option<BindingsId>) -> Result<()>;

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()>;

    /// Bind vertex buffers and an optional index buffer
    fn set_vertex_input(&mut self, input: &VertexInput) -> Result<()>;

    /// Draw vertices
    ///
    /// # Arguments
    ///
    /// * `vertex_count` - Number of vertices to draw
    /// * `first_vertex` - Index of first vertex
    fn draw(&mut self, vertex_count: u32, first_vertex: u32) -> Result<()>;

    /// Draw indexed vertices
    ///
    /// # Arguments
    ///
    /// * `index_count` - Number of indices to draw
    /// * `first_index` - Index of first index
    /// * `vertex_offset` - Value added to vertex index before indexing into the vertex buffer
    fn draw_indexed(&mut self, index_count: u32, first_index: u32, vertex_offset: i32) -> Result<()>;

    /// Dispatch a compute workgroup grid
    fn dispatch(&mut self, x: u32, y: u32, z: u32) -> Result<()>;

    /// Start a section recorded directly with native commands
    fn begin_external(&mut self) -> Result<()>;

    /// End a native section; the layer resumes tracking state afterwards
    fn end_external(&mut self) -> Result<()>;

    /// Native command recording object, only available between begin/end_external
    fn native_handles(&mut self) -> Option<&mut dyn Any>;
}

/// Clear values applied to every attachment at pass begin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClearValue {
    pub color: [f32; 4],
    pub depth: f32,
    pub stencil: u32,
}

impl ClearValue {
    pub fn color(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { color: [r, g, b, a], ..Self::default() }
    }
}

impl Default for ClearValue {
    fn default() -> Self {
        Self { color: [0.0, 0.0, 0.0, 1.0], depth: 1.0, stencil: 0 }
    }
}

/// Viewport dimensions and depth range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    /// Viewport covering a whole target
    pub fn full(size: SurfaceSize) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: size.width as f32,
            height: size.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

/// Vertex/index buffer bindings of a draw
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VertexInput {
    /// (buffer, byte offset) per binding slot
    pub vertex_buffers: Vec<(BufferId, u64)>,
    pub index_buffer: Option<(BufferId, u64, IndexFormat)>,
}

impl VertexInput {
    pub fn vertices(buffer: BufferId) -> Self {
        Self { vertex_buffers: vec![(buffer, 0)], index_buffer: None }
    }

    pub fn indexed(buffer: BufferId, index_buffer: BufferId, format: IndexFormat) -> Self {
        Self {
            vertex_buffers: vec![(buffer, 0)],
            index_buffer: Some((index_buffer, 0, format)),
        }
    }
}
