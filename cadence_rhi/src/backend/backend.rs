/// Backend trait - the narrow boundary to a native graphics API
///
/// A backend owns the device, the swapchains and every resource. The frame
/// scheduler and pass coordinator only hold ids and drive the backend through
/// this trait object.

use std::any::Any;
use glam::Mat4;
use crate::error::{Error, Result};
use crate::frame::{ResourceUpdateBatch, SurfaceSize};
use crate::backend::{
    BindingsId, BufferDesc, BufferId, CommandBuffer, ComputePipelineDesc,
    GraphicsPipelineDesc, PipelineId, RenderTargetDesc, RenderTargetId,
    RenderTargetInfo, RenderTargetRef, ResourceId, SamplerDesc, SamplerId,
    ShaderResourceBinding, SwapchainId, TextureDesc, TextureFormat, TextureId,
};

/// Result of a frame-begin or frame-end call
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOpResult {
    /// The frame is open and a command buffer is available
    Success,
    /// The swapchain no longer matches the surface; recreate and retry
    OutOfDate,
    /// Anything else; fatal when the contained error is fatal
    Failed(Error),
}

/// Static description of a backend instance
#[derive(Debug, Clone, PartialEq)]
pub struct BackendInfo {
    /// Registry name ("headless", "vulkan", ...)
    pub name: String,
    /// Human readable device/driver description
    pub device_name: String,
    /// Framebuffer origin is bottom-left
    pub is_y_up_in_framebuffer: bool,
    /// Normalized device coordinates have Y pointing up
    pub is_y_up_in_ndc: bool,
    /// Converts OpenGL-style clip space into the backend's clip space
    pub clip_space_correction: Mat4,
}

/// Clip-space correction matrix for a backend's conventions
///
/// `flip_y` is needed when NDC Y points down, `zero_to_one_depth` when depth
/// ranges over [0, 1] instead of [-1, 1].
pub fn clip_space_correction(flip_y: bool, zero_to_one_depth: bool) -> Mat4 {
    let y = if flip_y { -1.0 } else { 1.0 };
    let (z_scale, z_bias) = if zero_to_one_depth { (0.5, 0.5) } else { (1.0, 0.0) };
    Mat4::from_cols_array(&[
        1.0, 0.0, 0.0, 0.0,
        0.0, y, 0.0, 0.0,
        0.0, 0.0, z_scale, 0.0,
        0.0, 0.0, z_bias, 1.0,
    ])
}

/// Swapchain configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapchainDesc {
    pub format: TextureFormat,
    /// Create a depth/stencil attachment alongside the color buffers
    pub depth_stencil: bool,
    pub sample_count: u32,
}

impl Default for SwapchainDesc {
    fn default() -> Self {
        Self {
            format: TextureFormat::Bgra8Unorm,
            depth_stencil: true,
            sample_count: 1,
        }
    }
}

/// Graphics backend
///
/// Implementations are single-threaded: every call happens on the thread that
/// delivers platform events.
pub trait Backend {
    /// Backend name, device description and conventions
    fn info(&self) -> &BackendInfo;

    // ===== SWAPCHAIN =====

    /// Create an (unsized) swapchain for the backend's surface
    fn new_swapchain(&mut self, desc: &SwapchainDesc) -> Result<SwapchainId>;

    /// Size (or resize) the swapchain to the surface's current pixel size
    ///
    /// Returns false when the result is unusable, e.g. the surface has zero size.
    /// The depth/stencil attachment is kept and resized when the backend allows.
    fn create_or_resize(&mut self, swapchain: SwapchainId) -> bool;

    /// Actual pixel size of the surface behind the swapchain
    fn surface_pixel_size(&self, swapchain: SwapchainId) -> SurfaceSize;

    /// Pixel size the swapchain was last built for
    fn swapchain_pixel_size(&self, swapchain: SwapchainId) -> SurfaceSize;

    /// Destroy a swapchain and its attachments
    fn release_swapchain(&mut self, swapchain: SwapchainId);

    // ===== FRAMES =====

    /// Acquire the next presentable buffer and open a frame
    fn begin_frame(&mut self, swapchain: SwapchainId) -> FrameOpResult;

    /// Submit and present the open frame
    fn end_frame(&mut self, swapchain: SwapchainId) -> Result<()>;

    /// Open a frame that renders only to off-screen targets
    fn begin_offscreen_frame(&mut self) -> FrameOpResult;

    /// Submit an off-screen frame and wait for it to complete
    fn end_offscreen_frame(&mut self) -> Result<()>;

    /// Wait for the device to go idle and deliver pending readbacks
    fn finish(&mut self) -> Result<()>;

    /// Command buffer of the open frame
    fn command_buffer(&mut self) -> Result<&mut dyn CommandBuffer>;

    /// Empty batch; backends may override to recycle allocations
    fn next_resource_update_batch(&mut self) -> ResourceUpdateBatch {
        ResourceUpdateBatch::new()
    }

    // ===== RESOURCES =====

    fn create_buffer(&mut self, desc: &BufferDesc) -> Result<BufferId>;

    fn create_texture(&mut self, desc: &TextureDesc) -> Result<TextureId>;

    fn create_sampler(&mut self, desc: &SamplerDesc) -> Result<SamplerId>;

    fn create_render_target(&mut self, desc: &RenderTargetDesc) -> Result<RenderTargetId>;

    fn create_shader_resource_bindings(
        &mut self,
        bindings: &[ShaderResourceBinding],
    ) -> Result<BindingsId>;

    fn create_graphics_pipeline(&mut self, desc: &GraphicsPipelineDesc) -> Result<PipelineId>;

    fn create_compute_pipeline(&mut self, desc: &ComputePipelineDesc) -> Result<PipelineId>;

    /// Pixel size and attachment layout of a render target
    fn render_target_info(&self, target: RenderTargetRef) -> Result<RenderTargetInfo>;

    /// Release a resource; unknown ids are ignored
    fn release(&mut self, resource: ResourceId);

    /// Native device objects (escape hatch)
    fn native_handles(&mut self) -> Option<&mut dyn Any> {
        None
    }
}
