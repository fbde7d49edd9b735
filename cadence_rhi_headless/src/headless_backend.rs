/// HeadlessBackend - CPU implementation of the Backend trait
///
/// Frames open against a `HeadlessSurface` instead of a window. Acquires fail
/// with `OutOfDate` when the swapchain no longer matches the surface (or when
/// the surface was told to inject staleness). Readbacks are delivered at frame
/// end and at `finish`.

use std::any::Any;
use cadence_rhi::cadence::{Backend, CommandBuffer, Config, Error, Result};
use cadence_rhi::cadence::backend::{
    BackendInfo, BindingsId, BufferDesc, BufferId, ComputePipelineDesc, FrameOpResult,
    GraphicsPipelineDesc, PipelineId, RenderTargetDesc, RenderTargetId, RenderTargetInfo,
    RenderTargetRef, ResourceId, SamplerDesc, SamplerId, ShaderDesc, ShaderResourceBinding,
    ShaderStage, SwapchainDesc, SwapchainId, TextureDesc, TextureId, clip_space_correction,
};
use cadence_rhi::cadence::frame::{ReadbackRequest, SurfaceSize};
use cadence_rhi::{cadence_bail, cadence_debug, cadence_err, cadence_info, cadence_warn};
use crate::headless_context::{HeadlessContext, HeadlessPipeline};
use crate::headless_surface::HeadlessSurface;
use crate::headless_trace::HeadlessTrace;

const SOURCE: &str = "cadence::headless";

pub struct HeadlessBackend {
    info: BackendInfo,
    surface: HeadlessSurface,
    context: HeadlessContext,
}

impl HeadlessBackend {
    /// Create a backend presenting to `surface` and tracing into `trace`
    ///
    /// `config.enable_validation` turns on feedback hazard checks.
    pub fn new(config: &Config, surface: HeadlessSurface, trace: HeadlessTrace) -> Self {
        cadence_info!(
            SOURCE,
            "Headless backend for {} v{}.{}.{} (validation: {})",
            config.app_name,
            config.app_version.0,
            config.app_version.1,
            config.app_version.2,
            config.enable_validation
        );
        Self {
            info: BackendInfo {
                name: "headless".to_string(),
                device_name: "CPU reference device".to_string(),
                is_y_up_in_framebuffer: false,
                is_y_up_in_ndc: true,
                clip_space_correction: clip_space_correction(false, false),
            },
            surface,
            context: HeadlessContext::new(trace, config.enable_validation),
        }
    }

    pub fn surface(&self) -> &HeadlessSurface {
        &self.surface
    }

    pub fn context(&self) -> &HeadlessContext {
        &self.context
    }

    fn deliver(readbacks: Vec<(Vec<u8>, ReadbackRequest)>) {
        for (data, request) in readbacks {
            request.complete(&data);
        }
    }

    fn check_shader(shader: &ShaderDesc, stage: ShaderStage) -> Result<()> {
        if shader.stage != stage {
            return Err(Error::ShaderCompileFailed(format!(
                "expected a {:?} shader, got {:?}",
                stage, shader.stage
            )));
        }
        if shader.code.is_empty() {
            return Err(Error::ShaderCompileFailed(format!("{:?} shader has no code", stage)));
        }
        if shader.entry_point.is_empty() {
            return Err(Error::ShaderCompileFailed(format!("{:?} shader has no entry point", stage)));
        }
        Ok(())
    }
}

impl Backend for HeadlessBackend {
    fn info(&self) -> &BackendInfo {
        &self.info
    }

    // ===== SWAPCHAIN =====

    fn new_swapchain(&mut self, desc: &SwapchainDesc) -> Result<SwapchainId> {
        if desc.sample_count != 1 {
            return Err(Error::ResourceCreationFailed(format!(
                "{} samples requested, the headless swapchain is single-sampled",
                desc.sample_count
            )));
        }
        if desc.format.is_depth_stencil() {
            return Err(Error::ResourceCreationFailed(format!(
                "{:?} is not a presentable format",
                desc.format
            )));
        }
        Ok(self.context.insert_swapchain(*desc))
    }

    fn create_or_resize(&mut self, swapchain: SwapchainId) -> bool {
        let size = self.surface.size();
        let usable = self.context.resize_swapchain(swapchain, size);
        cadence_debug!(SOURCE, "Swapchain {:?} sized to {} (usable: {})", swapchain, size, usable);
        usable
    }

    fn surface_pixel_size(&self, _swapchain: SwapchainId) -> SurfaceSize {
        self.surface.size()
    }

    fn swapchain_pixel_size(&self, swapchain: SwapchainId) -> SurfaceSize {
        self.context
            .swapchain(swapchain)
            .map(|swapchain| swapchain.size)
            .unwrap_or_default()
    }

    fn release_swapchain(&mut self, swapchain: SwapchainId) {
        self.context.release_swapchain(swapchain);
    }

    // ===== FRAMES =====

    fn begin_frame(&mut self, swapchain: SwapchainId) -> FrameOpResult {
        let Some(state) = self.context.swapchain(swapchain) else {
            return FrameOpResult::Failed(cadence_err!(SOURCE, "Cannot acquire unknown swapchain {:?}", swapchain));
        };
        let configured = state.size;

        if self.surface.take_out_of_date() {
            cadence_debug!(SOURCE, "Injected out-of-date on acquire");
            return FrameOpResult::OutOfDate;
        }
        let actual = self.surface.size();
        if actual.is_empty() {
            return FrameOpResult::Failed(Error::ZeroSizeSurface);
        }
        if actual != configured {
            cadence_debug!(SOURCE, "Swapchain built for {} but surface is {}", configured, actual);
            return FrameOpResult::OutOfDate;
        }

        match self.context.open_frame(Some(swapchain)) {
            Ok(_) => FrameOpResult::Success,
            Err(err) => FrameOpResult::Failed(err),
        }
    }

    fn end_frame(&mut self, swapchain: SwapchainId) -> Result<()> {
        let presented = self.context.presented_swapchain();
        if self.context.is_frame_open() && presented != Some(swapchain) {
            cadence_bail!(SOURCE, "Cannot present swapchain {:?}, the open frame targets {:?}", swapchain, presented);
        }
        let readbacks = self.context.close_frame()?;
        Self::deliver(readbacks);
        Ok(())
    }

    fn begin_offscreen_frame(&mut self) -> FrameOpResult {
        match self.context.open_frame(None) {
            Ok(_) => FrameOpResult::Success,
            Err(err) => FrameOpResult::Failed(err),
        }
    }

    fn end_offscreen_frame(&mut self) -> Result<()> {
        let readbacks = self.context.close_frame()?;
        Self::deliver(readbacks);
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let readbacks = self.context.take_readbacks();
        Self::deliver(readbacks);
        Ok(())
    }

    fn command_buffer(&mut self) -> Result<&mut dyn CommandBuffer> {
        if !self.context.is_frame_open() {
            return Err(Error::InvalidState("command buffer requested with no open frame".to_string()));
        }
        Ok(&mut self.context)
    }

    // ===== RESOURCES =====

    fn create_buffer(&mut self, desc: &BufferDesc) -> Result<BufferId> {
        self.context.create_buffer(desc)
    }

    fn create_texture(&mut self, desc: &TextureDesc) -> Result<TextureId> {
        self.context.create_texture(desc)
    }

    fn create_sampler(&mut self, desc: &SamplerDesc) -> Result<SamplerId> {
        Ok(self.context.create_sampler(desc))
    }

    fn create_render_target(&mut self, desc: &RenderTargetDesc) -> Result<RenderTargetId> {
        self.context.create_render_target(desc)
    }

    fn create_shader_resource_bindings(
        &mut self,
        bindings: &[ShaderResourceBinding],
    ) -> Result<BindingsId> {
        self.context.create_bindings(bindings)
    }

    fn create_graphics_pipeline(&mut self, desc: &GraphicsPipelineDesc) -> Result<PipelineId> {
        Self::check_shader(&desc.vertex_shader, ShaderStage::Vertex)?;
        Self::check_shader(&desc.fragment_shader, ShaderStage::Fragment)?;
        self.context.check_bindings(desc.bindings)?;

        // Unsized swapchains still report their attachment layout
        match self.context.target_info(desc.target) {
            Ok(info) if info.color_attachment_count() != desc.blend.len() => {
                return Err(Error::InvalidState(format!(
                    "pipeline has {} blend states but the target has {} color attachments",
                    desc.blend.len(),
                    info.color_attachment_count()
                )));
            }
            Ok(_) => {}
            Err(err) => {
                cadence_warn!(SOURCE, "Pipeline target cannot be checked: {}", err);
            }
        }

        Ok(self.context.insert_pipeline(HeadlessPipeline::Graphics {
            blend_count: desc.blend.len(),
            bindings: desc.bindings,
        }))
    }

    fn create_compute_pipeline(&mut self, desc: &ComputePipelineDesc) -> Result<PipelineId> {
        Self::check_shader(&desc.shader, ShaderStage::Compute)?;
        let (x, y, z) = desc.local_size;
        if x == 0 || y == 0 || z == 0 {
            return Err(Error::ShaderCompileFailed(format!(
                "workgroup size {}x{}x{} has a zero dimension",
                x, y, z
            )));
        }
        self.context.check_bindings(desc.bindings)?;
        Ok(self.context.insert_pipeline(HeadlessPipeline::Compute {
            local_size: desc.local_size,
            bindings: desc.bindings,
        }))
    }

    fn render_target_info(&self, target: RenderTargetRef) -> Result<RenderTargetInfo> {
        self.context.target_info(target)
    }

    fn release(&mut self, resource: ResourceId) {
        self.context.release(resource);
    }

    /// The `HeadlessContext`, for inspecting resource contents
    fn native_handles(&mut self) -> Option<&mut dyn Any> {
        Some(&mut self.context)
    }
}

impl Drop for HeadlessBackend {
    fn drop(&mut self) {
        let leaked = self.context.live_resource_count();
        if leaked > 0 {
            cadence_debug!(SOURCE, "Dropping headless backend with {} live resources", leaked);
        }
    }
}

#[cfg(test)]
#[path = "headless_backend_tests.rs"]
mod tests;
