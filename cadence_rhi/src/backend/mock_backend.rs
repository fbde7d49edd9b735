/// Mock Backend for unit tests (no device required)
///
/// Records every call as a string in a shared `MockState` so tests can inspect
/// it after the backend has been moved into a scheduler. Frame-begin results can
/// be scripted; the surface size is set directly on the state.

use std::any::Any;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use slotmap::SlotMap;
use crate::backend::{
    Backend, BackendInfo, BackendRegistry, BindingsId, BufferDesc, BufferId, CommandBuffer,
    ClearValue, ComputePipelineDesc, FrameOpResult, GraphicsPipelineDesc, PipelineId,
    RenderTargetDesc, RenderTargetId, RenderTargetInfo, RenderTargetRef, ResourceId,
    SamplerDesc, SamplerId, ShaderResourceBinding, SwapchainDesc, SwapchainId, TextureDesc,
    TextureFormat, TextureId, VertexInput, Viewport, clip_space_correction,
};
use crate::error::{Error, Result};
use crate::frame::{ReadbackRequest, ReadbackSource, ResourceUpdateBatch, SurfaceSize};

// ============================================================================
// Shared state
// ============================================================================

#[derive(Default)]
pub struct MockState {
    pub calls: Vec<String>,
    pub surface_size: SurfaceSize,
    pub swapchain_size: SurfaceSize,
    /// Consumed front to back by begin_frame; Success once empty
    pub begin_results: VecDeque<FrameOpResult>,
    pub end_frame_error: Option<Error>,
    pub fail_texture_creation: bool,
    /// Pass-begins carrying a batch that fail before applying it
    pub reject_pass_batches: u32,
    pub frame_open: bool,
    pub pass_open: bool,
    pub compute_open: bool,
    pub external_open: bool,
    pub released: Vec<ResourceId>,
    pub released_swapchains: Vec<SwapchainId>,
    /// Record counts of every batch applied (pass begin/end or standalone)
    pub applied_batches: Vec<usize>,
    pub pending_readbacks: Vec<(usize, ReadbackRequest)>,
    pub native_dispatches: u32,
    pub textures: SlotMap<TextureId, TextureDesc>,
    pub buffers: SlotMap<BufferId, BufferDesc>,
    pub samplers: SlotMap<SamplerId, SamplerDesc>,
    pub render_targets: SlotMap<RenderTargetId, RenderTargetDesc>,
    pub bindings: SlotMap<BindingsId, Vec<ShaderResourceBinding>>,
    pub pipelines: SlotMap<PipelineId, usize>,
    pub swapchains: SlotMap<SwapchainId, SwapchainDesc>,
}

pub type SharedMockState = Arc<Mutex<MockState>>;

pub fn shared_state(surface_size: SurfaceSize) -> SharedMockState {
    Arc::new(Mutex::new(MockState { surface_size, ..MockState::default() }))
}

impl MockState {
    pub fn count(&self, prefix: &str) -> usize {
        self.calls.iter().filter(|c| c.starts_with(prefix)).count()
    }

    pub fn calls_matching(&self, prefix: &str) -> Vec<String> {
        self.calls.iter().filter(|c| c.starts_with(prefix)).cloned().collect()
    }

    fn apply(&mut self, batch: Option<ResourceUpdateBatch>) -> String {
        match batch {
            None => "none".to_string(),
            Some(batch) => {
                let len = batch.len();
                self.applied_batches.push(len);
                let (_, readbacks) = batch.into_writes_and_readbacks();
                for request in readbacks {
                    let size = match request.source {
                        ReadbackSource::Texture { texture, .. } => {
                            request.source.byte_size(self.textures.get(texture)).unwrap_or(0)
                        }
                        ReadbackSource::Buffer { size, .. } => size,
                        ReadbackSource::Swapchain(_) => self.swapchain_size.pixel_count() * 4,
                    };
                    self.pending_readbacks.push((size as usize, request));
                }
                len.to_string()
            }
        }
    }

    fn take_readbacks(&mut self) -> Vec<(usize, ReadbackRequest)> {
        std::mem::take(&mut self.pending_readbacks)
    }
}

fn deliver(readbacks: Vec<(usize, ReadbackRequest)>) {
    for (size, request) in readbacks {
        request.complete(&vec![0u8; size]);
    }
}

// ============================================================================
// Mock Backend
// ============================================================================

pub struct MockBackend {
    state: SharedMockState,
    info: BackendInfo,
    commands: MockCommandBuffer,
}

impl MockBackend {
    pub fn new(state: SharedMockState) -> Self {
        Self {
            commands: MockCommandBuffer { state: state.clone(), native: MockNativeCommands::default() },
            state,
            info: BackendInfo {
                name: "mock".to_string(),
                device_name: "Mock Device".to_string(),
                is_y_up_in_framebuffer: false,
                is_y_up_in_ndc: false,
                clip_space_correction: clip_space_correction(true, true),
            },
        }
    }

    /// Registry with a "mock" factory producing backends bound to `state`
    pub fn registry(state: &SharedMockState) -> BackendRegistry {
        let mut registry = BackendRegistry::new();
        let state = state.clone();
        registry.register("mock", move |_config: &crate::config::Config| -> Result<Box<dyn Backend>> {
            Ok(Box::new(MockBackend::new(state.clone())))
        });
        registry
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }
}

impl Backend for MockBackend {
    fn info(&self) -> &BackendInfo {
        &self.info
    }

    fn new_swapchain(&mut self, desc: &SwapchainDesc) -> Result<SwapchainId> {
        let mut state = self.lock();
        state.calls.push("new_swapchain".to_string());
        Ok(state.swapchains.insert(*desc))
    }

    fn create_or_resize(&mut self, _swapchain: SwapchainId) -> bool {
        let mut state = self.lock();
        let size = state.surface_size;
        state.calls.push(format!("create_or_resize({})", size));
        state.swapchain_size = size;
        !size.is_empty()
    }

    fn surface_pixel_size(&self, _swapchain: SwapchainId) -> SurfaceSize {
        self.lock().surface_size
    }

    fn swapchain_pixel_size(&self, _swapchain: SwapchainId) -> SurfaceSize {
        self.lock().swapchain_size
    }

    fn release_swapchain(&mut self, swapchain: SwapchainId) {
        let mut state = self.lock();
        state.calls.push("release_swapchain".to_string());
        state.swapchains.remove(swapchain);
        state.released_swapchains.push(swapchain);
    }

    fn begin_frame(&mut self, _swapchain: SwapchainId) -> FrameOpResult {
        let mut state = self.lock();
        state.calls.push("begin_frame".to_string());
        if state.frame_open {
            return FrameOpResult::Failed(Error::InvalidState("frame already open".to_string()));
        }
        let result = state.begin_results.pop_front().unwrap_or(FrameOpResult::Success);
        if result == FrameOpResult::Success {
            state.frame_open = true;
        }
        result
    }

    fn end_frame(&mut self, _swapchain: SwapchainId) -> Result<()> {
        let readbacks = {
            let mut state = self.lock();
            state.calls.push("end_frame".to_string());
            if !state.frame_open {
                return Err(Error::InvalidState("no frame open".to_string()));
            }
            state.frame_open = false;
            if let Some(err) = state.end_frame_error.take() {
                return Err(err);
            }
            state.take_readbacks()
        };
        deliver(readbacks);
        Ok(())
    }

    fn begin_offscreen_frame(&mut self) -> FrameOpResult {
        let mut state = self.lock();
        state.calls.push("begin_offscreen_frame".to_string());
        state.frame_open = true;
        FrameOpResult::Success
    }

    fn end_offscreen_frame(&mut self) -> Result<()> {
        let readbacks = {
            let mut state = self.lock();
            state.calls.push("end_offscreen_frame".to_string());
            state.frame_open = false;
            state.take_readbacks()
        };
        deliver(readbacks);
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let readbacks = {
            let mut state = self.lock();
            state.calls.push("finish".to_string());
            state.take_readbacks()
        };
        deliver(readbacks);
        Ok(())
    }

    fn command_buffer(&mut self) -> Result<&mut dyn CommandBuffer> {
        if !self.lock().frame_open {
            return Err(Error::InvalidState("no frame open".to_string()));
        }
        Ok(&mut self.commands)
    }

    fn create_buffer(&mut self, desc: &BufferDesc) -> Result<BufferId> {
        let mut state = self.lock();
        state.calls.push(format!("create_buffer({})", desc.size));
        Ok(state.buffers.insert(*desc))
    }

    fn create_texture(&mut self, desc: &TextureDesc) -> Result<TextureId> {
        let mut state = self.lock();
        state.calls.push(format!("create_texture({}x{})", desc.width, desc.height));
        if state.fail_texture_creation {
            return Err(Error::ResourceCreationFailed("mock texture allocation failed".to_string()));
        }
        Ok(state.textures.insert(*desc))
    }

    fn create_sampler(&mut self, desc: &SamplerDesc) -> Result<SamplerId> {
        let mut state = self.lock();
        state.calls.push("create_sampler".to_string());
        Ok(state.samplers.insert(*desc))
    }

    fn create_render_target(&mut self, desc: &RenderTargetDesc) -> Result<RenderTargetId> {
        let mut state = self.lock();
        state.calls.push(format!("create_render_target({})", desc.color_attachments.len()));
        if let Some(missing) = desc.color_attachments.iter().find(|t| !state.textures.contains_key(**t)) {
            return Err(Error::InvalidResource(format!("unknown texture {:?}", missing)));
        }
        Ok(state.render_targets.insert(desc.clone()))
    }

    fn create_shader_resource_bindings(&mut self, bindings: &[ShaderResourceBinding]) -> Result<BindingsId> {
        let mut state = self.lock();
        state.calls.push(format!("create_shader_resource_bindings({})", bindings.len()));
        Ok(state.bindings.insert(bindings.to_vec()))
    }

    fn create_graphics_pipeline(&mut self, desc: &GraphicsPipelineDesc) -> Result<PipelineId> {
        let mut state = self.lock();
        state.calls.push("create_graphics_pipeline".to_string());
        if desc.vertex_shader.code.is_empty() || desc.fragment_shader.code.is_empty() {
            return Err(Error::ShaderCompileFailed("empty shader module".to_string()));
        }
        Ok(state.pipelines.insert(desc.blend.len()))
    }

    fn create_compute_pipeline(&mut self, desc: &ComputePipelineDesc) -> Result<PipelineId> {
        let mut state = self.lock();
        state.calls.push("create_compute_pipeline".to_string());
        if desc.shader.code.is_empty() {
            return Err(Error::ShaderCompileFailed("empty shader module".to_string()));
        }
        Ok(state.pipelines.insert(0))
    }

    fn render_target_info(&self, target: RenderTargetRef) -> Result<RenderTargetInfo> {
        let state = self.lock();
        match target {
            RenderTargetRef::Swapchain(_) => Ok(RenderTargetInfo {
                size: state.swapchain_size,
                color_formats: vec![TextureFormat::Bgra8Unorm],
                has_depth_stencil: true,
            }),
            RenderTargetRef::Texture(id) => {
                let desc = state
                    .render_targets
                    .get(id)
                    .ok_or_else(|| Error::InvalidResource("unknown render target".to_string()))?;
                let mut size = SurfaceSize::default();
                let mut color_formats = Vec::new();
                for texture in &desc.color_attachments {
                    let tex = state
                        .textures
                        .get(*texture)
                        .ok_or_else(|| Error::InvalidResource("released attachment".to_string()))?;
                    size = SurfaceSize::new(tex.width, tex.height);
                    color_formats.push(tex.format);
                }
                Ok(RenderTargetInfo {
                    size,
                    color_formats,
                    has_depth_stencil: desc.depth_stencil.is_some(),
                })
            }
        }
    }

    fn release(&mut self, resource: ResourceId) {
        let mut state = self.lock();
        state.calls.push(format!("release({:?})", resource));
        match resource {
            ResourceId::Buffer(id) => { state.buffers.remove(id); }
            ResourceId::Texture(id) => { state.textures.remove(id); }
            ResourceId::Sampler(id) => { state.samplers.remove(id); }
            ResourceId::RenderTarget(id) => { state.render_targets.remove(id); }
            ResourceId::Bindings(id) => { state.bindings.remove(id); }
            ResourceId::Pipeline(id) => { state.pipelines.remove(id); }
        }
        state.released.push(resource);
    }
}

// ============================================================================
// Mock Command Buffer
// ============================================================================

/// Native object exposed between begin/end_external
#[derive(Debug, Default)]
pub struct MockNativeCommands {
    pub dispatches: u32,
}

pub struct MockCommandBuffer {
    state: SharedMockState,
    native: MockNativeCommands,
}

impl MockCommandBuffer {
    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }
}

impl CommandBuffer for MockCommandBuffer {
    fn resource_update(&mut self, updates: ResourceUpdateBatch) -> Result<()> {
        let mut state = self.lock();
        let applied = state.apply(Some(updates));
        state.calls.push(format!("resource_update({})", applied));
        Ok(())
    }

    fn begin_pass(
        &mut self,
        target: RenderTargetRef,
        _clear: ClearValue,
        updates: Option<ResourceUpdateBatch>,
    ) -> Result<()> {
        let mut state = self.lock();
        if state.pass_open || state.compute_open {
            return Err(Error::InvalidState("pass already open".to_string()));
        }
        if updates.is_some() && state.reject_pass_batches > 0 {
            state.reject_pass_batches -= 1;
            state.calls.push("begin_pass(rejected)".to_string());
            return Err(Error::InvalidResource("batch rejected".to_string()));
        }
        let applied = state.apply(updates);
        let target = match target {
            RenderTargetRef::Swapchain(_) => "swapchain",
            RenderTargetRef::Texture(_) => "texture",
        };
        state.calls.push(format!("begin_pass({}, updates={})", target, applied));
        state.pass_open = true;
        Ok(())
    }

    fn end_pass(&mut self, updates: Option<ResourceUpdateBatch>) -> Result<()> {
        let mut state = self.lock();
        if !state.pass_open {
            return Err(Error::InvalidState("no graphics pass open".to_string()));
        }
        let applied = state.apply(updates);
        state.calls.push(format!("end_pass(updates={})", applied));
        state.pass_open = false;
        Ok(())
    }

    fn begin_compute_pass(&mut self, updates: Option<ResourceUpdateBatch>) -> Result<()> {
        let mut state = self.lock();
        if state.pass_open || state.compute_open {
            return Err(Error::InvalidState("pass already open".to_string()));
        }
        if updates.is_some() && state.reject_pass_batches > 0 {
            state.reject_pass_batches -= 1;
            state.calls.push("begin_compute_pass(rejected)".to_string());
            return Err(Error::InvalidResource("batch rejected".to_string()));
        }
        let applied = state.apply(updates);
        state.calls.push(format!("begin_compute_pass(updates={})", applied));
        state.compute_open = true;
        Ok(())
    }

    fn end_compute_pass(&mut self, updates: Option<ResourceUpdateBatch>) -> Result<()> {
        let mut state = self.lock();
        if !state.compute_open {
            return Err(Error::InvalidState("no compute pass open".to_string()));
        }
        let applied = state.apply(updates);
        state.calls.push(format!("end_compute_pass(updates={})", applied));
        state.compute_open = false;
        Ok(())
    }

    fn set_graphics_pipeline(&mut self, _pipeline: PipelineId) -> Result<()> {
        self.lock().calls.push("set_graphics_pipeline".to_string());
        Ok(())
    }

    fn set_compute_pipeline(&mut self, _pipeline: PipelineId) -> Result<()> {
        self.lock().calls.push("set_compute_pipeline".to_string());
        Ok(())
    }

    fn set_shader_resources(&mut self, bindings: Option<BindingsId>) -> Result<()> {
        let mut state = self.lock();
        let label = if bindings.is_some() { "explicit" } else { "pipeline" };
        state.calls.push(format!("set_shader_resources({})", label));
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.lock()
            .calls
            .push(format!("set_viewport({}x{})", viewport.width, viewport.height));
        Ok(())
    }

    fn set_vertex_input(&mut self, input: &VertexInput) -> Result<()> {
        self.lock()
            .calls
            .push(format!("set_vertex_input({})", input.vertex_buffers.len()));
        Ok(())
    }

    fn draw(&mut self, vertex_count: u32, first_vertex: u32) -> Result<()> {
        let mut state = self.lock();
        if !state.pass_open {
            return Err(Error::InvalidState("draw outside of a graphics pass".to_string()));
        }
        state.calls.push(format!("draw({}, {})", vertex_count, first_vertex));
        Ok(())
    }

    fn draw_indexed(&mut self, index_count: u32, first_index: u32, vertex_offset: i32) -> Result<()> {
        let mut state = self.lock();
        if !state.pass_open {
            return Err(Error::InvalidState("draw outside of a graphics pass".to_string()));
        }
        state
            .calls
            .push(format!("draw_indexed({}, {}, {})", index_count, first_index, vertex_offset));
        Ok(())
    }

    fn dispatch(&mut self, x: u32, y: u32, z: u32) -> Result<()> {
        let mut state = self.lock();
        if !state.compute_open {
            return Err(Error::InvalidState("dispatch outside of a compute pass".to_string()));
        }
        state.calls.push(format!("dispatch({}, {}, {})", x, y, z));
        Ok(())
    }

    fn begin_external(&mut self) -> Result<()> {
        let mut state = self.lock();
        state.external_open = true;
        state.calls.push("begin_external".to_string());
        Ok(())
    }

    fn end_external(&mut self) -> Result<()> {
        let dispatches = self.native.dispatches;
        let mut state = self.lock();
        state.external_open = false;
        state.native_dispatches = dispatches;
        state.calls.push("end_external".to_string());
        Ok(())
    }

    fn native_handles(&mut self) -> Option<&mut dyn Any> {
        if self.lock().external_open {
            Some(&mut self.native)
        } else {
            None
        }
    }
}
