/// Context - resource tables and command recording of the headless backend
///
/// The context owns every buffer, texture and pipeline of a `HeadlessBackend`
/// and implements `CommandBuffer` for the open frame. Commands execute
/// immediately against CPU memory: batches are applied when a pass begins or
/// ends, attachments are cleared at pass begin, draws and dispatches are
/// validated and appended to the trace.

use std::any::Any;
use rustc_hash::FxHashSet;
use slotmap::SlotMap;
use cadence_rhi::cadence::{CommandBuffer, Error, Result};
use cadence_rhi::cadence::backend::{
    BindingResource, BindingsId, BufferDesc, BufferId, BufferUsage, ClearValue, PipelineId,
    RenderTargetDesc, RenderTargetId, RenderTargetInfo, RenderTargetRef, ResourceId,
    SamplerDesc, SamplerId, ShaderResourceBinding, SwapchainDesc, SwapchainId, TextureDesc,
    TextureFlags, TextureFormat, TextureId, VertexInput, Viewport,
};
use cadence_rhi::cadence::frame::{
    ReadbackRequest, ReadbackSource, ResourceUpdateBatch, SurfaceSize, UploadRecord,
};
use cadence_rhi::{cadence_err, cadence_trace};
use crate::headless_buffer::HeadlessBuffer;
use crate::headless_native::HeadlessNativeCommands;
use crate::headless_texture::HeadlessTexture;
use crate::headless_trace::{DrawRecord, HeadlessTrace, TraceEvent};

const SOURCE: &str = "cadence::headless";

/// Pipeline state kept by the headless backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeadlessPipeline {
    Graphics {
        /// Number of blend states, i.e. color attachments the pipeline writes
        blend_count: usize,
        bindings: Option<BindingsId>,
    },
    Compute {
        local_size: (u32, u32, u32),
        bindings: Option<BindingsId>,
    },
}

impl HeadlessPipeline {
    fn default_bindings(&self) -> Option<BindingsId> {
        match self {
            HeadlessPipeline::Graphics { bindings, .. } | HeadlessPipeline::Compute { bindings, .. } => *bindings,
        }
    }
}

/// Presentable buffer plus optional depth/stencil attachment
#[derive(Debug, Clone)]
pub struct HeadlessSwapchain {
    pub desc: SwapchainDesc,
    pub size: SurfaceSize,
    /// Current presentable buffer; `None` until the swapchain is first sized
    pub color: Option<TextureId>,
    pub depth: Option<TextureId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameState {
    Closed,
    Open { index: u64, swapchain: Option<SwapchainId> },
}

#[derive(Debug)]
enum PassState {
    None,
    Graphics {
        target: RenderTargetRef,
        color_count: usize,
        /// Every texture written by the pass (colors + depth/stencil)
        attachments: FxHashSet<TextureId>,
    },
    Compute,
}

pub struct HeadlessContext {
    pub(crate) buffers: SlotMap<BufferId, HeadlessBuffer>,
    pub(crate) textures: SlotMap<TextureId, HeadlessTexture>,
    pub(crate) samplers: SlotMap<SamplerId, SamplerDesc>,
    pub(crate) render_targets: SlotMap<RenderTargetId, RenderTargetDesc>,
    pub(crate) bindings: SlotMap<BindingsId, Vec<ShaderResourceBinding>>,
    pub(crate) pipelines: SlotMap<PipelineId, HeadlessPipeline>,
    pub(crate) swapchains: SlotMap<SwapchainId, HeadlessSwapchain>,
    next_allocation: u64,
    frames_begun: u64,
    frame: FrameState,
    pass: PassState,
    pipeline: Option<PipelineId>,
    bound_bindings: Option<BindingsId>,
    vertex_input: Option<VertexInput>,
    external_open: bool,
    native: HeadlessNativeCommands,
    /// Captured readback data waiting for the next frame boundary
    pending_readbacks: Vec<(Vec<u8>, ReadbackRequest)>,
    /// Feedback hazard checks
    validation: bool,
    trace: HeadlessTrace,
}

impl HeadlessContext {
    pub fn new(trace: HeadlessTrace, validation: bool) -> Self {
        Self {
            buffers: SlotMap::with_key(),
            textures: SlotMap::with_key(),
            samplers: SlotMap::with_key(),
            render_targets: SlotMap::with_key(),
            bindings: SlotMap::with_key(),
            pipelines: SlotMap::with_key(),
            swapchains: SlotMap::with_key(),
            next_allocation: 0,
            frames_begun: 0,
            frame: FrameState::Closed,
            pass: PassState::None,
            pipeline: None,
            bound_bindings: None,
            vertex_input: None,
            external_open: false,
            native: HeadlessNativeCommands::default(),
            pending_readbacks: Vec::new(),
            validation,
            trace,
        }
    }

    // ===== INSPECTION =====

    pub fn buffer(&self, id: BufferId) -> Option<&HeadlessBuffer> {
        self.buffers.get(id)
    }

    pub fn texture(&self, id: TextureId) -> Option<&HeadlessTexture> {
        self.textures.get(id)
    }

    pub fn swapchain(&self, id: SwapchainId) -> Option<&HeadlessSwapchain> {
        self.swapchains.get(id)
    }

    pub fn pipeline(&self, id: PipelineId) -> Option<&HeadlessPipeline> {
        self.pipelines.get(id)
    }

    pub fn is_frame_open(&self) -> bool {
        matches!(self.frame, FrameState::Open { .. })
    }

    /// Swapchain presented by the open frame; `None` for offscreen or closed frames
    pub fn presented_swapchain(&self) -> Option<SwapchainId> {
        match self.frame {
            FrameState::Open { swapchain, .. } => swapchain,
            FrameState::Closed => None,
        }
    }

    pub fn is_pass_open(&self) -> bool {
        !matches!(self.pass, PassState::None)
    }

    /// Readbacks captured but not yet delivered
    pub fn pending_readback_count(&self) -> usize {
        self.pending_readbacks.len()
    }

    pub fn live_resource_count(&self) -> usize {
        self.buffers.len()
            + self.textures.len()
            + self.samplers.len()
            + self.render_targets.len()
            + self.bindings.len()
            + self.pipelines.len()
    }

    /// Shader resource binding sets currently alive
    pub fn live_bindings_count(&self) -> usize {
        self.bindings.len()
    }

    pub fn trace(&self) -> &HeadlessTrace {
        &self.trace
    }

    // ===== RESOURCES =====

    pub(crate) fn allocate_texture(&mut self, desc: TextureDesc) -> TextureId {
        self.next_allocation += 1;
        self.textures.insert(HeadlessTexture::new(desc, self.next_allocation))
    }

    pub(crate) fn create_buffer(&mut self, desc: &BufferDesc) -> Result<BufferId> {
        if desc.size == 0 {
            return Err(Error::ResourceCreationFailed("buffer size is zero".to_string()));
        }
        if desc.usage.is_empty() {
            return Err(Error::ResourceCreationFailed("buffer has no usage".to_string()));
        }
        Ok(self.buffers.insert(HeadlessBuffer::new(*desc)))
    }

    pub(crate) fn create_texture(&mut self, desc: &TextureDesc) -> Result<TextureId> {
        if desc.width == 0 || desc.height == 0 {
            return Err(Error::ResourceCreationFailed(format!(
                "texture size {}x{} has a zero dimension",
                desc.width, desc.height
            )));
        }
        if desc.format.is_depth_stencil() && desc.flags.contains(TextureFlags::MIP_MAPPED) {
            return Err(Error::ResourceCreationFailed(
                "depth/stencil textures cannot be mip mapped".to_string(),
            ));
        }
        Ok(self.allocate_texture(*desc))
    }

    fn texture_or_err(&self, id: TextureId) -> Result<&HeadlessTexture> {
        self.textures
            .get(id)
            .ok_or_else(|| Error::InvalidResource(format!("unknown texture {:?}", id)))
    }

    fn buffer_or_err(&self, id: BufferId) -> Result<&HeadlessBuffer> {
        self.buffers
            .get(id)
            .ok_or_else(|| Error::InvalidResource(format!("unknown buffer {:?}", id)))
    }

    pub(crate) fn create_render_target(&mut self, desc: &RenderTargetDesc) -> Result<RenderTargetId> {
        if desc.color_attachments.is_empty() && desc.depth_stencil.is_none() {
            return Err(Error::ResourceCreationFailed("render target has no attachments".to_string()));
        }

        let mut size: Option<SurfaceSize> = None;
        for &id in &desc.color_attachments {
            let texture = self.texture_or_err(id)?;
            if texture.desc().format.is_depth_stencil() {
                return Err(Error::ResourceCreationFailed(format!(
                    "{:?} cannot be a color attachment",
                    texture.desc().format
                )));
            }
            check_attachment(texture, &mut size)?;
        }
        if let Some(id) = desc.depth_stencil {
            let texture = self.texture_or_err(id)?;
            if !texture.desc().format.is_depth_stencil() {
                return Err(Error::ResourceCreationFailed(format!(
                    "{:?} cannot be a depth/stencil attachment",
                    texture.desc().format
                )));
            }
            check_attachment(texture, &mut size)?;
        }

        Ok(self.render_targets.insert(desc.clone()))
    }

    pub(crate) fn create_sampler(&mut self, desc: &SamplerDesc) -> SamplerId {
        self.samplers.insert(*desc)
    }

    pub(crate) fn create_bindings(&mut self, entries: &[ShaderResourceBinding]) -> Result<BindingsId> {
        let mut seen = FxHashSet::default();
        for entry in entries {
            if !seen.insert(entry.binding) {
                return Err(Error::ResourceCreationFailed(format!(
                    "binding {} declared twice",
                    entry.binding
                )));
            }
            match entry.resource {
                BindingResource::UniformBuffer(buffer) => {
                    self.check_buffer_usage(buffer, BufferUsage::UNIFORM)?;
                }
                BindingResource::StorageBuffer(buffer) => {
                    self.check_buffer_usage(buffer, BufferUsage::STORAGE)?;
                }
                BindingResource::SampledTexture { texture, sampler } => {
                    self.texture_or_err(texture)?;
                    if !self.samplers.contains_key(sampler) {
                        return Err(Error::InvalidResource(format!("unknown sampler {:?}", sampler)));
                    }
                }
                BindingResource::StorageImage(texture) => {
                    if !self.texture_or_err(texture)?.desc().flags.contains(TextureFlags::STORAGE) {
                        return Err(Error::ResourceCreationFailed(format!(
                            "texture {:?} bound as storage image without STORAGE flag",
                            texture
                        )));
                    }
                }
            }
        }
        Ok(self.bindings.insert(entries.to_vec()))
    }

    fn check_buffer_usage(&self, buffer: BufferId, usage: BufferUsage) -> Result<()> {
        let desc = self.buffer_or_err(buffer)?.desc();
        if !desc.usage.contains(usage) {
            return Err(Error::InvalidResource(format!(
                "buffer {:?} lacks {:?} usage",
                buffer, usage
            )));
        }
        Ok(())
    }

    pub(crate) fn check_bindings(&self, bindings: Option<BindingsId>) -> Result<()> {
        match bindings {
            Some(id) if !self.bindings.contains_key(id) => {
                Err(Error::InvalidResource(format!("unknown bindings {:?}", id)))
            }
            _ => Ok(()),
        }
    }

    pub(crate) fn insert_pipeline(&mut self, pipeline: HeadlessPipeline) -> PipelineId {
        self.pipelines.insert(pipeline)
    }

    /// Color and depth/stencil textures behind a target
    fn attachments(&self, target: RenderTargetRef) -> Result<(Vec<TextureId>, Option<TextureId>)> {
        match target {
            RenderTargetRef::Texture(id) => {
                let desc = self
                    .render_targets
                    .get(id)
                    .ok_or_else(|| Error::InvalidResource(format!("unknown render target {:?}", id)))?;
                Ok((desc.color_attachments.clone(), desc.depth_stencil))
            }
            RenderTargetRef::Swapchain(id) => {
                let swapchain = self
                    .swapchains
                    .get(id)
                    .ok_or_else(|| Error::InvalidResource(format!("unknown swapchain {:?}", id)))?;
                let color = swapchain.color.ok_or_else(|| {
                    Error::InvalidState(format!("swapchain {:?} has not been sized yet", id))
                })?;
                Ok((vec![color], swapchain.depth))
            }
        }
    }

    pub(crate) fn target_info(&self, target: RenderTargetRef) -> Result<RenderTargetInfo> {
        if let RenderTargetRef::Swapchain(id) = target {
            let swapchain = self
                .swapchains
                .get(id)
                .ok_or_else(|| Error::InvalidResource(format!("unknown swapchain {:?}", id)))?;
            return Ok(RenderTargetInfo {
                size: swapchain.size,
                color_formats: vec![swapchain.desc.format],
                has_depth_stencil: swapchain.desc.depth_stencil,
            });
        }

        let (colors, depth) = self.attachments(target)?;
        let mut size = SurfaceSize::default();
        let mut color_formats = Vec::with_capacity(colors.len());
        for id in colors {
            let texture = self.texture_or_err(id)?;
            size = texture.size();
            color_formats.push(texture.desc().format);
        }
        if let Some(id) = depth {
            size = self.texture_or_err(id)?.size();
        }
        Ok(RenderTargetInfo {
            size,
            color_formats,
            has_depth_stencil: depth.is_some(),
        })
    }

    /// Release a resource; unknown ids are ignored
    pub(crate) fn release(&mut self, resource: ResourceId) {
        let removed = match resource {
            ResourceId::Buffer(id) => self.buffers.remove(id).is_some(),
            ResourceId::Texture(id) => self.textures.remove(id).is_some(),
            ResourceId::Sampler(id) => self.samplers.remove(id).is_some(),
            ResourceId::RenderTarget(id) => self.render_targets.remove(id).is_some(),
            ResourceId::Bindings(id) => self.bindings.remove(id).is_some(),
            ResourceId::Pipeline(id) => self.pipelines.remove(id).is_some(),
        };
        if removed {
            cadence_trace!(SOURCE, "Released {:?}", resource);
        }
    }

    // ===== SWAPCHAINS =====

    pub(crate) fn insert_swapchain(&mut self, desc: SwapchainDesc) -> SwapchainId {
        self.swapchains.insert(HeadlessSwapchain {
            desc,
            size: SurfaceSize::default(),
            color: None,
            depth: None,
        })
    }

    /// Size a swapchain; false when `size` is empty
    ///
    /// The presentable buffer is reallocated, the depth/stencil texture is
    /// resized in place so its allocation survives.
    pub(crate) fn resize_swapchain(&mut self, id: SwapchainId, size: SurfaceSize) -> bool {
        let Some(swapchain) = self.swapchains.get(id).cloned() else {
            return false;
        };
        if size.is_empty() {
            if let Some(entry) = self.swapchains.get_mut(id) {
                entry.size = size;
            }
            return false;
        }

        if let Some(old) = swapchain.color {
            self.textures.remove(old);
        }
        let color = self.allocate_texture(TextureDesc::new(
            swapchain.desc.format,
            size.width,
            size.height,
            TextureFlags::RENDER_TARGET | TextureFlags::USED_AS_TRANSFER_SOURCE,
        ));

        let depth = match (swapchain.desc.depth_stencil, swapchain.depth) {
            (false, _) => None,
            (true, Some(depth)) if self.textures.contains_key(depth) => {
                if let Some(texture) = self.textures.get_mut(depth) {
                    texture.resize(size);
                }
                Some(depth)
            }
            (true, _) => Some(self.allocate_texture(TextureDesc::new(
                TextureFormat::D24S8,
                size.width,
                size.height,
                TextureFlags::RENDER_TARGET,
            ))),
        };

        if let Some(entry) = self.swapchains.get_mut(id) {
            entry.size = size;
            entry.color = Some(color);
            entry.depth = depth;
        }
        true
    }

    pub(crate) fn release_swapchain(&mut self, id: SwapchainId) {
        if let Some(swapchain) = self.swapchains.remove(id) {
            for texture in swapchain.color.into_iter().chain(swapchain.depth) {
                self.textures.remove(texture);
            }
        }
    }

    // ===== FRAMES =====

    pub(crate) fn open_frame(&mut self, swapchain: Option<SwapchainId>) -> Result<u64> {
        if self.is_frame_open() {
            return Err(Error::InvalidState("a frame is already open".to_string()));
        }
        self.frames_begun += 1;
        let index = self.frames_begun;
        self.frame = FrameState::Open { index, swapchain };
        self.trace.push(TraceEvent::FrameBegun { index, swapchain });
        Ok(index)
    }

    /// Close the open frame, returning the readbacks it made available
    pub(crate) fn close_frame(&mut self) -> Result<Vec<(Vec<u8>, ReadbackRequest)>> {
        let FrameState::Open { index, .. } = self.frame else {
            return Err(Error::InvalidState("no frame is open".to_string()));
        };
        if self.is_pass_open() {
            return Err(Error::InvalidState("frame ended with a pass still open".to_string()));
        }
        if self.external_open {
            return Err(Error::InvalidState("frame ended inside a native command section".to_string()));
        }
        self.frame = FrameState::Closed;
        self.trace.push(TraceEvent::FrameEnded { index });
        Ok(self.take_readbacks())
    }

    pub(crate) fn take_readbacks(&mut self) -> Vec<(Vec<u8>, ReadbackRequest)> {
        std::mem::take(&mut self.pending_readbacks)
    }

    fn require_frame(&self) -> Result<()> {
        if self.is_frame_open() {
            Ok(())
        } else {
            Err(Error::InvalidState("no frame is open".to_string()))
        }
    }

    fn require_graphics_pass(&self, what: &str) -> Result<()> {
        match self.pass {
            PassState::Graphics { .. } => Ok(()),
            _ => Err(Error::InvalidState(format!("{} outside a graphics pass", what))),
        }
    }

    fn require_compute_pass(&self, what: &str) -> Result<()> {
        match self.pass {
            PassState::Compute => Ok(()),
            _ => Err(Error::InvalidState(format!("{} outside a compute pass", what))),
        }
    }

    fn reset_bound_state(&mut self) {
        self.pipeline = None;
        self.bound_bindings = None;
        self.vertex_input = None;
    }

    // ===== UPDATE BATCHES =====

    fn check_record(&self, record: &UploadRecord) -> Result<()> {
        match record {
            UploadRecord::StaticUpload { buffer, offset, data } => {
                self.buffer_or_err(*buffer)?.check_write(*offset, data.len(), false)
            }
            UploadRecord::DynamicUpdate { buffer, offset, data } => {
                self.buffer_or_err(*buffer)?.check_write(*offset, data.len(), true)
            }
            UploadRecord::TextureUpload { texture, mip_level, data } => {
                self.texture_or_err(*texture)?.check_upload(*mip_level, data.len())
            }
            UploadRecord::MipGeneration { texture } => self.texture_or_err(*texture)?.check_mip_generation(),
            UploadRecord::Readback(request) => self.check_readback(&request.source),
        }
    }

    fn check_readback(&self, source: &ReadbackSource) -> Result<()> {
        match *source {
            ReadbackSource::Texture { texture, mip_level } => {
                let texture = self.texture_or_err(texture)?;
                if !texture.desc().flags.contains(TextureFlags::USED_AS_TRANSFER_SOURCE) {
                    return Err(Error::InvalidResource(
                        "readback from a texture without USED_AS_TRANSFER_SOURCE".to_string(),
                    ));
                }
                texture.level(mip_level).map(|_| ()).ok_or_else(|| {
                    Error::InvalidResource(format!("readback of missing mip level {}", mip_level))
                })
            }
            ReadbackSource::Buffer { buffer, offset, size } => {
                self.buffer_or_err(buffer)?.check_range(offset, size)
            }
            ReadbackSource::Swapchain(id) => self.attachments(RenderTargetRef::Swapchain(id)).map(|_| ()),
        }
    }

    fn read(&self, source: &ReadbackSource) -> Result<Vec<u8>> {
        match *source {
            ReadbackSource::Texture { texture, mip_level } => self
                .texture_or_err(texture)?
                .level(mip_level)
                .map(<[u8]>::to_vec)
                .ok_or_else(|| Error::InvalidResource(format!("missing mip level {}", mip_level))),
            ReadbackSource::Buffer { buffer, offset, size } => self.buffer_or_err(buffer)?.read(offset, size),
            ReadbackSource::Swapchain(id) => {
                let (colors, _) = self.attachments(RenderTargetRef::Swapchain(id))?;
                let color = colors
                    .first()
                    .copied()
                    .ok_or_else(|| cadence_err!(SOURCE, "Swapchain {:?} has no color buffer", id))?;
                self.read(&ReadbackSource::Texture { texture: color, mip_level: 0 })
            }
        }
    }

    /// Apply a batch: every record is checked first, then writes run in
    /// insertion order, then readbacks capture the resulting contents
    ///
    /// A rejected batch changes nothing and its readbacks never complete.
    fn apply_batch(&mut self, batch: ResourceUpdateBatch) -> Result<usize> {
        for record in batch.records() {
            self.check_record(record)?;
        }

        let count = batch.len();
        let (writes, readbacks) = batch.into_writes_and_readbacks();
        for write in writes {
            match write {
                UploadRecord::StaticUpload { buffer, offset, data }
                | UploadRecord::DynamicUpdate { buffer, offset, data } => {
                    if let Some(target) = self.buffers.get_mut(buffer) {
                        target.write(offset, &data);
                    }
                }
                UploadRecord::TextureUpload { texture, mip_level, data } => {
                    if let Some(target) = self.textures.get_mut(texture) {
                        target.upload(mip_level, &data)?;
                    }
                }
                UploadRecord::MipGeneration { texture } => {
                    if let Some(target) = self.textures.get_mut(texture) {
                        target.generate_mips()?;
                    }
                }
                UploadRecord::Readback(_) => {}
            }
        }
        for request in readbacks {
            let data = self.read(&request.source)?;
            self.pending_readbacks.push((data, request));
        }
        Ok(count)
    }

    fn apply_optional(&mut self, batch: Option<ResourceUpdateBatch>) -> Result<usize> {
        match batch {
            Some(batch) => self.apply_batch(batch),
            None => Ok(0),
        }
    }

    // ===== DRAW STATE =====

    /// Explicitly bound set, or the bound pipeline's default set
    fn active_bindings(&self, pipeline: PipelineId) -> Vec<ShaderResourceBinding> {
        let id = self
            .bound_bindings
            .or_else(|| self.pipelines.get(pipeline).and_then(HeadlessPipeline::default_bindings));
        id.and_then(|id| self.bindings.get(id)).cloned().unwrap_or_default()
    }

    fn bound_pipeline(&self, graphics: bool) -> Result<PipelineId> {
        let kind = if graphics { "graphics" } else { "compute" };
        let pipeline = self
            .pipeline
            .ok_or_else(|| Error::InvalidState(format!("no {} pipeline bound", kind)))?;
        match (self.pipelines.get(pipeline), graphics) {
            (Some(HeadlessPipeline::Graphics { .. }), true) | (Some(HeadlessPipeline::Compute { .. }), false) => {
                Ok(pipeline)
            }
            (Some(_), _) => Err(Error::InvalidState(format!("bound pipeline is not a {} pipeline", kind))),
            (None, _) => Err(Error::InvalidResource(format!("pipeline {:?} was released", pipeline))),
        }
    }

    fn record_draw(&mut self, count: u32, indexed: bool) -> Result<()> {
        let PassState::Graphics { target, ref attachments, .. } = self.pass else {
            return Err(Error::InvalidState("draw outside a graphics pass".to_string()));
        };
        let pipeline = self.bound_pipeline(true)?;
        let entries = self.active_bindings(pipeline);

        if self.validation {
            let hazard = entries.iter().find_map(|entry| match entry.resource {
                BindingResource::SampledTexture { texture, .. } | BindingResource::StorageImage(texture)
                    if attachments.contains(&texture) =>
                {
                    Some(texture)
                }
                _ => None,
            });
            if let Some(texture) = hazard {
                return Err(Error::InvalidState(format!(
                    "feedback hazard: texture {:?} is sampled while being rendered into",
                    texture
                )));
            }
        }

        let mut uniforms = Vec::new();
        for entry in &entries {
            if let BindingResource::UniformBuffer(buffer) = entry.resource {
                let data = self.buffer_or_err(buffer)?.data().to_vec();
                uniforms.push((buffer, data));
            }
        }
        let sampled = entries.iter().filter_map(ShaderResourceBinding::sampled).collect();

        self.trace.push(TraceEvent::Draw(DrawRecord {
            target,
            pipeline,
            count,
            indexed,
            uniforms,
            sampled,
        }));
        Ok(())
    }

    fn record_dispatch(&mut self, x: u32, y: u32, z: u32, indirect: bool) -> Result<()> {
        self.require_compute_pass("dispatch")?;
        let pipeline = self.bound_pipeline(false)?;
        for entry in self.active_bindings(pipeline) {
            match entry.resource {
                BindingResource::UniformBuffer(buffer) | BindingResource::StorageBuffer(buffer) => {
                    self.buffer_or_err(buffer)?;
                }
                BindingResource::SampledTexture { texture, .. } | BindingResource::StorageImage(texture) => {
                    self.texture_or_err(texture)?;
                }
            }
        }
        self.trace.push(TraceEvent::Dispatch { x, y, z, indirect });
        Ok(())
    }

    /// Resolve dispatches queued on the native command object
    fn flush_native(&mut self) -> Result<()> {
        for (buffer, offset) in std::mem::take(&mut self.native.indirect) {
            self.check_buffer_usage(buffer, BufferUsage::INDIRECT)?;
            let args = self.buffer_or_err(buffer)?.read(offset, 12)?;
            let [x, y, z] = bytemuck::pod_read_unaligned::<[u32; 3]>(&args);
            self.record_dispatch(x, y, z, true)?;
        }
        Ok(())
    }
}

fn check_attachment(texture: &HeadlessTexture, size: &mut Option<SurfaceSize>) -> Result<()> {
    if !texture.desc().flags.contains(TextureFlags::RENDER_TARGET) {
        return Err(Error::ResourceCreationFailed(
            "attachment texture lacks the RENDER_TARGET flag".to_string(),
        ));
    }
    match *size {
        Some(expected) if expected != texture.size() => Err(Error::ResourceCreationFailed(format!(
            "attachment sizes differ ({} vs {})",
            expected,
            texture.size()
        ))),
        _ => {
            *size = Some(texture.size());
            Ok(())
        }
    }
}

impl CommandBuffer for HeadlessContext {
    fn resource_update(&mut self, updates: ResourceUpdateBatch) -> Result<()> {
        self.require_frame()?;
        if self.is_pass_open() {
            return Err(Error::InvalidState("standalone resource update inside a pass".to_string()));
        }
        let updates = self.apply_batch(updates)?;
        self.trace.push(TraceEvent::ResourceUpdate { updates });
        Ok(())
    }

    fn begin_pass(
        &mut self,
        target: RenderTargetRef,
        clear: ClearValue,
        updates: Option<ResourceUpdateBatch>,
    ) -> Result<()> {
        self.require_frame()?;
        if self.is_pass_open() {
            return Err(Error::InvalidState("a pass is already open".to_string()));
        }
        if let (RenderTargetRef::Swapchain(requested), FrameState::Open { swapchain, .. }) = (target, self.frame) {
            if swapchain != Some(requested) {
                return Err(Error::InvalidState("pass targets a swapchain this frame does not present".to_string()));
            }
        }

        let (colors, depth) = self.attachments(target)?;
        let updates = self.apply_optional(updates)?;

        for &id in &colors {
            if let Some(texture) = self.textures.get_mut(id) {
                texture.clear_color(clear.color);
            }
        }
        if let Some(texture) = depth.and_then(|id| self.textures.get_mut(id)) {
            texture.clear_depth_stencil(clear.depth, clear.stencil);
        }

        self.pass = PassState::Graphics {
            target,
            color_count: colors.len(),
            attachments: colors.into_iter().chain(depth).collect(),
        };
        self.reset_bound_state();
        self.trace.push(TraceEvent::PassBegun { target, updates });
        Ok(())
    }

    fn end_pass(&mut self, updates: Option<ResourceUpdateBatch>) -> Result<()> {
        self.require_graphics_pass("end_pass")?;
        self.pass = PassState::None;
        self.reset_bound_state();
        let updates = self.apply_optional(updates)?;
        self.trace.push(TraceEvent::PassEnded { updates });
        Ok(())
    }

    fn begin_compute_pass(&mut self, updates: Option<ResourceUpdateBatch>) -> Result<()> {
        self.require_frame()?;
        if self.is_pass_open() {
            return Err(Error::InvalidState("a pass is already open".to_string()));
        }
        let updates = self.apply_optional(updates)?;
        self.pass = PassState::Compute;
        self.reset_bound_state();
        self.trace.push(TraceEvent::ComputePassBegun { updates });
        Ok(())
    }

    fn end_compute_pass(&mut self, updates: Option<ResourceUpdateBatch>) -> Result<()> {
        self.require_compute_pass("end_compute_pass")?;
        self.pass = PassState::None;
        self.reset_bound_state();
        let updates = self.apply_optional(updates)?;
        self.trace.push(TraceEvent::ComputePassEnded { updates });
        Ok(())
    }

    fn set_graphics_pipeline(&mut self, pipeline: PipelineId) -> Result<()> {
        let PassState::Graphics { color_count, .. } = self.pass else {
            return Err(Error::InvalidState("graphics pipeline bound outside a graphics pass".to_string()));
        };
        match self.pipelines.get(pipeline) {
            Some(HeadlessPipeline::Graphics { blend_count, .. }) if *blend_count != color_count => {
                Err(Error::InvalidState(format!(
                    "pipeline has {} blend states but the target has {} color attachments",
                    blend_count, color_count
                )))
            }
            Some(HeadlessPipeline::Graphics { .. }) => {
                self.pipeline = Some(pipeline);
                Ok(())
            }
            Some(HeadlessPipeline::Compute { .. }) => {
                Err(Error::InvalidState("compute pipeline bound in a graphics pass".to_string()))
            }
            None => Err(Error::InvalidResource(format!("unknown pipeline {:?}", pipeline))),
        }
    }

    fn set_compute_pipeline(&mut self, pipeline: PipelineId) -> Result<()> {
        self.require_compute_pass("compute pipeline bound")?;
        match self.pipelines.get(pipeline) {
            Some(HeadlessPipeline::Compute { .. }) => {
                self.pipeline = Some(pipeline);
                Ok(())
            }
            Some(HeadlessPipeline::Graphics { .. }) => {
                Err(Error::InvalidState("graphics pipeline bound in a compute pass".to_string()))
            }
            None => Err(Error::InvalidResource(format!("unknown pipeline {:?}", pipeline))),
        }
    }

    fn set_shader_resources(&mut self, bindings: Option<BindingsId>) -> Result<()> {
        if !self.is_pass_open() {
            return Err(Error::InvalidState("shader resources bound outside a pass".to_string()));
        }
        self.check_bindings(bindings)?;
        self.bound_bindings = bindings;
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.require_graphics_pass("set_viewport")?;
        if viewport.width < 0.0 || viewport.height < 0.0 {
            return Err(Error::InvalidState(format!(
                "negative viewport size {}x{}",
                viewport.width, viewport.height
            )));
        }
        Ok(())
    }

    fn set_vertex_input(&mut self, input: &VertexInput) -> Result<()> {
        self.require_graphics_pass("set_vertex_input")?;
        for &(buffer, _) in &input.vertex_buffers {
            self.check_buffer_usage(buffer, BufferUsage::VERTEX)?;
        }
        if let Some((buffer, _, _)) = input.index_buffer {
            self.check_buffer_usage(buffer, BufferUsage::INDEX)?;
        }
        self.vertex_input = Some(input.clone());
        Ok(())
    }

    fn draw(&mut self, vertex_count: u32, _first_vertex: u32) -> Result<()> {
        self.record_draw(vertex_count, false)
    }

    fn draw_indexed(&mut self, index_count: u32, _first_index: u32, _vertex_offset: i32) -> Result<()> {
        let has_index_buffer = self
            .vertex_input
            .as_ref()
            .is_some_and(|input| input.index_buffer.is_some());
        if !has_index_buffer {
            return Err(Error::InvalidState("indexed draw without an index buffer".to_string()));
        }
        self.record_draw(index_count, true)
    }

    fn dispatch(&mut self, x: u32, y: u32, z: u32) -> Result<()> {
        self.record_dispatch(x, y, z, false)
    }

    fn begin_external(&mut self) -> Result<()> {
        self.require_frame()?;
        if self.external_open {
            return Err(Error::InvalidState("native command section already open".to_string()));
        }
        self.external_open = true;
        Ok(())
    }

    fn end_external(&mut self) -> Result<()> {
        if !self.external_open {
            return Err(Error::InvalidState("no native command section is open".to_string()));
        }
        self.external_open = false;
        self.flush_native()
    }

    fn native_handles(&mut self) -> Option<&mut dyn Any> {
        if self.external_open {
            Some(&mut self.native)
        } else {
            None
        }
    }
}

#[cfg(test)]
#[path = "headless_context_tests.rs"]
mod tests;
