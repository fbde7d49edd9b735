/// Demo pass program
///
/// One frame of the demo:
/// - compute: fills a 256x256 storage image
/// - "gbuffer": a triangle into two color attachments (albedo + normals) with depth
/// - "trail": fullscreen feedback pass sampling the previous trail texture
/// - "present": fullscreen pass sampling the trail into the swapchain
///
/// Every `READBACK_INTERVAL` frames the albedo attachment is read back and
/// its average color logged.

use cadence_rhi::cadence::{Backend, PassProgram, PingPongSelector, Result};
use cadence_rhi::cadence::backend::{
    BlendState, BufferDesc, BufferId, BufferKind, BufferUsage, ClearValue, ComputePipelineDesc,
    GraphicsPipelineDesc, RenderTargetDesc, RenderTargetRef, ResourceId, SamplerDesc,
    ShaderDesc, ShaderResourceBinding, ShaderStage, ShaderStages, TextureDesc, TextureFlags,
    TextureFormat, TextureId, VertexAttribute, VertexFormat, VertexInput, VertexLayout,
};
use cadence_rhi::cadence::frame::{FrameInfo, ReadbackSource, ResourceUpdateBatch};
use cadence_rhi::cadence::pass::{
    ComputeStage, DispatchGrid, DrawAction, FeedbackLoop, FeedbackSide, FramePlan,
    FullscreenAction, GraphicsStage, StageBindings, StageTarget,
};
use cadence_rhi::{cadence_debug, cadence_info};

const SOURCE: &str = "demo::Program";
const OFFSCREEN: u32 = 256;
const TRAIL_CADENCE: u32 = 60;
const READBACK_INTERVAL: u64 = 300;

/// Clip-space triangle, xyz per vertex
const TRIANGLE: [f32; 9] = [
    -0.6, -0.5, 0.0,
     0.6, -0.5, 0.0,
     0.0,  0.6, 0.0,
];

fn shader(stage: ShaderStage, name: &str) -> ShaderDesc {
    // The headless backend only checks that code is present
    ShaderDesc::new(stage, name.as_bytes().to_vec())
}

#[derive(Default)]
pub struct DemoProgram {
    owned: Vec<ResourceId>,
    uniforms: Option<BufferId>,
    vertices: Option<BufferId>,
    albedo: Option<TextureId>,
}

impl DemoProgram {
    pub fn new() -> Self {
        Self::default()
    }

    fn texture(&mut self, backend: &mut dyn Backend, format: TextureFormat, flags: TextureFlags) -> Result<TextureId> {
        let texture = backend.create_texture(&TextureDesc::new(format, OFFSCREEN, OFFSCREEN, flags))?;
        self.owned.push(ResourceId::Texture(texture));
        Ok(texture)
    }

    fn compute_stage(&mut self, backend: &mut dyn Backend) -> Result<ComputeStage> {
        let image = self.texture(backend, TextureFormat::Rgba8Unorm, TextureFlags::STORAGE)?;
        let bindings = backend.create_shader_resource_bindings(&[ShaderResourceBinding::storage_image(
            0,
            ShaderStages::COMPUTE,
            image,
        )])?;
        self.owned.push(ResourceId::Bindings(bindings));
        let pipeline = backend.create_compute_pipeline(&ComputePipelineDesc {
            shader: shader(ShaderStage::Compute, "noise.comp"),
            local_size: (16, 16, 1),
            bindings: Some(bindings),
        })?;
        self.owned.push(ResourceId::Pipeline(pipeline));

        let groups = OFFSCREEN.div_ceil(16);
        Ok(ComputeStage::new(pipeline, DispatchGrid::Groups { x: groups, y: groups, z: 1 }))
    }

    fn gbuffer_stage(&mut self, backend: &mut dyn Backend) -> Result<GraphicsStage> {
        let color_flags = TextureFlags::RENDER_TARGET | TextureFlags::USED_AS_TRANSFER_SOURCE;
        let albedo = self.texture(backend, TextureFormat::Rgba8Unorm, color_flags)?;
        let normals = self.texture(backend, TextureFormat::Rgba32Float, color_flags)?;
        let depth = self.texture(backend, TextureFormat::D24S8, TextureFlags::RENDER_TARGET)?;
        let target = backend.create_render_target(
            &RenderTargetDesc::new(vec![albedo, normals]).with_depth_stencil(depth),
        )?;
        self.owned.push(ResourceId::RenderTarget(target));

        let uniforms = backend.create_buffer(&BufferDesc::new(BufferKind::Dynamic, BufferUsage::UNIFORM, 80))?;
        let vertices = backend.create_buffer(&BufferDesc::new(
            BufferKind::Immutable,
            BufferUsage::VERTEX,
            std::mem::size_of_val(&TRIANGLE) as u64,
        ))?;
        self.owned.push(ResourceId::Buffer(uniforms));
        self.owned.push(ResourceId::Buffer(vertices));

        let bindings = backend.create_shader_resource_bindings(&[ShaderResourceBinding::uniform_buffer(
            0,
            ShaderStages::VERTEX | ShaderStages::FRAGMENT,
            uniforms,
        )])?;
        self.owned.push(ResourceId::Bindings(bindings));

        let mut desc = GraphicsPipelineDesc::new(
            shader(ShaderStage::Vertex, "gbuffer.vert"),
            shader(ShaderStage::Fragment, "gbuffer.frag"),
            RenderTargetRef::Texture(target),
        );
        desc.vertex_layout = VertexLayout {
            stride: 12,
            attributes: vec![VertexAttribute { location: 0, format: VertexFormat::Float3, offset: 0 }],
        };
        desc.depth_test = true;
        desc.depth_write = true;
        desc.blend = vec![BlendState::default(), BlendState::default()];
        desc.bindings = Some(bindings);
        let pipeline = backend.create_graphics_pipeline(&desc)?;
        self.owned.push(ResourceId::Pipeline(pipeline));

        self.uniforms = Some(uniforms);
        self.vertices = Some(vertices);
        self.albedo = Some(albedo);

        let action = DrawAction::new(VertexInput::vertices(vertices)).draw(3, 0);
        Ok(GraphicsStage::new("gbuffer", StageTarget::Offscreen(target), pipeline, action)
            .with_clear(ClearValue::color(0.05, 0.05, 0.1, 1.0)))
    }

    fn trail_loop(&mut self, backend: &mut dyn Backend) -> Result<(FeedbackLoop, GraphicsStage)> {
        let mut sides = Vec::with_capacity(2);
        for _ in 0..2 {
            let texture = self.texture(backend, TextureFormat::Rgba8Unorm, TextureFlags::RENDER_TARGET)?;
            let target = backend.create_render_target(&RenderTargetDesc::new(vec![texture]))?;
            self.owned.push(ResourceId::RenderTarget(target));
            sides.push(FeedbackSide { target, texture });
        }
        let sampler = backend.create_sampler(&SamplerDesc::default())?;
        self.owned.push(ResourceId::Sampler(sampler));

        let selector = PingPongSelector::new(sides[0], sides[1], TRAIL_CADENCE)?;
        let feedback = FeedbackLoop::new("trail", selector, move |backend: &mut dyn Backend, texture| {
            backend.create_shader_resource_bindings(&[ShaderResourceBinding::sampled_texture(
                0,
                ShaderStages::FRAGMENT,
                texture,
                sampler,
            )])
        });

        let pipeline = backend.create_graphics_pipeline(&GraphicsPipelineDesc::new(
            shader(ShaderStage::Vertex, "fullscreen.vert"),
            shader(ShaderStage::Fragment, "trail.frag"),
            RenderTargetRef::Texture(sides[0].target),
        ))?;
        self.owned.push(ResourceId::Pipeline(pipeline));

        let stage = GraphicsStage::new("trail", StageTarget::FeedbackWrite(0), pipeline, FullscreenAction)
            .with_bindings(StageBindings::FeedbackRead(0));
        Ok((feedback, stage))
    }
}

impl PassProgram for DemoProgram {
    fn create_resources(&mut self, backend: &mut dyn Backend, info: &FrameInfo) -> Result<FramePlan> {
        let compute = self.compute_stage(backend)?;
        let gbuffer = self.gbuffer_stage(backend)?;
        let (feedback, trail) = self.trail_loop(backend)?;

        let swapchain = info.swapchain.map(RenderTargetRef::Swapchain).ok_or_else(|| {
            cadence_rhi::cadence::Error::InvalidState("demo needs a swapchain frame".to_string())
        })?;
        let present = backend.create_graphics_pipeline(&GraphicsPipelineDesc::new(
            shader(ShaderStage::Vertex, "fullscreen.vert"),
            shader(ShaderStage::Fragment, "present.frag"),
            swapchain,
        ))?;
        self.owned.push(ResourceId::Pipeline(present));

        cadence_info!(SOURCE, "Demo resources created ({} objects)", self.owned.len());
        Ok(FramePlan::new()
            .with_compute(compute)
            .with_feedback(feedback)
            .with_graphics(gbuffer)
            .with_graphics(trail)
            .with_graphics(
                GraphicsStage::new("present", StageTarget::Swapchain, present, FullscreenAction)
                    .with_bindings(StageBindings::FeedbackRead(0)),
            ))
    }

    fn upload_static(&mut self, batch: &mut ResourceUpdateBatch) {
        if let Some(vertices) = self.vertices {
            batch.add_static_upload_pod(vertices, 0, &TRIANGLE);
        }
    }

    fn update_dynamic(&mut self, batch: &mut ResourceUpdateBatch, info: &FrameInfo) {
        let Some(uniforms) = self.uniforms else {
            return;
        };
        let seconds = info.index as f32 / 60.0;
        batch.add_dynamic_update_pod(uniforms, 0, &info.view_projection.to_cols_array());
        batch.add_dynamic_update_pod(uniforms, 64, &[seconds, seconds.sin(), seconds.cos(), 1.0]);
    }

    fn pass_finished(&mut self, stage: &str, batch: &mut ResourceUpdateBatch, info: &FrameInfo) {
        if stage != "gbuffer" || info.index % READBACK_INTERVAL != 1 {
            return;
        }
        let Some(albedo) = self.albedo else {
            return;
        };
        let frame = info.index;
        batch.add_readback(ReadbackSource::Texture { texture: albedo, mip_level: 0 }, move |data| {
            let texels = (data.len() / 4).max(1) as u64;
            let mut sums = [0u64; 4];
            for texel in data.chunks_exact(4) {
                for (sum, channel) in sums.iter_mut().zip(texel) {
                    *sum += *channel as u64;
                }
            }
            cadence_info!(
                SOURCE,
                "Frame {} albedo average: [{}, {}, {}, {}]",
                frame,
                sums[0] / texels,
                sums[1] / texels,
                sums[2] / texels,
                sums[3] / texels
            );
        });
    }

    fn resize(&mut self, _backend: &mut dyn Backend, info: &FrameInfo) -> Result<()> {
        cadence_debug!(SOURCE, "Presenting at {}", info.size);
        Ok(())
    }

    fn release(&mut self, backend: &mut dyn Backend) {
        // Dependents first
        for resource in self.owned.drain(..).rev() {
            backend.release(resource);
        }
        self.uniforms = None;
        self.vertices = None;
        self.albedo = None;
    }
}
