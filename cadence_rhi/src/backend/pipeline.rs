/// Shader, pipeline and shader resource binding descriptors
///
/// Shader compilation happens outside this crate. Pipelines receive compiled
/// bytecode; a backend that cannot consume it fails that pipeline's creation
/// with `Error::ShaderCompileFailed` and nothing else.

use bitflags::bitflags;
use crate::backend::{BindingsId, BufferId, RenderTargetRef, SamplerId, TextureId};

/// Shader stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Compute,
}

bitflags! {
    /// Set of stages a binding is visible to
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShaderStages: u32 {
        const VERTEX = 1 << 0;
        const FRAGMENT = 1 << 1;
        const COMPUTE = 1 << 2;
    }
}

impl From<ShaderStage> for ShaderStages {
    fn from(stage: ShaderStage) -> Self {
        match stage {
            ShaderStage::Vertex => ShaderStages::VERTEX,
            ShaderStage::Fragment => ShaderStages::FRAGMENT,
            ShaderStage::Compute => ShaderStages::COMPUTE,
        }
    }
}

/// Compiled shader module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderDesc {
    pub stage: ShaderStage,
    /// Backend-consumable bytecode
    pub code: Vec<u8>,
    pub entry_point: String,
}

impl ShaderDesc {
    /// Shader with the conventional `main` entry point
    pub fn new(stage: ShaderStage, code: impl Into<Vec<u8>>) -> Self {
        Self {
            stage,
            code: code.into(),
            entry_point: "main".to_string(),
        }
    }
}

// ===== SHADER RESOURCE BINDINGS =====

/// Resource bound at one binding point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingResource {
    UniformBuffer(BufferId),
    StorageBuffer(BufferId),
    SampledTexture { texture: TextureId, sampler: SamplerId },
    /// Load/store image access (compute)
    StorageImage(TextureId),
}

/// One entry of a shader resource bindings set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderResourceBinding {
    pub binding: u32,
    pub stages: ShaderStages,
    pub resource: BindingResource,
}

impl ShaderResourceBinding {
    pub fn uniform_buffer(binding: u32, stages: ShaderStages, buffer: BufferId) -> Self {
        Self { binding, stages, resource: BindingResource::UniformBuffer(buffer) }
    }

    pub fn storage_buffer(binding: u32, stages: ShaderStages, buffer: BufferId) -> Self {
        Self { binding, stages, resource: BindingResource::StorageBuffer(buffer) }
    }

    pub fn sampled_texture(
        binding: u32,
        stages: ShaderStages,
        texture: TextureId,
        sampler: SamplerId,
    ) -> Self {
        Self {
            binding,
            stages,
            resource: BindingResource::SampledTexture { texture, sampler },
        }
    }

    pub fn storage_image(binding: u32, stages: ShaderStages, texture: TextureId) -> Self {
        Self { binding, stages, resource: BindingResource::StorageImage(texture) }
    }

    /// Texture read through a sampler, if any
    pub fn sampled(&self) -> Option<TextureId> {
        match self.resource {
            BindingResource::SampledTexture { texture, .. } => Some(texture),
            _ => None,
        }
    }
}

// ===== GRAPHICS PIPELINES =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcAlpha,
    OneMinusSrcAlpha,
}

/// Blend state of one color attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendState {
    pub enabled: bool,
    pub src_color: BlendFactor,
    pub dst_color: BlendFactor,
    pub src_alpha: BlendFactor,
    pub dst_alpha: BlendFactor,
}

impl BlendState {
    /// Premultiplied-free "over" blending
    pub fn alpha_blended() -> Self {
        Self {
            enabled: true,
            src_color: BlendFactor::SrcAlpha,
            dst_color: BlendFactor::OneMinusSrcAlpha,
            src_alpha: BlendFactor::One,
            dst_alpha: BlendFactor::OneMinusSrcAlpha,
        }
    }
}

impl Default for BlendState {
    fn default() -> Self {
        Self {
            enabled: false,
            src_color: BlendFactor::One,
            dst_color: BlendFactor::Zero,
            src_alpha: BlendFactor::One,
            dst_alpha: BlendFactor::Zero,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topology {
    TriangleList,
    TriangleStrip,
    LineList,
    PointList,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexFormat {
    U16,
    U32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexFormat {
    Float2,
    Float3,
    Float4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    pub location: u32,
    pub format: VertexFormat,
    pub offset: u32,
}

/// Interleaved single-binding vertex layout
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VertexLayout {
    pub stride: u32,
    pub attributes: Vec<VertexAttribute>,
}

/// Graphics pipeline descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct GraphicsPipelineDesc {
    pub vertex_shader: ShaderDesc,
    pub fragment_shader: ShaderDesc,
    pub vertex_layout: VertexLayout,
    pub topology: Topology,
    pub depth_test: bool,
    pub depth_write: bool,
    /// One blend state per color attachment of `target`
    pub blend: Vec<BlendState>,
    /// Render target the pipeline must be compatible with
    pub target: RenderTargetRef,
    /// Default bindings (also the layout), used when a pass binds `None`
    pub bindings: Option<BindingsId>,
}

impl GraphicsPipelineDesc {
    /// Single attachment, triangle list, no depth, no blending
    pub fn new(vertex_shader: ShaderDesc, fragment_shader: ShaderDesc, target: RenderTargetRef) -> Self {
        Self {
            vertex_shader,
            fragment_shader,
            vertex_layout: VertexLayout::default(),
            topology: Topology::TriangleList,
            depth_test: false,
            depth_write: false,
            blend: vec![BlendState::default()],
            target,
            bindings: None,
        }
    }
}

/// Compute pipeline descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputePipelineDesc {
    pub shader: ShaderDesc,
    /// Workgroup size declared by the shader
    pub local_size: (u32, u32, u32),
    pub bindings: Option<BindingsId>,
}
