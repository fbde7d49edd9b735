/// Backend boundary: traits, descriptors and resource ids

mod backend;
mod command_buffer;
mod pipeline;
mod registry;
mod resource;

pub use backend::{
    Backend, BackendInfo, FrameOpResult, SwapchainDesc, clip_space_correction,
};
pub use command_buffer::{CommandBuffer, ClearValue, Viewport, VertexInput};
pub use pipeline::{
    BindingResource, BlendFactor, BlendState, ComputePipelineDesc, GraphicsPipelineDesc,
    IndexFormat, ShaderDesc, ShaderResourceBinding, ShaderStage, ShaderStages, Topology,
    VertexAttribute, VertexFormat, VertexLayout,
};
pub use registry::{BackendFactory, BackendRegistry};
pub use resource::{
    AddressMode, BindingsId, BufferDesc, BufferId, BufferKind, BufferUsage, Filter,
    PipelineId, RenderTargetDesc, RenderTargetId, RenderTargetInfo, RenderTargetRef,
    ResourceId, SamplerDesc, SamplerId, SwapchainId, TextureDesc, TextureFlags,
    TextureFormat, TextureId,
};

#[cfg(test)]
pub(crate) mod mock_backend;
