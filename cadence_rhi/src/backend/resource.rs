/// Resource identifiers and resource descriptors
///
/// Backends own every resource. The core only ever holds `slotmap` keys, so a
/// released or foreign id is detected by the backend instead of dereferenced.

use bitflags::bitflags;
use slotmap::new_key_type;
use crate::frame::SurfaceSize;

new_key_type! {
    /// Key of a buffer owned by a backend
    pub struct BufferId;
    /// Key of a texture owned by a backend
    pub struct TextureId;
    /// Key of a sampler owned by a backend
    pub struct SamplerId;
    /// Key of an off-screen render target (color textures + optional depth/stencil)
    pub struct RenderTargetId;
    /// Key of a shader resource bindings set
    pub struct BindingsId;
    /// Key of a graphics or compute pipeline
    pub struct PipelineId;
    /// Key of a swapchain (presentable buffers + depth/stencil + pass descriptor)
    pub struct SwapchainId;
}

// ===== BUFFERS =====

/// Update model of a buffer
///
/// `Immutable` and `Static` buffers receive `StaticUpload` records, `Dynamic`
/// buffers receive `DynamicUpdate` records. Backends reject the other combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    /// Uploaded once, never changed afterwards
    Immutable,
    /// Device-local, changed rarely through uploads
    Static,
    /// Host-visible, rewritten every frame
    Dynamic,
}

bitflags! {
    /// How a buffer is bound
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        const VERTEX = 1 << 0;
        const INDEX = 1 << 1;
        const UNIFORM = 1 << 2;
        const STORAGE = 1 << 3;
        /// Source of indirect dispatch/draw arguments
        const INDIRECT = 1 << 4;
    }
}

/// Buffer descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferDesc {
    pub kind: BufferKind,
    pub usage: BufferUsage,
    /// Size in bytes
    pub size: u64,
}

impl BufferDesc {
    pub fn new(kind: BufferKind, usage: BufferUsage, size: u64) -> Self {
        Self { kind, usage, size }
    }
}

// ===== TEXTURES =====

/// Texel formats understood by the layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    Rgba8Unorm,
    Bgra8Unorm,
    R8Unorm,
    R32Float,
    Rgba32Float,
    /// 24-bit depth + 8-bit stencil
    D24S8,
}

impl TextureFormat {
    /// Size of one texel in bytes
    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            TextureFormat::Rgba8Unorm | TextureFormat::Bgra8Unorm => 4,
            TextureFormat::R8Unorm => 1,
            TextureFormat::R32Float => 4,
            TextureFormat::Rgba32Float => 16,
            TextureFormat::D24S8 => 4,
        }
    }

    pub fn is_depth_stencil(self) -> bool {
        matches!(self, TextureFormat::D24S8)
    }
}

bitflags! {
    /// Texture creation flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureFlags: u32 {
        /// Usable as a color or depth/stencil attachment
        const RENDER_TARGET = 1 << 0;
        /// Allocates a full mip chain
        const MIP_MAPPED = 1 << 1;
        /// Load/store image access from compute
        const STORAGE = 1 << 2;
        /// May be read back to the host
        const USED_AS_TRANSFER_SOURCE = 1 << 3;
    }
}

/// Texture descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureDesc {
    pub format: TextureFormat,
    pub width: u32,
    pub height: u32,
    pub flags: TextureFlags,
}

impl TextureDesc {
    pub fn new(format: TextureFormat, width: u32, height: u32, flags: TextureFlags) -> Self {
        Self { format, width, height, flags }
    }

    /// Number of mip levels: a full chain when MIP_MAPPED, otherwise 1
    pub fn mip_level_count(&self) -> u32 {
        if self.flags.contains(TextureFlags::MIP_MAPPED) {
            32 - self.width.max(self.height).max(1).leading_zeros()
        } else {
            1
        }
    }

    /// Pixel size of a given mip level (never below 1x1)
    pub fn level_size(&self, level: u32) -> SurfaceSize {
        SurfaceSize::new((self.width >> level).max(1), (self.height >> level).max(1))
    }

    /// Byte size of a given mip level
    pub fn level_byte_size(&self, level: u32) -> u64 {
        let size = self.level_size(level);
        size.width as u64 * size.height as u64 * self.format.bytes_per_pixel() as u64
    }
}

// ===== SAMPLERS =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Filter {
    Nearest,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressMode {
    Repeat,
    ClampToEdge,
    MirroredRepeat,
}

/// Sampler descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerDesc {
    pub mag_filter: Filter,
    pub min_filter: Filter,
    /// `None` disables mipmapping
    pub mipmap_filter: Option<Filter>,
    pub address_u: AddressMode,
    pub address_v: AddressMode,
}

impl Default for SamplerDesc {
    fn default() -> Self {
        Self {
            mag_filter: Filter::Linear,
            min_filter: Filter::Linear,
            mipmap_filter: None,
            address_u: AddressMode::ClampToEdge,
            address_v: AddressMode::ClampToEdge,
        }
    }
}

// ===== RENDER TARGETS =====

/// Off-screen render target descriptor
///
/// All color attachments and the depth/stencil attachment must share one pixel size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderTargetDesc {
    pub color_attachments: Vec<TextureId>,
    pub depth_stencil: Option<TextureId>,
}

impl RenderTargetDesc {
    pub fn new(color_attachments: Vec<TextureId>) -> Self {
        Self { color_attachments, depth_stencil: None }
    }

    pub fn with_depth_stencil(mut self, texture: TextureId) -> Self {
        self.depth_stencil = Some(texture);
        self
    }
}

/// What a pass renders into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderTargetRef {
    /// The current presentable buffer of a swapchain
    Swapchain(SwapchainId),
    /// An off-screen render target
    Texture(RenderTargetId),
}

/// Resolved properties of a render target, used for viewports and pipeline compatibility
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderTargetInfo {
    pub size: SurfaceSize,
    pub color_formats: Vec<TextureFormat>,
    pub has_depth_stencil: bool,
}

impl RenderTargetInfo {
    pub fn color_attachment_count(&self) -> usize {
        self.color_formats.len()
    }
}

// ===== GENERIC IDS =====

/// Any releasable resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceId {
    Buffer(BufferId),
    Texture(TextureId),
    Sampler(SamplerId),
    RenderTarget(RenderTargetId),
    Bindings(BindingsId),
    Pipeline(PipelineId),
}

impl From<BufferId> for ResourceId {
    fn from(id: BufferId) -> Self {
        ResourceId::Buffer(id)
    }
}

impl From<TextureId> for ResourceId {
    fn from(id: TextureId) -> Self {
        ResourceId::Texture(id)
    }
}

impl From<SamplerId> for ResourceId {
    fn from(id: SamplerId) -> Self {
        ResourceId::Sampler(id)
    }
}

impl From<RenderTargetId> for ResourceId {
    fn from(id: RenderTargetId) -> Self {
        ResourceId::RenderTarget(id)
    }
}

impl From<BindingsId> for ResourceId {
    fn from(id: BindingsId) -> Self {
        ResourceId::Bindings(id)
    }
}

impl From<PipelineId> for ResourceId {
    fn from(id: PipelineId) -> Self {
        ResourceId::Pipeline(id)
    }
}

#[cfg(test)]
#[path = "resource_tests.rs"]
mod tests;
