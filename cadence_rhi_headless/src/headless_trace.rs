/// Trace of recorded commands
///
/// The headless backend does not rasterize. Every frame, pass, draw and
/// dispatch is appended to a shared trace instead, and each draw carries a
/// snapshot of the uniform buffers visible to it.

use std::sync::{Arc, Mutex, MutexGuard};
use cadence_rhi::cadence::backend::{BufferId, PipelineId, RenderTargetRef, SwapchainId, TextureId};

/// One traced draw call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawRecord {
    pub target: RenderTargetRef,
    pub pipeline: PipelineId,
    /// Vertex count, or index count for indexed draws
    pub count: u32,
    pub indexed: bool,
    /// Contents of every bound uniform buffer at the time of the draw
    pub uniforms: Vec<(BufferId, Vec<u8>)>,
    /// Textures sampled by the bound resource set
    pub sampled: Vec<TextureId>,
}

impl DrawRecord {
    /// Uniform contents of `buffer` as seen by this draw
    pub fn uniform(&self, buffer: BufferId) -> Option<&[u8]> {
        self.uniforms
            .iter()
            .find(|(id, _)| *id == buffer)
            .map(|(_, data)| data.as_slice())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    FrameBegun { index: u64, swapchain: Option<SwapchainId> },
    FrameEnded { index: u64 },
    PassBegun { target: RenderTargetRef, updates: usize },
    PassEnded { updates: usize },
    ComputePassBegun { updates: usize },
    ComputePassEnded { updates: usize },
    ResourceUpdate { updates: usize },
    Draw(DrawRecord),
    Dispatch { x: u32, y: u32, z: u32, indirect: bool },
}

/// Shared, cloneable trace handle
#[derive(Debug, Clone, Default)]
pub struct HeadlessTrace {
    events: Arc<Mutex<Vec<TraceEvent>>>,
}

impl HeadlessTrace {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<TraceEvent>> {
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn push(&self, event: TraceEvent) {
        self.lock().push(event);
    }

    /// Copy of every event so far
    pub fn events(&self) -> Vec<TraceEvent> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn draws(&self) -> Vec<DrawRecord> {
        self.lock()
            .iter()
            .filter_map(|event| match event {
                TraceEvent::Draw(draw) => Some(draw.clone()),
                _ => None,
            })
            .collect()
    }

    /// Workgroup counts of every dispatch, direct or indirect
    pub fn dispatches(&self) -> Vec<(u32, u32, u32)> {
        self.lock()
            .iter()
            .filter_map(|event| match *event {
                TraceEvent::Dispatch { x, y, z, .. } => Some((x, y, z)),
                _ => None,
            })
            .collect()
    }

    /// Number of frames begun (on-screen and off-screen)
    pub fn frames_begun(&self) -> usize {
        self.lock()
            .iter()
            .filter(|event| matches!(event, TraceEvent::FrameBegun { .. }))
            .count()
    }

    /// Targets of every graphics pass, in order
    pub fn pass_targets(&self) -> Vec<RenderTargetRef> {
        self.lock()
            .iter()
            .filter_map(|event| match *event {
                TraceEvent::PassBegun { target, .. } => Some(target),
                _ => None,
            })
            .collect()
    }
}
