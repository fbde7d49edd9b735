/// Frame plan - what a `PassCoordinator` records every frame
///
/// A plan is built once by `PassProgram::create_resources` and then replayed
/// each frame: an optional compute stage, one or more graphics stages in
/// order, and the feedback loops whose ping-pong sides those stages use.

use crate::backend::{
    Backend, BindingsId, ClearValue, PipelineId, RenderTargetId, RenderTargetRef, ResourceId,
    TextureId,
};
use crate::error::{Error, Result};
use crate::pass::{PassAction, PingPongSelector};

// ============================================================================
// Compute stage
// ============================================================================

/// Workgroup grid of the compute stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchGrid {
    /// Explicit workgroup counts
    Groups { x: u32, y: u32, z: u32 },
    /// Cover the frame's pixel size with `local` sized groups
    CoverFrame { local: (u32, u32) },
    /// Cover an off-screen render target's pixel size
    CoverTarget { target: RenderTargetId, local: (u32, u32) },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComputeStage {
    pub pipeline: PipelineId,
    pub bindings: Option<BindingsId>,
    pub grid: DispatchGrid,
}

impl ComputeStage {
    pub fn new(pipeline: PipelineId, grid: DispatchGrid) -> Self {
        Self { pipeline, bindings: None, grid }
    }

    pub fn with_bindings(mut self, bindings: BindingsId) -> Self {
        self.bindings = Some(bindings);
        self
    }
}

// ============================================================================
// Graphics stages
// ============================================================================

/// Where a graphics stage renders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageTarget {
    /// Presentable buffer of the current frame
    Swapchain,
    /// Fixed off-screen render target
    Offscreen(RenderTargetId),
    /// Current write side of feedback loop N
    FeedbackWrite(usize),
}

/// Which resource bindings a graphics stage binds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageBindings {
    /// The pipeline's own default set
    Pipeline,
    Fixed(BindingsId),
    /// Bindings sampling the current read side of feedback loop N
    FeedbackRead(usize),
}

pub struct GraphicsStage {
    pub name: String,
    pub target: StageTarget,
    pub clear: ClearValue,
    pub pipeline: PipelineId,
    pub bindings: StageBindings,
    pub action: Box<dyn PassAction>,
}

impl GraphicsStage {
    pub fn new(
        name: impl Into<String>,
        target: StageTarget,
        pipeline: PipelineId,
        action: impl PassAction + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            target,
            clear: ClearValue::default(),
            pipeline,
            bindings: StageBindings::Pipeline,
            action: Box::new(action),
        }
    }

    pub fn with_clear(mut self, clear: ClearValue) -> Self {
        self.clear = clear;
        self
    }

    pub fn with_bindings(mut self, bindings: StageBindings) -> Self {
        self.bindings = bindings;
        self
    }
}

// ============================================================================
// Feedback loops
// ============================================================================

/// One side of a feedback loop: a render target and the texture behind it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedbackSide {
    pub target: RenderTargetId,
    pub texture: TextureId,
}

/// Builds the bindings that sample a feedback loop's read texture
pub type BindingsFactory = Box<dyn FnMut(&mut dyn Backend, TextureId) -> Result<BindingsId>>;

/// Two off-screen targets alternating read/write roles
///
/// Bindings sampling the read side are rebuilt after every swap, before any
/// pass of the frame begins; the previous set is released.
pub struct FeedbackLoop {
    name: String,
    selector: PingPongSelector<FeedbackSide>,
    make_bindings: BindingsFactory,
    bindings: Option<BindingsId>,
    bound_generation: Option<u64>,
}

impl FeedbackLoop {
    pub fn new<F>(name: impl Into<String>, selector: PingPongSelector<FeedbackSide>, make_bindings: F) -> Self
    where
        F: FnMut(&mut dyn Backend, TextureId) -> Result<BindingsId> + 'static,
    {
        Self {
            name: name.into(),
            selector,
            make_bindings: Box::new(make_bindings),
            bindings: None,
            bound_generation: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn selector(&self) -> &PingPongSelector<FeedbackSide> {
        &self.selector
    }

    pub fn read_texture(&self) -> TextureId {
        self.selector.read().texture
    }

    pub fn write_target(&self) -> RenderTargetId {
        self.selector.write().target
    }

    /// Bindings for the current read side, once built
    pub fn bindings(&self) -> Option<BindingsId> {
        self.bindings
    }

    pub(crate) fn advance(&mut self) -> bool {
        let swapped = self.selector.advance();
        if swapped {
            crate::cadence_debug!(
                "cadence::FeedbackLoop",
                "Feedback loop '{}' swapped (generation {})",
                self.name,
                self.selector.generation()
            );
        }
        swapped
    }

    /// Rebuild the read-side bindings if the roles changed since the last build
    pub(crate) fn refresh_bindings(&mut self, backend: &mut dyn Backend) -> Result<()> {
        let generation = self.selector.generation();
        if self.bindings.is_some() && self.bound_generation == Some(generation) {
            return Ok(());
        }
        let texture = self.read_texture();
        let fresh = (self.make_bindings)(backend, texture)?;
        if let Some(old) = self.bindings.replace(fresh) {
            backend.release(ResourceId::Bindings(old));
        }
        self.bound_generation = Some(generation);
        Ok(())
    }

    pub(crate) fn release(&mut self, backend: &mut dyn Backend) {
        if let Some(bindings) = self.bindings.take() {
            backend.release(ResourceId::Bindings(bindings));
        }
        self.bound_generation = None;
    }
}

// ============================================================================
// Plan
// ============================================================================

#[derive(Default)]
pub struct FramePlan {
    pub compute: Option<ComputeStage>,
    pub graphics: Vec<GraphicsStage>,
    pub feedback: Vec<FeedbackLoop>,
}

impl FramePlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_compute(mut self, stage: ComputeStage) -> Self {
        self.compute = Some(stage);
        self
    }

    pub fn with_graphics(mut self, stage: GraphicsStage) -> Self {
        self.graphics.push(stage);
        self
    }

    /// Add a feedback loop; stages refer to it by its index
    pub fn with_feedback(mut self, feedback: FeedbackLoop) -> Self {
        self.feedback.push(feedback);
        self
    }

    /// Check stage ordering rules and feedback indices
    pub fn validate(&self) -> Result<()> {
        if self.graphics.is_empty() {
            return Err(Error::InvalidState("frame plan needs at least one graphics stage".to_string()));
        }
        for stage in &self.graphics {
            let target_loop = match stage.target {
                StageTarget::FeedbackWrite(index) => Some(index),
                _ => None,
            };
            let read_loop = match stage.bindings {
                StageBindings::FeedbackRead(index) => Some(index),
                _ => None,
            };
            for index in target_loop.into_iter().chain(read_loop) {
                if index >= self.feedback.len() {
                    return Err(Error::InvalidState(format!(
                        "stage '{}' refers to feedback loop {} but the plan has {}",
                        stage.name,
                        index,
                        self.feedback.len()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Concrete target of a stage for the current feedback roles
    pub fn resolve_target(&self, target: StageTarget, swapchain: Result<RenderTargetRef>) -> Result<RenderTargetRef> {
        match target {
            StageTarget::Swapchain => swapchain,
            StageTarget::Offscreen(id) => Ok(RenderTargetRef::Texture(id)),
            StageTarget::FeedbackWrite(index) => self
                .feedback
                .get(index)
                .map(|feedback| RenderTargetRef::Texture(feedback.write_target()))
                .ok_or_else(|| Error::InvalidState(format!("unknown feedback loop {}", index))),
        }
    }

    /// Concrete bindings of a stage; `None` selects the pipeline's default set
    pub fn resolve_bindings(&self, bindings: StageBindings) -> Result<Option<BindingsId>> {
        match bindings {
            StageBindings::Pipeline => Ok(None),
            StageBindings::Fixed(id) => Ok(Some(id)),
            StageBindings::FeedbackRead(index) => {
                let feedback = self
                    .feedback
                    .get(index)
                    .ok_or_else(|| Error::InvalidState(format!("unknown feedback loop {}", index)))?;
                feedback.bindings().map(Some).ok_or_else(|| {
                    Error::ResourceUnavailable(format!("feedback loop '{}' has no bindings", feedback.name()))
                })
            }
        }
    }
}
