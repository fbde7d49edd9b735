/// Pass action trait and implementations.
///
/// Defines what a graphics pass records once the coordinator has opened it,
/// bound its pipeline and bindings, and set the viewport.

use crate::backend::VertexInput;
use crate::error::Result;
use crate::frame::GraphicsPass;

/// Action executed inside a graphics pass
pub trait PassAction {
    /// Record draw commands into the open pass
    fn execute(&mut self, pass: &mut GraphicsPass<'_, '_>) -> Result<()>;
}

/// One draw call of a `DrawAction`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawCall {
    Vertices { vertex_count: u32, first_vertex: u32 },
    Indexed { index_count: u32, first_index: u32, vertex_offset: i32 },
}

/// Data-driven draw list (no closure)
///
/// Binds its vertex input, then issues every draw call in order.
pub struct DrawAction {
    input: VertexInput,
    draws: Vec<DrawCall>,
}

impl DrawAction {
    pub fn new(input: VertexInput) -> Self {
        Self { input, draws: Vec::new() }
    }

    pub fn draw(mut self, vertex_count: u32, first_vertex: u32) -> Self {
        self.draws.push(DrawCall::Vertices { vertex_count, first_vertex });
        self
    }

    pub fn draw_indexed(mut self, index_count: u32, first_index: u32, vertex_offset: i32) -> Self {
        self.draws.push(DrawCall::Indexed { index_count, first_index, vertex_offset });
        self
    }

    pub fn draws(&self) -> &[DrawCall] {
        &self.draws
    }
}

impl PassAction for DrawAction {
    fn execute(&mut self, pass: &mut GraphicsPass<'_, '_>) -> Result<()> {
        pass.set_vertex_input(&self.input)?;
        for draw in &self.draws {
            match *draw {
                DrawCall::Vertices { vertex_count, first_vertex } => {
                    pass.draw(vertex_count, first_vertex)?
                }
                DrawCall::Indexed { index_count, first_index, vertex_offset } => {
                    pass.draw_indexed(index_count, first_index, vertex_offset)?
                }
            }
        }
        Ok(())
    }
}

/// Fullscreen pass action
///
/// Draws a fullscreen triangle (3 vertices, no vertex input). Used for
/// post-processing and for composing feedback targets.
pub struct FullscreenAction;

impl PassAction for FullscreenAction {
    fn execute(&mut self, pass: &mut GraphicsPass<'_, '_>) -> Result<()> {
        pass.draw(3, 0)
    }
}

/// Custom pass action (closure-based)
///
/// Executes a user-provided closure for full control over draw recording.
pub struct CustomAction {
    callback: Box<dyn FnMut(&mut GraphicsPass<'_, '_>) -> Result<()>>,
}

impl CustomAction {
    pub fn new<F>(callback: F) -> Self
    where
        F: FnMut(&mut GraphicsPass<'_, '_>) -> Result<()> + 'static,
    {
        Self { callback: Box::new(callback) }
    }
}

impl PassAction for CustomAction {
    fn execute(&mut self, pass: &mut GraphicsPass<'_, '_>) -> Result<()> {
        (self.callback)(pass)
    }
}
