/// PassCoordinator - compute and graphics pass sequencing inside one frame
///
/// The coordinator owns a `PassProgram` and the `FramePlan` it produced. Plan
/// creation and the one-time static upload are each guarded by a `GatedAction`
/// and happen on the first frame after the backend exists, never at construction.
///
/// Per frame:
/// 1. feedback loops advance and their read bindings are rebuilt if they swapped
/// 2. the one-time upload (first frame only) and the dynamic updates are coalesced
///    into one batch, attached to the first pass of the frame; when no pass-begin
///    takes that batch the static upload is queued again for the next frame
/// 3. the optional compute stage runs, then every graphics stage in order

use crate::backend::{Backend, RenderTargetRef};
use crate::error::{Error, Result};
use crate::frame::{Frame, FrameInfo, FrameRenderer, GatedAction, ResourceUpdateBatch};
use crate::pass::{DispatchGrid, FramePlan};

const SOURCE: &str = "cadence::PassCoordinator";

/// Application content driven by a `PassCoordinator`
pub trait PassProgram {
    /// Create backend resources and describe the frame; runs once
    fn create_resources(&mut self, backend: &mut dyn Backend, info: &FrameInfo) -> Result<FramePlan>;

    /// Queue immutable/static data; runs once, after a successful `create_resources`
    fn upload_static(&mut self, _batch: &mut ResourceUpdateBatch) {}

    /// Queue per-frame dynamic updates
    fn update_dynamic(&mut self, _batch: &mut ResourceUpdateBatch, _info: &FrameInfo) {}

    /// Queue work (usually readbacks) applied when the named stage ends
    fn pass_finished(&mut self, _stage: &str, _batch: &mut ResourceUpdateBatch, _info: &FrameInfo) {}

    /// Swapchain was recreated
    fn resize(&mut self, _backend: &mut dyn Backend, _info: &FrameInfo) -> Result<()> {
        Ok(())
    }

    /// Release every resource created by `create_resources`
    fn release(&mut self, _backend: &mut dyn Backend) {}
}

pub struct PassCoordinator<P: PassProgram> {
    program: P,
    plan: Option<FramePlan>,
    init: GatedAction,
    upload: GatedAction,
    setup_error: Option<Error>,
}

impl<P: PassProgram> PassCoordinator<P> {
    pub fn new(program: P) -> Self {
        Self {
            program,
            plan: None,
            init: GatedAction::requested(),
            upload: GatedAction::requested(),
            setup_error: None,
        }
    }

    pub fn program(&self) -> &P {
        &self.program
    }

    pub fn program_mut(&mut self) -> &mut P {
        &mut self.program
    }

    pub fn plan(&self) -> Option<&FramePlan> {
        self.plan.as_ref()
    }

    /// Error of the last failed setup, if the plan is missing because of one
    pub fn setup_error(&self) -> Option<&Error> {
        self.setup_error.as_ref()
    }

    /// Try `create_resources` again on the next frame
    pub fn retry_setup(&mut self) {
        if self.plan.is_none() {
            self.init.request();
        }
    }

    /// Run the init gate; on failure the error is kept and no plan is stored
    fn ensure_plan(&mut self, frame: &mut Frame<'_>) {
        if !self.init.ensure() {
            return;
        }
        let info = *frame.info();
        let created = self
            .program
            .create_resources(frame.backend(), &info)
            .and_then(|plan| plan.validate().map(|_| plan));
        match created {
            Ok(plan) => {
                crate::cadence_debug!(
                    SOURCE,
                    "Pass resources created: {} graphics stage(s), compute: {}, {} feedback loop(s)",
                    plan.graphics.len(),
                    plan.compute.is_some(),
                    plan.feedback.len()
                );
                self.plan = Some(plan);
                self.setup_error = None;
            }
            Err(err) => {
                crate::cadence_warn!(SOURCE, "Pass resource creation failed, passes disabled: {}", err);
                self.program.release(frame.backend());
                self.setup_error = Some(err);
            }
        }
    }

    fn unavailable(&self) -> Error {
        match &self.setup_error {
            Some(err) => Error::ResourceUnavailable(format!("pass resources unavailable: {}", err)),
            None => Error::ResourceUnavailable("pass resources not created".to_string()),
        }
    }

    /// Compute stage then graphics stages; `pending` goes to the first pass-begin
    /// and `accepted` is set once a pass-begin has taken it
    fn record_passes(
        &mut self,
        frame: &mut Frame<'_>,
        info: &FrameInfo,
        pending: &mut Option<ResourceUpdateBatch>,
        accepted: &mut bool,
    ) -> Result<()> {
        let Some(plan) = self.plan.as_mut() else {
            return Err(Error::ResourceUnavailable("pass resources not created".to_string()));
        };

        // Roles swap between frames, before any bindings are used
        for feedback in plan.feedback.iter_mut() {
            feedback.advance();
            feedback.refresh_bindings(frame.backend())?;
        }

        if let Some(stage) = plan.compute {
            let groups = match stage.grid {
                DispatchGrid::Groups { x, y, z } => (x, y, z),
                DispatchGrid::CoverFrame { local } => {
                    let (x, y) = crate::frame::workgroups_covering(info.size, local)?;
                    (x, y, 1)
                }
                DispatchGrid::CoverTarget { target, local } => {
                    let size = frame.backend().render_target_info(RenderTargetRef::Texture(target))?.size;
                    let (x, y) = crate::frame::workgroups_covering(size, local)?;
                    (x, y, 1)
                }
            };
            let mut end = frame.next_resource_update_batch();
            self.program.pass_finished("compute", &mut end, info);

            let mut pass = frame.begin_compute_pass(pending.take())?;
            *accepted = true;
            pass.set_pipeline(stage.pipeline)?;
            pass.set_shader_resources(stage.bindings)?;
            pass.dispatch(groups.0, groups.1, groups.2)?;
            pass.end(end.into_option())?;
        }

        for index in 0..plan.graphics.len() {
            let (target, bindings) = {
                let stage = &plan.graphics[index];
                (
                    plan.resolve_target(stage.target, frame.swapchain_target())?,
                    plan.resolve_bindings(stage.bindings)?,
                )
            };
            let stage = &mut plan.graphics[index];
            let mut end = frame.next_resource_update_batch();
            self.program.pass_finished(&stage.name, &mut end, info);

            let mut pass = frame.begin_graphics_pass(target, stage.clear, pending.take())?;
            *accepted = true;
            pass.set_pipeline(stage.pipeline)?;
            pass.set_shader_resources(bindings)?;
            pass.set_full_viewport()?;
            stage.action.execute(&mut pass)?;
            pass.end(end.into_option())?;
        }
        Ok(())
    }
}

impl<P: PassProgram> FrameRenderer for PassCoordinator<P> {
    fn on_frame(&mut self, frame: &mut Frame<'_>) -> Result<()> {
        self.ensure_plan(frame);
        if self.plan.is_none() {
            return Err(self.unavailable());
        }
        let info = *frame.info();

        // Coalesced first-pass batch
        let mut batch = frame.next_resource_update_batch();
        let static_queued = self.upload.ensure();
        if static_queued {
            self.program.upload_static(&mut batch);
            crate::cadence_debug!(SOURCE, "Static upload queued ({} records)", batch.len());
        }
        self.program.update_dynamic(&mut batch, &info);
        let mut pending = batch.into_option();

        let mut accepted = false;
        let recorded = self.record_passes(frame, &info, &mut pending, &mut accepted);
        // A batch lost before any pass-begin took it never reached the backend
        if static_queued && !accepted {
            self.upload.request();
            crate::cadence_warn!(SOURCE, "Static upload not applied, queued again for the next frame");
        }
        recorded
    }

    fn on_resize(&mut self, backend: &mut dyn Backend, info: &FrameInfo) -> Result<()> {
        if self.plan.is_none() {
            return Ok(());
        }
        self.program.resize(backend, info)
    }

    fn on_release(&mut self, backend: &mut dyn Backend) {
        if let Some(mut plan) = self.plan.take() {
            for feedback in plan.feedback.iter_mut() {
                feedback.release(backend);
            }
            self.program.release(backend);
            crate::cadence_debug!(SOURCE, "Pass resources released");
        }
        self.setup_error = None;
        // A later backend gets a fresh setup
        self.init.request();
        self.upload.request();
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
