/// Frame lifecycle: gating, update batches, surface tracking, frames and the scheduler

mod encoder;
mod frame;
mod gated_action;
mod scheduler;
mod surface;
mod swapchain_state;
mod update_batch;

pub use encoder::{ComputePass, GraphicsPass};
pub use frame::{Frame, FrameInfo, run_offscreen_frame, view_projection, workgroups_covering};
pub use gated_action::{GatedAction, GateState};
pub use scheduler::{
    FrameRenderer, FrameScheduler, SchedulerState, SchedulerStats, SkipReason, TickOutcome,
};
pub use surface::{Surface, SurfaceSize};
pub use swapchain_state::SwapchainState;
pub use update_batch::{
    ReadbackCallback, ReadbackRequest, ReadbackSource, ResourceUpdateBatch, UploadRecord,
};
