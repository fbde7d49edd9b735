/// Pass sequencing: coordinator, frame plans, actions and ping-pong selection

pub mod coordinator;
pub mod pass_action;
pub mod ping_pong;
pub mod plan;

pub use coordinator::{PassCoordinator, PassProgram};
pub use pass_action::{CustomAction, DrawAction, DrawCall, FullscreenAction, PassAction};
pub use ping_pong::PingPongSelector;
pub use plan::{
    BindingsFactory, ComputeStage, DispatchGrid, FeedbackLoop, FeedbackSide, FramePlan,
    GraphicsStage, StageBindings, StageTarget,
};
