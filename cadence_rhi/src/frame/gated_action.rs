//! One-shot deferred trigger
//!
//! A gate is requested once and fires once: `ensure` reports the pending request
//! and clears it in the same call. Polling it every frame is cheap and never
//! fires twice for a single request.
//!
//! # Example
//!
//! ```
//! use cadence_rhi::cadence::GatedAction;
//!
//! let mut init = GatedAction::new();
//! init.request();
//! assert!(init.ensure());
//! assert!(!init.ensure());
//! ```

/// Gate state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GateState {
    #[default]
    Idle,
    Requested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GatedAction {
    state: GateState,
}

impl GatedAction {
    /// Idle gate
    pub const fn new() -> Self {
        Self { state: GateState::Idle }
    }

    /// Gate that fires on its first poll
    pub const fn requested() -> Self {
        Self { state: GateState::Requested }
    }

    /// Idle -> Requested. Requesting an already requested gate changes nothing.
    pub fn request(&mut self) {
        self.state = GateState::Requested;
    }

    /// Poll-and-consume: true exactly once per request
    pub fn ensure(&mut self) -> bool {
        std::mem::replace(&mut self.state, GateState::Idle) == GateState::Requested
    }

    /// Drop a pending request without firing
    pub fn cancel(&mut self) {
        self.state = GateState::Idle;
    }

    /// Peek without consuming
    pub fn is_requested(&self) -> bool {
        self.state == GateState::Requested
    }

    pub fn state(&self) -> GateState {
        self.state
    }
}

#[cfg(test)]
#[path = "gated_action_tests.rs"]
mod tests;
