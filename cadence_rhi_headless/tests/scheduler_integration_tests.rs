//! Integration tests for FrameScheduler on the headless backend
//!
//! Surface resizes, suspension, out-of-date acquires and teardown, observed
//! through the scheduler stats and the backend trace.
//!
//! Run with: cargo test -p cadence_rhi_headless --test scheduler_integration_tests


use std::sync::{Arc, Mutex};
use cadence_rhi::cadence::backend::ClearValue;
use cadence_rhi::cadence::frame::{
    Frame, ReadbackSource, SchedulerState, SkipReason, SurfaceSize, TickOutcome,
};
use cadence_rhi::cadence::{FrameRenderer, Result};
use headless_test_utils::{harness, ClearRenderer};

const SIZE: SurfaceSize = SurfaceSize::new(800, 600);

// ============================================================================
// STARTUP
// ============================================================================

#[test]
fn test_integration_nothing_happens_before_exposure() {
    let mut h = harness(SIZE);
    let mut renderer = ClearRenderer::default();

    assert_eq!(h.scheduler.tick(&mut renderer).unwrap(), TickOutcome::Idle);
    h.scheduler.on_expose(false, SIZE, &mut renderer).unwrap();

    assert_eq!(h.scheduler.state(), SchedulerState::Uninitialized);
    assert!(h.scheduler.backend().is_none());
    assert!(h.trace.is_empty());
}

#[test]
fn test_integration_first_exposure_renders() {
    let mut h = harness(SIZE);
    let mut renderer = ClearRenderer::default();
    h.expose(&mut renderer).unwrap();

    assert_eq!(h.scheduler.state(), SchedulerState::Ready);
    assert_eq!(h.scheduler.stats().frames_rendered, 1);
    assert_eq!(h.scheduler.stats().swapchain_recreations, 1);
    assert_eq!(h.scheduler.swapchain().unwrap().tracked_size(), SIZE);
    assert_eq!(h.trace.frames_begun(), 1);
    assert_eq!(renderer.resizes, vec![SIZE]);
    assert!(h.scheduler.take_redraw_request());
}

// ============================================================================
// RESIZE AND SUSPENSION
// ============================================================================

#[test]
fn test_integration_zero_size_suspends_and_resume_recreates_once() {
    let mut h = harness(SIZE);
    let mut renderer = ClearRenderer::default();
    h.expose(&mut renderer).unwrap();

    h.resize(SurfaceSize::new(0, 0));
    assert_eq!(h.scheduler.state(), SchedulerState::Suspended);
    for _ in 0..3 {
        assert_eq!(
            h.scheduler.tick(&mut renderer).unwrap(),
            TickOutcome::Skipped(SkipReason::Suspended)
        );
    }
    // No acquire while suspended
    assert_eq!(h.trace.frames_begun(), 1);

    let recreations = h.scheduler.stats().swapchain_recreations;
    h.resize(SIZE);
    assert_eq!(h.scheduler.state(), SchedulerState::Ready);
    assert!(matches!(h.scheduler.tick(&mut renderer).unwrap(), TickOutcome::Rendered { .. }));

    assert_eq!(h.scheduler.stats().swapchain_recreations, recreations + 1);
    assert_eq!(h.trace.frames_begun(), 2);
    assert_eq!(h.scheduler.swapchain().unwrap().tracked_size(), SIZE);
}

#[test]
fn test_integration_resize_recreates_before_next_frame() {
    let mut h = harness(SIZE);
    let mut renderer = ClearRenderer::default();
    h.expose(&mut renderer).unwrap();

    let larger = SurfaceSize::new(1024, 768);
    h.resize(larger);
    h.scheduler.tick(&mut renderer).unwrap();
    // A second tick at the same size does not recreate again
    h.scheduler.tick(&mut renderer).unwrap();

    let stats = h.scheduler.stats();
    assert_eq!(stats.swapchain_recreations, 2);
    assert_eq!(stats.frames_rendered, 3);
    assert_eq!(h.scheduler.swapchain().unwrap().tracked_size(), larger);
    assert_eq!(h.scheduler.frame_info().size, larger);
    assert_eq!(renderer.resizes, vec![SIZE, larger]);
}

#[test]
fn test_integration_surface_change_without_event_is_caught_by_size_check() {
    let mut h = harness(SIZE);
    let mut renderer = ClearRenderer::default();
    h.expose(&mut renderer).unwrap();

    // The platform changed the surface but the resize event is still in flight
    h.surface.set_size(SurfaceSize::new(640, 480));
    assert!(matches!(h.scheduler.tick(&mut renderer).unwrap(), TickOutcome::Rendered { .. }));

    assert_eq!(h.scheduler.swapchain().unwrap().tracked_size(), SurfaceSize::new(640, 480));
    assert_eq!(h.scheduler.stats().out_of_date_retries, 0);
}

#[test]
fn test_integration_depth_attachment_survives_resize() {
    let mut h = harness(SIZE);
    let mut renderer = ClearRenderer::default();
    h.expose(&mut renderer).unwrap();
    let id = h.swapchain_id();

    let (depth, allocation) = h.with_context(|ctx| {
        let depth = ctx.swapchain(id).unwrap().depth.unwrap();
        (depth, ctx.texture(depth).unwrap().allocation())
    });

    h.resize(SurfaceSize::new(300, 200));
    h.scheduler.tick(&mut renderer).unwrap();

    h.with_context(|ctx| {
        let swapchain = ctx.swapchain(id).unwrap();
        assert_eq!(swapchain.depth, Some(depth));
        let texture = ctx.texture(depth).unwrap();
        assert_eq!(texture.allocation(), allocation);
        assert_eq!(texture.size(), SurfaceSize::new(300, 200));
    });
}

// ============================================================================
// OUT OF DATE
// ============================================================================

#[test]
fn test_integration_out_of_date_once_retries_in_same_tick() {
    let mut h = harness(SIZE);
    let mut renderer = ClearRenderer::default();
    h.expose(&mut renderer).unwrap();
    let frames_begun = h.trace.frames_begun();
    let recreations = h.scheduler.stats().swapchain_recreations;

    h.surface.inject_out_of_date(1);
    let outcome = h.scheduler.tick(&mut renderer).unwrap();

    assert!(matches!(outcome, TickOutcome::Rendered { .. }));
    let stats = h.scheduler.stats();
    assert_eq!(stats.out_of_date_retries, 1);
    assert_eq!(stats.swapchain_recreations, recreations + 1);
    // Exactly one open frame, not two
    assert_eq!(h.trace.frames_begun(), frames_begun + 1);
    assert_eq!(renderer.frames, 2);
}

#[test]
fn test_integration_out_of_date_twice_skips_tick() {
    let mut h = harness(SIZE);
    let mut renderer = ClearRenderer::default();
    h.expose(&mut renderer).unwrap();
    let frames_begun = h.trace.frames_begun();

    h.surface.inject_out_of_date(2);
    assert_eq!(
        h.scheduler.tick(&mut renderer).unwrap(),
        TickOutcome::Skipped(SkipReason::OutOfDate)
    );
    assert_eq!(h.trace.frames_begun(), frames_begun);
    assert!(h.scheduler.take_redraw_request());

    assert!(matches!(h.scheduler.tick(&mut renderer).unwrap(), TickOutcome::Rendered { .. }));
    assert_eq!(h.scheduler.stats().frame_errors, 0);
}

// ============================================================================
// READBACK
// ============================================================================

/// Clears the swapchain and reads it back when the pass ends
struct CaptureRenderer {
    clear: ClearValue,
    captured: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl FrameRenderer for CaptureRenderer {
    fn on_frame(&mut self, frame: &mut Frame<'_>) -> Result<()> {
        let target = frame.swapchain_target()?;
        let swapchain = frame.info().swapchain.unwrap();
        let mut end = frame.next_resource_update_batch();
        let sink = self.captured.clone();
        end.add_readback(ReadbackSource::Swapchain(swapchain), move |data| {
            sink.lock().unwrap().push(data.to_vec());
        });
        let pass = frame.begin_graphics_pass(target, self.clear, None)?;
        pass.end(Some(end))
    }
}

#[test]
fn test_integration_swapchain_readback_sees_clear_color() {
    let size = SurfaceSize::new(4, 2);
    let mut h = harness(size);
    let captured = Arc::new(Mutex::new(Vec::new()));
    let mut renderer = CaptureRenderer {
        clear: ClearValue::color(1.0, 0.0, 0.0, 1.0),
        captured: captured.clone(),
    };
    h.expose(&mut renderer).unwrap();

    let captured = captured.lock().unwrap();
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].len(), 4 * 2 * 4);
    // Default swapchain format is BGRA
    assert_eq!(&captured[0][..4], &[0, 0, 255, 255]);
}

// ============================================================================
// TEARDOWN
// ============================================================================

#[test]
fn test_integration_surface_destroyed_releases_backend() {
    let mut h = harness(SIZE);
    let mut renderer = ClearRenderer::default();
    h.expose(&mut renderer).unwrap();

    h.scheduler.on_surface_destroyed(&mut renderer);

    assert!(renderer.released);
    assert_eq!(h.scheduler.state(), SchedulerState::Destroyed);
    assert!(h.scheduler.backend().is_none());
    assert_eq!(h.scheduler.tick(&mut renderer).unwrap(), TickOutcome::Idle);
    h.scheduler.on_expose(true, SIZE, &mut renderer).unwrap();
    assert_eq!(h.scheduler.state(), SchedulerState::Destroyed);
}
