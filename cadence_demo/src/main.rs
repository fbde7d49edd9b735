//! Cadence demo
//!
//! Opens a window and drives a `FrameScheduler` from its events. Rendering
//! goes through the backend named by `CADENCE_BACKEND` (the headless
//! reference backend by default), which tracks the window's pixel size
//! through a `HeadlessSurface`.
//!
//! Run with: CADENCE_LOG=debug cargo run -p cadence_demo

mod demo_program;

use cadence_rhi::cadence::{BackendRegistry, Config, FrameScheduler, PassCoordinator};
use cadence_rhi::cadence::frame::{SurfaceSize, TickOutcome};
use cadence_rhi::{cadence_debug, cadence_error, cadence_info};
use cadence_rhi_headless::{HeadlessSurface, HeadlessTrace};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use demo_program::DemoProgram;

const SOURCE: &str = "demo";
const STATS_INTERVAL: u64 = 600;

struct App {
    window: Option<Window>,
    surface: HeadlessSurface,
    trace: HeadlessTrace,
    scheduler: FrameScheduler,
    coordinator: PassCoordinator<DemoProgram>,
    /// Error that stopped the event loop, reported as the exit status
    fatal: Option<Box<dyn std::error::Error>>,
}

impl App {
    fn new(config: Config) -> Self {
        let surface = HeadlessSurface::new(SurfaceSize::default());
        let mut registry = BackendRegistry::new();
        let trace = cadence_rhi_headless::register(&mut registry, surface.clone());
        Self {
            window: None,
            surface,
            trace,
            scheduler: FrameScheduler::new(config, registry),
            coordinator: PassCoordinator::new(DemoProgram::new()),
            fatal: None,
        }
    }

    fn expose(&mut self, event_loop: &ActiveEventLoop, exposed: bool) {
        let size = self.surface.size();
        if let Err(err) = self.scheduler.on_expose(exposed, size, &mut self.coordinator) {
            cadence_error!(SOURCE, "Cannot start rendering: {}", err);
            self.fatal = Some(err.into());
            self.shutdown(event_loop);
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        match self.scheduler.tick(&mut self.coordinator) {
            Ok(TickOutcome::Rendered { frame_index }) => {
                cadence_debug!(SOURCE, "Frame {}: {} trace events", frame_index, self.trace.len());
                // Nothing inspects the trace here
                self.trace.clear();
                if frame_index % STATS_INTERVAL == 0 {
                    let stats = self.scheduler.stats();
                    cadence_info!(
                        SOURCE,
                        "{} frames, {} swapchain recreations, {} out-of-date retries, {} skipped, {} errors",
                        stats.frames_rendered,
                        stats.swapchain_recreations,
                        stats.out_of_date_retries,
                        stats.skipped_ticks,
                        stats.frame_errors
                    );
                }
            }
            Ok(_) => {}
            Err(err) => {
                cadence_error!(SOURCE, "Fatal frame error: {}", err);
                self.fatal = Some(err.into());
                self.shutdown(event_loop);
            }
        }
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        self.scheduler.on_surface_destroyed(&mut self.coordinator);
        self.window = None;
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let attributes = Window::default_attributes()
            .with_title("Cadence Demo")
            .with_inner_size(LogicalSize::new(1280.0, 720.0));
        match event_loop.create_window(attributes) {
            Ok(window) => {
                self.surface.set_size(window.inner_size().into());
                self.window = Some(window);
                self.expose(event_loop, true);
            }
            Err(err) => {
                cadence_error!(SOURCE, "Failed to create window: {}", err);
                self.fatal = Some(err.into());
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                cadence_info!(SOURCE, "Close requested, shutting down");
                self.shutdown(event_loop);
            }
            WindowEvent::Resized(size) => {
                let size = SurfaceSize::from(size);
                self.surface.set_size(size);
                self.scheduler.on_resize(size);
            }
            WindowEvent::Occluded(occluded) => {
                self.expose(event_loop, !occluded);
            }
            WindowEvent::RedrawRequested => {
                self.redraw(event_loop);
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if self.scheduler.take_redraw_request() {
            if let Some(window) = &self.window {
                window.request_redraw();
            }
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env();
    config.apply_logging();
    cadence_info!(SOURCE, "Starting Cadence demo on backend '{}'", config.backend);

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;
    exit_status(app.fatal.take())
}

/// Non-zero exit when rendering stopped on an error
fn exit_status(fatal: Option<Box<dyn std::error::Error>>) -> Result<(), Box<dyn std::error::Error>> {
    match fatal {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
