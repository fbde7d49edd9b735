/*!
# Cadence RHI - Headless Backend

CPU reference implementation of the `cadence_rhi` backend traits.

Resources live in host memory, passes clear their attachments and record
their draws and dispatches into a [`HeadlessTrace`] instead of rasterizing.
A [`HeadlessSurface`] stands in for the platform window, so frame scheduling,
swapchain recreation and out-of-date handling run without a GPU.

```no_run
use cadence_rhi::cadence::{BackendRegistry, Config, FrameScheduler};
use cadence_rhi::cadence::frame::SurfaceSize;
use cadence_rhi_headless::HeadlessSurface;

let surface = HeadlessSurface::new(SurfaceSize::new(800, 600));
let mut registry = BackendRegistry::new();
let trace = cadence_rhi_headless::register(&mut registry, surface.clone());
let scheduler = FrameScheduler::new(Config::default().with_backend("headless"), registry);
```
*/

mod headless_backend;
mod headless_buffer;
mod headless_context;
mod headless_native;
mod headless_surface;
mod headless_texture;
mod headless_trace;

pub use headless_backend::HeadlessBackend;
pub use headless_buffer::HeadlessBuffer;
pub use headless_context::{HeadlessContext, HeadlessPipeline, HeadlessSwapchain};
pub use headless_native::HeadlessNativeCommands;
pub use headless_surface::HeadlessSurface;
pub use headless_texture::{encode_color, encode_depth_stencil, HeadlessTexture};
pub use headless_trace::{DrawRecord, HeadlessTrace, TraceEvent};

use cadence_rhi::cadence::{Backend, BackendRegistry, Config, Result};

/// Registry name of the headless backend
pub const BACKEND_NAME: &str = "headless";

/// Register the headless backend under `"headless"`
///
/// Every backend created by the registry presents to `surface` and records
/// into the returned trace.
pub fn register(registry: &mut BackendRegistry, surface: HeadlessSurface) -> HeadlessTrace {
    let trace = HeadlessTrace::new();
    let shared = trace.clone();
    registry.register(BACKEND_NAME, move |config: &Config| -> Result<Box<dyn Backend>> {
        Ok(Box::new(HeadlessBackend::new(config, surface.clone(), shared.clone())))
    });
    trace
}
