/// Presentable surface as observed by the scheduler
///
/// The platform owns the real window. The scheduler only records the last
/// exposure state and pixel size it was told about.

use std::fmt;
use winit::dpi::PhysicalSize;

/// Size in physical pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True when either dimension is zero (e.g. minimized window)
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Width over height, 1.0 for empty sizes
    pub fn aspect_ratio(&self) -> f32 {
        if self.is_empty() {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }

    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl fmt::Display for SurfaceSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl From<PhysicalSize<u32>> for SurfaceSize {
    fn from(size: PhysicalSize<u32>) -> Self {
        Self::new(size.width, size.height)
    }
}

impl From<(u32, u32)> for SurfaceSize {
    fn from((width, height): (u32, u32)) -> Self {
        Self::new(width, height)
    }
}

/// Last known surface state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Surface {
    size: SurfaceSize,
    exposed: bool,
}

impl Surface {
    pub fn new(size: SurfaceSize, exposed: bool) -> Self {
        Self { size, exposed }
    }

    pub fn size(&self) -> SurfaceSize {
        self.size
    }

    pub fn is_exposed(&self) -> bool {
        self.exposed
    }

    /// Exposed with a nonzero pixel size
    pub fn is_presentable(&self) -> bool {
        self.exposed && !self.size.is_empty()
    }

    pub(crate) fn set_size(&mut self, size: SurfaceSize) {
        self.size = size;
    }

    pub(crate) fn set_exposed(&mut self, exposed: bool) {
        self.exposed = exposed;
    }
}

#[cfg(test)]
#[path = "surface_tests.rs"]
mod tests;
