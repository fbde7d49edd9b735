/// Texture - CPU memory implementation of a backend texture
///
/// Every mip level is a tightly packed `Vec<u8>` in the texture's format.
/// Depth/stencil textures use 4 bytes per texel: 24-bit depth in the low bits,
/// stencil in the top byte.

use cadence_rhi::cadence::{Error, Result};
use cadence_rhi::cadence::backend::{TextureDesc, TextureFormat};
use cadence_rhi::cadence::frame::SurfaceSize;

#[derive(Debug, Clone)]
pub struct HeadlessTexture {
    desc: TextureDesc,
    levels: Vec<Vec<u8>>,
    /// Identity of the backing allocation; survives in-place resizes
    allocation: u64,
}

fn unorm8(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Bytes of one texel of `format` holding `color`
pub fn encode_color(format: TextureFormat, color: [f32; 4]) -> Vec<u8> {
    let [r, g, b, a] = color;
    match format {
        TextureFormat::Rgba8Unorm => vec![unorm8(r), unorm8(g), unorm8(b), unorm8(a)],
        TextureFormat::Bgra8Unorm => vec![unorm8(b), unorm8(g), unorm8(r), unorm8(a)],
        TextureFormat::R8Unorm => vec![unorm8(r)],
        TextureFormat::R32Float => r.to_le_bytes().to_vec(),
        TextureFormat::Rgba32Float => bytemuck::cast_slice::<f32, u8>(color.as_slice()).to_vec(),
        TextureFormat::D24S8 => encode_depth_stencil(r, 0).to_vec(),
    }
}

/// Packed D24S8 texel
pub fn encode_depth_stencil(depth: f32, stencil: u32) -> [u8; 4] {
    let depth = (depth.clamp(0.0, 1.0) * 16_777_215.0).round() as u32;
    (depth | ((stencil & 0xFF) << 24)).to_le_bytes()
}

impl HeadlessTexture {
    pub(crate) fn new(desc: TextureDesc, allocation: u64) -> Self {
        let levels = (0..desc.mip_level_count())
            .map(|level| vec![0; desc.level_byte_size(level) as usize])
            .collect();
        Self { desc, levels, allocation }
    }

    pub fn desc(&self) -> &TextureDesc {
        &self.desc
    }

    pub fn size(&self) -> SurfaceSize {
        SurfaceSize::new(self.desc.width, self.desc.height)
    }

    pub fn allocation(&self) -> u64 {
        self.allocation
    }

    pub fn level(&self, level: u32) -> Option<&[u8]> {
        self.levels.get(level as usize).map(Vec::as_slice)
    }

    pub(crate) fn check_upload(&self, level: u32, len: usize) -> Result<()> {
        let expected = match self.levels.get(level as usize) {
            Some(data) => data.len(),
            None => {
                return Err(Error::InvalidResource(format!(
                    "mip level {} out of range ({} levels)",
                    level,
                    self.levels.len()
                )))
            }
        };
        if len != expected {
            return Err(Error::InvalidResource(format!(
                "mip level {} upload has {} bytes, expected {}",
                level, len, expected
            )));
        }
        Ok(())
    }

    pub(crate) fn upload(&mut self, level: u32, data: &[u8]) -> Result<()> {
        self.check_upload(level, data.len())?;
        self.levels[level as usize].copy_from_slice(data);
        Ok(())
    }

    /// Fill level 0 with one color
    pub(crate) fn clear_color(&mut self, color: [f32; 4]) {
        let texel = encode_color(self.desc.format, color);
        fill(&mut self.levels[0], &texel);
    }

    pub(crate) fn clear_depth_stencil(&mut self, depth: f32, stencil: u32) {
        let texel = encode_depth_stencil(depth, stencil);
        fill(&mut self.levels[0], &texel);
    }

    pub(crate) fn check_mip_generation(&self) -> Result<()> {
        match self.desc.format {
            TextureFormat::Rgba8Unorm | TextureFormat::Bgra8Unorm | TextureFormat::R8Unorm => Ok(()),
            other => Err(Error::InvalidState(format!(
                "mip generation is not supported for {:?}",
                other
            ))),
        }
    }

    /// Rebuild levels 1.. with a 2x2 box filter, each from the level above
    pub(crate) fn generate_mips(&mut self) -> Result<()> {
        self.check_mip_generation()?;
        let channels = self.desc.format.bytes_per_pixel() as usize;
        for level in 1..self.levels.len() {
            let src_size = self.desc.level_size(level as u32 - 1);
            let dst_size = self.desc.level_size(level as u32);
            let (above, below) = self.levels.split_at_mut(level);
            box_filter(&above[level - 1], src_size, &mut below[0], dst_size, channels);
        }
        Ok(())
    }

    /// Resize in place, keeping the allocation identity (contents are reset)
    pub(crate) fn resize(&mut self, size: SurfaceSize) {
        self.desc.width = size.width;
        self.desc.height = size.height;
        let desc = self.desc;
        self.levels = (0..desc.mip_level_count())
            .map(|level| vec![0; desc.level_byte_size(level) as usize])
            .collect();
    }
}

fn fill(data: &mut [u8], texel: &[u8]) {
    for chunk in data.chunks_exact_mut(texel.len()) {
        chunk.copy_from_slice(texel);
    }
}

fn box_filter(src: &[u8], src_size: SurfaceSize, dst: &mut [u8], dst_size: SurfaceSize, channels: usize) {
    let src_w = src_size.width as usize;
    let src_h = src_size.height as usize;
    for y in 0..dst_size.height as usize {
        for x in 0..dst_size.width as usize {
            let x0 = (2 * x).min(src_w - 1);
            let x1 = (2 * x + 1).min(src_w - 1);
            let y0 = (2 * y).min(src_h - 1);
            let y1 = (2 * y + 1).min(src_h - 1);
            for c in 0..channels {
                let sum: u32 = [(x0, y0), (x1, y0), (x0, y1), (x1, y1)]
                    .iter()
                    .map(|&(sx, sy)| src[(sy * src_w + sx) * channels + c] as u32)
                    .sum();
                dst[(y * dst_size.width as usize + x) * channels + c] = ((sum + 2) / 4) as u8;
            }
        }
    }
}

#[cfg(test)]
#[path = "headless_texture_tests.rs"]
mod tests;
