use bytemuck::{Pod, Zeroable};

use crate::types::FillMode;

/// Mirrors the `PixelateParams` std140 block in the fragment shader.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct PixelateUniforms {
    pub fill_scale: [f32; 2],
    pub fraction: f32,
    pub aspect_ratio: f32,
    pub texel_width: f32,
    pub source_width: f32,
    pub _padding: [f32; 2],
}

unsafe impl Zeroable for PixelateUniforms {}
unsafe impl Pod for PixelateUniforms {}

impl Default for PixelateUniforms {
    fn default() -> Self {
        Self {
            fill_scale: [1.0, 1.0],
            fraction: 0.0,
            aspect_ratio: 1.0,
            texel_width: 1.0,
            source_width: 1.0,
            _padding: [0.0; 2],
        }
    }
}

impl PixelateUniforms {
    /// Recomputes the per-source terms for an image drawn into `sink`.
    pub fn set_source(&mut self, fill_mode: FillMode, sink: (u32, u32), image: (u32, u32)) {
        let (width, height) = (image.0.max(1), image.1.max(1));
        self.fill_scale = fill_mode.texture_scale(sink, image);
        self.aspect_ratio = height as f32 / width as f32;
        self.texel_width = 1.0 / width as f32;
        self.source_width = width as f32;
    }

    pub fn set_fraction(&mut self, fraction: f32) {
        self.fraction = fraction.max(0.0);
    }
}
