//! Host-memory pixelate backend used for headless export and tests.

use anyhow::{bail, Result};
use gallery::GalleryImage;
use image::{Rgba, RgbaImage};

use crate::graph::PixelateBackend;
use crate::types::FillMode;

/// Edge length in pixels of the square blocks for `fraction` of `width`.
pub fn block_size(width: u32, fraction: f32) -> u32 {
    if !fraction.is_finite() || fraction <= 0.0 {
        return 1;
    }
    ((fraction * width as f32).floor() as u32).max(1)
}

/// Replaces every square block with its average color. Edge blocks are
/// clipped to the image.
pub fn pixelate(image: &RgbaImage, fraction: f32) -> RgbaImage {
    let (width, height) = image.dimensions();
    let block = block_size(width, fraction);
    if block == 1 {
        return image.clone();
    }

    let mut output = RgbaImage::new(width, height);
    for block_y in (0..height).step_by(block as usize) {
        for block_x in (0..width).step_by(block as usize) {
            let x_end = (block_x + block).min(width);
            let y_end = (block_y + block).min(height);
            let mut sums = [0u64; 4];
            for y in block_y..y_end {
                for x in block_x..x_end {
                    let pixel = image.get_pixel(x, y);
                    for (sum, channel) in sums.iter_mut().zip(pixel.0) {
                        *sum += u64::from(channel);
                    }
                }
            }
            let count = u64::from((x_end - block_x) * (y_end - block_y));
            let average = Rgba(sums.map(|sum| ((sum + count / 2) / count) as u8));
            for y in block_y..y_end {
                for x in block_x..x_end {
                    output.put_pixel(x, y, average);
                }
            }
        }
    }
    output
}

/// Maps `image` onto a `size` sink with nearest sampling. Areas outside the
/// image come out opaque black.
pub fn fill_into(image: &RgbaImage, size: (u32, u32), fill_mode: FillMode) -> RgbaImage {
    let (width, height) = image.dimensions();
    if size == (width, height) {
        return image.clone();
    }
    let scale = fill_mode.texture_scale(size, (width, height));
    let (sink_width, sink_height) = (size.0.max(1), size.1.max(1));
    RgbaImage::from_fn(sink_width, sink_height, |x, y| {
        let u = ((x as f32 + 0.5) / sink_width as f32 - 0.5) * scale[0] + 0.5;
        let v = ((y as f32 + 0.5) / sink_height as f32 - 0.5) * scale[1] + 0.5;
        if !(0.0..1.0).contains(&u) || !(0.0..1.0).contains(&v) {
            return Rgba([0, 0, 0, 255]);
        }
        let source_x = ((u * width as f32) as u32).min(width - 1);
        let source_y = ((v * height as f32) as u32).min(height - 1);
        *image.get_pixel(source_x, source_y)
    })
}

/// CPU pixelate backend. The sink is an in-memory frame.
#[derive(Debug)]
pub struct CpuPixelator {
    size: Option<(u32, u32)>,
    fill_mode: FillMode,
    source: Option<GalleryImage>,
    frame: Option<RgbaImage>,
}

impl CpuPixelator {
    /// Without a `size` the sink matches each source bitmap exactly.
    pub fn new(size: Option<(u32, u32)>, fill_mode: FillMode) -> Self {
        Self {
            size,
            fill_mode,
            source: None,
            frame: None,
        }
    }

    pub fn frame(&self) -> Option<&RgbaImage> {
        self.frame.as_ref()
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.size = Some((width, height));
        }
    }
}

impl PixelateBackend for CpuPixelator {
    fn load_source(&mut self, image: &GalleryImage) -> Result<()> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            bail!("source image '{}' has no pixels", image.name());
        }
        self.source = Some(image.clone());
        Ok(())
    }

    fn process(&mut self, pixel_width_fraction: f32) -> Result<()> {
        let Some(source) = self.source.as_ref() else {
            bail!("no source image loaded");
        };
        let pixelated = pixelate(source.pixels(), pixel_width_fraction);
        self.frame = Some(match self.size {
            Some(size) => fill_into(&pixelated, size, self.fill_mode),
            None => pixelated,
        });
        Ok(())
    }

    fn capture(&mut self) -> Result<Option<RgbaImage>> {
        Ok(self.frame.clone())
    }
}
