/// How the source image is mapped onto a sink whose aspect ratio differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillMode {
    /// Stretch the image to cover the sink exactly.
    Stretch,
    /// Preserve the aspect ratio and letterbox the remainder.
    Fit,
    /// Preserve the aspect ratio and crop whatever overflows the sink.
    #[default]
    Fill,
}

impl FillMode {
    /// Scale applied to centred sink coordinates to obtain texture
    /// coordinates: `tex = (uv - 0.5) * scale + 0.5`.
    ///
    /// Components below one crop the image, above one letterbox it.
    pub fn texture_scale(self, sink: (u32, u32), image: (u32, u32)) -> [f32; 2] {
        let sink_aspect = sink.0.max(1) as f32 / sink.1.max(1) as f32;
        let image_aspect = image.0.max(1) as f32 / image.1.max(1) as f32;
        match self {
            FillMode::Stretch => [1.0, 1.0],
            FillMode::Fill => {
                if sink_aspect > image_aspect {
                    [1.0, image_aspect / sink_aspect]
                } else {
                    [sink_aspect / image_aspect, 1.0]
                }
            }
            FillMode::Fit => {
                if sink_aspect > image_aspect {
                    [sink_aspect / image_aspect, 1.0]
                } else {
                    [1.0, image_aspect / sink_aspect]
                }
            }
        }
    }
}

impl std::fmt::Display for FillMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FillMode::Stretch => f.write_str("stretch"),
            FillMode::Fit => f.write_str("fit"),
            FillMode::Fill => f.write_str("fill"),
        }
    }
}

/// Output color handling for the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorSpaceMode {
    /// Treat bitmaps as gamma-encoded and pass them through untouched.
    #[default]
    Auto,
    /// Same as `Auto`; use non-sRGB textures and surfaces.
    Gamma,
    /// Decode bitmaps to linear and let sRGB surfaces re-encode them.
    Linear,
}

/// Summary of the adapter picked for rendering, kept for diagnostics.
#[derive(Debug, Clone)]
pub struct AdapterProfile {
    pub name: String,
    pub backend: wgpu::Backend,
    pub device_type: wgpu::DeviceType,
}

impl AdapterProfile {
    pub(crate) fn from_info(info: &wgpu::AdapterInfo) -> Self {
        Self {
            name: info.name.clone(),
            backend: info.backend,
            device_type: info.device_type,
        }
    }

    pub fn is_software(&self) -> bool {
        matches!(self.device_type, wgpu::DeviceType::Cpu)
    }
}

/// Immutable configuration passed to a pixelate backend at start-up.
#[derive(Debug, Clone, PartialEq)]
pub struct RendererConfig {
    /// Sink size in physical pixels; `None` renders at the source size.
    pub surface_size: Option<(u32, u32)>,
    pub fill_mode: FillMode,
    pub color_space: ColorSpaceMode,
    pub title: String,
}

impl Default for RendererConfig {
    /// Portrait phone-sized sink with aspect-preserving fill.
    fn default() -> Self {
        Self {
            surface_size: Some((540, 960)),
            fill_mode: FillMode::default(),
            color_space: ColorSpaceMode::default(),
            title: "Scrambler".to_string(),
        }
    }
}
