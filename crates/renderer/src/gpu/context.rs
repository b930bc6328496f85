use std::sync::Arc;

use anyhow::{Context as AnyhowContext, Result};
use winit::window::Window;

use crate::types::{AdapterProfile, ColorSpaceMode};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SurfaceColorSpace {
    Gamma,
    Linear,
}

impl SurfaceColorSpace {
    pub(crate) fn from_mode(mode: ColorSpaceMode) -> Self {
        match mode {
            ColorSpaceMode::Auto | ColorSpaceMode::Gamma => SurfaceColorSpace::Gamma,
            ColorSpaceMode::Linear => SurfaceColorSpace::Linear,
        }
    }

    /// Texture format for source bitmaps and offscreen sinks.
    pub(crate) fn texture_format(self) -> wgpu::TextureFormat {
        match self {
            SurfaceColorSpace::Gamma => wgpu::TextureFormat::Rgba8Unorm,
            SurfaceColorSpace::Linear => wgpu::TextureFormat::Rgba8UnormSrgb,
        }
    }
}

pub(crate) struct WindowSurface {
    pub surface: wgpu::Surface<'static>,
    pub config: wgpu::SurfaceConfiguration,
}

pub(crate) struct GpuContext {
    pub _instance: wgpu::Instance,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub color_space: SurfaceColorSpace,
    pub adapter_profile: AdapterProfile,
    pub max_texture_dimension: u32,
    pub surface: Option<WindowSurface>,
}

impl GpuContext {
    /// Creates a device able to present into `window`.
    pub(crate) fn for_window(
        window: Arc<Window>,
        size: (u32, u32),
        color_space: ColorSpaceMode,
    ) -> Result<Self> {
        let instance = create_instance();
        let surface = instance
            .create_surface(window)
            .context("failed to create rendering surface")?;
        let adapter = request_adapter(&instance, Some(&surface))?;
        let color_space = SurfaceColorSpace::from_mode(color_space);

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = pick_surface_format(&surface_caps.formats, color_space)
            .context("surface reports no supported formats")?;
        let present_mode = surface_caps
            .present_modes
            .iter()
            .copied()
            .find(|mode| *mode == wgpu::PresentMode::Fifo)
            .or_else(|| surface_caps.present_modes.first().copied())
            .unwrap_or(wgpu::PresentMode::Fifo);
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let mut context = Self::with_adapter(instance, &adapter, color_space)?;
        context.check_dimensions(size)?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.0.max(1),
            height: size.1.max(1),
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&context.device, &config);
        tracing::debug!(?surface_format, ?present_mode, "configured window surface");
        context.surface = Some(WindowSurface { surface, config });
        Ok(context)
    }

    /// Creates a device without a presentation surface.
    pub(crate) fn headless(color_space: ColorSpaceMode) -> Result<Self> {
        let instance = create_instance();
        let adapter = request_adapter(&instance, None)?;
        Self::with_adapter(instance, &adapter, SurfaceColorSpace::from_mode(color_space))
    }

    fn with_adapter(
        instance: wgpu::Instance,
        adapter: &wgpu::Adapter,
        color_space: SurfaceColorSpace,
    ) -> Result<Self> {
        let adapter_profile = AdapterProfile::from_info(&adapter.get_info());
        tracing::debug!(
            name = %adapter_profile.name,
            backend = ?adapter_profile.backend,
            device_type = ?adapter_profile.device_type,
            is_software = adapter_profile.is_software(),
            "selected GPU adapter"
        );
        let limits = adapter.limits();

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("scrambler device"),
            required_features: wgpu::Features::empty(),
            required_limits: limits.clone(),
            memory_hints: wgpu::MemoryHints::MemoryUsage,
            trace: wgpu::Trace::default(),
        }))
        .context("failed to create GPU device")?;

        Ok(Self {
            _instance: instance,
            device,
            queue,
            color_space,
            adapter_profile,
            max_texture_dimension: limits.max_texture_dimension_2d,
            surface: None,
        })
    }

    pub(crate) fn check_dimensions(&self, size: (u32, u32)) -> Result<()> {
        let max_dimension = self.max_texture_dimension;
        if size.0 > max_dimension || size.1 > max_dimension {
            anyhow::bail!(
                "GPU max texture dimension is {max_dimension}, requested {width}x{height}",
                width = size.0,
                height = size.1
            );
        }
        Ok(())
    }

    pub(crate) fn resize_surface(&mut self, size: (u32, u32)) {
        if size.0 == 0 || size.1 == 0 {
            return;
        }
        if let Some(window) = self.surface.as_mut() {
            window.config.width = size.0;
            window.config.height = size.1;
            window.surface.configure(&self.device, &window.config);
        }
    }

    /// Reapplies the current configuration after the surface was lost.
    pub(crate) fn reconfigure_surface(&self) {
        if let Some(window) = self.surface.as_ref() {
            window.surface.configure(&self.device, &window.config);
        }
    }
}

fn create_instance() -> wgpu::Instance {
    wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        flags: wgpu::InstanceFlags::default(),
        memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
        backend_options: wgpu::BackendOptions::default(),
    })
}

fn request_adapter(
    instance: &wgpu::Instance,
    surface: Option<&wgpu::Surface<'_>>,
) -> Result<wgpu::Adapter> {
    pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::LowPower,
        compatible_surface: surface,
        force_fallback_adapter: false,
    }))
    .context("failed to find a suitable GPU adapter")
}

fn pick_surface_format(
    formats: &[wgpu::TextureFormat],
    color_space: SurfaceColorSpace,
) -> Option<wgpu::TextureFormat> {
    let wants_srgb = color_space == SurfaceColorSpace::Linear;
    let preferred = formats
        .iter()
        .copied()
        .find(|format| format.is_srgb() == wants_srgb);
    if preferred.is_none() {
        if let Some(fallback) = formats.first() {
            tracing::warn!(
                ?fallback,
                ?color_space,
                "no matching surface format available; falling back"
            );
        }
    }
    preferred.or_else(|| formats.first().copied())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gamma_prefers_non_srgb_formats() {
        let formats = [
            wgpu::TextureFormat::Bgra8UnormSrgb,
            wgpu::TextureFormat::Bgra8Unorm,
        ];
        assert_eq!(
            pick_surface_format(&formats, SurfaceColorSpace::Gamma),
            Some(wgpu::TextureFormat::Bgra8Unorm)
        );
        assert_eq!(
            pick_surface_format(&formats, SurfaceColorSpace::Linear),
            Some(wgpu::TextureFormat::Bgra8UnormSrgb)
        );
    }

    #[test]
    fn falls_back_to_first_format() {
        let formats = [wgpu::TextureFormat::Bgra8UnormSrgb];
        assert_eq!(
            pick_surface_format(&formats, SurfaceColorSpace::Gamma),
            Some(wgpu::TextureFormat::Bgra8UnormSrgb)
        );
        assert_eq!(pick_surface_format(&[], SurfaceColorSpace::Gamma), None);
    }

    #[test]
    fn auto_maps_to_gamma() {
        assert_eq!(
            SurfaceColorSpace::from_mode(ColorSpaceMode::Auto),
            SurfaceColorSpace::Gamma
        );
        assert_eq!(
            SurfaceColorSpace::Linear.texture_format(),
            wgpu::TextureFormat::Rgba8UnormSrgb
        );
    }
}
