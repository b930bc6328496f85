use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use gallery::GalleryImage;
use image::RgbaImage;
use tracing::{debug, warn};
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::graph::PixelateBackend;
use crate::types::{AdapterProfile, FillMode, RendererConfig};

use super::context::GpuContext;
use super::pipeline::PixelatePipeline;
use super::source::SourceTexture;
use super::uniforms::PixelateUniforms;

struct OffscreenTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    size: (u32, u32),
}

impl OffscreenTarget {
    fn new(device: &wgpu::Device, format: wgpu::TextureFormat, size: (u32, u32)) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("offscreen sink"),
            size: wgpu::Extent3d {
                width: size.0,
                height: size.1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            size,
        }
    }
}

/// wgpu pixelate backend drawing into a window surface or an offscreen
/// texture that can be read back.
pub struct GpuPixelator {
    context: GpuContext,
    pipeline: PixelatePipeline,
    uniforms: PixelateUniforms,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    source: Option<SourceTexture>,
    offscreen: Option<OffscreenTarget>,
    fill_mode: FillMode,
    fixed_size: Option<(u32, u32)>,
    size: (u32, u32),
    frames: u64,
}

impl GpuPixelator {
    /// Presents into `window`, sized to its current inner size.
    pub fn for_window(window: Arc<Window>, config: &RendererConfig) -> Result<Self> {
        let inner = window.inner_size();
        let size = (inner.width.max(1), inner.height.max(1));
        let context = GpuContext::for_window(window, size, config.color_space)?;
        let format = context
            .surface
            .as_ref()
            .map(|window| window.config.format)
            .context("window context has no surface")?;
        Ok(Self::with_context(context, format, config, size, None))
    }

    /// Renders into an offscreen texture. Without a configured size the sink
    /// follows the dimensions of each loaded source.
    pub fn offscreen(config: &RendererConfig) -> Result<Self> {
        let context = GpuContext::headless(config.color_space)?;
        let size = config.surface_size.unwrap_or((1, 1));
        context.check_dimensions(size)?;
        let format = context.color_space.texture_format();
        let mut pixelator =
            Self::with_context(context, format, config, size, config.surface_size);
        pixelator.offscreen = Some(OffscreenTarget::new(
            &pixelator.context.device,
            format,
            size,
        ));
        Ok(pixelator)
    }

    fn with_context(
        context: GpuContext,
        format: wgpu::TextureFormat,
        config: &RendererConfig,
        size: (u32, u32),
        fixed_size: Option<(u32, u32)>,
    ) -> Self {
        let pipeline = PixelatePipeline::new(&context.device, format);
        let uniforms = PixelateUniforms::default();
        let uniform_buffer =
            context
                .device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("pixelate uniforms"),
                    contents: bytemuck::bytes_of(&uniforms),
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                });
        let uniform_bind_group = context
            .device
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("pixelate uniform bind group"),
                layout: &pipeline.uniform_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                }],
            });

        Self {
            context,
            pipeline,
            uniforms,
            uniform_buffer,
            uniform_bind_group,
            source: None,
            offscreen: None,
            fill_mode: config.fill_mode,
            fixed_size,
            size,
            frames: 0,
        }
    }

    pub fn adapter_profile(&self) -> &AdapterProfile {
        &self.context.adapter_profile
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.size = (width, height);
        self.context.resize_surface(self.size);
        if self.offscreen.is_some() {
            self.offscreen = Some(OffscreenTarget::new(
                &self.context.device,
                self.pipeline.target_format,
                self.size,
            ));
        }
        if let Some(source) = self.source.as_ref() {
            self.uniforms
                .set_source(self.fill_mode, self.size, source.dimensions);
        }
    }

    fn encode_pass(&self, view: &wgpu::TextureView, source: &SourceTexture) -> wgpu::CommandBuffer {
        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("pixelate encoder"),
                });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("pixelate pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            render_pass.set_pipeline(&self.pipeline.pipeline);
            render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            render_pass.set_bind_group(1, &source.bind_group, &[]);
            render_pass.draw(0..3, 0..1);
        }
        encoder.finish()
    }

    fn present(&self, source: &SourceTexture) -> Result<bool> {
        let Some(window) = self.context.surface.as_ref() else {
            return Ok(false);
        };
        let frame = match window.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                debug!("surface lost or outdated; reconfiguring");
                self.context.reconfigure_surface();
                window
                    .surface
                    .get_current_texture()
                    .context("failed to acquire surface texture after reconfigure")?
            }
            Err(wgpu::SurfaceError::Timeout) => {
                warn!("surface timeout; skipping frame");
                return Ok(false);
            }
            Err(err) => return Err(anyhow!("failed to acquire surface texture: {err}")),
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let commands = self.encode_pass(&view, source);
        self.context.queue.submit(std::iter::once(commands));
        frame.present();
        Ok(true)
    }

    fn read_back(&self, target: &OffscreenTarget) -> Result<RgbaImage> {
        let (width, height) = target.size;
        let unpadded = width * 4;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded = unpadded.div_ceil(align) * align;

        let buffer = self.context.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("sink readback"),
            size: u64::from(padded) * u64::from(height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("readback encoder"),
                });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &target.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.context.queue.submit(std::iter::once(encoder.finish()));

        let slice = buffer.slice(..);
        let (tx, rx) = crossbeam_channel::bounded(1);
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.context
            .device
            .poll(wgpu::PollType::Wait)
            .map_err(|err| anyhow!("failed to wait for GPU readback: {err}"))?;
        rx.recv()
            .context("readback callback was dropped")?
            .context("failed to map readback buffer")?;

        let mut pixels = Vec::with_capacity((unpadded * height) as usize);
        {
            let data = slice.get_mapped_range();
            for row in data.chunks(padded as usize) {
                pixels.extend_from_slice(&row[..unpadded as usize]);
            }
        }
        buffer.unmap();
        RgbaImage::from_raw(width, height, pixels)
            .ok_or_else(|| anyhow!("readback produced {width}x{height} with a short buffer"))
    }
}

impl PixelateBackend for GpuPixelator {
    fn load_source(&mut self, image: &GalleryImage) -> Result<()> {
        let dimensions = image.dimensions();
        self.context.check_dimensions(dimensions)?;
        self.source = None;

        if self.offscreen.is_some() && self.fixed_size.is_none() && self.size != dimensions {
            self.size = dimensions;
            self.offscreen = Some(OffscreenTarget::new(
                &self.context.device,
                self.pipeline.target_format,
                dimensions,
            ));
        }

        let source = SourceTexture::upload(
            &self.context.device,
            &self.context.queue,
            &self.pipeline.source_layout,
            image,
            self.context.color_space,
        );
        self.uniforms
            .set_source(self.fill_mode, self.size, source.dimensions);
        debug!(
            image = %source.name,
            width = dimensions.0,
            height = dimensions.1,
            "uploaded source texture"
        );
        self.source = Some(source);
        Ok(())
    }

    fn process(&mut self, pixel_width_fraction: f32) -> Result<()> {
        let Some(source) = self.source.as_ref() else {
            bail!("no source texture uploaded");
        };
        self.uniforms.set_fraction(pixel_width_fraction);
        self.context
            .queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&self.uniforms));

        let drawn = if let Some(target) = self.offscreen.as_ref() {
            let commands = self.encode_pass(&target.view, source);
            self.context.queue.submit(std::iter::once(commands));
            true
        } else {
            self.present(source)?
        };
        if drawn {
            self.frames += 1;
        }
        Ok(())
    }

    fn capture(&mut self) -> Result<Option<RgbaImage>> {
        match self.offscreen.as_ref() {
            Some(target) => self.read_back(target).map(Some),
            None => Ok(None),
        }
    }
}
