//! wgpu pixelate backend.
//!
//! - `context` owns the instance, device and optional window surface.
//! - `pipeline` builds the single pixelate render pipeline.
//! - `source` uploads gallery bitmaps as sampled textures.
//! - `uniforms` mirrors the shader's parameter block.
//! - `state` glues them together behind `GpuPixelator`.

mod context;
mod pipeline;
mod source;
mod state;
mod uniforms;

pub use state::GpuPixelator;
