//! Renderer crate for the scrambler.
//!
//! Images flow through a three-node filter graph:
//!
//! ```text
//!   GalleryImage ──▶ SourceNode ──▶ PixelateNode ──▶ sink (PixelateBackend)
//!                        ▲                 ▲
//!            bind_source │                 │ set_pixel_width_fraction
//!                  controller        PixelationAnimator
//! ```
//!
//! Two backends own the sink. `GpuPixelator` runs a GLSL block-sampling
//! shader through `wgpu` and presents into a `winit` window or an offscreen
//! texture. `CpuPixelator` averages blocks in host memory and needs no GPU,
//! which makes it the backend for tests and headless export.

mod compile;
mod cpu;
mod gpu;
mod graph;
mod types;
mod window;

pub use cpu::{block_size, fill_into, pixelate, CpuPixelator};
pub use gpu::GpuPixelator;
pub use graph::{FilterGraph, PixelateBackend, PixelateNode, SourceNode};
pub use types::{AdapterProfile, ColorSpaceMode, FillMode, RendererConfig};
pub use window::{
    action_for_key, action_for_mouse, run_window, theme_for_style, Screen, WindowAction,
};
