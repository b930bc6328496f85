//! Source -> pixelate -> sink filter graph.
//!
//! The pixelate node and the sink live as long as the graph. The source node
//! is tied to one immutable bitmap, so changing images swaps the node and
//! reconnects it before anything is rendered.

use anyhow::{ensure, Context, Result};
use animator::PixelateTarget;
use gallery::GalleryImage;
use image::RgbaImage;

/// Image-processing backend that owns the sink.
pub trait PixelateBackend {
    /// Replaces the bitmap the sink samples from.
    fn load_source(&mut self, image: &GalleryImage) -> Result<()>;

    /// Recomputes the sink from the loaded bitmap at `pixel_width_fraction`.
    fn process(&mut self, pixel_width_fraction: f32) -> Result<()>;

    /// Last rendered frame, when the sink lives in host-readable memory.
    fn capture(&mut self) -> Result<Option<RgbaImage>> {
        Ok(None)
    }
}

#[derive(Debug, Clone)]
pub struct SourceNode {
    image: GalleryImage,
    generation: u64,
}

impl SourceNode {
    pub fn image(&self) -> &GalleryImage {
        &self.image
    }

    /// Increases every time a new source node replaces the previous one.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PixelateNode {
    pixel_width_fraction: f32,
}

impl PixelateNode {
    pub fn pixel_width_fraction(&self) -> f32 {
        self.pixel_width_fraction
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Edges {
    source_to_pixelate: bool,
    pixelate_to_sink: bool,
}

impl Edges {
    fn complete(&self) -> bool {
        self.source_to_pixelate && self.pixelate_to_sink
    }
}

pub struct FilterGraph<B> {
    source: Option<SourceNode>,
    pixelate: PixelateNode,
    sink: B,
    edges: Edges,
    generation: u64,
    renders: u64,
}

impl<B: PixelateBackend> FilterGraph<B> {
    pub fn new(sink: B) -> Self {
        Self {
            source: None,
            pixelate: PixelateNode::default(),
            sink,
            edges: Edges {
                source_to_pixelate: false,
                pixelate_to_sink: true,
            },
            generation: 0,
            renders: 0,
        }
    }

    /// Swaps in a source node for `image`, wires it through to the sink and
    /// renders one frame. The pixelate parameter is left as it was.
    pub fn bind_source(&mut self, image: GalleryImage) -> Result<()> {
        self.source = None;
        self.edges.source_to_pixelate = false;

        self.sink
            .load_source(&image)
            .with_context(|| format!("failed to load source image '{}'", image.name()))?;
        self.generation += 1;
        tracing::debug!(
            image = image.name(),
            generation = self.generation,
            "bound new filter source"
        );
        self.source = Some(SourceNode {
            image,
            generation: self.generation,
        });
        self.connect();
        self.render()
    }

    fn connect(&mut self) {
        self.edges.source_to_pixelate = self.source.is_some();
        self.edges.pixelate_to_sink = true;
    }

    /// Stores the filter parameter; clamping is the caller's job.
    pub fn set_pixel_width_fraction(&mut self, value: f32) {
        self.pixelate.pixel_width_fraction = value;
    }

    pub fn pixel_width_fraction(&self) -> f32 {
        self.pixelate.pixel_width_fraction
    }

    pub fn render(&mut self) -> Result<()> {
        ensure!(self.source.is_some(), "filter graph has no source bound");
        ensure!(
            self.edges.complete(),
            "filter graph source is not connected to the sink"
        );
        self.sink.process(self.pixelate.pixel_width_fraction)?;
        self.renders += 1;
        Ok(())
    }

    pub fn source(&self) -> Option<&SourceNode> {
        self.source.as_ref()
    }

    pub fn pixelate(&self) -> &PixelateNode {
        &self.pixelate
    }

    pub fn sink(&self) -> &B {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut B {
        &mut self.sink
    }

    /// Number of successful renders since construction.
    pub fn render_count(&self) -> u64 {
        self.renders
    }

    pub fn capture(&mut self) -> Result<Option<RgbaImage>> {
        self.sink.capture()
    }
}

impl<B: PixelateBackend> PixelateTarget for FilterGraph<B> {
    type Error = anyhow::Error;

    fn pixel_width_fraction(&self) -> f32 {
        FilterGraph::pixel_width_fraction(self)
    }

    fn set_pixel_width_fraction(&mut self, value: f32) {
        FilterGraph::set_pixel_width_fraction(self, value);
    }

    fn render(&mut self) -> Result<(), Self::Error> {
        FilterGraph::render(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::{pixelate, CpuPixelator};
    use crate::types::FillMode;
    use image::Rgba;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Load(String),
        Process(f32),
    }

    #[derive(Default)]
    struct RecordingBackend {
        calls: Vec<Call>,
        fail_load: bool,
    }

    impl PixelateBackend for RecordingBackend {
        fn load_source(&mut self, image: &GalleryImage) -> Result<()> {
            if self.fail_load {
                anyhow::bail!("upload rejected");
            }
            self.calls.push(Call::Load(image.name().to_string()));
            Ok(())
        }

        fn process(&mut self, pixel_width_fraction: f32) -> Result<()> {
            self.calls.push(Call::Process(pixel_width_fraction));
            Ok(())
        }
    }

    fn checker(name: &str, width: u32, height: u32) -> GalleryImage {
        let pixels = RgbaImage::from_fn(width, height, |x, y| {
            let v = if (x + y) % 2 == 0 { 255 } else { 0 };
            Rgba([v, (x * 10) as u8, (y * 10) as u8, 255])
        });
        GalleryImage::from_rgba(name, pixels)
    }

    #[test]
    fn render_without_source_is_refused() {
        let mut graph = FilterGraph::new(RecordingBackend::default());
        assert!(graph.render().is_err());
        assert!(graph.sink().calls.is_empty());
    }

    #[test]
    fn bind_source_loads_connects_and_renders_once() {
        let mut graph = FilterGraph::new(RecordingBackend::default());
        graph.bind_source(checker("a", 4, 4)).unwrap();
        assert_eq!(
            graph.sink().calls,
            vec![Call::Load("a".into()), Call::Process(0.0)]
        );
        assert_eq!(graph.render_count(), 1);
        assert_eq!(graph.source().map(|s| s.generation()), Some(1));
    }

    #[test]
    fn rebinding_replaces_the_source_node() {
        let mut graph = FilterGraph::new(RecordingBackend::default());
        let image = checker("a", 4, 4);
        graph.bind_source(image.clone()).unwrap();
        graph.bind_source(image).unwrap();
        assert_eq!(graph.source().map(|s| s.generation()), Some(2));
        assert_eq!(graph.render_count(), 2);
    }

    #[test]
    fn failed_load_leaves_graph_without_source() {
        let mut graph = FilterGraph::new(RecordingBackend::default());
        graph.bind_source(checker("a", 4, 4)).unwrap();
        graph.sink_mut().fail_load = true;
        assert!(graph.bind_source(checker("b", 4, 4)).is_err());
        assert!(graph.source().is_none());
        assert!(graph.render().is_err());
    }

    #[test]
    fn parameter_is_stored_without_clamping() {
        let mut graph = FilterGraph::new(RecordingBackend::default());
        graph.set_pixel_width_fraction(1.5);
        assert_eq!(graph.pixel_width_fraction(), 1.5);
        assert_eq!(graph.pixelate().pixel_width_fraction(), 1.5);
    }

    #[test]
    fn new_source_keeps_parameter_and_renders_new_pixels() {
        let mut graph = FilterGraph::new(CpuPixelator::new(None, FillMode::Fill));
        let first = checker("first", 8, 8);
        let second = GalleryImage::from_rgba(
            "second",
            RgbaImage::from_fn(8, 8, |x, _| Rgba([x as u8 * 30, 0, 90, 255])),
        );

        graph.bind_source(first).unwrap();
        graph.set_pixel_width_fraction(0.5);
        graph.render().unwrap();

        graph.bind_source(second.clone()).unwrap();
        assert_eq!(graph.pixel_width_fraction(), 0.5);
        let frame = graph.capture().unwrap().expect("cpu frame");
        assert_eq!(frame, pixelate(second.pixels(), 0.5));

        graph.render().unwrap();
        let again = graph.capture().unwrap().expect("cpu frame");
        assert_eq!(again, frame);
    }
}
