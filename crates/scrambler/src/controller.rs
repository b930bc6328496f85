//! The single screen: a gallery shown through the pixelate graph, with the
//! animator driving the filter parameter.

use std::time::Instant;

use anyhow::Result;
use animator::{FrameClock, PixelationAnimator, TickOutcome};
use gallery::{Gallery, StatusBarStyle};
use renderer::{FilterGraph, GpuPixelator, PixelateBackend, Screen};
use tracing::{debug, info};

pub struct ScreenController<B, C> {
    gallery: Gallery,
    graph: FilterGraph<B>,
    animator: PixelationAnimator<C>,
    style: StatusBarStyle,
    style_pending: bool,
}

impl<B: PixelateBackend, C: FrameClock> ScreenController<B, C> {
    /// Builds the graph around `backend` and shows the first image
    /// unpixelated.
    pub fn new(gallery: Gallery, backend: B, animator: PixelationAnimator<C>) -> Result<Self> {
        let mut graph = FilterGraph::new(backend);
        graph.set_pixel_width_fraction(0.0);
        let style = gallery.status_bar_style();
        let mut controller = Self {
            gallery,
            graph,
            animator,
            style,
            style_pending: true,
        };
        controller.show_next()?;
        Ok(controller)
    }

    fn show_next(&mut self) -> Result<()> {
        let image = self.gallery.advance();
        self.style = image
            .status_style()
            .unwrap_or_else(|| self.gallery.status_bar_style());
        self.style_pending = true;
        info!(
            image = image.name(),
            next_index = self.gallery.current_index(),
            style = %self.style,
            "showing image"
        );
        self.graph.bind_source(image)
    }

    /// Shows the next image. Returns `false` when the press was ignored
    /// because an animation is running.
    pub fn on_next_pressed(&mut self) -> Result<bool> {
        if self.animator.is_running() {
            debug!("next image ignored while animating");
            return Ok(false);
        }
        self.show_next()?;
        Ok(true)
    }

    /// Starts an animation run. Returns `false` if one was already running.
    pub fn on_animate_pressed(&mut self, now: Instant) -> bool {
        self.animator.start(now)
    }

    /// Ticks the animator if a refresh interval has elapsed.
    pub fn on_frame(&mut self, now: Instant) -> Result<Option<TickOutcome>> {
        self.animator.on_frame(now, &mut self.graph)
    }

    pub fn is_animating(&self) -> bool {
        self.animator.is_running()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.animator.next_deadline()
    }

    /// Style for the image that is now current.
    pub fn status_bar_style(&self) -> StatusBarStyle {
        self.style
    }

    /// Hands out the style once after every image change.
    pub fn take_style_update(&mut self) -> Option<StatusBarStyle> {
        std::mem::take(&mut self.style_pending).then_some(self.style)
    }

    pub fn gallery(&self) -> &Gallery {
        &self.gallery
    }

    pub fn graph(&self) -> &FilterGraph<B> {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut FilterGraph<B> {
        &mut self.graph
    }

    pub fn animator(&self) -> &PixelationAnimator<C> {
        &self.animator
    }

    pub fn title(&self) -> String {
        match self.graph.source() {
            Some(source) => format!(
                "Scrambler - {} ({}/{})",
                source.image().name(),
                self.displayed_position(),
                self.gallery.len()
            ),
            None => "Scrambler".to_string(),
        }
    }

    /// One-based position of the displayed image; the cursor already points
    /// at the following entry.
    fn displayed_position(&self) -> usize {
        let len = self.gallery.len();
        (self.gallery.current_index() + len - 1) % len + 1
    }
}

impl<C: FrameClock> Screen for ScreenController<GpuPixelator, C> {
    fn on_next_pressed(&mut self) -> Result<()> {
        ScreenController::on_next_pressed(self).map(|_| ())
    }

    fn on_animate_pressed(&mut self, now: Instant) {
        ScreenController::on_animate_pressed(self, now);
    }

    fn on_frame(&mut self, now: Instant) -> Result<()> {
        ScreenController::on_frame(self, now).map(|_| ())
    }

    fn next_frame_deadline(&self) -> Option<Instant> {
        self.next_deadline()
    }

    fn redraw(&mut self) -> Result<()> {
        self.graph.render()
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.graph.sink_mut().resize(width, height);
    }

    fn take_style_update(&mut self) -> Option<StatusBarStyle> {
        ScreenController::take_style_update(self)
    }

    fn title(&self) -> String {
        ScreenController::title(self)
    }
}
