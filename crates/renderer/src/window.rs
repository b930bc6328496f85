use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Result};
use gallery::StatusBarStyle;
use tracing::{debug, error, info};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, MouseButton, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Theme, Window, WindowBuilder};

use crate::gpu::GpuPixelator;
use crate::types::RendererConfig;

/// User intents the window translates input into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowAction {
    Next,
    Animate,
    Close,
}

pub fn action_for_key(key: &Key) -> Option<WindowAction> {
    match key {
        Key::Named(NamedKey::ArrowRight) => Some(WindowAction::Next),
        Key::Named(NamedKey::Space) => Some(WindowAction::Animate),
        Key::Named(NamedKey::Escape) => Some(WindowAction::Close),
        Key::Character(value) => match value.as_str() {
            "n" | "N" => Some(WindowAction::Next),
            "a" | "A" | " " => Some(WindowAction::Animate),
            _ => None,
        },
        _ => None,
    }
}

pub fn action_for_mouse(button: MouseButton) -> Option<WindowAction> {
    match button {
        MouseButton::Left => Some(WindowAction::Animate),
        MouseButton::Right => Some(WindowAction::Next),
        _ => None,
    }
}

/// Dark status content reads on light backgrounds and vice versa.
pub fn theme_for_style(style: StatusBarStyle) -> Theme {
    match style {
        StatusBarStyle::Default => Theme::Light,
        StatusBarStyle::LightContent => Theme::Dark,
    }
}

/// The screen a window drives. Implemented by the application controller.
pub trait Screen {
    fn on_next_pressed(&mut self) -> Result<()>;
    fn on_animate_pressed(&mut self, now: Instant);
    /// Gives the animation a chance to tick. Called every event-loop pass.
    fn on_frame(&mut self, now: Instant) -> Result<()>;
    fn next_frame_deadline(&self) -> Option<Instant>;
    /// Re-renders the current frame without touching the animation.
    fn redraw(&mut self) -> Result<()>;
    fn resize(&mut self, width: u32, height: u32);
    /// Status-bar style to apply, if it changed since the last call.
    fn take_style_update(&mut self) -> Option<StatusBarStyle>;
    fn title(&self) -> String;
}

/// Opens the window, hands a surface-backed pixelator to `build`, and runs
/// the event loop until the window closes.
pub fn run_window<S, F>(config: &RendererConfig, build: F) -> Result<()>
where
    S: Screen + 'static,
    F: FnOnce(GpuPixelator) -> Result<S>,
{
    let event_loop =
        EventLoop::new().map_err(|err| anyhow!("failed to create event loop: {err}"))?;

    let (width, height) = config.surface_size.unwrap_or((540, 960));
    let window = WindowBuilder::new()
        .with_title(config.title.as_str())
        .with_inner_size(PhysicalSize::new(width, height))
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create window: {err}"))?;
    let window = Arc::new(window);

    let pixelator = GpuPixelator::for_window(window.clone(), config)
        .map_err(|err| anyhow!("failed to initialise window renderer: {err:#}"))?;
    let profile = pixelator.adapter_profile();
    info!(
        adapter = %profile.name,
        backend = ?profile.backend,
        software = profile.is_software(),
        "window renderer ready"
    );
    let mut screen = build(pixelator)?;
    sync_window(&window, &mut screen);

    event_loop
        .run(move |event, elwt| match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested | WindowEvent::Destroyed => elwt.exit(),
                WindowEvent::KeyboardInput { event, .. } => {
                    if event.state == ElementState::Pressed && !event.repeat {
                        if let Some(action) = action_for_key(&event.logical_key) {
                            if dispatch(&mut screen, action) {
                                elwt.exit();
                            }
                            sync_window(&window, &mut screen);
                        }
                    }
                }
                WindowEvent::MouseInput {
                    state: ElementState::Pressed,
                    button,
                    ..
                } => {
                    if let Some(action) = action_for_mouse(button) {
                        dispatch(&mut screen, action);
                        sync_window(&window, &mut screen);
                    }
                }
                WindowEvent::Resized(size) => {
                    screen.resize(size.width, size.height);
                    window.request_redraw();
                }
                WindowEvent::RedrawRequested => {
                    if let Err(err) = screen.redraw() {
                        error!("failed to redraw: {err:#}");
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                let now = Instant::now();
                if let Err(err) = screen.on_frame(now) {
                    error!("failed to render animation frame: {err:#}");
                }
                sync_window(&window, &mut screen);
                match screen.next_frame_deadline() {
                    Some(deadline) => {
                        tracing::trace!(
                            deadline_ms = deadline.saturating_duration_since(now).as_millis(),
                            "waiting until next animation frame"
                        );
                        elwt.set_control_flow(ControlFlow::WaitUntil(deadline));
                    }
                    None => elwt.set_control_flow(ControlFlow::Wait),
                }
            }
            _ => {}
        })
        .map_err(|err| anyhow!("window event loop error: {err}"))
}

/// Returns true when the window should close.
fn dispatch<S: Screen>(screen: &mut S, action: WindowAction) -> bool {
    match action {
        WindowAction::Next => {
            if let Err(err) = screen.on_next_pressed() {
                error!("failed to show next image: {err:#}");
            }
            false
        }
        WindowAction::Animate => {
            screen.on_animate_pressed(Instant::now());
            false
        }
        WindowAction::Close => true,
    }
}

fn sync_window<S: Screen>(window: &Window, screen: &mut S) {
    if let Some(style) = screen.take_style_update() {
        debug!(%style, "applying status bar style");
        window.set_theme(Some(theme_for_style(style)));
    }
    let title = screen.title();
    if window.title() != title {
        window.set_title(&title);
    }
}
