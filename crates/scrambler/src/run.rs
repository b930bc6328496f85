use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use animator::{AnimatorSettings, IntervalClock, PixelationAnimator};
use gallery::{Gallery, GalleryManifest};
use renderer::{CpuPixelator, GpuPixelator, PixelateBackend, RendererConfig};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::{Backend, ExportArgs, GalleryArgs, RunArgs};
use crate::controller::ScreenController;
use crate::paths::AppPaths;
use crate::script::ScriptStep;

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Gallery plus the animation settings and refresh interval its manifest
/// asked for.
pub struct LoadedGallery {
    pub gallery: Gallery,
    pub settings: AnimatorSettings,
    pub refresh_interval: Duration,
    pub manifest_path: Option<PathBuf>,
    pub asset_dir: PathBuf,
}

pub fn load_gallery(args: &RunArgs, paths: &AppPaths) -> Result<LoadedGallery> {
    let manifest_path = args.gallery.clone().or_else(|| {
        let candidate = paths.manifest_file();
        candidate.is_file().then_some(candidate)
    });
    let mut manifest = match &manifest_path {
        Some(path) => GalleryManifest::load(path)
            .with_context(|| format!("failed to load gallery manifest {}", path.display()))?,
        None => GalleryManifest::builtin(),
    };
    if let Some(assets) = &args.assets {
        manifest.assets = Some(assets.clone());
    }
    let asset_dir = manifest
        .assets
        .clone()
        .unwrap_or_else(|| paths.asset_dir().to_path_buf());

    let settings = AnimatorSettings::from_config(&manifest.animation)?;
    let gallery = Gallery::load(&manifest, &asset_dir)
        .with_context(|| format!("failed to load gallery from {}", asset_dir.display()))?;
    let manifest_label = manifest_path
        .as_deref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "built-in".into());
    info!(
        images = gallery.len(),
        manifest = %manifest_label,
        assets = %asset_dir.display(),
        "gallery loaded"
    );

    Ok(LoadedGallery {
        gallery,
        settings,
        refresh_interval: manifest.animation.refresh_interval,
        manifest_path,
        asset_dir,
    })
}

fn renderer_config(args: &RunArgs, size: Option<(u32, u32)>) -> RendererConfig {
    RendererConfig {
        surface_size: size,
        fill_mode: args.fill,
        color_space: args.color_space,
        ..RendererConfig::default()
    }
}

pub fn run_window(args: RunArgs) -> Result<()> {
    let paths = AppPaths::discover()?;
    let loaded = load_gallery(&args, &paths)?;
    let default_size = RendererConfig::default().surface_size;
    let config = renderer_config(&args, args.size.or(default_size));

    let LoadedGallery {
        gallery,
        settings,
        refresh_interval,
        ..
    } = loaded;
    renderer::run_window(&config, move |pixelator| {
        let animator = PixelationAnimator::new(settings, IntervalClock::new(refresh_interval));
        ScreenController::new(gallery, pixelator, animator)
    })
}

pub fn run_export(run: RunArgs, export: ExportArgs) -> Result<()> {
    let paths = AppPaths::discover()?;
    let loaded = load_gallery(&run, &paths)?;
    let config = renderer_config(&run, run.size);
    fs::create_dir_all(&export.out)
        .with_context(|| format!("failed to create output directory {}", export.out.display()))?;

    let written = match export.backend {
        Backend::Cpu => {
            let backend = CpuPixelator::new(config.surface_size, config.fill_mode);
            export_frames(loaded, backend, &export)?
        }
        Backend::Gpu => {
            let backend = GpuPixelator::offscreen(&config)?;
            info!(adapter = %backend.adapter_profile().name, "offscreen renderer ready");
            export_frames(loaded, backend, &export)?
        }
    };
    info!(frames = written, out = %export.out.display(), "export finished");
    Ok(())
}

/// Writes numbered PNG frames for every render the script triggers.
struct FrameWriter<'a> {
    out: &'a Path,
    written: usize,
    seen_renders: u64,
    max_frames: Option<usize>,
}

impl FrameWriter<'_> {
    fn is_full(&self) -> bool {
        self.max_frames.is_some_and(|max| self.written >= max)
    }

    fn flush<B: PixelateBackend>(
        &mut self,
        controller: &mut ScreenController<B, IntervalClock>,
    ) -> Result<()> {
        let renders = controller.graph().render_count();
        if renders == self.seen_renders || self.is_full() {
            self.seen_renders = renders;
            return Ok(());
        }
        self.seen_renders = renders;
        let Some(frame) = controller.graph_mut().capture()? else {
            warn!("backend cannot capture frames; nothing written");
            return Ok(());
        };
        let path = self.out.join(format!("frame_{:05}.png", self.written));
        frame
            .save(&path)
            .with_context(|| format!("failed to write frame {}", path.display()))?;
        self.written += 1;
        Ok(())
    }
}

fn export_frames<B: PixelateBackend>(
    loaded: LoadedGallery,
    backend: B,
    export: &ExportArgs,
) -> Result<usize> {
    let interval = loaded.refresh_interval;
    let animator = PixelationAnimator::new(loaded.settings, IntervalClock::new(interval));
    let mut controller = ScreenController::new(loaded.gallery, backend, animator)?;
    let mut writer = FrameWriter {
        out: &export.out,
        written: 0,
        seen_renders: 0,
        max_frames: export.max_frames,
    };
    writer.flush(&mut controller)?;

    // Simulated time: each elapsed refresh interval is one clock deadline.
    let mut now = Instant::now();

    for step in export.script.steps() {
        if writer.is_full() {
            info!(max_frames = writer.written, "frame limit reached; stopping script");
            break;
        }
        match *step {
            ScriptStep::Next => {
                controller.on_next_pressed()?;
                writer.flush(&mut controller)?;
            }
            ScriptStep::Animate => {
                controller.on_animate_pressed(now);
            }
            ScriptStep::Wait => {
                while controller.is_animating() && !writer.is_full() {
                    elapse(&mut controller, &mut writer, &mut now, interval)?;
                }
            }
            ScriptStep::Frames(count) => {
                for _ in 0..count {
                    if writer.is_full() {
                        break;
                    }
                    elapse(&mut controller, &mut writer, &mut now, interval)?;
                }
            }
        }
    }
    Ok(writer.written)
}

fn elapse<B: PixelateBackend>(
    controller: &mut ScreenController<B, IntervalClock>,
    writer: &mut FrameWriter<'_>,
    now: &mut Instant,
    interval: Duration,
) -> Result<()> {
    *now += interval;
    if let Err(err) = controller.on_frame(*now) {
        warn!("failed to render animation frame: {err:#}");
    }
    writer.flush(controller)
}

#[derive(Serialize)]
struct GalleryListing {
    manifest: Option<PathBuf>,
    assets: PathBuf,
    images: Vec<GalleryListingEntry>,
}

#[derive(Serialize)]
struct GalleryListingEntry {
    index: usize,
    name: String,
    width: u32,
    height: u32,
    status_style: String,
}

pub fn list_gallery(run: RunArgs, args: GalleryArgs) -> Result<()> {
    let paths = AppPaths::discover()?;
    let loaded = load_gallery(&run, &paths)?;
    let listing = GalleryListing {
        manifest: loaded.manifest_path.clone(),
        assets: loaded.asset_dir.clone(),
        images: loaded
            .gallery
            .iter()
            .enumerate()
            .map(|(index, image)| {
                let (width, height) = image.dimensions();
                GalleryListingEntry {
                    index,
                    name: image.name().to_string(),
                    width,
                    height,
                    status_style: loaded.gallery.style_shown_with(index).to_string(),
                }
            })
            .collect(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    println!("Gallery ({} images):", listing.images.len());
    for entry in &listing.images {
        println!(
            "  {:>2}  {:<24} {:>5}x{:<5} {}",
            entry.index, entry.name, entry.width, entry.height, entry.status_style
        );
    }
    Ok(())
}

pub fn print_where() -> Result<()> {
    let paths = AppPaths::discover()?;
    println!("Configuration directories:");
    println!("  config:    {}", paths.config_dir().display());
    println!("  manifest:  {}", paths.manifest_file().display());
    println!("  assets:    {}", paths.asset_dir().display());
    Ok(())
}
