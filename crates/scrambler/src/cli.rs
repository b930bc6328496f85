use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use renderer::{ColorSpaceMode, FillMode};

use crate::script::{parse_script, Script};

#[derive(Parser, Debug)]
#[command(
    name = "scrambler",
    author,
    version,
    about = "Cyclic image gallery behind an animated pixelation filter",
    arg_required_else_help = false
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Gallery manifest (TOML); defaults to `gallery.toml` in the config directory.
    #[arg(long = "gallery", value_name = "FILE", global = true)]
    pub gallery: Option<PathBuf>,

    /// Directory holding the gallery images; can also be set via `SCRAMBLER_ASSET_DIR`.
    #[arg(long, value_name = "DIR", global = true)]
    pub assets: Option<PathBuf>,

    /// Sink resolution (e.g. `540x960`). Export defaults to each image's size.
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size, global = true)]
    pub size: Option<(u32, u32)>,

    /// How images map onto the sink: `stretch`, `fit`, or `fill`.
    #[arg(
        long,
        value_name = "MODE",
        value_parser = parse_fill_mode,
        default_value = "fill",
        global = true
    )]
    pub fill: FillMode,

    /// Output color space handling: `auto`, `gamma`, or `linear`.
    #[arg(
        long,
        value_name = "MODE",
        value_parser = parse_color_space,
        default_value = "auto",
        global = true
    )]
    pub color_space: ColorSpaceMode,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run headless and write every rendered frame as a PNG.
    Export(ExportArgs),
    /// List the resolved gallery.
    Gallery(GalleryArgs),
    /// Print resolved configuration and asset directories.
    Where,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    Gpu,
    Cpu,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Directory that receives `frame_NNNNN.png` files.
    #[arg(long, value_name = "DIR")]
    pub out: PathBuf,

    /// Comma-separated actions: `next`, `animate`, `wait`, `frames:N`.
    #[arg(
        long,
        value_name = "STEPS",
        value_parser = parse_script,
        default_value = "animate,wait,animate,wait"
    )]
    pub script: Script,

    /// Stop after writing this many frames.
    #[arg(long, value_name = "N")]
    pub max_frames: Option<usize>,

    /// Pixelate backend used for export.
    #[arg(long, value_enum, default_value_t = Backend::Gpu)]
    pub backend: Backend,
}

#[derive(Args, Debug)]
pub struct GalleryArgs {
    /// Emit JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_fill_mode(value: &str) -> Result<FillMode, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("fill mode must not be empty".into());
    }
    match trimmed.to_ascii_lowercase().as_str() {
        "stretch" => Ok(FillMode::Stretch),
        "fit" | "aspect" => Ok(FillMode::Fit),
        "fill" | "aspect-fill" => Ok(FillMode::Fill),
        other => Err(format!(
            "unknown fill mode '{other}'; expected stretch, fit, or fill"
        )),
    }
}

pub fn parse_color_space(value: &str) -> Result<ColorSpaceMode, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("color space must not be empty".to_string());
    }

    let normalized = trimmed.to_ascii_lowercase();
    match normalized.as_str() {
        "auto" => Ok(ColorSpaceMode::Auto),
        "gamma" | "srgb-off" => Ok(ColorSpaceMode::Gamma),
        "linear" | "srgb" => Ok(ColorSpaceMode::Linear),
        other => Err(format!(
            "unknown color space '{other}'; expected auto, gamma, or linear"
        )),
    }
}

pub fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let (w, h) = value
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(|| "expected WIDTHxHEIGHT".to_string())?;
    let width = w
        .trim()
        .parse::<u32>()
        .map_err(|_| "invalid width in size".to_string())?;
    let height = h
        .trim()
        .parse::<u32>()
        .map_err(|_| "invalid height in size".to_string())?;
    if width == 0 || height == 0 {
        return Err("size must be greater than zero".into());
    }
    Ok((width, height))
}
