//! Image gallery for the scrambler screen.
//!
//! A gallery is a fixed, non-empty, cyclic list of decoded bitmaps. The list
//! comes from a TOML manifest (or the built-in weather set) and is loaded once
//! at startup; a missing or undecodable asset is a configuration error and is
//! reported before anything is shown.

mod gallery;
mod manifest;
mod style;

use std::path::PathBuf;

pub use gallery::{Gallery, GalleryImage, IMAGE_EXTENSIONS};
pub use manifest::{
    AnimationConfig, GalleryManifest, ImageEntry, BUILTIN_IMAGES, DEFAULT_MAX,
    DEFAULT_REFRESH_INTERVAL, DEFAULT_STEP, DEFAULT_STOP_THRESHOLD,
};
pub use style::StatusBarStyle;

#[derive(Debug, thiserror::Error)]
pub enum GalleryError {
    #[error("failed to parse gallery manifest: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid gallery manifest: {0}")]
    Invalid(String),
    #[error("failed to read gallery manifest at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("gallery must contain at least one image")]
    Empty,
    #[error("image asset '{name}' not found (searched {searched})")]
    MissingAsset { name: String, searched: String },
    #[error("failed to decode image asset '{name}' at {}: {source}", .path.display())]
    Decode {
        name: String,
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}
