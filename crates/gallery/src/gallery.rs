use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::RgbaImage;

use crate::manifest::{GalleryManifest, ImageEntry};
use crate::style::StatusBarStyle;
use crate::GalleryError;

/// Extensions tried, in order, when an entry does not name its file.
pub const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "gif"];

/// Immutable decoded bitmap with a stable name. Clones share the pixels.
#[derive(Clone)]
pub struct GalleryImage {
    name: Arc<str>,
    pixels: Arc<RgbaImage>,
    status_style: Option<StatusBarStyle>,
}

impl GalleryImage {
    pub fn from_rgba(name: impl Into<String>, pixels: RgbaImage) -> Self {
        Self {
            name: Arc::from(name.into()),
            pixels: Arc::new(pixels),
            status_style: None,
        }
    }

    pub fn open(name: impl Into<String>, path: &Path) -> Result<Self, GalleryError> {
        let name = name.into();
        let decoded = image::open(path).map_err(|source| GalleryError::Decode {
            name: name.clone(),
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_rgba(name, decoded.to_rgba8()))
    }

    /// Overrides the index-based status-bar style for this image.
    pub fn with_status_style(mut self, style: StatusBarStyle) -> Self {
        self.status_style = Some(style);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    /// Height over width, the ratio the pixelate divisor is corrected by.
    pub fn aspect_ratio(&self) -> f32 {
        let (width, height) = self.dimensions();
        height.max(1) as f32 / width.max(1) as f32
    }

    pub fn status_style(&self) -> Option<StatusBarStyle> {
        self.status_style
    }

    /// True when both handles refer to the same decoded bitmap.
    pub fn same_pixels(&self, other: &GalleryImage) -> bool {
        Arc::ptr_eq(&self.pixels, &other.pixels)
    }
}

impl fmt::Debug for GalleryImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (width, height) = self.dimensions();
        f.debug_struct("GalleryImage")
            .field("name", &self.name)
            .field("width", &width)
            .field("height", &height)
            .field("status_style", &self.status_style)
            .finish()
    }
}

/// Ordered, fixed-length, cyclic sequence of images.
#[derive(Debug, Clone)]
pub struct Gallery {
    images: Vec<GalleryImage>,
    current_index: usize,
}

impl Gallery {
    pub fn new(images: Vec<GalleryImage>) -> Result<Self, GalleryError> {
        if images.is_empty() {
            return Err(GalleryError::Empty);
        }
        Ok(Self {
            images,
            current_index: 0,
        })
    }

    /// Decodes every manifest entry from `asset_dir`. The manifest's own
    /// `assets` directory wins when present.
    pub fn load(manifest: &GalleryManifest, asset_dir: &Path) -> Result<Self, GalleryError> {
        manifest.validate()?;
        let root = manifest.assets.as_deref().unwrap_or(asset_dir);
        let mut images = Vec::with_capacity(manifest.images.len());
        for entry in &manifest.images {
            let path = locate_asset(root, entry)?;
            let mut image = GalleryImage::open(entry.name.trim(), &path)?;
            if let Some(style) = entry.status_style {
                image = image.with_status_style(style);
            }
            tracing::debug!(
                name = image.name(),
                path = %path.display(),
                width = image.dimensions().0,
                height = image.dimensions().1,
                "loaded gallery image"
            );
            images.push(image);
        }
        Self::new(images)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// Always false; construction rejects empty galleries.
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current(&self) -> &GalleryImage {
        &self.images[self.current_index]
    }

    pub fn get(&self, index: usize) -> Option<&GalleryImage> {
        self.images.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &GalleryImage> {
        self.images.iter()
    }

    /// Hands out the image at the cursor, then moves the cursor to the next
    /// entry, wrapping at the end.
    pub fn advance(&mut self) -> GalleryImage {
        let image = self.images[self.current_index].clone();
        self.current_index = (self.current_index + 1) % self.images.len();
        image
    }

    /// Table style for the cursor position. After an advance the cursor
    /// already points past the displayed image.
    pub fn status_bar_style(&self) -> StatusBarStyle {
        StatusBarStyle::for_index(self.current_index)
    }

    /// Style in effect while the image at `index` is on screen: its own
    /// override if it has one, otherwise the table entry for the cursor
    /// position that follows it.
    pub fn style_shown_with(&self, index: usize) -> StatusBarStyle {
        let len = self.images.len();
        self.images
            .get(index)
            .and_then(GalleryImage::status_style)
            .unwrap_or_else(|| StatusBarStyle::for_index((index + 1) % len))
    }
}

fn locate_asset(root: &Path, entry: &ImageEntry) -> Result<PathBuf, GalleryError> {
    if let Some(file) = &entry.file {
        let path = if file.is_absolute() {
            file.clone()
        } else {
            root.join(file)
        };
        if path.is_file() {
            return Ok(path);
        }
        return Err(GalleryError::MissingAsset {
            name: entry.name.clone(),
            searched: path.display().to_string(),
        });
    }

    let name = entry.name.trim();
    let candidates: Vec<PathBuf> = IMAGE_EXTENSIONS
        .iter()
        .map(|ext| root.join(format!("{name}.{ext}")))
        .collect();
    candidates
        .iter()
        .find(|path| path.is_file())
        .cloned()
        .ok_or_else(|| GalleryError::MissingAsset {
            name: name.to_string(),
            searched: format!("{}/{name}.{{{}}}", root.display(), IMAGE_EXTENSIONS.join(",")),
        })
}
