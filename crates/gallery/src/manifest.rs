use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::Deserialize;

use crate::style::StatusBarStyle;
use crate::GalleryError;

pub const DEFAULT_STEP: f32 = 0.0008;
pub const DEFAULT_MAX: f32 = 0.08;
/// Widths below one source pixel are ignored by the filter, so the ramp-down
/// is considered finished once the fraction reaches this value.
pub const DEFAULT_STOP_THRESHOLD: f32 = 0.0004;
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_micros(16_667);

/// Asset names of the gallery shipped with the application, in display order.
pub const BUILTIN_IMAGES: [&str; 9] = [
    "cloudy",
    "partly-cloudy-night",
    "rain",
    "wind",
    "clear-day",
    "clear-day2",
    "clear-night",
    "partly-cloudy-day",
    "thunderstorm",
];

#[derive(Debug, Clone, Deserialize)]
pub struct GalleryManifest {
    pub version: u32,
    /// Asset directory, relative to the manifest when not absolute.
    #[serde(default)]
    pub assets: Option<PathBuf>,
    #[serde(default)]
    pub animation: AnimationConfig,
    #[serde(default)]
    pub images: Vec<ImageEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    pub step: f32,
    pub max: f32,
    pub stop_threshold: f32,
    #[serde(deserialize_with = "deserialize_duration")]
    pub refresh_interval: Duration,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            step: DEFAULT_STEP,
            max: DEFAULT_MAX,
            stop_threshold: DEFAULT_STOP_THRESHOLD,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ImageEntry {
    pub name: String,
    #[serde(default)]
    pub file: Option<PathBuf>,
    #[serde(default)]
    pub status_style: Option<StatusBarStyle>,
}

impl ImageEntry {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file: None,
            status_style: None,
        }
    }
}

impl GalleryManifest {
    /// The nine weather images bundled with the application.
    pub fn builtin() -> Self {
        Self {
            version: 1,
            assets: None,
            animation: AnimationConfig::default(),
            images: BUILTIN_IMAGES.iter().map(|name| ImageEntry::named(*name)).collect(),
        }
    }

    pub fn from_toml_str(input: &str) -> Result<Self, GalleryError> {
        let raw: GalleryManifest = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    /// Reads a manifest from disk and anchors a relative `assets` entry to
    /// the manifest's directory.
    pub fn load(path: &Path) -> Result<Self, GalleryError> {
        let contents = fs::read_to_string(path).map_err(|source| GalleryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut manifest = Self::from_toml_str(&contents)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        manifest.assets = Some(match manifest.assets.take() {
            Some(dir) if dir.is_absolute() => dir,
            Some(dir) => base.join(dir),
            None => base.to_path_buf(),
        });
        tracing::debug!(
            path = %path.display(),
            images = manifest.images.len(),
            "loaded gallery manifest"
        );
        Ok(manifest)
    }

    pub fn validate(&self) -> Result<(), GalleryError> {
        if self.version != 1 {
            return Err(GalleryError::Invalid(format!(
                "unsupported manifest version {}; expected 1",
                self.version
            )));
        }

        if self.images.is_empty() {
            return Err(GalleryError::Empty);
        }

        let mut seen = HashSet::new();
        for entry in &self.images {
            let name = entry.name.trim();
            if name.is_empty() {
                return Err(GalleryError::Invalid(
                    "gallery contains an image with an empty name".into(),
                ));
            }
            if !seen.insert(name) {
                return Err(GalleryError::Invalid(format!(
                    "image '{name}' is listed more than once"
                )));
            }
        }

        Ok(())
    }
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Duration::from_secs(v))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_secs(v as u64))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if !v.is_finite() || v.is_sign_negative() {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_secs_f64(v))
        }
    }

    deserializer.deserialize_any(Visitor)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
version = 1
assets = "images"

[animation]
step = 0.002
max = 0.1
refresh_interval = "8ms"

[[images]]
name = "cloudy"

[[images]]
name = "rain"
file = "rain.jpg"
status_style = "default"
"#;

    #[test]
    fn parses_sample_manifest() {
        let manifest = GalleryManifest::from_toml_str(SAMPLE).expect("parse manifest");
        assert_eq!(manifest.images.len(), 2);
        assert_eq!(manifest.assets.as_deref(), Some(Path::new("images")));
        assert_eq!(manifest.images[1].file.as_deref(), Some(Path::new("rain.jpg")));
        assert_eq!(
            manifest.images[1].status_style,
            Some(StatusBarStyle::Default)
        );
        assert!((manifest.animation.step - 0.002).abs() < f32::EPSILON);
        assert!((manifest.animation.max - 0.1).abs() < f32::EPSILON);
        assert!((manifest.animation.stop_threshold - DEFAULT_STOP_THRESHOLD).abs() < f32::EPSILON);
        assert_eq!(manifest.animation.refresh_interval, Duration::from_millis(8));
    }

    #[test]
    fn animation_defaults_apply_when_table_missing() {
        let manifest = GalleryManifest::from_toml_str(
            r#"
version = 1

[[images]]
name = "wind"
"#,
        )
        .unwrap();
        assert_eq!(manifest.animation, AnimationConfig::default());
    }

    #[test]
    fn accepts_numeric_refresh_interval() {
        let manifest = GalleryManifest::from_toml_str(
            r#"
version = 1

[animation]
refresh_interval = 0.5

[[images]]
name = "wind"
"#,
        )
        .unwrap();
        assert_eq!(
            manifest.animation.refresh_interval,
            Duration::from_millis(500)
        );
    }

    #[test]
    fn rejects_empty_gallery() {
        let err = GalleryManifest::from_toml_str("version = 1\n").unwrap_err();
        assert!(matches!(err, GalleryError::Empty));
    }

    #[test]
    fn rejects_duplicate_names() {
        let err = GalleryManifest::from_toml_str(
            r#"
version = 1

[[images]]
name = "rain"

[[images]]
name = "rain"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, GalleryError::Invalid(_)));
    }

    #[test]
    fn rejects_unknown_version() {
        let err = GalleryManifest::from_toml_str(
            r#"
version = 2

[[images]]
name = "rain"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, GalleryError::Invalid(_)));
    }

    #[test]
    fn builtin_lists_weather_set() {
        let manifest = GalleryManifest::builtin();
        manifest.validate().expect("builtin manifest is valid");
        assert_eq!(manifest.images.len(), 9);
        assert_eq!(manifest.images[0].name, "cloudy");
        assert_eq!(manifest.images[8].name, "thunderstorm");
    }

    #[test]
    fn load_anchors_assets_to_manifest_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gallery.toml");
        fs::write(&path, SAMPLE).unwrap();
        let manifest = GalleryManifest::load(&path).unwrap();
        assert_eq!(manifest.assets, Some(dir.path().join("images")));
    }
}
