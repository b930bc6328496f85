use std::fmt;

use serde::{Deserialize, Serialize};

/// Status-bar appearance requested from the host for the current image.
///
/// `Default` is dark content for bright images, `LightContent` is light
/// content for dark images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatusBarStyle {
    #[serde(alias = "dark")]
    Default,
    #[serde(alias = "light")]
    LightContent,
}

impl StatusBarStyle {
    /// Fixed mapping for the nine-image gallery: indices 2, 3, 5 and 8 are
    /// bright enough to need dark content.
    pub fn for_index(index: usize) -> Self {
        match index {
            2 | 3 | 5 | 8 => Self::Default,
            _ => Self::LightContent,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::LightContent => "light-content",
        }
    }
}

impl fmt::Display for StatusBarStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
