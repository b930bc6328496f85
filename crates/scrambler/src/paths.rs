use std::env;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use directories_next::ProjectDirs;

pub const ENV_CONFIG_DIR: &str = "SCRAMBLER_CONFIG_DIR";
pub const ENV_ASSET_DIR: &str = "SCRAMBLER_ASSET_DIR";

const QUALIFIER: &str = "org";
const ORGANISATION: &str = "Scrambler";
const APPLICATION: &str = "Scrambler";

/// Name of the gallery manifest looked up in the config directory.
pub const MANIFEST_FILE: &str = "gallery.toml";

#[derive(Debug, Clone)]
pub struct AppPaths {
    config_dir: PathBuf,
    asset_dir: PathBuf,
}

impl AppPaths {
    pub fn discover() -> Result<Self> {
        let project_dirs = ProjectDirs::from(QUALIFIER, ORGANISATION, APPLICATION);
        let config_dir = match (env_override(ENV_CONFIG_DIR), project_dirs.as_ref()) {
            (Some(dir), _) => dir,
            (None, Some(dirs)) => dirs.config_dir().to_path_buf(),
            (None, None) => return Err(anyhow!("failed to determine user config directory")),
        };
        let asset_dir = match (env_override(ENV_ASSET_DIR), project_dirs.as_ref()) {
            (Some(dir), _) => dir,
            (None, Some(dirs)) => dirs.data_dir().join("images"),
            (None, None) => return Err(anyhow!("failed to determine user data directory")),
        };

        Ok(Self {
            config_dir,
            asset_dir,
        })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn asset_dir(&self) -> &Path {
        &self.asset_dir
    }

    pub fn manifest_file(&self) -> PathBuf {
        self.config_dir.join(MANIFEST_FILE)
    }
}

fn env_override(name: &str) -> Option<PathBuf> {
    match env::var_os(name) {
        Some(value) if !value.is_empty() => Some(PathBuf::from(value)),
        _ => None,
    }
}
