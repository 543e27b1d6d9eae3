// SPDX-License-Identifier: GPL-3.0-only

use crate::backends::types::Symbology;
use crate::constants::APP_CONFIG_DIR;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// User configuration, persisted as JSON in the user config directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Capture device path override; `None` uses the default device
    pub device: Option<String>,
    /// Symbology allow-list for the metadata output
    pub symbologies: Vec<Symbology>,
    /// Render the live terminal preview while scanning
    pub preview: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device: None,
            symbologies: Symbology::default_allow_list(),
            preview: true,
        }
    }
}

impl Config {
    /// Location of the config file, if a config directory exists
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_CONFIG_DIR).join("config.json"))
    }

    /// Load the configuration, falling back to defaults on any error
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load from a specific path, falling back to defaults on any error
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => config,
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "Invalid config, using defaults");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Persist the configuration
    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, contents)
    }
}
