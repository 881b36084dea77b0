//! Configuration management for rently.
//!
//! Loads configuration from ${RENTLY_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// How outgoing request paths are routed to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Deployment {
    /// Paths are sent unchanged; a reverse proxy at the base address routes
    /// the /api prefix to the backend.
    Proxied,
    /// The base address is the backend itself; the leading /api segment is
    /// stripped before dispatch.
    Direct,
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base address for API requests (overridden by RENTLY_API_URL)
    pub api_url: Option<String>,

    /// Deployment mode override. Inferred from api_url when unset.
    pub deployment: Option<Deployment>,

    /// Local path to the district/city JSON document
    pub locations_path: Option<String>,
}

impl Config {
    /// Loads configuration from the default config path.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Creates a default config file at the given path.
    /// Returns an error if the file already exists.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        fs::write(path, default_config_template())
            .with_context(|| format!("Failed to write config to {}", path.display()))
    }
}

/// Returns the default config template with comments.
///
/// This is embedded from default_config.toml at compile time.
/// To update, edit default_config.toml directly.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

pub mod paths {
    //! Path resolution for rently configuration and data directories.
    //!
    //! RENTLY_HOME resolution order:
    //! 1. RENTLY_HOME environment variable (if set)
    //! 2. ~/.config/rently (default)

    use std::path::PathBuf;

    /// Returns the rently home directory.
    ///
    /// Checks RENTLY_HOME env var first, falls back to ~/.config/rently
    pub fn rently_home() -> PathBuf {
        if let Ok(home) = std::env::var("RENTLY_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir()
            .map(|h| h.join(".config").join("rently"))
            .expect("Could not determine home directory")
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        rently_home().join("config.toml")
    }

    /// Returns the path to the persisted session file.
    pub fn session_path() -> PathBuf {
        rently_home().join("session.json")
    }
}
