//! CLI configuration (.boffin.toml)

use std::path::{Path, PathBuf};

use color_eyre::Result;
use serde::Deserialize;

/// Optional settings file, read from `--config` or `$HOME/.boffin.toml`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Default metadata directory, overridden by `--db-dir`
    #[serde(rename = "db-dir")]
    pub db_dir: Option<PathBuf>,
}

/// Config file name looked up in the home directory
pub const CONFIG_FILE: &str = ".boffin.toml";

impl FileConfig {
    /// Load the settings file.
    ///
    /// An explicitly named file must exist and parse; the implicit home
    /// file is optional.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match dirs::home_dir() {
                Some(home) => home.join(CONFIG_FILE),
                None => return Ok(Self::default()),
            },
        };

        if explicit.is_none() && !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Resolved process-wide settings, flags layered over the file
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub db_dir: Option<PathBuf>,
    pub dry_run: bool,
}

impl Config {
    #[must_use]
    pub fn resolve(file: FileConfig, db_dir_flag: Option<PathBuf>, dry_run: bool) -> Self {
        Self {
            db_dir: db_dir_flag.or(file.db_dir),
            dry_run,
        }
    }
}
