//! Application configuration for Batchline.
//!
//! User config lives at `~/.batchline/batchline.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BatchlineError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "batchline.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".batchline";

// ---------------------------------------------------------------------------
// Config structs (matching batchline.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Export job settings.
    #[serde(default)]
    pub job: JobConfig,
}

/// `[storage]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to the libSQL database file.
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

fn default_db_path() -> String {
    "var/batchline.db".into()
}

/// `[job]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// Output file path for the exported delimited file.
    #[serde(default = "default_output_path")]
    pub output_path: String,

    /// Number of records per committed chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Field delimiter for output lines.
    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    /// Emit a header row before the first record.
    #[serde(default)]
    pub header: bool,

    /// Transform failures tolerated per step before the step fails.
    #[serde(default)]
    pub skip_limit: usize,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            output_path: default_output_path(),
            chunk_size: default_chunk_size(),
            delimiter: default_delimiter(),
            header: false,
            skip_limit: 0,
        }
    }
}

fn default_output_path() -> String {
    "var/employees.csv".into()
}
fn default_chunk_size() -> usize {
    5
}
fn default_delimiter() -> char {
    ','
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.batchline/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| BatchlineError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.batchline/batchline.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| BatchlineError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| BatchlineError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| BatchlineError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| BatchlineError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| BatchlineError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
