//! Configuration loading from TOML files.
//!
//! Lookup order:
//! 1. `$WORLDVIEW_CONFIG` environment variable
//! 2. `~/.config/worldview/config.toml`
//! 3. Built-in defaults (everything is optional)

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

const DATA_FILE: &str = "worldview.json";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub mcp: McpConfig,
}

/// Data file settings.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Worldview JSON path. Default: platform-specific data dir.
    pub path: Option<PathBuf>,
}

/// MCP server settings.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct McpConfig {
    /// Extra instructions appended to the MCP server info.
    pub instructions: Option<String>,
}

/// Load config from disk. Returns defaults if no config file exists.
pub fn load_config() -> Result<Config> {
    match config_path() {
        Some(p) if p.exists() => load_config_from(&p),
        _ => Ok(Config::default()),
    }
}

fn load_config_from(path: &Path) -> Result<Config> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

/// Resolve the config file path.
fn config_path() -> Option<PathBuf> {
    if let Ok(p) = std::env::var("WORLDVIEW_CONFIG") {
        return Some(PathBuf::from(p));
    }

    std::env::var("HOME").ok().map(|home| {
        PathBuf::from(home)
            .join(".config")
            .join("worldview")
            .join("config.toml")
    })
}

/// Show the active config path (for `worldview config`).
pub fn show_config_path() -> String {
    match config_path() {
        Some(p) if p.exists() => format!("{} (loaded)", p.display()),
        Some(p) => format!("{} (not found, using defaults)", p.display()),
        None => "no config path resolved (using defaults)".into(),
    }
}

fn default_data_file() -> PathBuf {
    directories::ProjectDirs::from("dev", "worldview", "worldview")
        .map(|dirs| dirs.data_dir().join(DATA_FILE))
        .unwrap_or_else(|| PathBuf::from(DATA_FILE))
}

/// Pick the worldview file: explicit flag, then config, then the default.
pub fn data_file(flag: Option<PathBuf>, config: &Config) -> PathBuf {
    flag.or_else(|| config.store.path.clone())
        .unwrap_or_else(default_data_file)
}
