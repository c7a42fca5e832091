//! Configuration loading and discovery for `spritepack.toml`
//!
//! Provides functions to find, load, and merge configuration.

use super::schema::{ProgressStyle, SpritepackConfig};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name searched for during discovery
pub const CONFIG_FILE_NAME: &str = "spritepack.toml";

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("Failed to parse spritepack.toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error
    #[error("Config validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
}

/// CLI arguments that can override config values
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    /// Override sheet width for `pack`
    pub width: Option<u32>,
    /// Override sheet height for `pack`
    pub height: Option<u32>,
    /// Override placement margin
    pub margin: Option<u32>,
    /// Enable strict sheet decoding
    pub strict: Option<bool>,
    /// Override progress output
    pub progress: Option<ProgressStyle>,
}

/// Find spritepack.toml by walking up from the current working directory.
///
/// Search order:
/// 1. Walk up from current directory looking for spritepack.toml
/// 2. Check XDG_CONFIG_HOME/spritepack/spritepack.toml (or ~/.config/spritepack/spritepack.toml)
pub fn find_config() -> Option<PathBuf> {
    if let Ok(cwd) = env::current_dir() {
        if let Some(path) = find_config_from(cwd) {
            return Some(path);
        }
    }

    find_xdg_config()
}

/// Find spritepack.toml in the XDG config directory.
pub fn find_xdg_config() -> Option<PathBuf> {
    let xdg_config = env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|_| env::var("HOME").map(|h| PathBuf::from(h).join(".config")))
        .ok()?;

    let config_path = xdg_config.join("spritepack").join(CONFIG_FILE_NAME);
    if config_path.exists() {
        Some(config_path)
    } else {
        None
    }
}

/// Find spritepack.toml by walking up from a specific directory.
pub fn find_config_from(start: PathBuf) -> Option<PathBuf> {
    let mut current = start;

    loop {
        let config_path = current.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Load configuration from a spritepack.toml file.
///
/// If a path is provided, loads from that file. Otherwise, uses `find_config()`
/// to locate the config file. If no config file is found, returns the default
/// configuration.
///
/// # Example
/// ```ignore
/// let config = load_config(None)?;
/// let config = load_config(Some(Path::new("assets/spritepack.toml")))?;
/// ```
pub fn load_config(path: Option<&Path>) -> Result<SpritepackConfig, ConfigError> {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config(),
    };

    match config_path {
        Some(p) => load_config_file(&p),
        None => Ok(default_config()),
    }
}

fn load_config_file(path: &Path) -> Result<SpritepackConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let config: SpritepackConfig = toml::from_str(&contents)?;
    check(config)
}

fn check(config: SpritepackConfig) -> Result<SpritepackConfig, ConfigError> {
    let errors = config.validate();
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()));
    }
    Ok(config)
}

/// Configuration used when no spritepack.toml is found.
pub fn default_config() -> SpritepackConfig {
    SpritepackConfig::default()
}

/// Merge CLI overrides into a configuration and re-validate it.
///
/// CLI arguments take precedence over config file values.
pub fn merge_cli_overrides(
    mut config: SpritepackConfig,
    overrides: &CliOverrides,
) -> Result<SpritepackConfig, ConfigError> {
    if let Some(width) = overrides.width {
        config.sheet.width = width;
    }
    if let Some(height) = overrides.height {
        config.sheet.height = height;
    }
    if let Some(margin) = overrides.margin {
        config.pack.margin = margin;
    }
    if let Some(strict) = overrides.strict {
        config.decode.strict = strict;
    }
    if let Some(progress) = overrides.progress {
        config.output.progress = progress;
    }
    check(config)
}
