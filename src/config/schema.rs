//! Configuration schema types for `spritepack.toml`
//!
//! Defines the structure and validation rules for spritepack configuration.

use serde::{Deserialize, Serialize};

use crate::repack::{RepackOptions, DEFAULT_MARGIN, DEFAULT_SHEET_SIZE};
use crate::sheet::{SheetDecodeMode, MAX_SHEET_DIMENSION};

/// How progress is reported on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStyle {
    /// Human-readable lines on stderr
    #[default]
    Console,
    /// One JSON object per event on stderr
    Json,
    /// No progress output
    None,
}

/// Dimensions of sheets created by `pack`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetConfig {
    #[serde(default = "default_sheet_size")]
    pub width: u32,
    #[serde(default = "default_sheet_size")]
    pub height: u32,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self { width: default_sheet_size(), height: default_sheet_size() }
    }
}

fn default_sheet_size() -> u32 {
    DEFAULT_SHEET_SIZE
}

/// Placement settings for new sprites
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackConfig {
    /// Gap between the free-area anchor and the first new sprite
    #[serde(default = "default_margin")]
    pub margin: u32,
}

impl Default for PackConfig {
    fn default() -> Self {
        Self { margin: default_margin() }
    }
}

fn default_margin() -> u32 {
    DEFAULT_MARGIN
}

/// Sheet decoding settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DecodeConfig {
    /// Reject sheets whose run data ends early
    #[serde(default)]
    pub strict: bool,
}

/// Console output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub progress: ProgressStyle,
    /// Use ANSI colors on a terminal
    #[serde(default = "default_true")]
    pub colors: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { progress: ProgressStyle::default(), colors: true }
    }
}

fn default_true() -> bool {
    true
}

/// Root `spritepack.toml` configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SpritepackConfig {
    #[serde(default)]
    pub sheet: SheetConfig,
    #[serde(default)]
    pub pack: PackConfig,
    #[serde(default)]
    pub decode: DecodeConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "sheet.width")
    pub field: String,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "spritepack.toml: '{}' {}", self.field, self.message)
    }
}

impl SpritepackConfig {
    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();

        let max = MAX_SHEET_DIMENSION as u32;
        for (field, value) in [("sheet.width", self.sheet.width), ("sheet.height", self.sheet.height)] {
            if value == 0 || value > max {
                errors.push(ConfigValidationError {
                    field: field.to_string(),
                    message: format!("must be between 1 and {}", MAX_SHEET_DIMENSION),
                });
            }
        }

        if self.pack.margin >= self.sheet.width.min(self.sheet.height) {
            errors.push(ConfigValidationError {
                field: "pack.margin".to_string(),
                message: "must be smaller than the sheet".to_string(),
            });
        }

        errors
    }

    /// Check if validation passed
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }

    pub fn repack_options(&self) -> RepackOptions {
        RepackOptions { width: self.sheet.width, height: self.sheet.height, margin: self.pack.margin }
    }

    pub fn decode_mode(&self) -> SheetDecodeMode {
        if self.decode.strict {
            SheetDecodeMode::Strict
        } else {
            SheetDecodeMode::Lenient
        }
    }
}
