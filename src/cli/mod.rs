//! Command-line interface implementation
//!
//! This module provides the CLI entry point and dispatches to submodules
//! for specific command implementations.

mod convert;
mod info;
mod pack;
mod unpack;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::config::{
    load_config, merge_cli_overrides, CliOverrides, ProgressStyle, SpritepackConfig,
};
use crate::progress::{ConsoleProgress, JsonProgress, NullProgress, ProgressReporter};

/// Process exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_INVALID_ARGS: u8 = 2;

/// spritepack - Unpack and repack sprite atlases
#[derive(Parser)]
#[command(name = "spk")]
#[command(about = "spritepack - Unpack and repack sprite atlases (.img sheet + .bin atlas)")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command
#[derive(Args, Debug, Default)]
pub struct GlobalArgs {
    /// Use this spritepack.toml instead of searching for one
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Fail on sheets whose pixel data ends early
    #[arg(long, global = true)]
    pub strict: bool,

    /// Suppress progress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Report progress as JSON lines on stderr
    #[arg(long, global = true)]
    pub json_progress: bool,

    /// Print every processed item
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Export every sprite of a sheet to PNG files
    Unpack {
        /// Sheet file (.img)
        sheet: PathBuf,
        /// Atlas file (.bin)
        atlas: PathBuf,
        /// Output directory
        out: PathBuf,
    },

    /// Export every .img sheet in a directory that has a matching .bin atlas
    UnpackAll {
        /// Directory holding .img/.bin pairs
        src: PathBuf,
        /// Output directory; each pair is written to a subdirectory named after it
        out: PathBuf,
    },

    /// Rebuild a sheet and atlas from a directory of sprite images
    Pack {
        /// Directory in the layout produced by `unpack`
        src: PathBuf,
        /// Existing atlas file (.bin) to update
        atlas: PathBuf,
        /// Sheet file (.img) to write
        out_sheet: PathBuf,
        /// Atlas file (.bin) to write
        out_atlas: PathBuf,

        /// Rename the atlas
        #[arg(long)]
        name: Option<String>,

        /// Sheet width in pixels (default: 4096)
        #[arg(long)]
        width: Option<u32>,

        /// Sheet height in pixels (default: 4096)
        #[arg(long)]
        height: Option<u32>,

        /// Gap between existing content and new sprites (default: 10)
        #[arg(long)]
        margin: Option<u32>,
    },

    /// Convert a sheet (.img) to PNG
    ToPng {
        /// Sheet file (.img)
        sheet: PathBuf,
        /// PNG file to write
        out: PathBuf,
    },

    /// Convert an image to a sheet (.img)
    FromPng {
        /// Image file (PNG or any supported format)
        input: PathBuf,
        /// Sheet file (.img) to write
        out: PathBuf,
    },

    /// Show a summary of a sheet and its atlas
    Info {
        /// Sheet file (.img)
        sheet: PathBuf,
        /// Atlas file (.bin)
        atlas: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Loaded configuration and the progress reporter it selects.
pub(crate) struct Session {
    pub config: SpritepackConfig,
    pub progress: Box<dyn ProgressReporter>,
}

impl Session {
    fn open(global: &GlobalArgs, mut overrides: CliOverrides) -> Result<Self, ExitCode> {
        if global.strict {
            overrides.strict = Some(true);
        }
        if global.json_progress {
            overrides.progress = Some(ProgressStyle::Json);
        }
        if global.quiet {
            overrides.progress = Some(ProgressStyle::None);
        }

        let config = load_config(global.config.as_deref())
            .and_then(|config| merge_cli_overrides(config, &overrides))
            .map_err(|e| {
                eprintln!("Error: {}", e);
                ExitCode::from(EXIT_INVALID_ARGS)
            })?;

        let progress: Box<dyn ProgressReporter> = match config.output.progress {
            ProgressStyle::None => Box::new(NullProgress::new()),
            ProgressStyle::Json => Box::new(JsonProgress::new()),
            ProgressStyle::Console => {
                let console = ConsoleProgress::new().with_verbose(global.verbose);
                if config.output.colors {
                    Box::new(console)
                } else {
                    Box::new(console.with_colors(false))
                }
            }
        };

        Ok(Self { config, progress })
    }
}

/// Main entry point for the CLI
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let overrides = match &cli.command {
        Commands::Pack { width, height, margin, .. } => {
            CliOverrides { width: *width, height: *height, margin: *margin, ..Default::default() }
        }
        _ => CliOverrides::default(),
    };
    let session = match Session::open(&cli.global, overrides) {
        Ok(session) => session,
        Err(code) => return code,
    };

    match cli.command {
        Commands::Unpack { sheet, atlas, out } => unpack::run_unpack(&session, &sheet, &atlas, &out),
        Commands::UnpackAll { src, out } => unpack::run_unpack_all(&session, &src, &out),
        Commands::Pack { src, atlas, out_sheet, out_atlas, name, .. } => {
            pack::run_pack(&session, &src, &atlas, &out_sheet, &out_atlas, name.as_deref())
        }
        Commands::ToPng { sheet, out } => convert::run_to_png(&session, &sheet, &out),
        Commands::FromPng { input, out } => convert::run_from_png(&input, &out),
        Commands::Info { sheet, atlas, json } => info::run_info(&session, &sheet, &atlas, json),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_pack_with_globals() {
        let cli = Cli::try_parse_from([
            "spk", "pack", "art", "old.bin", "new.img", "new.bin", "--width", "1024", "--strict",
            "-q",
        ])
        .unwrap();
        assert!(cli.global.strict);
        assert!(cli.global.quiet);
        match cli.command {
            Commands::Pack { width, height, name, .. } => {
                assert_eq!(width, Some(1024));
                assert_eq!(height, None);
                assert_eq!(name, None);
            }
            _ => panic!("expected pack command"),
        }
    }

    #[test]
    fn test_parse_rejects_missing_operands() {
        assert!(Cli::try_parse_from(["spk", "unpack", "sheet.img"]).is_err());
    }
}
