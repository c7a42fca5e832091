//! Pack command implementation

use std::path::Path;
use std::process::ExitCode;

use crate::atlas::Atlas;
use crate::repack::repack;
use crate::sheet::save_sheet;

use super::{Session, EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};

/// Execute the pack command
pub fn run_pack(
    session: &Session,
    src: &Path,
    atlas_path: &Path,
    out_sheet: &Path,
    out_atlas: &Path,
    name: Option<&str>,
) -> ExitCode {
    if !src.is_dir() {
        eprintln!("Error: Source directory not found: {}", src.display());
        return ExitCode::from(EXIT_INVALID_ARGS);
    }

    let mut atlas = match Atlas::load(atlas_path) {
        Ok(atlas) => atlas,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let options = session.config.repack_options();
    let outcome = match repack(src, &mut atlas, &options, session.progress.as_ref()) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    if let Some(name) = name {
        atlas.name = name.to_string();
    }

    if let Err(e) = save_sheet(&outcome.sheet, out_sheet) {
        eprintln!("Error: Cannot write sheet '{}': {}", out_sheet.display(), e);
        return ExitCode::from(EXIT_ERROR);
    }
    if let Err(e) = atlas.save(out_atlas) {
        eprintln!("Error: {}", e);
        return ExitCode::from(EXIT_ERROR);
    }

    println!(
        "Packed {} sprites ({} refreshed, {} added, {} removed, {} skipped files)",
        atlas.sprites().len(),
        outcome.refreshed,
        outcome.added.len(),
        outcome.removed.len(),
        outcome.skipped.len()
    );
    println!("Saved: {}", out_sheet.display());
    println!("Saved: {}", out_atlas.display());
    ExitCode::from(EXIT_SUCCESS)
}
