//! Unpack command implementations (unpack, unpack-all)

use glob::glob;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::atlas::Atlas;
use crate::sheet::load_sheet;

use super::{Session, EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};

/// Export one sheet/atlas pair, returning an error message on failure.
fn unpack_pair(session: &Session, sheet: &Path, atlas: &Path, out: &Path) -> Result<usize, String> {
    let atlas = Atlas::load(atlas).map_err(|e| e.to_string())?;
    let image = load_sheet(sheet, session.config.decode_mode())
        .map_err(|e| format!("Invalid sheet '{}': {}", sheet.display(), e))?;
    let result = atlas.export(&image, out, session.progress.as_ref()).map_err(|e| e.to_string())?;
    Ok(result.written.len())
}

/// Execute the unpack command
pub fn run_unpack(session: &Session, sheet: &Path, atlas: &Path, out: &Path) -> ExitCode {
    match unpack_pair(session, sheet, atlas, out) {
        Ok(count) => {
            println!("Saved: {} sprites to {}", count, out.display());
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// Sheets directly inside `dir`, sorted by path.
fn find_sheets(dir: &Path) -> Vec<PathBuf> {
    let pattern = dir.join("*.img");
    let mut sheets: Vec<PathBuf> = match glob(&pattern.to_string_lossy()) {
        Ok(paths) => paths.filter_map(Result::ok).filter(|p| p.is_file()).collect(),
        Err(_) => Vec::new(),
    };
    sheets.sort();
    sheets
}

/// Execute the unpack-all command
///
/// Every `name.img` with a sibling `name.bin` is exported to `out/name`.
/// A sheet without an atlas is reported and skipped.
pub fn run_unpack_all(session: &Session, src: &Path, out: &Path) -> ExitCode {
    if !src.is_dir() {
        eprintln!("Error: Source directory not found: {}", src.display());
        return ExitCode::from(EXIT_INVALID_ARGS);
    }

    let sheets = find_sheets(src);
    if sheets.is_empty() {
        eprintln!("Error: No .img files found in {}", src.display());
        return ExitCode::from(EXIT_ERROR);
    }

    let mut failed = 0;
    let mut exported = 0;
    for sheet in &sheets {
        let atlas = sheet.with_extension("bin");
        let stem = sheet.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        if !atlas.is_file() {
            session.progress.warn(
                Some(sheet.display().to_string().as_str()),
                format!("no matching atlas '{}', skipped", atlas.display()),
            );
            continue;
        }

        let target = out.join(&stem);
        match unpack_pair(session, sheet, &atlas, &target) {
            Ok(count) => {
                println!("Saved: {} sprites to {}", count, target.display());
                exported += 1;
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        eprintln!("{} of {} sheets failed", failed, failed + exported);
        ExitCode::from(EXIT_ERROR)
    } else {
        ExitCode::from(EXIT_SUCCESS)
    }
}
