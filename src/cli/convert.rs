//! Sheet conversion commands (to-png, from-png)

use std::path::Path;
use std::process::ExitCode;

use crate::imaging::{load_image, save_png};
use crate::sheet::{load_sheet, save_sheet};

use super::{Session, EXIT_ERROR, EXIT_SUCCESS};

/// Execute the to-png command
pub fn run_to_png(session: &Session, sheet: &Path, out: &Path) -> ExitCode {
    let image = match load_sheet(sheet, session.config.decode_mode()) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("Error: Invalid sheet '{}': {}", sheet.display(), e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    if let Err(e) = save_png(&image, out) {
        eprintln!("Error: Cannot write '{}': {}", out.display(), e);
        return ExitCode::from(EXIT_ERROR);
    }
    println!("Saved: {} ({}x{})", out.display(), image.width(), image.height());
    ExitCode::from(EXIT_SUCCESS)
}

/// Execute the from-png command
pub fn run_from_png(input: &Path, out: &Path) -> ExitCode {
    let image = match load_image(input) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("Error: Cannot read image '{}': {}", input.display(), e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    if let Err(e) = save_sheet(&image, out) {
        eprintln!("Error: Cannot write sheet '{}': {}", out.display(), e);
        return ExitCode::from(EXIT_ERROR);
    }
    println!("Saved: {} ({}x{})", out.display(), image.width(), image.height());
    ExitCode::from(EXIT_SUCCESS)
}
