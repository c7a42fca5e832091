//! Info command implementation

use serde::Serialize;
use std::path::Path;
use std::process::ExitCode;

use crate::atlas::{Atlas, AtlasSummary};
use crate::sheet::load_sheet;

use super::{Session, EXIT_ERROR, EXIT_SUCCESS};

#[derive(Debug, Serialize)]
struct SheetInfo {
    width: u32,
    height: u32,
    #[serde(flatten)]
    atlas: AtlasSummary,
}

/// Execute the info command
pub fn run_info(session: &Session, sheet: &Path, atlas: &Path, json: bool) -> ExitCode {
    let atlas = match Atlas::load(atlas) {
        Ok(atlas) => atlas,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };
    let image = match load_sheet(sheet, session.config.decode_mode()) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("Error: Invalid sheet '{}': {}", sheet.display(), e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let info = SheetInfo { width: image.width(), height: image.height(), atlas: atlas.summary() };

    if json {
        match serde_json::to_string_pretty(&info) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::from(EXIT_ERROR);
            }
        }
    } else {
        println!("Atlas:    {}", info.atlas.name);
        println!("Sheet:    {}x{}", info.width, info.height);
        println!("Sprites:  {} ({} outside tilesets)", info.atlas.sprites, info.atlas.loose_sprites);
        println!("Tilesets: {}", info.atlas.tilesets);
        for tileset in &atlas.tilesets {
            println!(
                "  {} ({}x{} cells of {}x{} px, {} filled)",
                tileset.name,
                tileset.cols(),
                tileset.rows(),
                tileset.tile_width,
                tileset.tile_height,
                tileset.populated().count()
            );
        }
    }
    ExitCode::from(EXIT_SUCCESS)
}
