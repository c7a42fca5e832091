//! spritepack - Library for unpacking and repacking sprite atlases
//!
//! This library provides functionality to:
//! - Read and write run-length encoded sheets (`.img`)
//! - Read and write atlas metadata (`.bin`): sprites and tilesets
//! - Export every sprite of a sheet to individual PNG files
//! - Repack a directory of edited sprites into a new sheet and atlas

pub mod atlas;
pub mod binary;
pub mod cli;
pub mod config;
pub mod imaging;
pub mod progress;
pub mod repack;
pub mod sheet;
pub mod sprite;
pub mod tileset;
