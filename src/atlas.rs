//! Atlas documents - sprites and tilesets describing one sheet
//!
//! The atlas file (`.bin`) stores, in order: atlas name, reference pixel UV,
//! the sprite records, then the tileset records. Tileset cells are resolved
//! against the sprite list by name, so the sprite list is the only owner of
//! sprite data.

use image::RgbaImage;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

use crate::binary::{AtlasReader, AtlasWriter, FormatError};
use crate::imaging::{crop, save_png};
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::sprite::Sprite;
use crate::tileset::Tileset;

/// Error loading, saving or exporting an atlas.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AtlasError {
    #[error("Cannot access '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid atlas file '{}': {source}", path.display())]
    Format {
        path: PathBuf,
        #[source]
        source: FormatError,
    },
    #[error("Cannot write image '{}': {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Root metadata for one sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct Atlas {
    /// In-game lookup key of the atlas
    pub name: String,
    /// UV of a known-white pixel used for solid-color draws
    pub reference_pixel: (f32, f32),
    sprites: Vec<Sprite>,
    pub tilesets: Vec<Tileset>,
    index: HashMap<String, usize>,
}

/// Counts reported by `spk info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AtlasSummary {
    pub name: String,
    pub sprites: usize,
    pub tilesets: usize,
    pub loose_sprites: usize,
}

/// Result of exporting an atlas to a directory.
#[derive(Debug, Default)]
pub struct ExportResult {
    /// Files written, in export order
    pub written: Vec<PathBuf>,
    /// Sprites with an empty rectangle on the sheet
    pub skipped: Vec<String>,
}

impl Atlas {
    pub fn new(name: impl Into<String>, reference_pixel: (f32, f32)) -> Self {
        Self {
            name: name.into(),
            reference_pixel,
            sprites: Vec::new(),
            tilesets: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn sprites(&self) -> &[Sprite] {
        &self.sprites
    }

    pub fn sprite(&self, name: &str) -> Option<&Sprite> {
        self.index.get(name).map(|&i| &self.sprites[i])
    }

    pub fn sprite_mut(&mut self, name: &str) -> Option<&mut Sprite> {
        self.index.get(name).map(|&i| &mut self.sprites[i])
    }

    pub fn contains_sprite(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Append a sprite. A sprite with the same name is replaced in place.
    pub fn push_sprite(&mut self, sprite: Sprite) {
        match self.index.get(&sprite.name) {
            Some(&i) => self.sprites[i] = sprite,
            None => {
                self.index.insert(sprite.name.clone(), self.sprites.len());
                self.sprites.push(sprite);
            }
        }
    }

    pub fn tileset(&self, name: &str) -> Option<&Tileset> {
        self.tilesets.iter().find(|t| t.name == name)
    }

    /// Sprites not placed in any tileset, in sprite order.
    pub fn loose_sprites(&self) -> impl Iterator<Item = &Sprite> {
        let in_tilesets: HashSet<&str> =
            self.tilesets.iter().flat_map(|t| t.sprite_names()).collect();
        self.sprites.iter().filter(move |s| !in_tilesets.contains(s.name.as_str()))
    }

    /// Keep only sprites accepted by `keep`, preserving order.
    ///
    /// Tileset cells naming a removed sprite are cleared. Returns the names
    /// of the removed sprites.
    pub fn retain_sprites(&mut self, mut keep: impl FnMut(&Sprite) -> bool) -> Vec<String> {
        let mut removed = Vec::new();
        self.sprites.retain(|s| {
            let k = keep(s);
            if !k {
                removed.push(s.name.clone());
            }
            k
        });
        self.rebuild_index();

        let index = &self.index;
        for tileset in &mut self.tilesets {
            tileset.clear_missing(|name| index.contains_key(name));
        }
        removed
    }

    fn rebuild_index(&mut self) {
        self.index = self.sprites.iter().enumerate().map(|(i, s)| (s.name.clone(), i)).collect();
    }

    pub fn summary(&self) -> AtlasSummary {
        AtlasSummary {
            name: self.name.clone(),
            sprites: self.sprites.len(),
            tilesets: self.tilesets.len(),
            loose_sprites: self.loose_sprites().count(),
        }
    }

    /// Decode an atlas. Any structural error aborts the whole decode.
    pub fn decode<R: Read>(reader: R) -> Result<Self, FormatError> {
        let mut r = AtlasReader::new(reader);
        let name = r.read_string()?;
        let reference_pixel = (r.read_f32()?, r.read_f32()?);
        let mut atlas = Atlas::new(name, reference_pixel);

        let sprite_count = r.read_count("sprite")?;
        for _ in 0..sprite_count {
            let sprite = Sprite::read(&mut r)?;
            if atlas.contains_sprite(&sprite.name) {
                return Err(FormatError::Malformed(format!(
                    "duplicate sprite name '{}'",
                    sprite.name
                )));
            }
            atlas.push_sprite(sprite);
        }

        let tileset_count = r.read_count("tileset")?;
        for _ in 0..tileset_count {
            let tileset = Tileset::read(&mut r, |name| atlas.index.contains_key(name))?;
            atlas.tilesets.push(tileset);
        }

        Ok(atlas)
    }

    pub fn encode<W: Write>(&self, writer: W) -> std::io::Result<()> {
        let mut w = AtlasWriter::new(writer);
        w.write_string(&self.name)?;
        w.write_f32(self.reference_pixel.0)?;
        w.write_f32(self.reference_pixel.1)?;

        w.write_count(self.sprites.len())?;
        for sprite in &self.sprites {
            sprite.write(&mut w)?;
        }

        w.write_count(self.tilesets.len())?;
        for tileset in &self.tilesets {
            tileset.write(&mut w)?;
        }
        w.flush()
    }

    /// Load an atlas (`.bin`) file.
    pub fn load(path: &Path) -> Result<Self, AtlasError> {
        let file = File::open(path)
            .map_err(|source| AtlasError::Io { path: path.to_path_buf(), source })?;
        Self::decode(BufReader::new(file))
            .map_err(|source| AtlasError::Format { path: path.to_path_buf(), source })
    }

    /// Write the atlas to `path`, replacing any existing file.
    pub fn save(&self, path: &Path) -> Result<(), AtlasError> {
        let io_err = |source| AtlasError::Io { path: path.to_path_buf(), source };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(io_err)?;
            }
        }
        let file = File::create(path).map_err(io_err)?;
        self.encode(BufWriter::new(file)).map_err(io_err)
    }

    /// Write every sprite of the sheet to individual PNG files.
    ///
    /// Each tileset gets a subdirectory holding its cell sprites; every other
    /// sprite is written directly into `dir`.
    pub fn export(
        &self,
        sheet: &RgbaImage,
        dir: &Path,
        progress: &dyn ProgressReporter,
    ) -> Result<ExportResult, AtlasError> {
        std::fs::create_dir_all(dir)
            .map_err(|source| AtlasError::Io { path: dir.to_path_buf(), source })?;
        let mut result = ExportResult::default();

        let start = Instant::now();
        progress.report(ProgressEvent::PhaseStarted {
            phase: "tilesets".to_string(),
            total: self.tilesets.len(),
        });
        for tileset in &self.tilesets {
            if !is_plain_file_name(&tileset.name) {
                progress.warn(
                    Some(tileset.name.as_str()),
                    "tileset name is not a plain directory name, not exported".to_string(),
                );
                result.skipped.extend(tileset.sprite_names().map(str::to_string));
                continue;
            }
            let tileset_dir = dir.join(&tileset.name);
            std::fs::create_dir_all(&tileset_dir)
                .map_err(|source| AtlasError::Io { path: tileset_dir.clone(), source })?;
            for (_, _, name) in tileset.populated() {
                if let Some(sprite) = self.sprite(name) {
                    self.export_sprite(sheet, sprite, &tileset_dir, progress, &mut result)?;
                }
            }
            progress.report(ProgressEvent::ItemCompleted {
                phase: "tilesets".to_string(),
                item: tileset.name.clone(),
            });
        }
        progress.report(ProgressEvent::PhaseCompleted {
            phase: "tilesets".to_string(),
            count: self.tilesets.len(),
            duration_ms: start.elapsed().as_millis() as u64,
        });

        let start = Instant::now();
        let loose: Vec<&Sprite> = self.loose_sprites().collect();
        progress.report(ProgressEvent::PhaseStarted {
            phase: "sprites".to_string(),
            total: loose.len(),
        });
        for sprite in &loose {
            self.export_sprite(sheet, sprite, dir, progress, &mut result)?;
            progress.report(ProgressEvent::ItemCompleted {
                phase: "sprites".to_string(),
                item: sprite.name.clone(),
            });
        }
        progress.report(ProgressEvent::PhaseCompleted {
            phase: "sprites".to_string(),
            count: loose.len(),
            duration_ms: start.elapsed().as_millis() as u64,
        });

        Ok(result)
    }

    fn export_sprite(
        &self,
        sheet: &RgbaImage,
        sprite: &Sprite,
        dir: &Path,
        progress: &dyn ProgressReporter,
        result: &mut ExportResult,
    ) -> Result<(), AtlasError> {
        if !is_plain_file_name(&sprite.name) {
            progress.warn(
                Some(sprite.name.as_str()),
                "sprite name is not a plain file name, not exported".to_string(),
            );
            result.skipped.push(sprite.name.clone());
            return Ok(());
        }
        let rect = sprite.crop_rect(sheet.width(), sheet.height());
        let Some(image) = crop(sheet, rect) else {
            progress.warn(Some(sprite.name.as_str()), "empty rectangle on sheet, not exported".to_string());
            result.skipped.push(sprite.name.clone());
            return Ok(());
        };
        let path = dir.join(format!("{}.png", sprite.name));
        save_png(&image, &path).map_err(|source| AtlasError::Image { path: path.clone(), source })?;
        result.written.push(path);
        Ok(())
    }
}

/// Whether `name` can be joined onto an export directory without leaving it.
fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\', ':', '\0'])
}
