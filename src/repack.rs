//! Repacking - rebuild a sheet and atlas from a directory of edited sprites
//!
//! The source directory uses the export layout: one subdirectory per tileset
//! holding `{tileset}_{col}_{row}` images, plus loose sprite images in the
//! root. Sprites that already exist keep their rectangle and only get their
//! pixels refreshed. New sprites are packed into the largest free area the
//! heuristic in [`free_area`] finds, and sprites without a source file are
//! dropped from the atlas.

use image::RgbaImage;
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

use crate::atlas::Atlas;
use crate::imaging::{blit, is_image_file, load_image};
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::sprite::Sprite;
use crate::tileset::parse_cell_name;

/// Default sheet edge length in pixels.
pub const DEFAULT_SHEET_SIZE: u32 = 4096;

/// Default gap between the free-area anchor and the first new sprite.
pub const DEFAULT_MARGIN: u32 = 10;

/// Error during repacking.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RepackError {
    #[error("Cannot access '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// New sprites do not fit into the free space of the sheet
    #[error(
        "Sprite '{sprite}' ({width}x{height}) does not fit on the {sheet_width}x{sheet_height} sheet"
    )]
    CapacityExceeded { sprite: String, width: u32, height: u32, sheet_width: u32, sheet_height: u32 },
}

/// Sheet size and placement settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepackOptions {
    pub width: u32,
    pub height: u32,
    /// Offset from the free-area anchor on both axes
    pub margin: u32,
}

impl Default for RepackOptions {
    fn default() -> Self {
        Self { width: DEFAULT_SHEET_SIZE, height: DEFAULT_SHEET_SIZE, margin: DEFAULT_MARGIN }
    }
}

/// Result of a repack.
#[derive(Debug)]
pub struct RepackOutcome {
    /// The rebuilt sheet
    pub sheet: RgbaImage,
    /// Existing sprites whose pixels were redrawn
    pub refreshed: usize,
    /// Sprites created and placed, in placement order
    pub added: Vec<String>,
    /// Sprites dropped because no source file exists
    pub removed: Vec<String>,
    /// Files that were ignored
    pub skipped: Vec<PathBuf>,
}

/// Find the top-left corner of a transparent area anchored at the
/// bottom-right of the sheet.
///
/// Rows are scanned bottom-up while tracking `edge`, the column just right of
/// the rightmost opaque pixel in any row scanned so far; each row is only
/// scanned from the right down to `edge`. The rectangle `[edge, W) x [y, H)`
/// is therefore fully transparent, and the one with the largest area wins.
/// Returns `(W, H)` when no such rectangle exists.
pub fn free_area(sheet: &RgbaImage) -> (u32, u32) {
    let (w, h) = sheet.dimensions();
    let mut edge = 0u32;
    let mut best = (w, h);
    let mut best_area = 0u64;

    for y in (0..h).rev() {
        if let Some(x) = (edge..w).rev().find(|&x| sheet.get_pixel(x, y)[3] != 0) {
            edge = x + 1;
        }
        if edge == w {
            break;
        }
        let area = (w - edge) as u64 * (h - y) as u64;
        if area > best_area {
            best_area = area;
            best = (edge, y);
        }
    }

    best
}

/// Left-to-right row packer starting at an anchor point.
#[derive(Debug)]
struct PackCursor {
    start_x: u64,
    x: u64,
    y: u64,
    row_height: u64,
    width: u64,
    height: u64,
}

impl PackCursor {
    fn new(anchor: (u32, u32), margin: u32, width: u32, height: u32) -> Self {
        let start_x = anchor.0 as u64 + margin as u64;
        Self {
            start_x,
            x: start_x,
            y: anchor.1 as u64 + margin as u64,
            row_height: 0,
            width: width as u64,
            height: height as u64,
        }
    }

    /// Position for a `w x h` sprite, wrapping to a new row when it would
    /// cross the right edge. `None` when it cannot fit on the sheet.
    fn place(&mut self, w: u32, h: u32) -> Option<(u32, u32)> {
        let (w, h) = (w as u64, h as u64);
        if self.x + w > self.width {
            self.y += self.row_height;
            self.row_height = 0;
            self.x = self.start_x;
        }
        if self.x + w > self.width || self.y + h > self.height {
            return None;
        }
        let pos = (self.x as u32, self.y as u32);
        self.x += w;
        self.row_height = self.row_height.max(h);
        Some(pos)
    }
}

/// A sprite created during this repack, waiting for a position.
struct Pending {
    name: String,
    image: RgbaImage,
}

/// Mutable state shared by the repack phases.
struct RepackState<'a> {
    atlas: &'a mut Atlas,
    sheet: RgbaImage,
    found: HashSet<String>,
    queue: Vec<Pending>,
    refreshed: usize,
    skipped: Vec<PathBuf>,
    progress: &'a dyn ProgressReporter,
}

impl RepackState<'_> {
    fn skip(&mut self, path: &Path, message: String) {
        let context = path.display().to_string();
        self.progress.warn(Some(context.as_str()), message);
        self.skipped.push(path.to_path_buf());
    }

    /// Redraw an existing sprite or queue a new one. `draw` is false for
    /// tileset marker sprites whose pixels already live in the tileset cells.
    fn resolve(&mut self, name: &str, image: RgbaImage, draw: bool) {
        self.found.insert(name.to_string());
        match self.atlas.sprite(name) {
            Some(sprite) => {
                if draw {
                    let (x, y) = sprite.origin_on(self.sheet.width(), self.sheet.height());
                    blit(&mut self.sheet, &image, x, y);
                    self.refreshed += 1;
                }
            }
            None => {
                self.atlas.push_sprite(Sprite::unplaced(name, image.width(), image.height()));
                self.queue.push(Pending { name: name.to_string(), image });
            }
        }
    }

    fn tileset_file(&mut self, tileset_idx: usize, path: &Path, stem: &str, image: RgbaImage) {
        if !self.atlas.tilesets[tileset_idx].contains(stem) {
            let Some((col, row)) = parse_cell_name(stem) else {
                self.skip(path, "file name is not of the form {tileset}_{col}_{row}".to_string());
                return;
            };
            let tileset = &mut self.atlas.tilesets[tileset_idx];
            let expected = tileset.cell_name(col, row);
            if expected != stem {
                let message = format!("expected '{}', cell is lost when the atlas is reloaded", expected);
                self.progress.warn(Some(stem), message);
            }
            tileset.ensure_contains(col, row);
            if let Some(previous) = tileset.sprite_at(col, row) {
                let message = format!("cell ({}, {}) held '{}', replaced by '{}'", col, row, previous, stem);
                self.progress.warn(Some(tileset.name.as_str()), message);
            }
            tileset.set_cell(col, row, Some(stem.to_string()));
        }
        self.resolve(stem, image, true);
    }

    fn loose_file(&mut self, stem: &str, image: RgbaImage) {
        let is_marker = self.atlas.tileset(stem).is_some();
        self.resolve(stem, image, !is_marker);
    }

    fn place_queued(&mut self, margin: u32) -> Result<Vec<String>, RepackError> {
        let queue = std::mem::take(&mut self.queue);
        if queue.is_empty() {
            return Ok(Vec::new());
        }

        let (sheet_w, sheet_h) = self.sheet.dimensions();
        let anchor = free_area(&self.sheet);
        let mut cursor = PackCursor::new(anchor, margin, sheet_w, sheet_h);
        let mut added = Vec::with_capacity(queue.len());

        for pending in queue {
            let (w, h) = pending.image.dimensions();
            let (x, y) = cursor.place(w, h).ok_or_else(|| RepackError::CapacityExceeded {
                sprite: pending.name.clone(),
                width: w,
                height: h,
                sheet_width: sheet_w,
                sheet_height: sheet_h,
            })?;
            if let Some(sprite) = self.atlas.sprite_mut(&pending.name) {
                sprite.place_at(x, y, sheet_w, sheet_h);
            }
            blit(&mut self.sheet, &pending.image, x, y);
            self.progress.report(ProgressEvent::ItemCompleted {
                phase: "placement".to_string(),
                item: pending.name.clone(),
            });
            added.push(pending.name);
        }
        Ok(added)
    }
}

/// Subdirectories and files of `dir`, each sorted by path.
fn list_dir(dir: &Path) -> Result<(Vec<PathBuf>, Vec<PathBuf>), RepackError> {
    let io_err = |source| RepackError::Io { path: dir.to_path_buf(), source };
    let mut dirs = Vec::new();
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_dir() {
            dirs.push(path);
        } else if path.is_file() {
            files.push(path);
        }
    }
    dirs.sort();
    files.sort();
    Ok((dirs, files))
}

fn file_stem(path: &Path) -> Option<&str> {
    path.file_stem().and_then(|s| s.to_str())
}

/// Decode every image file in `files` in parallel, keeping input order.
///
/// Non-image files, undecodable images and non-UTF-8 names are reported
/// through `on_skip`; only I/O failures abort.
fn load_images(
    files: &[PathBuf],
    mut on_skip: impl FnMut(&Path, String),
) -> Result<Vec<(PathBuf, String, RgbaImage)>, RepackError> {
    let mut candidates = Vec::new();
    for path in files {
        if !is_image_file(path) {
            on_skip(path, "not a supported image file".to_string());
        } else if let Some(stem) = file_stem(path) {
            candidates.push((path.clone(), stem.to_string()));
        } else {
            on_skip(path, "file name is not valid UTF-8".to_string());
        }
    }

    let decoded: Vec<_> = candidates
        .into_par_iter()
        .map(|(path, stem)| {
            let image = load_image(&path);
            (path, stem, image)
        })
        .collect();

    let mut images = Vec::with_capacity(decoded.len());
    for (path, stem, image) in decoded {
        match image {
            Ok(image) => images.push((path, stem, image)),
            Err(image::ImageError::IoError(source)) => {
                return Err(RepackError::Io { path, source });
            }
            Err(e) => on_skip(&path, format!("cannot decode image: {}", e)),
        }
    }
    Ok(images)
}

/// Rebuild `atlas` and a new sheet from the sprite images under `source`.
///
/// Phases run strictly in order: tileset directories (file-name order),
/// loose files, placement of new sprites, pruning. Only image decoding
/// inside a directory runs in parallel.
pub fn repack(
    source: &Path,
    atlas: &mut Atlas,
    options: &RepackOptions,
    progress: &dyn ProgressReporter,
) -> Result<RepackOutcome, RepackError> {
    let (dirs, files) = list_dir(source)?;
    let mut state = RepackState {
        atlas,
        sheet: RgbaImage::new(options.width, options.height),
        found: HashSet::new(),
        queue: Vec::new(),
        refreshed: 0,
        skipped: Vec::new(),
        progress,
    };

    let start = Instant::now();
    progress.report(ProgressEvent::PhaseStarted { phase: "tilesets".to_string(), total: dirs.len() });
    let mut seen_tilesets = 0;
    for dir in &dirs {
        let dir_name = dir.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        let Some(tileset_idx) = state.atlas.tilesets.iter().position(|t| t.name == dir_name) else {
            progress.warn(
                Some(dir.display().to_string().as_str()),
                "no tileset with this name, directory skipped".to_string(),
            );
            continue;
        };

        let (_, tile_files) = list_dir(dir)?;
        let mut skipped = Vec::new();
        let images = load_images(&tile_files, |p, m| skipped.push((p.to_path_buf(), m)))?;
        for (path, message) in skipped {
            state.skip(&path, message);
        }
        for (path, stem, image) in images {
            if state.found.contains(&stem) {
                state.skip(&path, format!("sprite '{}' already has a source file", stem));
                continue;
            }
            state.tileset_file(tileset_idx, &path, &stem, image);
        }

        seen_tilesets += 1;
        progress.report(ProgressEvent::ItemCompleted {
            phase: "tilesets".to_string(),
            item: dir_name.to_string(),
        });
    }
    progress.report(ProgressEvent::PhaseCompleted {
        phase: "tilesets".to_string(),
        count: seen_tilesets,
        duration_ms: start.elapsed().as_millis() as u64,
    });

    let start = Instant::now();
    progress.report(ProgressEvent::PhaseStarted { phase: "sprites".to_string(), total: files.len() });
    let mut skipped = Vec::new();
    let images = load_images(&files, |p, m| skipped.push((p.to_path_buf(), m)))?;
    for (path, message) in skipped {
        state.skip(&path, message);
    }
    let loose_count = images.len();
    for (path, stem, image) in images {
        if state.found.contains(&stem) {
            state.skip(&path, format!("sprite '{}' already has a source file", stem));
            continue;
        }
        state.loose_file(&stem, image);
        progress.report(ProgressEvent::ItemCompleted { phase: "sprites".to_string(), item: stem });
    }
    progress.report(ProgressEvent::PhaseCompleted {
        phase: "sprites".to_string(),
        count: loose_count,
        duration_ms: start.elapsed().as_millis() as u64,
    });

    let start = Instant::now();
    progress.report(ProgressEvent::PhaseStarted {
        phase: "placement".to_string(),
        total: state.queue.len(),
    });
    let added = state.place_queued(options.margin)?;
    progress.report(ProgressEvent::PhaseCompleted {
        phase: "placement".to_string(),
        count: added.len(),
        duration_ms: start.elapsed().as_millis() as u64,
    });

    let found = std::mem::take(&mut state.found);
    let removed = state.atlas.retain_sprites(|s| found.contains(&s.name));

    Ok(RepackOutcome {
        sheet: state.sheet,
        refreshed: state.refreshed,
        added,
        removed,
        skipped: state.skipped,
    })
}
