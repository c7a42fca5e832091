//! Image file I/O and pixel-rectangle helpers

use image::{ImageFormat, RgbaImage};
use std::path::Path;

use crate::sprite::PixelRect;

/// Whether a path has an extension the image decoder understands.
pub fn is_image_file(path: &Path) -> bool {
    path.is_file() && ImageFormat::from_path(path).is_ok()
}

/// Load any supported image file as 8-bit RGBA.
pub fn load_image(path: &Path) -> Result<RgbaImage, image::ImageError> {
    Ok(image::open(path)?.to_rgba8())
}

/// Save an RGBA image as PNG, creating parent directories if needed.
pub fn save_png(image: &RgbaImage, path: &Path) -> Result<(), image::ImageError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(image::ImageError::IoError)?;
        }
    }
    image.save_with_format(path, ImageFormat::Png)
}

/// Copy a rectangle out of a sheet, clipped to the sheet bounds.
///
/// Returns `None` when the clipped rectangle is empty.
pub fn crop(sheet: &RgbaImage, rect: PixelRect) -> Option<RgbaImage> {
    let (sw, sh) = sheet.dimensions();
    if rect.x >= sw || rect.y >= sh {
        return None;
    }
    let w = rect.w.min(sw - rect.x);
    let h = rect.h.min(sh - rect.y);
    if w == 0 || h == 0 {
        return None;
    }
    Some(image::imageops::crop_imm(sheet, rect.x, rect.y, w, h).to_image())
}

/// Draw `src` onto `dest` with its top-left at `(x, y)`.
///
/// Pixels are replaced, not blended; anything outside `dest` is dropped.
pub fn blit(dest: &mut RgbaImage, src: &RgbaImage, x: u32, y: u32) {
    let (dw, dh) = dest.dimensions();
    if x >= dw || y >= dh {
        return;
    }
    let w = src.width().min(dw - x);
    let h = src.height().min(dh - y);
    for sy in 0..h {
        for sx in 0..w {
            dest.put_pixel(x + sx, y + sy, *src.get_pixel(sx, sy));
        }
    }
}
