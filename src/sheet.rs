//! Run-length encoded sheet format (`.img`)
//!
//! Layout: `i32 width`, `i32 height`, then runs of `u8 count` followed by
//! one RGBA color, repeated `count` times in row-major pixel order.

use image::{Rgba, RgbaImage};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::binary::{AtlasReader, AtlasWriter, FormatError};

/// Largest width or height of a sheet, for both encoding and decoding.
pub const MAX_SHEET_DIMENSION: i32 = 16384;

/// Longest run a single count byte can describe.
const MAX_RUN: u8 = u8::MAX;

/// How to treat a run stream that ends before every pixel is covered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SheetDecodeMode {
    /// Keep what was decoded; the remainder stays transparent
    #[default]
    Lenient,
    /// Fail with `FormatError::TruncatedSheet`
    Strict,
}

/// Decode a sheet from a run-length stream.
///
/// Decoding stops once `width * height` pixels are filled or the stream is
/// exhausted. In lenient mode a short stream yields a partially filled image.
pub fn decode_sheet<R: Read>(reader: R, mode: SheetDecodeMode) -> Result<RgbaImage, FormatError> {
    let mut r = AtlasReader::new(reader);
    let width = r.read_i32()?;
    let height = r.read_i32()?;
    if width < 0 || height < 0 || width > MAX_SHEET_DIMENSION || height > MAX_SHEET_DIMENSION {
        return Err(FormatError::InvalidDimensions { width, height });
    }

    let mut image = RgbaImage::new(width as u32, height as u32);
    let total = width as usize * height as usize;
    let buf: &mut [u8] = &mut image;
    let mut filled = 0usize;

    while filled < total {
        let count = match r.read_u8() {
            Ok(n) => n as usize,
            Err(FormatError::UnexpectedEof(_)) => break,
            Err(e) => return Err(e),
        };
        let mut color = [0u8; 4];
        let mut complete = true;
        for channel in color.iter_mut() {
            match r.read_u8() {
                Ok(v) => *channel = v,
                Err(FormatError::UnexpectedEof(_)) => {
                    complete = false;
                    break;
                }
                Err(e) => return Err(e),
            }
        }
        if !complete {
            break;
        }

        let run = count.min(total - filled);
        for px in buf[filled * 4..(filled + run) * 4].chunks_exact_mut(4) {
            px.copy_from_slice(&color);
        }
        filled += run;
    }

    if filled < total && mode == SheetDecodeMode::Strict {
        return Err(FormatError::TruncatedSheet { expected: total as u64, read: filled as u64 });
    }

    Ok(image)
}

/// Encode a sheet as a maximal run-length stream.
///
/// Images wider or taller than [`MAX_SHEET_DIMENSION`] are refused with
/// `InvalidInput`, since they could not be decoded again.
pub fn encode_sheet<W: Write>(image: &RgbaImage, writer: W) -> std::io::Result<()> {
    let (width, height) = dimensions(image)?;
    let mut w = AtlasWriter::new(writer);
    w.write_i32(width)?;
    w.write_i32(height)?;

    let mut current = Rgba([0u8; 4]);
    let mut count: u8 = 0;

    for px in image.pixels() {
        if *px == current && count < MAX_RUN {
            count += 1;
            continue;
        }
        if count > 0 {
            write_run(&mut w, count, current)?;
        }
        current = *px;
        count = 1;
    }
    if count > 0 {
        write_run(&mut w, count, current)?;
    }

    w.flush()
}

fn dimensions(image: &RgbaImage) -> std::io::Result<(i32, i32)> {
    let (width, height) = image.dimensions();
    let max = MAX_SHEET_DIMENSION as u32;
    if width > max || height > max {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("sheet {}x{} exceeds the {}x{} limit", width, height, max, max),
        ));
    }
    Ok((width as i32, height as i32))
}

fn write_run<W: Write>(w: &mut AtlasWriter<W>, count: u8, color: Rgba<u8>) -> std::io::Result<()> {
    w.write_u8(count)?;
    for channel in color.0 {
        w.write_u8(channel)?;
    }
    Ok(())
}

/// Load a `.img` sheet from disk.
pub fn load_sheet(path: &Path, mode: SheetDecodeMode) -> Result<RgbaImage, FormatError> {
    let file = File::open(path).map_err(FormatError::Io)?;
    decode_sheet(BufReader::new(file), mode)
}

/// Write a `.img` sheet to disk, replacing any existing file.
pub fn save_sheet(image: &RgbaImage, path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    dimensions(image)?;
    let file = File::create(path)?;
    encode_sheet(image, BufWriter::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 128]);

    fn encode(image: &RgbaImage) -> Vec<u8> {
        let mut out = Vec::new();
        encode_sheet(image, &mut out).unwrap();
        out
    }

    /// Split an encoded stream into (count, color) runs.
    fn runs(bytes: &[u8]) -> Vec<(u8, [u8; 4])> {
        bytes[8..]
            .chunks_exact(5)
            .map(|c| (c[0], [c[1], c[2], c[3], c[4]]))
            .collect()
    }

    #[test]
    fn test_header_and_single_run() {
        let image = RgbaImage::from_pixel(3, 2, RED);
        let bytes = encode(&image);
        assert_eq!(&bytes[..4], &3i32.to_le_bytes());
        assert_eq!(&bytes[4..8], &2i32.to_le_bytes());
        assert_eq!(runs(&bytes), vec![(6, [255, 0, 0, 255])]);
    }

    #[test]
    fn test_runs_follow_row_major_order() {
        let mut image = RgbaImage::from_pixel(2, 2, RED);
        image.put_pixel(1, 0, BLUE);
        image.put_pixel(0, 1, BLUE);
        let bytes = encode(&image);
        assert_eq!(runs(&bytes), vec![(1, RED.0), (2, BLUE.0), (1, RED.0)]);
    }

    #[test]
    fn test_long_runs_split_at_255() {
        let image = RgbaImage::from_pixel(600, 1, RED);
        let r = runs(&encode(&image));
        assert_eq!(r.iter().map(|(n, _)| *n as u32).collect::<Vec<_>>(), vec![255, 255, 90]);
    }

    #[test]
    fn test_round_trip_is_lossless() {
        let mut image = RgbaImage::new(37, 23);
        for (x, y, px) in image.enumerate_pixels_mut() {
            // Mix of long flat runs and noisy areas
            *px = if y < 10 { RED } else { Rgba([(x * 7) as u8, (y * 3) as u8, (x ^ y) as u8, 200]) };
        }
        let bytes = encode(&image);
        let decoded = decode_sheet(Cursor::new(bytes), SheetDecodeMode::Strict).unwrap();
        assert_eq!(decoded, image);
    }

    #[test]
    fn test_runs_are_maximal() {
        let mut image = RgbaImage::from_pixel(64, 64, RED);
        for i in 0..64 {
            image.put_pixel(i, i, BLUE);
        }
        let r = runs(&encode(&image));
        for pair in r.windows(2) {
            assert!(pair[0].0 >= 1);
            assert!(pair[0].1 != pair[1].1 || pair[0].0 == 255, "adjacent runs share a color");
        }
    }

    #[test]
    fn test_empty_image() {
        let image = RgbaImage::new(0, 0);
        let bytes = encode(&image);
        assert_eq!(bytes.len(), 8);
        let decoded = decode_sheet(Cursor::new(bytes), SheetDecodeMode::Strict).unwrap();
        assert_eq!(decoded.dimensions(), (0, 0));
    }

    #[test]
    fn test_truncated_stream_lenient() {
        let image = RgbaImage::from_pixel(4, 4, RED);
        let mut bytes = encode(&image);
        // Replace the single 16-pixel run with a 5-pixel one
        bytes[8] = 5;
        let decoded = decode_sheet(Cursor::new(bytes), SheetDecodeMode::Lenient).unwrap();
        assert_eq!(*decoded.get_pixel(0, 0), RED);
        assert_eq!(*decoded.get_pixel(0, 1), RED);
        assert_eq!(*decoded.get_pixel(1, 1), Rgba([0, 0, 0, 0]));
        assert_eq!(*decoded.get_pixel(3, 3), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn test_truncated_stream_strict() {
        let image = RgbaImage::from_pixel(4, 4, RED);
        let mut bytes = encode(&image);
        bytes[8] = 5;
        let result = decode_sheet(Cursor::new(bytes), SheetDecodeMode::Strict);
        assert!(matches!(result, Err(FormatError::TruncatedSheet { expected: 16, read: 5 })));
    }

    #[test]
    fn test_partial_run_record_ignored() {
        let image = RgbaImage::from_pixel(2, 1, RED);
        let mut bytes = encode(&image);
        bytes[8] = 1;
        bytes.extend_from_slice(&[1, 0, 0]);
        let decoded = decode_sheet(Cursor::new(bytes), SheetDecodeMode::Lenient).unwrap();
        assert_eq!(*decoded.get_pixel(1, 0), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn test_overlong_run_is_clamped() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&2i32.to_le_bytes());
        bytes.extend_from_slice(&1i32.to_le_bytes());
        bytes.extend_from_slice(&[200, 1, 2, 3, 4]);
        let decoded = decode_sheet(Cursor::new(bytes), SheetDecodeMode::Strict).unwrap();
        assert_eq!(*decoded.get_pixel(1, 0), Rgba([1, 2, 3, 4]));
    }

    #[test]
    fn test_negative_dimensions_rejected() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(-1i32).to_le_bytes());
        bytes.extend_from_slice(&4i32.to_le_bytes());
        let result = decode_sheet(Cursor::new(bytes), SheetDecodeMode::Lenient);
        assert!(matches!(result, Err(FormatError::InvalidDimensions { width: -1, height: 4 })));
    }

    #[test]
    fn test_oversized_sheet_not_written() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("wide.img");
        let image = RgbaImage::new(MAX_SHEET_DIMENSION as u32 + 1, 1);

        let err = save_sheet(&image, &path).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
        assert!(!path.exists());

        let mut out = Vec::new();
        assert!(encode_sheet(&image, &mut out).is_err());
        assert!(out.is_empty());
    }

    #[test]
    fn test_largest_sheet_dimension_round_trips() {
        let image = RgbaImage::from_pixel(MAX_SHEET_DIMENSION as u32, 1, RED);
        let decoded = decode_sheet(Cursor::new(encode(&image)), SheetDecodeMode::Strict).unwrap();
        assert_eq!(decoded, image);
    }

    #[test]
    fn test_missing_header_is_eof() {
        let result = decode_sheet(Cursor::new(vec![1, 0, 0]), SheetDecodeMode::Lenient);
        assert!(matches!(result, Err(FormatError::UnexpectedEof(_))));
    }

    #[test]
    fn test_save_and_load_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("nested").join("sheet.img");
        let mut image = RgbaImage::from_pixel(8, 8, RED);
        image.put_pixel(7, 7, BLUE);

        save_sheet(&image, &path).unwrap();
        let loaded = load_sheet(&path, SheetDecodeMode::Strict).unwrap();
        assert_eq!(loaded, image);
    }
}
