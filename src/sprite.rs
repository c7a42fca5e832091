//! Sprite records - named rectangles on the sheet

use std::io::{self, Read, Write};

use crate::binary::{AtlasReader, AtlasWriter, FormatError};

/// Pixel rectangle on a sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

/// One named sub-rectangle of the sheet plus its layout metadata.
///
/// The rectangle is stored as UV fractions of the full sheet size so the
/// same record stays valid if the sheet is rescaled.
#[derive(Debug, Clone, PartialEq)]
pub struct Sprite {
    pub name: String,
    /// Trimmed content width in pixels
    pub width: f32,
    /// Trimmed content height in pixels
    pub height: f32,
    pub start_u: f32,
    pub start_v: f32,
    pub end_u: f32,
    pub end_v: f32,
    /// Untrimmed width
    pub trim_width: f32,
    /// Untrimmed height
    pub trim_height: f32,
    pub offset_x: f32,
    pub offset_y: f32,
    /// Horizontal advance when used as a font glyph
    pub advance_width: f32,
}

impl Sprite {
    /// A sprite sized to an image that has not been placed on a sheet yet.
    ///
    /// Trim size matches the content and the advance is the full width,
    /// UV fields stay zero until placement.
    pub fn unplaced(name: impl Into<String>, width: u32, height: u32) -> Self {
        let (w, h) = (width as f32, height as f32);
        Self {
            name: name.into(),
            width: w,
            height: h,
            start_u: 0.0,
            start_v: 0.0,
            end_u: 0.0,
            end_v: 0.0,
            trim_width: w,
            trim_height: h,
            offset_x: 0.0,
            offset_y: 0.0,
            advance_width: w,
        }
    }

    pub fn read<R: Read>(r: &mut AtlasReader<R>) -> Result<Self, FormatError> {
        Ok(Self {
            name: r.read_string()?,
            width: r.read_f32()?,
            height: r.read_f32()?,
            start_u: r.read_f32()?,
            start_v: r.read_f32()?,
            end_u: r.read_f32()?,
            end_v: r.read_f32()?,
            trim_width: r.read_f32()?,
            trim_height: r.read_f32()?,
            offset_x: r.read_f32()?,
            offset_y: r.read_f32()?,
            advance_width: r.read_f32()?,
        })
    }

    pub fn write<W: Write>(&self, w: &mut AtlasWriter<W>) -> io::Result<()> {
        w.write_string(&self.name)?;
        for v in [
            self.width,
            self.height,
            self.start_u,
            self.start_v,
            self.end_u,
            self.end_v,
            self.trim_width,
            self.trim_height,
            self.offset_x,
            self.offset_y,
            self.advance_width,
        ] {
            w.write_f32(v)?;
        }
        Ok(())
    }

    /// Top-left pixel used when drawing refreshed content back onto a sheet.
    ///
    /// Rounds like [`Sprite::crop_rect`], so content is redrawn exactly where
    /// it was cropped from.
    pub fn origin_on(&self, sheet_w: u32, sheet_h: u32) -> (u32, u32) {
        let rect = self.crop_rect(sheet_w, sheet_h);
        (rect.x, rect.y)
    }

    /// Rectangle to crop when exporting, rounded to the nearest pixel.
    pub fn crop_rect(&self, sheet_w: u32, sheet_h: u32) -> PixelRect {
        let round = |v: f32| v.round().max(0.0) as u32;
        PixelRect {
            x: round(self.start_u * sheet_w as f32),
            y: round(self.start_v * sheet_h as f32),
            w: round((self.end_u - self.start_u) * sheet_w as f32),
            h: round((self.end_v - self.start_v) * sheet_h as f32),
        }
    }

    /// Record a pixel placement as UV fractions of the sheet.
    pub fn place_at(&mut self, x: u32, y: u32, sheet_w: u32, sheet_h: u32) {
        let (sw, sh) = (sheet_w as f32, sheet_h as f32);
        self.start_u = x as f32 / sw;
        self.start_v = y as f32 / sh;
        self.end_u = (x as f32 + self.width) / sw;
        self.end_v = (y as f32 + self.height) / sh;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample() -> Sprite {
        Sprite {
            name: "hero_idle".to_string(),
            width: 30.0,
            height: 40.0,
            start_u: 0.25,
            start_v: 0.5,
            end_u: 0.25 + 30.0 / 512.0,
            end_v: 0.5 + 40.0 / 256.0,
            trim_width: 32.0,
            trim_height: 48.0,
            offset_x: 1.0,
            offset_y: 4.0,
            advance_width: 33.0,
        }
    }

    #[test]
    fn test_record_layout() {
        let mut w = AtlasWriter::new(Vec::new());
        sample().write(&mut w).unwrap();
        let bytes = w.into_inner();
        // 1 length byte + 9 name bytes + 11 floats
        assert_eq!(bytes.len(), 1 + 9 + 11 * 4);
        assert_eq!(&bytes[10..14], &30.0f32.to_le_bytes());
        assert_eq!(&bytes[bytes.len() - 4..], &33.0f32.to_le_bytes());
    }

    #[test]
    fn test_read_back() {
        let mut w = AtlasWriter::new(Vec::new());
        sample().write(&mut w).unwrap();
        let mut r = AtlasReader::new(Cursor::new(w.into_inner()));
        assert_eq!(Sprite::read(&mut r).unwrap(), sample());
    }

    #[test]
    fn test_truncated_record_fails() {
        let mut w = AtlasWriter::new(Vec::new());
        sample().write(&mut w).unwrap();
        let mut bytes = w.into_inner();
        bytes.truncate(bytes.len() - 2);
        let mut r = AtlasReader::new(Cursor::new(bytes));
        assert!(matches!(Sprite::read(&mut r), Err(FormatError::UnexpectedEof(_))));
    }

    #[test]
    fn test_crop_rect() {
        let rect = sample().crop_rect(512, 256);
        assert_eq!(rect, PixelRect { x: 128, y: 128, w: 30, h: 40 });
    }

    #[test]
    fn test_origin_rounds_to_nearest() {
        let mut s = sample();
        s.start_u = 10.9 / 100.0;
        s.start_v = 0.0;
        assert_eq!(s.origin_on(100, 100), (11, 0));
    }

    #[test]
    fn test_origin_matches_crop_on_odd_sheet_sizes() {
        for sheet in [1000u32, 2000, 3000, 4095] {
            for x in 0..sheet {
                let mut s = Sprite::unplaced("a", 1, 1);
                s.place_at(x, x, sheet, sheet);
                let rect = s.crop_rect(sheet, sheet);
                assert_eq!(s.origin_on(sheet, sheet), (x, x), "sheet {}", sheet);
                assert_eq!((rect.x, rect.y), (x, x), "sheet {}", sheet);
            }
        }
    }

    #[test]
    fn test_unplaced_sprite() {
        let s = Sprite::unplaced("ui_1_0", 32, 16);
        assert_eq!((s.width, s.height), (32.0, 16.0));
        assert_eq!((s.trim_width, s.trim_height), (32.0, 16.0));
        assert_eq!(s.advance_width, 32.0);
        assert_eq!((s.start_u, s.start_v, s.end_u, s.end_v), (0.0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn test_place_at() {
        let mut s = Sprite::unplaced("a", 32, 32);
        s.place_at(64, 128, 256, 512);
        assert_eq!(s.start_u, 0.25);
        assert_eq!(s.start_v, 0.25);
        assert_eq!(s.end_u, 0.375);
        assert_eq!(s.end_v, 0.3125);
        assert_eq!(s.crop_rect(256, 512), PixelRect { x: 64, y: 128, w: 32, h: 32 });
    }
}
