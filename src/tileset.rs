//! Tilesets - named, growable grids of sprite references
//!
//! A cell holds the *name* of a sprite owned by the atlas rather than the
//! sprite itself. Cell sprites follow the naming convention
//! `{tileset}_{col}_{row}`, which is also how cells are reconstructed when
//! an atlas file is decoded.

use std::io::{self, Read, Write};

use crate::binary::{AtlasReader, AtlasWriter, FormatError};

/// Upper bound on `cols * rows` accepted when decoding a tileset.
pub const MAX_GRID_CELLS: usize = 1 << 20;

/// Dense 2-D grid indexed `(col, row)`, stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T> {
    cols: usize,
    rows: usize,
    data: Vec<T>,
}

impl<T: Clone + Default> Grid<T> {
    pub fn new(cols: usize, rows: usize) -> Self {
        Self { cols, rows, data: vec![T::default(); cols * rows] }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn index(&self, col: usize, row: usize) -> Option<usize> {
        (col < self.cols && row < self.rows).then(|| row * self.cols + col)
    }

    pub fn get(&self, col: usize, row: usize) -> Option<&T> {
        self.index(col, row).map(|i| &self.data[i])
    }

    pub fn get_mut(&mut self, col: usize, row: usize) -> Option<&mut T> {
        self.index(col, row).map(move |i| &mut self.data[i])
    }

    /// Overwrite a cell. Returns `false` when out of bounds.
    pub fn set(&mut self, col: usize, row: usize, value: T) -> bool {
        match self.get_mut(col, row) {
            Some(cell) => {
                *cell = value;
                true
            }
            None => false,
        }
    }

    /// First cell matching `pred`, searching column by column.
    pub fn position(&self, mut pred: impl FnMut(&T) -> bool) -> Option<(usize, usize)> {
        for col in 0..self.cols {
            for row in 0..self.rows {
                if pred(&self.data[row * self.cols + col]) {
                    return Some((col, row));
                }
            }
        }
        None
    }

    /// Iterate `(col, row, value)` in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &T)> {
        let cols = self.cols.max(1);
        self.data.iter().enumerate().map(move |(i, v)| (i % cols, i / cols, v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.data.iter_mut()
    }

    /// Add `n` columns; existing cells keep their coordinates.
    pub fn extend_width(&mut self, n: usize) {
        self.resize(self.cols + n, self.rows);
    }

    /// Add `n` rows; existing cells keep their coordinates.
    pub fn extend_height(&mut self, n: usize) {
        self.resize(self.cols, self.rows + n);
    }

    fn resize(&mut self, cols: usize, rows: usize) {
        let mut data = vec![T::default(); cols * rows];
        for row in 0..self.rows {
            let src = row * self.cols;
            let dst = row * cols;
            data[dst..dst + self.cols].clone_from_slice(&self.data[src..src + self.cols]);
        }
        self.cols = cols;
        self.rows = rows;
        self.data = data;
    }
}

/// A named grid of sprites.
#[derive(Debug, Clone, PartialEq)]
pub struct Tileset {
    pub name: String,
    /// Nominal tile size, descriptive only
    pub tile_width: i32,
    pub tile_height: i32,
    cells: Grid<Option<String>>,
    /// Cells dropped or merged by an external optimization pass
    optimized: Option<Grid<bool>>,
}

impl Tileset {
    pub fn new(name: impl Into<String>, tile_width: i32, tile_height: i32, cols: usize, rows: usize) -> Self {
        Self {
            name: name.into(),
            tile_width,
            tile_height,
            cells: Grid::new(cols, rows),
            optimized: None,
        }
    }

    /// Attach an all-false optimization mask of the current shape.
    pub fn with_optimized_flags(mut self) -> Self {
        self.optimized = Some(Grid::new(self.cols(), self.rows()));
        self
    }

    pub fn cols(&self) -> usize {
        self.cells.cols()
    }

    pub fn rows(&self) -> usize {
        self.cells.rows()
    }

    pub fn cells(&self) -> &Grid<Option<String>> {
        &self.cells
    }

    pub fn optimized(&self) -> Option<&Grid<bool>> {
        self.optimized.as_ref()
    }

    pub fn set_optimized(&mut self, col: usize, row: usize, value: bool) -> bool {
        match self.optimized.as_mut() {
            Some(grid) => grid.set(col, row, value),
            None => false,
        }
    }

    /// Name a cell's sprite must carry: `{tileset}_{col}_{row}`.
    pub fn cell_name(&self, col: usize, row: usize) -> String {
        format!("{}_{}_{}", self.name, col, row)
    }

    /// Sprite name stored at a cell.
    pub fn sprite_at(&self, col: usize, row: usize) -> Option<&str> {
        self.cells.get(col, row).and_then(|c| c.as_deref())
    }

    pub fn set_cell(&mut self, col: usize, row: usize, sprite: Option<String>) -> bool {
        self.cells.set(col, row, sprite)
    }

    /// Grid position of a sprite by name.
    pub fn position_of(&self, sprite: &str) -> Option<(usize, usize)> {
        self.cells.position(|c| c.as_deref() == Some(sprite))
    }

    pub fn contains(&self, sprite: &str) -> bool {
        self.position_of(sprite).is_some()
    }

    /// Names of all sprites placed in this tileset, row-major.
    pub fn sprite_names(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().filter_map(|(_, _, c)| c.as_deref())
    }

    /// Populated cells as `(col, row, sprite)`.
    pub fn populated(&self) -> impl Iterator<Item = (usize, usize, &str)> {
        self.cells.iter().filter_map(|(c, r, s)| s.as_deref().map(|s| (c, r, s)))
    }

    pub fn extend_width(&mut self, n: usize) {
        self.cells.extend_width(n);
        if let Some(opt) = self.optimized.as_mut() {
            opt.extend_width(n);
        }
    }

    pub fn extend_height(&mut self, n: usize) {
        self.cells.extend_height(n);
        if let Some(opt) = self.optimized.as_mut() {
            opt.extend_height(n);
        }
    }

    /// Grow one step at a time until `(col, row)` is inside the grid.
    ///
    /// Returns the number of columns and rows added.
    pub fn ensure_contains(&mut self, col: usize, row: usize) -> (usize, usize) {
        let mut added = (0, 0);
        while col >= self.cols() {
            self.extend_width(1);
            added.0 += 1;
        }
        while row >= self.rows() {
            self.extend_height(1);
            added.1 += 1;
        }
        added
    }

    /// Empty every cell whose sprite fails `exists`. Returns how many were cleared.
    pub fn clear_missing(&mut self, mut exists: impl FnMut(&str) -> bool) -> usize {
        let mut cleared = 0;
        for cell in self.cells.iter_mut() {
            if cell.as_deref().is_some_and(|name| !exists(name)) {
                *cell = None;
                cleared += 1;
            }
        }
        cleared
    }

    /// Decode a tileset record, resolving cells by name through `lookup`.
    ///
    /// Stored cell indices only select which coordinates to probe; the
    /// sprite at `(i % cols, i / cols)` is whichever sprite carries the
    /// conventional cell name.
    pub fn read<R: Read>(
        r: &mut AtlasReader<R>,
        mut lookup: impl FnMut(&str) -> bool,
    ) -> Result<Self, FormatError> {
        let name = r.read_string()?;
        let tile_width = r.read_i32()?;
        let tile_height = r.read_i32()?;
        let cols = r.read_count("tileset columns")?;
        let rows = r.read_count("tileset rows")?;
        match cols.checked_mul(rows) {
            Some(n) if n <= MAX_GRID_CELLS => {}
            _ => {
                return Err(FormatError::Malformed(format!(
                    "tileset '{}' grid {}x{} exceeds {} cells",
                    name, cols, rows, MAX_GRID_CELLS
                )))
            }
        }
        let cell_count = r.read_count("tileset cells")?;

        let mut tileset = Tileset::new(name, tile_width, tile_height, cols, rows);
        for _ in 0..cell_count {
            let id = r.read_i32()?;
            if id < 0 || cols == 0 || id as usize >= cols * rows {
                return Err(FormatError::Malformed(format!(
                    "tileset '{}' cell index {} outside {}x{} grid",
                    tileset.name, id, cols, rows
                )));
            }
            let (col, row) = (id as usize % cols, id as usize / cols);
            let sprite = tileset.cell_name(col, row);
            if lookup(&sprite) {
                tileset.cells.set(col, row, Some(sprite));
            }
        }

        if r.read_bool()? {
            let mut flags = Grid::new(cols, rows);
            for row in 0..rows {
                for col in 0..cols {
                    flags.set(col, row, r.read_bool()?);
                }
            }
            tileset.optimized = Some(flags);
        }

        Ok(tileset)
    }

    /// Encode as a tileset record. Every grid index is written.
    pub fn write<W: Write>(&self, w: &mut AtlasWriter<W>) -> io::Result<()> {
        w.write_string(&self.name)?;
        w.write_i32(self.tile_width)?;
        w.write_i32(self.tile_height)?;
        w.write_count(self.cols())?;
        w.write_count(self.rows())?;

        let n = self.cells.len();
        w.write_count(n)?;
        for i in 0..n {
            w.write_count(i)?;
        }

        w.write_bool(self.optimized.is_some())?;
        if let Some(flags) = &self.optimized {
            for (_, _, v) in flags.iter() {
                w.write_bool(*v)?;
            }
        }
        Ok(())
    }
}

/// Grid coordinate encoded in a cell sprite's name.
///
/// Uses the last two `_`-separated components; `None` when the name has fewer
/// than three components or either coordinate is not a non-negative integer.
pub fn parse_cell_name(stem: &str) -> Option<(usize, usize)> {
    let parts: Vec<&str> = stem.split('_').collect();
    if parts.len() < 3 {
        return None;
    }
    let col = parts[parts.len() - 2].parse::<u32>().ok()?;
    let row = parts[parts.len() - 1].parse::<u32>().ok()?;
    Some((col as usize, row as usize))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn populated_tileset() -> Tileset {
        let mut t = Tileset::new("ground", 16, 16, 3, 2);
        for (c, r) in [(0, 0), (2, 0), (1, 1)] {
            let name = t.cell_name(c, r);
            t.set_cell(c, r, Some(name));
        }
        t
    }

    #[test]
    fn test_grid_get_and_set() {
        let mut g: Grid<u8> = Grid::new(3, 2);
        assert!(g.set(2, 1, 7));
        assert!(!g.set(3, 0, 1));
        assert_eq!(g.get(2, 1), Some(&7));
        assert_eq!(g.get(0, 2), None);
    }

    #[test]
    fn test_extend_width_preserves_cells() {
        let mut t = populated_tileset();
        t.extend_width(1);
        assert_eq!((t.cols(), t.rows()), (4, 2));
        assert_eq!(t.sprite_at(0, 0), Some("ground_0_0"));
        assert_eq!(t.sprite_at(2, 0), Some("ground_2_0"));
        assert_eq!(t.sprite_at(1, 1), Some("ground_1_1"));
        assert_eq!(t.sprite_at(3, 0), None);
        assert_eq!(t.sprite_at(3, 1), None);
    }

    #[test]
    fn test_extend_height_preserves_cells() {
        let mut t = populated_tileset();
        t.extend_height(2);
        assert_eq!((t.cols(), t.rows()), (3, 4));
        assert_eq!(t.sprite_at(1, 1), Some("ground_1_1"));
        assert!((0..3).all(|c| t.sprite_at(c, 2).is_none() && t.sprite_at(c, 3).is_none()));
    }

    #[test]
    fn test_optimized_flags_grow_with_cells() {
        let mut t = populated_tileset().with_optimized_flags();
        assert!(t.set_optimized(2, 1, true));
        t.extend_width(1);
        t.extend_height(1);
        let flags = t.optimized().unwrap();
        assert_eq!((flags.cols(), flags.rows()), (t.cols(), t.rows()));
        assert_eq!(flags.get(2, 1), Some(&true));
        assert_eq!(flags.get(3, 2), Some(&false));
    }

    #[test]
    fn test_ensure_contains_grows_stepwise() {
        let mut t = populated_tileset();
        assert_eq!(t.ensure_contains(1, 1), (0, 0));
        assert_eq!(t.ensure_contains(5, 3), (3, 2));
        assert_eq!((t.cols(), t.rows()), (6, 4));
        assert_eq!(t.sprite_at(2, 0), Some("ground_2_0"));
    }

    #[test]
    fn test_position_of() {
        let t = populated_tileset();
        assert_eq!(t.position_of("ground_1_1"), Some((1, 1)));
        assert_eq!(t.position_of("ground_1_0"), None);
    }

    #[test]
    fn test_clear_missing() {
        let mut t = populated_tileset();
        let cleared = t.clear_missing(|name| name != "ground_2_0");
        assert_eq!(cleared, 1);
        assert_eq!(t.sprite_at(2, 0), None);
        assert_eq!(t.sprite_names().count(), 2);
    }

    #[test]
    fn test_parse_cell_name() {
        assert_eq!(parse_cell_name("ui_1_0"), Some((1, 0)));
        assert_eq!(parse_cell_name("big_map_12_7"), Some((12, 7)));
        assert_eq!(parse_cell_name("ui_1"), None);
        assert_eq!(parse_cell_name("ui_a_0"), None);
        assert_eq!(parse_cell_name("ui_-1_0"), None);
        assert_eq!(parse_cell_name("button"), None);
    }

    #[test]
    fn test_record_round_trip_by_name() {
        let t = populated_tileset().with_optimized_flags();
        let mut w = AtlasWriter::new(Vec::new());
        t.write(&mut w).unwrap();

        let known = ["ground_0_0", "ground_2_0", "ground_1_1"];
        let mut r = AtlasReader::new(Cursor::new(w.into_inner()));
        let decoded = Tileset::read(&mut r, |n| known.contains(&n)).unwrap();
        assert_eq!(decoded, t);
    }

    #[test]
    fn test_decode_skips_unknown_sprites() {
        let t = populated_tileset();
        let mut w = AtlasWriter::new(Vec::new());
        t.write(&mut w).unwrap();

        let mut r = AtlasReader::new(Cursor::new(w.into_inner()));
        let decoded = Tileset::read(&mut r, |n| n == "ground_0_0").unwrap();
        assert_eq!(decoded.sprite_names().collect::<Vec<_>>(), vec!["ground_0_0"]);
        assert!(decoded.optimized().is_none());
    }

    #[test]
    fn test_decode_rejects_index_outside_grid() {
        let mut w = AtlasWriter::new(Vec::new());
        w.write_string("bad").unwrap();
        for v in [8, 8, 2, 2, 1, 4] {
            w.write_i32(v).unwrap();
        }
        w.write_bool(false).unwrap();
        let mut r = AtlasReader::new(Cursor::new(w.into_inner()));
        assert!(matches!(Tileset::read(&mut r, |_| true), Err(FormatError::Malformed(_))));
    }

    #[test]
    fn test_decode_rejects_negative_rows() {
        let mut w = AtlasWriter::new(Vec::new());
        w.write_string("bad").unwrap();
        for v in [8, 8, 2, -1] {
            w.write_i32(v).unwrap();
        }
        let mut r = AtlasReader::new(Cursor::new(w.into_inner()));
        assert!(matches!(Tileset::read(&mut r, |_| true), Err(FormatError::InvalidLength { .. })));
    }

    #[test]
    fn test_decode_rejects_oversized_grid() {
        for (cols, rows) in [(i32::MAX, i32::MAX), (2048, 1024)] {
            let mut w = AtlasWriter::new(Vec::new());
            w.write_string("huge").unwrap();
            for v in [8, 8, cols, rows, 0] {
                w.write_i32(v).unwrap();
            }
            w.write_bool(false).unwrap();
            let mut r = AtlasReader::new(Cursor::new(w.into_inner()));
            assert!(matches!(Tileset::read(&mut r, |_| true), Err(FormatError::Malformed(_))));
        }
    }
}
