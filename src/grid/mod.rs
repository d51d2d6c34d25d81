//! Row-major boolean grid.
//!
//! Coordinates are `(x, y)` with `x` in `0..width` and `y` in `0..height`,
//! `y` growing downward. Reads outside the grid are unmarked, so neighbour
//! lookups never need their own bounds checks.

pub mod parse;

use crate::config::types::{AmoebaError, Result};
use sha2::{Digest, Sha256};

pub use parse::{parse_grid, read_grid};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<bool>,
}

impl Grid {
    /// Build a grid from row-major cells.
    pub fn from_cells(width: usize, height: usize, cells: Vec<bool>) -> Result<Self> {
        let expected = width.checked_mul(height).ok_or(AmoebaError::GridShape {
            expected: usize::MAX,
            actual: cells.len(),
        })?;

        if cells.len() != expected {
            return Err(AmoebaError::GridShape {
                expected,
                actual: cells.len(),
            });
        }

        Ok(Self {
            width,
            height,
            cells,
        })
    }

    /// An all-unmarked grid.
    pub fn empty(width: usize, height: usize) -> Result<Self> {
        let len = width.checked_mul(height).ok_or(AmoebaError::GridShape {
            expected: usize::MAX,
            actual: 0,
        })?;
        Self::from_cells(width, height, vec![false; len])
    }

    /// Build a grid from text rows where `#` is marked.
    ///
    /// Rows must all have the same length.
    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> Result<Self> {
        let height = rows.len();
        let width = rows.first().map(|r| r.as_ref().chars().count()).unwrap_or(0);
        let mut cells = Vec::with_capacity(width * height);

        for (y, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            let len = row.chars().count();
            if len != width {
                return Err(AmoebaError::Input(format!(
                    "row {} has {} cells, expected {}",
                    y, len, width
                )));
            }
            cells.extend(row.chars().map(|c| c == parse::MARKED));
        }

        Self::from_cells(width, height, cells)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cells(&self) -> &[bool] {
        &self.cells
    }

    /// Whether `(x, y)` is marked. Out-of-range coordinates read as unmarked.
    pub fn get(&self, x: isize, y: isize) -> bool {
        self.index(x, y).map(|idx| self.cells[idx]).unwrap_or(false)
    }

    /// Unmark `(x, y)`. Out-of-range coordinates are ignored.
    pub fn clear(&mut self, x: isize, y: isize) {
        if let Some(idx) = self.index(x, y) {
            self.cells[idx] = false;
        }
    }

    pub fn marked_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }

    /// True once no marked cell is left.
    pub fn is_exhausted(&self) -> bool {
        !self.cells.iter().any(|&c| c)
    }

    /// SHA-256 over the dimensions and cell bits, as lowercase hex.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update((self.width as u64).to_le_bytes());
        hasher.update((self.height as u64).to_le_bytes());

        let mut packed = vec![0u8; self.cells.len().div_ceil(8)];
        for (i, &marked) in self.cells.iter().enumerate() {
            if marked {
                packed[i / 8] |= 1 << (i % 8);
            }
        }
        hasher.update(&packed);

        format!("{:x}", hasher.finalize())
    }

    fn index(&self, x: isize, y: isize) -> Option<usize> {
        if x < 0 || y < 0 {
            return None;
        }
        let (x, y) = (x as usize, y as usize);
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y * self.width + x)
    }
}
