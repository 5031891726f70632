//! ECC200 codeword placement ("utah" layout)
//!
//! Codewords are laid out in 8-module utah shapes that sweep diagonally
//! across the mapping matrix, with four special corner shapes and a fixed
//! pattern in the bottom-right corner when the grid size leaves one free.

use crate::error::DecodeError;
use crate::models::BitMatrix;

/// Module positions of every codeword, bit 1 (most significant) first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    nrow: usize,
    ncol: usize,
    codewords: Vec<[(usize, usize); 8]>,
}

struct Builder {
    nrow: i32,
    ncol: i32,
    filled: Vec<bool>,
    codewords: Vec<[(usize, usize); 8]>,
    overflow: bool,
}

impl Builder {
    fn wrap(&self, mut row: i32, mut col: i32) -> Option<(usize, usize)> {
        if row < 0 {
            row += self.nrow;
            col += 4 - ((self.nrow + 4) % 8);
        }
        if col < 0 {
            col += self.ncol;
            row += 4 - ((self.ncol + 4) % 8);
        }
        if row < 0 || col < 0 || row >= self.nrow || col >= self.ncol {
            return None;
        }
        Some((row as usize, col as usize))
    }

    fn push(&mut self, cells: [(i32, i32); 8]) {
        let mut out = [(0usize, 0usize); 8];
        for (slot, (r, c)) in out.iter_mut().zip(cells) {
            let Some((row, col)) = self.wrap(r, c) else {
                self.overflow = true;
                return;
            };
            self.filled[row * self.ncol as usize + col] = true;
            *slot = (row, col);
        }
        self.codewords.push(out);
    }

    fn is_filled(&self, row: i32, col: i32) -> bool {
        if row < 0 || col < 0 || row >= self.nrow || col >= self.ncol {
            return true;
        }
        self.filled[(row * self.ncol + col) as usize]
    }

    fn utah(&mut self, r: i32, c: i32) {
        self.push([
            (r - 2, c - 2),
            (r - 2, c - 1),
            (r - 1, c - 2),
            (r - 1, c - 1),
            (r - 1, c),
            (r, c - 2),
            (r, c - 1),
            (r, c),
        ]);
    }

    fn corner1(&mut self) {
        let (n, m) = (self.nrow, self.ncol);
        self.push([
            (n - 1, 0),
            (n - 1, 1),
            (n - 1, 2),
            (0, m - 2),
            (0, m - 1),
            (1, m - 1),
            (2, m - 1),
            (3, m - 1),
        ]);
    }

    fn corner2(&mut self) {
        let (n, m) = (self.nrow, self.ncol);
        self.push([
            (n - 3, 0),
            (n - 2, 0),
            (n - 1, 0),
            (0, m - 4),
            (0, m - 3),
            (0, m - 2),
            (0, m - 1),
            (1, m - 1),
        ]);
    }

    fn corner3(&mut self) {
        let (n, m) = (self.nrow, self.ncol);
        self.push([
            (n - 3, 0),
            (n - 2, 0),
            (n - 1, 0),
            (0, m - 2),
            (0, m - 1),
            (1, m - 1),
            (2, m - 1),
            (3, m - 1),
        ]);
    }

    fn corner4(&mut self) {
        let (n, m) = (self.nrow, self.ncol);
        self.push([
            (n - 1, 0),
            (n - 1, m - 1),
            (0, m - 3),
            (0, m - 2),
            (0, m - 1),
            (1, m - 3),
            (1, m - 2),
            (1, m - 1),
        ]);
    }

    fn run(&mut self) {
        let (nrow, ncol) = (self.nrow, self.ncol);
        let mut row = 4;
        let mut col = 0;
        loop {
            if row == nrow && col == 0 {
                self.corner1();
            }
            if row == nrow - 2 && col == 0 && ncol % 4 != 0 {
                self.corner2();
            }
            if row == nrow - 2 && col == 0 && ncol % 8 == 4 {
                self.corner3();
            }
            if row == nrow + 4 && col == 2 && ncol % 8 == 0 {
                self.corner4();
            }

            // Sweep upward and to the right
            loop {
                if row < nrow && col >= 0 && !self.is_filled(row, col) {
                    self.utah(row, col);
                }
                row -= 2;
                col += 2;
                if row < 0 || col >= ncol {
                    break;
                }
            }
            row += 1;
            col += 3;

            // Sweep downward and to the left
            loop {
                if row >= 0 && col < ncol && !self.is_filled(row, col) {
                    self.utah(row, col);
                }
                row += 2;
                col -= 2;
                if row >= nrow || col < 0 {
                    break;
                }
            }
            row += 3;
            col += 1;

            if row >= nrow && col >= ncol {
                break;
            }
        }
    }
}

impl Placement {
    /// Build the layout for a data grid of `nrow` x `ncol` modules
    pub fn new(nrow: usize, ncol: usize) -> Result<Self, DecodeError> {
        if nrow < 6 || ncol < 6 || nrow % 2 != 0 || ncol % 2 != 0 {
            return Err(DecodeError::UnsupportedSize {
                rows: nrow,
                cols: ncol,
            });
        }
        let mut builder = Builder {
            nrow: nrow as i32,
            ncol: ncol as i32,
            filled: vec![false; nrow * ncol],
            codewords: Vec::with_capacity(nrow * ncol / 8),
            overflow: false,
        };
        builder.run();

        if builder.overflow || builder.codewords.len() != nrow * ncol / 8 {
            return Err(DecodeError::UnsupportedSize {
                rows: nrow,
                cols: ncol,
            });
        }
        Ok(Self {
            nrow,
            ncol,
            codewords: builder.codewords,
        })
    }

    /// Rows of the data grid
    pub fn rows(&self) -> usize {
        self.nrow
    }

    /// Columns of the data grid
    pub fn cols(&self) -> usize {
        self.ncol
    }

    /// Number of codewords the grid holds
    pub fn len(&self) -> usize {
        self.codewords.len()
    }

    /// True when the grid holds no codewords
    pub fn is_empty(&self) -> bool {
        self.codewords.is_empty()
    }

    /// Module positions of codeword `index`, most significant bit first
    pub fn positions(&self, index: usize) -> Option<&[(usize, usize); 8]> {
        self.codewords.get(index)
    }

    /// Cells not covered by any codeword, filled with the fixed corner pattern
    pub fn fixed_corner(&self) -> Option<[((usize, usize), bool); 4]> {
        let covered = self
            .codewords
            .iter()
            .flatten()
            .any(|&(r, c)| r == self.nrow - 1 && c == self.ncol - 1);
        if covered {
            return None;
        }
        let (r, c) = (self.nrow - 1, self.ncol - 1);
        Some([
            ((r, c), true),
            ((r - 1, c - 1), true),
            ((r, c - 1), false),
            ((r - 1, c), false),
        ])
    }

    /// Read codewords out of a mapping matrix (true = dark = 1)
    pub fn read_codewords(&self, grid: &BitMatrix) -> Result<Vec<u8>, DecodeError> {
        if grid.height() != self.nrow || grid.width() != self.ncol {
            return Err(DecodeError::UnsupportedSize {
                rows: grid.height(),
                cols: grid.width(),
            });
        }
        Ok(self
            .codewords
            .iter()
            .map(|cells| {
                cells
                    .iter()
                    .fold(0u8, |acc, &(r, c)| (acc << 1) | grid.get(c, r) as u8)
            })
            .collect())
    }

    /// Write codewords into a fresh mapping matrix, including the fixed corner
    pub fn write_codewords(&self, codewords: &[u8]) -> BitMatrix {
        let mut grid = BitMatrix::new(self.ncol, self.nrow);
        for (cells, &cw) in self.codewords.iter().zip(codewords) {
            for (bit, &(r, c)) in cells.iter().enumerate() {
                grid.set(c, r, (cw >> (7 - bit)) & 1 == 1);
            }
        }
        if let Some(corner) = self.fixed_corner() {
            for ((r, c), dark) in corner {
                grid.set(c, r, dark);
            }
        }
        grid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::tables::{CONFIGURATIONS, SymbolKind};

    #[test]
    fn test_every_ecc200_size_is_a_partial_bijection() {
        for config in CONFIGURATIONS.iter().filter(|c| c.kind == SymbolKind::Ecc200) {
            let nrow = config.full_data_rows();
            let ncol = config.full_data_cols();
            let placement = Placement::new(nrow, ncol).unwrap();
            assert_eq!(placement.len(), config.full_symbol_count(), "{config:?}");

            let mut seen = vec![false; nrow * ncol];
            for i in 0..placement.len() {
                for &(r, c) in placement.positions(i).unwrap() {
                    assert!(r < nrow && c < ncol);
                    assert!(!seen[r * ncol + c], "cell ({r},{c}) used twice in {config:?}");
                    seen[r * ncol + c] = true;
                }
            }
            let free = seen.iter().filter(|s| !**s).count();
            assert!(free == 0 || free == 4, "{config:?} leaves {free} cells");
            assert_eq!(free == 4, placement.fixed_corner().is_some());
        }
    }

    #[test]
    fn test_10x10_first_codeword_is_utah_at_origin_row() {
        // 8x8 grid: the first shape is anchored at (4, 0) and wraps left
        let placement = Placement::new(8, 8).unwrap();
        let first = placement.positions(0).unwrap();
        assert_eq!(first[7], (4, 0));
        assert_eq!(first[3], (3, 7));
    }

    #[test]
    fn test_read_back_written_codewords() {
        let placement = Placement::new(10, 10).unwrap();
        let codewords: Vec<u8> = (0..placement.len() as u8).map(|i| i.wrapping_mul(37)).collect();
        let grid = placement.write_codewords(&codewords);
        assert_eq!(placement.read_codewords(&grid).unwrap(), codewords);
    }

    #[test]
    fn test_rejects_odd_grid() {
        assert!(Placement::new(7, 8).is_err());
        assert!(Placement::new(8, 8).is_ok());
    }
}
