//! Grid sampling: module centres mapped bilinearly across the symbol quadrilateral

use crate::decoder::tables::Configuration;
use crate::models::{BitMatrix, DarknessSampler, Point};

/// Sub-sample offset from the module centre, in modules
const SUB_SAMPLE_OFFSET: f32 = 0.2;
/// Average darkness at or above which a module is dark
const DARK_THRESHOLD: f32 = 0.5;

/// Oriented symbol outline; the solid L meets at `bottom_left`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SymbolQuad {
    /// Far end of the vertical solid leg
    pub top_left: Point,
    /// Corner between the two clock tracks
    pub top_right: Point,
    /// Far end of the horizontal solid leg
    pub bottom_right: Point,
    /// Shared corner of the solid legs
    pub bottom_left: Point,
}

impl SymbolQuad {
    /// Corners in result order: top-left, top-right, bottom-right, bottom-left
    pub fn corners(&self) -> [Point; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
        ]
    }

    /// Image point at fractional symbol position `u` (left to right) and `v` (top to bottom)
    pub fn map(&self, u: f32, v: f32) -> Point {
        let top = self.top_left.lerp(&self.top_right, u);
        let bottom = self.bottom_left.lerp(&self.bottom_right, u);
        top.lerp(&bottom, v)
    }
}

/// Module centre positions along both symbol axes, as fractions of the side
#[derive(Debug, Clone, PartialEq)]
pub struct AxisSpacing {
    /// One entry per module column, left to right
    pub cols: Vec<f32>,
    /// One entry per module row, top to bottom
    pub rows: Vec<f32>,
}

impl AxisSpacing {
    /// Evenly spaced module centres
    pub fn uniform(rows: usize, cols: usize) -> Self {
        Self {
            cols: uniform_centers(cols),
            rows: uniform_centers(rows),
        }
    }

    /// Centres from measured module boundaries.
    ///
    /// `col_bounds` and `row_bounds` hold the interior boundaries as
    /// fractions (top to bottom for rows). Each axis falls back to uniform
    /// spacing when its boundary count does not match the module count.
    pub fn from_boundaries(rows: usize, cols: usize, row_bounds: &[f32], col_bounds: &[f32]) -> Self {
        Self {
            cols: centers_from_bounds(col_bounds, cols).unwrap_or_else(|| uniform_centers(cols)),
            rows: centers_from_bounds(row_bounds, rows).unwrap_or_else(|| uniform_centers(rows)),
        }
    }

    /// True when the spacing matches a symbol of `rows` x `cols` modules
    pub fn fits(&self, rows: usize, cols: usize) -> bool {
        self.rows.len() == rows && self.cols.len() == cols
    }
}

fn uniform_centers(count: usize) -> Vec<f32> {
    (0..count)
        .map(|i| (i as f32 + 0.5) / count as f32)
        .collect()
}

fn centers_from_bounds(bounds: &[f32], count: usize) -> Option<Vec<f32>> {
    if count == 0 || bounds.len() + 1 != count {
        return None;
    }
    let edges: Vec<f32> = std::iter::once(0.0)
        .chain(bounds.iter().copied())
        .chain(std::iter::once(1.0))
        .collect();
    if edges.windows(2).any(|w| w[1] <= w[0]) {
        return None;
    }
    Some(edges.windows(2).map(|w| (w[0] + w[1]) * 0.5).collect())
}

/// Darkness of one module, averaged over its centre and four neighbours
pub fn sample_module<S: DarknessSampler + ?Sized>(
    sampler: &S,
    quad: &SymbolQuad,
    u: f32,
    v: f32,
    module_u: f32,
    module_v: f32,
) -> f32 {
    let du = module_u * SUB_SAMPLE_OFFSET;
    let dv = module_v * SUB_SAMPLE_OFFSET;
    let offsets = [(0.0, 0.0), (-du, 0.0), (du, 0.0), (0.0, -dv), (0.0, dv)];
    let sum: f32 = offsets
        .iter()
        .map(|&(ou, ov)| {
            let p = quad.map(u + ou, v + ov);
            sampler.darkness(p.x, p.y)
        })
        .sum();
    sum / offsets.len() as f32
}

/// True if the symbol module at (`row`, `col`) reads dark under uniform spacing
pub fn module_is_dark<S: DarknessSampler + ?Sized>(
    sampler: &S,
    quad: &SymbolQuad,
    rows: usize,
    cols: usize,
    row: usize,
    col: usize,
) -> bool {
    let u = (col as f32 + 0.5) / cols as f32;
    let v = (row as f32 + 0.5) / rows as f32;
    sample_module(sampler, quad, u, v, 1.0 / cols as f32, 1.0 / rows as f32) >= DARK_THRESHOLD
}

/// Sample the data grid of `config`: `full_data_cols` wide and `full_data_rows` tall.
///
/// Finder, clock and alignment modules are skipped. Sampling itself never
/// fails; a wrong configuration shows up later as an uncorrectable grid.
pub fn sample_data_grid<S: DarknessSampler + ?Sized>(
    sampler: &S,
    quad: &SymbolQuad,
    config: &Configuration,
    spacing: &AxisSpacing,
) -> BitMatrix {
    let module_u = 1.0 / config.cols as f32;
    let module_v = 1.0 / config.rows as f32;
    BitMatrix::from_fn(config.full_data_cols(), config.full_data_rows(), |x, y| {
        let u = spacing.cols[config.symbol_col(x)];
        let v = spacing.rows[config.symbol_row(y)];
        sample_module(sampler, quad, u, v, module_u, module_v) >= DARK_THRESHOLD
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::tables::{SymbolKind, find_configuration};

    fn square_quad(x0: f32, y0: f32, side: f32) -> SymbolQuad {
        SymbolQuad {
            top_left: Point::new(x0, y0),
            top_right: Point::new(x0 + side, y0),
            bottom_right: Point::new(x0 + side, y0 + side),
            bottom_left: Point::new(x0, y0 + side),
        }
    }

    #[test]
    fn test_map_corners_and_centre() {
        let quad = square_quad(10.0, 20.0, 40.0);
        assert_eq!(quad.map(0.0, 0.0), quad.top_left);
        assert_eq!(quad.map(1.0, 1.0), quad.bottom_right);
        assert_eq!(quad.map(0.5, 0.5), Point::new(30.0, 40.0));
    }

    #[test]
    fn test_boundaries_to_centres() {
        let spacing = AxisSpacing::from_boundaries(2, 4, &[0.4], &[0.2, 0.5, 0.7]);
        let close = |got: &[f32], want: &[f32]| {
            got.len() == want.len() && got.iter().zip(want).all(|(g, w)| (g - w).abs() < 1e-6)
        };
        assert!(close(&spacing.rows, &[0.2, 0.7]));
        assert!(close(&spacing.cols, &[0.1, 0.35, 0.6, 0.85]));
    }

    #[test]
    fn test_mismatched_boundaries_fall_back() {
        let spacing = AxisSpacing::from_boundaries(3, 3, &[0.5], &[0.6, 0.3]);
        assert_eq!(spacing, AxisSpacing::uniform(3, 3));
        assert!(spacing.fits(3, 3));
    }

    #[test]
    fn test_samples_data_region_only() {
        // 10x10 symbol at 5 px per module; data module (r, c) is dark when r == c
        let config = find_configuration(SymbolKind::Ecc200, 10, 10).unwrap();
        let bitmap = BitMatrix::from_fn(60, 60, |x, y| {
            if !(5..55).contains(&x) || !(5..55).contains(&y) {
                return false;
            }
            let (col, row) = ((x - 5) / 5, (y - 5) / 5);
            col == 0 || row == 9 || (row == col && (1..9).contains(&row))
        });
        let quad = square_quad(5.0, 5.0, 50.0);
        let grid = sample_data_grid(&bitmap, &quad, config, &AxisSpacing::uniform(10, 10));
        assert_eq!((grid.width(), grid.height()), (8, 8));
        for y in 0..8 {
            for x in 0..8 {
                assert_eq!(grid.get(x, y), x == y, "({x}, {y})");
            }
        }
        assert!(module_is_dark(&bitmap, &quad, 10, 10, 9, 3));
        assert!(!module_is_dark(&bitmap, &quad, 10, 10, 0, 9));
    }
}
