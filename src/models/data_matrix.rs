use super::{Point, Segment};

/// Barcode symbology reported for every result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbology {
    /// ISO/IEC 16022 Data Matrix
    DataMatrix,
}

/// Error protection level of a pre-ECC200 symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LegacyLevel {
    /// No protection beyond the CRC
    Ecc000,
    /// Rate 3/4 convolutional code
    Ecc050,
    /// Rate 2/3 convolutional code
    Ecc080,
    /// Rate 1/2 convolutional code
    Ecc100,
    /// Rate 1/4 convolutional code
    Ecc140,
}

/// Which Data Matrix family a symbol belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolFormat {
    /// Reed-Solomon protected symbol
    Ecc200,
    /// Convolutionally protected symbol
    Legacy(LegacyLevel),
}

/// Decoded Data Matrix symbol
#[derive(Debug, Clone)]
pub struct DataMatrixCode {
    /// Corner points in image coordinates: top-left, top-right,
    /// bottom-right, bottom-left (the solid L meets at bottom-left)
    pub corners: [Point; 4],
    /// Decoding confidence (0.0 - 1.0); 1.0 means no correction was needed
    pub confidence: f32,
    /// Always [`Symbology::DataMatrix`]
    pub symbology: Symbology,
    /// ECC200 or legacy, with the legacy protection level
    pub format: SymbolFormat,
    /// Module rows, including the finder and clock borders
    pub rows: usize,
    /// Module columns, including the finder and clock borders
    pub cols: usize,
    /// Typed payload in symbol order
    pub segments: Vec<Segment>,
    /// Segments concatenated into a single value
    pub content: String,
}

impl DataMatrixCode {
    /// Centroid of the four corners
    pub fn center(&self) -> Point {
        let sum = self
            .corners
            .iter()
            .fold(Point::default(), |acc, p| acc.add(p));
        sum.scale(0.25)
    }

    /// True if `point` lies inside the (convex) quadrilateral of this symbol
    pub fn contains(&self, point: &Point) -> bool {
        quad_contains(&self.corners, point)
    }
}

/// Point-in-convex-quadrilateral test, independent of winding direction
pub fn quad_contains(corners: &[Point; 4], point: &Point) -> bool {
    let mut sign = 0.0f32;
    for i in 0..4 {
        let a = corners[i];
        let b = corners[(i + 1) % 4];
        let cross = b.sub(&a).cross(&point.sub(&a));
        if cross == 0.0 {
            continue;
        }
        if sign == 0.0 {
            sign = cross.signum();
        } else if cross.signum() != sign {
            return false;
        }
    }
    true
}
