/// Scan results
pub mod data_matrix;
/// Bit matrices and grayscale views
pub mod matrix;
/// 2D points
pub mod point;
/// Decoded segments and text rendering
pub mod segment;

pub use data_matrix::{DataMatrixCode, LegacyLevel, SymbolFormat, Symbology};
pub use matrix::{BitMatrix, DarknessSampler, GrayView};
pub use point::Point;
pub use segment::{Segment, SegmentBuilder, TextEncoding, render_segments};
