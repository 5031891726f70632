//! Data Matrix detection modules
//!
//! This module contains all the logic for locating symbols in a binary image:
//! - Edge tracking over a row pass and a column pass
//! - L-pattern matching (the solid finder border)
//! - Fourth-corner refinement and module counting from the clock tracks
//! - Grid sampling across the symbol outline

/// Straight black/white edges from row and column scans
pub mod edge;
/// Pairs of perpendicular edges forming the solid L
pub mod l_pattern;
/// Fourth corner, module size and module counts
pub mod refine;
/// Module grid sampling
pub mod sampler;
