//! Utility functions for image processing
//!
//! Binarization turns grayscale input into the black/white bitmap the
//! detector scans.

pub mod binarization;
