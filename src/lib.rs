//! dmtx_scan - Data Matrix locating and decoding in pure Rust
//!
//! Reads ECC200 and legacy ECC000-140 symbols from a black/white bitmap.
//! Symbols are found by their solid L border, sized from the dashed clock
//! tracks, sampled and then corrected and decoded.

#![warn(missing_docs)]
#![allow(clippy::missing_docs_in_private_items)]

/// Scan options and their environment overrides
pub mod config;
/// Decoding modules (placement, error correction, data modes, legacy formats)
pub mod decoder;
/// Detection modules (edges, L patterns, geometry, sampling)
pub mod detector;
/// Error types
pub mod error;
/// Core data structures (BitMatrix, Point, Segment, DataMatrixCode)
pub mod models;
/// Image loading and dataset helpers for binaries and tests
pub mod tools;
/// Utility functions (binarization)
pub mod utils;

pub use config::ScanOptions;
pub use error::{DecodeError, ScanError};
pub use models::{
    BitMatrix, DarknessSampler, DataMatrixCode, GrayView, LegacyLevel, Point, Segment, SymbolFormat,
    Symbology, TextEncoding, render_segments,
};

use decoder::dm_decoder::DmDecoder;
use detector::edge::{EdgeBuckets, EdgeFilter, Pass, track_edges};
use detector::l_pattern::{LCandidate, MatchParams, match_l_patterns, overlaps_accepted};
use models::data_matrix::quad_contains;
use rayon::prelude::*;
use std::time::Instant;
use utils::binarization::otsu_binarize;

fn check_deadline(deadline: Option<Instant>) -> Result<(), ScanError> {
    match deadline {
        Some(d) if Instant::now() >= d => Err(ScanError::Timeout),
        _ => Ok(()),
    }
}

/// Scan a black/white bitmap for Data Matrix symbols
///
/// # Arguments
/// * `bitmap` - Binary image (true = black)
/// * `options` - Size limits, result cap, timeout and decoder switches
///
/// # Returns
/// Decoded symbols, at most `options.max_results`, or [`ScanError::Timeout`]
/// if the deadline passed before the scan finished
pub fn scan(bitmap: &BitMatrix, options: &ScanOptions) -> Result<Vec<DataMatrixCode>, ScanError> {
    scan_with_sampler(bitmap, bitmap, options)
}

/// Scan `bitmap`, sampling module darkness from `sampler`.
///
/// The sampler is usually the grayscale image the bitmap was made from; it
/// must have the same dimensions.
pub fn scan_with_sampler<S: DarknessSampler + ?Sized>(
    bitmap: &BitMatrix,
    sampler: &S,
    options: &ScanOptions,
) -> Result<Vec<DataMatrixCode>, ScanError> {
    options.validate()?;
    let deadline = options.timeout.map(|t| Instant::now() + t);

    let (min_side, max_side) = options.side_range_pixels(bitmap.width(), bitmap.height());
    let filter = EdgeFilter {
        min_length: min_side,
        max_length: max_side,
    };

    let mut edges = EdgeBuckets::new();
    track_edges(bitmap, Pass::Rows, &filter, &mut edges);
    check_deadline(deadline)?;
    track_edges(bitmap, Pass::Columns, &filter, &mut edges);
    check_deadline(deadline)?;

    let candidates = match_l_patterns(&edges, bitmap, &MatchParams::from(options), deadline)?;
    let results = if options.parallel {
        decode_parallel(bitmap, sampler, &candidates, options, deadline)?
    } else {
        decode_sequential(bitmap, sampler, &candidates, options, deadline)?
    };

    tracing::debug!(
        edges = edges.len(),
        candidates = candidates.len(),
        results = results.len(),
        "scan complete"
    );
    Ok(results)
}

/// True if the decoded symbol overlaps one already in `results`
fn duplicates(code: &DataMatrixCode, results: &[DataMatrixCode]) -> bool {
    let center = code.center();
    results
        .iter()
        .any(|r| r.contains(&center) || quad_contains(&code.corners, &r.center()))
}

fn accepted_quads(results: &[DataMatrixCode]) -> Vec<[Point; 4]> {
    results.iter().map(|r| r.corners).collect()
}

fn decode_sequential<S: DarknessSampler + ?Sized>(
    bitmap: &BitMatrix,
    sampler: &S,
    candidates: &[LCandidate],
    options: &ScanOptions,
    deadline: Option<Instant>,
) -> Result<Vec<DataMatrixCode>, ScanError> {
    let mut results: Vec<DataMatrixCode> = Vec::new();
    for candidate in candidates {
        if results.len() >= options.max_results {
            break;
        }
        check_deadline(deadline)?;
        if overlaps_accepted(candidate, &accepted_quads(&results)) {
            continue;
        }
        if let Some(code) = DmDecoder::decode_candidate(bitmap, sampler, candidate, options) {
            if !duplicates(&code, &results) {
                results.push(code);
            }
        }
    }
    Ok(results)
}

fn decode_parallel<S: DarknessSampler + ?Sized>(
    bitmap: &BitMatrix,
    sampler: &S,
    candidates: &[LCandidate],
    options: &ScanOptions,
    deadline: Option<Instant>,
) -> Result<Vec<DataMatrixCode>, ScanError> {
    let batch = rayon::current_num_threads().max(1) * 2;
    decode_in_batches(candidates, batch, options.max_results, deadline, |candidate, accepted| {
        if overlaps_accepted(candidate, accepted) {
            return None;
        }
        DmDecoder::decode_candidate(bitmap, sampler, candidate, options)
    })
}

/// Run `decode` over `candidates` on the rayon pool, `batch` at a time.
///
/// Each batch is merged in candidate order before the next one starts, so
/// the output matches a sequential pass and no batch is started once `cap`
/// symbols are known. `decode` sees the quads accepted before its batch.
fn decode_in_batches<C, F>(
    candidates: &[C],
    batch: usize,
    cap: usize,
    deadline: Option<Instant>,
    decode: F,
) -> Result<Vec<DataMatrixCode>, ScanError>
where
    C: Sync,
    F: Fn(&C, &[[Point; 4]]) -> Option<DataMatrixCode> + Sync,
{
    let mut results: Vec<DataMatrixCode> = Vec::new();
    for chunk in candidates.chunks(batch.max(1)) {
        if results.len() >= cap {
            break;
        }
        check_deadline(deadline)?;
        let accepted = accepted_quads(&results);
        let decoded: Vec<Option<DataMatrixCode>> = chunk
            .par_iter()
            .map(|candidate| {
                check_deadline(deadline)?;
                Ok(decode(candidate, &accepted))
            })
            .collect::<Result<_, ScanError>>()?;

        for code in decoded.into_iter().flatten() {
            if results.len() >= cap {
                break;
            }
            if !duplicates(&code, &results) {
                results.push(code);
            }
        }
    }
    Ok(results)
}

/// Scan an 8-bit grayscale image (0 = black).
///
/// The image is binarized with Otsu's threshold for detection and sampled
/// in grayscale for module reading.
pub fn scan_gray(gray: &GrayView<'_>, options: &ScanOptions) -> Result<Vec<DataMatrixCode>, ScanError> {
    let bitmap = otsu_binarize(gray);
    scan_with_sampler(&bitmap, gray, options)
}

/// Detector holding a fixed set of scan options
#[derive(Debug, Clone, Default)]
pub struct Detector {
    options: ScanOptions,
}

impl Detector {
    /// Create a detector with default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a detector with the given options
    pub fn with_options(options: ScanOptions) -> Self {
        Self { options }
    }

    /// Options used by every scan
    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    /// Scan a black/white bitmap
    pub fn scan(&self, bitmap: &BitMatrix) -> Result<Vec<DataMatrixCode>, ScanError> {
        scan(bitmap, &self.options)
    }

    /// Scan a grayscale image
    pub fn scan_gray(&self, gray: &GrayView<'_>) -> Result<Vec<DataMatrixCode>, ScanError> {
        scan_gray(gray, &self.options)
    }

    /// First symbol found, if any (faster if you know there's only one)
    pub fn scan_single(&self, bitmap: &BitMatrix) -> Result<Option<DataMatrixCode>, ScanError> {
        let options = self.options.clone().with_max_results(1);
        Ok(scan(bitmap, &options)?.into_iter().next())
    }
}
