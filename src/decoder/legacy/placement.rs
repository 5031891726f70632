//! Bit placement and whitening for ECC000-140 symbols
//!
//! Both tables are generated once and shared by every decode. They are
//! generated stand-ins, not the ISO/IEC 16022 annex tables, so symbols from
//! other legacy writers do not decode.

use std::sync::OnceLock;

use crate::error::DecodeError;
use crate::models::BitMatrix;

/// Smallest legacy symbol side, in modules
pub const MIN_SIZE: usize = 7;
/// Largest legacy symbol side, in modules
pub const MAX_SIZE: usize = 47;

const MAX_BITS: usize = (MAX_SIZE - 2) * (MAX_SIZE - 2);

fn gcd(mut a: usize, mut b: usize) -> usize {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

fn build_table(size: usize) -> Vec<u32> {
    let n = (size - 2) * (size - 2);
    // Golden-ratio stride, nudged up until it generates the whole ring
    let mut stride = (n as f64 * 0.618_034).round() as usize;
    while gcd(stride, n) != 1 {
        stride += 1;
    }
    (0..n).map(|i| ((i * stride + n / 2) % n) as u32).collect()
}

fn tables() -> &'static [Vec<u32>] {
    static TABLES: OnceLock<Vec<Vec<u32>>> = OnceLock::new();
    TABLES.get_or_init(|| (MIN_SIZE..=MAX_SIZE).step_by(2).map(build_table).collect())
}

/// Row-major data-region cell holding each stream bit, for a `size` x `size` symbol
pub fn placement_table(size: usize) -> Option<&'static [u32]> {
    if !(MIN_SIZE..=MAX_SIZE).contains(&size) || size % 2 == 0 {
        return None;
    }
    tables().get((size - MIN_SIZE) / 2).map(Vec::as_slice)
}

/// Master whitening sequence, long enough for the largest symbol
pub fn whitening_sequence() -> &'static [bool] {
    static SEQUENCE: OnceLock<Vec<bool>> = OnceLock::new();
    SEQUENCE.get_or_init(|| {
        // 16-bit Galois LFSR, taps 16 14 13 11
        let mut lfsr: u16 = 0xACE1;
        (0..MAX_BITS)
            .map(|_| {
                let bit = lfsr & 1 == 1;
                lfsr >>= 1;
                if bit {
                    lfsr ^= 0xB400;
                }
                bit
            })
            .collect()
    })
}

/// Read the de-whitened bit stream out of a legacy data region
pub fn read_bits(region: &BitMatrix) -> Result<Vec<bool>, DecodeError> {
    let side = region.width();
    let unsupported = DecodeError::UnsupportedSize {
        rows: region.height(),
        cols: side,
    };
    if region.height() != side {
        return Err(unsupported);
    }
    let table = placement_table(side + 2).ok_or(unsupported)?;
    let whitening = whitening_sequence();

    Ok(table
        .iter()
        .zip(whitening)
        .map(|(&cell, &mask)| {
            let cell = cell as usize;
            region.get(cell % side, cell / side) ^ mask
        })
        .collect())
}
