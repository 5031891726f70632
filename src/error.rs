//! Error types
//!
//! Almost every failure inside the pipeline is local: a [`DecodeError`] just
//! means "this hypothesis did not produce a symbol" and the scan loop moves on.
//! [`ScanError`] is what a caller of [`crate::scan`] can see.

use thiserror::Error;

/// Why a candidate region, configuration or bit stream was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Placement or configuration lookup has no entry for this grid
    #[error("unsupported symbol size {rows}x{cols}")]
    UnsupportedSize {
        /// Module or data rows
        rows: usize,
        /// Module or data columns
        cols: usize,
    },
    /// A Reed-Solomon block could not be corrected
    #[error("reed-solomon block {block} uncorrectable: {reason}")]
    ReedSolomon {
        /// Index of the failing block
        block: usize,
        /// Decoder detail
        reason: &'static str,
    },
    /// The convolutional tree search ran out of error budget
    #[error("convolutional decode exhausted after {expanded} nodes")]
    Convolutional {
        /// Search nodes expanded before giving up
        expanded: usize,
    },
    /// Legacy error-protection header matched no known code
    #[error("unrecognised legacy protection header")]
    UnknownHeader,
    /// Legacy payload CRC does not match the header
    #[error("crc mismatch: header {expected:#06x}, computed {actual:#06x}")]
    CrcMismatch {
        /// CRC carried in the symbol header
        expected: u16,
        /// CRC computed over the decoded payload
        actual: u16,
    },
    /// Structurally invalid data stream
    #[error("malformed data stream: {0}")]
    Malformed(&'static str),
}

/// Errors that abort a whole scan
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    /// The wall-clock deadline passed between scan passes
    #[error("scan timed out")]
    Timeout,
    /// Options that can never match anything
    #[error("invalid scan options: {0}")]
    InvalidOptions(&'static str),
}
