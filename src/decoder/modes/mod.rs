//! ECC200 compaction mode decoders
//!
//! Each decoder consumes codewords from a shared [`CodewordStream`] until it
//! unlatches, then hands control back to ASCII:
//! - ASCII: single characters, digit pairs and every latch/function codeword
//! - C40 / Text / X12: three values packed into two codewords
//! - EDIFACT: four 6-bit values packed into three codewords
//! - Base256: length-prefixed, randomized bytes
//!
//! [`CodewordStream`]: crate::decoder::bitstream::CodewordStream

pub mod ascii;
pub mod base256;
pub mod c40;
pub mod edifact;

/// Encodation mode the stream decoder is in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Default mode at the start of every symbol
    Ascii,
    /// Upper-case oriented triples
    C40,
    /// Lower-case oriented triples
    Text,
    /// ANSI X12 EDI triples
    X12,
    /// 6-bit EDIFACT values
    Edifact,
    /// Raw bytes
    Base256,
    /// Pad codeword reached or data exhausted
    End,
}
