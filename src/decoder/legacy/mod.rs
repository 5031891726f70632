//! Pre-ECC200 (ECC000-140) symbol decoding
//!
//! The data region is read through the placement table, de-whitened, and the
//! resulting stream is classified by its header:
//! - a 7-bit prefix separates unprotected (ECC000) from protected streams
//! - protected streams carry a 12-bit postfix naming the convolutional code
//!
//! The payload then goes through the tree-search decoder (protected only) and
//! the CRC-checked framing in [`stream`].

pub mod convolutional;
pub mod placement;
pub mod stream;

use crate::error::DecodeError;
use crate::models::{BitMatrix, LegacyLevel, Segment};
use convolutional::{ConvolutionalCode, ERROR_BUDGET};

/// Prefix of an unprotected stream
pub const PREFIX_ECC000: u8 = 0b111_1110;
/// Prefix of a convolutionally protected stream
pub const PREFIX_PROTECTED: u8 = 0b000_0000;
/// Width of the prefix field
pub const PREFIX_BITS: usize = 7;
/// Width of the protection postfix field
pub const POSTFIX_BITS: usize = 12;

const POSTFIXES: [(u16, LegacyLevel); 4] = [
    (0xE38, LegacyLevel::Ecc050),
    (0xFC0, LegacyLevel::Ecc080),
    (0x03F, LegacyLevel::Ecc100),
    (0xFFF, LegacyLevel::Ecc140),
];

/// Postfix value that announces `level`; `None` for ECC000
pub fn postfix_for(level: LegacyLevel) -> Option<u16> {
    POSTFIXES
        .iter()
        .find(|(_, l)| *l == level)
        .map(|(code, _)| *code)
}

/// Decoded legacy symbol
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyDecoded {
    /// Protection level named by the header
    pub level: LegacyLevel,
    /// Payload segments
    pub segments: Vec<Segment>,
    /// 1.0 for ECC000; otherwise falls with the tree-search distance
    pub confidence: f32,
}

fn bits_value(bits: &[bool]) -> u16 {
    bits.iter().fold(0u16, |acc, &b| (acc << 1) | b as u16)
}

/// Identify the protection level from the start of a de-whitened stream.
///
/// Returns the level and the number of header bits consumed.
pub fn classify_header(bits: &[bool]) -> Result<(LegacyLevel, usize), DecodeError> {
    if bits.len() < PREFIX_BITS {
        return Err(DecodeError::UnknownHeader);
    }
    let prefix = bits_value(&bits[..PREFIX_BITS]) as u8;
    if (prefix ^ PREFIX_ECC000).count_ones() <= 1 {
        return Ok((LegacyLevel::Ecc000, PREFIX_BITS));
    }
    if (prefix ^ PREFIX_PROTECTED).count_ones() > 1 {
        return Err(DecodeError::UnknownHeader);
    }

    let end = PREFIX_BITS + POSTFIX_BITS;
    if bits.len() < end {
        return Err(DecodeError::UnknownHeader);
    }
    let postfix = bits_value(&bits[PREFIX_BITS..end]);
    POSTFIXES
        .iter()
        .map(|&(code, level)| ((code ^ postfix).count_ones(), level))
        .filter(|&(distance, _)| distance <= 2)
        .min_by_key(|&(distance, _)| distance)
        .map(|(_, level)| (level, end))
        .ok_or(DecodeError::UnknownHeader)
}

/// Decode the data region (finder and clock borders removed) of a legacy symbol
pub fn decode_legacy(region: &BitMatrix) -> Result<LegacyDecoded, DecodeError> {
    let bits = placement::read_bits(region)?;
    let (level, header_len) = classify_header(&bits)?;
    let body = &bits[header_len..];

    let (original, confidence) = match ConvolutionalCode::for_level(level) {
        None => (body.to_vec(), 1.0),
        Some(code) => {
            let decoded = convolutional::tree_decode(&code, body)?;
            tracing::trace!(
                ?level,
                distance = decoded.distance,
                expanded = decoded.expanded,
                "convolutional decode"
            );
            let confidence = 1.0 - decoded.distance as f32 / (ERROR_BUDGET + 1) as f32;
            (decoded.bits, confidence)
        }
    };

    let segments = stream::decode_original_bits(&original)?;
    Ok(LegacyDecoded {
        level,
        segments,
        confidence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(prefix: u8, postfix: Option<u16>) -> Vec<bool> {
        let mut bits: Vec<bool> = (0..PREFIX_BITS).rev().map(|i| (prefix >> i) & 1 == 1).collect();
        if let Some(postfix) = postfix {
            bits.extend((0..POSTFIX_BITS).rev().map(|i| (postfix >> i) & 1 == 1));
        }
        bits
    }

    #[test]
    fn test_classify_exact_headers() {
        assert_eq!(
            classify_header(&header(PREFIX_ECC000, None)),
            Ok((LegacyLevel::Ecc000, 7))
        );
        for (code, level) in POSTFIXES {
            assert_eq!(
                classify_header(&header(PREFIX_PROTECTED, Some(code))),
                Ok((level, 19))
            );
        }
    }

    #[test]
    fn test_classify_tolerates_small_damage() {
        assert_eq!(
            classify_header(&header(PREFIX_ECC000 ^ 0b000_0100, None)).map(|r| r.0),
            Ok(LegacyLevel::Ecc000)
        );
        assert_eq!(
            classify_header(&header(0b100_0000, Some(0x03F ^ 0x801))).map(|r| r.0),
            Ok(LegacyLevel::Ecc100)
        );
    }

    #[test]
    fn test_classify_rejects_unknown() {
        assert_eq!(
            classify_header(&header(0b101_0101, None)),
            Err(DecodeError::UnknownHeader)
        );
        // Postfix three bits away from every code
        assert_eq!(
            classify_header(&header(PREFIX_PROTECTED, Some(0x007))),
            Err(DecodeError::UnknownHeader)
        );
    }

    #[test]
    fn test_postfix_lookup() {
        assert_eq!(postfix_for(LegacyLevel::Ecc140), Some(0xFFF));
        assert_eq!(postfix_for(LegacyLevel::Ecc000), None);
    }
}
