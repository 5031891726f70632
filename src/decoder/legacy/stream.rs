//! Framed payload of a legacy symbol: format, CRC, length and packed characters

use crate::error::DecodeError;
use crate::models::{Segment, SegmentBuilder};

/// Character set of a legacy payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyFormat {
    /// Space and digits
    Base11 = 1,
    /// Space and upper-case letters
    Base27 = 2,
    /// Space, upper-case letters, digits and `,-./`
    Base41 = 3,
    /// Space, upper-case letters and digits
    Base37 = 4,
    /// 7-bit ASCII
    Ascii = 5,
    /// 8-bit bytes
    Byte = 6,
}

const BASE11_SET: &[u8] = b" 0123456789";
const BASE27_SET: &[u8] = b" ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const BASE37_SET: &[u8] = b" ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const BASE41_SET: &[u8] = b" ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789,-./";

/// Width of the format id field
pub const FORMAT_BITS: usize = 5;
/// Width of the CRC field
pub const CRC_BITS: usize = 16;
/// Width of the character count field
pub const LENGTH_BITS: usize = 9;

impl LegacyFormat {
    /// Format carried in the 5-bit id field
    pub fn from_id(id: u32) -> Option<Self> {
        match id {
            1 => Some(Self::Base11),
            2 => Some(Self::Base27),
            3 => Some(Self::Base41),
            4 => Some(Self::Base37),
            5 => Some(Self::Ascii),
            6 => Some(Self::Byte),
            _ => None,
        }
    }

    /// Value of the 5-bit id field
    pub fn id(self) -> u8 {
        self as u8
    }

    /// Alphabet of a radix format; `None` for ASCII and Byte
    pub fn charset(self) -> Option<&'static [u8]> {
        match self {
            Self::Base11 => Some(BASE11_SET),
            Self::Base27 => Some(BASE27_SET),
            Self::Base41 => Some(BASE41_SET),
            Self::Base37 => Some(BASE37_SET),
            Self::Ascii | Self::Byte => None,
        }
    }

    /// Bits used by a final group of `1..=len` characters; the last entry is a full group
    pub fn section_bits(self) -> &'static [usize] {
        match self {
            Self::Base11 => &[4, 7, 11, 14, 18, 21],
            Self::Base27 => &[5, 10, 15, 20, 24],
            Self::Base41 => &[6, 11, 17, 22],
            Self::Base37 => &[6, 11, 16, 21],
            Self::Ascii => &[7],
            Self::Byte => &[8],
        }
    }

    /// Bits needed for `chars` characters of this format
    pub fn payload_bits(self, chars: usize) -> usize {
        let sections = self.section_bits();
        let group = sections.len();
        let full = chars / group;
        let rest = chars % group;
        full * sections[group - 1] + if rest == 0 { 0 } else { sections[rest - 1] }
    }
}

/// CRC-16 (CCITT polynomial, reflected bytes and result) over `payload`
pub fn crc16(format: LegacyFormat, payload: &[u8]) -> u16 {
    let mut crc: u16 = (format.id() as u16) << 8;
    for &byte in payload {
        crc ^= (byte.reverse_bits() as u16) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ 0x1021
            } else {
                crc << 1
            };
        }
    }
    crc.reverse_bits()
}

struct BitReader<'a> {
    bits: &'a [bool],
    pos: usize,
}

impl BitReader<'_> {
    fn read(&mut self, count: usize) -> Result<u32, DecodeError> {
        if self.pos + count > self.bits.len() {
            return Err(DecodeError::Malformed("legacy stream shorter than its length field"));
        }
        let value = self.bits[self.pos..self.pos + count]
            .iter()
            .fold(0u32, |acc, &b| (acc << 1) | b as u32);
        self.pos += count;
        Ok(value)
    }
}

fn unpack_radix(
    reader: &mut BitReader<'_>,
    format: LegacyFormat,
    charset: &[u8],
    chars: usize,
) -> Result<Vec<u8>, DecodeError> {
    let sections = format.section_bits();
    let group = sections.len();
    let radix = charset.len() as u32;
    let mut out = Vec::with_capacity(chars);

    let mut left = chars;
    while left > 0 {
        let take = left.min(group);
        let mut value = reader.read(sections[take - 1])?;
        let mut chunk = vec![0u8; take];
        for slot in chunk.iter_mut().rev() {
            *slot = charset[(value % radix) as usize];
            value /= radix;
        }
        if value != 0 {
            return Err(DecodeError::Malformed("legacy radix group out of range"));
        }
        out.extend(chunk);
        left -= take;
    }
    Ok(out)
}

/// Parse the original (unprotected) bits of a legacy symbol.
///
/// Anything after the declared length is padding and ignored.
pub fn decode_original_bits(bits: &[bool]) -> Result<Vec<Segment>, DecodeError> {
    let mut reader = BitReader { bits, pos: 0 };
    let format = LegacyFormat::from_id(reader.read(FORMAT_BITS)?)
        .ok_or(DecodeError::Malformed("unknown legacy data format"))?;
    let expected = reader.read(CRC_BITS)? as u16;
    let chars = reader.read(LENGTH_BITS)? as usize;

    let payload = match format.charset() {
        Some(charset) => unpack_radix(&mut reader, format, charset, chars)?,
        None => {
            let width = format.section_bits()[0];
            (0..chars)
                .map(|_| reader.read(width).map(|v| v as u8))
                .collect::<Result<Vec<u8>, _>>()?
        }
    };

    let actual = crc16(format, &payload);
    if actual != expected {
        return Err(DecodeError::CrcMismatch { expected, actual });
    }

    let mut out = SegmentBuilder::new();
    match format {
        LegacyFormat::Base11 => out.push_digits(&String::from_utf8_lossy(&payload)),
        LegacyFormat::Byte => out.push_bytes(&payload),
        _ => payload.iter().for_each(|&b| out.push_byte_char(b)),
    }
    if out.is_empty() {
        return Err(DecodeError::Malformed("symbol carries no data"));
    }
    Ok(out.finish())
}
