//! EDIFACT encodation: four 6-bit values in every three codewords
use crate::decoder::bitstream::CodewordStream;
use crate::error::DecodeError;
use crate::models::SegmentBuilder;

const UNLATCH: u8 = 31;

/// Decode EDIFACT groups until unlatch or until two or fewer codewords remain.
///
/// After an unlatch the rest of the current codeword is discarded and
/// decoding resumes in ASCII on the next codeword boundary.
pub fn decode(stream: &mut CodewordStream<'_>, out: &mut SegmentBuilder) -> Result<(), DecodeError> {
    while stream.remaining() > 2 {
        let mut group = [0u8; 3];
        for slot in group.iter_mut() {
            *slot = stream
                .next_codeword()
                .ok_or(DecodeError::Malformed("truncated edifact group"))?;
        }
        let bits = ((group[0] as u32) << 16) | ((group[1] as u32) << 8) | group[2] as u32;

        for i in 0..4usize {
            let value = ((bits >> (18 - 6 * i)) & 0x3F) as u8;
            if value == UNLATCH {
                // Bits used so far, rounded up to whole codewords
                let used = (6 * (i + 1)).div_ceil(8);
                stream.unread(3 - used);
                return Ok(());
            }
            let ch = if value & 0x20 == 0 { value | 0x40 } else { value };
            out.push_byte_char(ch);
        }
    }
    Ok(())
}
