//! Base256 encodation: length-prefixed bytes, each randomized by position
use crate::decoder::bitstream::CodewordStream;
use crate::error::DecodeError;
use crate::models::SegmentBuilder;

/// Undo the 255-state randomizing of the codeword at 1-based `position`
pub fn unrandomize(codeword: u8, position: usize) -> u8 {
    let pseudo = ((149 * position) % 255 + 1) as u8;
    codeword.wrapping_sub(pseudo)
}

fn next_byte(stream: &mut CodewordStream<'_>) -> Result<u8, DecodeError> {
    let position = stream.position();
    stream
        .next_codeword()
        .map(|cw| unrandomize(cw, position))
        .ok_or(DecodeError::Malformed("truncated base256 field"))
}

/// Decode one Base256 field; control returns to ASCII afterwards
pub fn decode(stream: &mut CodewordStream<'_>, out: &mut SegmentBuilder) -> Result<(), DecodeError> {
    let d1 = next_byte(stream)? as usize;
    let count = match d1 {
        0 => stream.remaining(),
        1..=249 => d1,
        _ => 250 * (d1 - 249) + next_byte(stream)? as usize,
    };
    if count > stream.remaining() {
        return Err(DecodeError::Malformed("base256 length exceeds data"));
    }

    let mut bytes = Vec::with_capacity(count);
    for _ in 0..count {
        bytes.push(next_byte(stream)?);
    }
    out.push_bytes(&bytes);
    Ok(())
}
