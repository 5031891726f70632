//! ASCII encodation: the default mode and home of every latch codeword
use super::Mode;
use crate::decoder::bitstream::CodewordStream;
use crate::error::DecodeError;
use crate::models::{Segment, SegmentBuilder};

const PAD: u8 = 129;
const LATCH_C40: u8 = 230;
const LATCH_BASE256: u8 = 231;
const FNC1: u8 = 232;
const STRUCTURED_APPEND: u8 = 233;
const READER_PROGRAM: u8 = 234;
const UPPER_SHIFT: u8 = 235;
const MACRO_05: u8 = 236;
const MACRO_06: u8 = 237;
const LATCH_X12: u8 = 238;
const LATCH_TEXT: u8 = 239;
const LATCH_EDIFACT: u8 = 240;
const ECI: u8 = 241;

/// State that survives a round trip through another mode
#[derive(Debug, Default)]
pub struct AsciiState {
    upper_shift: bool,
}

/// Decode ASCII codewords until a latch or the end of data.
///
/// Returns the mode to continue in.
pub fn decode(
    stream: &mut CodewordStream<'_>,
    out: &mut SegmentBuilder,
    state: &mut AsciiState,
) -> Result<Mode, DecodeError> {
    while let Some(cw) = stream.next_codeword() {
        match cw {
            0 => return Err(DecodeError::Malformed("ascii codeword 0")),
            1..=128 => {
                let mut value = cw - 1;
                if std::mem::take(&mut state.upper_shift) {
                    value += 128;
                }
                out.push_byte_char(value);
            }
            PAD => return Ok(Mode::End),
            130..=229 => out.push_digits(&format!("{:02}", cw - 130)),
            LATCH_C40 => return Ok(Mode::C40),
            LATCH_BASE256 => return Ok(Mode::Base256),
            FNC1 => out.push(Segment::Fnc1),
            STRUCTURED_APPEND => out.push(read_structured_append(stream)?),
            READER_PROGRAM => out.push(Segment::ReaderProgram),
            UPPER_SHIFT => state.upper_shift = true,
            MACRO_05 => out.push(Segment::Macro05),
            MACRO_06 => out.push(Segment::Macro06),
            LATCH_X12 => return Ok(Mode::X12),
            LATCH_TEXT => return Ok(Mode::Text),
            LATCH_EDIFACT => return Ok(Mode::Edifact),
            ECI => out.push(Segment::EciSwitch(read_eci(stream)?)),
            _ => return Err(DecodeError::Malformed("invalid ascii codeword")),
        }
    }
    Ok(Mode::End)
}

fn read_structured_append(stream: &mut CodewordStream<'_>) -> Result<Segment, DecodeError> {
    let truncated = DecodeError::Malformed("truncated structured append");
    let sequence = stream.next_codeword().ok_or(truncated.clone())?;
    let id1 = stream.next_codeword().ok_or(truncated.clone())?;
    let id2 = stream.next_codeword().ok_or(truncated)?;

    let position = (sequence >> 4) + 1;
    let total = 17 - (sequence & 0x0F);
    if position > total {
        return Err(DecodeError::Malformed("structured append position out of range"));
    }
    Ok(Segment::StructuredAppend {
        position,
        total,
        file_id: (id1, id2),
    })
}

/// ECI assignment number in its one, two or three codeword form
fn read_eci(stream: &mut CodewordStream<'_>) -> Result<u32, DecodeError> {
    let mut next = || match stream.next_codeword() {
        None => Err(DecodeError::Malformed("truncated eci")),
        Some(0) => Err(DecodeError::Malformed("eci codeword 0")),
        Some(cw) => Ok(cw as u32),
    };
    let c1 = next()?;
    if c1 <= 127 {
        return Ok(c1 - 1);
    }
    let c2 = next()?;
    if c1 <= 191 {
        return Ok((c1 - 128) * 254 + (c2 - 1) + 127);
    }
    let c3 = next()?;
    Ok((c1 - 192) * 64516 + (c2 - 1) * 254 + (c3 - 1) + 16383)
}
