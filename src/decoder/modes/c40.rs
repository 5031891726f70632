//! C40, Text and X12 encodation: three values in every codeword pair
use super::Mode;
use crate::decoder::bitstream::CodewordStream;
use crate::error::DecodeError;
use crate::models::{Segment, SegmentBuilder};

const UNLATCH: u8 = 254;

const SHIFT2_SET: &[u8; 27] = b"!\"#$%&'()*+,-./:;<=>?@[\\]^_";
const SHIFT2_FNC1: u8 = 27;
const SHIFT2_UPPER: u8 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shift {
    None,
    Set1,
    Set2,
    Set3,
}

struct TripleDecoder {
    mode: Mode,
    shift: Shift,
    upper: bool,
}

impl TripleDecoder {
    fn emit(&mut self, out: &mut SegmentBuilder, value: u8) {
        let value = if std::mem::take(&mut self.upper) {
            value.wrapping_add(128)
        } else {
            value
        };
        out.push_byte_char(value);
    }

    fn value(&mut self, out: &mut SegmentBuilder, v: u8) -> Result<(), DecodeError> {
        if self.mode == Mode::X12 {
            let ch = match v {
                0 => b'\r',
                1 => b'*',
                2 => b'>',
                3 => b' ',
                4..=13 => b'0' + (v - 4),
                14..=39 => b'A' + (v - 14),
                _ => return Err(DecodeError::Malformed("x12 value out of range")),
            };
            out.push_byte_char(ch);
            return Ok(());
        }

        match std::mem::replace(&mut self.shift, Shift::None) {
            Shift::None => match v {
                0 => self.shift = Shift::Set1,
                1 => self.shift = Shift::Set2,
                2 => self.shift = Shift::Set3,
                3 => self.emit(out, b' '),
                4..=13 => self.emit(out, b'0' + (v - 4)),
                14..=39 if self.mode == Mode::Text => self.emit(out, b'a' + (v - 14)),
                14..=39 => self.emit(out, b'A' + (v - 14)),
                _ => return Err(DecodeError::Malformed("c40 value out of range")),
            },
            Shift::Set1 => {
                if v > 31 {
                    return Err(DecodeError::Malformed("c40 shift 1 value out of range"));
                }
                self.emit(out, v);
            }
            Shift::Set2 => match v {
                0..=26 => self.emit(out, SHIFT2_SET[v as usize]),
                SHIFT2_FNC1 => out.push(Segment::Fnc1),
                SHIFT2_UPPER => self.upper = true,
                _ => return Err(DecodeError::Malformed("c40 shift 2 value out of range")),
            },
            Shift::Set3 => {
                if v > 31 {
                    return Err(DecodeError::Malformed("c40 shift 3 value out of range"));
                }
                let ch = match (self.mode, v) {
                    (Mode::Text, 0) => b'`',
                    (Mode::Text, 1..=26) => b'A' + (v - 1),
                    // C40 shift 3 and the tail of the Text set share 96..=127
                    _ => 96 + v,
                };
                self.emit(out, ch);
            }
        }
        Ok(())
    }
}

/// Decode C40, Text or X12 codeword pairs until unlatch.
///
/// A single trailing codeword is left for ASCII, which is how encoders end
/// these modes without an explicit unlatch.
pub fn decode(
    stream: &mut CodewordStream<'_>,
    out: &mut SegmentBuilder,
    mode: Mode,
) -> Result<(), DecodeError> {
    let mut decoder = TripleDecoder {
        mode,
        shift: Shift::None,
        upper: false,
    };

    while let Some(c1) = stream.peek() {
        if c1 == UNLATCH {
            stream.next_codeword();
            return Ok(());
        }
        if stream.remaining() < 2 {
            break;
        }
        stream.next_codeword();
        let Some(c2) = stream.next_codeword() else {
            break;
        };
        let packed = (c1 as u32) * 256 + c2 as u32;
        if packed == 0 {
            return Err(DecodeError::Malformed("c40 pair 0"));
        }
        let v = packed - 1;
        for value in [v / 1600, (v % 1600) / 40, v % 40] {
            let value = u8::try_from(value)
                .map_err(|_| DecodeError::Malformed("c40 value out of range"))?;
            decoder.value(out, value)?;
        }
    }
    Ok(())
}
