//! Codeword stream and mode dispatch for corrected ECC200 data
use crate::decoder::modes::{Mode, ascii, base256, c40, edifact};
use crate::error::DecodeError;
use crate::models::{Segment, SegmentBuilder};

/// Cursor over corrected data codewords
pub struct CodewordStream<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> CodewordStream<'a> {
    /// Stream positioned at the first codeword
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Next codeword, or `None` at the end of the data region
    pub fn next_codeword(&mut self) -> Option<u8> {
        let cw = *self.data.get(self.pos)?;
        self.pos += 1;
        Some(cw)
    }

    /// Next codeword without consuming it
    pub fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    /// Codewords not yet consumed
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// 1-based position of the codeword `next_codeword` will return
    pub fn position(&self) -> usize {
        self.pos + 1
    }

    /// Move the cursor back so that `count` codewords are unread again
    pub fn unread(&mut self, count: usize) {
        self.pos = self.pos.saturating_sub(count);
    }
}

/// Decode corrected ECC200 data codewords into typed segments
pub fn decode_data_codewords(data: &[u8]) -> Result<Vec<Segment>, DecodeError> {
    let mut stream = CodewordStream::new(data);
    let mut out = SegmentBuilder::new();
    let mut ascii_state = ascii::AsciiState::default();
    let mut mode = Mode::Ascii;

    loop {
        mode = match mode {
            Mode::Ascii => ascii::decode(&mut stream, &mut out, &mut ascii_state)?,
            Mode::C40 | Mode::Text | Mode::X12 => {
                c40::decode(&mut stream, &mut out, mode)?;
                Mode::Ascii
            }
            Mode::Edifact => {
                edifact::decode(&mut stream, &mut out)?;
                Mode::Ascii
            }
            Mode::Base256 => {
                base256::decode(&mut stream, &mut out)?;
                Mode::Ascii
            }
            Mode::End => break,
        };
        tracing::trace!(?mode, remaining = stream.remaining(), "mode switch");
    }

    if out.is_empty() {
        return Err(DecodeError::Malformed("symbol carries no data"));
    }
    Ok(out.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_cursor() {
        let mut stream = CodewordStream::new(&[1, 2, 3]);
        assert_eq!(stream.position(), 1);
        assert_eq!(stream.next_codeword(), Some(1));
        assert_eq!(stream.peek(), Some(2));
        assert_eq!(stream.remaining(), 2);
        stream.unread(1);
        assert_eq!(stream.next_codeword(), Some(1));
        assert_eq!(stream.next_codeword(), Some(2));
        assert_eq!(stream.next_codeword(), Some(3));
        assert_eq!(stream.next_codeword(), None);
    }

    #[test]
    fn test_hello_ascii_with_pads() {
        // "HELLO" then the 129 pad and randomized pads
        let data = [73, 70, 77, 77, 80, 129, 175, 70];
        let segments = decode_data_codewords(&data).unwrap();
        assert_eq!(segments, vec![Segment::Text("HELLO".into())]);
    }

    #[test]
    fn test_123456_digit_pairs() {
        let segments = decode_data_codewords(&[142, 164, 186]).unwrap();
        assert_eq!(segments, vec![Segment::Numeric("123456".into())]);
    }

    #[test]
    fn test_mixed_modes() {
        // "AB" in ASCII, latch C40 "XYZ", unlatch, "12" as a digit pair
        let v = 1600 * 37 + 40 * 38 + 39 + 1;
        let data = [66, 67, 230, (v / 256) as u8, (v % 256) as u8, 254, 142];
        let segments = decode_data_codewords(&data).unwrap();
        assert_eq!(
            segments,
            vec![Segment::Text("ABXYZ".into()), Segment::Numeric("12".into())]
        );
    }

    #[test]
    fn test_only_padding_is_rejected() {
        assert!(decode_data_codewords(&[129, 175]).is_err());
    }
}
