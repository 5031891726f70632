//! Decoded data segments and their textual rendering

/// Encoding used to turn binary segments into text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    /// ISO-8859-1: every byte maps to the code point of the same value
    #[default]
    Latin1,
    /// UTF-8, invalid sequences replaced with U+FFFD
    Utf8,
}

impl TextEncoding {
    /// Decode raw bytes to a string
    pub fn decode(&self, bytes: &[u8]) -> String {
        match self {
            TextEncoding::Latin1 => bytes.iter().map(|&b| b as char).collect(),
            TextEncoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
        }
    }

    /// Encoding selected by an ECI assignment number, if it is one we know
    pub fn from_eci(eci: u32) -> Option<Self> {
        match eci {
            1 | 3 => Some(TextEncoding::Latin1),
            26 => Some(TextEncoding::Utf8),
            _ => None,
        }
    }
}

/// One typed run of decoded symbol data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Character data (C40/Text/X12/EDIFACT/ASCII), one char per source byte
    Text(String),
    /// Decimal digits from ASCII digit-pair codewords or numeric legacy formats
    Numeric(String),
    /// Base256 or 8-bit byte data
    Binary(Vec<u8>),
    /// Extended Channel Interpretation switch
    EciSwitch(u32),
    /// Symbol is part of a structured-append sequence
    StructuredAppend {
        /// 1-based position of this symbol
        position: u8,
        /// Total number of symbols in the sequence
        total: u8,
        /// Two-codeword file identification
        file_id: (u8, u8),
    },
    /// Function 1 character (GS1 / AIM)
    Fnc1,
    /// `[)>RS05GS` message envelope
    Macro05,
    /// `[)>RS06GS` message envelope
    Macro06,
    /// Symbol carries reader programming data
    ReaderProgram,
}

const MACRO_TRAILER: &str = "\u{1E}\u{04}";

/// Accumulates segments, merging adjacent runs of the same textual kind
#[derive(Debug, Default)]
pub struct SegmentBuilder {
    segments: Vec<Segment>,
}

impl SegmentBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one character to the trailing text run
    pub fn push_char(&mut self, ch: char) {
        if let Some(Segment::Text(text)) = self.segments.last_mut() {
            text.push(ch);
        } else {
            self.segments.push(Segment::Text(ch.to_string()));
        }
    }

    /// Append a character given as a Latin-1 byte value
    pub fn push_byte_char(&mut self, value: u8) {
        self.push_char(value as char);
    }

    /// Append digits to the trailing numeric run
    pub fn push_digits(&mut self, digits: &str) {
        if let Some(Segment::Numeric(text)) = self.segments.last_mut() {
            text.push_str(digits);
        } else {
            self.segments.push(Segment::Numeric(digits.to_string()));
        }
    }

    /// Append bytes to the trailing binary run
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        if let Some(Segment::Binary(data)) = self.segments.last_mut() {
            data.extend_from_slice(bytes);
        } else {
            self.segments.push(Segment::Binary(bytes.to_vec()));
        }
    }

    /// Append a marker segment; never merged
    pub fn push(&mut self, segment: Segment) {
        self.segments.push(segment);
    }

    /// True if nothing has been pushed yet
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Consume the builder and return the segments
    pub fn finish(self) -> Vec<Segment> {
        self.segments
    }
}

/// Concatenate segments into the value reported to the caller.
///
/// Binary runs and the byte values of text runs go through `encoding` until
/// an ECI switch selects another known encoding. Macro envelopes wrap the
/// whole message.
pub fn render_segments(segments: &[Segment], encoding: TextEncoding) -> String {
    let mut out = String::new();
    let mut encoding = encoding;
    let mut trailer = false;

    for segment in segments {
        match segment {
            Segment::Numeric(text) => out.push_str(text),
            Segment::Text(text) => match encoding {
                TextEncoding::Latin1 => out.push_str(text),
                // Text runs hold one Latin-1 char per source byte
                _ => {
                    let bytes: Vec<u8> = text.chars().map(|c| u8::try_from(c).unwrap_or(b'?')).collect();
                    out.push_str(&encoding.decode(&bytes));
                }
            },
            Segment::Binary(bytes) => out.push_str(&encoding.decode(bytes)),
            Segment::EciSwitch(eci) => {
                if let Some(next) = TextEncoding::from_eci(*eci) {
                    encoding = next;
                }
            }
            Segment::Fnc1 => out.push('\u{1D}'),
            Segment::Macro05 => {
                out.push_str("[)>\u{1E}05\u{1D}");
                trailer = true;
            }
            Segment::Macro06 => {
                out.push_str("[)>\u{1E}06\u{1D}");
                trailer = true;
            }
            Segment::StructuredAppend { .. } | Segment::ReaderProgram => {}
        }
    }

    if trailer {
        out.push_str(MACRO_TRAILER);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_merges_runs() {
        let mut builder = SegmentBuilder::new();
        builder.push_char('A');
        builder.push_char('B');
        builder.push_digits("12");
        builder.push_digits("34");
        builder.push(Segment::Fnc1);
        builder.push_char('C');
        assert_eq!(
            builder.finish(),
            vec![
                Segment::Text("AB".into()),
                Segment::Numeric("1234".into()),
                Segment::Fnc1,
                Segment::Text("C".into()),
            ]
        );
    }

    #[test]
    fn test_render_with_encoding_switch() {
        let segments = vec![
            Segment::Text("x=".into()),
            Segment::Binary(vec![0xC3, 0xA9]),
            Segment::EciSwitch(26),
            Segment::Binary(vec![0xC3, 0xA9]),
        ];
        assert_eq!(
            render_segments(&segments, TextEncoding::Latin1),
            "x=\u{C3}\u{A9}\u{E9}"
        );
    }

    #[test]
    fn test_eci_applies_to_upper_shifted_text() {
        // UTF-8 for "é" read through ASCII upper shift
        let segments = vec![
            Segment::Text("\u{C3}\u{A9}".into()),
            Segment::EciSwitch(26),
            Segment::Text("n\u{C3}\u{A9}".into()),
            Segment::Numeric("42".into()),
        ];
        assert_eq!(
            render_segments(&segments, TextEncoding::Latin1),
            "\u{C3}\u{A9}n\u{E9}42"
        );
        assert_eq!(render_segments(&segments[2..], TextEncoding::Utf8), "n\u{E9}42");
    }

    #[test]
    fn test_render_macro_envelope() {
        let segments = vec![Segment::Macro05, Segment::Text("ABC".into())];
        assert_eq!(
            render_segments(&segments, TextEncoding::Utf8),
            "[)>\u{1E}05\u{1D}ABC\u{1E}\u{04}"
        );
    }
}
