//! Synthetic symbol builder for the integration tests and benchmarks
//!
//! Produces codeword streams in every ECC200 mode, lays them out as full
//! module grids (finder, clock tracks and alignment borders included) and
//! renders those grids to bitmaps or grayscale buffers.
#![allow(dead_code)]

use dmtx_scan::BitMatrix;
use dmtx_scan::LegacyLevel;
use dmtx_scan::decoder::ecc200::{EccLayout, interleave_with_ecc};
use dmtx_scan::decoder::legacy::convolutional::ConvolutionalCode;
use dmtx_scan::decoder::legacy::placement::{placement_table, whitening_sequence};
use dmtx_scan::decoder::legacy::stream::{CRC_BITS, FORMAT_BITS, LENGTH_BITS, LegacyFormat, crc16};
use dmtx_scan::decoder::legacy::{POSTFIX_BITS, PREFIX_BITS, PREFIX_ECC000, PREFIX_PROTECTED, postfix_for};
use dmtx_scan::decoder::placement::Placement;
use dmtx_scan::decoder::tables::{Configuration, SymbolKind, find_configuration};

pub const PAD: u8 = 129;
const LATCH_C40: u8 = 230;
const LATCH_BASE256: u8 = 231;
const UPPER_SHIFT: u8 = 235;
const LATCH_X12: u8 = 238;
const LATCH_TEXT: u8 = 239;
const LATCH_EDIFACT: u8 = 240;
const UNLATCH: u8 = 254;
const EDIFACT_UNLATCH: u8 = 31;

const C40_SHIFT2: &[u8] = b"!\"#$%&'()*+,-./:;<=>?@[\\]^_";

/// Which triple set to pack with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripleSet {
    C40,
    Text,
    X12,
}

/// Builds an ECC200 data codeword stream mode by mode
#[derive(Debug, Default, Clone)]
pub struct Encoder {
    codewords: Vec<u8>,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn codewords(&self) -> &[u8] {
        &self.codewords
    }

    /// Raw codewords, e.g. function characters
    pub fn raw(mut self, codewords: &[u8]) -> Self {
        self.codewords.extend_from_slice(codewords);
        self
    }

    /// ASCII mode with digit pairs and upper shift for bytes above 127
    pub fn ascii(mut self, text: &[u8]) -> Self {
        let mut i = 0;
        while i < text.len() {
            let b = text[i];
            if b.is_ascii_digit() && text.get(i + 1).is_some_and(u8::is_ascii_digit) {
                let pair = (b - b'0') * 10 + (text[i + 1] - b'0');
                self.codewords.push(130 + pair);
                i += 2;
                continue;
            }
            if b > 127 {
                self.codewords.push(UPPER_SHIFT);
                self.codewords.push(b - 128 + 1);
            } else {
                self.codewords.push(b + 1);
            }
            i += 1;
        }
        self
    }

    /// C40, Text or X12 run closed with an unlatch.
    ///
    /// Only a single filler value (shift 1, which emits nothing on its own)
    /// may close the last triple, and X12 has none at all. Trailing
    /// characters that would need more are written in ASCII after the
    /// unlatch.
    pub fn triples(mut self, set: TripleSet, text: &[u8]) -> Self {
        let latch = match set {
            TripleSet::C40 => LATCH_C40,
            TripleSet::Text => LATCH_TEXT,
            TripleSet::X12 => LATCH_X12,
        };
        let value_count = |n: usize| -> usize { text[..n].iter().map(|&b| triple_values(set, b).len()).sum() };
        let mut split = text.len();
        loop {
            let rem = value_count(split) % 3;
            if rem == 0 || (rem == 2 && set != TripleSet::X12) {
                break;
            }
            split -= 1;
        }
        let (text, tail) = text.split_at(split);
        let mut values: Vec<u16> = text.iter().flat_map(|&b| triple_values(set, b)).collect();
        if values.len() % 3 == 2 {
            values.push(0);
        }
        self.codewords.push(latch);
        for chunk in values.chunks(3) {
            let packed = 1600 * chunk[0] + 40 * chunk[1] + chunk[2] + 1;
            self.codewords.push((packed / 256) as u8);
            self.codewords.push((packed % 256) as u8);
        }
        self.codewords.push(UNLATCH);
        self.ascii(tail)
    }

    /// EDIFACT run (characters 32..=94) closed with the unlatch value
    pub fn edifact(mut self, text: &[u8]) -> Self {
        let mut values: Vec<u8> = text.iter().map(|&b| b & 0x3F).collect();
        values.push(EDIFACT_UNLATCH);
        let used_bits = values.len() * 6;
        while values.len() % 4 != 0 {
            values.push(0);
        }

        let mut bytes = Vec::new();
        for group in values.chunks(4) {
            let bits = group.iter().fold(0u32, |acc, &v| (acc << 6) | v as u32);
            bytes.extend_from_slice(&[(bits >> 16) as u8, (bits >> 8) as u8, bits as u8]);
        }
        bytes.truncate(used_bits.div_ceil(8));

        self.codewords.push(LATCH_EDIFACT);
        self.codewords.extend(bytes);
        self
    }

    /// Base256 field with an explicit length
    pub fn base256(mut self, bytes: &[u8]) -> Self {
        self.codewords.push(LATCH_BASE256);
        let mut field = Vec::with_capacity(bytes.len() + 2);
        if bytes.len() <= 249 {
            field.push(bytes.len() as u8);
        } else {
            field.push((bytes.len() / 250 + 249) as u8);
            field.push((bytes.len() % 250) as u8);
        }
        field.extend_from_slice(bytes);
        for b in field {
            let position = self.codewords.len() + 1;
            let pseudo = ((149 * position) % 255 + 1) as u8;
            self.codewords.push(b.wrapping_add(pseudo));
        }
        self
    }

    /// Pad to the data capacity of `config`; `None` if the data does not fit
    pub fn finish(self, config: &Configuration) -> Option<Vec<u8>> {
        pad_codewords(self.codewords, config.data_codewords)
    }
}

fn triple_values(set: TripleSet, b: u8) -> Vec<u16> {
    let b16 = b as u16;
    match set {
        TripleSet::X12 => vec![match b {
            b'\r' => 0,
            b'*' => 1,
            b'>' => 2,
            b' ' => 3,
            b'0'..=b'9' => b16 - b'0' as u16 + 4,
            _ => b16 - b'A' as u16 + 14,
        }],
        _ => {
            let (basic, other) = match set {
                TripleSet::Text => (b'a'..=b'z', b'A'..=b'Z'),
                _ => (b'A'..=b'Z', b'a'..=b'z'),
            };
            if b == b' ' {
                vec![3]
            } else if b.is_ascii_digit() {
                vec![b16 - b'0' as u16 + 4]
            } else if basic.contains(&b) {
                vec![b16 - *basic.start() as u16 + 14]
            } else if other.contains(&b) {
                vec![2, b16 - *other.start() as u16 + 1]
            } else if let Some(idx) = C40_SHIFT2.iter().position(|&c| c == b) {
                vec![1, idx as u16]
            } else {
                vec![0, b16]
            }
        }
    }
}

/// Append the end-of-data pad and randomized pads up to `capacity`
pub fn pad_codewords(mut data: Vec<u8>, capacity: usize) -> Option<Vec<u8>> {
    if data.len() > capacity {
        return None;
    }
    if data.len() < capacity {
        data.push(PAD);
    }
    while data.len() < capacity {
        let position = data.len() + 1;
        let value = PAD as usize + (149 * position) % 253 + 1;
        let pad = if value > 254 { value - 254 } else { value };
        data.push(pad as u8);
    }
    Some(data)
}

pub fn ecc200_config(rows: usize, cols: usize) -> &'static Configuration {
    find_configuration(SymbolKind::Ecc200, rows, cols).expect("not an ECC200 size")
}

/// Interleaved data and error codewords placed in the data grid
pub fn data_grid(config: &Configuration, data: &[u8], layout: EccLayout) -> BitMatrix {
    let codewords = interleave_with_ecc(data, config, layout).expect("data does not match the configuration");
    Placement::new(config.full_data_rows(), config.full_data_cols())
        .expect("no placement for size")
        .write_codewords(&codewords)
}

/// Full module grid (`cols` wide, `rows` tall) with every region border drawn
pub fn ecc200_modules(config: &Configuration, grid: &BitMatrix) -> BitMatrix {
    let block_rows = config.region_rows + 2;
    let block_cols = config.region_cols + 2;
    let mut modules = BitMatrix::from_fn(config.cols, config.rows, |x, y| {
        let (lx, ly) = (x % block_cols, y % block_rows);
        if lx == 0 || ly == block_rows - 1 {
            true
        } else if ly == 0 {
            lx % 2 == 0
        } else if lx == block_cols - 1 {
            ly % 2 == 1
        } else {
            false
        }
    });
    for y in 0..grid.height() {
        for x in 0..grid.width() {
            modules.set(config.symbol_col(x), config.symbol_row(y), grid.get(x, y));
        }
    }
    modules
}

/// Module grid of an ECC200 symbol carrying `encoder`'s data
pub fn ecc200_symbol(rows: usize, cols: usize, encoder: Encoder) -> BitMatrix {
    let config = ecc200_config(rows, cols);
    let data = encoder.finish(config).expect("data exceeds symbol capacity");
    ecc200_modules(config, &data_grid(config, &data, EccLayout::Standard))
}

/// Module grid of an ECC200 symbol carrying `text` in ASCII mode
pub fn ascii_symbol(rows: usize, cols: usize, text: &str) -> BitMatrix {
    ecc200_symbol(rows, cols, Encoder::new().ascii(text.as_bytes()))
}

fn push_bits(out: &mut Vec<bool>, value: u32, count: usize) {
    out.extend((0..count).rev().map(|i| (value >> i) & 1 == 1));
}

/// Original (unprotected) bits of a legacy payload: format, CRC, length, characters
pub fn legacy_frame(format: LegacyFormat, payload: &[u8]) -> Vec<bool> {
    let mut bits = Vec::new();
    push_bits(&mut bits, format.id() as u32, FORMAT_BITS);
    push_bits(&mut bits, crc16(format, payload) as u32, CRC_BITS);
    push_bits(&mut bits, payload.len() as u32, LENGTH_BITS);

    match format.charset() {
        Some(charset) => {
            let sections = format.section_bits();
            let radix = charset.len() as u32;
            for group in payload.chunks(sections.len()) {
                let value = group.iter().fold(0u32, |acc, ch| {
                    let idx = charset.iter().position(|c| c == ch).expect("char outside format");
                    acc * radix + idx as u32
                });
                push_bits(&mut bits, value, sections[group.len() - 1]);
            }
        }
        None => {
            let width = format.section_bits()[0];
            for &b in payload {
                push_bits(&mut bits, b as u32, width);
            }
        }
    }
    bits
}

/// De-whitened bit stream of a `size` x `size` legacy symbol, header included
pub fn legacy_stream(size: usize, level: LegacyLevel, frame: &[bool]) -> Option<Vec<bool>> {
    let capacity = (size - 2) * (size - 2);
    let mut bits = Vec::with_capacity(capacity);
    match (ConvolutionalCode::for_level(level), postfix_for(level)) {
        (Some(code), Some(postfix)) => {
            push_bits(&mut bits, PREFIX_PROTECTED as u32, PREFIX_BITS);
            push_bits(&mut bits, postfix as u32, POSTFIX_BITS);
            let chunks = capacity.checked_sub(bits.len())? / code.n;
            let mut original = frame.to_vec();
            if original.len() > chunks * code.k {
                return None;
            }
            original.resize(chunks * code.k, false);
            bits.extend(code.encode(&original));
        }
        _ => {
            push_bits(&mut bits, PREFIX_ECC000 as u32, PREFIX_BITS);
            bits.extend_from_slice(frame);
        }
    }
    if bits.len() > capacity {
        return None;
    }
    bits.resize(capacity, false);
    Some(bits)
}

/// Full module grid of a legacy symbol
pub fn legacy_symbol(size: usize, level: LegacyLevel, format: LegacyFormat, payload: &[u8]) -> Option<BitMatrix> {
    let stream = legacy_stream(size, level, &legacy_frame(format, payload))?;
    let table = placement_table(size)?;
    let side = size - 2;

    let mut modules = BitMatrix::from_fn(size, size, |x, y| {
        if x == 0 || y == size - 1 {
            true
        } else if y == 0 {
            x % 2 == 0
        } else if x == size - 1 {
            y % 2 == 0
        } else {
            false
        }
    });
    for ((&cell, &bit), &mask) in table.iter().zip(&stream).zip(whitening_sequence()) {
        let cell = cell as usize;
        modules.set(1 + cell % side, 1 + cell / side, bit ^ mask);
    }
    Some(modules)
}

/// Data region of a legacy module grid (finder and clock removed)
pub fn legacy_region(modules: &BitMatrix) -> BitMatrix {
    let side = modules.width() - 2;
    BitMatrix::from_fn(side, side, |x, y| modules.get(x + 1, y + 1))
}

/// Scale a module grid to pixels with a white quiet zone around it
pub fn render(modules: &BitMatrix, scale: usize, quiet: usize) -> BitMatrix {
    let margin = quiet * scale;
    BitMatrix::from_fn(
        modules.width() * scale + 2 * margin,
        modules.height() * scale + 2 * margin,
        |x, y| {
            if x < margin || y < margin {
                return false;
            }
            modules.get((x - margin) / scale, (y - margin) / scale)
        },
    )
}

/// Place several module grids side by side on one white canvas
pub fn render_row(symbols: &[BitMatrix], scale: usize, quiet: usize) -> BitMatrix {
    let rendered: Vec<BitMatrix> = symbols.iter().map(|s| render(s, scale, quiet)).collect();
    let width = rendered.iter().map(BitMatrix::width).sum();
    let height = rendered.iter().map(BitMatrix::height).max().unwrap_or(0);
    let mut canvas = BitMatrix::new(width, height);
    let mut x0 = 0;
    for image in &rendered {
        for y in 0..image.height() {
            for x in 0..image.width() {
                if image.get(x, y) {
                    canvas.set(x0 + x, y, true);
                }
            }
        }
        x0 += image.width();
    }
    canvas
}

/// Rotate a bitmap a quarter turn clockwise
pub fn rotate_cw(bitmap: &BitMatrix) -> BitMatrix {
    let h = bitmap.height();
    BitMatrix::from_fn(h, bitmap.width(), |x, y| bitmap.get(y, h - 1 - x))
}

/// Grayscale pixels of a bitmap: `dark` for black, `light` for white
pub fn to_gray(bitmap: &BitMatrix, dark: u8, light: u8) -> Vec<u8> {
    let mut out = Vec::with_capacity(bitmap.width() * bitmap.height());
    for y in 0..bitmap.height() {
        out.extend(bitmap.row_bits(y).into_iter().map(|b| if b { dark } else { light }));
    }
    out
}

/// Interleaved codewords of a data grid, in placement order
pub fn read_grid(config: &Configuration, grid: &BitMatrix) -> Vec<u8> {
    Placement::new(config.full_data_rows(), config.full_data_cols())
        .expect("no placement for size")
        .read_codewords(grid)
        .expect("grid does not match the configuration")
}

/// Write interleaved codewords back into a fresh data grid
pub fn write_grid(config: &Configuration, codewords: &[u8]) -> BitMatrix {
    Placement::new(config.full_data_rows(), config.full_data_cols())
        .expect("no placement for size")
        .write_codewords(codewords)
}
