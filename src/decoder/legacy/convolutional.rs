//! Convolutional codes of the protected legacy levels and their tree-search decoder
//!
//! The generator masks below are not the ISO/IEC 16022 matrices.

use crate::error::DecodeError;
use crate::models::LegacyLevel;

/// Accumulated Hamming distance a decoded path may carry
pub const ERROR_BUDGET: u32 = 5;

/// Children kept per expanded node
const BRANCHING: usize = 3;

/// Hard cap on expanded nodes per decode
const MAX_EXPANSIONS: usize = 200_000;

/// A rate k/n code with two chunks of memory.
///
/// The shift register holds the current chunk in its top `k` bits, the
/// previous chunk below it and the one before that at the bottom. Output
/// bit `j` is the parity of the register under `masks[j]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvolutionalCode {
    /// Input bits per step
    pub k: usize,
    /// Output bits per step
    pub n: usize,
    masks: &'static [u16],
}

const ECC050: ConvolutionalCode = ConvolutionalCode {
    k: 3,
    n: 4,
    masks: &[0x100, 0x080, 0x040, 0x1EB],
};
const ECC080: ConvolutionalCode = ConvolutionalCode {
    k: 2,
    n: 3,
    masks: &[0x20, 0x10, 0x3B],
};
const ECC100: ConvolutionalCode = ConvolutionalCode {
    k: 1,
    n: 2,
    masks: &[0b100, 0b111],
};
const ECC140: ConvolutionalCode = ConvolutionalCode {
    k: 1,
    n: 4,
    masks: &[0b100, 0b111, 0b101, 0b110],
};

impl ConvolutionalCode {
    /// Code used by a protection level; `None` for ECC000
    pub fn for_level(level: LegacyLevel) -> Option<Self> {
        match level {
            LegacyLevel::Ecc000 => None,
            LegacyLevel::Ecc050 => Some(ECC050),
            LegacyLevel::Ecc080 => Some(ECC080),
            LegacyLevel::Ecc100 => Some(ECC100),
            LegacyLevel::Ecc140 => Some(ECC140),
        }
    }

    fn state_mask(&self) -> u16 {
        (1 << (2 * self.k)) - 1
    }

    /// Feed one `k`-bit chunk; returns the `n`-bit output and the next state
    pub fn step(&self, state: u16, chunk: u16) -> (u16, u16) {
        let register = (chunk << (2 * self.k)) | (state & self.state_mask());
        let output = self
            .masks
            .iter()
            .fold(0u16, |acc, &mask| (acc << 1) | ((register & mask).count_ones() as u16 & 1));
        (output, (register >> self.k) & self.state_mask())
    }

    /// Encode a bit stream, padding the final chunk with zeros
    pub fn encode(&self, bits: &[bool]) -> Vec<bool> {
        let mut out = Vec::with_capacity(bits.len().div_ceil(self.k) * self.n);
        let mut state = 0;
        for chunk_bits in bits.chunks(self.k) {
            let chunk = chunk_bits
                .iter()
                .chain(std::iter::repeat(&false))
                .take(self.k)
                .fold(0u16, |acc, &b| (acc << 1) | b as u16);
            let (output, next) = self.step(state, chunk);
            state = next;
            out.extend((0..self.n).rev().map(|i| (output >> i) & 1 == 1));
        }
        out
    }
}

/// Result of a successful tree search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeDecoded {
    /// Recovered input bits
    pub bits: Vec<bool>,
    /// Hamming distance between the re-encoded path and the received bits
    pub distance: u32,
    /// Nodes expanded before the path was found
    pub expanded: usize,
}

struct Node {
    parent: Option<usize>,
    state: u16,
    depth: usize,
    input: u16,
    distance: u32,
}

fn chunk_value(bits: &[bool]) -> u16 {
    bits.iter().fold(0u16, |acc, &b| (acc << 1) | b as u16)
}

/// Recover the input of `code` from `received` by bounded depth-first tree search.
///
/// Every expansion simulates all `2^k` inputs, keeps the three closest ones
/// whose accumulated distance stays within [`ERROR_BUDGET`] and pushes them so
/// the closest is explored first. The first path that spans every complete
/// `n`-bit chunk wins.
pub fn tree_decode(code: &ConvolutionalCode, received: &[bool]) -> Result<TreeDecoded, DecodeError> {
    let total = received.len() / code.n;
    let targets: Vec<u16> = received
        .chunks_exact(code.n)
        .map(chunk_value)
        .collect();

    let mut arena = vec![Node {
        parent: None,
        state: 0,
        depth: 0,
        input: 0,
        distance: 0,
    }];
    let mut stack = vec![0usize];
    let mut expanded = 0usize;

    while let Some(idx) = stack.pop() {
        let (state, depth, distance) = {
            let node = &arena[idx];
            (node.state, node.depth, node.distance)
        };

        if depth == total {
            let mut bits = Vec::with_capacity(total * code.k);
            let mut cursor = Some(idx);
            while let Some(i) = cursor {
                let node = &arena[i];
                if node.parent.is_some() {
                    bits.extend((0..code.k).map(|b| (node.input >> b) & 1 == 1));
                }
                cursor = node.parent;
            }
            bits.reverse();
            return Ok(TreeDecoded {
                bits,
                distance,
                expanded,
            });
        }

        expanded += 1;
        if expanded > MAX_EXPANSIONS {
            break;
        }

        let target = targets[depth];
        let mut children: Vec<(u32, u16, u16)> = (0..1u16 << code.k)
            .filter_map(|input| {
                let (output, next) = code.step(state, input);
                let total_distance = distance + (output ^ target).count_ones();
                (total_distance <= ERROR_BUDGET).then_some((total_distance, input, next))
            })
            .collect();
        children.sort_unstable_by_key(|&(d, input, _)| (d, input));
        children.truncate(BRANCHING);

        for &(child_distance, input, next) in children.iter().rev() {
            arena.push(Node {
                parent: Some(idx),
                state: next,
                depth: depth + 1,
                input,
                distance: child_distance,
            });
            stack.push(arena.len() - 1);
        }
    }

    tracing::trace!(expanded, total, "convolutional tree search exhausted");
    Err(DecodeError::Convolutional { expanded })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEVELS: [LegacyLevel; 4] = [
        LegacyLevel::Ecc050,
        LegacyLevel::Ecc080,
        LegacyLevel::Ecc100,
        LegacyLevel::Ecc140,
    ];

    fn sample_bits(len: usize) -> Vec<bool> {
        (0..len).map(|i| (i * 7 + i / 3) % 5 < 2).collect()
    }

    #[test]
    fn test_step_is_injective_per_state() {
        for level in LEVELS {
            let code = ConvolutionalCode::for_level(level).unwrap();
            for state in 0..=code.state_mask() {
                let mut outputs: Vec<u16> =
                    (0..1u16 << code.k).map(|c| code.step(state, c).0).collect();
                outputs.sort_unstable();
                outputs.dedup();
                assert_eq!(outputs.len(), 1 << code.k, "{level:?} state {state}");
            }
        }
        assert!(ConvolutionalCode::for_level(LegacyLevel::Ecc000).is_none());
    }

    #[test]
    fn test_clean_stream_decodes_for_every_level() {
        for level in LEVELS {
            let code = ConvolutionalCode::for_level(level).unwrap();
            let bits = sample_bits(code.k * 40);
            let coded = code.encode(&bits);
            assert_eq!(coded.len(), 40 * code.n);
            let decoded = tree_decode(&code, &coded).unwrap();
            assert_eq!(decoded.bits, bits, "{level:?}");
            assert_eq!(decoded.distance, 0);
        }
    }

    #[test]
    fn test_ecc140_corrects_scattered_errors() {
        let code = ConvolutionalCode::for_level(LegacyLevel::Ecc140).unwrap();
        let bits = sample_bits(60);
        let mut coded = code.encode(&bits);
        for chunk in [3usize, 11, 25, 40, 57] {
            coded[chunk * code.n + 2] ^= true;
        }
        let decoded = tree_decode(&code, &coded).unwrap();
        assert_eq!(decoded.bits, bits);
        assert_eq!(decoded.distance, 5);
    }

    #[test]
    fn test_budget_exhaustion_fails() {
        // Every ECC140 output word has even weight, so each 0001 chunk costs
        // at least one bit and twenty of them exceed the budget
        let code = ConvolutionalCode::for_level(LegacyLevel::Ecc140).unwrap();
        let received: Vec<bool> = (0..20)
            .flat_map(|_| [false, false, false, true])
            .collect();
        assert!(matches!(
            tree_decode(&code, &received),
            Err(DecodeError::Convolutional { .. })
        ));
    }

    #[test]
    fn test_trailing_partial_chunk_ignored() {
        let code = ConvolutionalCode::for_level(LegacyLevel::Ecc100).unwrap();
        let bits = sample_bits(10);
        let mut coded = code.encode(&bits);
        coded.push(true);
        assert_eq!(tree_decode(&code, &coded).unwrap().bits, bits);
    }
}
