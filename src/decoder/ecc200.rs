//! ECC200 codeword de-interleaving and per-block Reed-Solomon correction
//!
//! Data codewords are dealt round-robin to the configuration's blocks and
//! error codewords follow the same pattern, except for the rotated layout
//! some 144x144 writers produce.

use crate::decoder::reed_solomon::ReedSolomonDecoder;
use crate::decoder::tables::Configuration;
use crate::error::DecodeError;

/// How error codewords are dealt to blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EccLayout {
    /// Error codeword `j` belongs to block `j % blocks`
    Standard,
    /// Each row of `blocks` error codewords is rotated by two blocks, as
    /// produced by some 144x144 encoders
    Rotated,
}

impl EccLayout {
    fn block_of(self, ecc_index: usize, blocks: usize) -> usize {
        match self {
            EccLayout::Standard => ecc_index % blocks,
            EccLayout::Rotated => (ecc_index + blocks - 2) % blocks,
        }
    }
}

/// Corrected data codewords of one symbol
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectedData {
    /// Data codewords in stream order
    pub data: Vec<u8>,
    /// Mean per-block confidence
    pub confidence: f32,
    /// Total corrected codewords across blocks
    pub corrected: usize,
    /// Layout that produced the result
    pub layout: EccLayout,
}

/// De-interleave `codewords`, correct every block and re-interleave the data.
///
/// Symbols with ten or more blocks are retried with the rotated layout when
/// the standard one fails and `swap_retry` is set.
pub fn deinterleave_and_correct(
    codewords: &[u8],
    config: &Configuration,
    swap_retry: bool,
) -> Result<CorrectedData, DecodeError> {
    match correct_with_layout(codewords, config, EccLayout::Standard) {
        Ok(result) => Ok(result),
        Err(err) if swap_retry && config.blocks >= 10 => {
            tracing::debug!(
                rows = config.rows,
                cols = config.cols,
                "standard block layout failed, retrying rotated: {err}"
            );
            correct_with_layout(codewords, config, EccLayout::Rotated)
        }
        Err(err) => Err(err),
    }
}

pub(crate) fn correct_with_layout(
    codewords: &[u8],
    config: &Configuration,
    layout: EccLayout,
) -> Result<CorrectedData, DecodeError> {
    let blocks = config.blocks;
    if blocks == 0 || codewords.len() != config.full_symbol_count() {
        return Err(DecodeError::UnsupportedSize {
            rows: config.rows,
            cols: config.cols,
        });
    }

    let ecc_per_block = config.ecc_per_block();
    let mut data_blocks: Vec<Vec<u8>> = (0..blocks)
        .map(|b| Vec::with_capacity(config.data_in_block(b) + ecc_per_block))
        .collect();
    let mut ecc_blocks: Vec<Vec<u8>> = (0..blocks)
        .map(|_| Vec::with_capacity(ecc_per_block))
        .collect();

    let (data, ecc) = codewords.split_at(config.data_codewords);
    for (k, &cw) in data.iter().enumerate() {
        data_blocks[k % blocks].push(cw);
    }
    for (j, &cw) in ecc.iter().enumerate() {
        ecc_blocks[layout.block_of(j, blocks)].push(cw);
    }

    let decoder = ReedSolomonDecoder::new(ecc_per_block);
    let mut confidence_sum = 0.0f32;
    let mut corrected = 0;
    for (block, (data_part, ecc_part)) in data_blocks.iter_mut().zip(&ecc_blocks).enumerate() {
        let data_len = data_part.len();
        data_part.extend_from_slice(ecc_part);
        let result = decoder
            .decode(data_part)
            .map_err(|reason| DecodeError::ReedSolomon { block, reason })?;
        data_part.truncate(data_len);
        confidence_sum += result.confidence;
        corrected += result.corrected;
    }

    let mut out = Vec::with_capacity(config.data_codewords);
    for k in 0..config.data_codewords {
        out.push(data_blocks[k % blocks][k / blocks]);
    }

    Ok(CorrectedData {
        data: out,
        confidence: confidence_sum / blocks as f32,
        corrected,
        layout,
    })
}

/// Interleave data and error codewords the way an encoder lays them out
pub fn interleave_with_ecc(data: &[u8], config: &Configuration, layout: EccLayout) -> Option<Vec<u8>> {
    let blocks = config.blocks;
    if blocks == 0 || data.len() != config.data_codewords {
        return None;
    }
    let ecc_per_block = config.ecc_per_block();
    let mut per_block: Vec<Vec<u8>> = vec![Vec::new(); blocks];
    for (k, &cw) in data.iter().enumerate() {
        per_block[k % blocks].push(cw);
    }
    let ecc: Vec<Vec<u8>> = per_block
        .iter()
        .map(|d| crate::decoder::reed_solomon::rs_encode(d, ecc_per_block))
        .collect();

    let mut out = data.to_vec();
    for j in 0..config.ecc_codewords {
        // Inverse of the layout: ECC slot j takes the next codeword of its block
        let block = layout.block_of(j, blocks);
        out.push(ecc[block][j / blocks]);
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::tables::{SymbolKind, find_configuration};

    fn config(rows: usize, cols: usize) -> &'static Configuration {
        find_configuration(SymbolKind::Ecc200, rows, cols).unwrap()
    }

    fn sample_data(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 7 % 200) as u8 + 1).collect()
    }

    #[test]
    fn test_single_block_clean() {
        let cfg = config(10, 10);
        let data = vec![142, 164, 186];
        let cws = interleave_with_ecc(&data, cfg, EccLayout::Standard).unwrap();
        assert_eq!(cws, vec![142, 164, 186, 114, 25, 5, 88, 102]);
        let result = deinterleave_and_correct(&cws, cfg, true).unwrap();
        assert_eq!(result.data, data);
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn test_multi_block_with_errors() {
        let cfg = config(64, 64);
        let data = sample_data(cfg.data_codewords);
        let mut cws = interleave_with_ecc(&data, cfg, EccLayout::Standard).unwrap();
        for k in [0usize, 2, 4, 11, 100] {
            cws[k] ^= 0x55;
        }
        let result = deinterleave_and_correct(&cws, cfg, true).unwrap();
        assert_eq!(result.data, data);
        assert_eq!(result.corrected, 5);
        assert!(result.confidence < 1.0);
    }

    #[test]
    fn test_144_rotated_layout_needs_retry() {
        let cfg = config(144, 144);
        let data = sample_data(cfg.data_codewords);
        let cws = interleave_with_ecc(&data, cfg, EccLayout::Rotated).unwrap();

        let result = deinterleave_and_correct(&cws, cfg, true).unwrap();
        assert_eq!(result.data, data);
        assert_eq!(result.layout, EccLayout::Rotated);

        assert!(deinterleave_and_correct(&cws, cfg, false).is_err());
    }

    #[test]
    fn test_wrong_length_rejected() {
        let cfg = config(12, 12);
        assert!(matches!(
            deinterleave_and_correct(&[0u8; 5], cfg, false),
            Err(DecodeError::UnsupportedSize { .. })
        ));
    }
}
