//! Main Data Matrix decoder - wires detection geometry to the decoding stages

use crate::config::ScanOptions;
use crate::decoder::bitstream::decode_data_codewords;
use crate::decoder::ecc200::deinterleave_and_correct;
use crate::decoder::legacy::decode_legacy;
use crate::decoder::placement::Placement;
use crate::decoder::tables::{Configuration, SymbolKind, select_configurations};
use crate::detector::l_pattern::LCandidate;
use crate::detector::refine::{self, SymbolGeometry};
use crate::detector::sampler::{AxisSpacing, sample_data_grid};
use crate::error::DecodeError;
use crate::models::{
    BitMatrix, DarknessSampler, DataMatrixCode, Segment, SymbolFormat, Symbology, render_segments,
};

/// Payload of one successfully decoded data grid
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedGrid {
    /// ECC200 or the legacy protection level
    pub format: SymbolFormat,
    /// Typed payload in symbol order
    pub segments: Vec<Segment>,
    /// 1.0 when nothing needed correcting
    pub confidence: f32,
}

/// Data Matrix decoder for detected regions
pub struct DmDecoder;

impl DmDecoder {
    /// Decode an ECC200 data grid (`full_data_cols` x `full_data_rows`) for `config`
    pub fn decode_ecc200_grid(
        grid: &BitMatrix,
        config: &Configuration,
        swap_retry: bool,
    ) -> Result<DecodedGrid, DecodeError> {
        let placement = Placement::new(config.full_data_rows(), config.full_data_cols())?;
        if placement.len() != config.full_symbol_count() {
            return Err(DecodeError::UnsupportedSize {
                rows: config.rows,
                cols: config.cols,
            });
        }
        let codewords = placement.read_codewords(grid)?;
        let corrected = deinterleave_and_correct(&codewords, config, swap_retry)?;
        let segments = decode_data_codewords(&corrected.data)?;
        Ok(DecodedGrid {
            format: SymbolFormat::Ecc200,
            segments,
            confidence: corrected.confidence,
        })
    }

    /// Decode the data region of a legacy symbol
    pub fn decode_legacy_grid(grid: &BitMatrix) -> Result<DecodedGrid, DecodeError> {
        let decoded = decode_legacy(grid)?;
        Ok(DecodedGrid {
            format: SymbolFormat::Legacy(decoded.level),
            segments: decoded.segments,
            confidence: decoded.confidence,
        })
    }

    /// Decode a sampled grid according to the family of `config`
    pub fn decode_grid(
        grid: &BitMatrix,
        config: &Configuration,
        options: &ScanOptions,
    ) -> Result<DecodedGrid, DecodeError> {
        match config.kind {
            SymbolKind::Ecc200 => Self::decode_ecc200_grid(grid, config, options.ecc144_swap_retry),
            SymbolKind::Legacy => Self::decode_legacy_grid(grid),
        }
    }

    /// Measure, sample and decode one L candidate.
    ///
    /// Every candidate configuration is tried with uniform spacing first and
    /// then with spacing taken from the clock tracks. `None` means no
    /// hypothesis produced a valid symbol.
    pub fn decode_candidate<S: DarknessSampler + ?Sized>(
        bitmap: &BitMatrix,
        sampler: &S,
        candidate: &LCandidate,
        options: &ScanOptions,
    ) -> Option<DataMatrixCode> {
        let geometry = refine::measure(bitmap, candidate, options.refine_fraction)?;
        let (rows, cols) = geometry.rounded();
        let kind = refine::probe_symbol_kind(sampler, &geometry.quad, rows, cols);
        if kind == SymbolKind::Legacy && !options.legacy_enabled {
            tracing::trace!(rows, cols, "legacy symbol skipped");
            return None;
        }

        let configs = select_configurations(geometry.rows, geometry.cols, kind);
        if configs.is_empty() {
            tracing::trace!(rows, cols, ?kind, "no configuration near estimate");
            return None;
        }

        let boundaries = refine::clock_boundaries(bitmap, &geometry.quad, geometry.module_size);
        for config in configs {
            if let Some(code) = Self::decode_with_config(sampler, &geometry, config, boundaries.as_ref(), options) {
                return Some(code);
            }
        }
        None
    }

    fn decode_with_config<S: DarknessSampler + ?Sized>(
        sampler: &S,
        geometry: &SymbolGeometry,
        config: &Configuration,
        boundaries: Option<&(Vec<f32>, Vec<f32>)>,
        options: &ScanOptions,
    ) -> Option<DataMatrixCode> {
        let mut spacings = vec![AxisSpacing::uniform(config.rows, config.cols)];
        if let Some((row_bounds, col_bounds)) = boundaries {
            let adaptive = AxisSpacing::from_boundaries(config.rows, config.cols, row_bounds, col_bounds);
            if adaptive != spacings[0] {
                spacings.push(adaptive);
            }
        }

        for (pass, spacing) in spacings.iter().enumerate() {
            let grid = sample_data_grid(sampler, &geometry.quad, config, spacing);
            match Self::decode_grid(&grid, config, options) {
                Ok(decoded) => {
                    tracing::debug!(
                        rows = config.rows,
                        cols = config.cols,
                        pass,
                        confidence = decoded.confidence,
                        "symbol decoded"
                    );
                    return Some(DataMatrixCode {
                        corners: geometry.quad.corners(),
                        confidence: decoded.confidence,
                        symbology: Symbology::DataMatrix,
                        format: decoded.format,
                        rows: config.rows,
                        cols: config.cols,
                        content: render_segments(&decoded.segments, options.text_encoding),
                        segments: decoded.segments,
                    });
                }
                Err(err) => {
                    tracing::trace!(rows = config.rows, cols = config.cols, pass, "grid rejected: {err}");
                }
            }
        }
        None
    }
}
