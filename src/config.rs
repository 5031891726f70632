//! Scan options
//!
//! Defaults are tuned for printed labels photographed roughly head-on.
//! Every knob can be overridden from the environment with
//! [`ScanOptions::from_env`], which is how the CLI and benchmarks tune runs
//! without recompiling.

use crate::error::ScanError;
use crate::models::TextEncoding;
use std::time::Duration;

fn parse_env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn parse_env_usize(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(default)
}

fn parse_env_f32(name: &str, default: f32) -> f32 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<f32>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(default)
}

fn parse_env_bool_u8(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u8>().ok())
        .map(|v| v != 0)
        .unwrap_or(default)
}

/// Options controlling one scan
#[derive(Debug, Clone, PartialEq)]
pub struct ScanOptions {
    /// Smallest accepted symbol side, in percent of the shorter image side
    pub min_side_percent: f32,
    /// Largest accepted symbol side, in percent of the shorter image side
    pub max_side_percent: f32,
    /// Stop searching after this many symbols
    pub max_results: usize,
    /// Wall-clock budget for the whole scan
    pub timeout: Option<Duration>,
    /// Smallest accepted leg length ratio of an L pattern
    pub min_aspect_ratio: f32,
    /// Largest accepted leg length ratio of an L pattern
    pub max_aspect_ratio: f32,
    /// Allowed deviation of the L corner from 90 degrees
    pub angle_tolerance_deg: f32,
    /// Maximum gap between the two edge ends that form the L corner, in pixels
    pub corner_max_distance: f32,
    /// Absolute floor on edge length, in pixels
    pub min_edge_pixels: usize,
    /// Reject L patterns whose diagonal is almost all white or all black
    pub diagonal_check: bool,
    /// How far the fourth corner may be pushed outward, as a fraction of leg length
    pub refine_fraction: f32,
    /// Attempt pre-ECC200 symbols
    pub legacy_enabled: bool,
    /// Retry 144x144-class symbols with the rotated error-codeword layout
    pub ecc144_swap_retry: bool,
    /// Decode L-pattern candidates on the rayon pool
    pub parallel: bool,
    /// Encoding used for byte data when rendering `content`
    pub text_encoding: TextEncoding,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            min_side_percent: 5.0,
            max_side_percent: 100.0,
            max_results: 10,
            timeout: None,
            min_aspect_ratio: 0.6,
            max_aspect_ratio: 6.0,
            angle_tolerance_deg: 12.0,
            corner_max_distance: 6.0,
            min_edge_pixels: 8,
            diagonal_check: true,
            refine_fraction: 0.15,
            legacy_enabled: true,
            ecc144_swap_retry: true,
            parallel: false,
            text_encoding: TextEncoding::Latin1,
        }
    }
}

impl ScanOptions {
    /// Defaults overridden by `DM_*` environment variables
    pub fn from_env() -> Self {
        let d = Self::default();
        let timeout_ms = parse_env_u64("DM_TIMEOUT_MS", 0);
        Self {
            min_side_percent: parse_env_f32("DM_MIN_SIDE_PERCENT", d.min_side_percent),
            max_side_percent: parse_env_f32("DM_MAX_SIDE_PERCENT", d.max_side_percent),
            max_results: parse_env_usize("DM_MAX_RESULTS", d.max_results).max(1),
            timeout: (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms)),
            min_aspect_ratio: parse_env_f32("DM_MIN_ASPECT", d.min_aspect_ratio),
            max_aspect_ratio: parse_env_f32("DM_MAX_ASPECT", d.max_aspect_ratio),
            angle_tolerance_deg: parse_env_f32("DM_ANGLE_TOLERANCE_DEG", d.angle_tolerance_deg)
                .clamp(1.0, 45.0),
            corner_max_distance: parse_env_f32("DM_CORNER_MAX_DISTANCE", d.corner_max_distance),
            min_edge_pixels: parse_env_usize("DM_MIN_EDGE_PIXELS", d.min_edge_pixels).max(3),
            diagonal_check: parse_env_bool_u8("DM_DIAGONAL_CHECK", d.diagonal_check),
            refine_fraction: parse_env_f32("DM_REFINE_FRACTION", d.refine_fraction)
                .clamp(0.0, 0.5),
            legacy_enabled: parse_env_bool_u8("DM_LEGACY", d.legacy_enabled),
            ecc144_swap_retry: parse_env_bool_u8("DM_ECC144_SWAP_RETRY", d.ecc144_swap_retry),
            parallel: parse_env_bool_u8("DM_PARALLEL", d.parallel),
            text_encoding: if parse_env_bool_u8("DM_UTF8", false) {
                TextEncoding::Utf8
            } else {
                d.text_encoding
            },
        }
    }

    /// Set the allowed symbol side range, in percent of the shorter image side
    pub fn with_side_range(mut self, min_percent: f32, max_percent: f32) -> Self {
        self.min_side_percent = min_percent;
        self.max_side_percent = max_percent;
        self
    }

    /// Set the maximum number of results
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// Set the wall-clock timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Enable or disable parallel candidate decoding
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Set the encoding used to render byte data
    pub fn with_text_encoding(mut self, encoding: TextEncoding) -> Self {
        self.text_encoding = encoding;
        self
    }

    /// Reject combinations that can never match a symbol
    pub fn validate(&self) -> Result<(), ScanError> {
        if !(self.min_side_percent >= 0.0 && self.min_side_percent <= self.max_side_percent) {
            return Err(ScanError::InvalidOptions("min side exceeds max side"));
        }
        if !(self.min_aspect_ratio > 0.0 && self.min_aspect_ratio <= self.max_aspect_ratio) {
            return Err(ScanError::InvalidOptions("aspect ratio range is empty"));
        }
        if self.max_results == 0 {
            return Err(ScanError::InvalidOptions("max_results must be positive"));
        }
        Ok(())
    }

    /// Allowed symbol side range in pixels for an image of the given size
    pub(crate) fn side_range_pixels(&self, width: usize, height: usize) -> (f32, f32) {
        let shorter = width.min(height) as f32;
        let min = (shorter * self.min_side_percent / 100.0).max(self.min_edge_pixels as f32);
        let max = shorter * self.max_side_percent / 100.0;
        (min, max)
    }
}
