//! Data Matrix decoding modules
//!
//! This module contains all the logic for decoding a symbol once its outline
//! is known:
//! - Size catalogue and configuration selection
//! - ECC200 module placement, Reed-Solomon correction and stream decoding
//! - Legacy (ECC000-140) placement, convolutional decoding and framing

/// Main decoder that runs every stage for one candidate region
pub mod dm_decoder;
/// Block de-interleaving and correction for ECC200 symbols
pub mod ecc200;
/// ECC000-140 symbols
pub mod legacy;
/// ECC200 compaction mode decoders
pub mod modes;
/// Codeword stream and the ECC200 mode state machine
pub mod bitstream;
/// ECC200 utah codeword placement
pub mod placement;
/// Reed-Solomon error correction over GF(256)
pub mod reed_solomon;
/// Data Matrix size tables
pub mod tables;
