//! Service definition packaging using DEFLATE via `miniz_oxide`.
//!
//! The definition text is compressed once on the host (build script or
//! generator) and embedded in the firmware as a byte array, served by the
//! meta-service. Its SHA-256 identifies the exact definition a device runs.

extern crate alloc;
use alloc::vec::Vec;

use log::warn;
use miniz_oxide::deflate::compress_to_vec;
use miniz_oxide::inflate::decompress_to_vec_with_limit;

use crate::error::DefinitionError;

/// DEFLATE compression level (1-10). Compression runs on the host, so
/// take the best ratio.
const COMPRESSION_LEVEL: u8 = 10;

/// Upper bound on an inflated definition.
pub const MAX_DEFINITION_SIZE: usize = 64 * 1024;

/// Compress a definition for embedding.
pub fn compress_definition(text: &[u8]) -> Vec<u8> {
    compress_to_vec(text, COMPRESSION_LEVEL)
}

/// Inflate an embedded definition.
pub fn decompress_definition(compressed: &[u8]) -> Result<Vec<u8>, DefinitionError> {
    decompress_to_vec_with_limit(compressed, MAX_DEFINITION_SIZE).map_err(|e| {
        warn!("decompress: DEFLATE error: {:?}", e.status);
        DefinitionError::Inflate
    })
}

/// Lowercase hex SHA-256 of a definition text.
pub fn definition_hash(text: &[u8]) -> heapless::String<64> {
    const HEX: &[u8; 16] = b"0123456789abcdef";

    let digest = hmac_sha256::Hash::hash(text);
    let mut out = heapless::String::new();
    for byte in digest {
        // 32 bytes make exactly 64 hex digits.
        let _ = out.push(HEX[(byte >> 4) as usize] as char);
        let _ = out.push(HEX[(byte & 0x0F) as usize] as char);
    }
    out
}

// ── Tests ────────────────────────────────────────────────────
