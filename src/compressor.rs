//! Optional deflate/zlib wrap of a decoded payload (§4.6).

use crate::types::{AssetFormat, CompressionCodec};
use flate2::{write::ZlibEncoder, Compression};
use std::io::Write;

const MIN_PAYLOAD_SIZE: usize = 256;

/// whether `format` is ever eligible for compression. Mesh payloads never are.
pub const fn is_eligible(format: AssetFormat) -> bool {
    !matches!(format, AssetFormat::MeshPnuvF32U32)
}

/// applies §4.6: compresses `payload` if eligible, large enough, and the compressed form
/// is smaller by at least the savings threshold. Returns the codec used and the stored bytes.
pub fn maybe_compress(format: AssetFormat, payload: &[u8]) -> (CompressionCodec, Vec<u8>) {
    if !is_eligible(format) || payload.len() < MIN_PAYLOAD_SIZE {
        return (CompressionCodec::None, payload.to_vec());
    }

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    if encoder.write_all(payload).is_err() {
        return (CompressionCodec::None, payload.to_vec());
    }
    let compressed = match encoder.finish() {
        Ok(c) => c,
        Err(_) => return (CompressionCodec::None, payload.to_vec()),
    };

    let threshold = (payload.len() / 100).max(64);
    if compressed.len() + threshold < payload.len() {
        (CompressionCodec::DeflateZlib, compressed)
    } else {
        (CompressionCodec::None, payload.to_vec())
    }
}
