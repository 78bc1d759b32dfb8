//! Per-row conversion pipeline (§4.5, §4.6, §4.8).
//!
//! `convert_row` is pure with respect to process state: it reads exactly one file by
//! path and returns an immutable [`ConversionResult`]. Safe to run from any worker.

use crate::{
    audio, compressor,
    manifest::AssetRow,
    mesh, raster,
    types::{AssetFormat, AssetKind, CompressionCodec, FLAG_CONVERSION_FAILED, FLAG_HAS_BOUNDS},
};
use blake2::digest::{Update, VariableOutput};
use blake2::Blake2bVar;
use std::path::Path;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tga", "webp", "gif"];
const AUDIO_EXTENSIONS: &[&str] = &["ogg", "wav"];

/// immutable outcome of converting one manifest row (§3).
#[derive(Debug, Clone)]
pub struct ConversionResult {
    /// asset kind of the converted row.
    pub kind: AssetKind,
    /// encoding of `stored_bytes`.
    pub format: AssetFormat,
    /// format-specific metadata words.
    pub meta: [u32; 4],
    /// bitwise OR of `FLAG_*` constants (never includes `FLAG_ALIAS`; the planner sets that).
    pub flags: u32,
    /// format-specific auxiliary words.
    pub aux: [u32; 8],
    /// BLAKE2b-16 digest of the *decoded* payload.
    pub digest: [u8; 16],
    /// codec applied to `stored_bytes`.
    pub compression: CompressionCodec,
    /// the stored (possibly compressed) bytes.
    pub stored_bytes: Vec<u8>,
    /// size of the decoded (uncompressed) payload.
    pub decoded_size: u64,
}

fn extension_of(path: &str) -> String {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

fn digest16(bytes: &[u8]) -> [u8; 16] {
    let mut hasher = Blake2bVar::new(16).expect("16 is a valid blake2b output size");
    hasher.update(bytes);
    let mut out = [0u8; 16];
    hasher.finalize_variable(&mut out).expect("output buffer is exactly 16 bytes");
    out
}

fn raw_fallback(row: &AssetRow, raw: Vec<u8>, failed: bool) -> ConversionResult {
    raw_fallback_with_kind(AssetKind::from_semantic_kind(&row.semantic_kind), raw, failed)
}

fn raw_fallback_with_kind(kind: AssetKind, raw: Vec<u8>, failed: bool) -> ConversionResult {
    let digest = digest16(&raw);
    let decoded_size = raw.len() as u64;
    let flags = if failed { FLAG_CONVERSION_FAILED } else { 0 };
    let (compression, stored_bytes) = if raw.is_empty() {
        (CompressionCodec::None, raw)
    } else {
        compressor::maybe_compress(AssetFormat::RawBytes, &raw)
    };

    ConversionResult {
        kind,
        format: AssetFormat::RawBytes,
        meta: [0; 4],
        flags,
        aux: [0; 8],
        digest,
        compression,
        stored_bytes,
        decoded_size,
    }
}

/// converts one manifest row by reading `source_root.join(row.relative_path)`.
///
/// Never returns an error: a missing file, an unrecognized extension, or a decoder
/// failure all fall back to a raw-bytes record per §4.5 / §7. Only a real I/O fault
/// reading a file that does exist is surfaced, since that is the non-per-row fatal
/// class described in §7.
pub fn convert_row(row: &AssetRow, source_root: &Path) -> std::io::Result<ConversionResult> {
    let path = source_root.join(&row.relative_path);

    if !path.exists() {
        return Ok(raw_fallback_with_kind(AssetKind::Other, Vec::new(), true));
    }

    let raw = std::fs::read(&path)?;
    let ext = extension_of(&row.relative_path);

    if ext == "obj" {
        return Ok(match mesh::decode(&String::from_utf8_lossy(&raw)) {
            Ok(payload) => {
                let decoded_size = payload.bytes.len() as u64;
                let digest = digest16(&payload.bytes);
                let b = payload.bounds;
                ConversionResult {
                    kind: AssetKind::Mesh,
                    format: AssetFormat::MeshPnuvF32U32,
                    meta: [
                        payload.vertex_count,
                        payload.index_count,
                        payload.vertex_stride,
                        payload.index_offset,
                    ],
                    flags: FLAG_HAS_BOUNDS,
                    aux: [
                        b.min[0].to_bits(),
                        b.min[1].to_bits(),
                        b.min[2].to_bits(),
                        b.max[0].to_bits(),
                        b.max[1].to_bits(),
                        b.max[2].to_bits(),
                        b.radius.to_bits(),
                        0,
                    ],
                    digest,
                    compression: CompressionCodec::None,
                    stored_bytes: payload.bytes,
                    decoded_size,
                }
            }
            Err(_) => raw_fallback(row, raw, true),
        });
    }

    #[cfg(feature = "cli")]
    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        return Ok(match raster::decode(&raw) {
            Ok(payload) => {
                let decoded_size = payload.bytes.len() as u64;
                let digest = digest16(&payload.bytes);
                let (compression, stored_bytes) =
                    compressor::maybe_compress(AssetFormat::ImageRgba8Mips, &payload.bytes);
                ConversionResult {
                    kind: AssetKind::Image,
                    format: AssetFormat::ImageRgba8Mips,
                    meta: [payload.base_width, payload.base_height, payload.mip_count, 4],
                    flags: 0,
                    aux: [0; 8],
                    digest,
                    compression,
                    stored_bytes,
                    decoded_size,
                }
            }
            Err(_) => raw_fallback(row, raw, true),
        });
    }

    #[cfg(feature = "cli")]
    if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
        return Ok(match audio::decode(&raw, &ext) {
            Ok(payload) => {
                let decoded_size = payload.bytes.len() as u64;
                let digest = digest16(&payload.bytes);
                let (compression, stored_bytes) =
                    compressor::maybe_compress(AssetFormat::AudioPcm16Interleaved, &payload.bytes);
                ConversionResult {
                    kind: AssetKind::Audio,
                    format: AssetFormat::AudioPcm16Interleaved,
                    meta: [
                        payload.sample_rate,
                        payload.channel_count,
                        payload.frame_count,
                        16,
                    ],
                    flags: 0,
                    aux: [0; 8],
                    digest,
                    compression,
                    stored_bytes,
                    decoded_size,
                }
            }
            Err(_) => raw_fallback(row, raw, true),
        });
    }

    Ok(raw_fallback(row, raw, false))
}
