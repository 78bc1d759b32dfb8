//! On-disk layout of the GBPK pack container.
//!
//! Everything here is little-endian and `#[repr(C, packed)]`: these structs are
//! written and read as raw bytes, never through the platform's native struct
//! layout rules.

/// GBPK magic number ("GBPK" read little-endian as a u32).
pub const PACK_MAGIC: u32 = 0x4B50_4247;

/// current pack format version.
pub const PACK_VERSION: u32 = 3;

/// sentinel for "no index" / "no alias" / "not applicable".
pub const INVALID_INDEX: u32 = 0xFFFF_FFFF;

/// record carries an alias pointing at another record's payload.
pub const FLAG_ALIAS: u32 = 1 << 0;
/// decode fell back to raw bytes after a decoder failure or missing source file.
pub const FLAG_CONVERSION_FAILED: u32 = 1 << 1;
/// `aux0..aux6` hold a valid mesh bounding box + radius.
pub const FLAG_HAS_BOUNDS: u32 = 1 << 2;

/// asset kind, derived from the manifest's declared semantic kind or the decoder that ran.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    /// payload was not classified into any of the media kinds below.
    Raw = 0,
    /// triangle mesh geometry.
    Mesh = 1,
    /// raster image.
    Image = 2,
    /// PCM audio.
    Audio = 3,
    /// a document asset (semantic kind `document`).
    Document = 4,
    /// anything else: archives, links, project/auxiliary data, fonts, unrecognized kinds.
    Other = 5,
}

impl AssetKind {
    /// maps a manifest `semantic_kind` column value to an `AssetKind`.
    pub fn from_semantic_kind(kind: &str) -> Self {
        match kind.trim().to_ascii_lowercase().as_str() {
            "mesh" | "model" | "geometry" => Self::Mesh,
            "image" | "texture" | "sprite" => Self::Image,
            "audio" | "sound" | "music" => Self::Audio,
            "document" => Self::Document,
            _ => Self::Other,
        }
    }
}

/// payload encoding, one per decoder plus the raw-bytes fallback.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetFormat {
    /// decoder declined or failed; payload is the source file's raw bytes.
    RawBytes = 0,
    /// vertex/index arrays described in §4.2.
    MeshPnuvF32U32 = 1,
    /// RGBA8 mip chain described in §4.3.
    ImageRgba8Mips = 2,
    /// interleaved PCM16 described in §4.4.
    AudioPcm16Interleaved = 3,
}

/// whether the stored payload bytes are compressed.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionCodec {
    /// stored bytes equal the decoded payload.
    None = 0,
    /// stored bytes are zlib/deflate-compressed; `decoded_size` is the uncompressed length.
    DeflateZlib = 1,
}

/// `(offset, length)` into the string table. The byte at `offset + length` is always NUL.
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringRef {
    /// byte offset into the string table.
    pub offset: u32,
    /// length in bytes, excluding the terminating NUL.
    pub length: u32,
}

impl StringRef {
    /// the empty string reference, used before a field has been interned.
    pub const EMPTY: Self = Self {
        offset: 0,
        length: 0,
    };
}

/// fixed-size header at offset 0 of the pack container.
#[repr(C, packed)]
#[derive(Debug, Clone, Copy)]
pub struct PackHeader {
    /// must equal [`PACK_MAGIC`].
    pub magic: u32,
    /// must equal [`PACK_VERSION`].
    pub version: u32,
    /// reserved flag bits, currently always zero.
    pub flags: u32,
    /// number of records in the asset table.
    pub asset_count: u32,
    /// reserved for future use; always zero, consumers must tolerate but not interpret it.
    pub reserved: u32,
    /// byte offset of the string table.
    pub string_table_offset: u64,
    /// byte size of the string table.
    pub string_table_size: u64,
    /// byte offset of the asset table.
    pub asset_table_offset: u64,
    /// byte size of the asset table.
    pub asset_table_size: u64,
    /// byte offset of the payload region.
    pub payload_offset: u64,
    /// byte size of the payload region.
    pub payload_size: u64,
}

/// fixed-size asset table entry: 29 u32 fields followed by 3 u64 fields.
#[repr(C, packed)]
#[derive(Debug, Clone, Copy)]
pub struct AssetRecord {
    /// manifest `asset_name` reference.
    pub name: StringRef,
    /// manifest `asset_relative_path` reference.
    pub relative_path: StringRef,
    /// manifest `semantic_kind` reference.
    pub semantic_kind: StringRef,
    /// manifest `content_role` reference.
    pub content_role: StringRef,
    /// manifest `engine_hint` reference.
    pub engine_hint: StringRef,
    /// manifest `semantic_tags` reference.
    pub semantic_tags: StringRef,
    /// [`AssetKind`] as a raw u32.
    pub kind: u32,
    /// [`AssetFormat`] as a raw u32.
    pub format: u32,
    /// bitwise OR of `FLAG_*` constants.
    pub flags: u32,
    /// canonical record index if `FLAG_ALIAS` is set, else [`INVALID_INDEX`].
    pub alias_index: u32,
    /// format-specific metadata word 0.
    pub meta0: u32,
    /// format-specific metadata word 1.
    pub meta1: u32,
    /// format-specific metadata word 2.
    pub meta2: u32,
    /// format-specific metadata word 3.
    pub meta3: u32,
    /// [`CompressionCodec`] as a raw u32.
    pub compression: u32,
    /// format-specific auxiliary word 0.
    pub aux0: u32,
    /// format-specific auxiliary word 1.
    pub aux1: u32,
    /// format-specific auxiliary word 2.
    pub aux2: u32,
    /// format-specific auxiliary word 3.
    pub aux3: u32,
    /// format-specific auxiliary word 4.
    pub aux4: u32,
    /// format-specific auxiliary word 5.
    pub aux5: u32,
    /// format-specific auxiliary word 6.
    pub aux6: u32,
    /// format-specific auxiliary word 7.
    pub aux7: u32,
    /// byte offset of the stored payload within the payload region.
    pub payload_offset: u64,
    /// byte size of the stored (possibly compressed) payload.
    pub payload_size: u64,
    /// byte size of the decoded (uncompressed) payload.
    pub decoded_size: u64,
}

impl AssetRecord {
    /// a record with every field zeroed and `alias_index = INVALID_INDEX`.
    pub const fn empty() -> Self {
        Self {
            name: StringRef::EMPTY,
            relative_path: StringRef::EMPTY,
            semantic_kind: StringRef::EMPTY,
            content_role: StringRef::EMPTY,
            engine_hint: StringRef::EMPTY,
            semantic_tags: StringRef::EMPTY,
            kind: 0,
            format: 0,
            flags: 0,
            alias_index: INVALID_INDEX,
            meta0: 0,
            meta1: 0,
            meta2: 0,
            meta3: 0,
            compression: 0,
            aux0: 0,
            aux1: 0,
            aux2: 0,
            aux3: 0,
            aux4: 0,
            aux5: 0,
            aux6: 0,
            aux7: 0,
            payload_offset: 0,
            payload_size: 0,
            decoded_size: 0,
        }
    }
}
