//! gbpack
//!
//! Builds a single self-describing binary pack ("GBPK" container) from a manifest of
//! game-asset files: decodes each file into a canonical form by media kind, deduplicates
//! identical payloads, resolves cross-format alias families, and writes the result in
//! strict deterministic order.

pub mod alias;
pub mod audio;
pub mod builder;
pub mod compressor;
pub mod convert;
pub mod error;
pub mod interner;
pub mod manifest;
pub mod mesh;
pub mod raster;
#[cfg(test)]
pub mod reader;
pub mod types;

pub use error::{PackError, Result};

/// re-exports the types most consumers of this crate reach for.
pub mod prelude {
    pub use crate::alias::plan_aliases;
    pub use crate::builder::{BuildStage, BuildSummary, PackBuilder, ProgressFn};
    pub use crate::convert::{convert_row, ConversionResult};
    pub use crate::error::{PackError, Result};
    pub use crate::interner::StringInterner;
    pub use crate::manifest::{read_rows, AssetRow};
    pub use crate::types::{
        AssetFormat, AssetKind, AssetRecord, CompressionCodec, PackHeader, StringRef,
        FLAG_ALIAS, FLAG_CONVERSION_FAILED, FLAG_HAS_BOUNDS, INVALID_INDEX, PACK_MAGIC,
        PACK_VERSION,
    };
}
