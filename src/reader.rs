//! Consumer-side accessor contract (§6.3), test-only.
//!
//! This is not a public API (§1, §4.9): the C++ header owns the real read side. It
//! exists purely so this crate's own round-trip properties (§8) are checkable without
//! a second language in the loop.

#![cfg(test)]

use crate::{
    error::{PackError, Result},
    mesh::MeshBounds,
    types::{AssetFormat, AssetRecord, PackHeader, FLAG_HAS_BOUNDS, PACK_MAGIC, PACK_VERSION},
};
use memmap2::Mmap;
use std::{fs::File, path::Path};

/// a memory-mapped, validated view over a finished container.
pub struct PackReader {
    mmap: Mmap,
    header: PackHeader,
}

impl PackReader {
    /// maps `path` and validates the header and region bounds.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };

        if mmap.len() < std::mem::size_of::<PackHeader>() {
            return Err(PackError::InvalidContainer("file too small for header".to_string()));
        }

        let header = unsafe { std::ptr::read_unaligned(mmap.as_ptr() as *const PackHeader) };

        if header.magic != PACK_MAGIC {
            return Err(PackError::InvalidContainer("bad magic".to_string()));
        }
        if header.version != PACK_VERSION {
            return Err(PackError::InvalidContainer(format!(
                "unsupported version {}",
                header.version
            )));
        }

        let file_len = mmap.len() as u64;
        let region_end = |offset: u64, size: u64| offset.checked_add(size);
        for (offset, size, name) in [
            (header.string_table_offset, header.string_table_size, "string table"),
            (header.asset_table_offset, header.asset_table_size, "asset table"),
            (header.payload_offset, header.payload_size, "payload"),
        ] {
            let end = region_end(offset, size)
                .ok_or_else(|| PackError::InvalidContainer(format!("{name} region overflows")))?;
            if end > file_len {
                return Err(PackError::InvalidContainer(format!(
                    "{name} region extends past end of file"
                )));
            }
        }

        let record_size = std::mem::size_of::<AssetRecord>() as u64;
        if header.asset_table_size % record_size != 0 {
            return Err(PackError::InvalidContainer(
                "asset table size does not divide evenly into records".to_string(),
            ));
        }
        if header.asset_table_size / record_size != header.asset_count as u64 {
            return Err(PackError::InvalidContainer(
                "asset table size does not match asset_count".to_string(),
            ));
        }

        Ok(Self { mmap, header })
    }

    /// number of records in the asset table.
    pub fn asset_count(&self) -> u32 {
        self.header.asset_count
    }

    /// reads record `index`, bounds-checked.
    pub fn record(&self, index: u32) -> Result<AssetRecord> {
        if index >= self.header.asset_count {
            return Err(PackError::InvalidContainer(format!("record index {index} out of range")));
        }

        let record_size = std::mem::size_of::<AssetRecord>();
        let base = self.header.asset_table_offset as usize + index as usize * record_size;
        let bytes = &self.mmap[base..base + record_size];
        Ok(unsafe { std::ptr::read_unaligned(bytes.as_ptr() as *const AssetRecord) })
    }

    /// resolves a `(offset, length)` string reference into a UTF-8 view, bounds-checked
    /// against the string-table region.
    pub fn string(&self, offset: u32, length: u32) -> Result<&str> {
        let table_start = self.header.string_table_offset as usize;
        let table_end = table_start + self.header.string_table_size as usize;
        let start = table_start + offset as usize;
        let end = start
            .checked_add(length as usize)
            .ok_or_else(|| PackError::InvalidContainer("string reference overflows".to_string()))?;

        if start < table_start || end > table_end {
            return Err(PackError::InvalidContainer(
                "string reference escapes the string table region".to_string(),
            ));
        }

        std::str::from_utf8(&self.mmap[start..end])
            .map_err(|_| PackError::InvalidContainer("string reference is not valid UTF-8".to_string()))
    }

    /// resolves a record's stored payload bytes, bounds-checked against the payload region.
    pub fn payload(&self, record: &AssetRecord) -> Result<&[u8]> {
        let region_start = self.header.payload_offset as usize;
        let region_end = region_start + self.header.payload_size as usize;
        let start = region_start + record.payload_offset as usize;
        let end = start
            .checked_add(record.payload_size as usize)
            .ok_or_else(|| PackError::InvalidContainer("payload reference overflows".to_string()))?;

        if start < region_start || end > region_end {
            return Err(PackError::InvalidContainer(
                "payload reference escapes the payload region".to_string(),
            ));
        }

        Ok(&self.mmap[start..end])
    }

    /// mesh bounds, populated only when `format == MeshPnuvF32U32` and `FLAG_HAS_BOUNDS` is set.
    pub fn mesh_bounds(&self, record: &AssetRecord) -> Option<MeshBounds> {
        if record.format != AssetFormat::MeshPnuvF32U32 as u32 {
            return None;
        }
        if record.flags & FLAG_HAS_BOUNDS == 0 {
            return None;
        }

        Some(MeshBounds {
            min: [
                f32::from_bits(record.aux0),
                f32::from_bits(record.aux1),
                f32::from_bits(record.aux2),
            ],
            max: [
                f32::from_bits(record.aux3),
                f32::from_bits(record.aux4),
                f32::from_bits(record.aux5),
            ],
            radius: f32::from_bits(record.aux6),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::check;
    use crate::{builder::PackBuilder, manifest::AssetRow};

    fn row(name: &str, path: &str, kind: &str) -> AssetRow {
        AssetRow {
            name: name.to_string(),
            relative_path: path.to_string(),
            semantic_kind: kind.to_string(),
            content_role: "prop".to_string(),
            engine_hint: "generic".to_string(),
            semantic_tags: "tag".to_string(),
        }
    }

    #[test]
    fn round_trips_strings_and_mesh_bounds() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join("cube.obj"),
            b"v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n",
        )
        .expect("write");

        let rows = vec![row("Cube", "cube.obj", "mesh")];
        let out = dir.path().join("out.gbpk");
        PackBuilder::new(dir.path(), &out)
            .build(&rows, 1, 1, &|_, _, _| {})
            .expect("build");

        let reader = PackReader::open(&out).expect("open");
        check!(reader.asset_count() == 1);

        let record = reader.record(0).expect("record");
        let name = reader.string(record.name.offset, record.name.length).expect("name");
        check!(name == "Cube");

        let bounds = reader.mesh_bounds(&record).expect("bounds");
        check!(bounds.min == [0.0, 0.0, 0.0]);
    }

    #[test]
    fn rejects_bad_magic() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bad.gbpk");
        std::fs::write(&path, vec![0u8; 64]).expect("write");

        check!(PackReader::open(&path).is_err());
    }
}
