//! Pack assembler: bounded parallel conversion, strict-order finalization, container write
//! (§4.7, §4.8, §5, §6.2).

use crate::{
    alias,
    convert::{self, ConversionResult},
    error::{PackError, Result},
    interner::StringInterner,
    manifest::AssetRow,
    types::{
        AssetRecord, FLAG_ALIAS, FLAG_CONVERSION_FAILED, FLAG_HAS_BOUNDS, PackHeader,
        INVALID_INDEX, PACK_MAGIC, PACK_VERSION,
    },
};
use hashbrown::HashMap;
use std::{
    io::{Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;

/// which of the three build stages a progress callback invocation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStage {
    /// converting and finalizing manifest rows.
    Records,
    /// post-pass alias chain flattening.
    Aliases,
    /// streaming the final container to disk.
    Write,
}

/// progress callback: `(stage, completed, total)`.
pub type ProgressFn<'a> = dyn Fn(BuildStage, u64, u64) + Sync + 'a;

/// counts describing a finished build, for CLI summary output.
#[derive(Debug, Clone, Copy)]
pub struct BuildSummary {
    /// total records written (== manifest row count).
    pub asset_count: usize,
    /// records carrying `FLAG_ALIAS` after flattening.
    pub alias_count: usize,
    /// records carrying `FLAG_CONVERSION_FAILED`.
    pub failed_count: usize,
    /// total bytes in the payload region.
    pub payload_size: u64,
}

type DedupKey = (u32, [u8; 16], [u32; 4], [u32; 8]);

fn dedup_key(result: &ConversionResult) -> DedupKey {
    (result.format as u32, result.digest, result.meta, result.aux)
}

/// drives a manifest through conversion and writes the finished container.
pub struct PackBuilder {
    source_root: PathBuf,
    output_path: PathBuf,
}

impl PackBuilder {
    /// `source_root` is resolved against each row's `relative_path`; the container is
    /// written to `output_path` only once fully assembled.
    pub fn new(source_root: impl Into<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            output_path: output_path.into(),
        }
    }

    /// runs the full pipeline: alias planning, bounded parallel conversion, ordered
    /// finalization, alias flattening, and container write.
    pub fn build(
        &self,
        rows: &[AssetRow],
        workers: usize,
        in_flight: usize,
        progress: &ProgressFn<'_>,
    ) -> Result<BuildSummary> {
        let workers = workers.max(1);
        let in_flight = in_flight.max(1);

        let relative_paths: Vec<String> = rows.iter().map(|r| r.relative_path.clone()).collect();
        let alias_map = alias::plan_aliases(&relative_paths);

        let mut interner = StringInterner::new();
        let mut records: Vec<AssetRecord> = Vec::with_capacity(rows.len());

        for row in rows {
            let mut rec = AssetRecord::empty();
            rec.name = interner.intern(&row.name);
            rec.relative_path = interner.intern(&row.relative_path);
            rec.semantic_kind = interner.intern(&row.semantic_kind);
            rec.content_role = interner.intern(&row.content_role);
            rec.engine_hint = interner.intern(&row.engine_hint);
            rec.semantic_tags = interner.intern(&row.semantic_tags);
            records.push(rec);
        }

        for (&alias_idx, &canonical_idx) in &alias_map {
            records[alias_idx].alias_index = canonical_idx as u32;
            records[alias_idx].flags |= FLAG_ALIAS;
        }

        let work_indices: Vec<usize> = (0..rows.len()).filter(|i| !alias_map.contains_key(i)).collect();
        let total_work = work_indices.len() as u64;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| PackError::Worker(e.to_string()))?;

        let (tx, rx) = std::sync::mpsc::sync_channel::<(usize, std::io::Result<ConversionResult>)>(in_flight);

        // The channel's bounded capacity is the in-flight budget (§5): once `in_flight`
        // results are queued awaiting finalization, producer threads block on `send`
        // until the finalizer below drains one. Production runs on its own thread so the
        // finalizer can start draining concurrently rather than after all work submits.
        let source_root = self.source_root.clone();
        let owned_rows: Vec<AssetRow> = rows.to_vec();
        let producer_indices = work_indices.clone();
        let producer = std::thread::spawn(move || {
            pool.scope(|scope| {
                for &idx in &producer_indices {
                    let tx = tx.clone();
                    let source_root = source_root.clone();
                    let row = owned_rows[idx].clone();
                    scope.spawn(move |_| {
                        let result = convert::convert_row(&row, &source_root);
                        let _ = tx.send((idx, result));
                    });
                }
            });
        });

        let mut dedup: HashMap<DedupKey, usize> = HashMap::new();
        let mut pending: HashMap<usize, ConversionResult> = HashMap::new();
        let mut payload_temp = NamedTempFile::new()?;
        let mut payload_tail: u64 = 0;

        for (completed, &expected) in work_indices.iter().enumerate() {
            let result = if let Some(r) = pending.remove(&expected) {
                r
            } else {
                loop {
                    let (idx, res) = rx
                        .recv()
                        .map_err(|_| PackError::Worker("worker channel closed early".to_string()))?;
                    let res = res?;
                    if idx == expected {
                        break res;
                    }
                    pending.insert(idx, res);
                }
            };

            finalize_record(
                expected,
                result,
                &mut records,
                &mut dedup,
                &mut payload_temp,
                &mut payload_tail,
            )?;

            progress(BuildStage::Records, completed as u64 + 1, total_work);
        }

        producer
            .join()
            .map_err(|_| PackError::Worker("conversion worker thread panicked".to_string()))?;

        flatten_aliases(&mut records, progress);

        let asset_count = records.len();
        let alias_count = records.iter().filter(|r| r.flags & FLAG_ALIAS != 0).count();
        let failed_count = records
            .iter()
            .filter(|r| r.flags & FLAG_CONVERSION_FAILED != 0)
            .count();

        write_container(
            &self.output_path,
            &interner,
            &records,
            &mut payload_temp,
            payload_tail,
            progress,
        )?;

        Ok(BuildSummary {
            asset_count,
            alias_count,
            failed_count,
            payload_size: payload_tail,
        })
    }
}

/// applies §4.8's finalization discipline to one converted row.
fn finalize_record(
    row_index: usize,
    result: ConversionResult,
    records: &mut [AssetRecord],
    dedup: &mut HashMap<DedupKey, usize>,
    payload_temp: &mut NamedTempFile,
    payload_tail: &mut u64,
) -> Result<()> {
    let key = dedup_key(&result);

    if let Some(&canonical_index) = dedup.get(&key) {
        let canonical = records[canonical_index];
        let rec = &mut records[row_index];
        rec.kind = canonical.kind;
        rec.format = canonical.format;
        rec.meta0 = canonical.meta0;
        rec.meta1 = canonical.meta1;
        rec.meta2 = canonical.meta2;
        rec.meta3 = canonical.meta3;
        rec.compression = canonical.compression;
        rec.aux0 = canonical.aux0;
        rec.aux1 = canonical.aux1;
        rec.aux2 = canonical.aux2;
        rec.aux3 = canonical.aux3;
        rec.aux4 = canonical.aux4;
        rec.aux5 = canonical.aux5;
        rec.aux6 = canonical.aux6;
        rec.aux7 = canonical.aux7;
        rec.payload_offset = canonical.payload_offset;
        rec.payload_size = canonical.payload_size;
        rec.decoded_size = canonical.decoded_size;
        rec.alias_index = canonical_index as u32;
        rec.flags |= FLAG_ALIAS | (canonical.flags & FLAG_HAS_BOUNDS) | (result.flags & FLAG_CONVERSION_FAILED);
        return Ok(());
    }

    let offset = *payload_tail;
    payload_temp.write_all(&result.stored_bytes)?;
    *payload_tail = payload_tail
        .checked_add(result.stored_bytes.len() as u64)
        .ok_or_else(|| PackError::Other("payload region overflowed u64".to_string()))?;

    dedup.insert(key, row_index);

    let rec = &mut records[row_index];
    rec.kind = result.kind as u32;
    rec.format = result.format as u32;
    rec.meta0 = result.meta[0];
    rec.meta1 = result.meta[1];
    rec.meta2 = result.meta[2];
    rec.meta3 = result.meta[3];
    rec.compression = result.compression as u32;
    rec.aux0 = result.aux[0];
    rec.aux1 = result.aux[1];
    rec.aux2 = result.aux[2];
    rec.aux3 = result.aux[3];
    rec.aux4 = result.aux[4];
    rec.aux5 = result.aux[5];
    rec.aux6 = result.aux[6];
    rec.aux7 = result.aux[7];
    rec.payload_offset = offset;
    rec.payload_size = result.stored_bytes.len() as u64;
    rec.decoded_size = result.decoded_size;
    rec.flags |= result.flags;

    Ok(())
}

/// walks each alias chain (cycle-guarded) to its root and mirrors the root's payload.
fn flatten_aliases(records: &mut [AssetRecord], progress: &ProgressFn<'_>) {
    let total = records.len() as u64;

    for i in 0..records.len() {
        if records[i].alias_index == INVALID_INDEX {
            progress(BuildStage::Aliases, i as u64 + 1, total);
            continue;
        }

        let mut current = i;
        let mut visited = hashbrown::HashSet::new();
        while records[current].alias_index != INVALID_INDEX {
            if !visited.insert(current) {
                break; // cycle guard: leave as-is rather than loop forever.
            }
            current = records[current].alias_index as usize;
        }

        let root = records[current];
        let rec = &mut records[i];
        rec.kind = root.kind;
        rec.format = root.format;
        rec.meta0 = root.meta0;
        rec.meta1 = root.meta1;
        rec.meta2 = root.meta2;
        rec.meta3 = root.meta3;
        rec.compression = root.compression;
        rec.aux0 = root.aux0;
        rec.aux1 = root.aux1;
        rec.aux2 = root.aux2;
        rec.aux3 = root.aux3;
        rec.aux4 = root.aux4;
        rec.aux5 = root.aux5;
        rec.aux6 = root.aux6;
        rec.aux7 = root.aux7;
        rec.payload_offset = root.payload_offset;
        rec.payload_size = root.payload_size;
        rec.decoded_size = root.decoded_size;
        rec.alias_index = current as u32;
        rec.flags |= FLAG_ALIAS | (root.flags & FLAG_HAS_BOUNDS);

        progress(BuildStage::Aliases, i as u64 + 1, total);
    }
}

/// writes `struct` as raw little-endian bytes. Safe because every type passed here is
/// `#[repr(C, packed)]` with only integer fields.
unsafe fn write_struct<T: Copy, W: Write>(writer: &mut W, value: &T) -> std::io::Result<()> {
    let ptr = value as *const T as *const u8;
    let bytes = std::slice::from_raw_parts(ptr, std::mem::size_of::<T>());
    writer.write_all(bytes)
}

fn write_container(
    output_path: &Path,
    interner: &StringInterner,
    records: &[AssetRecord],
    payload_temp: &mut NamedTempFile,
    payload_size: u64,
    progress: &ProgressFn<'_>,
) -> Result<()> {
    let dir = output_path.parent().unwrap_or_else(|| Path::new("."));
    let mut out = NamedTempFile::new_in(dir)?;

    let header_size = std::mem::size_of::<PackHeader>() as u64;
    let string_table_offset = header_size;
    let string_table_size = interner.len() as u64;
    let asset_table_offset = string_table_offset + string_table_size;
    let asset_table_size = (records.len() * std::mem::size_of::<AssetRecord>()) as u64;
    let payload_offset = asset_table_offset + asset_table_size;

    let header = PackHeader {
        magic: PACK_MAGIC,
        version: PACK_VERSION,
        flags: 0,
        asset_count: records.len() as u32,
        reserved: 0,
        string_table_offset,
        string_table_size,
        asset_table_offset,
        asset_table_size,
        payload_offset,
        payload_size,
    };

    let total_steps = 4 + records.len() as u64;
    let mut step = 0u64;

    unsafe { write_struct(&mut out, &header)? };
    step += 1;
    progress(BuildStage::Write, step, total_steps);

    out.write_all(interner.as_bytes())?;
    step += 1;
    progress(BuildStage::Write, step, total_steps);

    for record in records {
        unsafe { write_struct(&mut out, record)? };
        step += 1;
        progress(BuildStage::Write, step, total_steps);
    }

    payload_temp.as_file_mut().seek(SeekFrom::Start(0))?;
    let mut buf = [0u8; 1 << 20];
    loop {
        let n = payload_temp.as_file_mut().read(&mut buf)?;
        if n == 0 {
            break;
        }
        out.write_all(&buf[..n])?;
    }
    step += 1;
    progress(BuildStage::Write, step, total_steps);

    out.as_file_mut().flush()?;
    out.as_file_mut().sync_all()?;
    out.persist(output_path)
        .map_err(|e| PackError::Io(e.error))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::check;

    fn row(name: &str, path: &str, kind: &str) -> AssetRow {
        AssetRow {
            name: name.to_string(),
            relative_path: path.to_string(),
            semantic_kind: kind.to_string(),
            content_role: "prop".to_string(),
            engine_hint: "generic".to_string(),
            semantic_tags: "".to_string(),
        }
    }

    fn noop_progress(_: BuildStage, _: u64, _: u64) {}

    #[test]
    fn alias_family_shares_payload_coordinates() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join("cube.obj"),
            b"v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n",
        )
        .expect("write obj");
        std::fs::write(dir.path().join("cube.fbx"), b"not a real fbx").expect("write fbx");

        let rows = vec![row("Cube", "cube.obj", "mesh"), row("Cube", "cube.fbx", "mesh")];
        let out = dir.path().join("out.gbpk");
        let builder = PackBuilder::new(dir.path(), &out);

        let summary = builder.build(&rows, 2, 4, &noop_progress).expect("build");
        check!(summary.asset_count == 2);
        check!(summary.alias_count == 1);

        let bytes = std::fs::read(&out).expect("read output");
        check!(bytes.len() > std::mem::size_of::<PackHeader>());
    }

    #[test]
    fn content_dedup_collapses_identical_payloads() {
        let dir = tempfile::tempdir().expect("tempdir");
        let obj_bytes: &[u8] = b"v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
        std::fs::write(dir.path().join("a.obj"), obj_bytes).expect("write a");
        std::fs::write(dir.path().join("b.obj"), obj_bytes).expect("write b");

        let rows = vec![row("A", "a.obj", "mesh"), row("B", "b.obj", "mesh")];
        let out = dir.path().join("out.gbpk");
        let builder = PackBuilder::new(dir.path(), &out);

        let summary = builder.build(&rows, 1, 1, &noop_progress).expect("build");
        check!(summary.alias_count == 1);
    }

    #[test]
    fn determinism_across_worker_counts() {
        let dir = tempfile::tempdir().expect("tempdir");
        for i in 0..6 {
            std::fs::write(
                dir.path().join(format!("m{i}.obj")),
                format!("v 0 0 0\nv {i} 0 0\nv 0 1 0\nf 1 2 3\n"),
            )
            .expect("write");
        }
        let rows: Vec<AssetRow> = (0..6)
            .map(|i| row(&format!("M{i}"), &format!("m{i}.obj"), "mesh"))
            .collect();

        let out1 = dir.path().join("out1.gbpk");
        PackBuilder::new(dir.path(), &out1)
            .build(&rows, 1, 1, &noop_progress)
            .expect("build 1 worker");

        let out2 = dir.path().join("out2.gbpk");
        PackBuilder::new(dir.path(), &out2)
            .build(&rows, 4, 8, &noop_progress)
            .expect("build 4 workers");

        let bytes1 = std::fs::read(&out1).expect("read 1");
        let bytes2 = std::fs::read(&out2).expect("read 2");
        check!(bytes1 == bytes2);
    }
}
