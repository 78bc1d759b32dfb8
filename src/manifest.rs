//! Manifest TSV parsing (§6.1).

use crate::error::{PackError, Result};
use hashbrown::HashMap;
use std::path::Path;

const REQUIRED_COLUMNS: &[&str] = &[
    "asset_name",
    "asset_relative_path",
    "semantic_kind",
    "content_role",
    "engine_hint",
    "semantic_tags",
];

/// one manifest row, six UTF-8 fields (§3).
#[derive(Debug, Clone)]
pub struct AssetRow {
    /// `asset_name` column.
    pub name: String,
    /// `asset_relative_path` column, the lookup key against the source root.
    pub relative_path: String,
    /// `semantic_kind` column; drives the fallback media category.
    pub semantic_kind: String,
    /// `content_role` column.
    pub content_role: String,
    /// `engine_hint` column.
    pub engine_hint: String,
    /// `semantic_tags` column.
    pub semantic_tags: String,
}

/// reads and parses a tab-separated manifest file.
///
/// The header line's column order is irrelevant; extra columns are ignored; a
/// missing required column is fatal.
pub fn read_rows(path: &Path) -> Result<Vec<AssetRow>> {
    let content = std::fs::read_to_string(path)?;
    let mut lines = content.lines();

    let header = lines
        .next()
        .ok_or_else(|| PackError::MissingColumns("manifest is empty".to_string()))?;
    let columns: Vec<&str> = header.split('\t').collect();

    let mut index_of: HashMap<&str, usize> = HashMap::new();
    for (i, col) in columns.iter().enumerate() {
        index_of.insert(*col, i);
    }

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| !index_of.contains_key(*c))
        .copied()
        .collect();
    if !missing.is_empty() {
        return Err(PackError::MissingColumns(missing.join(", ")));
    }

    let col = |name: &str| index_of[name];
    let name_idx = col("asset_name");
    let path_idx = col("asset_relative_path");
    let kind_idx = col("semantic_kind");
    let role_idx = col("content_role");
    let hint_idx = col("engine_hint");
    let tags_idx = col("semantic_tags");

    let expected = columns.len();
    let mut rows = Vec::new();

    for (i, line) in lines.enumerate() {
        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != expected {
            return Err(PackError::MalformedRow {
                row: i,
                expected,
                found: fields.len(),
            });
        }

        rows.push(AssetRow {
            name: fields[name_idx].to_string(),
            relative_path: fields[path_idx].to_string(),
            semantic_kind: fields[kind_idx].to_string(),
            content_role: fields[role_idx].to_string(),
            engine_hint: fields[hint_idx].to_string(),
            semantic_tags: fields[tags_idx].to_string(),
        });
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::{check, let_assert};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_manifest(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(contents.as_bytes()).expect("write");
        file
    }

    #[test]
    fn parses_rows_regardless_of_column_order() {
        let file = write_manifest(
            "content_role\tasset_relative_path\tasset_name\tsemantic_kind\tengine_hint\tsemantic_tags\n\
             prop\tm/cube.obj\tCube\tmesh\tgeneric\tprops,cube\n",
        );

        let rows = read_rows(file.path()).expect("parse");
        check!(rows.len() == 1);
        check!(rows[0].name == "Cube");
        check!(rows[0].relative_path == "m/cube.obj");
        check!(rows[0].semantic_kind == "mesh");
    }

    #[test]
    fn ignores_extra_columns() {
        let file = write_manifest(
            "asset_name\tasset_relative_path\tsemantic_kind\tcontent_role\tengine_hint\tsemantic_tags\textra\n\
             Cube\tm/cube.obj\tmesh\tprop\tgeneric\tprops\tjunk\n",
        );

        let rows = read_rows(file.path()).expect("parse");
        check!(rows.len() == 1);
    }

    #[test]
    fn missing_required_column_is_fatal() {
        let file = write_manifest("asset_name\tasset_relative_path\n Cube\tm/cube.obj\n");

        let_assert!(Err(PackError::MissingColumns(msg)) = read_rows(file.path()));
        check!(msg.contains("semantic_kind"));
    }
}
