use thiserror::Error;

/// fatal errors that abort the whole build. Per-row decode failures never reach this type;
/// they are absorbed into record flags (see `convert`).
#[derive(Debug, Error)]
pub enum PackError {
    /// I/O error reading the manifest, a source file, or writing the container.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// the manifest TSV is missing one or more required columns.
    #[error("manifest is missing required column(s): {0}")]
    MissingColumns(String),

    /// a manifest row could not be split into the expected number of tab-separated fields.
    #[error("malformed manifest row {row}: expected {expected} columns, found {found}")]
    MalformedRow {
        /// 0-based row index, excluding the header line.
        row: usize,
        /// number of columns the header declared.
        expected: usize,
        /// number of columns actually present.
        found: usize,
    },

    /// a worker thread reported an error unrelated to per-row decoding (e.g. a thread pool fault).
    #[error("worker pool error: {0}")]
    Worker(String),

    /// the container file failed validation on read-back (test-only reader).
    #[error("invalid pack container: {0}")]
    InvalidContainer(String),

    /// anything else, carrying a human-readable message.
    #[error("{0}")]
    Other(String),
}

impl From<String> for PackError {
    fn from(value: String) -> Self {
        Self::Other(value)
    }
}

/// crate-wide result alias.
pub type Result<T> = std::result::Result<T, PackError>;
