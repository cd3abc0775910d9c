//! I/O error types for arbor-io.

use std::path::PathBuf;

/// Errors from CSV loading, target conversion, and prediction output.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Returned when the input file does not exist or is unreadable.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the CSV parser encounters a malformed record.
    #[error("CSV parse error in {path} at byte offset {offset}")]
    CsvParse {
        /// Path to the CSV file.
        path: PathBuf,
        /// Byte offset where the error occurred.
        offset: u64,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when the CSV file contains a header but zero data rows.
    #[error("empty dataset (no data rows) in {path}")]
    EmptyDataset {
        /// Path to the CSV file.
        path: PathBuf,
    },

    /// Returned when a data row has a different number of columns than the header.
    #[error("inconsistent row length in {path}: row {row_index} has {got} columns, expected {expected}")]
    InconsistentRowLength {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Expected number of columns (from header).
        expected: usize,
        /// Actual number of columns in this row.
        got: usize,
    },

    /// Returned when the requested target column is not in the header.
    #[error("unknown target column \"{column}\" in {path}")]
    UnknownTargetColumn {
        /// Path to the CSV file.
        path: PathBuf,
        /// The requested column name.
        column: String,
    },

    /// Returned when a row has no value in the target column.
    #[error("missing target value in {path}: row {row_index}")]
    MissingTarget {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
    },

    /// Returned when a regression target is not a finite number.
    #[error("non-numeric regression target at row {row_index}: \"{raw}\"")]
    NonNumericTarget {
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// The raw cell text.
        raw: String,
    },

    /// Returned when the prediction report cannot be encoded.
    #[error("cannot encode prediction report")]
    Serialize {
        /// Underlying serde error.
        source: serde_json::Error,
    },

    /// Returned when an output file cannot be written.
    #[error("cannot write file {path}")]
    WriteFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the report cannot be written to standard output.
    #[error("cannot write to standard output")]
    WriteStdout {
        /// Underlying I/O error.
        source: std::io::Error,
    },
}
