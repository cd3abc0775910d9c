//! Headered CSV reader with per-cell type inference.

use std::path::{Path, PathBuf};

use arbor_tree::FeatureValue;
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::Dataset;

/// Cell tokens read as a missing value.
const MISSING_TOKENS: [&str; 4] = ["", "NA", "?", "NaN"];

/// Which column holds the target.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Last,
    Named(String),
    Absent,
}

/// Reads a tabular dataset from a CSV file.
///
/// Expected CSV format:
/// - Header row required, one name per column
/// - One sample per row, all rows with the same number of columns
/// - `""`, `NA`, `?` and `NaN` are missing; cells that parse as finite
///   numbers are numeric; anything else is a category token
///
/// The target column (by default the last one) is split off as raw text.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::EmptyDataset`] | Zero data rows after header |
/// | [`IoError::InconsistentRowLength`] | Row has different column count than header |
/// | [`IoError::UnknownTargetColumn`] | Named target is not in the header |
/// | [`IoError::MissingTarget`] | A row's target cell is a missing token |
pub struct DatasetReader {
    path: PathBuf,
    target: Target,
}

impl DatasetReader {
    /// Create a reader for the given CSV file, targeting the last column.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            target: Target::Last,
        }
    }

    /// Use the named column as the target.
    #[must_use]
    pub fn with_target(mut self, column: impl Into<String>) -> Self {
        self.target = Target::Named(column.into());
        self
    }

    /// Read every column as a feature, with no target.
    #[must_use]
    pub fn without_target(mut self) -> Self {
        self.target = Target::Absent;
        self
    }

    /// Read and validate the CSV file, returning a [`Dataset`].
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<Dataset, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) so short rows surface as InconsistentRowLength.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let header = rdr.headers().map_err(|e| self.parse_error(e))?.clone();
        let expected_cols = header.len();
        let target_index = self.target_index(&header)?;
        debug!(expected_cols, ?target_index, "read CSV header");

        let feature_names: Vec<String> = header
            .iter()
            .enumerate()
            .filter(|&(i, _)| Some(i) != target_index)
            .map(|(_, name)| name.trim().to_string())
            .collect();

        let mut features = Vec::new();
        let mut targets = Vec::new();
        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| self.parse_error(e))?;
            if record.len() != expected_cols {
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    expected: expected_cols,
                    got: record.len(),
                });
            }

            let mut row = Vec::with_capacity(feature_names.len());
            for (col_index, raw) in record.iter().enumerate() {
                if Some(col_index) == target_index {
                    if is_missing(raw) {
                        return Err(IoError::MissingTarget {
                            path: self.path.clone(),
                            row_index,
                        });
                    }
                    targets.push(raw.trim().to_string());
                } else {
                    row.push(parse_cell(raw));
                }
            }
            features.push(row);
        }

        if features.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }

        info!(
            n_samples = features.len(),
            n_features = feature_names.len(),
            target = target_index.map(|i| &header[i]),
            "dataset loaded"
        );

        let target_name = target_index.map(|i| header[i].trim().to_string());
        Ok(Dataset::new(feature_names, features, target_name, targets))
    }

    fn target_index(&self, header: &csv::StringRecord) -> Result<Option<usize>, IoError> {
        match &self.target {
            Target::Absent => Ok(None),
            Target::Last => Ok(header.len().checked_sub(1)),
            Target::Named(column) => header
                .iter()
                .position(|name| name.trim() == column)
                .map(Some)
                .ok_or_else(|| IoError::UnknownTargetColumn {
                    path: self.path.clone(),
                    column: column.clone(),
                }),
        }
    }

    fn parse_error(&self, e: csv::Error) -> IoError {
        IoError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        }
    }
}

fn is_missing(raw: &str) -> bool {
    MISSING_TOKENS.contains(&raw.trim())
}

fn parse_cell(raw: &str) -> FeatureValue {
    if is_missing(raw) {
        return FeatureValue::Missing;
    }
    let token = raw.trim();
    match token.parse::<f64>() {
        Ok(v) if v.is_finite() => FeatureValue::Numeric(v),
        _ => FeatureValue::Category(token.to_string()),
    }
}
