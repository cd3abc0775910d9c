//! JSON prediction writer.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use arbor_tree::Label;
use serde::Serialize;
use tracing::{info, instrument};

use crate::IoError;

/// Where a report goes.
#[derive(Debug, Clone)]
enum Sink {
    File(PathBuf),
    Stdout,
}

/// Writes predictions as a pretty-printed JSON document.
///
/// Classification reports carry the predicted labels, the class order and,
/// when given, one probability row per sample. Regression reports carry the
/// predicted values. Rows appear in input order.
pub struct PredictionWriter {
    sink: Sink,
}

impl PredictionWriter {
    /// Write reports to the given file, replacing it if present.
    pub fn to_file(path: &Path) -> Self {
        Self {
            sink: Sink::File(path.to_path_buf()),
        }
    }

    /// Write reports to standard output.
    pub fn stdout() -> Self {
        Self { sink: Sink::Stdout }
    }

    /// Write a classification report.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::Serialize`] | The report cannot be encoded |
    /// | [`IoError::WriteFile`] | The output file cannot be written |
    /// | [`IoError::WriteStdout`] | Standard output is closed |
    #[instrument(skip_all, fields(n_samples = predictions.len()))]
    pub fn write_classification(
        &self,
        model_type: &str,
        predictions: &[Label],
        classes: &[Label],
        probabilities: Option<&[Vec<f64>]>,
    ) -> Result<(), IoError> {
        let artifact = ClassificationArtifact {
            model_type,
            n_samples: predictions.len(),
            classes,
            predictions,
            probabilities,
        };
        self.emit(&artifact)
    }

    /// Write a regression report.
    ///
    /// # Errors
    ///
    /// Same as [`PredictionWriter::write_classification`].
    #[instrument(skip_all, fields(n_samples = predictions.len()))]
    pub fn write_regression(&self, model_type: &str, predictions: &[f64]) -> Result<(), IoError> {
        let artifact = RegressionArtifact {
            model_type,
            n_samples: predictions.len(),
            predictions,
        };
        self.emit(&artifact)
    }

    fn emit(&self, artifact: &impl Serialize) -> Result<(), IoError> {
        let json =
            serde_json::to_string_pretty(artifact).map_err(|e| IoError::Serialize { source: e })?;
        match &self.sink {
            Sink::File(path) => {
                fs::write(path, &json).map_err(|e| IoError::WriteFile {
                    path: path.clone(),
                    source: e,
                })?;
                info!(path = %path.display(), "predictions written");
            }
            Sink::Stdout => {
                let mut out = std::io::stdout().lock();
                writeln!(out, "{json}").map_err(|e| IoError::WriteStdout { source: e })?;
            }
        }
        Ok(())
    }
}

// --- Shadow structs for JSON serialization ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ClassificationArtifact<'a> {
    model_type: &'a str,
    n_samples: usize,
    classes: &'a [Label],
    predictions: &'a [Label],
    #[serde(skip_serializing_if = "Option::is_none")]
    probabilities: Option<&'a [Vec<f64>]>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegressionArtifact<'a> {
    model_type: &'a str,
    n_samples: usize,
    predictions: &'a [f64],
}
