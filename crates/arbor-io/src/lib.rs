//! CSV dataset loading and JSON prediction output for arbor.

mod domain;
mod error;
mod reader;
mod writer;

pub use domain::Dataset;
pub use error::IoError;
pub use reader::DatasetReader;
pub use writer::PredictionWriter;
