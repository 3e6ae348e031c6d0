//! tr-results: run data model, output directories and export.

pub mod export;
pub mod plot;
pub mod recorder;
pub mod store;
pub mod types;

pub use export::{DirectoryExporter, ExportArtifacts, RunExporter};
pub use recorder::RunRecorder;
pub use store::{RunStore, StoredRun};
pub use types::*;

pub type ResultsResult<T> = Result<T, ResultsError>;

#[derive(thiserror::Error, Debug)]
pub enum ResultsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Plot error: {0}")]
    Plot(String),

    #[error("Run not found: {dir}")]
    RunNotFound { dir: String },
}
