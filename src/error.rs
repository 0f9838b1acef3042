use gap_engine::EngineError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GapError {
    #[error("{0}")]
    String(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(
        "'{}' is missing a required column (expected one of: {}); columns found: {}",
        file.display(),
        expected.join(", "),
        found.join(", ")
    )]
    MissingColumns {
        file: PathBuf,
        expected: Vec<String>,
        found: Vec<String>,
    },
}

impl From<String> for GapError {
    fn from(err: String) -> Self {
        GapError::String(err)
    }
}
