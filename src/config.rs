use crate::error::GapError;
use gap_engine::AnalysisConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_BATCH_SIZE: usize = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub species_list: PathBuf,
    pub records: PathBuf,
    pub output: PathBuf,
    #[serde(default)]
    pub summary_json: Option<PathBuf>,
    pub analysis: AnalysisConfig,
}

impl RunConfig {
    pub fn new(
        species_list: impl Into<PathBuf>,
        records: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        analysis: AnalysisConfig,
    ) -> Self {
        Self {
            species_list: species_list.into(),
            records: records.into(),
            output: output.into(),
            summary_json: None,
            analysis,
        }
    }

    pub fn with_summary_json(mut self, path: impl Into<PathBuf>) -> Self {
        self.summary_json = Some(path.into());
        self
    }

    /// Checks everything that can be checked before any file is read.
    pub fn validate(&self) -> Result<(), GapError> {
        self.analysis.validate()?;
        if !self.species_list.is_file() {
            return Err(GapError::String(format!(
                "Species list not found: {}",
                self.species_list.display()
            )));
        }
        if !self.records.is_file() {
            return Err(GapError::String(format!(
                "Records file not found: {}",
                self.records.display()
            )));
        }
        Ok(())
    }
}

pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_validate_missing_files() {
        let analysis = AnalysisConfig::new(1, DEFAULT_BATCH_SIZE).unwrap();
        let species = NamedTempFile::new().unwrap();
        let config = RunConfig::new(species.path(), "/nonexistent/records.tsv", "out.tsv", analysis);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Records file not found"));
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let analysis = AnalysisConfig {
            workers: 0,
            batch_size: 10,
        };
        let config = RunConfig::new("a.tsv", "b.tsv", "c.tsv", analysis);
        assert!(matches!(config.validate().unwrap_err(), GapError::Engine(_)));
    }

    #[test]
    fn test_default_workers_positive() {
        assert!(default_workers() >= 1);
    }
}
