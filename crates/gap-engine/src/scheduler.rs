use crate::error::{EngineError, ErrorCode};
use crate::grade::{grade, BagsGrade, NamesObserved, SpeciesStatus};
use crate::index::RecordIndex;
use crate::resolve::{detect_conflicts, resolve, ConflictGroup};
use crate::taxon::Taxon;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Worker count and batch size for one analysis run. Both must be at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub workers: usize,
    pub batch_size: usize,
}

impl AnalysisConfig {
    pub fn new(workers: usize, batch_size: usize) -> Result<Self, EngineError> {
        let ret = Self {
            workers,
            batch_size,
        };
        ret.validate()?;
        Ok(ret)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.workers == 0 {
            return Err(EngineError::invalid_config("workers must be at least 1"));
        }
        if self.batch_size == 0 {
            return Err(EngineError::invalid_config("batch_size must be at least 1"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub row_index: usize,
    pub number_records: usize,
    pub cluster_count: usize,
    pub bags_grade: BagsGrade,
    pub species_status: SpeciesStatus,
    pub other_names: Vec<ConflictGroup>,
}

impl AnalysisResult {
    pub fn has_conflict(&self) -> bool {
        !self.other_names.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaxonOutcome {
    Resolved(AnalysisResult),
    Unresolved { row_index: usize, reason: String },
}

impl TaxonOutcome {
    pub fn row_index(&self) -> usize {
        match self {
            TaxonOutcome::Resolved(result) => result.row_index,
            TaxonOutcome::Unresolved { row_index, .. } => *row_index,
        }
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        match self {
            TaxonOutcome::Resolved(result) => Some(result),
            TaxonOutcome::Unresolved { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchFailure {
    pub batch_index: usize,
    pub first_row: usize,
    pub last_row: usize,
    pub error: EngineError,
}

/// Outcomes in input order, one per taxon, plus the batches that failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub outcomes: Vec<TaxonOutcome>,
    pub failures: Vec<BatchFailure>,
}

impl AnalysisReport {
    pub fn resolved(&self) -> impl Iterator<Item = &AnalysisResult> {
        self.outcomes.iter().filter_map(TaxonOutcome::result)
    }

    pub fn unresolved_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, TaxonOutcome::Unresolved { .. }))
            .count()
    }
}

/// Resolver, conflict detector and grader for a single taxon.
pub fn analyze_taxon(taxon: &Taxon, index: &RecordIndex) -> Result<AnalysisResult, EngineError> {
    let name_set = taxon.name_set()?;
    let resolution = resolve(&name_set, index);

    if !resolution.has_records() {
        let grading = grade(0, 0, false, NamesObserved::default());
        return Ok(AnalysisResult {
            row_index: taxon.row_index,
            number_records: 0,
            cluster_count: 0,
            bags_grade: grading.grade,
            species_status: grading.status,
            other_names: vec![],
        });
    }

    let other_names = detect_conflicts(&resolution.touched_clusters, &name_set, index);
    let valid = taxon.normalized_valid_name();
    let observed = NamesObserved {
        valid: resolution.names_observed.contains(&valid),
        synonym: resolution.names_observed.iter().any(|n| *n != valid),
    };
    let grading = grade(
        resolution.number_records,
        resolution.touched_clusters.len(),
        !other_names.is_empty(),
        observed,
    );
    Ok(AnalysisResult {
        row_index: taxon.row_index,
        number_records: resolution.number_records,
        cluster_count: resolution.touched_clusters.len(),
        bags_grade: grading.grade,
        species_status: grading.status,
        other_names,
    })
}

pub fn analyze_all(
    taxa: &[Taxon],
    index: &RecordIndex,
    config: &AnalysisConfig,
) -> Result<AnalysisReport, EngineError> {
    run_batches(taxa, config, |taxon| analyze_taxon(taxon, index))
}

type BatchResults = Vec<(usize, Result<AnalysisResult, EngineError>)>;

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Splits `taxa` into contiguous batches, runs `analyze` over them on a pool
/// of `config.workers` threads and reassembles the outcomes by batch index.
/// A batch that panics only marks its own taxa as unresolved.
pub fn run_batches<F>(
    taxa: &[Taxon],
    config: &AnalysisConfig,
    analyze: F,
) -> Result<AnalysisReport, EngineError>
where
    F: Fn(&Taxon) -> Result<AnalysisResult, EngineError> + Sync,
{
    config.validate()?;
    let start = Instant::now();
    let batch_count = taxa.len().div_ceil(config.batch_size);
    info!(
        "Analyzing {} taxa in {} batches of up to {} using {} workers",
        taxa.len(),
        batch_count,
        config.batch_size,
        config.workers
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.workers)
        .build()
        .map_err(|e| EngineError::new(ErrorCode::Internal, format!("Could not start worker pool: {e}")))?;

    let mut batches: Vec<(usize, &[Taxon], std::thread::Result<BatchResults>)> = pool.install(|| {
        taxa.par_chunks(config.batch_size)
            .enumerate()
            .map(|(batch_index, chunk)| {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    chunk
                        .iter()
                        .map(|taxon| (taxon.row_index, analyze(taxon)))
                        .collect::<BatchResults>()
                }));
                debug!("Finished batch {batch_index} ({} taxa)", chunk.len());
                (batch_index, chunk, outcome)
            })
            .collect()
    });
    batches.sort_by_key(|(batch_index, _, _)| *batch_index);

    let mut report = AnalysisReport {
        outcomes: Vec::with_capacity(taxa.len()),
        failures: vec![],
    };
    for (batch_index, chunk, outcome) in batches {
        match outcome {
            Ok(results) => {
                for (row_index, result) in results {
                    report.outcomes.push(match result {
                        Ok(result) => TaxonOutcome::Resolved(result),
                        Err(e) => {
                            warn!("Taxon at data row {row_index} unresolved: {e}");
                            TaxonOutcome::Unresolved {
                                row_index,
                                reason: e.to_string(),
                            }
                        }
                    });
                }
            }
            Err(payload) => {
                let first_row = chunk.first().map(|t| t.row_index).unwrap_or_default();
                let last_row = chunk.last().map(|t| t.row_index).unwrap_or_default();
                let error = EngineError::new(
                    ErrorCode::BatchFailed,
                    format!(
                        "Batch {batch_index} (data rows {first_row}..={last_row}) panicked: {}",
                        panic_message(payload.as_ref())
                    ),
                );
                warn!("{error}");
                report
                    .outcomes
                    .extend(chunk.iter().map(|taxon| TaxonOutcome::Unresolved {
                        row_index: taxon.row_index,
                        reason: error.message.clone(),
                    }));
                report.failures.push(BatchFailure {
                    batch_index,
                    first_row,
                    last_row,
                    error,
                });
            }
        }
    }

    info!(
        "Analysis complete in {:.1} seconds ({} unresolved)",
        start.elapsed().as_secs_f64(),
        report.unresolved_count()
    );
    Ok(report)
}
