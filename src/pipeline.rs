use crate::config::RunConfig;
use crate::error::GapError;
use crate::output::write_results;
use crate::summary::RunSummary;
use crate::tsv::{index_records, load_species_list};
use gap_engine::{analyze_all, find_name_overlaps, NameOverlap, NameRole};
use itertools::Itertools;
use tracing::{info, warn};

const MAX_LOGGED_OVERLAPS: usize = 20;

fn log_overlaps(overlaps: &[NameOverlap]) {
    if overlaps.is_empty() {
        return;
    }
    warn!(
        "{} names are claimed by more than one taxon; each taxon is analyzed with its own name set",
        overlaps.len()
    );
    for overlap in overlaps.iter().take(MAX_LOGGED_OVERLAPS) {
        let claims = overlap
            .claims
            .iter()
            .map(|c| {
                let role = match c.role {
                    NameRole::Valid => "valid",
                    NameRole::Synonym => "synonym",
                };
                format!("data row {} ({role})", c.row_index)
            })
            .join(", ");
        warn!("  '{}': {claims}", overlap.name);
    }
    if overlaps.len() > MAX_LOGGED_OVERLAPS {
        warn!("  ... and {} more", overlaps.len() - MAX_LOGGED_OVERLAPS);
    }
}

/// Loads both tables, indexes the records, analyzes every taxon and writes
/// the augmented species list.
pub fn run(config: &RunConfig) -> Result<RunSummary, GapError> {
    config.validate()?;

    let species = load_species_list(&config.species_list)?;
    let overlaps = find_name_overlaps(&species.taxa);
    log_overlaps(&overlaps);

    let records = index_records(&config.records)?;
    let report = analyze_all(&species.taxa, &records.index, &config.analysis)?;
    for failure in &report.failures {
        warn!(
            "Batch {} (data rows {}..={}) failed: {}",
            failure.batch_index, failure.first_row, failure.last_row, failure.error
        );
    }

    write_results(&config.output, &species, &report)?;

    let mut summary = RunSummary::from_report(&report);
    summary.skipped_species_rows = species.skipped_rows;
    summary.skipped_record_rows = records.skipped_rows();
    summary.name_overlaps = overlaps.len();
    summary.cluster_column = records.cluster_column.clone();
    summary.index = records.index.stats();
    summary.log();

    if let Some(path) = &config.summary_json {
        summary.save_to_path(path)?;
        info!("Wrote summary to {}", path.display());
    }
    Ok(summary)
}
