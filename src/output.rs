use crate::error::GapError;
use crate::tsv::SpeciesList;
use csv::WriterBuilder;
use gap_engine::{AnalysisReport, ConflictGroup, TaxonOutcome};
use itertools::Itertools;
use std::{fs, io::Write, path::Path};
use tempfile::NamedTempFile;
use tracing::info;

pub const ANALYSIS_COLUMNS: [&str; 4] = [
    "number_records",
    "bags_grade",
    "species_status",
    "other_names",
];
pub const UNRESOLVED_STATUS: &str = "UNRESOLVED";
const NAME_SEPARATOR: &str = ";";
const GROUP_SEPARATOR: &str = "|";

/// Capitalizes the genus of a normalized name: "epsilon montanus" becomes
/// "Epsilon montanus".
pub fn format_species_name(name: &str) -> String {
    let mut chars = name.trim().chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn format_other_names(groups: &[ConflictGroup]) -> String {
    groups
        .iter()
        .map(|group| group.names.iter().map(|n| format_species_name(n)).join(NAME_SEPARATOR))
        .join(GROUP_SEPARATOR)
}

/// Input columns followed by the analysis columns. An analysis column that
/// is already an input column keeps its position.
pub fn output_columns(input_columns: &[String]) -> Vec<String> {
    let mut ret = input_columns.to_vec();
    for column in ANALYSIS_COLUMNS {
        if !ret.iter().any(|c| c == column) {
            ret.push(column.to_string());
        }
    }
    ret
}

fn analysis_values(outcome: &TaxonOutcome) -> [String; 4] {
    match outcome {
        TaxonOutcome::Resolved(result) => [
            result.number_records.to_string(),
            result.bags_grade.to_string(),
            result.species_status.to_string(),
            format_other_names(&result.other_names),
        ],
        TaxonOutcome::Unresolved { .. } => [
            String::new(),
            String::new(),
            UNRESOLVED_STATUS.to_string(),
            String::new(),
        ],
    }
}

pub fn write_table<W: Write>(
    writer: W,
    species: &SpeciesList,
    report: &AnalysisReport,
) -> Result<usize, GapError> {
    if species.taxa.len() != report.outcomes.len() {
        return Err(GapError::String(format!(
            "Analysis returned {} outcomes for {} taxa",
            report.outcomes.len(),
            species.taxa.len()
        )));
    }
    let columns = output_columns(&species.columns);
    let mut wtr = WriterBuilder::new().delimiter(b'\t').from_writer(writer);
    wtr.write_record(&columns)?;

    for (taxon, outcome) in species.taxa.iter().zip(&report.outcomes) {
        let mut row = vec![String::new(); columns.len()];
        for (idx, value) in taxon.attributes.iter().enumerate().take(columns.len()) {
            row[idx] = value.clone();
        }
        for (column, value) in ANALYSIS_COLUMNS.iter().zip(analysis_values(outcome)) {
            if let Some(idx) = columns.iter().position(|c| c == *column) {
                row[idx] = value;
            }
        }
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(report.outcomes.len())
}

/// Writes into a temporary file next to `path` and renames it into place,
/// so a failed run never leaves a truncated table behind.
pub fn write_results(
    path: &Path,
    species: &SpeciesList,
    report: &AnalysisReport,
) -> Result<usize, GapError> {
    info!("Writing results to {}", path.display());
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    fs::create_dir_all(dir).map_err(|e| {
        GapError::String(format!(
            "Could not create output directory '{}': {e}",
            dir.display()
        ))
    })?;
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| {
        GapError::String(format!(
            "Could not create a temporary file in '{}': {e}",
            dir.display()
        ))
    })?;
    let written = write_table(tmp.as_file_mut(), species, report)?;
    tmp.persist(path).map_err(|e| {
        GapError::String(format!("Could not write '{}': {}", path.display(), e.error))
    })?;
    info!("Wrote {written} results");
    Ok(written)
}
