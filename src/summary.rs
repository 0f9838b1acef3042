use crate::error::GapError;
use gap_engine::{AnalysisReport, BagsGrade, IndexStats, SpeciesStatus};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, path::Path};
use tracing::info;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub taxa: usize,
    pub resolved: usize,
    pub unresolved: usize,
    pub failed_batches: usize,
    pub taxa_with_records: usize,
    pub total_records_matched: usize,
    pub grades: BTreeMap<BagsGrade, usize>,
    pub statuses: BTreeMap<SpeciesStatus, usize>,
    pub skipped_species_rows: usize,
    pub skipped_record_rows: usize,
    pub name_overlaps: usize,
    pub cluster_column: String,
    pub index: IndexStats,
}

fn percent(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * count as f64 / total as f64
    }
}

impl RunSummary {
    pub fn from_report(report: &AnalysisReport) -> Self {
        let mut ret = Self {
            taxa: report.outcomes.len(),
            unresolved: report.unresolved_count(),
            failed_batches: report.failures.len(),
            grades: BagsGrade::ALL.iter().map(|g| (*g, 0)).collect(),
            statuses: SpeciesStatus::ALL.iter().map(|s| (*s, 0)).collect(),
            ..Default::default()
        };
        for result in report.resolved() {
            ret.resolved += 1;
            *ret.grades.entry(result.bags_grade).or_insert(0) += 1;
            *ret.statuses.entry(result.species_status).or_insert(0) += 1;
            if result.number_records > 0 {
                ret.taxa_with_records += 1;
                ret.total_records_matched += result.number_records;
            }
        }
        ret
    }

    pub fn log(&self) {
        info!("{}", "=".repeat(60));
        info!("SUMMARY");
        info!("{}", "=".repeat(60));
        info!("BAGS grade distribution:");
        for (grade, count) in &self.grades {
            info!("  Grade {grade}: {count} ({:.1}%)", percent(*count, self.taxa));
        }
        info!("Status distribution:");
        for (status, count) in &self.statuses {
            info!("  {status}: {count} ({:.1}%)", percent(*count, self.taxa));
        }
        info!("Coverage:");
        info!(
            "  Taxa with records: {}/{} ({:.1}%)",
            self.taxa_with_records,
            self.taxa,
            percent(self.taxa_with_records, self.taxa)
        );
        info!("  Total records matched: {}", self.total_records_matched);
        if self.unresolved > 0 {
            info!(
                "  Unresolved taxa: {} ({} failed batches)",
                self.unresolved, self.failed_batches
            );
        }
        info!(
            "Skipped rows: {} species list, {} records",
            self.skipped_species_rows, self.skipped_record_rows
        );
        if self.name_overlaps > 0 {
            info!("Names shared between taxa: {}", self.name_overlaps);
        }
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), GapError> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text).map_err(|e| {
            GapError::String(format!("Could not write summary '{}': {e}", path.display()))
        })
    }
}
