//! Taxon-centric gap analysis over DNA-barcode reference libraries.
//!
//! The record table is indexed once ([`IndexBuilder`] then
//! [`IndexBuilder::freeze`]); every taxon is then resolved against the frozen
//! [`RecordIndex`], checked for cluster sharing with foreign names and given
//! a BAGS grade and status. [`analyze_all`] runs this over batches of taxa in
//! parallel and returns the outcomes in input order.

pub mod error;
pub mod grade;
pub mod index;
pub mod resolve;
pub mod scheduler;
pub mod taxon;

pub use error::{EngineError, ErrorCode};
pub use grade::{grade, BagsGrade, Grading, NamesObserved, SpeciesStatus};
pub use index::{IndexBuilder, IndexStats, RecordIndex};
pub use resolve::{detect_conflicts, resolve, ConflictGroup, Resolution};
pub use scheduler::{
    analyze_all, analyze_taxon, run_batches, AnalysisConfig, AnalysisReport, AnalysisResult,
    BatchFailure, TaxonOutcome,
};
pub use taxon::{
    find_name_overlaps, normalize, split_clusters, ClusterId, NameClaim, NameOverlap, NameRole,
    Record, Taxon,
};
