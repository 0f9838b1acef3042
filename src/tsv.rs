use crate::error::GapError;
use csv::{ByteRecord, ReaderBuilder, StringRecord};
use gap_engine::{IndexBuilder, Record, RecordIndex, Taxon};
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    time::Instant,
};
use tracing::{info, warn};

pub const VALID_NAME_COLUMNS: [&str; 2] = ["taxon_name", "species"];
pub const SYNONYMS_COLUMN: &str = "synonyms";
pub const SPECIES_COLUMN: &str = "species";
pub const SUBSPECIES_COLUMN: &str = "subspecies";
/// Cluster id columns in order of preference.
pub const CLUSTER_COLUMNS: [&str; 4] = ["bin_uri", "otu_id", "OTU_ID", "BIN"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextEncoding {
    Utf8,
    Latin1,
}

/// Latin-1 maps every byte to the code point of the same value.
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// `None` when a UTF-8 record holds invalid bytes.
fn decode_record(record: ByteRecord, encoding: TextEncoding) -> Option<StringRecord> {
    match encoding {
        TextEncoding::Utf8 => StringRecord::from_byte_record(record).ok(),
        TextEncoding::Latin1 => Some(record.iter().map(decode_latin1).collect()),
    }
}

/// Streams a tab-delimited table row by row. The first pass decodes UTF-8;
/// on the first invalid header or row the whole file is read again as
/// Latin-1, with fresh state from `begin`.
fn read_table<S>(
    path: &Path,
    mut begin: impl FnMut(&[String]) -> Result<S, GapError>,
    mut visit: impl FnMut(&mut S, usize, &StringRecord),
) -> Result<(S, TextEncoding), GapError> {
    for encoding in [TextEncoding::Utf8, TextEncoding::Latin1] {
        if let Some(state) = read_pass(path, encoding, &mut begin, &mut visit)? {
            return Ok((state, encoding));
        }
        warn!(
            "UTF-8 decoding of '{}' failed, re-reading as Latin-1",
            path.display()
        );
    }
    Err(GapError::String(format!(
        "Could not decode '{}'",
        path.display()
    )))
}

fn read_pass<S>(
    path: &Path,
    encoding: TextEncoding,
    begin: &mut impl FnMut(&[String]) -> Result<S, GapError>,
    visit: &mut impl FnMut(&mut S, usize, &StringRecord),
) -> Result<Option<S>, GapError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_path(path)
        .map_err(|e| GapError::String(format!("Could not read '{}': {e}", path.display())))?;
    let Some(headers) = decode_record(reader.byte_headers()?.clone(), encoding) else {
        return Ok(None);
    };
    let columns: Vec<String> = headers.iter().map(|h| h.trim().to_string()).collect();
    let mut state = begin(&columns)?;
    for (row_index, row) in reader.byte_records().enumerate() {
        let Some(row) = decode_record(row?, encoding) else {
            return Ok(None);
        };
        visit(&mut state, row_index, &row);
    }
    Ok(Some(state))
}

pub fn find_column(headers: &[String], candidates: &[&str]) -> Option<usize> {
    candidates
        .iter()
        .find_map(|c| headers.iter().position(|h| h == c))
}

fn require_column(
    path: &Path,
    headers: &[String],
    candidates: &[&str],
) -> Result<usize, GapError> {
    find_column(headers, candidates).ok_or_else(|| GapError::MissingColumns {
        file: path.to_path_buf(),
        expected: candidates.iter().map(|c| c.to_string()).collect(),
        found: headers.to_vec(),
    })
}

fn field<'a>(row: &'a StringRecord, idx: usize) -> &'a str {
    row.get(idx).unwrap_or_default().trim()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeciesList {
    pub path: PathBuf,
    pub columns: Vec<String>,
    pub taxa: Vec<Taxon>,
    pub skipped_rows: usize,
    pub encoding: TextEncoding,
}

impl SpeciesList {
    pub fn total_synonyms(&self) -> usize {
        self.taxa.iter().map(|t| t.synonyms.len()).sum()
    }
}

struct SpeciesPass {
    columns: Vec<String>,
    name_idx: usize,
    synonyms_idx: Option<usize>,
    taxa: Vec<Taxon>,
    skipped_rows: usize,
}

impl SpeciesPass {
    fn add_row(&mut self, row_index: usize, row: &StringRecord) {
        let valid_name = field(row, self.name_idx);
        if valid_name.is_empty() {
            self.skipped_rows += 1;
            return;
        }
        let synonyms: Vec<String> = self
            .synonyms_idx
            .map(|idx| field(row, idx))
            .unwrap_or_default()
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        let attributes = (0..self.columns.len())
            .map(|idx| field(row, idx).to_string())
            .collect();
        self.taxa.push(Taxon {
            row_index,
            valid_name: valid_name.to_string(),
            synonyms,
            attributes,
        });
    }
}

pub fn load_species_list(path: &Path) -> Result<SpeciesList, GapError> {
    info!("Loading species list from {}", path.display());
    let (pass, encoding) = read_table(
        path,
        |columns| {
            Ok(SpeciesPass {
                columns: columns.to_vec(),
                name_idx: require_column(path, columns, &VALID_NAME_COLUMNS)?,
                synonyms_idx: find_column(columns, &[SYNONYMS_COLUMN]),
                taxa: vec![],
                skipped_rows: 0,
            })
        },
        |pass, row_index, row| pass.add_row(row_index, row),
    )?;

    let list = SpeciesList {
        path: path.to_path_buf(),
        columns: pass.columns,
        taxa: pass.taxa,
        skipped_rows: pass.skipped_rows,
        encoding,
    };
    info!(
        "Loaded {} taxa ({} synonyms, {} names to match)",
        list.taxa.len(),
        list.total_synonyms(),
        list.taxa.len() + list.total_synonyms()
    );
    if list.skipped_rows > 0 {
        warn!(
            "Skipped {} species list rows with a blank valid name",
            list.skipped_rows
        );
    }
    Ok(list)
}

/// Frozen index over a records file plus what was learned while reading it.
#[derive(Debug, Clone)]
pub struct IndexedRecords {
    pub path: PathBuf,
    pub index: RecordIndex,
    pub cluster_column: String,
    pub has_subspecies: bool,
    pub encoding: TextEncoding,
}

impl IndexedRecords {
    pub fn skipped_rows(&self) -> usize {
        self.index.stats().records_skipped
    }
}

struct RecordsPass {
    builder: IndexBuilder,
    species_idx: usize,
    cluster_idx: usize,
    subspecies_idx: Option<usize>,
    cluster_column: String,
}

impl RecordsPass {
    fn add_row(&mut self, row: &StringRecord) {
        let mut record = Record::new(field(row, self.species_idx), field(row, self.cluster_idx));
        if let Some(idx) = self.subspecies_idx {
            record.subspecies = Some(field(row, idx).to_string());
        }
        self.builder.add_record(&record);
    }
}

/// Streams the records file straight into an [`IndexBuilder`]; only the
/// index is kept in memory. Column checks happen before the first row is
/// indexed.
pub fn index_records(path: &Path) -> Result<IndexedRecords, GapError> {
    info!("Building indices from {}", path.display());
    let start = Instant::now();
    let (pass, encoding) = read_table(
        path,
        |columns| {
            let cluster_idx = require_column(path, columns, &CLUSTER_COLUMNS)?;
            Ok(RecordsPass {
                builder: IndexBuilder::new(),
                species_idx: require_column(path, columns, &[SPECIES_COLUMN])?,
                cluster_idx,
                subspecies_idx: find_column(columns, &[SUBSPECIES_COLUMN]),
                cluster_column: columns[cluster_idx].clone(),
            })
        },
        |pass, _, row| pass.add_row(row),
    )?;
    info!("Using cluster column: {}", pass.cluster_column);
    let has_subspecies = pass.subspecies_idx.is_some();
    if has_subspecies {
        info!("Subspecies column detected, subspecies are matched as names of their own");
    }
    let index = pass.builder.freeze();

    let stats = index.stats();
    info!(
        "Index building complete in {:.1} seconds",
        start.elapsed().as_secs_f64()
    );
    info!(
        "  {} records, {} with cluster id, {} names, {} clusters",
        stats.records_seen, stats.records_with_cluster, stats.distinct_names, stats.distinct_clusters
    );
    if stats.records_skipped > 0 {
        warn!(
            "Skipped {} records with a blank species name",
            stats.records_skipped
        );
    }
    Ok(IndexedRecords {
        path: path.to_path_buf(),
        index,
        cluster_column: pass.cluster_column,
        has_subspecies,
        encoding,
    })
}
