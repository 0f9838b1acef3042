use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub type ClusterId = String;

/// Canonical form used for every name comparison: trimmed and lower-cased.
pub fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

/// One row of the species list: a valid name, its synonyms and the
/// remaining input columns, which are passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxon {
    pub row_index: usize,
    pub valid_name: String,
    pub synonyms: Vec<String>,
    #[serde(default)]
    pub attributes: Vec<String>,
}

impl Taxon {
    pub fn new(row_index: usize, valid_name: &str, synonyms: &[&str]) -> Self {
        Self {
            row_index,
            valid_name: valid_name.to_string(),
            synonyms: synonyms.iter().map(|s| s.to_string()).collect(),
            attributes: vec![],
        }
    }

    pub fn with_attributes(mut self, attributes: Vec<String>) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn normalized_valid_name(&self) -> String {
        normalize(&self.valid_name)
    }

    /// Valid name plus synonyms, normalized and deduplicated. Blank synonyms
    /// are dropped; a blank valid name is an input error.
    pub fn name_set(&self) -> Result<BTreeSet<String>, EngineError> {
        let valid = self.normalized_valid_name();
        if valid.is_empty() {
            return Err(EngineError::invalid_input(format!(
                "Taxon at data row {} has a blank valid name",
                self.row_index
            )));
        }
        let mut names = BTreeSet::new();
        names.insert(valid);
        names.extend(
            self.synonyms
                .iter()
                .map(|s| normalize(s))
                .filter(|s| !s.is_empty()),
        );
        Ok(names)
    }
}

/// One row of the record table, reduced to the columns the index needs.
/// `clusters` is the raw cluster field, possibly pipe-delimited.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub species: String,
    pub subspecies: Option<String>,
    pub clusters: String,
}

impl Record {
    pub fn new(species: &str, clusters: &str) -> Self {
        Self {
            species: species.to_string(),
            subspecies: None,
            clusters: clusters.to_string(),
        }
    }

    pub fn with_subspecies(mut self, subspecies: &str) -> Self {
        self.subspecies = Some(subspecies.to_string());
        self
    }

    pub fn cluster_ids(&self) -> BTreeSet<ClusterId> {
        split_clusters(&self.clusters)
    }
}

pub fn split_clusters(field: &str) -> BTreeSet<ClusterId> {
    field
        .split('|')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NameRole {
    Valid,
    Synonym,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameClaim {
    pub row_index: usize,
    pub role: NameRole,
}

/// A normalized name that appears in the name sets of more than one taxon.
/// Each taxon is still analyzed with its own name set; this only reports
/// the overlap so it can be fixed upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameOverlap {
    pub name: String,
    pub claims: Vec<NameClaim>,
}

impl NameOverlap {
    pub fn is_valid_name_conflict(&self) -> bool {
        self.claims.iter().any(|c| c.role == NameRole::Valid)
    }
}

pub fn find_name_overlaps(taxa: &[Taxon]) -> Vec<NameOverlap> {
    let mut claims_by_name: BTreeMap<String, Vec<NameClaim>> = BTreeMap::new();
    for taxon in taxa {
        let valid = taxon.normalized_valid_name();
        let Ok(names) = taxon.name_set() else {
            continue;
        };
        for name in names {
            let role = if name == valid {
                NameRole::Valid
            } else {
                NameRole::Synonym
            };
            claims_by_name.entry(name).or_default().push(NameClaim {
                row_index: taxon.row_index,
                role,
            });
        }
    }
    claims_by_name
        .into_iter()
        .filter(|(_, claims)| claims.len() > 1)
        .map(|(name, claims)| NameOverlap { name, claims })
        .collect()
}
