use crate::index::RecordIndex;
use crate::taxon::ClusterId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// What the record table holds for one taxon's name set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub number_records: usize,
    pub touched_clusters: BTreeSet<ClusterId>,
    /// Names of the taxon that occur in at least one record.
    pub names_observed: BTreeSet<String>,
}

impl Resolution {
    pub fn has_records(&self) -> bool {
        self.number_records > 0
    }
}

pub fn resolve(name_set: &BTreeSet<String>, index: &RecordIndex) -> Resolution {
    let mut ret = Resolution::default();
    for name in name_set {
        let count = index.count(name);
        if count == 0 {
            continue;
        }
        ret.number_records += count;
        ret.names_observed.insert(name.clone());
        if let Some(clusters) = index.clusters(name) {
            ret.touched_clusters.extend(clusters.iter().cloned());
        }
    }
    ret
}

/// Names found in one cluster that lie outside the taxon's own name set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictGroup {
    pub cluster_id: ClusterId,
    pub names: Vec<String>,
}

/// One group per touched cluster that also holds foreign names, ordered by
/// cluster id. An empty result means no conflict.
pub fn detect_conflicts(
    touched_clusters: &BTreeSet<ClusterId>,
    name_set: &BTreeSet<String>,
    index: &RecordIndex,
) -> Vec<ConflictGroup> {
    touched_clusters
        .iter()
        .filter_map(|cluster_id| {
            let names: Vec<String> = index
                .names_in(cluster_id)?
                .difference(name_set)
                .cloned()
                .collect();
            if names.is_empty() {
                return None;
            }
            Some(ConflictGroup {
                cluster_id: cluster_id.clone(),
                names,
            })
        })
        .collect()
}
