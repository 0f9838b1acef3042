use crate::taxon::{normalize, ClusterId, Record};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

const PROGRESS_EVERY: usize = 500_000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub records_seen: usize,
    pub records_indexed: usize,
    pub records_skipped: usize,
    pub records_with_cluster: usize,
    pub distinct_names: usize,
    pub distinct_clusters: usize,
}

/// Mutable side of the index. Filled in one sequential pass, then turned
/// into a [`RecordIndex`] by [`IndexBuilder::freeze`].
#[derive(Debug, Default)]
pub struct IndexBuilder {
    name_counts: HashMap<String, usize>,
    name_clusters: HashMap<String, BTreeSet<ClusterId>>,
    cluster_names: HashMap<ClusterId, BTreeSet<String>>,
    stats: IndexStats,
}

fn is_absent_name(name: &str) -> bool {
    name.is_empty() || name == "none" || name == "null"
}

impl IndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when the record has no usable species name and was
    /// skipped.
    pub fn add_record(&mut self, record: &Record) -> bool {
        self.stats.records_seen += 1;
        if self.stats.records_seen % PROGRESS_EVERY == 0 {
            debug!("Indexed {} records", self.stats.records_seen);
        }

        let species = normalize(&record.species);
        if species.is_empty() {
            self.stats.records_skipped += 1;
            return false;
        }
        self.stats.records_indexed += 1;

        let clusters = record.cluster_ids();
        if !clusters.is_empty() {
            self.stats.records_with_cluster += 1;
        }

        let subspecies = record
            .subspecies
            .as_deref()
            .map(normalize)
            .filter(|s| !is_absent_name(s) && *s != species);
        self.add_name(species, &clusters);
        if let Some(subspecies) = subspecies {
            self.add_name(subspecies, &clusters);
        }
        true
    }

    fn add_name(&mut self, name: String, clusters: &BTreeSet<ClusterId>) {
        // One record counts once per name, however many clusters it maps to.
        *self.name_counts.entry(name.clone()).or_insert(0) += 1;
        if clusters.is_empty() {
            return;
        }
        for cluster in clusters {
            self.cluster_names
                .entry(cluster.clone())
                .or_default()
                .insert(name.clone());
        }
        self.name_clusters
            .entry(name)
            .or_default()
            .extend(clusters.iter().cloned());
    }

    pub fn freeze(self) -> RecordIndex {
        let mut stats = self.stats;
        stats.distinct_names = self.name_counts.len();
        stats.distinct_clusters = self.cluster_names.len();
        RecordIndex {
            name_counts: self.name_counts,
            name_clusters: self.name_clusters,
            cluster_names: self.cluster_names,
            stats,
        }
    }
}

/// Read-only name and cluster indices over the full record table. Shared by
/// reference between all analysis workers.
#[derive(Debug, Clone, Default)]
pub struct RecordIndex {
    name_counts: HashMap<String, usize>,
    name_clusters: HashMap<String, BTreeSet<ClusterId>>,
    cluster_names: HashMap<ClusterId, BTreeSet<String>>,
    stats: IndexStats,
}

impl RecordIndex {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a Record>) -> Self {
        let mut builder = IndexBuilder::new();
        for record in records {
            builder.add_record(record);
        }
        builder.freeze()
    }

    /// Number of records carrying `name`. Expects a normalized name.
    pub fn count(&self, name: &str) -> usize {
        self.name_counts.get(name).copied().unwrap_or(0)
    }

    pub fn clusters(&self, name: &str) -> Option<&BTreeSet<ClusterId>> {
        self.name_clusters.get(name)
    }

    pub fn names_in(&self, cluster: &str) -> Option<&BTreeSet<String>> {
        self.cluster_names.get(cluster)
    }

    pub fn stats(&self) -> IndexStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_counts_once_across_clusters() {
        let records = vec![
            Record::new("Alpha vulgaris", "K1|K2"),
            Record::new("Alpha vulgaris", "K1"),
        ];
        let index = RecordIndex::from_records(&records);
        assert_eq!(index.count("alpha vulgaris"), 2);
        assert_eq!(index.clusters("alpha vulgaris").unwrap().len(), 2);
        assert!(index.names_in("K2").unwrap().contains("alpha vulgaris"));
    }

    #[test]
    fn test_case_insensitive_buckets() {
        let records = vec![
            Record::new("Alpha Vulgaris", "K1"),
            Record::new("alpha vulgaris", "K1"),
            Record::new(" ALPHA VULGARIS ", "K9"),
        ];
        let index = RecordIndex::from_records(&records);
        assert_eq!(index.count("alpha vulgaris"), 3);
        assert_eq!(index.names_in("K1").unwrap().len(), 1);
        assert_eq!(index.stats().distinct_names, 1);
    }

    #[test]
    fn test_records_without_cluster_still_counted() {
        let records = vec![Record::new("Beta marina", ""), Record::new("Beta marina", " | ")];
        let index = RecordIndex::from_records(&records);
        assert_eq!(index.count("beta marina"), 2);
        assert!(index.clusters("beta marina").is_none());
        let stats = index.stats();
        assert_eq!(stats.records_with_cluster, 0);
        assert_eq!(stats.distinct_clusters, 0);
    }

    #[test]
    fn test_blank_species_skipped() {
        let mut builder = IndexBuilder::new();
        assert!(!builder.add_record(&Record::new("  ", "K1")));
        assert!(builder.add_record(&Record::new("Gamma nova", "K1")));
        let index = builder.freeze();
        let stats = index.stats();
        assert_eq!(stats.records_seen, 2);
        assert_eq!(stats.records_skipped, 1);
        assert_eq!(stats.records_indexed, 1);
        assert_eq!(index.names_in("K1").unwrap().len(), 1);
    }

    #[test]
    fn test_subspecies_indexed_as_own_name() {
        let records = vec![
            Record::new("Delta palustris", "K3").with_subspecies("Delta palustris minor"),
            Record::new("Delta palustris", "K3").with_subspecies("None"),
            Record::new("Delta palustris", "K3").with_subspecies(""),
        ];
        let index = RecordIndex::from_records(&records);
        assert_eq!(index.count("delta palustris"), 3);
        assert_eq!(index.count("delta palustris minor"), 1);
        assert_eq!(index.count("none"), 0);
        assert_eq!(index.names_in("K3").unwrap().len(), 2);
    }

    #[test]
    fn test_subspecies_equal_to_species_counted_once() {
        let records = vec![
            Record::new("Delta palustris", "K3").with_subspecies("Delta Palustris"),
            Record::new("Delta palustris", "K3").with_subspecies(" delta palustris "),
        ];
        let index = RecordIndex::from_records(&records);
        assert_eq!(index.count("delta palustris"), 2);
        assert_eq!(index.names_in("K3").unwrap().len(), 1);
        assert_eq!(index.stats().distinct_names, 1);
    }
}
