use gap_engine::{
    analyze_all, normalize, split_clusters, AnalysisConfig, AnalysisReport, BagsGrade, Record,
    RecordIndex, SpeciesStatus, Taxon, TaxonOutcome,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;

const NAMES: [&str; 12] = [
    "Alpha vulgaris",
    "alpha communis",
    "Beta marina",
    "BETA AQUATICA",
    "Gamma nova",
    "Delta palustris",
    "Epsilon montanus",
    "Zeta alpina",
    "Zeta montana",
    "Eta borealis",
    "Theta minor",
    "Iota maxima",
];

fn random_records(rng: &mut StdRng, n: usize) -> Vec<Record> {
    (0..n)
        .map(|_| {
            let name = NAMES[rng.random_range(0..NAMES.len())];
            let name = if rng.random_bool(0.5) {
                name.to_uppercase()
            } else {
                format!(" {name} ")
            };
            let clusters: Vec<String> = (0..rng.random_range(0..3))
                .map(|_| format!("BOLD:K{}", rng.random_range(0..15)))
                .collect();
            let record = Record::new(&name, &clusters.join("|"));
            match rng.random_range(0..7) {
                0 => record.with_subspecies(""),
                1 => record.with_subspecies("None"),
                2 => record.with_subspecies("null"),
                3 => record.with_subspecies(&name.to_lowercase()),
                4 => record.with_subspecies(&format!("{} minor", name.trim())),
                5 => record.with_subspecies(NAMES[rng.random_range(0..NAMES.len())]),
                _ => record,
            }
        })
        .collect()
}

/// Distinct normalized names a record is indexed under.
fn record_names(record: &Record) -> BTreeSet<String> {
    let mut names = BTreeSet::from([normalize(&record.species)]);
    if let Some(subspecies) = record.subspecies.as_deref().map(normalize) {
        if !["", "none", "null"].contains(&subspecies.as_str()) {
            names.insert(subspecies);
        }
    }
    names
}

fn random_taxa(rng: &mut StdRng, n: usize) -> Vec<Taxon> {
    (0..n)
        .map(|i| {
            let valid = NAMES[rng.random_range(0..NAMES.len())];
            let synonyms: Vec<&str> = (0..rng.random_range(0..3))
                .map(|_| NAMES[rng.random_range(0..NAMES.len())])
                .collect();
            Taxon::new(i, valid, &synonyms)
        })
        .collect()
}

fn results(report: &AnalysisReport) -> Vec<&gap_engine::AnalysisResult> {
    report
        .outcomes
        .iter()
        .map(|o| o.result().expect("every taxon resolves"))
        .collect()
}

#[test]
fn test_counts_and_conflicts_match_brute_force() {
    let mut rng = StdRng::seed_from_u64(42);
    let records = random_records(&mut rng, 600);
    let taxa = random_taxa(&mut rng, 200);
    let index = RecordIndex::from_records(&records);
    let report = analyze_all(&taxa, &index, &AnalysisConfig::new(4, 16).unwrap()).unwrap();

    for (taxon, result) in taxa.iter().zip(results(&report)) {
        let name_set = taxon.name_set().unwrap();

        let expected_records: usize = records
            .iter()
            .map(|r| record_names(r).intersection(&name_set).count())
            .sum();
        assert_eq!(result.number_records, expected_records, "taxon {taxon:?}");

        let touched: BTreeSet<String> = records
            .iter()
            .filter(|r| !record_names(r).is_disjoint(&name_set))
            .flat_map(|r| split_clusters(&r.clusters))
            .collect();
        let expected_conflict = touched.iter().any(|cluster| {
            records.iter().any(|r| {
                split_clusters(&r.clusters).contains(cluster)
                    && !record_names(r).is_subset(&name_set)
            })
        });
        assert_eq!(result.has_conflict(), expected_conflict, "taxon {taxon:?}");
        assert_eq!(result.cluster_count, touched.len());

        if expected_records == 0 {
            assert_eq!(result.bags_grade, BagsGrade::F);
            assert_eq!(result.species_status, SpeciesStatus::Black);
        } else if expected_conflict {
            assert_eq!(result.bags_grade, BagsGrade::E);
            assert_eq!(result.species_status, SpeciesStatus::Red);
        }
    }
}

#[test]
fn test_determinism_across_worker_counts() {
    let mut rng = StdRng::seed_from_u64(7);
    let records = random_records(&mut rng, 1_000);
    let taxa = random_taxa(&mut rng, 333);
    let index = RecordIndex::from_records(&records);

    let serial = analyze_all(&taxa, &index, &AnalysisConfig::new(1, 25).unwrap()).unwrap();
    let max_workers = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
        .max(3);
    for workers in [2, max_workers] {
        let parallel =
            analyze_all(&taxa, &index, &AnalysisConfig::new(workers, 25).unwrap()).unwrap();
        assert_eq!(parallel, serial, "workers={workers}");
    }
    let rows: Vec<usize> = serial.outcomes.iter().map(TaxonOutcome::row_index).collect();
    assert_eq!(rows, (0..taxa.len()).collect::<Vec<_>>());
}

#[test]
fn test_conflict_and_high_single_cluster_grades_e() {
    let mut records = vec![Record::new("Alpha vulgaris", "K1"); 40];
    records.push(Record::new("Beta marina", "K1"));
    let index = RecordIndex::from_records(&records);
    let taxa = vec![Taxon::new(0, "Alpha vulgaris", &[])];
    let report = analyze_all(&taxa, &index, &AnalysisConfig::new(1, 1).unwrap()).unwrap();
    let result = report.outcomes[0].result().unwrap();
    assert_eq!(result.bags_grade, BagsGrade::E);
    assert_eq!(result.species_status, SpeciesStatus::Red);
}
