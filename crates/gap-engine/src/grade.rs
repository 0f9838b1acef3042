//! BAGS grading.
//!
//! Grades are decided first, in the precedence order E > C > A > B > D > F.
//! The status only subdivides taxa that have records and no conflict; RED
//! and BLACK are fixed by the conflict and no-record branches.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BagsGrade {
    A,
    B,
    C,
    D,
    E,
    F,
}

impl BagsGrade {
    pub const ALL: [BagsGrade; 6] = [
        BagsGrade::A,
        BagsGrade::B,
        BagsGrade::C,
        BagsGrade::D,
        BagsGrade::E,
        BagsGrade::F,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BagsGrade::A => "A",
            BagsGrade::B => "B",
            BagsGrade::C => "C",
            BagsGrade::D => "D",
            BagsGrade::E => "E",
            BagsGrade::F => "F",
        }
    }
}

impl fmt::Display for BagsGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SpeciesStatus {
    Green,
    Amber,
    Blue,
    Red,
    Black,
}

impl SpeciesStatus {
    pub const ALL: [SpeciesStatus; 5] = [
        SpeciesStatus::Green,
        SpeciesStatus::Amber,
        SpeciesStatus::Blue,
        SpeciesStatus::Red,
        SpeciesStatus::Black,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SpeciesStatus::Green => "GREEN",
            SpeciesStatus::Amber => "AMBER",
            SpeciesStatus::Blue => "BLUE",
            SpeciesStatus::Red => "RED",
            SpeciesStatus::Black => "BLACK",
        }
    }
}

impl fmt::Display for SpeciesStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which parts of a taxon's name set occur in the record table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamesObserved {
    pub valid: bool,
    pub synonym: bool,
}

impl NamesObserved {
    pub fn status(&self) -> SpeciesStatus {
        match (self.valid, self.synonym) {
            (true, true) => SpeciesStatus::Amber,
            (true, false) => SpeciesStatus::Green,
            (false, true) => SpeciesStatus::Blue,
            (false, false) => SpeciesStatus::Black,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grading {
    pub grade: BagsGrade,
    pub status: SpeciesStatus,
}

pub fn grade(
    number_records: usize,
    cluster_count: usize,
    has_conflict: bool,
    observed: NamesObserved,
) -> Grading {
    if number_records == 0 {
        return Grading {
            grade: BagsGrade::F,
            status: SpeciesStatus::Black,
        };
    }
    if has_conflict {
        return Grading {
            grade: BagsGrade::E,
            status: SpeciesStatus::Red,
        };
    }
    let grade = match cluster_count {
        // Records exist but none carries a cluster id.
        0 => BagsGrade::F,
        1 if number_records >= 11 => BagsGrade::A,
        1 if number_records >= 3 => BagsGrade::B,
        1 => BagsGrade::D,
        _ => BagsGrade::C,
    };
    Grading {
        grade,
        status: observed.status(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_ONLY: NamesObserved = NamesObserved {
        valid: true,
        synonym: false,
    };
    const BOTH: NamesObserved = NamesObserved {
        valid: true,
        synonym: true,
    };
    const SYNONYM_ONLY: NamesObserved = NamesObserved {
        valid: false,
        synonym: true,
    };

    #[test]
    fn test_grade_table() {
        let cases = [
            (0, 0, false, VALID_ONLY, BagsGrade::F, SpeciesStatus::Black),
            (0, 3, true, BOTH, BagsGrade::F, SpeciesStatus::Black),
            (50, 1, true, VALID_ONLY, BagsGrade::E, SpeciesStatus::Red),
            (2, 4, true, SYNONYM_ONLY, BagsGrade::E, SpeciesStatus::Red),
            (50, 2, false, VALID_ONLY, BagsGrade::C, SpeciesStatus::Green),
            (1, 3, false, BOTH, BagsGrade::C, SpeciesStatus::Amber),
            (11, 1, false, VALID_ONLY, BagsGrade::A, SpeciesStatus::Green),
            (10, 1, false, BOTH, BagsGrade::B, SpeciesStatus::Amber),
            (3, 1, false, SYNONYM_ONLY, BagsGrade::B, SpeciesStatus::Blue),
            (2, 1, false, VALID_ONLY, BagsGrade::D, SpeciesStatus::Green),
            (1, 1, false, SYNONYM_ONLY, BagsGrade::D, SpeciesStatus::Blue),
            (7, 0, false, BOTH, BagsGrade::F, SpeciesStatus::Amber),
        ];
        for (records, clusters, conflict, observed, want_grade, want_status) in cases {
            let got = grade(records, clusters, conflict, observed);
            assert_eq!(
                (got.grade, got.status),
                (want_grade, want_status),
                "records={records} clusters={clusters} conflict={conflict} observed={observed:?}"
            );
        }
    }

    #[test]
    fn test_conflict_beats_high_coverage() {
        let got = grade(1_000, 1, true, VALID_ONLY);
        assert_eq!(got.grade, BagsGrade::E);
        assert_eq!(got.status, SpeciesStatus::Red);
    }

    #[test]
    fn test_fixed_statuses_ignore_observed_names() {
        for observed in [VALID_ONLY, BOTH, SYNONYM_ONLY, NamesObserved::default()] {
            assert_eq!(grade(5, 1, true, observed).status, SpeciesStatus::Red);
            assert_eq!(grade(0, 0, false, observed).status, SpeciesStatus::Black);
        }
    }

    #[test]
    fn test_labels() {
        assert_eq!(BagsGrade::E.to_string(), "E");
        assert_eq!(SpeciesStatus::Amber.to_string(), "AMBER");
        assert_eq!(serde_json::to_string(&SpeciesStatus::Blue).unwrap(), "\"BLUE\"");
    }
}
