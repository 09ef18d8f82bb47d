use serde::{Deserialize, Serialize};
use std::fmt;

pub const PASSING_AVERAGE: f64 = 50.0;

/// Letter grade derived from a 0-100 mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Grade {
    HD,
    D,
    C,
    P,
    F,
}

// Ordered highest first; the first threshold a mark reaches wins.
const THRESHOLDS: [(i64, Grade); 4] = [(85, Grade::HD), (75, Grade::D), (65, Grade::C), (50, Grade::P)];

pub fn grade_for(mark: i64) -> Grade {
    THRESHOLDS
        .iter()
        .find(|(min, _)| mark >= *min)
        .map(|(_, g)| *g)
        .unwrap_or(Grade::F)
}

impl Grade {
    pub fn rank(self) -> u8 {
        match self {
            Grade::HD => 4,
            Grade::D => 3,
            Grade::C => 2,
            Grade::P => 1,
            Grade::F => 0,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Grade::HD => "HD",
            Grade::D => "D",
            Grade::C => "C",
            Grade::P => "P",
            Grade::F => "F",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Bucket a student falls into when grouping by dominant grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GradeBucket {
    Grade(Grade),
    NoSubjects,
}

impl GradeBucket {
    pub const ALL: [GradeBucket; 6] = [
        GradeBucket::Grade(Grade::HD),
        GradeBucket::Grade(Grade::D),
        GradeBucket::Grade(Grade::C),
        GradeBucket::Grade(Grade::P),
        GradeBucket::Grade(Grade::F),
        GradeBucket::NoSubjects,
    ];

    pub fn label(self) -> &'static str {
        match self {
            GradeBucket::Grade(g) => g.code(),
            GradeBucket::NoSubjects => "N/A",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries_match_thresholds() {
        let cases = [
            (0, Grade::F),
            (49, Grade::F),
            (50, Grade::P),
            (64, Grade::P),
            (65, Grade::C),
            (74, Grade::C),
            (75, Grade::D),
            (84, Grade::D),
            (85, Grade::HD),
            (100, Grade::HD),
        ];
        for (mark, expected) in cases {
            assert_eq!(grade_for(mark), expected, "mark {mark}");
        }
    }

    #[test]
    fn out_of_range_marks_still_resolve() {
        assert_eq!(grade_for(-5), Grade::F);
        assert_eq!(grade_for(250), Grade::HD);
    }

    #[test]
    fn grade_is_monotonic_in_mark() {
        let mut prev = grade_for(-10).rank();
        for m in -9..=110 {
            let r = grade_for(m).rank();
            assert!(r >= prev, "rank dropped at {m}");
            prev = r;
        }
    }

    #[test]
    fn grades_serialize_as_codes() {
        assert_eq!(serde_json::to_string(&Grade::HD).expect("ser"), "\"HD\"");
        let g: Grade = serde_json::from_str("\"C\"").expect("de");
        assert_eq!(g, Grade::C);
        assert_eq!(GradeBucket::NoSubjects.label(), "N/A");
    }
}
