use crate::error::{StoreError, StoreResult};
use crate::grade::{grade_for, Grade, GradeBucket, PASSING_AVERAGE};
use crate::ids::{generate_unique_id, SUBJECT_ID_LEN};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const MAX_SUBJECTS_PER_STUDENT: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub subject_id: String,
    pub name: String,
    pub mark: i64,
    pub grade: Grade,
}

impl Subject {
    /// New subject with a fresh 3-digit id and a simulated mark.
    ///
    /// The name is taken as-is; callers check emptiness and duplicates.
    pub fn create<R: Rng + ?Sized>(
        name: &str,
        existing_ids: &HashSet<String>,
        rng: &mut R,
    ) -> StoreResult<Subject> {
        let subject_id = generate_unique_id(existing_ids, SUBJECT_ID_LEN, rng)?;
        let mark = rng.gen_range(0..=100);
        Ok(Subject {
            subject_id,
            name: name.to_string(),
            mark,
            grade: grade_for(mark),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub student_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub subjects: Vec<Subject>,
}

impl Student {
    pub fn average_mark(&self) -> f64 {
        if self.subjects.is_empty() {
            return 0.0;
        }
        let total: i64 = self.subjects.iter().map(|s| s.mark).sum();
        total as f64 / self.subjects.len() as f64
    }

    pub fn is_passing(&self) -> bool {
        self.average_mark() >= PASSING_AVERAGE
    }

    pub fn dominant_grade(&self) -> GradeBucket {
        self.subjects
            .iter()
            .map(|s| s.grade)
            .max_by_key(|g| g.rank())
            .map(GradeBucket::Grade)
            .unwrap_or(GradeBucket::NoSubjects)
    }

    pub fn subject_ids(&self) -> HashSet<String> {
        self.subjects.iter().map(|s| s.subject_id.clone()).collect()
    }

    fn check_can_enroll(&self, name: &str) -> StoreResult<()> {
        if self.subjects.len() >= MAX_SUBJECTS_PER_STUDENT {
            return Err(StoreError::SubjectLimitReached {
                max: MAX_SUBJECTS_PER_STUDENT,
            });
        }
        let lowered = name.to_lowercase();
        if self.subjects.iter().any(|s| s.name.to_lowercase() == lowered) {
            return Err(StoreError::DuplicateSubjectName(name.to_string()));
        }
        Ok(())
    }

    /// Insert an already-built subject. Leaves the list untouched on failure.
    pub fn add_subject(&mut self, subject: Subject) -> StoreResult<()> {
        self.check_can_enroll(&subject.name)?;
        if self.subjects.iter().any(|s| s.subject_id == subject.subject_id) {
            return Err(StoreError::DuplicateSubjectId(subject.subject_id));
        }
        self.subjects.push(subject);
        Ok(())
    }

    /// Create a subject named `name` and add it.
    pub fn enroll<R: Rng + ?Sized>(&mut self, name: &str, rng: &mut R) -> StoreResult<Subject> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::InvalidInput(
                "subject name must not be empty".to_string(),
            ));
        }
        self.check_can_enroll(name)?;
        let subject = Subject::create(name, &self.subject_ids(), rng)?;
        self.add_subject(subject.clone())?;
        Ok(subject)
    }

    pub fn remove_subject_by_id(&mut self, subject_id: &str) -> StoreResult<Subject> {
        let idx = self
            .subjects
            .iter()
            .position(|s| s.subject_id == subject_id)
            .ok_or_else(|| StoreError::SubjectNotFound(subject_id.to_string()))?;
        Ok(self.subjects.remove(idx))
    }

    pub fn summary(&self) -> StudentSummary {
        StudentSummary {
            student_id: self.student_id.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            subject_count: self.subjects.len(),
            average: self.average_mark(),
            passing: self.is_passing(),
        }
    }

    pub fn enrollment(&self) -> EnrollmentSummary {
        EnrollmentSummary {
            student_id: self.student_id.clone(),
            subjects: self.subjects.clone(),
            count: self.subjects.len(),
            max: MAX_SUBJECTS_PER_STUDENT,
            average: self.average_mark(),
            passing: self.is_passing(),
        }
    }
}

/// Password-free view of a student for listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSummary {
    pub student_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub subject_count: usize,
    pub average: f64,
    pub passing: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentSummary {
    pub student_id: String,
    pub subjects: Vec<Subject>,
    pub count: usize,
    pub max: usize,
    pub average: f64,
    pub passing: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn student() -> Student {
        Student {
            student_id: "123456".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada.lovelace@university.com".into(),
            password: "hash".into(),
            subjects: Vec::new(),
        }
    }

    fn subject(id: &str, name: &str, mark: i64) -> Subject {
        Subject {
            subject_id: id.into(),
            name: name.into(),
            mark,
            grade: grade_for(mark),
        }
    }

    #[test]
    fn empty_student_averages_zero_and_fails() {
        let s = student();
        assert_eq!(s.average_mark(), 0.0);
        assert!(!s.is_passing());
        assert_eq!(s.dominant_grade(), GradeBucket::NoSubjects);
    }

    #[test]
    fn average_and_dominant_grade() {
        let mut s = student();
        s.subjects = vec![subject("101", "Maths", 40), subject("102", "Art", 90), subject("103", "Music", 50)];
        assert_eq!(s.average_mark(), 60.0);
        assert!(s.is_passing());
        assert_eq!(s.dominant_grade(), GradeBucket::Grade(Grade::HD));
    }

    #[test]
    fn passing_boundary_is_inclusive() {
        let mut s = student();
        s.subjects = vec![subject("101", "Maths", 49), subject("102", "Art", 51)];
        assert!(s.is_passing());
    }

    #[test]
    fn subject_create_derives_grade_from_mark() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..100 {
            let sub = Subject::create("Physics", &HashSet::new(), &mut rng).expect("create");
            assert!((0..=100).contains(&sub.mark));
            assert_eq!(sub.grade, grade_for(sub.mark));
            assert_eq!(sub.subject_id.len(), 3);
        }
    }

    #[test]
    fn fifth_subject_is_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut s = student();
        for name in ["A", "B", "C", "D"] {
            s.enroll(name, &mut rng).expect("enroll");
        }
        let err = s.enroll("E", &mut rng).expect_err("limit");
        assert!(matches!(err, StoreError::SubjectLimitReached { max: 4 }));
        assert_eq!(s.subjects.len(), 4);
    }

    #[test]
    fn duplicate_names_are_case_insensitive() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut s = student();
        s.enroll("Chemistry", &mut rng).expect("enroll");
        let err = s.enroll("  chemistry ", &mut rng).expect_err("duplicate");
        assert!(matches!(err, StoreError::DuplicateSubjectName(_)));
        assert_eq!(s.subjects.len(), 1);
    }

    #[test]
    fn blank_name_is_invalid() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut s = student();
        assert!(matches!(
            s.enroll("   ", &mut rng),
            Err(StoreError::InvalidInput(_))
        ));
    }

    #[test]
    fn add_subject_rejects_duplicate_id() {
        let mut s = student();
        s.add_subject(subject("200", "Biology", 70)).expect("first");
        let err = s.add_subject(subject("200", "History", 70)).expect_err("dup id");
        assert!(matches!(err, StoreError::DuplicateSubjectId(_)));
        assert_eq!(s.subjects.len(), 1);
    }

    #[test]
    fn remove_subject_by_id() {
        let mut s = student();
        s.subjects = vec![subject("101", "Maths", 40), subject("102", "Art", 90)];
        let removed = s.remove_subject_by_id("101").expect("remove");
        assert_eq!(removed.name, "Maths");
        assert_eq!(s.subjects.len(), 1);
        assert!(matches!(
            s.remove_subject_by_id("999"),
            Err(StoreError::SubjectNotFound(_))
        ));
    }

    #[test]
    fn summary_omits_password() {
        let s = student();
        let v = serde_json::to_value(s.summary()).expect("ser");
        assert!(v.get("password").is_none());
        assert_eq!(v.get("studentId").and_then(|x| x.as_str()), Some("123456"));
    }

    #[test]
    fn stored_shape_uses_snake_case_keys() {
        let mut s = student();
        s.subjects = vec![subject("101", "Maths", 88)];
        let v = serde_json::to_value(&s).expect("ser");
        assert_eq!(v["subjects"][0]["grade"], "HD");
        assert_eq!(v["subjects"][0]["mark"], 88);
        assert_eq!(v["student_id"], "123456");
    }
}
