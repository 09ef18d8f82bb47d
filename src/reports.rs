use crate::grade::GradeBucket;
use crate::models::Student;

#[derive(Debug, Clone)]
pub struct GradeGroup {
    pub bucket: GradeBucket,
    pub students: Vec<Student>,
}

/// Bucket students by dominant grade. Every bucket is present, in
/// `GradeBucket::ALL` order, even when empty.
pub fn group_by_dominant_grade(students: &[Student]) -> Vec<GradeGroup> {
    let mut groups: Vec<GradeGroup> = GradeBucket::ALL
        .iter()
        .map(|b| GradeGroup {
            bucket: *b,
            students: Vec::new(),
        })
        .collect();
    for s in students {
        let bucket = s.dominant_grade();
        if let Some(g) = groups.iter_mut().find(|g| g.bucket == bucket) {
            g.students.push(s.clone());
        }
    }
    groups
}

/// Split into (passing, failing), keeping relative order.
pub fn partition_pass_fail(students: &[Student]) -> (Vec<Student>, Vec<Student>) {
    students.iter().cloned().partition(|s| s.is_passing())
}
