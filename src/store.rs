use crate::error::{StoreError, StoreResult};
use crate::grade::grade_for;
use crate::ids::{generate_unique_id, STUDENT_ID_LEN, SUBJECT_ID_LEN};
use crate::models::{Student, MAX_SUBJECTS_PER_STUDENT};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const DEFAULT_DATA_FILE: &str = "students.data";

/// What to do when the data file exists but does not parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorruptPolicy {
    /// Treat the file as an empty store; the next write replaces it.
    #[default]
    Reset,
    /// Surface `CorruptStore` and leave the file alone.
    Fail,
}

fn is_digit_id(id: &str, len: u32) -> bool {
    id.len() == len as usize && id.bytes().all(|b| b.is_ascii_digit())
}

/// Check a whole student list against the rules the store maintains:
/// unique ids and lower-cased unique emails, at most
/// `MAX_SUBJECTS_PER_STUDENT` subjects each, unique subject ids and
/// case-insensitive names per student, and every grade matching its mark.
pub fn validate_records(students: &[Student]) -> StoreResult<()> {
    let mut ids = HashSet::new();
    let mut emails = HashSet::new();
    for s in students {
        let bad = |msg: String| StoreError::CorruptStore(format!("student {}: {msg}", s.student_id));
        if !is_digit_id(&s.student_id, STUDENT_ID_LEN) {
            return Err(bad(format!("id must be {STUDENT_ID_LEN} digits")));
        }
        if !ids.insert(s.student_id.as_str()) {
            return Err(bad("duplicate student id".to_string()));
        }
        if s.email.is_empty() || s.email != s.email.to_lowercase() {
            return Err(bad(format!("email {:?} is not lower-case", s.email)));
        }
        if !emails.insert(s.email.as_str()) {
            return Err(bad(format!("duplicate email {}", s.email)));
        }
        if s.subjects.len() > MAX_SUBJECTS_PER_STUDENT {
            return Err(bad(format!(
                "{} subjects, at most {MAX_SUBJECTS_PER_STUDENT} allowed",
                s.subjects.len()
            )));
        }
        let mut subject_ids = HashSet::new();
        let mut names = HashSet::new();
        for sub in &s.subjects {
            if !is_digit_id(&sub.subject_id, SUBJECT_ID_LEN) {
                return Err(bad(format!("subject id {:?} must be {SUBJECT_ID_LEN} digits", sub.subject_id)));
            }
            if !subject_ids.insert(sub.subject_id.as_str()) {
                return Err(bad(format!("duplicate subject id {}", sub.subject_id)));
            }
            if !names.insert(sub.name.to_lowercase()) {
                return Err(bad(format!("duplicate subject name {:?}", sub.name)));
            }
            if !(0..=100).contains(&sub.mark) {
                return Err(bad(format!("mark {} out of range", sub.mark)));
            }
            if sub.grade != grade_for(sub.mark) {
                return Err(bad(format!(
                    "subject {} has grade {} but mark {}",
                    sub.subject_id, sub.grade, sub.mark
                )));
            }
        }
    }
    Ok(())
}

/// Parse and validate a serialized store document, returning the student
/// count. Used to vet replacement data before it reaches the data file.
pub fn check_store_document(bytes: &[u8]) -> StoreResult<usize> {
    let students: Vec<Student> = serde_json::from_slice(bytes)
        .map_err(|e| StoreError::CorruptStore(e.to_string()))?;
    validate_records(&students)?;
    Ok(students.len())
}

/// JSON-file-backed student collection.
///
/// Holds no records in memory: every call reads the file, and every mutation
/// rewrites it whole.
#[derive(Debug, Clone)]
pub struct RecordStore {
    path: PathBuf,
    on_corrupt: CorruptPolicy,
}

impl RecordStore {
    pub fn open(path: impl Into<PathBuf>, on_corrupt: CorruptPolicy) -> StoreResult<Self> {
        let store = Self {
            path: path.into(),
            on_corrupt,
        };
        if !store.path.exists() {
            if let Some(parent) = store.path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            store.write_all(&[])?;
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> StoreResult<Vec<Student>> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str::<Vec<Student>>(&text) {
            Ok(students) => Ok(students),
            Err(e) => match self.on_corrupt {
                CorruptPolicy::Reset => {
                    warn!(path = %self.path.display(), error = %e, "unreadable store file, treating as empty");
                    Ok(Vec::new())
                }
                CorruptPolicy::Fail => Err(StoreError::CorruptStore(e.to_string())),
            },
        }
    }

    // Written to a sibling temp file first so a crash leaves either the old
    // or the new document, never half of one.
    fn write_all(&self, students: &[Student]) -> StoreResult<()> {
        let text = serde_json::to_string_pretty(students)
            .map_err(|e| StoreError::Storage(std::io::Error::other(e)))?;
        let mut tmp_name = self.path.clone().into_os_string();
        tmp_name.push(".tmp");
        let tmp = PathBuf::from(tmp_name);
        {
            let mut f = File::create(&tmp)?;
            f.write_all(text.as_bytes())?;
            f.flush()?;
            f.sync_all()?;
        }
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    pub fn list_all(&self) -> StoreResult<Vec<Student>> {
        let students = self.read_all()?;
        debug!(count = students.len(), "listed students");
        Ok(students)
    }

    pub fn find_by_email(&self, email: &str) -> StoreResult<Option<Student>> {
        Ok(self.read_all()?.into_iter().find(|s| s.email == email))
    }

    pub fn find_by_id(&self, student_id: &str) -> StoreResult<Option<Student>> {
        Ok(self
            .read_all()?
            .into_iter()
            .find(|s| s.student_id == student_id))
    }

    /// Register a new student. `email` is compared exactly, so callers
    /// lower-case it first; `hashed_password` must already be hashed.
    pub fn add<R: Rng + ?Sized>(
        &self,
        first_name: &str,
        last_name: &str,
        email: &str,
        hashed_password: &str,
        rng: &mut R,
    ) -> StoreResult<Student> {
        let mut students = self.read_all()?;
        if students.iter().any(|s| s.email == email) {
            return Err(StoreError::DuplicateEmail(email.to_string()));
        }
        let existing: HashSet<String> = students.iter().map(|s| s.student_id.clone()).collect();
        let student_id = generate_unique_id(&existing, STUDENT_ID_LEN, rng)?;
        let student = Student {
            student_id,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: email.to_string(),
            password: hashed_password.to_string(),
            subjects: Vec::new(),
        };
        students.push(student.clone());
        self.write_all(&students)?;
        info!(student_id = %student.student_id, "student added");
        Ok(student)
    }

    /// Replace the stored record with the same id.
    pub fn update(&self, record: &Student) -> StoreResult<()> {
        let mut students = self.read_all()?;
        let slot = students
            .iter_mut()
            .find(|s| s.student_id == record.student_id)
            .ok_or_else(|| StoreError::NotFound(record.student_id.clone()))?;
        *slot = record.clone();
        self.write_all(&students)?;
        debug!(student_id = %record.student_id, "student updated");
        Ok(())
    }

    /// Replace the record with the same id, or append it if absent.
    #[allow(dead_code)]
    pub fn upsert(&self, record: &Student) -> StoreResult<()> {
        let mut students = self.read_all()?;
        match students
            .iter_mut()
            .find(|s| s.student_id == record.student_id)
        {
            Some(slot) => *slot = record.clone(),
            None => students.push(record.clone()),
        }
        self.write_all(&students)
    }

    pub fn remove(&self, student_id: &str) -> StoreResult<()> {
        let students = self.read_all()?;
        let before = students.len();
        let kept: Vec<Student> = students
            .into_iter()
            .filter(|s| s.student_id != student_id)
            .collect();
        if kept.len() == before {
            return Err(StoreError::NotFound(student_id.to_string()));
        }
        self.write_all(&kept)?;
        info!(student_id, "student removed");
        Ok(())
    }

    pub fn clear(&self) -> StoreResult<()> {
        self.write_all(&[])?;
        info!(path = %self.path.display(), "store cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Subject;
    use serde_json::json;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(prefix: &str) -> PathBuf {
        let p = std::env::temp_dir().join(format!(
            "{}-{}",
            prefix,
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .expect("clock")
                .as_nanos()
        ));
        std::fs::create_dir_all(&p).expect("create temp dir");
        p
    }

    fn open(prefix: &str) -> (PathBuf, RecordStore) {
        let dir = temp_dir(prefix);
        let store = RecordStore::open(dir.join(DEFAULT_DATA_FILE), CorruptPolicy::Reset)
            .expect("open store");
        (dir, store)
    }

    #[test]
    fn open_creates_empty_array_file() {
        let (dir, store) = open("uniapp-store-open");
        let text = std::fs::read_to_string(store.path()).expect("read");
        assert_eq!(text.trim(), "[]");
        assert!(store.list_all().expect("list").is_empty());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn add_then_find_returns_same_record() {
        let (dir, store) = open("uniapp-store-add");
        let mut rng = StdRng::seed_from_u64(1);
        let added = store
            .add("Ada", "Lovelace", "ada.lovelace@university.com", "h1", &mut rng)
            .expect("add");
        assert_eq!(added.student_id.len(), 6);
        assert_eq!(store.find_by_id(&added.student_id).expect("find"), Some(added.clone()));
        assert_eq!(
            store
                .find_by_email("ada.lovelace@university.com")
                .expect("find"),
            Some(added)
        );
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn duplicate_email_leaves_store_unchanged() {
        let (dir, store) = open("uniapp-store-dup");
        let mut rng = StdRng::seed_from_u64(2);
        for (i, email) in ["a.a@u.com", "b.b@u.com", "c.c@u.com"].iter().enumerate() {
            store.add("F", "L", email, "h", &mut rng).expect("add");
            assert_eq!(store.list_all().expect("list").len(), i + 1);
        }
        let before = std::fs::read_to_string(store.path()).expect("read");
        let err = store
            .add("X", "Y", "b.b@u.com", "h", &mut rng)
            .expect_err("duplicate");
        assert!(matches!(err, StoreError::DuplicateEmail(_)));
        assert_eq!(std::fs::read_to_string(store.path()).expect("read"), before);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn update_is_strict_and_upsert_appends() {
        let (dir, store) = open("uniapp-store-update");
        let mut rng = StdRng::seed_from_u64(3);
        let mut s = store.add("A", "B", "a.b@u.com", "h", &mut rng).expect("add");
        s.subjects.push(Subject {
            subject_id: "101".into(),
            name: "Maths".into(),
            mark: 77,
            grade: grade_for(77),
        });
        store.update(&s).expect("update");
        assert_eq!(store.find_by_id(&s.student_id).expect("find"), Some(s.clone()));

        let mut ghost = s.clone();
        ghost.student_id = "999999".into();
        ghost.email = "ghost@u.com".into();
        assert!(matches!(store.update(&ghost), Err(StoreError::NotFound(_))));
        assert_eq!(store.list_all().expect("list").len(), 1);

        store.upsert(&ghost).expect("upsert");
        assert_eq!(store.list_all().expect("list").len(), 2);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn remove_and_clear() {
        let (dir, store) = open("uniapp-store-remove");
        let mut rng = StdRng::seed_from_u64(4);
        let s = store.add("A", "B", "a.b@u.com", "h", &mut rng).expect("add");
        assert!(matches!(store.remove("000000"), Err(StoreError::NotFound(_))));
        assert_eq!(store.list_all().expect("list").len(), 1);
        store.remove(&s.student_id).expect("remove");
        assert!(store.list_all().expect("list").is_empty());

        store.add("C", "D", "c.d@u.com", "h", &mut rng).expect("add");
        store.clear().expect("clear");
        assert!(store.list_all().expect("list").is_empty());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn reload_preserves_every_field() {
        let (dir, store) = open("uniapp-store-reload");
        let mut rng = StdRng::seed_from_u64(5);
        let mut expected = Vec::new();
        for i in 0..5 {
            let mut s = store
                .add("F", "L", &format!("s{i}@u.com"), "hash", &mut rng)
                .expect("add");
            s.enroll("Maths", &mut rng).expect("enroll");
            s.enroll("Art", &mut rng).expect("enroll");
            store.update(&s).expect("update");
            expected.push(s);
        }
        let reopened = RecordStore::open(store.path(), CorruptPolicy::Fail).expect("reopen");
        assert_eq!(reopened.list_all().expect("list"), expected);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn corrupt_file_policy() {
        let (dir, store) = open("uniapp-store-corrupt");
        std::fs::write(store.path(), "{ not json").expect("corrupt");
        assert!(store.list_all().expect("reset reads empty").is_empty());

        let strict = RecordStore::open(store.path(), CorruptPolicy::Fail).expect("open");
        assert!(matches!(strict.list_all(), Err(StoreError::CorruptStore(_))));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn missing_file_reads_empty() {
        let (dir, store) = open("uniapp-store-missing");
        std::fs::remove_file(store.path()).expect("remove");
        assert!(store.list_all().expect("list").is_empty());
        let _ = std::fs::remove_dir_all(dir);
    }

    fn record(id: &str, email: &str, subjects: serde_json::Value) -> serde_json::Value {
        json!({
            "student_id": id,
            "first_name": "F",
            "last_name": "L",
            "email": email,
            "password": "h",
            "subjects": subjects,
        })
    }

    fn check(doc: serde_json::Value) -> StoreResult<usize> {
        check_store_document(doc.to_string().as_bytes())
    }

    #[test]
    fn store_document_check_accepts_written_data() {
        let (dir, store) = open("uniapp-store-check");
        let mut rng = StdRng::seed_from_u64(6);
        for i in 0..3 {
            let mut s = store
                .add("F", "L", &format!("s{i}@u.com"), "hash", &mut rng)
                .expect("add");
            for name in ["Maths", "Art", "Music", "Law"] {
                s.enroll(name, &mut rng).expect("enroll");
            }
            store.update(&s).expect("update");
        }
        let bytes = std::fs::read(store.path()).expect("read");
        assert_eq!(check_store_document(&bytes).expect("valid"), 3);
        assert_eq!(check(json!([])).expect("empty"), 0);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn store_document_check_rejects_broken_records() {
        let maths = json!({ "subject_id": "101", "name": "Maths", "mark": 91, "grade": "HD" });
        let cases = [
            ("not students", json!([{ "foo": 1 }, { "bar": 2 }])),
            ("not a list", json!({ "student_id": "111111" })),
            (
                "duplicate id",
                json!([record("111111", "a@u.com", json!([])), record("111111", "b@u.com", json!([]))]),
            ),
            (
                "duplicate email",
                json!([record("111111", "a@u.com", json!([])), record("222222", "a@u.com", json!([]))]),
            ),
            ("upper-case email", json!([record("111111", "A@u.com", json!([]))])),
            ("short id", json!([record("11", "a@u.com", json!([]))])),
            (
                "too many subjects",
                json!([record("111111", "a@u.com", json!([
                    { "subject_id": "101", "name": "A", "mark": 50, "grade": "P" },
                    { "subject_id": "102", "name": "B", "mark": 50, "grade": "P" },
                    { "subject_id": "103", "name": "C", "mark": 50, "grade": "P" },
                    { "subject_id": "104", "name": "D", "mark": 50, "grade": "P" },
                    { "subject_id": "105", "name": "E", "mark": 50, "grade": "P" }
                ]))]),
            ),
            (
                "duplicate subject id",
                json!([record("111111", "a@u.com", json!([
                    maths.clone(),
                    { "subject_id": "101", "name": "Art", "mark": 91, "grade": "HD" }
                ]))]),
            ),
            (
                "duplicate subject name",
                json!([record("111111", "a@u.com", json!([
                    maths.clone(),
                    { "subject_id": "102", "name": "maths", "mark": 91, "grade": "HD" }
                ]))]),
            ),
            (
                "grade does not match mark",
                json!([record("111111", "a@u.com", json!([
                    { "subject_id": "101", "name": "Maths", "mark": 40, "grade": "HD" }
                ]))]),
            ),
            (
                "mark out of range",
                json!([record("111111", "a@u.com", json!([
                    { "subject_id": "101", "name": "Maths", "mark": 140, "grade": "HD" }
                ]))]),
            ),
        ];
        for (label, doc) in cases {
            assert!(
                matches!(check(doc), Err(StoreError::CorruptStore(_))),
                "{label} should be rejected"
            );
        }
        assert_eq!(check(json!([record("111111", "a@u.com", json!([maths]))])).expect("valid"), 1);
    }
}
