use crate::credentials::CredentialHasher;
use crate::error::{StoreError, StoreResult};
use crate::models::{EnrollmentSummary, Student, StudentSummary, Subject};
use crate::reports::{group_by_dominant_grade, partition_pass_fail, GradeGroup};
use crate::store::RecordStore;
use rand::Rng;
use tracing::{info, warn};

/// A logged-in student. Only `student_id` is trusted; records are always
/// re-read from the store before they are changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub student_id: String,
}

fn require(field: &str, value: &str) -> StoreResult<()> {
    if value.trim().is_empty() {
        return Err(StoreError::InvalidInput(format!("{field} must not be empty")));
    }
    Ok(())
}

pub struct StudentService<'a> {
    store: &'a RecordStore,
    hasher: &'a dyn CredentialHasher,
}

impl<'a> StudentService<'a> {
    pub fn new(store: &'a RecordStore, hasher: &'a dyn CredentialHasher) -> Self {
        Self { store, hasher }
    }

    fn fetch(&self, session: &Session) -> StoreResult<Student> {
        self.store
            .find_by_id(&session.student_id)?
            .ok_or_else(|| StoreError::NotFound(session.student_id.clone()))
    }

    pub fn register<R: Rng + ?Sized>(
        &self,
        first_name: &str,
        last_name: &str,
        email: &str,
        password: &str,
        rng: &mut R,
    ) -> StoreResult<Student> {
        require("first name", first_name)?;
        require("last name", last_name)?;
        require("email", email)?;
        require("password", password)?;
        let email = email.trim().to_lowercase();
        // Checked before hashing so a duplicate costs nothing.
        if self.store.find_by_email(&email)?.is_some() {
            return Err(StoreError::DuplicateEmail(email));
        }
        let hashed = self.hasher.hash(password)?;
        self.store
            .add(first_name.trim(), last_name.trim(), &email, &hashed, rng)
    }

    pub fn login(&self, email: &str, password: &str) -> StoreResult<Student> {
        require("email", email)?;
        require("password", password)?;
        let email = email.trim().to_lowercase();
        let student = self
            .store
            .find_by_email(&email)?
            .ok_or_else(|| StoreError::NotFound(email.clone()))?;
        if !self.hasher.verify(password, &student.password) {
            warn!(student_id = %student.student_id, "password rejected");
            return Err(StoreError::InvalidCredentials);
        }
        info!(student_id = %student.student_id, "student logged in");
        Ok(student)
    }

    pub fn enroll_subject<R: Rng + ?Sized>(
        &self,
        session: &Session,
        name: &str,
        rng: &mut R,
    ) -> StoreResult<(Student, Subject)> {
        let mut fresh = self.fetch(session)?;
        let subject = fresh.enroll(name, rng)?;
        self.store.update(&fresh)?;
        info!(
            student_id = %fresh.student_id,
            subject_id = %subject.subject_id,
            mark = subject.mark,
            "subject enrolled"
        );
        Ok((fresh, subject))
    }

    pub fn remove_subject(&self, session: &Session, subject_id: &str) -> StoreResult<Student> {
        require("subject id", subject_id)?;
        let mut fresh = self.fetch(session)?;
        fresh.remove_subject_by_id(subject_id.trim())?;
        self.store.update(&fresh)?;
        info!(student_id = %fresh.student_id, subject_id, "subject removed");
        Ok(fresh)
    }

    pub fn change_password(
        &self,
        session: &Session,
        new_password: &str,
        confirm_password: &str,
    ) -> StoreResult<Student> {
        if new_password != confirm_password {
            return Err(StoreError::PasswordMismatch);
        }
        require("password", new_password)?;
        let mut fresh = self.fetch(session)?;
        fresh.password = self.hasher.hash(new_password)?;
        self.store.update(&fresh)?;
        info!(student_id = %fresh.student_id, "password changed");
        Ok(fresh)
    }

    pub fn enrollment(&self, session: &Session) -> StoreResult<EnrollmentSummary> {
        Ok(self.fetch(session)?.enrollment())
    }
}

pub struct AdminService<'a> {
    store: &'a RecordStore,
}

impl<'a> AdminService<'a> {
    pub fn new(store: &'a RecordStore) -> Self {
        Self { store }
    }

    pub fn list_students(&self) -> StoreResult<Vec<StudentSummary>> {
        Ok(self
            .store
            .list_all()?
            .iter()
            .map(Student::summary)
            .collect())
    }

    pub fn remove_student(&self, student_id: &str) -> StoreResult<()> {
        require("student id", student_id)?;
        self.store.remove(student_id.trim())
    }

    pub fn group_by_grade(&self) -> StoreResult<Vec<GradeGroup>> {
        Ok(group_by_dominant_grade(&self.store.list_all()?))
    }

    pub fn partition_pass_fail(&self) -> StoreResult<(Vec<Student>, Vec<Student>)> {
        Ok(partition_pass_fail(&self.store.list_all()?))
    }

    pub fn clear_all(&self) -> StoreResult<()> {
        self.store.clear()
    }
}
