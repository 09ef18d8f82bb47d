use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("email already registered: {0}")]
    DuplicateEmail(String),
    #[error("student not found: {0}")]
    NotFound(String),
    #[error("students can enroll in {max} subjects only")]
    SubjectLimitReached { max: usize },
    #[error("already enrolled in a subject named {0:?}")]
    DuplicateSubjectName(String),
    #[error("subject id already in use: {0}")]
    DuplicateSubjectId(String),
    #[error("subject not found: {0}")]
    SubjectNotFound(String),
    #[error("no free {length}-digit ids left")]
    CapacityExhausted { length: u32 },
    #[error("incorrect email or password")]
    InvalidCredentials,
    #[error("passwords do not match")]
    PasswordMismatch,
    #[error("{0}")]
    InvalidInput(String),
    #[error("store file is not a valid student list: {0}")]
    CorruptStore(String),
    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),
    #[error("credential error: {0}")]
    Credential(String),
}

impl StoreError {
    /// Stable error code sent over IPC.
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::DuplicateEmail(_) => "duplicate_email",
            StoreError::NotFound(_) => "not_found",
            StoreError::SubjectLimitReached { .. } => "subject_limit_reached",
            StoreError::DuplicateSubjectName(_) => "duplicate_subject_name",
            StoreError::DuplicateSubjectId(_) => "duplicate_subject_id",
            StoreError::SubjectNotFound(_) => "subject_not_found",
            StoreError::CapacityExhausted { .. } => "capacity_exhausted",
            StoreError::InvalidCredentials => "invalid_credentials",
            StoreError::PasswordMismatch => "password_mismatch",
            StoreError::InvalidInput(_) => "invalid_input",
            StoreError::CorruptStore(_) => "corrupt_store",
            StoreError::Storage(_) => "storage_error",
            StoreError::Credential(_) => "credential_error",
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
