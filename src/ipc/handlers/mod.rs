pub mod admin;
pub mod backup;
pub mod core;
pub mod students;
pub mod subjects;
