//! Read-only access to the job and worker collections owned by other subsystems.
//!
//! Registries hand back raw rows validated into typed entities. Rows that fail validation
//! are reported next to the accepted records so a sweep can skip and log them once.

mod csv_file;
mod memory;
mod records;

pub use csv_file::{CsvJobRegistry, CsvWorkerRegistry};
pub use memory::{InMemoryJobRegistry, InMemoryWorkerRegistry};
pub use records::{JobRow, RecordError, WorkerRow};

use super::domain::{Job, Worker};

/// Source of job postings. Only `active` jobs take part in a sweep.
pub trait JobRegistry: Send + Sync {
    fn list_active(&self) -> Result<RegistrySnapshot<Job>, RegistryError>;
}

/// Source of worker profiles.
pub trait WorkerRegistry: Send + Sync {
    fn list_all(&self) -> Result<RegistrySnapshot<Worker>, RegistryError>;
}

/// Records accepted at the boundary plus the ones that were rejected.
#[derive(Debug, Clone)]
pub struct RegistrySnapshot<T> {
    pub records: Vec<T>,
    pub rejected: Vec<RejectedRecord>,
}

impl<T> RegistrySnapshot<T> {
    pub fn empty() -> Self {
        Self {
            records: Vec::new(),
            rejected: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Job,
    Worker,
}

impl RecordKind {
    pub const fn label(self) -> &'static str {
        match self {
            RecordKind::Job => "job",
            RecordKind::Worker => "worker",
        }
    }
}

/// A row that could not be turned into an entity. `reference` is the row id when one was
/// present, otherwise its position in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRecord {
    pub kind: RecordKind,
    pub reference: String,
    pub error: RecordError,
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("failed to read registry source: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid registry CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("registry unavailable: {0}")]
    Unavailable(String),
}
