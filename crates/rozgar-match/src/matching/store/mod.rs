//! Persistence for the records the engine owns: matches and notifications.
//!
//! The `(job_id, worker_id)` uniqueness of matches is enforced inside each store's insert,
//! atomically, so concurrent sweeps racing on one pair resolve to a single winner.

mod jsonl;
mod memory;

pub use jsonl::{JsonlMatchStore, JsonlNotificationStore};
pub use memory::{InMemoryMatchStore, InMemoryNotificationStore};

use std::cmp::Ordering;
use std::path::PathBuf;

use super::domain::{JobId, MatchId, MatchRecord, Notification, NotificationId, WorkerId};

pub trait MatchStore: Send + Sync {
    fn exists(&self, job_id: &JobId, worker_id: &WorkerId) -> Result<bool, StoreError>;

    /// Fails with [`StoreError::DuplicateKey`] when the pair already has a match.
    fn insert(&self, record: MatchRecord) -> Result<MatchId, StoreError>;

    /// Matches for a worker, best score first.
    fn for_worker(&self, worker_id: &WorkerId) -> Result<Vec<MatchRecord>, StoreError>;

    /// Matches for a job, best score first.
    fn for_job(&self, job_id: &JobId) -> Result<Vec<MatchRecord>, StoreError>;

    fn all(&self) -> Result<Vec<MatchRecord>, StoreError>;

    fn count_for_job(&self, job_id: &JobId) -> Result<usize, StoreError> {
        self.for_job(job_id).map(|matches| matches.len())
    }
}

pub trait NotificationStore: Send + Sync {
    fn insert(&self, notification: Notification) -> Result<NotificationId, StoreError>;

    /// Notifications for a worker, newest first.
    fn for_worker(&self, worker_id: &WorkerId) -> Result<Vec<Notification>, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("a match already exists for job {job_id} and worker {worker_id}")]
    DuplicateKey { job_id: JobId, worker_id: WorkerId },
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store io failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("{path}:{line} is not a valid record: {source}")]
    Corrupt {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, StoreError::DuplicateKey { .. })
    }
}

pub(crate) fn by_score_desc(left: &MatchRecord, right: &MatchRecord) -> Ordering {
    right
        .score
        .total_cmp(&left.score)
        .then_with(|| left.created_at.cmp(&right.created_at))
        .then_with(|| left.id.cmp(&right.id))
}

pub(crate) fn newest_first(left: &Notification, right: &Notification) -> Ordering {
    right
        .sent_at
        .cmp(&left.sent_at)
        .then_with(|| left.id.cmp(&right.id))
}
