use std::sync::{Arc, RwLock};

use super::super::domain::{Job, JobId, JobStatus, LanguageCode, Worker};
use super::records::{partition, JobRow, WorkerRow};
use super::{JobRegistry, RegistryError, RegistrySnapshot, WorkerRegistry};

/// Document-style job collection held in memory. Rows are validated on every read, the
/// same way a database-backed registry would.
#[derive(Debug, Default, Clone)]
pub struct InMemoryJobRegistry {
    rows: Arc<RwLock<Vec<JobRow>>>,
}

impl InMemoryJobRegistry {
    pub fn with_jobs(jobs: &[Job]) -> Self {
        let registry = Self::default();
        for job in jobs {
            registry.insert_job(job);
        }
        registry
    }

    pub fn insert_job(&self, job: &Job) {
        self.insert_row(JobRow::from(job));
    }

    pub fn insert_row(&self, row: JobRow) {
        self.rows
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(row);
    }

    /// Flips a posting's lifecycle status. Returns false when the id is unknown.
    pub fn set_status(&self, job_id: &JobId, status: JobStatus) -> bool {
        let mut rows = self
            .rows
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut found = false;
        for row in rows
            .iter_mut()
            .filter(|row| row.job_id.as_deref() == Some(job_id.as_str()))
        {
            row.status = Some(status.label().to_string());
            found = true;
        }
        found
    }
}

impl JobRegistry for InMemoryJobRegistry {
    fn list_active(&self) -> Result<RegistrySnapshot<Job>, RegistryError> {
        let rows = self
            .rows
            .read()
            .map_err(|_| RegistryError::Unavailable("job registry lock poisoned".to_string()))?
            .clone();

        let (jobs, rejected) = partition(rows.into_iter().enumerate(), |(position, row)| {
            let fallback = row.clone();
            row.validate()
                .map_err(|error| fallback.reject(position, error))
        });

        Ok(RegistrySnapshot {
            records: jobs.into_iter().filter(Job::is_active).collect(),
            rejected,
        })
    }
}

/// In-memory worker profile collection.
#[derive(Debug, Default, Clone)]
pub struct InMemoryWorkerRegistry {
    rows: Arc<RwLock<Vec<WorkerRow>>>,
    default_language: LanguageCode,
}

impl InMemoryWorkerRegistry {
    /// Language given to rows inserted without one.
    pub fn with_default_language(mut self, language: LanguageCode) -> Self {
        self.default_language = language;
        self
    }

    pub fn with_workers(workers: &[Worker]) -> Self {
        let registry = Self::default();
        for worker in workers {
            registry.insert_worker(worker);
        }
        registry
    }

    pub fn insert_worker(&self, worker: &Worker) {
        self.insert_row(WorkerRow::from(worker));
    }

    pub fn insert_row(&self, row: WorkerRow) {
        self.rows
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(row);
    }
}

impl WorkerRegistry for InMemoryWorkerRegistry {
    fn list_all(&self) -> Result<RegistrySnapshot<Worker>, RegistryError> {
        let rows = self
            .rows
            .read()
            .map_err(|_| RegistryError::Unavailable("worker registry lock poisoned".to_string()))?
            .clone();

        let (records, rejected) = partition(rows.into_iter().enumerate(), |(position, row)| {
            let fallback = row.clone();
            row.validate_with(&self.default_language)
                .map_err(|error| fallback.reject(position, error))
        });

        Ok(RegistrySnapshot { records, rejected })
    }
}
