use std::collections::BTreeSet;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{TimeZone, Utc};
use serde_json::Value;

use crate::matching::domain::{
    AccountId, EmployerId, Job, JobId, JobStatus, LanguageCode, Location, MatchId, MatchRecord,
    Notification, NotificationId, TradeType, Worker, WorkerId,
};
use crate::matching::engine::{AbortSignal, MatchingEngine, SweepError, SweepReport, SweepTrigger};
use crate::matching::notify::{Localizer, NotificationDispatcher, TemplateCache, TemplateCatalog};
use crate::matching::registry::{InMemoryJobRegistry, InMemoryWorkerRegistry};
use crate::matching::scheduler::SweepRunner;
use crate::matching::scoring::{CompatibilityScorer, ScoringConfig};
use crate::matching::store::{
    InMemoryMatchStore, InMemoryNotificationStore, MatchStore, NotificationStore, StoreError,
};

pub(crate) type MemoryEngine<M = InMemoryMatchStore, N = InMemoryNotificationStore> =
    MatchingEngine<InMemoryJobRegistry, InMemoryWorkerRegistry, M, N>;

pub(crate) fn job(id: &str, district: &str, state: &str, trade: &str, wage: u32) -> Job {
    Job {
        id: JobId::from(id),
        employer_id: EmployerId::from("emp-1"),
        title: format!("{trade} needed"),
        trade: TradeType(trade.to_string()),
        village: "Kiraoli".to_string(),
        location: Location::new(district, state),
        daily_wage: wage,
        contact_number: "9876500000".to_string(),
        status: JobStatus::Active,
        created_at: Utc.with_ymd_and_hms(2025, 1, 15, 9, 0, 0).unwrap(),
    }
}

pub(crate) fn worker(id: &str, district: &str, state: &str, trade: &str, wage: u32) -> Worker {
    Worker {
        id: WorkerId::from(id),
        account_id: AccountId::from(format!("user-{id}").as_str()),
        name: format!("Worker {id}"),
        phone_number: "9123400000".to_string(),
        location: Location::new(district, state),
        trade: TradeType(trade.to_string()),
        expected_daily_wage: wage,
        language: LanguageCode::default(),
        created_at: Utc.with_ymd_and_hms(2025, 1, 10, 9, 0, 0).unwrap(),
    }
}

pub(crate) fn speaking(mut worker: Worker, language: &str) -> Worker {
    worker.language = LanguageCode::new(language);
    worker
}

pub(crate) fn agra_mason_job() -> Job {
    job("job-agra", "Agra", "UP", "Mason", 500)
}

/// Six admissible pairs out of fifteen under the standard policy.
pub(crate) fn marketplace() -> (Vec<Job>, Vec<Worker>) {
    let jobs = vec![
        agra_mason_job(),
        job("job-pune", "Pune", "MH", "Welder", 700),
        job("job-lko", "Lucknow", "UP", "Painter", 450),
    ];
    let workers = vec![
        worker("w-raj", "Agra", "UP", "Mason", 500),
        worker("w-amit", "Delhi", "UP", "Labour", 800),
        worker("w-sita", "Lucknow", "UP", "Painter", 480),
        worker("w-ravi", "Nagpur", "MH", "Welder", 650),
        worker("w-anil", "Mathura", "UP", "Mason", 560),
    ];
    (jobs, workers)
}

pub(crate) fn localizer(capacity: usize) -> Localizer {
    let catalog = TemplateCatalog::builtin().expect("builtin templates load");
    Localizer::new(catalog, Arc::new(TemplateCache::new(capacity)))
}

pub(crate) fn engine_with<M, N>(
    jobs: &[Job],
    workers: &[Worker],
    matches: Arc<M>,
    notifications: Arc<N>,
    scoring: ScoringConfig,
) -> (MemoryEngine<M, N>, InMemoryJobRegistry)
where
    M: MatchStore + 'static,
    N: NotificationStore + 'static,
{
    let job_registry = InMemoryJobRegistry::with_jobs(jobs);
    let engine = MatchingEngine::new(
        Arc::new(job_registry.clone()),
        Arc::new(InMemoryWorkerRegistry::with_workers(workers)),
        matches,
        NotificationDispatcher::new(notifications, localizer(16)),
        CompatibilityScorer::new(scoring),
    );
    (engine, job_registry)
}

pub(crate) fn memory_engine(
    jobs: &[Job],
    workers: &[Worker],
) -> (
    MemoryEngine,
    Arc<InMemoryMatchStore>,
    Arc<InMemoryNotificationStore>,
) {
    let matches = Arc::new(InMemoryMatchStore::default());
    let notifications = Arc::new(InMemoryNotificationStore::default());
    let (engine, _) = engine_with(
        jobs,
        workers,
        matches.clone(),
        notifications.clone(),
        ScoringConfig::standard(),
    );
    (engine, matches, notifications)
}

/// Pairs and scores currently in the store, for comparing match sets.
pub(crate) fn match_set(store: &InMemoryMatchStore) -> BTreeSet<(String, String, u64)> {
    store
        .all()
        .expect("memory store readable")
        .into_iter()
        .map(|record| {
            (
                record.job_id.to_string(),
                record.worker_id.to_string(),
                record.score.to_bits(),
            )
        })
        .collect()
}

/// Match store that refuses writes for one worker and otherwise delegates.
#[derive(Default)]
pub(crate) struct FlakyMatchStore {
    pub(crate) inner: InMemoryMatchStore,
    pub(crate) failing_worker: String,
}

impl MatchStore for FlakyMatchStore {
    fn exists(&self, job_id: &JobId, worker_id: &WorkerId) -> Result<bool, StoreError> {
        self.inner.exists(job_id, worker_id)
    }

    fn insert(&self, record: MatchRecord) -> Result<MatchId, StoreError> {
        if record.worker_id.as_str() == self.failing_worker {
            return Err(StoreError::Unavailable("write timed out".to_string()));
        }
        self.inner.insert(record)
    }

    fn for_worker(&self, worker_id: &WorkerId) -> Result<Vec<MatchRecord>, StoreError> {
        self.inner.for_worker(worker_id)
    }

    fn for_job(&self, job_id: &JobId) -> Result<Vec<MatchRecord>, StoreError> {
        self.inner.for_job(job_id)
    }

    fn all(&self) -> Result<Vec<MatchRecord>, StoreError> {
        self.inner.all()
    }
}

pub(crate) struct UnavailableMatchStore;

impl MatchStore for UnavailableMatchStore {
    fn exists(&self, _job_id: &JobId, _worker_id: &WorkerId) -> Result<bool, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn insert(&self, _record: MatchRecord) -> Result<MatchId, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn for_worker(&self, _worker_id: &WorkerId) -> Result<Vec<MatchRecord>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn for_job(&self, _job_id: &JobId) -> Result<Vec<MatchRecord>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn all(&self) -> Result<Vec<MatchRecord>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }
}

pub(crate) struct UnavailableNotificationStore;

impl NotificationStore for UnavailableNotificationStore {
    fn insert(&self, _notification: Notification) -> Result<NotificationId, StoreError> {
        Err(StoreError::Unavailable("sms log offline".to_string()))
    }

    fn for_worker(&self, _worker_id: &WorkerId) -> Result<Vec<Notification>, StoreError> {
        Err(StoreError::Unavailable("sms log offline".to_string()))
    }
}

pub(crate) fn report(trigger: SweepTrigger, aborted: bool) -> SweepReport {
    let now = Utc::now();
    SweepReport {
        sweep_id: 1,
        trigger,
        strategy: "cross_product",
        started_at: now,
        finished_at: now,
        jobs: 0,
        workers: 0,
        evaluated: 0,
        skipped_existing: 0,
        below_threshold: 0,
        created: 0,
        duplicate_races: 0,
        failed_pairs: 0,
        notifications_sent: 0,
        notification_failures: 0,
        rejected_records: 0,
        aborted,
    }
}

/// Runner that blocks inside a sweep until released, or until asked to abort.
pub(crate) struct GatedRunner {
    release: Mutex<Receiver<()>>,
}

impl GatedRunner {
    pub(crate) fn new() -> (Self, Sender<()>) {
        let (sender, receiver) = mpsc::channel();
        (
            Self {
                release: Mutex::new(receiver),
            },
            sender,
        )
    }
}

impl SweepRunner for GatedRunner {
    fn run(&self, trigger: SweepTrigger, abort: &AbortSignal) -> Result<SweepReport, SweepError> {
        let release = self.release.lock().expect("gate mutex poisoned");
        loop {
            if abort.is_triggered() {
                return Ok(report(trigger, true));
            }
            match release.recv_timeout(std::time::Duration::from_millis(5)) {
                Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => {
                    return Ok(report(trigger, false))
                }
                Err(mpsc::RecvTimeoutError::Timeout) => {}
            }
        }
    }
}

pub(crate) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
