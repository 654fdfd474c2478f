use chrono::{TimeZone, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use rozgar_match::config::MatchingConfig;
use rozgar_match::error::AppError;
use rozgar_match::matching::{
    AccountId, CompatibilityScorer, CsvJobRegistry, CsvWorkerRegistry, EmployerId,
    InMemoryJobRegistry, InMemoryMatchStore, InMemoryNotificationStore, InMemoryWorkerRegistry,
    Job, JobId, JobRegistry, JobStatus, JsonlMatchStore, JsonlNotificationStore, LanguageCode,
    Localizer, Location, MatchId, MatchRecord, MatchStore, MatchingEngine, Notification,
    NotificationDispatcher, NotificationId, NotificationStore, RegistryError, RegistrySnapshot,
    ScoringConfig, StoreError, TemplateCache, TemplateCatalog, TradeType, Worker, WorkerId,
    WorkerRegistry,
};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type ServiceEngine = MatchingEngine<
    ServiceJobRegistry,
    ServiceWorkerRegistry,
    ServiceMatchStore,
    ServiceNotificationStore,
>;

/// Job source chosen at startup: a CSV export when configured, otherwise an in-memory table.
pub(crate) enum ServiceJobRegistry {
    Csv(CsvJobRegistry),
    Memory(InMemoryJobRegistry),
}

impl JobRegistry for ServiceJobRegistry {
    fn list_active(&self) -> Result<RegistrySnapshot<Job>, RegistryError> {
        match self {
            Self::Csv(registry) => registry.list_active(),
            Self::Memory(registry) => registry.list_active(),
        }
    }
}

pub(crate) enum ServiceWorkerRegistry {
    Csv(CsvWorkerRegistry),
    Memory(InMemoryWorkerRegistry),
}

impl WorkerRegistry for ServiceWorkerRegistry {
    fn list_all(&self) -> Result<RegistrySnapshot<Worker>, RegistryError> {
        match self {
            Self::Csv(registry) => registry.list_all(),
            Self::Memory(registry) => registry.list_all(),
        }
    }
}

/// Match store chosen at startup: JSON-lines files under `MATCH_STORE_DIR`, or memory.
pub(crate) enum ServiceMatchStore {
    Jsonl(JsonlMatchStore),
    Memory(InMemoryMatchStore),
}

impl MatchStore for ServiceMatchStore {
    fn exists(&self, job_id: &JobId, worker_id: &WorkerId) -> Result<bool, StoreError> {
        match self {
            Self::Jsonl(store) => store.exists(job_id, worker_id),
            Self::Memory(store) => store.exists(job_id, worker_id),
        }
    }

    fn insert(&self, record: MatchRecord) -> Result<MatchId, StoreError> {
        match self {
            Self::Jsonl(store) => store.insert(record),
            Self::Memory(store) => store.insert(record),
        }
    }

    fn for_worker(&self, worker_id: &WorkerId) -> Result<Vec<MatchRecord>, StoreError> {
        match self {
            Self::Jsonl(store) => store.for_worker(worker_id),
            Self::Memory(store) => store.for_worker(worker_id),
        }
    }

    fn for_job(&self, job_id: &JobId) -> Result<Vec<MatchRecord>, StoreError> {
        match self {
            Self::Jsonl(store) => store.for_job(job_id),
            Self::Memory(store) => store.for_job(job_id),
        }
    }

    fn all(&self) -> Result<Vec<MatchRecord>, StoreError> {
        match self {
            Self::Jsonl(store) => store.all(),
            Self::Memory(store) => store.all(),
        }
    }

    fn count_for_job(&self, job_id: &JobId) -> Result<usize, StoreError> {
        match self {
            Self::Jsonl(store) => store.count_for_job(job_id),
            Self::Memory(store) => store.count_for_job(job_id),
        }
    }
}

pub(crate) enum ServiceNotificationStore {
    Jsonl(JsonlNotificationStore),
    Memory(InMemoryNotificationStore),
}

impl NotificationStore for ServiceNotificationStore {
    fn insert(&self, notification: Notification) -> Result<NotificationId, StoreError> {
        match self {
            Self::Jsonl(store) => store.insert(notification),
            Self::Memory(store) => store.insert(notification),
        }
    }

    fn for_worker(&self, worker_id: &WorkerId) -> Result<Vec<Notification>, StoreError> {
        match self {
            Self::Jsonl(store) => store.for_worker(worker_id),
            Self::Memory(store) => store.for_worker(worker_id),
        }
    }
}

/// Wires registries, stores, templates, and the scorer from configuration. Registries without
/// a CSV source start empty, or with the sample marketplace when `seed_samples` is set.
pub(crate) fn build_engine(
    config: &MatchingConfig,
    seed_samples: bool,
) -> Result<ServiceEngine, AppError> {
    let jobs = match &config.jobs_csv {
        Some(path) => ServiceJobRegistry::Csv(CsvJobRegistry::new(path)),
        None if seed_samples => {
            ServiceJobRegistry::Memory(InMemoryJobRegistry::with_jobs(&sample_jobs()))
        }
        None => ServiceJobRegistry::Memory(InMemoryJobRegistry::default()),
    };
    let default_language = LanguageCode::new(&config.default_language);
    let workers = match &config.workers_csv {
        Some(path) => ServiceWorkerRegistry::Csv(
            CsvWorkerRegistry::new(path).with_default_language(default_language),
        ),
        None => {
            let registry = if seed_samples {
                InMemoryWorkerRegistry::with_workers(&sample_workers())
            } else {
                InMemoryWorkerRegistry::default()
            };
            ServiceWorkerRegistry::Memory(registry.with_default_language(default_language))
        }
    };
    let (matches, notifications) = match &config.store_dir {
        Some(dir) => (
            ServiceMatchStore::Jsonl(JsonlMatchStore::open(dir.join("matches.jsonl"))?),
            ServiceNotificationStore::Jsonl(JsonlNotificationStore::open(
                dir.join("notifications.jsonl"),
            )?),
        ),
        None => (
            ServiceMatchStore::Memory(InMemoryMatchStore::default()),
            ServiceNotificationStore::Memory(InMemoryNotificationStore::default()),
        ),
    };

    Ok(MatchingEngine::new(
        Arc::new(jobs),
        Arc::new(workers),
        Arc::new(matches),
        NotificationDispatcher::new(Arc::new(notifications), localizer(config)?),
        scorer(config),
    )
    .with_concurrency(config.sweep_concurrency))
}

pub(crate) fn localizer(config: &MatchingConfig) -> Result<Localizer, AppError> {
    let catalog = TemplateCatalog::from_config(config)?;
    let cache = Arc::new(TemplateCache::new(config.template_cache_capacity));
    Ok(Localizer::new(catalog, cache))
}

pub(crate) fn scorer(config: &MatchingConfig) -> CompatibilityScorer {
    CompatibilityScorer::new(ScoringConfig::standard().with_threshold(config.admission_threshold))
}

pub(crate) fn sample_jobs() -> Vec<Job> {
    let posted = Utc.with_ymd_and_hms(2025, 1, 15, 8, 30, 0).single();
    [
        ("job-agra-wall", "Boundary wall repair", "Mason", "Kiraoli", "Agra", 500),
        ("job-lko-paint", "House painting", "Painter", "Malihabad", "Lucknow", 450),
        ("job-agra-load", "Warehouse loading", "Labour", "Sikandra", "Agra", 400),
    ]
    .into_iter()
    .map(|(id, title, trade, village, district, wage)| Job {
        id: JobId::from(id),
        employer_id: EmployerId::from("emp-demo"),
        title: title.to_string(),
        trade: TradeType(trade.to_string()),
        village: village.to_string(),
        location: Location::new(district, "Uttar Pradesh"),
        daily_wage: wage,
        contact_number: "9876543210".to_string(),
        status: JobStatus::Active,
        created_at: posted.unwrap_or_else(Utc::now),
    })
    .collect()
}

pub(crate) fn sample_workers() -> Vec<Worker> {
    vec![
        sample_worker("w-raj", "Raj Kumar", "Agra", "Mason", 500, "hi"),
        sample_worker("w-amit", "Amit Singh", "Delhi", "Labour", 800, "en"),
        sample_worker("w-sita", "Sita Devi", "Lucknow", "Painter", 480, "en"),
        sample_worker("w-zaid", "Zaid Khan", "Agra", "Labour", 420, "ur"),
    ]
}

fn sample_worker(
    id: &str,
    name: &str,
    district: &str,
    trade: &str,
    wage: u32,
    language: &str,
) -> Worker {
    let state = if district == "Delhi" {
        "Delhi"
    } else {
        "Uttar Pradesh"
    };
    Worker {
        id: WorkerId::from(id),
        account_id: AccountId::from(format!("user-{id}").as_str()),
        name: name.to_string(),
        phone_number: "9123456780".to_string(),
        location: Location::new(district, state),
        trade: TradeType(trade.to_string()),
        expected_daily_wage: wage,
        language: LanguageCode::new(language),
        created_at: Utc::now(),
    }
}
