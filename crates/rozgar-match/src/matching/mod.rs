//! Periodic job ↔ worker matching.
//!
//! A sweep reads active jobs and all workers from their registries, walks candidate pairs,
//! skips pairs that already have a match, scores the rest, and persists and announces the
//! ones at or above the admission threshold. Sweeps are driven by [`SweepScheduler`] and
//! never overlap.

pub mod candidates;
pub mod domain;
pub mod engine;
pub mod notify;
pub mod registry;
pub mod router;
pub mod scheduler;
pub mod scoring;
pub mod store;

#[cfg(test)]
mod tests;

pub use candidates::{select_strategy, CandidateStrategy, CrossProduct, IndexedCandidates};
pub use domain::{
    AccountId, DeliveryStatus, EmployerId, Job, JobId, JobStatus, LanguageCode, Location,
    MatchId, MatchRecord, MatchStatus, Notification, NotificationChannel, NotificationId,
    PairKey, TradeType, Worker, WorkerId,
};
pub use engine::{AbortSignal, MatchingEngine, SweepError, SweepReport, SweepTrigger};
pub use notify::{
    Localizer, LocalizationError, NotificationDispatcher, NotificationError, NotificationFields,
    TemplateCache, TemplateCatalog, JOB_MATCH_TEMPLATE,
};
pub use registry::{
    CsvJobRegistry, CsvWorkerRegistry, InMemoryJobRegistry, InMemoryWorkerRegistry,
    JobRegistry, RegistryError, RegistrySnapshot, WorkerRegistry,
};
pub use router::{matching_router, MatchingApi};
pub use scheduler::{
    SchedulerError, SchedulerState, SchedulerStatus, StopMode, SweepRunner, SweepScheduler,
};
pub use scoring::{CompatibilityScore, CompatibilityScorer, ScoreFactor, ScoringConfig};
pub use store::{
    InMemoryMatchStore, InMemoryNotificationStore, JsonlMatchStore, JsonlNotificationStore,
    MatchStore, NotificationStore, StoreError,
};
