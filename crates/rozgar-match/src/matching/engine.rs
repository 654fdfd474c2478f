//! One sweep: read both registries, walk candidate pairs on a bounded pool of threads,
//! and admit, persist, and announce new matches.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::telemetry;

use super::candidates::{select_strategy, CandidatePair, CandidateStrategy, CrossProduct};
use super::domain::{Job, MatchRecord, Worker};
use super::notify::{Localizer, NotificationDispatcher};
use super::registry::{JobRegistry, RegistryError, RejectedRecord, WorkerRegistry};
use super::scoring::CompatibilityScorer;
use super::store::{MatchStore, NotificationStore};

/// What started a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepTrigger {
    Scheduled,
    Manual,
    Cli,
}

impl SweepTrigger {
    pub const fn label(self) -> &'static str {
        match self {
            SweepTrigger::Scheduled => "scheduled",
            SweepTrigger::Manual => "manual",
            SweepTrigger::Cli => "cli",
        }
    }
}

/// Cooperative stop request, checked before each pair is taken.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal(Arc<AtomicBool>);

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Outcome counts for a single sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub sweep_id: u64,
    pub trigger: SweepTrigger,
    pub strategy: &'static str,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub jobs: usize,
    pub workers: usize,
    pub evaluated: u64,
    pub skipped_existing: u64,
    pub below_threshold: u64,
    pub created: u64,
    pub duplicate_races: u64,
    pub failed_pairs: u64,
    pub notifications_sent: u64,
    pub notification_failures: u64,
    pub rejected_records: usize,
    pub aborted: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum SweepError {
    #[error("unable to read registry: {0}")]
    Registry(#[from] RegistryError),
}

#[derive(Debug, Default)]
struct SweepTally {
    evaluated: AtomicU64,
    skipped_existing: AtomicU64,
    below_threshold: AtomicU64,
    created: AtomicU64,
    duplicate_races: AtomicU64,
    failed_pairs: AtomicU64,
    notifications_sent: AtomicU64,
    notification_failures: AtomicU64,
}

impl SweepTally {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn read(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}

/// Matching engine wiring registries, scorer, stores, and the notification dispatcher.
pub struct MatchingEngine<J, W, M, N> {
    jobs: Arc<J>,
    workers: Arc<W>,
    matches: Arc<M>,
    dispatcher: NotificationDispatcher<N>,
    scorer: CompatibilityScorer,
    strategy: Box<dyn CandidateStrategy>,
    concurrency: usize,
    sequence: AtomicU64,
}

impl<J, W, M, N> MatchingEngine<J, W, M, N>
where
    J: JobRegistry + 'static,
    W: WorkerRegistry + 'static,
    M: MatchStore + 'static,
    N: NotificationStore + 'static,
{
    pub fn new(
        jobs: Arc<J>,
        workers: Arc<W>,
        matches: Arc<M>,
        dispatcher: NotificationDispatcher<N>,
        scorer: CompatibilityScorer,
    ) -> Self {
        let strategy = select_strategy(&scorer);
        Self {
            jobs,
            workers,
            matches,
            dispatcher,
            scorer,
            strategy,
            concurrency: 1,
            sequence: AtomicU64::new(1),
        }
    }

    /// Number of threads evaluating pairs, including the caller. Zero is treated as one.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_strategy(mut self, strategy: Box<dyn CandidateStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn scorer(&self) -> &CompatibilityScorer {
        &self.scorer
    }

    pub fn matches(&self) -> &Arc<M> {
        &self.matches
    }

    pub fn notifications(&self) -> &Arc<N> {
        self.dispatcher.store()
    }

    pub fn localizer(&self) -> &Localizer {
        self.dispatcher.localizer()
    }

    pub fn run_sweep(&self, trigger: SweepTrigger) -> Result<SweepReport, SweepError> {
        self.run_sweep_with(trigger, &AbortSignal::new())
    }

    /// Runs one sweep. Only a registry read failure ends it early; every per-pair failure is
    /// counted and logged.
    pub fn run_sweep_with(
        &self,
        trigger: SweepTrigger,
        abort: &AbortSignal,
    ) -> Result<SweepReport, SweepError> {
        let sweep_id = self.sequence.fetch_add(1, Ordering::Relaxed);
        let span = telemetry::sweep_span(sweep_id, trigger.label());
        let _entered = span.enter();
        let started_at = Utc::now();

        let jobs = self.jobs.list_active()?;
        let workers = self.workers.list_all()?;
        let rejected_records = jobs.rejected.len() + workers.rejected.len();
        log_rejected(jobs.rejected.iter().chain(workers.rejected.iter()));

        let strategy = self.effective_strategy();
        info!(
            jobs = jobs.records.len(),
            workers = workers.records.len(),
            strategy = strategy.name(),
            "sweep started"
        );

        let tally = SweepTally::default();
        let pairs = Mutex::new(strategy.pairs(&jobs.records, &workers.records));

        let (pairs, tally_ref) = (&pairs, &tally);

        thread::scope(|scope| {
            for slot in 1..self.concurrency {
                let span = span.clone();
                let spawned = thread::Builder::new()
                    .name(format!("sweep-{sweep_id}-{slot}"))
                    .spawn_scoped(scope, move || {
                        let _entered = span.enter();
                        self.drain(pairs, tally_ref, abort);
                    });
                if let Err(error) = spawned {
                    warn!(%error, "unable to spawn sweep thread; continuing with fewer");
                }
            }
            self.drain(pairs, tally_ref, abort);
        });

        let report = SweepReport {
            sweep_id,
            trigger,
            strategy: strategy.name(),
            started_at,
            finished_at: Utc::now(),
            jobs: jobs.records.len(),
            workers: workers.records.len(),
            evaluated: SweepTally::read(&tally.evaluated),
            skipped_existing: SweepTally::read(&tally.skipped_existing),
            below_threshold: SweepTally::read(&tally.below_threshold),
            created: SweepTally::read(&tally.created),
            duplicate_races: SweepTally::read(&tally.duplicate_races),
            failed_pairs: SweepTally::read(&tally.failed_pairs),
            notifications_sent: SweepTally::read(&tally.notifications_sent),
            notification_failures: SweepTally::read(&tally.notification_failures),
            rejected_records,
            aborted: abort.is_triggered(),
        };

        info!(
            evaluated = report.evaluated,
            created = report.created,
            skipped_existing = report.skipped_existing,
            below_threshold = report.below_threshold,
            failed_pairs = report.failed_pairs,
            notification_failures = report.notification_failures,
            aborted = report.aborted,
            "sweep finished"
        );

        Ok(report)
    }

    fn effective_strategy(&self) -> &dyn CandidateStrategy {
        if self.strategy.exhaustive() || self.scorer.disjoint_pairs_never_admitted() {
            self.strategy.as_ref()
        } else {
            debug!(
                strategy = self.strategy.name(),
                "pruning strategy could drop admissible pairs; using cross product"
            );
            &CrossProduct
        }
    }

    fn drain<'a, I>(&self, pairs: &Mutex<I>, tally: &SweepTally, abort: &AbortSignal)
    where
        I: Iterator<Item = CandidatePair<'a>>,
    {
        loop {
            if abort.is_triggered() {
                return;
            }
            let next = match pairs.lock() {
                Ok(mut guard) => guard.next(),
                Err(poisoned) => poisoned.into_inner().next(),
            };
            match next {
                Some((job, worker)) => self.evaluate(job, worker, tally),
                None => return,
            }
        }
    }

    fn evaluate(&self, job: &Job, worker: &Worker, tally: &SweepTally) {
        SweepTally::bump(&tally.evaluated);

        match self.matches.exists(&job.id, &worker.id) {
            Ok(true) => {
                SweepTally::bump(&tally.skipped_existing);
                return;
            }
            Ok(false) => {}
            Err(error) => {
                SweepTally::bump(&tally.failed_pairs);
                warn!(job_id = %job.id, worker_id = %worker.id, %error, "match lookup failed");
                return;
            }
        }

        let score = self.scorer.score(job, worker);
        if !self.scorer.admits(score.total) {
            SweepTally::bump(&tally.below_threshold);
            return;
        }

        let record = MatchRecord::pending(job.id.clone(), worker.id.clone(), score.total);
        match self.matches.insert(record) {
            Ok(match_id) => {
                SweepTally::bump(&tally.created);
                debug!(
                    %match_id,
                    job_id = %job.id,
                    worker_id = %worker.id,
                    score = score.total,
                    "match created"
                );
            }
            Err(error) if error.is_duplicate() => {
                SweepTally::bump(&tally.duplicate_races);
                debug!(job_id = %job.id, worker_id = %worker.id, "pair claimed concurrently");
                return;
            }
            Err(error) => {
                SweepTally::bump(&tally.failed_pairs);
                warn!(job_id = %job.id, worker_id = %worker.id, %error, "match insert failed");
                return;
            }
        }

        match self.dispatcher.dispatch(worker, job, &score) {
            Ok(_) => SweepTally::bump(&tally.notifications_sent),
            Err(error) => {
                SweepTally::bump(&tally.notification_failures);
                warn!(job_id = %job.id, worker_id = %worker.id, %error, "notification not recorded");
            }
        }
    }
}

fn log_rejected<'a>(rejected: impl Iterator<Item = &'a RejectedRecord>) {
    for record in rejected {
        warn!(
            kind = record.kind.label(),
            reference = %record.reference,
            error = %record.error,
            "skipping malformed record for this sweep"
        );
    }
}
