//! Interval-driven sweep scheduler. One sweep at a time; ticks landing while a sweep is in
//! flight are dropped and counted.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::engine::{AbortSignal, MatchingEngine, SweepError, SweepReport, SweepTrigger};
use super::registry::{JobRegistry, WorkerRegistry};
use super::store::{MatchStore, NotificationStore};

/// Something that can run one full sweep on a blocking thread.
pub trait SweepRunner: Send + Sync + 'static {
    fn run(&self, trigger: SweepTrigger, abort: &AbortSignal) -> Result<SweepReport, SweepError>;

    /// Releases caches and other state that should not outlive the scheduler.
    fn shutdown(&self) {}
}

impl<J, W, M, N> SweepRunner for MatchingEngine<J, W, M, N>
where
    J: JobRegistry + 'static,
    W: WorkerRegistry + 'static,
    M: MatchStore + 'static,
    N: NotificationStore + 'static,
{
    fn run(&self, trigger: SweepTrigger, abort: &AbortSignal) -> Result<SweepReport, SweepError> {
        self.run_sweep_with(trigger, abort)
    }

    fn shutdown(&self) {
        self.localizer().cache().clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    Idle,
    Running,
}

/// How `stop` treats a sweep that is already running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopMode {
    /// Let the in-flight sweep finish.
    Drain,
    /// Ask the in-flight sweep to stop before its next pair.
    Abort,
}

#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub state: SchedulerState,
    pub ticking: bool,
    pub interval_secs: u64,
    pub dropped_ticks: u64,
    pub last_report: Option<SweepReport>,
}

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("a sweep is already running")]
    Busy,
    #[error(transparent)]
    Sweep(#[from] SweepError),
    #[error("sweep task failed: {0}")]
    Crashed(String),
}

struct Shared {
    runner: Arc<dyn SweepRunner>,
    state: watch::Sender<SchedulerState>,
    abort: AbortSignal,
    dropped_ticks: AtomicU64,
    last_report: RwLock<Option<SweepReport>>,
}

impl Shared {
    /// Atomically moves idle to running. Returns false if a sweep is already running.
    fn begin(&self) -> bool {
        let began = self.state.send_if_modified(|state| match state {
            SchedulerState::Idle => {
                *state = SchedulerState::Running;
                true
            }
            SchedulerState::Running => false,
        });
        if began {
            self.abort.reset();
        }
        began
    }

    async fn execute(
        self: Arc<Self>,
        trigger: SweepTrigger,
    ) -> Result<SweepReport, SchedulerError> {
        let runner = Arc::clone(&self.runner);
        let abort = self.abort.clone();
        let outcome = tokio::task::spawn_blocking(move || runner.run(trigger, &abort)).await;

        // The report is published before the state flips, so an idle observer sees it.
        let result = match outcome {
            Ok(Ok(report)) => {
                *self
                    .last_report
                    .write()
                    .unwrap_or_else(PoisonError::into_inner) = Some(report.clone());
                Ok(report)
            }
            Ok(Err(error)) => Err(SchedulerError::Sweep(error)),
            Err(join_error) => Err(SchedulerError::Crashed(join_error.to_string())),
        };
        self.state.send_replace(SchedulerState::Idle);
        result
    }
}

/// Owned scheduler handle. Create one per process and keep it for the process lifetime.
pub struct SweepScheduler {
    shared: Arc<Shared>,
    interval: Duration,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl SweepScheduler {
    pub fn new(runner: Arc<dyn SweepRunner>, interval: Duration) -> Self {
        let (state, _) = watch::channel(SchedulerState::Idle);
        Self {
            shared: Arc::new(Shared {
                runner,
                state,
                abort: AbortSignal::new(),
                dropped_ticks: AtomicU64::new(0),
                last_report: RwLock::new(None),
            }),
            interval,
            ticker: Mutex::new(None),
        }
    }

    pub fn state(&self) -> SchedulerState {
        *self.shared.state.borrow()
    }

    pub fn dropped_ticks(&self) -> u64 {
        self.shared.dropped_ticks.load(Ordering::Relaxed)
    }

    pub fn last_report(&self) -> Option<SweepReport> {
        self.shared
            .last_report
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_ticking(&self) -> bool {
        self.ticker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn status(&self) -> SchedulerStatus {
        SchedulerStatus {
            state: self.state(),
            ticking: self.is_ticking(),
            interval_secs: self.interval.as_secs(),
            dropped_ticks: self.dropped_ticks(),
            last_report: self.last_report(),
        }
    }

    /// Begins ticking. The first sweep fires one interval after start. Must be called from
    /// within a tokio runtime; calling it again while ticking has no effect.
    pub fn start(&self) {
        let mut ticker = self.ticker.lock().unwrap_or_else(PoisonError::into_inner);
        if ticker.as_ref().is_some_and(|handle| !handle.is_finished()) {
            debug!("scheduler already ticking");
            return;
        }

        let shared = Arc::clone(&self.shared);
        let period = self.interval;
        info!(interval_secs = period.as_secs(), "sweep scheduler started");

        *ticker = Some(tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                if !shared.begin() {
                    let dropped = shared.dropped_ticks.fetch_add(1, Ordering::Relaxed) + 1;
                    debug!(dropped, "tick dropped; sweep still running");
                    continue;
                }
                let shared = Arc::clone(&shared);
                tokio::spawn(async move {
                    if let Err(error) = shared.execute(SweepTrigger::Scheduled).await {
                        error!(%error, "scheduled sweep failed");
                    }
                });
            }
        }));
    }

    /// Runs a sweep now unless one is already running. The sweep is spawned, so dropping the
    /// returned future does not leave the scheduler stuck in `running`.
    pub async fn run_now(&self, trigger: SweepTrigger) -> Result<SweepReport, SchedulerError> {
        if !self.shared.begin() {
            return Err(SchedulerError::Busy);
        }
        let shared = Arc::clone(&self.shared);
        tokio::spawn(shared.execute(trigger))
            .await
            .map_err(|join_error| SchedulerError::Crashed(join_error.to_string()))?
    }

    /// Cancels pending ticks, then waits for any in-flight sweep according to `mode`.
    pub async fn stop(&self, mode: StopMode) {
        let handle = self
            .ticker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }

        if mode == StopMode::Abort {
            self.shared.abort.trigger();
        }

        let mut state = self.shared.state.subscribe();
        if state
            .wait_for(|state| *state == SchedulerState::Idle)
            .await
            .is_err()
        {
            warn!("scheduler state channel closed while stopping");
        }

        self.shared.runner.shutdown();
        info!(?mode, "sweep scheduler stopped");
    }
}
