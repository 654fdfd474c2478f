//! End-to-end sweeps over CSV registries and durable JSON-lines stores, driven only through
//! the public crate surface.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use rozgar_match::matching::{
    CompatibilityScorer, CsvJobRegistry, CsvWorkerRegistry, JobId, JsonlMatchStore,
    JsonlNotificationStore, LanguageCode, Localizer, MatchStore, MatchingEngine,
    NotificationDispatcher, NotificationStore, ScoringConfig, SweepTrigger, TemplateCache,
    TemplateCatalog, WorkerId,
};

const JOBS: &str = "\
job_id,employer_id,title,job_type,village,district,state,daily_wage_offered,contact_number,status,created_at
job-1,emp-1,Boundary wall,Mason,Kiraoli,Agra,UP,500,9876543210,active,2025-01-15
job-2,emp-2,Warehouse loading,Labour,Sikandra,Agra,UP,450,9876500011,closed,2025-01-16
job-3,emp-3,Shop shutter,Welder,Hadapsar,Pune,MH,abc,9876500022,active,2025-01-17
job-4,emp-1,Courtyard flooring,Mason,Etmadpur,Agra,UP,520,9876543210,active,
";

const WORKERS: &str = "\
worker_id,user_id,name,phone_number,district,state,job_type,expected_daily_wage,language,created_at
w-1,u-1,Raj Kumar,9123400001,Agra,UP,Mason,500,hi,2025-01-10
w-2,u-2,Amit,9123400002,Delhi,UP,Labour,800,en,2025-01-11
w-3,u-3,Zaid,9123400003,agra,up,Mason,560,ur,
w-4,u-4,,9123400004,Agra,UP,Mason,500,ta,
";

type CsvEngine = MatchingEngine<
    CsvJobRegistry,
    CsvWorkerRegistry,
    JsonlMatchStore,
    JsonlNotificationStore,
>;

fn engine(dir: &Path) -> CsvEngine {
    let matches = JsonlMatchStore::open(dir.join("matches.jsonl")).expect("match store opens");
    let notifications = JsonlNotificationStore::open(dir.join("notifications.jsonl"))
        .expect("notification store opens");
    let localizer = Localizer::new(
        TemplateCatalog::builtin().expect("builtin templates"),
        Arc::new(TemplateCache::new(8)),
    );

    MatchingEngine::new(
        Arc::new(CsvJobRegistry::new(dir.join("jobs.csv"))),
        Arc::new(CsvWorkerRegistry::new(dir.join("workers.csv"))),
        Arc::new(matches),
        NotificationDispatcher::new(Arc::new(notifications), localizer),
        CompatibilityScorer::new(ScoringConfig::standard()),
    )
    .with_concurrency(3)
}

fn seeded_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("temp dir");
    fs::write(dir.path().join("jobs.csv"), JOBS).expect("write jobs");
    fs::write(dir.path().join("workers.csv"), WORKERS).expect("write workers");
    dir
}

#[test]
fn csv_sweep_persists_matches_and_notifications() {
    let dir = seeded_dir();
    let engine = engine(dir.path());

    let report = engine.run_sweep(SweepTrigger::Cli).expect("sweep runs");

    assert_eq!(report.jobs, 2);
    assert_eq!(report.workers, 3);
    assert_eq!(report.rejected_records, 2);
    assert_eq!(report.created, 4);
    assert_eq!(report.notifications_sent, 4);

    let job_matches = engine
        .matches()
        .for_job(&JobId::from("job-1"))
        .expect("store readable");
    let scored: Vec<(&str, f64)> = job_matches
        .iter()
        .map(|record| (record.worker_id.as_str(), record.score))
        .collect();
    assert_eq!(scored, vec![("w-1", 100.0), ("w-3", 90.0)]);

    let zaid = engine
        .notifications()
        .for_worker(&WorkerId::from("w-3"))
        .expect("store readable");
    assert_eq!(zaid.len(), 2);
    assert!(zaid
        .iter()
        .all(|notification| notification.language == LanguageCode::new("hi")));
}

#[test]
fn reopened_stores_keep_sweeps_idempotent() {
    let dir = seeded_dir();
    let first = engine(dir.path())
        .run_sweep(SweepTrigger::Cli)
        .expect("first sweep");
    assert_eq!(first.created, 4);

    let reopened = engine(dir.path());
    let second = reopened.run_sweep(SweepTrigger::Cli).expect("second sweep");

    assert_eq!(second.created, 0);
    assert_eq!(second.skipped_existing, 4);
    assert_eq!(reopened.matches().all().expect("store readable").len(), 4);

    let lines = fs::read_to_string(dir.path().join("notifications.jsonl")).expect("log readable");
    assert_eq!(lines.lines().count(), 4);
}

#[test]
fn newly_posted_job_is_picked_up_by_the_next_sweep() {
    let dir = seeded_dir();
    let engine = engine(dir.path());
    engine.run_sweep(SweepTrigger::Cli).expect("first sweep");

    let mut jobs = fs::read_to_string(dir.path().join("jobs.csv")).expect("jobs readable");
    jobs.push_str("job-5,emp-9,Tank cleaning,Labour,Narela,Delhi,UP,800,9000000005,active,\n");
    fs::write(dir.path().join("jobs.csv"), jobs).expect("append job");

    let report = engine.run_sweep(SweepTrigger::Cli).expect("second sweep");

    assert_eq!(report.created, 1);
    let matched = engine
        .matches()
        .for_worker(&WorkerId::from("w-2"))
        .expect("store readable");
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].job_id, JobId::from("job-5"));
    assert_eq!(matched[0].score, 100.0);
}
