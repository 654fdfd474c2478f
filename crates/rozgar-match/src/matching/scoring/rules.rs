use super::super::domain::{Job, Worker};
use super::config::ScoringConfig;
use super::location::location_score;
use super::{ScoreComponent, ScoreFactor};

pub(crate) fn score_pair(
    job: &Job,
    worker: &Worker,
    config: &ScoringConfig,
) -> (Vec<ScoreComponent>, f64) {
    let mut components = Vec::with_capacity(3);
    let mut total = 0.0;

    let proximity = location_score(&job.location, &worker.location);
    let location_points = proximity * config.location_weight;
    components.push(ScoreComponent {
        factor: ScoreFactor::Location,
        points: location_points,
        notes: format!(
            "{} vs {} rated {proximity:.0}",
            describe(&job.location.district, &job.location.state),
            describe(&worker.location.district, &worker.location.state)
        ),
    });
    total += location_points;

    let trade_points = if job.trade == worker.trade {
        config.trade_points
    } else {
        0.0
    };
    components.push(ScoreComponent {
        factor: ScoreFactor::Trade,
        points: trade_points,
        notes: if trade_points > 0.0 {
            format!("trade {} matches", job.trade)
        } else {
            format!("job needs {}, worker offers {}", job.trade, worker.trade)
        },
    });
    total += trade_points;

    let gap = job.daily_wage.abs_diff(worker.expected_daily_wage);
    let wage_points = wage_points(gap, config);
    components.push(ScoreComponent {
        factor: ScoreFactor::Wage,
        points: wage_points,
        notes: format!("daily wage gap of {gap}"),
    });
    total += wage_points;

    (components, total.clamp(0.0, 100.0))
}

pub(crate) fn wage_points(gap: u32, config: &ScoringConfig) -> f64 {
    config
        .wage_bands
        .iter()
        .find(|band| gap <= band.max_gap)
        .map(|band| band.points)
        .unwrap_or(0.0)
}

fn describe(district: &str, state: &str) -> String {
    format!("{}/{}", district.trim(), state.trim())
}
