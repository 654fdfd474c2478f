mod config;
mod location;
mod rules;

pub use config::{ScoringConfig, WageBand};
pub use location::location_score;

use super::domain::{Job, JobId, Worker, WorkerId};
use serde::{Deserialize, Serialize};

/// Stateless scorer that applies the weighted policy to a (job, worker) pair.
#[derive(Debug, Clone)]
pub struct CompatibilityScorer {
    config: ScoringConfig,
}

impl CompatibilityScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn score(&self, job: &Job, worker: &Worker) -> CompatibilityScore {
        let (components, total) = rules::score_pair(job, worker, &self.config);

        CompatibilityScore {
            job_id: job.id.clone(),
            worker_id: worker.id.clone(),
            total,
            components,
        }
    }

    /// Admission is inclusive: a score equal to the threshold creates a match.
    pub fn admits(&self, score: f64) -> bool {
        score >= self.config.admission_threshold
    }

    /// True when a pair sharing no trade, district, or state can never be admitted,
    /// which makes bucketing candidates by those keys lossless.
    pub fn disjoint_pairs_never_admitted(&self) -> bool {
        let ceiling = location::DIFFERENT_STATE * self.config.location_weight
            + self.config.max_wage_points();
        !self.admits(ceiling)
    }
}

impl Default for CompatibilityScorer {
    fn default() -> Self {
        Self::new(ScoringConfig::standard())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreFactor {
    Location,
    Trade,
    Wage,
}

/// Single weighted term, kept so a score can be explained after the fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub factor: ScoreFactor,
    pub points: f64,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompatibilityScore {
    pub job_id: JobId,
    pub worker_id: WorkerId,
    pub total: f64,
    pub components: Vec<ScoreComponent>,
}

impl CompatibilityScore {
    pub fn points_for(&self, factor: ScoreFactor) -> f64 {
        self.components
            .iter()
            .filter(|component| component.factor == factor)
            .map(|component| component.points)
            .sum()
    }

    /// Score rounded to the nearest whole percent, as shown to workers.
    pub fn percent(&self) -> u32 {
        self.total.round().clamp(0.0, 100.0) as u32
    }
}
