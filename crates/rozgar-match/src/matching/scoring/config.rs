use serde::{Deserialize, Serialize};

/// Weighted scoring policy. The standard policy caps each term so totals stay in [0, 100].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub location_weight: f64,
    pub trade_points: f64,
    pub wage_bands: Vec<WageBand>,
    pub admission_threshold: f64,
}

/// Points awarded when the wage gap is at most `max_gap` rupees. Bands are checked in order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WageBand {
    pub max_gap: u32,
    pub points: f64,
}

impl ScoringConfig {
    pub fn standard() -> Self {
        Self {
            location_weight: 0.4,
            trade_points: 30.0,
            wage_bands: vec![
                WageBand {
                    max_gap: 0,
                    points: 30.0,
                },
                WageBand {
                    max_gap: 50,
                    points: 25.0,
                },
                WageBand {
                    max_gap: 100,
                    points: 20.0,
                },
                WageBand {
                    max_gap: 200,
                    points: 10.0,
                },
            ],
            admission_threshold: 40.0,
        }
    }

    pub fn with_threshold(mut self, admission_threshold: f64) -> Self {
        self.admission_threshold = admission_threshold;
        self
    }

    pub(crate) fn max_wage_points(&self) -> f64 {
        self.wage_bands
            .iter()
            .map(|band| band.points)
            .fold(0.0, f64::max)
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self::standard()
    }
}
