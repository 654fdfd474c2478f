//! Candidate generation: which (job, worker) pairs a sweep looks at.

use std::collections::{BTreeSet, HashMap};

use super::domain::{Job, Worker};
use super::scoring::CompatibilityScorer;

pub type CandidatePair<'a> = (&'a Job, &'a Worker);

/// Produces the pairs evaluated by one sweep. The sequence is lazy; nothing is materialized
/// beyond what the strategy needs to index.
pub trait CandidateStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether every (job, worker) pair is yielded. Strategies that prune rely on the
    /// scoring policy never admitting what they skip.
    fn exhaustive(&self) -> bool {
        true
    }

    fn pairs<'a>(
        &self,
        jobs: &'a [Job],
        workers: &'a [Worker],
    ) -> Box<dyn Iterator<Item = CandidatePair<'a>> + Send + 'a>;
}

/// Every active job against every worker.
#[derive(Debug, Default, Clone, Copy)]
pub struct CrossProduct;

impl CandidateStrategy for CrossProduct {
    fn name(&self) -> &'static str {
        "cross_product"
    }

    fn pairs<'a>(
        &self,
        jobs: &'a [Job],
        workers: &'a [Worker],
    ) -> Box<dyn Iterator<Item = CandidatePair<'a>> + Send + 'a> {
        Box::new(
            jobs.iter()
                .flat_map(move |job| workers.iter().map(move |worker| (job, worker))),
        )
    }
}

/// Workers bucketed by trade, district, and state. A job only meets workers sharing at
/// least one of those keys with it.
#[derive(Debug, Default, Clone, Copy)]
pub struct IndexedCandidates;

struct WorkerIndex {
    by_trade: HashMap<String, Vec<usize>>,
    by_district: HashMap<String, Vec<usize>>,
    by_state: HashMap<String, Vec<usize>>,
}

impl WorkerIndex {
    fn build(workers: &[Worker]) -> Self {
        let mut index = Self {
            by_trade: HashMap::new(),
            by_district: HashMap::new(),
            by_state: HashMap::new(),
        };
        for (position, worker) in workers.iter().enumerate() {
            index
                .by_trade
                .entry(worker.trade.as_str().to_string())
                .or_default()
                .push(position);
            index
                .by_district
                .entry(worker.location.district_key())
                .or_default()
                .push(position);
            index
                .by_state
                .entry(worker.location.state_key())
                .or_default()
                .push(position);
        }
        index
    }

    fn candidates_for(&self, job: &Job) -> BTreeSet<usize> {
        let buckets = [
            self.by_trade.get(job.trade.as_str()),
            self.by_district.get(&job.location.district_key()),
            self.by_state.get(&job.location.state_key()),
        ];
        buckets
            .into_iter()
            .flatten()
            .flat_map(|bucket| bucket.iter().copied())
            .collect()
    }
}

impl CandidateStrategy for IndexedCandidates {
    fn name(&self) -> &'static str {
        "indexed"
    }

    fn exhaustive(&self) -> bool {
        false
    }

    fn pairs<'a>(
        &self,
        jobs: &'a [Job],
        workers: &'a [Worker],
    ) -> Box<dyn Iterator<Item = CandidatePair<'a>> + Send + 'a> {
        let index = WorkerIndex::build(workers);
        Box::new(jobs.iter().flat_map(move |job| {
            index
                .candidates_for(job)
                .into_iter()
                .map(move |position| (job, &workers[position]))
        }))
    }
}

/// Picks the index-assisted strategy when it cannot drop an admissible pair under the
/// scorer's policy, otherwise the full cross product.
pub fn select_strategy(scorer: &CompatibilityScorer) -> Box<dyn CandidateStrategy> {
    if scorer.disjoint_pairs_never_admitted() {
        Box::new(IndexedCandidates)
    } else {
        Box::new(CrossProduct)
    }
}
