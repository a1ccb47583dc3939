//! Prior-weighted UCT.

use super::ExplorationPolicy;
use crate::node::{EdgeSnapshot, StatisticsMode};
use engine_config::SelectionParams;

/// PUCT: `(returns - vloss) / visits + c0 * prior * sqrt(parent_visits) / (1 + visits)`.
///
/// Priors are uniform until a seeder overwrites them, so without seeding this
/// behaves like a flat prior-weighted UCT.
#[derive(Debug, Clone, PartialEq)]
pub struct Puct {
    params: SelectionParams,
}

impl Puct {
    pub fn new(params: SelectionParams) -> Self {
        Self { params }
    }

    pub(crate) fn params_mut(&mut self) -> &mut SelectionParams {
        &mut self.params
    }
}

impl ExplorationPolicy for Puct {
    fn statistics_mode(&self) -> StatisticsMode {
        StatisticsMode::StateIndexed
    }

    fn params(&self) -> &SelectionParams {
        &self.params
    }

    fn score(&self, edge: &EdgeSnapshot, parent_visits: u32, prior: f64) -> f64 {
        let exploration =
            self.params.c0 * prior * (parent_visits as f64).sqrt() / (1.0 + edge.visits as f64);
        edge.exploitation() + exploration
    }
}
