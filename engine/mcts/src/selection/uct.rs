//! Upper Confidence bounds applied to Trees.

use super::ExplorationPolicy;
use crate::node::{EdgeSnapshot, StatisticsMode};
use engine_config::SelectionParams;

/// UCT: `(returns - vloss) / visits + c0 * sqrt(ln(parent_visits) / visits)`.
///
/// The same formula serves both statistics modes: `Uct::state_indexed` reads
/// child nodes, `Uct::action_indexed` reads the parent's per-action slots.
#[derive(Debug, Clone, PartialEq)]
pub struct Uct {
    params: SelectionParams,
    mode: StatisticsMode,
}

impl Uct {
    pub fn state_indexed(params: SelectionParams) -> Self {
        Self {
            params,
            mode: StatisticsMode::StateIndexed,
        }
    }

    pub fn action_indexed(params: SelectionParams) -> Self {
        Self {
            params,
            mode: StatisticsMode::ActionIndexed,
        }
    }

    pub(crate) fn params_mut(&mut self) -> &mut SelectionParams {
        &mut self.params
    }
}

/// Score shared with RAVE.
#[inline]
pub(crate) fn uct_score(c0: f64, edge: &EdgeSnapshot, parent_visits: u32) -> f64 {
    let ln_parent = (parent_visits.max(1) as f64).ln();
    edge.exploitation() + c0 * (ln_parent / edge.visits as f64).sqrt()
}

impl ExplorationPolicy for Uct {
    fn statistics_mode(&self) -> StatisticsMode {
        self.mode
    }

    fn params(&self) -> &SelectionParams {
        &self.params
    }

    fn score(&self, edge: &EdgeSnapshot, parent_visits: u32, _prior: f64) -> f64 {
        uct_score(self.params.c0, edge, parent_visits)
    }
}
