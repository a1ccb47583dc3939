//! Prior-blended UCT in the style of Rapid Action Value Estimation.

use super::uct::uct_score;
use super::ExplorationPolicy;
use crate::node::{EdgeSnapshot, StatisticsMode};
use engine_config::{RaveParams, SelectionParams};

/// Blends the prior with the UCT value:
/// `alpha * prior + (1 - alpha) * uct` with `alpha = max(0, (v - visits) / v)`.
///
/// Fresh edges lean on the prior; after `v` visits the prior is ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct Rave {
    params: SelectionParams,
    v: u32,
}

impl Rave {
    pub fn new(params: SelectionParams, v: u32) -> Self {
        Self { params, v }
    }

    pub fn v(&self) -> u32 {
        self.v
    }

    pub(crate) fn params_mut(&mut self) -> &mut SelectionParams {
        &mut self.params
    }

    #[inline]
    fn alpha(&self, visits: u32) -> f64 {
        if self.v == 0 {
            return 0.0;
        }
        ((self.v as f64 - visits as f64) / self.v as f64).max(0.0)
    }
}

impl From<RaveParams> for Rave {
    fn from(p: RaveParams) -> Self {
        Self::new(p.base, p.v)
    }
}

impl ExplorationPolicy for Rave {
    fn statistics_mode(&self) -> StatisticsMode {
        StatisticsMode::StateIndexed
    }

    fn params(&self) -> &SelectionParams {
        &self.params
    }

    fn score(&self, edge: &EdgeSnapshot, parent_visits: u32, prior: f64) -> f64 {
        let alpha = self.alpha(edge.visits);
        let q = uct_score(self.params.c0, edge, parent_visits);
        alpha * prior + (1.0 - alpha) * q
    }
}
