//! Update (backpropagation) policies.
//!
//! An update pushes one iteration's reward vector back along the visited
//! path and then releases the virtual loss selection left on it. Updates
//! never fail: the worst case is a no-op on a node that vanished or a reward
//! vector that is shorter than the node's return vector.

mod action;
mod state;

pub use action::ActionUpdater;
pub use state::StateUpdater;

use crate::node::StatisticsMode;
use crate::path::{SearchPath, Visit};
use engine_config::{UpdateConfig, UpdateParams};

/// The closed family of update policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePolicy {
    /// Statistics on the visited nodes (afterstates).
    State(StateUpdater),
    /// Statistics on each parent's slot for the action taken.
    Action(ActionUpdater),
}

impl UpdatePolicy {
    pub fn state(params: UpdateParams) -> Self {
        Self::State(StateUpdater::new(params))
    }

    pub fn action(params: UpdateParams) -> Self {
        Self::Action(ActionUpdater::new(params))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::State(_) => "state",
            Self::Action(_) => "action",
        }
    }

    pub fn statistics_mode(&self) -> StatisticsMode {
        match self {
            Self::State(_) => StatisticsMode::StateIndexed,
            Self::Action(_) => StatisticsMode::ActionIndexed,
        }
    }

    pub fn params(&self) -> UpdateParams {
        match self {
            Self::State(u) => u.params(),
            Self::Action(u) => u.params(),
        }
    }

    /// Commit `reward`, observed `n_rollouts` times, along `path` and release
    /// the path's virtual loss.
    pub fn update<A>(&self, path: &mut SearchPath<A>, reward: &[f64], n_rollouts: u32) {
        match self {
            Self::State(u) => u.update(path.visits(), reward, n_rollouts),
            Self::Action(u) => u.update(path.visits(), reward, n_rollouts),
        }
        path.release_virtual_loss();
    }
}

impl Default for UpdatePolicy {
    fn default() -> Self {
        Self::state(UpdateParams::default())
    }
}

impl From<UpdateConfig> for UpdatePolicy {
    fn from(config: UpdateConfig) -> Self {
        match config {
            UpdateConfig::State(p) => Self::state(p),
            UpdateConfig::Action(p) => Self::action(p),
        }
    }
}

/// Per-visit reward multipliers.
///
/// With `expected_return` the weight of visit `i` is the product of the
/// action probabilities of every edge taken after it, accumulated in log
/// space so long paths of small probabilities do not underflow early. A zero
/// probability anywhere below a node zeroes its weight. Without it every
/// weight is 1.
pub(crate) fn path_weights<A>(visits: &[Visit<A>], expected_return: bool) -> Vec<f64> {
    if !expected_return {
        return vec![1.0; visits.len()];
    }

    let mut weights = vec![0.0; visits.len()];
    let mut log_weight = 0.0_f64;
    for (i, visit) in visits.iter().enumerate().rev() {
        weights[i] = log_weight.exp();
        log_weight += visit.action_prob.ln();
    }
    weights
}

/// `reward` scaled by `weight`, without allocating when the weight is 1.
pub(crate) fn scaled(reward: &[f64], weight: f64) -> std::borrow::Cow<'_, [f64]> {
    if weight == 1.0 {
        std::borrow::Cow::Borrowed(reward)
    } else {
        std::borrow::Cow::Owned(reward.iter().map(|r| r * weight).collect())
    }
}
