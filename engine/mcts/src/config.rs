//! MCTS configuration parameters.

use crate::expansion::ExpansionPolicy;
use crate::node::StatisticsMode;
use crate::selection::SelectionPolicy;
use crate::simulation::SimulationPolicy;
use crate::update::UpdatePolicy;
use engine_config::{SearchConfig, SelectionConfig, UpdateConfig};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Configuration values that cannot run at all.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("n_threads must be at least 1")]
    NoThreads,

    #[error("tree_size must be at least 1")]
    NoTreeCapacity,
}

/// An incompatible setting that [`MctsConfig::self_check`] replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigCorrection {
    /// Action-indexed updates need afterstates off, and vice versa.
    UpdateToAction,
    UpdateToState,
    /// Selection policy swapped to match the statistics mode.
    SelectionToUctAction,
    SelectionToUct,
    /// Seeding only affects prior-aware policies with afterstates.
    SeedingDisabled,
    /// ISMCTS parent visits need afterstates and POMCP.
    IsmctsDisabled,
    RolloutsRaisedToOne,
    SmoothingRaisedToOne,
    /// Unvisited children have no mean return to score.
    MinVisitsRaisedToOne,
}

impl fmt::Display for ConfigCorrection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Self::UpdateToAction => {
                "update policy not compatible with search without afterstates, using action updates"
            }
            Self::UpdateToState => {
                "update policy not compatible with search with afterstates, using state updates"
            }
            Self::SelectionToUctAction => {
                "selection policy not compatible with search without afterstates, using uct_action"
            }
            Self::SelectionToUct => {
                "selection policy not compatible with search with afterstates, using uct"
            }
            Self::SeedingDisabled => "seeded priors would never be read, seeding disabled",
            Self::IsmctsDisabled => "ismcts requires afterstates and pomcp, disabled",
            Self::RolloutsRaisedToOne => "n_rollouts_per_iteration must be at least 1",
            Self::SmoothingRaisedToOne => "probability smoothing factors must be at least 1",
            Self::MinVisitsRaisedToOne => "min_visits must be at least 1",
        };
        f.write_str(message)
    }
}

/// Configuration for one search controller.
#[derive(Debug, Clone, PartialEq)]
pub struct MctsConfig {
    /// Iteration budget; the ceiling when a time limit is set.
    pub n_iterations: u32,
    pub n_threads: usize,
    /// Wall-clock budget, `None` for iteration-only searches.
    pub time_limit: Option<Duration>,
    /// Expansion stops once the tree holds more nodes than this.
    pub tree_size: usize,
    /// Descent stops below this depth (cycle guard).
    pub max_tree_depth: usize,
    /// Share statistics between actions reaching the same state.
    pub afterstates: bool,
    /// Sample one fully observable companion state per iteration.
    pub pomcp: bool,
    pub n_rollouts_per_iteration: u32,
    /// Divide summed rollout rewards by the rollout count.
    pub average_rollouts_results: bool,
    /// Scale rewards by the companion sample's likelihood.
    pub weighted_return: bool,
    pub root_action_prob_smoothing: u32,
    pub root_state_prob_smoothing: u32,
    pub max_rollout_steps: usize,
    pub seeding: bool,
    /// Base seed for the worker RNGs.
    pub seed: Option<u64>,
    pub selection: SelectionConfig,
    pub update: UpdateConfig,
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self::from(&SearchConfig::default())
    }
}

impl From<&SearchConfig> for MctsConfig {
    fn from(config: &SearchConfig) -> Self {
        Self {
            n_iterations: config.n_iterations,
            n_threads: config.n_threads,
            time_limit: (config.time_limit_ms > 0)
                .then(|| Duration::from_millis(config.time_limit_ms)),
            tree_size: config.tree_size,
            max_tree_depth: config.max_tree_depth,
            afterstates: config.afterstates,
            pomcp: config.pomcp,
            n_rollouts_per_iteration: config.n_rollouts_per_iteration,
            average_rollouts_results: config.average_rollouts_results,
            weighted_return: config.weighted_return,
            root_action_prob_smoothing: config.root_action_prob_smoothing,
            root_state_prob_smoothing: config.root_state_prob_smoothing,
            max_rollout_steps: config.max_rollout_steps,
            seeding: config.seeding,
            seed: config.seed,
            selection: config.selection.clone(),
            update: config.update,
        }
    }
}

impl MctsConfig {
    /// Small, single-threaded and seeded: reproducible enough for tests.
    pub fn for_testing() -> Self {
        Self {
            n_iterations: 200,
            n_threads: 1,
            time_limit: None,
            tree_size: 50_000,
            seed: Some(42),
            ..Self::default()
        }
    }

    /// Builder pattern: set the iteration budget.
    pub fn with_iterations(mut self, n: u32) -> Self {
        self.n_iterations = n;
        self
    }

    /// Builder pattern: set the number of worker threads.
    pub fn with_threads(mut self, n: usize) -> Self {
        self.n_threads = n;
        self
    }

    /// Builder pattern: set a wall-clock budget.
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    pub fn with_tree_size(mut self, size: usize) -> Self {
        self.tree_size = size;
        self
    }

    pub fn with_max_tree_depth(mut self, depth: usize) -> Self {
        self.max_tree_depth = depth;
        self
    }

    pub fn with_afterstates(mut self, afterstates: bool) -> Self {
        self.afterstates = afterstates;
        self
    }

    pub fn with_pomcp(mut self, pomcp: bool) -> Self {
        self.pomcp = pomcp;
        self
    }

    /// Builder pattern: set rollouts per iteration and whether to average them.
    pub fn with_rollouts(mut self, n: u32, average: bool) -> Self {
        self.n_rollouts_per_iteration = n;
        self.average_rollouts_results = average;
        self
    }

    pub fn with_weighted_return(mut self, weighted: bool) -> Self {
        self.weighted_return = weighted;
        self
    }

    pub fn with_seeding(mut self, seeding: bool) -> Self {
        self.seeding = seeding;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_selection(mut self, selection: SelectionConfig) -> Self {
        self.selection = selection;
        self
    }

    pub fn with_update(mut self, update: UpdateConfig) -> Self {
        self.update = update;
        self
    }

    /// Builder pattern: set the exploration constant of the current policy.
    pub fn with_c0(mut self, c0: f64) -> Self {
        self.selection.params_mut().c0 = c0;
        self
    }

    pub fn with_min_visits(mut self, min_visits: u32) -> Self {
        self.selection.params_mut().min_visits = min_visits;
        self
    }

    /// Replace settings that cannot work together with the closest legal
    /// ones. Every replacement is logged and returned.
    pub fn self_check(&mut self) -> Vec<ConfigCorrection> {
        let mut corrections = Vec::new();

        if self.afterstates {
            if let UpdateConfig::Action(p) = self.update {
                self.update = UpdateConfig::State(p);
                corrections.push(ConfigCorrection::UpdateToState);
            }
            if let SelectionConfig::UctAction(p) = &self.selection {
                self.selection = SelectionConfig::Uct(p.clone());
                corrections.push(ConfigCorrection::SelectionToUct);
            }
        } else {
            if let UpdateConfig::State(p) = self.update {
                self.update = UpdateConfig::Action(p);
                corrections.push(ConfigCorrection::UpdateToAction);
            }
            if !matches!(self.selection, SelectionConfig::UctAction(_)) {
                let params = self.selection.params().clone();
                self.selection = SelectionConfig::UctAction(params);
                corrections.push(ConfigCorrection::SelectionToUctAction);
            }
            if self.selection.params().ismcts {
                self.selection.params_mut().ismcts = false;
                corrections.push(ConfigCorrection::IsmctsDisabled);
            }
        }

        if self.seeding
            && matches!(
                self.selection,
                SelectionConfig::Uct(_) | SelectionConfig::UctAction(_)
            )
        {
            self.seeding = false;
            corrections.push(ConfigCorrection::SeedingDisabled);
        }

        if !self.pomcp && self.selection.params().ismcts {
            self.selection.params_mut().ismcts = false;
            corrections.push(ConfigCorrection::IsmctsDisabled);
        }

        if self.n_rollouts_per_iteration == 0 {
            self.n_rollouts_per_iteration = 1;
            corrections.push(ConfigCorrection::RolloutsRaisedToOne);
        }

        if self.root_action_prob_smoothing == 0 || self.root_state_prob_smoothing == 0 {
            self.root_action_prob_smoothing = self.root_action_prob_smoothing.max(1);
            self.root_state_prob_smoothing = self.root_state_prob_smoothing.max(1);
            corrections.push(ConfigCorrection::SmoothingRaisedToOne);
        }

        if self.selection.params().min_visits == 0 {
            self.selection.params_mut().min_visits = 1;
            corrections.push(ConfigCorrection::MinVisitsRaisedToOne);
        }

        for correction in &corrections {
            warn!(%correction, "Adjusted MCTS configuration");
        }
        corrections
    }

    /// Reject values no correction can fix.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_threads == 0 {
            return Err(ConfigError::NoThreads);
        }
        if self.tree_size == 0 {
            return Err(ConfigError::NoTreeCapacity);
        }
        Ok(())
    }

    pub fn statistics_mode(&self) -> StatisticsMode {
        if self.afterstates {
            StatisticsMode::StateIndexed
        } else {
            StatisticsMode::ActionIndexed
        }
    }

    pub fn selection_policy(&self) -> SelectionPolicy {
        SelectionPolicy::from(self.selection.clone())
    }

    pub fn update_policy(&self) -> UpdatePolicy {
        UpdatePolicy::from(self.update)
    }

    pub fn expansion_policy(&self) -> ExpansionPolicy {
        ExpansionPolicy::new(self.statistics_mode(), self.root_action_prob_smoothing)
    }

    pub fn simulation_policy(&self) -> SimulationPolicy {
        SimulationPolicy::new(self.max_rollout_steps)
    }
}
