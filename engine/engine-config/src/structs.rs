//! Configuration struct definitions.
//!
//! All config structs with serde deserialization support and default values.

use crate::defaults;
use serde::Deserialize;

// ============================================================================
// Serde default functions (required for #[serde(default = "...")])
// These call the accessor functions from defaults module
// ============================================================================

fn d_log_level() -> String {
    defaults::log_level().into()
}
fn d_n_iterations() -> u32 {
    defaults::n_iterations()
}
fn d_n_threads() -> usize {
    defaults::n_threads()
}
fn d_time_limit_ms() -> u64 {
    defaults::time_limit_ms()
}
fn d_tree_size() -> usize {
    defaults::tree_size()
}
fn d_max_tree_depth() -> usize {
    defaults::max_tree_depth()
}
fn d_afterstates() -> bool {
    defaults::afterstates()
}
fn d_pomcp() -> bool {
    defaults::pomcp()
}
fn d_n_rollouts() -> u32 {
    defaults::n_rollouts_per_iteration()
}
fn d_average_rollouts() -> bool {
    defaults::average_rollouts_results()
}
fn d_weighted_return() -> bool {
    defaults::weighted_return()
}
fn d_root_action_smoothing() -> u32 {
    defaults::root_action_prob_smoothing()
}
fn d_root_state_smoothing() -> u32 {
    defaults::root_state_prob_smoothing()
}
fn d_max_rollout_steps() -> usize {
    defaults::max_rollout_steps()
}
fn d_seeding() -> bool {
    defaults::seeding()
}
fn d_c0() -> f64 {
    defaults::c0()
}
fn d_min_visits() -> u32 {
    defaults::min_visits()
}
fn d_weighted_selection() -> bool {
    defaults::weighted_selection()
}
fn d_ismcts() -> bool {
    defaults::ismcts()
}
fn d_rave_v() -> u32 {
    defaults::rave_v()
}
fn d_expected_return() -> bool {
    defaults::expected_return()
}
fn d_every_visit() -> bool {
    defaults::every_visit()
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Root configuration structure matching mcts.toml
#[derive(Debug, Deserialize, Default, Clone)]
pub struct CentralConfig {
    #[serde(default)]
    pub common: CommonConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

/// Settings shared by every component embedding the engine
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CommonConfig {
    #[serde(default = "d_log_level")]
    pub log_level: String,
}

impl Default for CommonConfig {
    fn default() -> Self {
        Self {
            log_level: defaults::log_level().into(),
        }
    }
}

/// Search budget, tree limits and policy selection
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SearchConfig {
    #[serde(default = "d_n_iterations")]
    pub n_iterations: u32,
    #[serde(default = "d_n_threads")]
    pub n_threads: usize,
    /// Wall-clock budget in milliseconds (0 = iteration budget only)
    #[serde(default = "d_time_limit_ms")]
    pub time_limit_ms: u64,
    #[serde(default = "d_tree_size")]
    pub tree_size: usize,
    #[serde(default = "d_max_tree_depth")]
    pub max_tree_depth: usize,
    #[serde(default = "d_afterstates")]
    pub afterstates: bool,
    #[serde(default = "d_pomcp")]
    pub pomcp: bool,
    #[serde(default = "d_n_rollouts")]
    pub n_rollouts_per_iteration: u32,
    #[serde(default = "d_average_rollouts")]
    pub average_rollouts_results: bool,
    #[serde(default = "d_weighted_return")]
    pub weighted_return: bool,
    #[serde(default = "d_root_action_smoothing")]
    pub root_action_prob_smoothing: u32,
    #[serde(default = "d_root_state_smoothing")]
    pub root_state_prob_smoothing: u32,
    #[serde(default = "d_max_rollout_steps")]
    pub max_rollout_steps: usize,
    #[serde(default = "d_seeding")]
    pub seeding: bool,
    /// Base seed for worker RNGs. Unset = seeded from entropy.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub selection: SelectionConfig,
    #[serde(default)]
    pub update: UpdateConfig,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            n_iterations: defaults::n_iterations(),
            n_threads: defaults::n_threads(),
            time_limit_ms: defaults::time_limit_ms(),
            tree_size: defaults::tree_size(),
            max_tree_depth: defaults::max_tree_depth(),
            afterstates: defaults::afterstates(),
            pomcp: defaults::pomcp(),
            n_rollouts_per_iteration: defaults::n_rollouts_per_iteration(),
            average_rollouts_results: defaults::average_rollouts_results(),
            weighted_return: defaults::weighted_return(),
            root_action_prob_smoothing: defaults::root_action_prob_smoothing(),
            root_state_prob_smoothing: defaults::root_state_prob_smoothing(),
            max_rollout_steps: defaults::max_rollout_steps(),
            seeding: defaults::seeding(),
            seed: None,
            selection: SelectionConfig::default(),
            update: UpdateConfig::default(),
        }
    }
}

/// Parameters shared by every selection policy
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SelectionParams {
    /// Exploration constant
    #[serde(default = "d_c0")]
    pub c0: f64,
    /// Children with fewer visits are always tried first
    #[serde(default = "d_min_visits")]
    pub min_visits: u32,
    /// Weight scores by the domain's legality probabilities
    #[serde(default = "d_weighted_selection")]
    pub weighted_selection: bool,
    /// Count parent visits per child (information-set MCTS)
    #[serde(default = "d_ismcts")]
    pub ismcts: bool,
}

impl Default for SelectionParams {
    fn default() -> Self {
        Self {
            c0: defaults::c0(),
            min_visits: defaults::min_visits(),
            weighted_selection: defaults::weighted_selection(),
            ismcts: defaults::ismcts(),
        }
    }
}

/// RAVE parameters: the shared ones plus the equivalence constant
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct RaveParams {
    #[serde(flatten)]
    pub base: SelectionParams,
    #[serde(default = "d_rave_v")]
    pub v: u32,
}

impl Default for RaveParams {
    fn default() -> Self {
        Self {
            base: SelectionParams::default(),
            v: defaults::rave_v(),
        }
    }
}

/// Selection policy, tagged by `type` in TOML.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SelectionConfig {
    Uct(SelectionParams),
    UctAction(SelectionParams),
    Puct(SelectionParams),
    Rave(RaveParams),
}

impl SelectionConfig {
    /// Build a policy of the named kind (`uct`, `uct_action`, `puct`, `rave`).
    pub fn from_kind(kind: &str, params: SelectionParams) -> Option<Self> {
        match kind {
            "uct" => Some(Self::Uct(params)),
            "uct_action" => Some(Self::UctAction(params)),
            "puct" => Some(Self::Puct(params)),
            "rave" => Some(Self::Rave(RaveParams {
                base: params,
                v: defaults::rave_v(),
            })),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Uct(_) => "uct",
            Self::UctAction(_) => "uct_action",
            Self::Puct(_) => "puct",
            Self::Rave(_) => "rave",
        }
    }

    pub fn params(&self) -> &SelectionParams {
        match self {
            Self::Uct(p) | Self::UctAction(p) | Self::Puct(p) => p,
            Self::Rave(r) => &r.base,
        }
    }

    pub fn params_mut(&mut self) -> &mut SelectionParams {
        match self {
            Self::Uct(p) | Self::UctAction(p) | Self::Puct(p) => p,
            Self::Rave(r) => &mut r.base,
        }
    }
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self::from_kind(defaults::selection_kind(), SelectionParams::default())
            .unwrap_or_else(|| Self::Uct(SelectionParams::default()))
    }
}

/// Parameters shared by both update policies
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct UpdateParams {
    /// Weight each node's reward by the probability of the edges below it
    #[serde(default = "d_expected_return")]
    pub expected_return: bool,
    /// Update a node once per occurrence on the path instead of once
    #[serde(default = "d_every_visit")]
    pub every_visit: bool,
}

impl Default for UpdateParams {
    fn default() -> Self {
        Self {
            expected_return: defaults::expected_return(),
            every_visit: defaults::every_visit(),
        }
    }
}

/// Backpropagation policy, tagged by `type` in TOML.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UpdateConfig {
    State(UpdateParams),
    Action(UpdateParams),
}

impl UpdateConfig {
    pub fn from_kind(kind: &str, params: UpdateParams) -> Option<Self> {
        match kind {
            "state" => Some(Self::State(params)),
            "action" => Some(Self::Action(params)),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::State(_) => "state",
            Self::Action(_) => "action",
        }
    }

    pub fn params(&self) -> UpdateParams {
        match self {
            Self::State(p) | Self::Action(p) => *p,
        }
    }

    pub fn params_mut(&mut self) -> &mut UpdateParams {
        match self {
            Self::State(p) | Self::Action(p) => p,
        }
    }
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self::from_kind(defaults::update_kind(), UpdateParams::default())
            .unwrap_or_else(|| Self::State(UpdateParams::default()))
    }
}
