//! Default configuration values loaded from config.defaults.toml.
//!
//! The defaults file is embedded at compile time so that the library, its
//! tests and any embedding application agree on the same values.

use once_cell::sync::Lazy;
use serde::Deserialize;

/// The embedded defaults TOML file (loaded at compile time)
const DEFAULTS_TOML: &str = include_str!("../../../config.defaults.toml");

/// Parsed defaults structure (parsed once at first use)
static DEFAULTS: Lazy<DefaultsConfig> = Lazy::new(|| {
    toml::from_str(DEFAULTS_TOML).expect("config.defaults.toml should be valid TOML")
});

// ============================================================================
// Internal structs for parsing config.defaults.toml
// ============================================================================

#[derive(Debug, Deserialize)]
struct DefaultsConfig {
    common: CommonDefaults,
    search: SearchDefaults,
}

#[derive(Debug, Deserialize)]
struct CommonDefaults {
    log_level: String,
}

#[derive(Debug, Deserialize)]
struct SearchDefaults {
    n_iterations: u32,
    n_threads: usize,
    time_limit_ms: u64,
    tree_size: usize,
    max_tree_depth: usize,
    afterstates: bool,
    pomcp: bool,
    n_rollouts_per_iteration: u32,
    average_rollouts_results: bool,
    weighted_return: bool,
    root_action_prob_smoothing: u32,
    root_state_prob_smoothing: u32,
    max_rollout_steps: usize,
    seeding: bool,
    selection: SelectionDefaults,
    update: UpdateDefaults,
}

#[derive(Debug, Deserialize)]
struct SelectionDefaults {
    #[serde(rename = "type")]
    kind: String,
    c0: f64,
    min_visits: u32,
    weighted_selection: bool,
    ismcts: bool,
    v: u32,
}

#[derive(Debug, Deserialize)]
struct UpdateDefaults {
    #[serde(rename = "type")]
    kind: String,
    expected_return: bool,
    every_visit: bool,
}

// ============================================================================
// Public accessor functions
// ============================================================================

// Common
pub fn log_level() -> &'static str {
    &DEFAULTS.common.log_level
}

// Search
pub fn n_iterations() -> u32 {
    DEFAULTS.search.n_iterations
}
pub fn n_threads() -> usize {
    DEFAULTS.search.n_threads
}
pub fn time_limit_ms() -> u64 {
    DEFAULTS.search.time_limit_ms
}
pub fn tree_size() -> usize {
    DEFAULTS.search.tree_size
}
pub fn max_tree_depth() -> usize {
    DEFAULTS.search.max_tree_depth
}
pub fn afterstates() -> bool {
    DEFAULTS.search.afterstates
}
pub fn pomcp() -> bool {
    DEFAULTS.search.pomcp
}
pub fn n_rollouts_per_iteration() -> u32 {
    DEFAULTS.search.n_rollouts_per_iteration
}
pub fn average_rollouts_results() -> bool {
    DEFAULTS.search.average_rollouts_results
}
pub fn weighted_return() -> bool {
    DEFAULTS.search.weighted_return
}
pub fn root_action_prob_smoothing() -> u32 {
    DEFAULTS.search.root_action_prob_smoothing
}
pub fn root_state_prob_smoothing() -> u32 {
    DEFAULTS.search.root_state_prob_smoothing
}
pub fn max_rollout_steps() -> usize {
    DEFAULTS.search.max_rollout_steps
}
pub fn seeding() -> bool {
    DEFAULTS.search.seeding
}

// Selection
pub fn selection_kind() -> &'static str {
    &DEFAULTS.search.selection.kind
}
pub fn c0() -> f64 {
    DEFAULTS.search.selection.c0
}
pub fn min_visits() -> u32 {
    DEFAULTS.search.selection.min_visits
}
pub fn weighted_selection() -> bool {
    DEFAULTS.search.selection.weighted_selection
}
pub fn ismcts() -> bool {
    DEFAULTS.search.selection.ismcts
}
pub fn rave_v() -> u32 {
    DEFAULTS.search.selection.v
}

// Update
pub fn update_kind() -> &'static str {
    &DEFAULTS.search.update.kind
}
pub fn expected_return() -> bool {
    DEFAULTS.search.update.expected_return
}
pub fn every_visit() -> bool {
    DEFAULTS.search.update.every_visit
}
