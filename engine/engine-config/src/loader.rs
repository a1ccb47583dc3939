//! Configuration loading logic.
//!
//! Handles loading config from files and applying environment variable overrides.

use crate::{CentralConfig, SelectionConfig, UpdateConfig};
use std::path::Path;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Standard locations to search for mcts.toml
pub const CONFIG_SEARCH_PATHS: &[&str] = &[
    "mcts.toml",      // Current directory
    "../mcts.toml",   // Parent directory (when running from subdirectory)
    "/app/mcts.toml", // Docker container
];

/// Load the central configuration from mcts.toml.
///
/// Searches for mcts.toml in the following order:
/// 1. Path specified by MCTS_CONFIG environment variable
/// 2. Current directory (mcts.toml)
/// 3. Parent directory (../mcts.toml)
/// 4. Docker container path (/app/mcts.toml)
///
/// After loading, environment variable overrides are applied.
pub fn load_config() -> CentralConfig {
    // Check for explicit config path
    if let Ok(path) = std::env::var("MCTS_CONFIG") {
        let path = PathBuf::from(&path);
        if path.exists() {
            info!("Loading config from MCTS_CONFIG: {}", path.display());
            return load_from_path(&path);
        }
        warn!("MCTS_CONFIG={} not found, searching defaults", path.display());
    }

    // Search default locations
    for path_str in CONFIG_SEARCH_PATHS {
        let path = PathBuf::from(path_str);
        if path.exists() {
            info!("Loading config from {}", path.display());
            return load_from_path(&path);
        }
    }

    // Fall back to defaults
    debug!("No mcts.toml found, using built-in defaults");
    apply_env_overrides(CentralConfig::default())
}

/// Load configuration from a specific path.
pub fn load_from_path(path: &Path) -> CentralConfig {
    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => apply_env_overrides(config),
            Err(e) => {
                warn!("Failed to parse {}: {}, using defaults", path.display(), e);
                apply_env_overrides(CentralConfig::default())
            }
        },
        Err(e) => {
            warn!("Failed to read {}: {}, using defaults", path.display(), e);
            apply_env_overrides(CentralConfig::default())
        }
    }
}

/// Macro to reduce env override boilerplate
macro_rules! env_override {
    // String field
    ($target:expr, $key:expr) => {
        if let Ok(v) = std::env::var($key) {
            $target = v;
        }
    };
    // Parseable field (u32, usize, f64, bool, etc.)
    ($target:expr, $key:expr, parse) => {
        if let Ok(v) =
            std::env::var($key).and_then(|s| s.parse().map_err(|_| std::env::VarError::NotPresent))
        {
            $target = v;
        }
    };
    // Optional parseable field (Option<u64>, etc.)
    ($target:expr, $key:expr, optional_parse) => {
        if let Ok(v) =
            std::env::var($key).and_then(|s| s.parse().map_err(|_| std::env::VarError::NotPresent))
        {
            $target = Some(v);
        }
    };
}

/// Apply environment variable overrides to a configuration.
///
/// Environment variables follow the pattern: MCTS_<SECTION>_<KEY>
pub fn apply_env_overrides(mut config: CentralConfig) -> CentralConfig {
    // Common
    env_override!(config.common.log_level, "MCTS_COMMON_LOG_LEVEL");

    // Search
    let search = &mut config.search;
    env_override!(search.n_iterations, "MCTS_SEARCH_N_ITERATIONS", parse);
    env_override!(search.n_threads, "MCTS_SEARCH_N_THREADS", parse);
    env_override!(search.time_limit_ms, "MCTS_SEARCH_TIME_LIMIT_MS", parse);
    env_override!(search.tree_size, "MCTS_SEARCH_TREE_SIZE", parse);
    env_override!(search.max_tree_depth, "MCTS_SEARCH_MAX_TREE_DEPTH", parse);
    env_override!(search.afterstates, "MCTS_SEARCH_AFTERSTATES", parse);
    env_override!(search.pomcp, "MCTS_SEARCH_POMCP", parse);
    env_override!(
        search.n_rollouts_per_iteration,
        "MCTS_SEARCH_N_ROLLOUTS_PER_ITERATION",
        parse
    );
    env_override!(
        search.average_rollouts_results,
        "MCTS_SEARCH_AVERAGE_ROLLOUTS_RESULTS",
        parse
    );
    env_override!(search.weighted_return, "MCTS_SEARCH_WEIGHTED_RETURN", parse);
    env_override!(
        search.root_action_prob_smoothing,
        "MCTS_SEARCH_ROOT_ACTION_PROB_SMOOTHING",
        parse
    );
    env_override!(
        search.root_state_prob_smoothing,
        "MCTS_SEARCH_ROOT_STATE_PROB_SMOOTHING",
        parse
    );
    env_override!(
        search.max_rollout_steps,
        "MCTS_SEARCH_MAX_ROLLOUT_STEPS",
        parse
    );
    env_override!(search.seeding, "MCTS_SEARCH_SEEDING", parse);
    env_override!(search.seed, "MCTS_SEARCH_SEED", optional_parse);

    // Selection: the kind first so parameter overrides land on the new policy
    if let Ok(kind) = std::env::var("MCTS_SELECTION_TYPE") {
        let params = search.selection.params().clone();
        match SelectionConfig::from_kind(&kind, params) {
            Some(selection) => search.selection = selection,
            None => warn!("Ignoring unknown MCTS_SELECTION_TYPE={}", kind),
        }
    }
    let selection = search.selection.params_mut();
    env_override!(selection.c0, "MCTS_SELECTION_C0", parse);
    env_override!(selection.min_visits, "MCTS_SELECTION_MIN_VISITS", parse);
    env_override!(
        selection.weighted_selection,
        "MCTS_SELECTION_WEIGHTED_SELECTION",
        parse
    );
    env_override!(selection.ismcts, "MCTS_SELECTION_ISMCTS", parse);
    if let SelectionConfig::Rave(rave) = &mut search.selection {
        env_override!(rave.v, "MCTS_SELECTION_V", parse);
    }

    // Update
    if let Ok(kind) = std::env::var("MCTS_UPDATE_TYPE") {
        match UpdateConfig::from_kind(&kind, search.update.params()) {
            Some(update) => search.update = update,
            None => warn!("Ignoring unknown MCTS_UPDATE_TYPE={}", kind),
        }
    }
    let update = search.update.params_mut();
    env_override!(
        update.expected_return,
        "MCTS_UPDATE_EXPECTED_RETURN",
        parse
    );
    env_override!(update.every_visit, "MCTS_UPDATE_EVERY_VISIT", parse);

    config
}
