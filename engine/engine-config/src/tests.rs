//! Tests for the configuration module.

use super::*;
use once_cell::sync::Lazy;
use std::sync::Mutex;

/// Serializes tests that mutate process environment variables
static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

#[test]
fn test_default_config() {
    let config = CentralConfig::default();
    assert_eq!(config.common.log_level, "info");
    assert_eq!(config.search.n_iterations, 10000);
    assert_eq!(config.search.n_threads, 4);
    assert_eq!(config.search.time_limit_ms, 0);
    assert_eq!(config.search.tree_size, 500000);
    assert_eq!(config.search.max_tree_depth, 50);
    assert!(config.search.afterstates);
    assert!(!config.search.pomcp);
    assert!(config.search.seed.is_none());
}

#[test]
fn test_search_defaults() {
    let config = SearchConfig::default();
    assert_eq!(config.n_rollouts_per_iteration, 1);
    assert!(!config.average_rollouts_results);
    assert!(!config.weighted_return);
    assert_eq!(config.root_action_prob_smoothing, 1);
    assert_eq!(config.root_state_prob_smoothing, 1);
    assert_eq!(config.max_rollout_steps, 100000);
    assert!(!config.seeding);
}

#[test]
fn test_policy_defaults() {
    let config = SearchConfig::default();
    assert_eq!(config.selection.kind(), "uct");
    let params = config.selection.params();
    assert!((params.c0 - 1.0).abs() < f64::EPSILON);
    assert_eq!(params.min_visits, 1);
    assert!(params.weighted_selection);
    assert!(!params.ismcts);

    assert_eq!(config.update.kind(), "state");
    assert!(!config.update.params().expected_return);
    assert!(!config.update.params().every_visit);
}

#[test]
fn test_parse_config_toml() {
    let toml_content = r#"
[common]
log_level = "debug"

[search]
n_iterations = 2000
n_threads = 8
time_limit_ms = 250
afterstates = false
seed = 42

[search.selection]
type = "puct"
c0 = 1.5
min_visits = 3

[search.update]
type = "action"
every_visit = true
"#;
    let config: CentralConfig = toml::from_str(toml_content).unwrap();
    assert_eq!(config.common.log_level, "debug");
    assert_eq!(config.search.n_iterations, 2000);
    assert_eq!(config.search.n_threads, 8);
    assert_eq!(config.search.time_limit_ms, 250);
    assert!(!config.search.afterstates);
    assert_eq!(config.search.seed, Some(42));

    match &config.search.selection {
        SelectionConfig::Puct(p) => {
            assert!((p.c0 - 1.5).abs() < f64::EPSILON);
            assert_eq!(p.min_visits, 3);
            assert!(p.weighted_selection); // Default
        }
        other => panic!("expected puct, got {:?}", other),
    }

    assert_eq!(
        config.search.update,
        UpdateConfig::Action(UpdateParams {
            expected_return: false,
            every_visit: true,
        })
    );
}

#[test]
fn test_parse_rave_table() {
    let toml_content = r#"
[search.selection]
type = "rave"
c0 = 0.7
v = 200
"#;
    let config: CentralConfig = toml::from_str(toml_content).unwrap();
    match &config.search.selection {
        SelectionConfig::Rave(r) => {
            assert_eq!(r.v, 200);
            assert!((r.base.c0 - 0.7).abs() < f64::EPSILON);
            assert_eq!(r.base.min_visits, 1); // Default
        }
        other => panic!("expected rave, got {:?}", other),
    }
}

#[test]
fn test_unknown_selection_type_rejected() {
    let toml_content = r#"
[search.selection]
type = "epsilon_greedy"
"#;
    let parsed: Result<CentralConfig, _> = toml::from_str(toml_content);
    assert!(parsed.is_err());
}

#[test]
fn test_partial_config() {
    let toml_content = r#"
[search]
n_iterations = 500
"#;
    let config: CentralConfig = toml::from_str(toml_content).unwrap();
    assert_eq!(config.search.n_iterations, 500);
    assert_eq!(config.search.n_threads, 4); // Default
    assert_eq!(config.common.log_level, "info"); // Default
    assert_eq!(config.search.selection.kind(), "uct"); // Default
}

#[test]
fn test_search_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    std::env::set_var("MCTS_SEARCH_N_ITERATIONS", "77");
    std::env::set_var("MCTS_SEARCH_POMCP", "true");
    std::env::set_var("MCTS_SEARCH_SEED", "9");
    std::env::set_var("MCTS_COMMON_LOG_LEVEL", "trace");

    let config = apply_env_overrides(CentralConfig::default());
    assert_eq!(config.search.n_iterations, 77);
    assert!(config.search.pomcp);
    assert_eq!(config.search.seed, Some(9));
    assert_eq!(config.common.log_level, "trace");

    std::env::remove_var("MCTS_SEARCH_N_ITERATIONS");
    std::env::remove_var("MCTS_SEARCH_POMCP");
    std::env::remove_var("MCTS_SEARCH_SEED");
    std::env::remove_var("MCTS_COMMON_LOG_LEVEL");
}

#[test]
fn test_policy_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    std::env::set_var("MCTS_SELECTION_TYPE", "rave");
    std::env::set_var("MCTS_SELECTION_C0", "0.25");
    std::env::set_var("MCTS_SELECTION_V", "10");
    std::env::set_var("MCTS_UPDATE_EXPECTED_RETURN", "true");

    let config = apply_env_overrides(CentralConfig::default());
    match &config.search.selection {
        SelectionConfig::Rave(r) => {
            assert_eq!(r.v, 10);
            assert!((r.base.c0 - 0.25).abs() < f64::EPSILON);
        }
        other => panic!("expected rave, got {:?}", other),
    }
    assert!(config.search.update.params().expected_return);

    std::env::remove_var("MCTS_SELECTION_TYPE");
    std::env::remove_var("MCTS_SELECTION_C0");
    std::env::remove_var("MCTS_SELECTION_V");
    std::env::remove_var("MCTS_UPDATE_EXPECTED_RETURN");
}

#[test]
fn test_invalid_env_value_ignored() {
    let _guard = ENV_LOCK.lock().unwrap();
    std::env::set_var("MCTS_SEARCH_N_THREADS", "many");
    std::env::set_var("MCTS_SELECTION_TYPE", "nope");

    let config = apply_env_overrides(CentralConfig::default());
    assert_eq!(config.search.n_threads, 4);
    assert_eq!(config.search.selection.kind(), "uct");

    std::env::remove_var("MCTS_SEARCH_N_THREADS");
    std::env::remove_var("MCTS_SELECTION_TYPE");
}

#[test]
fn test_load_from_missing_path_falls_back() {
    let _guard = ENV_LOCK.lock().unwrap();
    let config = load_from_path(std::path::Path::new("/nonexistent/mcts.toml"));
    assert_eq!(config.search.n_iterations, 10000);
}

#[test]
fn test_load_from_path() {
    let _guard = ENV_LOCK.lock().unwrap();
    let path = std::env::temp_dir().join(format!("mcts-config-test-{}.toml", std::process::id()));
    std::fs::write(&path, "[search]\nmax_tree_depth = 12\n").unwrap();

    let config = load_from_path(&path);
    assert_eq!(config.search.max_tree_depth, 12);

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn test_invalid_log_filter() {
    if std::env::var("RUST_LOG").is_ok() {
        return;
    }
    let err = init_tracing("mcts=loudest").unwrap_err();
    assert!(matches!(err, LoggingError::InvalidFilter { .. }));
}

#[test]
fn test_config_clone() {
    let config = CentralConfig::default();
    let cloned = config.clone();
    assert_eq!(config.search.selection, cloned.search.selection);
    assert_eq!(config.common.log_level, cloned.common.log_level);
}
