//! Centralized configuration loading from mcts.toml.
//!
//! This crate provides the configuration structs, loading logic and logging
//! bootstrap shared by everything that embeds the search engine.
//!
//! # Configuration Priority
//!
//! Settings are loaded with the following priority (highest to lowest):
//! 1. Environment variables (`MCTS_<SECTION>_<KEY>`)
//! 2. mcts.toml file
//! 3. Built-in defaults (config.defaults.toml, embedded at compile time)
//!
//! # Environment Variable Override Pattern
//!
//! ```text
//! MCTS_<SECTION>_<KEY>=value
//!
//! Examples:
//!     MCTS_COMMON_LOG_LEVEL=debug
//!     MCTS_SEARCH_N_ITERATIONS=2000
//!     MCTS_SEARCH_TIME_LIMIT_MS=500
//!     MCTS_SELECTION_TYPE=puct
//!     MCTS_SELECTION_C0=1.4
//!     MCTS_UPDATE_EVERY_VISIT=true
//! ```
//!
//! # Policy tables
//!
//! Selection and update policies are tagged by `type`:
//!
//! ```toml
//! [search.selection]
//! type = "rave"
//! c0 = 0.7
//! v = 100
//!
//! [search.update]
//! type = "state"
//! expected_return = true
//! ```

mod defaults;
mod loader;
mod logging;
mod structs;

pub use defaults::*;
pub use loader::{apply_env_overrides, load_config, load_from_path, CONFIG_SEARCH_PATHS};
pub use logging::{init_tracing, LoggingError};
pub use structs::*;

#[cfg(test)]
mod tests;
