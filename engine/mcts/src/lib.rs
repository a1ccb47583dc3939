//! Multi-threaded Monte Carlo Tree Search over a shared transposition table.
//!
//! This crate provides a domain-agnostic MCTS engine that works with any
//! decision process implementing the `engine-core` [`Domain`] and
//! [`DomainFactory`] traits: multi-player, stochastic (explicit chance nodes)
//! and partially observable (beliefs, determinization sampling).
//!
//! # Overview
//!
//! Each iteration runs four phases on a worker thread:
//!
//! 1. **Selection**: Descend from the root with a pluggable exploration
//!    formula (UCT, PUCT, RAVE), applying virtual loss on the way down
//! 2. **Expansion**: Materialise every child of the reached leaf and continue
//!    through one of them
//! 3. **Simulation**: Play random rollouts to the end of the game
//! 4. **Backpropagation**: Commit the reward along the path, weighted by the
//!    probability of each step, and release virtual loss
//!
//! Iterations of one search share a single tree keyed by state and belief
//! fingerprint, so transpositions are one node. Statistics live either on
//! nodes (state-indexed) or on the parent's per-action slots
//! (action-indexed).
//!
//! # Usage
//!
//! ```rust
//! use engine_core::DomainFactory;
//! use games_tictactoe::TicTacToeFactory;
//! use mcts::{ActionCriterion, Mcts, MctsConfig};
//!
//! let factory = TicTacToeFactory;
//! let root = factory.new_domain();
//!
//! let config = MctsConfig::for_testing().with_iterations(200);
//! let mut mcts = Mcts::new(config, factory).unwrap();
//! mcts.new_tree(&root).unwrap();
//!
//! let summary = mcts.run().unwrap();
//! assert_eq!(summary.iterations, 200);
//!
//! let action = mcts.best_action(ActionCriterion::MostVisited).unwrap();
//! println!("Best action: {action:?}");
//! ```
//!
//! # Configuration
//!
//! [`MctsConfig`] controls search behavior. It is usually built from the
//! `[search]` section of the TOML config through [`engine_config`]:
//!
//! - `n_iterations`: Iteration budget, or hard ceiling under a time limit
//! - `n_threads`: Worker threads sharing the tree
//! - `selection`: Exploration formula and its constants (`c0`, `min_visits`)
//! - `update`: Backpropagation flavour (first-visit, expected return)
//! - `afterstates`: State-indexed statistics; incompatible policy pairs are
//!   corrected with a warning at construction
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                            Mcts                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐  │
//! │  │    Tree     │  │ WorkerPool  │  │   SearchListener    │  │
//! │  │ (DashMap)   │  │ (priority)  │  │ (iterations/time)   │  │
//! │  └──────┬──────┘  └──────┬──────┘  └──────────┬──────────┘  │
//! │         │                │                    │             │
//! │         ▼                ▼                    ▼             │
//! │  ┌──────────────────────────────────────────────────────┐   │
//! │  │       select → expand → simulate → update            │   │
//! │  │   (SearchWorker, one per queued iteration)           │   │
//! │  └──────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`Domain`]: engine_core::Domain
//! [`DomainFactory`]: engine_core::DomainFactory

pub mod config;
pub mod expansion;
pub mod key;
pub mod listener;
pub mod node;
pub mod path;
pub mod pool;
pub mod search;
pub mod seeder;
pub mod selection;
pub mod simulation;
pub mod tree;
pub mod update;
mod worker;

// Re-export main types
pub use config::{ConfigCorrection, ConfigError, MctsConfig};
pub use expansion::ExpansionPolicy;
pub use key::NodeKey;
pub use listener::{Completion, IterationListener, SearchListener, TimeListener};
pub use node::{EdgeSnapshot, Edges, NodeKind, StatisticsMode, TreeNode};
pub use path::{Descent, SearchPath, VirtualLoss, Visit};
pub use pool::{PoolHandle, Priority, WorkerPool};
pub use search::{ActionCriterion, Mcts, RankedAction, SearchError, SearchSummary};
pub use seeder::{SeedTrigger, Seeder};
pub use selection::{ExplorationPolicy, Puct, Rave, Selection, SelectionPolicy, Uct};
pub use simulation::SimulationPolicy;
pub use tree::{Tree, TreeStats};
pub use update::{ActionUpdater, StateUpdater, UpdatePolicy};
