//! Search controller.
//!
//! [`Mcts`] owns the configuration, the worker pool and the tree of the
//! current decision:
//! 1. `new_tree` rebuilds the tree from the new root and expands the root once
//! 2. `search` starts feeding iterations to the pool and returns the listener
//! 3. `run` additionally waits for the listener and for in-flight iterations
//! 4. best-action extraction reads the root's statistics

use crate::config::{ConfigError, MctsConfig};
use crate::key::NodeKey;
use crate::listener::{IterationListener, SearchListener, TimeListener};
use crate::path::Descent;
use crate::pool::{Priority, WorkerPool};
use crate::seeder::{SeedTrigger, Seeder};
use crate::selection::SelectionPolicy;
use crate::tree::{Tree, TreeStats};
use crate::worker::{IterationSettings, SearchContext, SearchWorker};
use engine_core::{ActionOf, Domain, DomainFactory};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info};

/// Iterations kept queued per worker thread.
const QUEUE_DEPTH: usize = 4;

/// Errors that can occur during MCTS search.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("No legal actions available")]
    NoLegalActions,

    #[error("Node {0:?} is referenced but missing from the tree")]
    MissingNode(NodeKey),

    #[error("Node has not been expanded")]
    NotExpanded,

    #[error("Sampled state chose an action the node does not list")]
    CompanionActionMismatch,

    #[error("Root state lists {actual} actions but the root node has {expected} children")]
    RootActionMismatch { expected: usize, actual: usize },

    #[error("Root state is terminal")]
    TerminalRoot,

    #[error("No tree: call new_tree first")]
    NoTree,

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to start worker threads: {0}")]
    ThreadSpawn(#[from] std::io::Error),
}

/// How the root action is picked after a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActionCriterion {
    /// Highest mean return for the player to move.
    #[default]
    HighestValue,
    MostVisited,
}

/// A root action with its statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedAction<A> {
    pub action: A,
    /// Mean return, `None` if never visited.
    pub value: Option<f64>,
    pub visits: u32,
}

/// Result of [`Mcts::run`].
#[derive(Debug, Clone)]
pub struct SearchSummary {
    /// Iterations recorded by the listener, failed ones included.
    pub iterations: u32,
    pub tree_size: usize,
    pub elapsed: Duration,
}

/// Multi-threaded MCTS controller.
pub struct Mcts<F: DomainFactory> {
    config: MctsConfig,
    factory: F,
    selection: SelectionPolicy,
    pool: WorkerPool,
    seeder: Option<Arc<dyn Seeder<F>>>,
    tree: Option<Arc<Tree<ActionOf<F>>>>,
    /// Feeder of the latest search.
    active: Option<Arc<SearchWorker<F>>>,
    /// Child chosen by the root pre-expansion.
    fallback: Option<usize>,
    rng: ChaCha20Rng,
}

impl<F: DomainFactory> Mcts<F> {
    /// Create a controller. Incompatible settings are corrected (with a
    /// warning) before validation.
    pub fn new(mut config: MctsConfig, factory: F) -> Result<Self, SearchError> {
        config.self_check();
        config.validate()?;

        let pool = WorkerPool::new(config.n_threads, config.seed)?;
        let rng = match config.seed {
            // Offset so the controller does not share a stream with worker 0
            Some(seed) => ChaCha20Rng::seed_from_u64(seed ^ 0x9E37_79B9_7F4A_7C15),
            None => ChaCha20Rng::from_entropy(),
        };

        info!(
            n_threads = config.n_threads,
            n_iterations = config.n_iterations,
            time_limit_ms = config.time_limit.map(|d| d.as_millis() as u64),
            selection = config.selection.kind(),
            update = config.update.kind(),
            afterstates = config.afterstates,
            pomcp = config.pomcp,
            "MCTS controller created"
        );

        Ok(Self {
            selection: config.selection_policy(),
            config,
            factory,
            pool,
            seeder: None,
            tree: None,
            active: None,
            fallback: None,
            rng,
        })
    }

    /// Attach a prior seeder. Only used when seeding is enabled.
    pub fn with_seeder(mut self, seeder: Arc<dyn Seeder<F>>) -> Self {
        self.seeder = Some(seeder);
        self
    }

    #[inline]
    pub fn config(&self) -> &MctsConfig {
        &self.config
    }

    #[inline]
    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Replace the factory, e.g. after the searching player's belief changed.
    pub fn set_factory(&mut self, factory: F) {
        self.factory = factory;
    }

    #[inline]
    pub fn tree(&self) -> Option<&Arc<Tree<ActionOf<F>>>> {
        self.tree.as_ref()
    }

    pub fn stats(&self) -> Option<TreeStats> {
        self.tree.as_ref().map(|t| t.stats())
    }

    fn trigger(&self) -> Option<SeedTrigger<F>> {
        if !self.config.seeding {
            return None;
        }
        self.seeder
            .as_ref()
            .map(|s| SeedTrigger::new(Arc::clone(s), self.pool.handle()))
    }

    fn stop_feeding(&mut self) {
        if let Some(worker) = self.active.take() {
            worker.cancel();
        }
        self.pool.cancel_pending();
    }

    /// Start a new decision from `root`. The root is expanded right away so
    /// that an action can be extracted even if no iteration completes.
    pub fn new_tree(&mut self, root: &F::Domain) -> Result<(), SearchError> {
        // Leftover work from the previous decision is stale
        self.stop_feeding();

        let tree = Arc::new(Tree::new(
            root,
            self.factory.max_players(),
            self.config.tree_size,
        ));
        self.fallback = None;

        let root_node = Arc::clone(tree.root());
        if !root_node.is_terminal() && root_node.can_expand() {
            let trigger = self.trigger();
            let mut descent = Descent::new(&tree, self.factory.clone(), &mut self.rng);
            let visit = self
                .config
                .expansion_policy()
                .expand(&root_node, &mut descent, trigger.as_ref())?;
            self.fallback = visit.edge;
        }

        debug!(
            root = ?root_node.key(),
            children = root_node.edges().map_or(0, |e| e.len()),
            "New tree"
        );
        self.tree = Some(tree);
        Ok(())
    }

    /// Start iterating in the background and return the listener that tracks
    /// the budget.
    pub fn search(&mut self) -> Result<Arc<dyn SearchListener>, SearchError> {
        let tree = self.tree.clone().ok_or(SearchError::NoTree)?;
        let n_iterations = self.config.n_iterations;

        let listener: Arc<dyn SearchListener> = match self.config.time_limit {
            Some(limit) => Arc::new(TimeListener::new(limit, n_iterations, self.pool.handle())),
            None => Arc::new(IterationListener::new(n_iterations, self.pool.handle())),
        };

        let context = Arc::new(SearchContext {
            tree,
            factory: self.factory.clone(),
            selection: self.selection.clone(),
            update: self.config.update_policy(),
            expansion: self.config.expansion_policy(),
            simulation: self.config.simulation_policy(),
            trigger: self.trigger(),
            settings: IterationSettings {
                max_tree_depth: self.config.max_tree_depth,
                pomcp: self.config.pomcp,
                n_rollouts: self.config.n_rollouts_per_iteration,
                average_rollouts: self.config.average_rollouts_results,
                weighted_return: self.config.weighted_return,
                root_state_prob_smoothing: self.config.root_state_prob_smoothing,
            },
        });

        let worker = Arc::new(SearchWorker::new(
            context,
            Arc::clone(&listener),
            self.pool.handle(),
            n_iterations,
        ));
        for _ in 0..self.config.n_threads * QUEUE_DEPTH {
            if !worker.queue_next() {
                break;
            }
        }
        // A time budget may have expired while queueing
        if listener.has_finished() {
            self.pool.cancel_pending();
        }
        if let Some(previous) = self.active.replace(worker) {
            previous.cancel();
        }

        Ok(listener)
    }

    /// Search until the budget is spent and every started iteration has
    /// committed.
    pub fn run(&mut self) -> Result<SearchSummary, SearchError> {
        let start = Instant::now();
        let listener = self.search()?;
        listener.wait_for_finish();
        self.pool.wait_idle();

        let summary = SearchSummary {
            iterations: listener.iterations(),
            tree_size: self.tree.as_ref().map_or(0, |t| t.len()),
            elapsed: start.elapsed(),
        };
        info!(
            iterations = summary.iterations,
            tree_size = summary.tree_size,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "Search complete"
        );
        Ok(summary)
    }

    /// Index of the chosen root action in the root's action order.
    ///
    /// Falls back to the child picked by the root pre-expansion while no
    /// child has statistics.
    pub fn best_action_index(&mut self, criterion: ActionCriterion) -> Result<usize, SearchError> {
        let tree = self.tree.as_ref().ok_or(SearchError::NoTree)?;
        let root = tree.root();
        if root.is_terminal() {
            return Err(SearchError::TerminalRoot);
        }

        let best = match criterion {
            ActionCriterion::HighestValue => {
                self.selection.best_action_index(root, tree, &mut self.rng)?
            }
            ActionCriterion::MostVisited => {
                self.selection.most_explored_index(root, tree, &mut self.rng)?
            }
        };
        best.or(self.fallback).ok_or(SearchError::NotExpanded)
    }

    /// The chosen root action.
    pub fn best_action(&mut self, criterion: ActionCriterion) -> Result<ActionOf<F>, SearchError> {
        let index = self.best_action_index(criterion)?;
        let tree = self.tree.as_ref().ok_or(SearchError::NoTree)?;
        let edges = tree.root().edges().ok_or(SearchError::NotExpanded)?;
        edges
            .actions()
            .get(index)
            .cloned()
            .ok_or(SearchError::NotExpanded)
    }

    /// Root actions ordered by mean return, best first; unvisited last.
    ///
    /// The root state's exhaustive action list must line up with the root's
    /// children, otherwise the tree does not describe this state.
    pub fn ranked_actions(&self) -> Result<Vec<RankedAction<ActionOf<F>>>, SearchError> {
        let tree = self.tree.as_ref().ok_or(SearchError::NoTree)?;
        let root = tree.root();
        let values = self.selection.children_values(root, tree)?;
        let visits = self.selection.children_visits(root, tree)?;

        let legal = self
            .factory
            .domain_from_state(root.key().state())
            .legal_actions(false);
        if legal.len() != values.len() {
            return Err(SearchError::RootActionMismatch {
                expected: values.len(),
                actual: legal.len(),
            });
        }

        let mut ranked: Vec<_> = legal
            .iter()
            .zip(values)
            .zip(visits)
            .map(|((action, value), visits)| RankedAction {
                action: action.clone(),
                value,
                visits,
            })
            .collect();
        ranked.sort_by(|a, b| match (a.value, b.value) {
            (Some(x), Some(y)) => y.total_cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });
        Ok(ranked)
    }
}

impl<F: DomainFactory> Drop for Mcts<F> {
    fn drop(&mut self) {
        self.stop_feeding();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use games_tictactoe::{Action, State, TicTacToeFactory};

    fn controller(config: MctsConfig) -> Mcts<TicTacToeFactory> {
        Mcts::new(config, TicTacToeFactory).unwrap()
    }

    #[test]
    fn test_search_requires_tree() {
        let mut mcts = controller(MctsConfig::for_testing());
        assert!(matches!(mcts.run(), Err(SearchError::NoTree)));
        assert!(matches!(
            mcts.best_action(ActionCriterion::MostVisited),
            Err(SearchError::NoTree)
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = MctsConfig::for_testing().with_threads(0);
        let result = Mcts::new(config, TicTacToeFactory);
        assert!(matches!(result, Err(SearchError::Config(ConfigError::NoThreads))));
    }

    #[test]
    fn test_new_tree_expands_root() {
        let mut mcts = controller(MctsConfig::for_testing());
        mcts.new_tree(&State::new()).unwrap();

        let stats = mcts.stats().unwrap();
        assert_eq!(stats.root_children, 9);
        assert_eq!(stats.total_nodes, 10);
        assert_eq!(stats.root_visits, 0);
    }

    #[test]
    fn test_best_action_before_search_uses_fallback() {
        let mut mcts = controller(MctsConfig::for_testing());
        mcts.new_tree(&State::new()).unwrap();

        let index = mcts.best_action_index(ActionCriterion::HighestValue).unwrap();
        assert!(index < 9);
        let index = mcts.best_action_index(ActionCriterion::MostVisited).unwrap();
        assert!(index < 9);
    }

    #[test]
    fn test_terminal_root() {
        let mut mcts = controller(MctsConfig::for_testing());
        mcts.new_tree(&State::from_board("XXXOO....")).unwrap();

        assert!(matches!(
            mcts.best_action_index(ActionCriterion::HighestValue),
            Err(SearchError::TerminalRoot)
        ));
    }

    #[test]
    fn test_run_counts_iterations() {
        let mut mcts = controller(MctsConfig::for_testing().with_iterations(300));
        mcts.new_tree(&State::new()).unwrap();

        let summary = mcts.run().unwrap();
        assert_eq!(summary.iterations, 300);
        assert!(summary.tree_size > 10);
        assert_eq!(mcts.stats().unwrap().root_visits, 300);
    }

    #[test]
    fn test_zero_iterations() {
        let mut mcts = controller(MctsConfig::for_testing().with_iterations(0));
        mcts.new_tree(&State::new()).unwrap();

        let summary = mcts.run().unwrap();
        assert_eq!(summary.iterations, 0);
        assert!(mcts.best_action(ActionCriterion::MostVisited).is_ok());
    }

    #[test]
    fn test_finds_winning_move() {
        // X to move, top row is one short
        let root = State::from_board("XX.OO....");
        let mut mcts = controller(MctsConfig::for_testing().with_iterations(2_000));
        mcts.new_tree(&root).unwrap();
        mcts.run().unwrap();

        assert_eq!(
            mcts.best_action(ActionCriterion::HighestValue).unwrap(),
            Action::Place(2)
        );
        assert_eq!(
            mcts.best_action(ActionCriterion::MostVisited).unwrap(),
            Action::Place(2)
        );
    }

    #[test]
    fn test_ranked_actions_sorted() {
        let root = State::from_board("XX.OO....");
        let mut mcts = controller(MctsConfig::for_testing().with_iterations(1_000));
        mcts.new_tree(&root).unwrap();
        mcts.run().unwrap();

        let ranked = mcts.ranked_actions().unwrap();
        assert_eq!(ranked.len(), 5);
        assert_eq!(ranked[0].action, Action::Place(2));
        let values: Vec<f64> = ranked.iter().filter_map(|r| r.value).collect();
        assert!(values.windows(2).all(|w| w[0] >= w[1]));
        let visits: u32 = ranked.iter().map(|r| r.visits).sum();
        assert_eq!(visits, 1_000);
    }

    #[test]
    fn test_time_limited_run() {
        let config = MctsConfig::for_testing()
            .with_iterations(u32::MAX)
            .with_threads(2)
            .with_time_limit(Duration::from_millis(50));
        let mut mcts = controller(config);
        mcts.new_tree(&State::new()).unwrap();

        let summary = mcts.run().unwrap();
        assert!(summary.iterations > 0);
        assert!(summary.elapsed >= Duration::from_millis(50));
        assert!(mcts.best_action(ActionCriterion::MostVisited).is_ok());
    }

    #[test]
    fn test_new_tree_resets_search() {
        let mut mcts = controller(MctsConfig::for_testing().with_iterations(100));
        mcts.new_tree(&State::new()).unwrap();
        mcts.run().unwrap();

        let next = State::new().make_move(4);
        mcts.new_tree(&next).unwrap();
        let stats = mcts.stats().unwrap();
        assert_eq!(stats.root_visits, 0);
        assert_eq!(stats.root_children, 8);
    }
}
