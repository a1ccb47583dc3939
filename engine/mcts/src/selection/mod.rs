//! Selection policies.
//!
//! Every policy shares the same mechanics and differs only in the exploration
//! formula it plugs in:
//!
//! 1. Freeze each edge's statistics (from the child nodes, or from the parent's
//!    per-action slots in action-indexed mode).
//! 2. Children visited fewer than `min_visits` times get a forcing score above
//!    anything the formula can produce, with a random tie-break, and mark the
//!    node as "not all siblings visited".
//! 3. Everything else is scored by the formula plus a tiny random term.
//! 4. Scores are multiplied by the edge's legality weight; a weight of zero
//!    excludes the edge.
//! 5. The best edge gets a virtual loss immediately, before its statistics are
//!    committed, so concurrent workers spread out.
//!
//! Chance nodes bypass all of this: an outcome is sampled from the domain.

pub mod puct;
pub mod rave;
pub mod uct;

pub use puct::Puct;
pub use rave::Rave;
pub use uct::Uct;

use crate::node::{EdgeSnapshot, Edges, NodeKind, StatisticsMode, TreeNode};
use crate::path::{Descent, VirtualLoss, Visit};
use crate::search::SearchError;
use crate::tree::Tree;
use engine_config::{SelectionConfig, SelectionParams};
use engine_core::{ActionList, ActionOf, Domain, DomainFactory};
use rand::Rng;
use rand_chacha::ChaCha20Rng;
use std::sync::Arc;

/// Magnitude of the random term added to computed scores.
pub const EPS: f64 = 1e-6;

/// Base score of an under-visited edge. Far above any computed score while
/// leaving room for the random tie-break to register.
const FORCED_SCORE: f64 = 1.0e9;

/// Exploration formula plugged into the shared selection mechanics.
pub trait ExplorationPolicy {
    /// Where this policy reads edge statistics from.
    fn statistics_mode(&self) -> StatisticsMode;

    fn params(&self) -> &SelectionParams;

    /// Score of an edge that has been visited at least `min_visits` times.
    fn score(&self, edge: &EdgeSnapshot, parent_visits: u32, prior: f64) -> f64;
}

/// Outcome of one selection step.
#[derive(Debug)]
pub struct Selection<A> {
    pub visit: Visit<A>,
    /// False when some child of the selecting node is still under-visited.
    pub all_siblings_visited: bool,
}

/// The closed family of selection policies.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionPolicy {
    Uct(Uct),
    UctAction(Uct),
    Puct(Puct),
    Rave(Rave),
}

impl SelectionPolicy {
    pub fn uct(params: SelectionParams) -> Self {
        Self::Uct(Uct::state_indexed(params))
    }

    pub fn uct_action(params: SelectionParams) -> Self {
        Self::UctAction(Uct::action_indexed(params))
    }

    pub fn puct(params: SelectionParams) -> Self {
        Self::Puct(Puct::new(params))
    }

    pub fn rave(params: SelectionParams, v: u32) -> Self {
        Self::Rave(Rave::new(params, v))
    }

    fn exploration(&self) -> &dyn ExplorationPolicy {
        match self {
            Self::Uct(p) | Self::UctAction(p) => p,
            Self::Puct(p) => p,
            Self::Rave(p) => p,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Uct(_) => "uct",
            Self::UctAction(_) => "uct_action",
            Self::Puct(_) => "puct",
            Self::Rave(_) => "rave",
        }
    }

    #[inline]
    pub fn statistics_mode(&self) -> StatisticsMode {
        self.exploration().statistics_mode()
    }

    #[inline]
    pub fn params(&self) -> &SelectionParams {
        self.exploration().params()
    }

    pub fn params_mut(&mut self) -> &mut SelectionParams {
        match self {
            Self::Uct(p) | Self::UctAction(p) => p.params_mut(),
            Self::Puct(p) => p.params_mut(),
            Self::Rave(p) => p.params_mut(),
        }
    }

    /// Whether priors feed into the score, i.e. whether seeding has any effect.
    pub fn uses_priors(&self) -> bool {
        matches!(self, Self::Puct(_) | Self::Rave(_))
    }

    /// Choose the edge to follow from `node`, which must be expanded or a
    /// chance node.
    pub fn select_child<F: DomainFactory>(
        &self,
        node: &Arc<TreeNode<ActionOf<F>>>,
        descent: &mut Descent<'_, F>,
    ) -> Result<Selection<ActionOf<F>>, SearchError> {
        match node.kind() {
            NodeKind::Chance => select_chance_outcome(node, descent),
            NodeKind::Standard(_) => {
                let edges = node.edges().ok_or(SearchError::NotExpanded)?;
                self.select_edge(node, edges, descent)
            }
        }
    }

    fn select_edge<F: DomainFactory>(
        &self,
        node: &Arc<TreeNode<ActionOf<F>>>,
        edges: &Edges<ActionOf<F>>,
        descent: &mut Descent<'_, F>,
    ) -> Result<Selection<ActionOf<F>>, SearchError> {
        let n = edges.len();
        if n == 0 {
            return Err(SearchError::NoLegalActions);
        }

        let mode = self.statistics_mode();
        let params = self.params();
        let player = node.current_player();

        let legality = match &descent.companion {
            Some(companion) => legality_mask(&companion.legal_actions(false), edges.actions()),
            None if params.weighted_selection => edges.legality().to_vec(),
            None => vec![1.0; n],
        };

        let mut priors = edges.priors();
        if descent.companion.is_some() {
            renormalize_over_legal(&mut priors, &legality);
        }

        // Freeze statistics
        let (children, snapshots) = match mode {
            StatisticsMode::StateIndexed => {
                let children = edges
                    .children()
                    .iter()
                    .map(|key| {
                        descent
                            .tree
                            .get(key)
                            .ok_or_else(|| SearchError::MissingNode(key.clone()))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                let snapshots: Vec<_> = children.iter().map(|c| c.snapshot(player)).collect();
                (children, snapshots)
            }
            StatisticsMode::ActionIndexed => (Vec::new(), edges.action_snapshots(player)),
        };
        let sum_visits: u32 = snapshots.iter().map(|s| s.visits).sum();

        let exploration = self.exploration();
        // A child with no visits has no mean to score
        let min_visits = params.min_visits.max(1);
        let mut all_siblings_visited = true;
        let mut best = 0;
        let mut best_score = f64::NEG_INFINITY;

        for (k, snapshot) in snapshots.iter().enumerate() {
            let raw = if snapshot.visits < min_visits {
                all_siblings_visited = false;
                FORCED_SCORE + descent.rng.gen::<f64>()
            } else {
                let parent_visits = match mode {
                    StatisticsMode::StateIndexed if params.ismcts => snapshot.parent_visits,
                    _ => sum_visits,
                };
                exploration.score(snapshot, parent_visits, priors[k])
                    + descent.rng.gen::<f64>() * EPS
            };
            let score = weight_by_legality(raw, legality[k]);

            if mode == StatisticsMode::StateIndexed && legality[k] == 1.0 {
                children[k].increment_parent_visits();
            }

            if score >= best_score {
                best_score = score;
                best = k;
            }
        }

        let child = match mode {
            StatisticsMode::StateIndexed => Arc::clone(&children[best]),
            StatisticsMode::ActionIndexed => {
                let key = &edges.children()[best];
                descent
                    .tree
                    .get(key)
                    .ok_or_else(|| SearchError::MissingNode(key.clone()))?
            }
        };

        // Domain code runs before any virtual loss is held outside a path
        descent.advance(node.key(), &edges.actions()[best]);

        let virtual_loss = match mode {
            StatisticsMode::StateIndexed => {
                child.add_virtual_loss();
                VirtualLoss::Node
            }
            StatisticsMode::ActionIndexed => {
                edges.add_action_virtual_loss(best);
                VirtualLoss::ParentEdge
            }
        };

        Ok(Selection {
            visit: Visit {
                node: child,
                action_prob: legality[best],
                edge: Some(best),
                virtual_loss,
            },
            all_siblings_visited,
        })
    }

    /// Mean return of each root edge for the player to move at the root,
    /// `None` for edges without statistics.
    pub fn children_values<A>(
        &self,
        root: &TreeNode<A>,
        tree: &Tree<A>,
    ) -> Result<Vec<Option<f64>>, SearchError> {
        let edges = root.edges().ok_or(SearchError::NotExpanded)?;
        let player = root.current_player();

        match self.statistics_mode() {
            StatisticsMode::StateIndexed => edges
                .children()
                .iter()
                .map(|key| {
                    tree.get(key)
                        .map(|child| child.mean_return(player))
                        .ok_or_else(|| SearchError::MissingNode(key.clone()))
                })
                .collect(),
            StatisticsMode::ActionIndexed => Ok(edges
                .action_snapshots(player)
                .iter()
                .map(|s| (s.visits > 0).then(|| s.returns / s.visits as f64))
                .collect()),
        }
    }

    /// Visit count of each root edge.
    pub fn children_visits<A>(
        &self,
        root: &TreeNode<A>,
        tree: &Tree<A>,
    ) -> Result<Vec<u32>, SearchError> {
        let edges = root.edges().ok_or(SearchError::NotExpanded)?;

        match self.statistics_mode() {
            StatisticsMode::StateIndexed => edges
                .children()
                .iter()
                .map(|key| {
                    tree.get(key)
                        .map(|child| child.visits())
                        .ok_or_else(|| SearchError::MissingNode(key.clone()))
                })
                .collect(),
            StatisticsMode::ActionIndexed => Ok(edges
                .action_snapshots(root.current_player())
                .iter()
                .map(|s| s.visits)
                .collect()),
        }
    }

    /// Root edge with the highest mean return, ties broken by a random
    /// epsilon. `None` while no edge has statistics.
    pub fn best_action_index<A>(
        &self,
        root: &TreeNode<A>,
        tree: &Tree<A>,
        rng: &mut ChaCha20Rng,
    ) -> Result<Option<usize>, SearchError> {
        let values = self.children_values(root, tree)?;
        let mut best = None;
        let mut best_value = f64::NEG_INFINITY;
        for (k, value) in values.iter().enumerate() {
            if let Some(v) = value {
                let v = v + rng.gen::<f64>() * EPS;
                if v >= best_value {
                    best_value = v;
                    best = Some(k);
                }
            }
        }
        Ok(best)
    }

    /// Root edge with the most visits, ties broken by a random epsilon.
    /// `None` while no edge was visited.
    pub fn most_explored_index<A>(
        &self,
        root: &TreeNode<A>,
        tree: &Tree<A>,
        rng: &mut ChaCha20Rng,
    ) -> Result<Option<usize>, SearchError> {
        let visits = self.children_visits(root, tree)?;
        let mut best = None;
        let mut most = f64::NEG_INFINITY;
        for (k, &v) in visits.iter().enumerate() {
            if v == 0 {
                continue;
            }
            let v = v as f64 + rng.gen::<f64>() * EPS;
            if v >= most {
                most = v;
                best = Some(k);
            }
        }
        Ok(best)
    }
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self::uct(SelectionParams::default())
    }
}

impl From<SelectionConfig> for SelectionPolicy {
    fn from(config: SelectionConfig) -> Self {
        match config {
            SelectionConfig::Uct(p) => Self::uct(p),
            SelectionConfig::UctAction(p) => Self::uct_action(p),
            SelectionConfig::Puct(p) => Self::puct(p),
            SelectionConfig::Rave(r) => Self::Rave(r.into()),
        }
    }
}

/// Resolve a chance node by sampling an outcome. The child is always
/// considered explored enough to descend further.
fn select_chance_outcome<F: DomainFactory>(
    node: &Arc<TreeNode<ActionOf<F>>>,
    descent: &mut Descent<'_, F>,
) -> Result<Selection<ActionOf<F>>, SearchError> {
    let mut game = descent.factory.domain_from_state(node.key().state());

    match descent.companion.as_mut() {
        None => {
            game.run_one_random_step(descent.rng)
                .ok_or(SearchError::NoLegalActions)?;
        }
        Some(companion) if companion.is_chance_node() => {
            // The hidden state decides; replay its outcome on the primary state
            let outcome = companion
                .sample_next_action(descent.rng)
                .ok_or(SearchError::NoLegalActions)?;
            companion.apply_action(&outcome, true);
            game.apply_action(&outcome, true);
        }
        Some(companion) => {
            // Chance that exists only in the belief: keep the primary state
            // consistent with whether the companion has finished
            let target = companion.is_terminal();
            let outcomes = game.legal_actions(false);
            let matching = outcomes.iter().find(|outcome| {
                let mut trial = game.clone();
                trial.apply_action(outcome, true);
                trial.is_terminal() == target
            });
            let outcome = match matching {
                Some(o) => o.clone(),
                None => outcomes
                    .choose(descent.rng)
                    .ok_or(SearchError::NoLegalActions)?,
            };
            game.apply_action(&outcome, true);
        }
    }

    descent.factory.observe(&game);
    let child = descent
        .tree
        .put_if_absent(TreeNode::from_domain(&game, descent.max_players()));

    Ok(Selection {
        visit: Visit {
            node: child,
            action_prob: 1.0,
            edge: None,
            virtual_loss: VirtualLoss::None,
        },
        all_siblings_visited: true,
    })
}

/// 1.0 for each of `actions` present in `legal`, 0.0 otherwise.
pub fn legality_mask<A: PartialEq>(legal: &ActionList<A>, actions: &[A]) -> Vec<f64> {
    actions
        .iter()
        .map(|a| if legal.contains(a) { 1.0 } else { 0.0 })
        .collect()
}

/// Multiply a score by its legality weight; zero weight excludes the edge.
#[inline]
pub fn weight_by_legality(score: f64, legality: f64) -> f64 {
    if legality == 0.0 {
        -f64::MAX
    } else {
        score * legality
    }
}

/// Zero the priors of illegal edges and rescale the rest to sum to one.
fn renormalize_over_legal(priors: &mut [f64], legality: &[f64]) {
    for (p, &l) in priors.iter_mut().zip(legality) {
        if l == 0.0 {
            *p = 0.0;
        }
    }
    let total: f64 = priors.iter().sum();
    if total > 0.0 {
        for p in priors.iter_mut() {
            *p /= total;
        }
    }
}
