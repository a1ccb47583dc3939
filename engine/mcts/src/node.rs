//! Tree node statistics.
//!
//! A node is shared by every worker through the transposition table, so all
//! of its mutable state is either atomic or behind a short per-node lock:
//!
//! - visit count, virtual loss and parent-visit counters are atomics
//! - the per-player return vector sits behind a mutex that also guards the
//!   compound "add returns + add visits" commit and the matching snapshot read
//! - the edge arrays of a standard node are written exactly once
//!
//! Standard nodes cache their children. Chance nodes cache nothing: every
//! traversal re-samples an outcome from the domain.

use crate::key::NodeKey;
use engine_core::Domain;
use once_cell::sync::OnceCell;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Where selection and update policies keep edge statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatisticsMode {
    /// Statistics live on the child node (afterstates / transpositions share them).
    StateIndexed,
    /// Statistics live on the parent, one slot per action.
    ActionIndexed,
}

/// Lock a mutex, recovering the data if another worker panicked while
/// holding it. Node data stays internally consistent under every lock.
#[inline]
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Decrement an atomic counter without wrapping below zero.
#[inline]
fn saturating_decrement(counter: &AtomicU32) {
    let _ = counter.fetch_update(Ordering::AcqRel, Ordering::Acquire, |v| v.checked_sub(1));
}

/// Statistics of one edge (or one child) frozen for a selection decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeSnapshot {
    pub visits: u32,
    /// Accumulated return for the player choosing at the parent.
    pub returns: f64,
    pub virtual_loss: u32,
    /// Visits of the parent while this child was available (ISMCTS).
    pub parent_visits: u32,
}

impl EdgeSnapshot {
    /// Mean return with in-flight visits counted as losses.
    #[inline]
    pub fn exploitation(&self) -> f64 {
        (self.returns - self.virtual_loss as f64) / self.visits as f64
    }
}

/// A node in the transposition tree.
#[derive(Debug)]
pub struct TreeNode<A> {
    key: NodeKey,
    current_player: usize,
    terminal: bool,
    visits: AtomicU32,
    virtual_loss: AtomicU32,
    parent_visits: AtomicU32,
    /// Set once priors have been overwritten by a seeder.
    evaluated: AtomicBool,
    returns: Mutex<Vec<f64>>,
    kind: NodeKind<A>,
}

#[derive(Debug)]
pub enum NodeKind<A> {
    Standard(StandardNode<A>),
    Chance,
}

#[derive(Debug)]
pub struct StandardNode<A> {
    edges: OnceCell<Edges<A>>,
}

impl<A> Default for StandardNode<A> {
    fn default() -> Self {
        Self {
            edges: OnceCell::new(),
        }
    }
}

/// Outgoing edges of an expanded standard node.
#[derive(Debug)]
pub struct Edges<A> {
    children: Vec<NodeKey>,
    actions: Vec<A>,
    legality: Vec<f64>,
    priors: Mutex<Vec<f64>>,
    action_stats: Option<Mutex<ActionStats>>,
}

/// Per-action statistics kept on the parent in action-indexed mode.
#[derive(Debug)]
struct ActionStats {
    visits: Vec<u32>,
    /// Indexed `[player][action]`
    returns: Vec<Vec<f64>>,
    virtual_loss: Vec<u32>,
}

impl<A> TreeNode<A> {
    /// Create a node for `domain`, a chance node if the domain is at a chance point.
    pub fn from_domain<D>(domain: &D, max_players: usize) -> Self
    where
        D: Domain<Action = A>,
    {
        let kind = if domain.is_chance_node() {
            NodeKind::Chance
        } else {
            NodeKind::Standard(StandardNode::default())
        };

        Self::with_kind(
            NodeKey::of(domain),
            domain.current_player(),
            domain.is_terminal(),
            max_players,
            kind,
        )
    }

    pub(crate) fn with_kind(
        key: NodeKey,
        current_player: usize,
        terminal: bool,
        max_players: usize,
        kind: NodeKind<A>,
    ) -> Self {
        Self {
            key,
            current_player,
            terminal,
            visits: AtomicU32::new(0),
            virtual_loss: AtomicU32::new(0),
            parent_visits: AtomicU32::new(0),
            evaluated: AtomicBool::new(false),
            returns: Mutex::new(vec![0.0; max_players]),
            kind,
        }
    }

    #[inline]
    pub fn key(&self) -> &NodeKey {
        &self.key
    }

    #[inline]
    pub fn current_player(&self) -> usize {
        self.current_player
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    #[inline]
    pub fn kind(&self) -> &NodeKind<A> {
        &self.kind
    }

    #[inline]
    pub fn is_chance(&self) -> bool {
        matches!(self.kind, NodeKind::Chance)
    }

    /// Whether the node has no cached children yet. Chance nodes never are.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        match &self.kind {
            NodeKind::Standard(s) => s.edges.get().is_none(),
            NodeKind::Chance => false,
        }
    }

    /// Whether expansion may populate this node's children.
    #[inline]
    pub fn can_expand(&self) -> bool {
        matches!(self.kind, NodeKind::Standard(_))
    }

    /// Edge arrays, once populated.
    #[inline]
    pub fn edges(&self) -> Option<&Edges<A>> {
        match &self.kind {
            NodeKind::Standard(s) => s.edges.get(),
            NodeKind::Chance => None,
        }
    }

    #[inline]
    pub fn visits(&self) -> u32 {
        self.visits.load(Ordering::Acquire)
    }

    #[inline]
    pub fn virtual_loss(&self) -> u32 {
        self.virtual_loss.load(Ordering::Acquire)
    }

    #[inline]
    pub fn parent_visits(&self) -> u32 {
        self.parent_visits.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_evaluated(&self) -> bool {
        self.evaluated.load(Ordering::Acquire)
    }

    /// Copy of the accumulated per-player returns.
    pub fn returns(&self) -> Vec<f64> {
        lock(&self.returns).clone()
    }

    /// Mean return for `player`, `None` before the first visit.
    pub fn mean_return(&self, player: usize) -> Option<f64> {
        let returns = lock(&self.returns);
        let visits = self.visits();
        if visits == 0 {
            return None;
        }
        returns.get(player).map(|r| r / visits as f64)
    }

    /// Consistent view of this node as a child seen by `player`.
    pub fn snapshot(&self, player: usize) -> EdgeSnapshot {
        let returns = lock(&self.returns);
        EdgeSnapshot {
            visits: self.visits(),
            returns: returns.get(player).copied().unwrap_or(0.0),
            virtual_loss: self.virtual_loss(),
            parent_visits: self.parent_visits(),
        }
    }

    /// Commit a reward vector observed `n_rollouts` times.
    pub fn update(&self, reward: &[f64], n_rollouts: u32) {
        let mut returns = lock(&self.returns);
        for (acc, r) in returns.iter_mut().zip(reward) {
            *acc += r;
        }
        self.visits.fetch_add(n_rollouts, Ordering::AcqRel);
    }

    /// Count visits without touching returns.
    pub fn add_visits(&self, n_rollouts: u32) {
        let _returns = lock(&self.returns);
        self.visits.fetch_add(n_rollouts, Ordering::AcqRel);
    }

    #[inline]
    pub fn add_virtual_loss(&self) {
        self.virtual_loss.fetch_add(1, Ordering::AcqRel);
    }

    #[inline]
    pub fn release_virtual_loss(&self) {
        saturating_decrement(&self.virtual_loss);
    }

    #[inline]
    pub fn increment_parent_visits(&self) {
        self.parent_visits.fetch_add(1, Ordering::AcqRel);
    }

    /// Populate the edge arrays. Priors start uniform. Only the first caller
    /// wins; later callers leave the node untouched and get `false`.
    ///
    /// Returns `false` for chance nodes, which never cache children.
    pub fn add_children(
        &self,
        children: Vec<NodeKey>,
        actions: Vec<A>,
        legality: Vec<f64>,
        mode: StatisticsMode,
        max_players: usize,
    ) -> bool {
        let NodeKind::Standard(standard) = &self.kind else {
            return false;
        };

        let mut populated = false;
        standard.edges.get_or_init(|| {
            populated = true;
            Edges::new(children, actions, legality, mode, max_players)
        });
        populated
    }

    /// Overwrite the uniform priors once. Returns `false` if the node was
    /// already evaluated, is not expanded, or `priors` has the wrong length.
    pub fn set_priors(&self, priors: Vec<f64>) -> bool {
        let Some(edges) = self.edges() else {
            return false;
        };
        if priors.len() != edges.len() {
            return false;
        }
        if self
            .evaluated
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        *lock(&edges.priors) = priors;
        true
    }
}

impl<A> Edges<A> {
    fn new(
        children: Vec<NodeKey>,
        actions: Vec<A>,
        legality: Vec<f64>,
        mode: StatisticsMode,
        max_players: usize,
    ) -> Self {
        let n = children.len();
        debug_assert_eq!(n, actions.len());
        debug_assert_eq!(n, legality.len());

        let uniform = if n == 0 { 0.0 } else { 1.0 / n as f64 };
        let action_stats = match mode {
            StatisticsMode::ActionIndexed => Some(Mutex::new(ActionStats {
                visits: vec![0; n],
                returns: vec![vec![0.0; n]; max_players],
                virtual_loss: vec![0; n],
            })),
            StatisticsMode::StateIndexed => None,
        };

        Self {
            children,
            actions,
            legality,
            priors: Mutex::new(vec![uniform; n]),
            action_stats,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    #[inline]
    pub fn children(&self) -> &[NodeKey] {
        &self.children
    }

    #[inline]
    pub fn actions(&self) -> &[A] {
        &self.actions
    }

    #[inline]
    pub fn legality(&self) -> &[f64] {
        &self.legality
    }

    pub fn priors(&self) -> Vec<f64> {
        lock(&self.priors).clone()
    }

    /// Index of the first edge leading to `key`.
    pub fn child_index(&self, key: &NodeKey) -> Option<usize> {
        self.children.iter().position(|k| k == key)
    }

    #[inline]
    pub fn has_action_stats(&self) -> bool {
        self.action_stats.is_some()
    }

    /// Frozen per-action statistics for `player`. Empty unless action-indexed.
    pub fn action_snapshots(&self, player: usize) -> Vec<EdgeSnapshot> {
        let Some(stats) = &self.action_stats else {
            return Vec::new();
        };
        let stats = lock(stats);
        (0..self.len())
            .map(|k| EdgeSnapshot {
                visits: stats.visits[k],
                returns: stats.returns.get(player).map_or(0.0, |r| r[k]),
                virtual_loss: stats.virtual_loss[k],
                parent_visits: 0,
            })
            .collect()
    }

    /// Commit a reward observed `n_rollouts` times through edge `index`.
    pub fn update_action(&self, index: usize, reward: &[f64], n_rollouts: u32) {
        let Some(stats) = &self.action_stats else {
            return;
        };
        let mut stats = lock(stats);
        if index >= stats.visits.len() {
            return;
        }
        for (per_player, r) in stats.returns.iter_mut().zip(reward) {
            per_player[index] += r;
        }
        stats.visits[index] += n_rollouts;
    }

    pub fn add_action_virtual_loss(&self, index: usize) {
        if let Some(stats) = &self.action_stats {
            if let Some(v) = lock(stats).virtual_loss.get_mut(index) {
                *v += 1;
            }
        }
    }

    pub fn release_action_virtual_loss(&self, index: usize) {
        if let Some(stats) = &self.action_stats {
            if let Some(v) = lock(stats).virtual_loss.get_mut(index) {
                *v = v.saturating_sub(1);
            }
        }
    }
}
