//! State carried by one search iteration while it descends the tree.

use crate::key::NodeKey;
use crate::node::TreeNode;
use crate::tree::Tree;
use engine_core::{ActionOf, Domain, DomainFactory};
use rand_chacha::ChaCha20Rng;
use std::sync::Arc;

/// Where selection left a virtual loss for this visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VirtualLoss {
    None,
    /// On the visited node itself (state-indexed statistics).
    Node,
    /// On the parent's slot for the edge taken (action-indexed statistics).
    ParentEdge,
}

/// One step of an iteration's descent.
#[derive(Debug)]
pub struct Visit<A> {
    pub node: Arc<TreeNode<A>>,
    /// Probability of the edge that led here (1.0 for the root).
    pub action_prob: f64,
    /// Index of that edge in the parent's edge arrays, if it has one.
    pub edge: Option<usize>,
    pub virtual_loss: VirtualLoss,
}

impl<A> Visit<A> {
    pub fn root(node: Arc<TreeNode<A>>) -> Self {
        Self {
            node,
            action_prob: 1.0,
            edge: None,
            virtual_loss: VirtualLoss::None,
        }
    }
}

/// Nodes visited from the root down to the rollout start.
#[derive(Debug)]
pub struct SearchPath<A> {
    visits: Vec<Visit<A>>,
}

impl<A> SearchPath<A> {
    pub fn new(root: Arc<TreeNode<A>>) -> Self {
        Self {
            visits: vec![Visit::root(root)],
        }
    }

    pub fn push(&mut self, visit: Visit<A>) {
        self.visits.push(visit);
    }

    /// Deepest node reached so far.
    pub fn last(&self) -> &Arc<TreeNode<A>> {
        // A path always holds at least the root
        &self.visits[self.visits.len() - 1].node
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.visits.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.visits.is_empty()
    }

    #[inline]
    pub fn visits(&self) -> &[Visit<A>] {
        &self.visits
    }

    /// Undo every virtual loss applied along the path. Safe to call twice.
    pub fn release_virtual_loss(&mut self) {
        for i in 0..self.visits.len() {
            match self.visits[i].virtual_loss {
                VirtualLoss::None => {}
                VirtualLoss::Node => self.visits[i].node.release_virtual_loss(),
                VirtualLoss::ParentEdge => {
                    if let (Some(index), Some(parent)) =
                        (self.visits[i].edge, i.checked_sub(1).map(|p| &self.visits[p]))
                    {
                        if let Some(edges) = parent.node.edges() {
                            edges.release_action_virtual_loss(index);
                        }
                    }
                }
            }
            self.visits[i].virtual_loss = VirtualLoss::None;
        }
    }
}

// An iteration that errors or panics before its update must not leave
// virtual loss behind.
impl<A> Drop for SearchPath<A> {
    fn drop(&mut self) {
        self.release_virtual_loss();
    }
}

/// Everything a policy may touch while one iteration descends: the shared
/// tree, the iteration's own factory clone (whose belief follows the path),
/// the sampled companion state in POMCP mode, and the worker's RNG.
pub struct Descent<'a, F: DomainFactory> {
    pub tree: &'a Tree<ActionOf<F>>,
    pub factory: F,
    pub companion: Option<F::Domain>,
    pub rng: &'a mut ChaCha20Rng,
}

impl<'a, F: DomainFactory> Descent<'a, F> {
    pub fn new(tree: &'a Tree<ActionOf<F>>, factory: F, rng: &'a mut ChaCha20Rng) -> Self {
        Self {
            tree,
            factory,
            companion: None,
            rng,
        }
    }

    #[inline]
    pub fn max_players(&self) -> usize {
        self.factory.max_players()
    }

    /// Whether the companion state has reached the end of its game.
    #[inline]
    pub fn companion_terminal(&self) -> bool {
        self.companion.as_ref().is_some_and(|c| c.is_terminal())
    }

    /// Follow a tree edge: advance the belief (if tracked) and the companion
    /// by the action taken from the node keyed `from`.
    pub fn advance(&mut self, from: &NodeKey, action: &ActionOf<F>) {
        if self.factory.belief().is_some() {
            let mut game = self.factory.domain_from_state(from.state());
            game.apply_action(action, false);
            self.factory.observe(&game);
        }
        if let Some(companion) = self.companion.as_mut() {
            companion.apply_action(action, false);
        }
    }
}
