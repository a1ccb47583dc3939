//! Expansion policy.
//!
//! Expansion materialises every child of a leaf standard node, records the
//! edge arrays once, and continues the iteration through one of the new
//! children picked at random.

use crate::node::{StatisticsMode, TreeNode};
use crate::path::{Descent, VirtualLoss, Visit};
use crate::search::SearchError;
use crate::seeder::SeedTrigger;
use crate::selection::legality_mask;
use engine_core::{ActionOf, Domain, DomainFactory};
use rand::Rng;
use std::sync::Arc;
use tracing::trace;

/// How expansion lays out a node's edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpansionPolicy {
    mode: StatisticsMode,
    /// Legality probabilities are raised to `1 / smoothing` when above 1.
    action_prob_smoothing: u32,
}

impl ExpansionPolicy {
    pub fn new(mode: StatisticsMode, action_prob_smoothing: u32) -> Self {
        Self {
            mode,
            action_prob_smoothing,
        }
    }

    #[inline]
    pub fn statistics_mode(&self) -> StatisticsMode {
        self.mode
    }

    /// Expand `node` and return the child the iteration continues through.
    ///
    /// Safe to race: only the first caller populates the edge arrays, later
    /// callers insert the same children (a no-op) and pick from the same
    /// exhaustive action order.
    pub fn expand<F: DomainFactory>(
        &self,
        node: &Arc<TreeNode<ActionOf<F>>>,
        descent: &mut Descent<'_, F>,
        trigger: Option<&SeedTrigger<F>>,
    ) -> Result<Visit<ActionOf<F>>, SearchError> {
        let game = descent.factory.domain_from_state(node.key().state());
        let (actions, probabilities) = game.legal_actions(false).into_parts();
        if actions.is_empty() {
            return Err(SearchError::NoLegalActions);
        }

        let companion_actions = descent.companion.as_ref().map(|c| c.legal_actions(false));
        let mask = match &companion_actions {
            Some(legal) => legality_mask(legal, &actions),
            None => vec![1.0; actions.len()],
        };

        let max_players = descent.max_players();
        let mut children = Vec::with_capacity(actions.len());
        for (action, &legal) in actions.iter().zip(&mask) {
            let mut next = game.clone();
            next.apply_action(action, false);
            let child = descent
                .tree
                .put_if_absent(TreeNode::from_domain(&next, max_players));
            if legal == 1.0 {
                child.increment_parent_visits();
            }
            children.push(child);
        }

        let legality = match probabilities {
            Some(probs) if self.action_prob_smoothing > 1 => {
                let exponent = 1.0 / self.action_prob_smoothing as f64;
                probs.into_iter().map(|p| p.powf(exponent)).collect()
            }
            Some(probs) => probs,
            None => vec![1.0; actions.len()],
        };

        let populated = node.add_children(
            children.iter().map(|c| c.key().clone()).collect(),
            actions.clone(),
            legality.clone(),
            self.mode,
            max_players,
        );
        if populated {
            trace!(node = ?node.key(), children = children.len(), "Expanded node");
            if children.len() > 1 {
                if let Some(trigger) = trigger {
                    trigger.add_node(Arc::clone(node), game.clone());
                }
            }
        }

        let index = match companion_actions {
            Some(legal) => {
                let pick = legal
                    .actions()
                    .get(descent.rng.gen_range(0..legal.len().max(1)))
                    .ok_or(SearchError::NoLegalActions)?;
                actions
                    .iter()
                    .position(|a| a == pick)
                    .ok_or(SearchError::CompanionActionMismatch)?
            }
            None => descent.rng.gen_range(0..actions.len()),
        };

        descent.advance(node.key(), &actions[index]);

        Ok(Visit {
            node: Arc::clone(&children[index]),
            action_prob: legality[index],
            edge: Some(index),
            virtual_loss: VirtualLoss::None,
        })
    }
}
