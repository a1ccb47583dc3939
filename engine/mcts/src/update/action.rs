use super::{path_weights, scaled};
use crate::key::NodeKey;
use crate::path::Visit;
use engine_config::UpdateParams;
use std::collections::HashSet;

/// Updates each standard node's slot for the action taken out of it.
///
/// Standard nodes count the visit on themselves and commit the reward to the
/// outgoing edge; chance nodes, which have no slots, take the reward directly.
/// The last node on the path only counts the visit if it is a standard node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActionUpdater {
    params: UpdateParams,
}

impl ActionUpdater {
    pub fn new(params: UpdateParams) -> Self {
        Self { params }
    }

    #[inline]
    pub fn params(&self) -> UpdateParams {
        self.params
    }

    pub(crate) fn update<A>(&self, visits: &[Visit<A>], reward: &[f64], n_rollouts: u32) {
        let weights = path_weights(visits, self.params.expected_return);

        // First-visit deduplicates (node, next node) pairs
        let mut seen: HashSet<(&NodeKey, Option<&NodeKey>)> = HashSet::with_capacity(visits.len());

        for (i, (visit, &weight)) in visits.iter().zip(&weights).enumerate() {
            let next = visits.get(i + 1);
            let pair = (visit.node.key(), next.map(|n| n.node.key()));
            if !self.params.every_visit && !seen.insert(pair) {
                continue;
            }

            let reward = scaled(reward, weight);
            match (visit.node.edges(), next.and_then(|n| n.edge)) {
                (Some(edges), Some(index)) => {
                    edges.update_action(index, &reward, n_rollouts);
                    visit.node.add_visits(n_rollouts);
                }
                _ if visit.node.is_chance() => visit.node.update(&reward, n_rollouts),
                // Unexpanded or final standard node
                _ => visit.node.add_visits(n_rollouts),
            }
        }
    }
}
