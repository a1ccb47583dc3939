use super::{path_weights, scaled};
use crate::key::NodeKey;
use crate::path::Visit;
use engine_config::UpdateParams;
use std::collections::HashSet;

/// Updates the visited nodes themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StateUpdater {
    params: UpdateParams,
}

impl StateUpdater {
    pub fn new(params: UpdateParams) -> Self {
        Self { params }
    }

    #[inline]
    pub fn params(&self) -> UpdateParams {
        self.params
    }

    pub(crate) fn update<A>(&self, visits: &[Visit<A>], reward: &[f64], n_rollouts: u32) {
        let weights = path_weights(visits, self.params.expected_return);

        // First-visit keeps the earliest occurrence of a node on the path
        let mut seen: HashSet<&NodeKey> = HashSet::with_capacity(visits.len());
        for (visit, &weight) in visits.iter().zip(&weights) {
            if !self.params.every_visit && !seen.insert(visit.node.key()) {
                continue;
            }
            visit.node.update(&scaled(reward, weight), n_rollouts);
        }
    }
}
