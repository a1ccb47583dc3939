//! Prior seeding hook.
//!
//! A [`Seeder`] proposes a prior distribution over a freshly expanded node's
//! actions (from a heuristic, a model, a human action-type distribution...).
//! Seeding runs as high-priority pool jobs beside the search; a node's priors
//! are overwritten at most once and selection tolerates a node that was never
//! seeded.

use crate::node::TreeNode;
use crate::pool::{PoolHandle, Priority};
use engine_core::{ActionOf, DomainFactory};
use std::fmt;
use std::sync::Arc;
use tracing::{trace, warn};

/// Proposes priors for a node's actions.
pub trait Seeder<F: DomainFactory>: Send + Sync {
    /// Priors for `actions` in `domain`, in the same order. `None` leaves
    /// the node's uniform priors in place.
    fn seed(&self, domain: &F::Domain, actions: &[ActionOf<F>]) -> Option<Vec<f64>>;
}

/// Hands expanded nodes to the seeder on the worker pool.
pub struct SeedTrigger<F: DomainFactory> {
    seeder: Arc<dyn Seeder<F>>,
    pool: PoolHandle,
}

impl<F: DomainFactory> SeedTrigger<F> {
    pub fn new(seeder: Arc<dyn Seeder<F>>, pool: PoolHandle) -> Self {
        Self { seeder, pool }
    }

    /// Queue `node`, expanded from `domain`, for seeding.
    pub fn add_node(&self, node: Arc<TreeNode<ActionOf<F>>>, domain: F::Domain) {
        if node.is_evaluated() {
            return;
        }
        let seeder = Arc::clone(&self.seeder);
        self.pool.execute(Priority::High, move |_rng| {
            let Some(edges) = node.edges() else {
                return;
            };
            let Some(priors) = seeder.seed(&domain, edges.actions()) else {
                return;
            };
            let n = priors.len();
            if n != edges.len() {
                warn!(
                    expected = edges.len(),
                    got = n,
                    "Seeder returned priors of the wrong length"
                );
                return;
            }
            if node.set_priors(priors) {
                trace!(node = ?node.key(), "Seeded priors");
            }
        });
    }
}

impl<F: DomainFactory> Clone for SeedTrigger<F> {
    fn clone(&self) -> Self {
        Self {
            seeder: Arc::clone(&self.seeder),
            pool: self.pool.clone(),
        }
    }
}

impl<F: DomainFactory> fmt::Debug for SeedTrigger<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeedTrigger").field("pool", &self.pool).finish()
    }
}
