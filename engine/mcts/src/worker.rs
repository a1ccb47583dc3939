//! One search iteration: select, expand, simulate, backpropagate.

use crate::expansion::ExpansionPolicy;
use crate::listener::{CompletionGuard, SearchListener};
use crate::path::{Descent, SearchPath};
use crate::pool::{panic_message, PoolHandle, Priority};
use crate::search::SearchError;
use crate::seeder::SeedTrigger;
use crate::selection::SelectionPolicy;
use crate::simulation::SimulationPolicy;
use crate::tree::Tree;
use crate::update::UpdatePolicy;
use engine_core::{ActionOf, DomainFactory};
use rand_chacha::ChaCha20Rng;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{error, trace, warn};

/// Iteration settings that do not belong to a single policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct IterationSettings {
    pub max_tree_depth: usize,
    pub pomcp: bool,
    pub n_rollouts: u32,
    pub average_rollouts: bool,
    pub weighted_return: bool,
    pub root_state_prob_smoothing: u32,
}

/// Everything iterations of one search share.
pub(crate) struct SearchContext<F: DomainFactory> {
    pub tree: Arc<Tree<ActionOf<F>>>,
    pub factory: F,
    pub selection: SelectionPolicy,
    pub update: UpdatePolicy,
    pub expansion: ExpansionPolicy,
    pub simulation: SimulationPolicy,
    pub trigger: Option<SeedTrigger<F>>,
    pub settings: IterationSettings,
}

/// What one iteration did, for tracing.
#[derive(Debug, Clone, Copy)]
pub(crate) struct IterationReport {
    pub path_len: usize,
    pub expanded: bool,
}

/// Feeds one search's iterations to the pool.
///
/// Only a few iterations sit in the queue at a time; each finished iteration
/// queues the next while budget remains and the listener has not stopped.
pub(crate) struct SearchWorker<F: DomainFactory> {
    context: Arc<SearchContext<F>>,
    listener: Arc<dyn SearchListener>,
    pool: PoolHandle,
    /// Iterations not yet queued.
    remaining: AtomicU32,
}

impl<F: DomainFactory> SearchWorker<F> {
    pub fn new(
        context: Arc<SearchContext<F>>,
        listener: Arc<dyn SearchListener>,
        pool: PoolHandle,
        budget: u32,
    ) -> Self {
        Self {
            context,
            listener,
            pool,
            remaining: AtomicU32::new(budget),
        }
    }

    /// Queue one more iteration. Returns `false` once the budget is spent,
    /// the search has stopped or the pool is gone.
    pub fn queue_next(self: &Arc<Self>) -> bool {
        if self.listener.has_finished() {
            return false;
        }
        let taken = self
            .remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
        if taken.is_err() {
            return false;
        }
        let worker = Arc::clone(self);
        self.pool.execute(Priority::Low, move |rng| {
            worker.run(rng);
            worker.queue_next();
        })
    }

    /// Queue nothing more. Iterations already queued or running still finish.
    pub fn cancel(&self) {
        self.remaining.store(0, Ordering::Release);
    }

    /// Run one iteration. Errors and panics are logged and leave statistics
    /// untouched; the listener always records the iteration. Never unwinds.
    pub fn run(&self, rng: &mut ChaCha20Rng) {
        let _guard = CompletionGuard::new(&*self.listener);
        match panic::catch_unwind(AssertUnwindSafe(|| self.iterate(rng))) {
            Ok(Ok(report)) => trace!(
                path_len = report.path_len,
                expanded = report.expanded,
                "Iteration complete"
            ),
            Ok(Err(e)) => warn!(error = %e, "Search iteration failed"),
            Err(payload) => error!(panic = %panic_message(&*payload), "Search iteration panicked"),
        }
    }

    fn iterate(&self, rng: &mut ChaCha20Rng) -> Result<IterationReport, SearchError> {
        let ctx = &*self.context;
        let settings = &ctx.settings;
        let tree = &*ctx.tree;
        let root = Arc::clone(tree.root());

        let mut descent = Descent::new(tree, ctx.factory.clone(), rng);

        // POMCP: follow one fully observable state through the iteration
        let mut sample_probability = 1.0;
        if settings.pomcp {
            if let Some(sampler) = descent.factory.determinization_sampler() {
                let current = descent.factory.domain_from_state(root.key().state());
                if let Some(sample) =
                    sampler.sample_observable_state(&current, &descent.factory, descent.rng)
                {
                    sample_probability = sample.probability;
                    descent.companion = Some(sample.domain);
                }
            }
        }

        // Selection
        let mut path = SearchPath::new(Arc::clone(&root));
        let mut node = root;
        let mut all_siblings_visited = true;
        let mut depth = 1;
        while !node.is_leaf() && !node.is_terminal() {
            let selection = ctx.selection.select_child(&node, &mut descent)?;
            all_siblings_visited = selection.all_siblings_visited;
            node = Arc::clone(&selection.visit.node);
            path.push(selection.visit);

            // The companion already decided the outcome
            if descent.companion_terminal() {
                break;
            }
            if !all_siblings_visited {
                break;
            }
            if depth > settings.max_tree_depth {
                break;
            }
            depth += 1;
        }

        // Expansion
        let expanded = !node.is_terminal()
            && node.can_expand()
            && all_siblings_visited
            && !tree.is_over_capacity()
            && node.is_leaf()
            && !descent.companion_terminal();
        if expanded {
            let visit = ctx.expansion.expand(&node, &mut descent, ctx.trigger.as_ref())?;
            node = Arc::clone(&visit.node);
            path.push(visit);
        }

        // Simulation: rollouts start from the companion when there is one
        let max_players = descent.max_players();
        let start = match descent.companion.take() {
            Some(companion) => companion,
            None => descent.factory.domain_from_state(node.key().state()),
        };
        let weight = if settings.weighted_return {
            if settings.root_state_prob_smoothing > 1 {
                sample_probability.powf(1.0 / settings.root_state_prob_smoothing as f64)
            } else {
                sample_probability
            }
        } else {
            1.0
        };

        let mut reward = vec![0.0; max_players];
        for _ in 0..settings.n_rollouts {
            let outcome = ctx.simulation.rollout(&start, max_players, descent.rng);
            for (acc, r) in reward.iter_mut().zip(outcome) {
                *acc += r * weight;
            }
        }

        let mut n_rollouts = settings.n_rollouts;
        if settings.average_rollouts && n_rollouts > 0 {
            for r in &mut reward {
                *r /= n_rollouts as f64;
            }
            n_rollouts = 1;
        }

        // Backpropagation
        let path_len = path.len();
        ctx.update.update(&mut path, &reward, n_rollouts);

        Ok(IterationReport { path_len, expanded })
    }
}
