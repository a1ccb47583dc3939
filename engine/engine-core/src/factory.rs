//! Domain factories and determinization samplers.

use crate::belief::Belief;
use crate::domain::Domain;
use rand_chacha::ChaCha20Rng;
use std::sync::Arc;

/// Player count assumed when a factory does not say otherwise.
pub const DEFAULT_MAX_PLAYERS: usize = 4;

/// Builds domain states and carries the searching player's belief.
///
/// Every search iteration works on its own clone of the factory, so belief
/// updates made while descending one path never leak into another.
pub trait DomainFactory: Clone + Send + Sync + 'static {
    type Domain: Domain;
    type Belief: Belief;

    /// Initial state of a new game.
    fn new_domain(&self) -> Self::Domain;

    /// Rebuild a state from its [`Domain::state_key`], under this factory's
    /// current belief.
    fn domain_from_state(&self, state: &[i32]) -> Self::Domain;

    /// Belief currently tracked, `None` for fully observable domains.
    fn belief(&self) -> Option<&Self::Belief> {
        None
    }

    /// Absorb the belief carried by `domain` after actions were applied to it.
    fn observe(&mut self, _domain: &Self::Domain) {}

    /// Copy of this factory that tracks no belief. Used to roll out sampled,
    /// fully observable companion states.
    fn without_belief(&self) -> Self {
        self.clone()
    }

    /// Size of every reward vector.
    fn max_players(&self) -> usize {
        DEFAULT_MAX_PLAYERS
    }

    /// Sampler for fully observable states consistent with the belief.
    fn determinization_sampler(&self) -> Option<Arc<dyn DeterminizationSampler<Self>>> {
        None
    }
}

/// A fully observable state drawn from a belief, with its likelihood.
#[derive(Debug, Clone)]
pub struct DomainSample<D> {
    pub domain: D,
    pub probability: f64,
}

impl<D> DomainSample<D> {
    pub fn new(domain: D, probability: f64) -> Self {
        Self {
            domain,
            probability,
        }
    }
}

/// Draws a fully observable state consistent with what the searching player
/// knows about `current`.
pub trait DeterminizationSampler<F: DomainFactory>: Send + Sync {
    fn sample_observable_state(
        &self,
        current: &F::Domain,
        factory: &F,
        rng: &mut ChaCha20Rng,
    ) -> Option<DomainSample<F::Domain>>;
}

/// Sampler for domains with nothing hidden. Always declines.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDeterminizationSampler;

impl<F: DomainFactory> DeterminizationSampler<F> for NullDeterminizationSampler {
    fn sample_observable_state(
        &self,
        _current: &F::Domain,
        _factory: &F,
        _rng: &mut ChaCha20Rng,
    ) -> Option<DomainSample<F::Domain>> {
        None
    }
}
