//! Simulation (rollout) policy.

use engine_core::Domain;
use rand_chacha::ChaCha20Rng;
use tracing::warn;

/// Plays a state forward with the domain's own random step until it ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationPolicy {
    max_steps: usize,
}

impl SimulationPolicy {
    pub fn new(max_steps: usize) -> Self {
        Self { max_steps }
    }

    #[inline]
    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// Roll `game` out in place. Returns the number of steps played.
    ///
    /// Stops early if the step cap is hit or the domain has no action to
    /// offer, logging a warning in both cases since the outcome may not be
    /// final.
    pub fn simulate<D: Domain>(&self, game: &mut D, rng: &mut ChaCha20Rng) -> usize {
        let mut steps = 0;
        while !game.is_terminal() {
            if steps >= self.max_steps {
                warn!(steps, "Rollout reached the step cap without terminating");
                break;
            }
            if game.run_one_random_step(rng).is_none() {
                warn!(steps, "Rollout stuck: non-terminal state offered no action");
                break;
            }
            steps += 1;
        }
        steps
    }

    /// Roll a copy of `game` out and return its reward vector.
    ///
    /// A rollout that ends without a reward (unfinished, or everyone lost)
    /// contributes zeros and is logged.
    pub fn rollout<D: Domain>(
        &self,
        game: &D,
        max_players: usize,
        rng: &mut ChaCha20Rng,
    ) -> Vec<f64> {
        let mut game = game.clone();
        self.simulate(&mut game, rng);
        match game.reward(max_players) {
            Some(reward) => reward,
            None => {
                warn!(
                    terminal = game.is_terminal(),
                    "Rollout ended without a reward, committing zeros"
                );
                vec![0.0; max_players]
            }
        }
    }
}
