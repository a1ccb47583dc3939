//! Domain trait searched by the engine.
//!
//! A domain is a sequential decision process, possibly stochastic and
//! possibly partially observable. The search never looks inside a domain: it
//! clones it, asks who is to move, enumerates and applies actions, plays random
//! steps and fingerprints the state for the transposition table.

use rand::Rng;
use rand_chacha::ChaCha20Rng;
use std::fmt::Debug;
use std::hash::Hash;

/// Actions available from a state, with optional per-action probabilities.
///
/// Probabilities are either a legality weight (how likely the action is
/// actually available to the acting player) or, at chance points, the
/// likelihood of each outcome. When a domain reports none, every action is
/// treated as weight `1.0`.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionList<A> {
    actions: Vec<A>,
    probabilities: Option<Vec<f64>>,
}

impl<A> ActionList<A> {
    /// Create a list with no probability information.
    pub fn new(actions: Vec<A>) -> Self {
        Self {
            actions,
            probabilities: None,
        }
    }

    /// Create a list with one probability per action.
    pub fn with_probabilities(actions: Vec<A>, probabilities: Vec<f64>) -> Self {
        debug_assert_eq!(actions.len(), probabilities.len());
        Self {
            actions,
            probabilities: Some(probabilities),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    #[inline]
    pub fn actions(&self) -> &[A] {
        &self.actions
    }

    #[inline]
    pub fn probabilities(&self) -> Option<&[f64]> {
        self.probabilities.as_deref()
    }

    /// Probability of the action at `index`, `1.0` when none were reported.
    #[inline]
    pub fn probability(&self, index: usize) -> f64 {
        self.probabilities
            .as_ref()
            .and_then(|p| p.get(index).copied())
            .unwrap_or(1.0)
    }

    /// Probabilities for every action, filling in `1.0` when none were reported.
    pub fn probabilities_or_ones(&self) -> Vec<f64> {
        match &self.probabilities {
            Some(p) => p.clone(),
            None => vec![1.0; self.actions.len()],
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, A> {
        self.actions.iter()
    }

    pub fn into_parts(self) -> (Vec<A>, Option<Vec<f64>>) {
        (self.actions, self.probabilities)
    }
}

impl<A: PartialEq> ActionList<A> {
    /// Index of `action` in this list.
    pub fn position(&self, action: &A) -> Option<usize> {
        self.actions.iter().position(|a| a == action)
    }

    pub fn contains(&self, action: &A) -> bool {
        self.position(action).is_some()
    }
}

impl<A: Clone> ActionList<A> {
    /// Draw an action, weighted by the reported probabilities if any,
    /// uniformly otherwise.
    pub fn choose(&self, rng: &mut ChaCha20Rng) -> Option<A> {
        self.choose_index(rng).map(|i| self.actions[i].clone())
    }

    /// Draw an action index, see [`ActionList::choose`].
    pub fn choose_index(&self, rng: &mut ChaCha20Rng) -> Option<usize> {
        if self.actions.is_empty() {
            return None;
        }

        let weights = match &self.probabilities {
            Some(p) if p.iter().sum::<f64>() > 0.0 => p,
            _ => return Some(rng.gen_range(0..self.actions.len())),
        };

        let total: f64 = weights.iter().sum();
        let r: f64 = rng.gen::<f64>() * total;
        let mut cumsum = 0.0;
        for (i, &w) in weights.iter().enumerate() {
            cumsum += w;
            if r < cumsum {
                return Some(i);
            }
        }

        // Floating point slack: fall back to the last action with weight
        weights.iter().rposition(|&w| w > 0.0)
    }
}

impl<A> Default for ActionList<A> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<A> FromIterator<A> for ActionList<A> {
    fn from_iter<I: IntoIterator<Item = A>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// A searchable decision process.
///
/// Implementations must be cheap to clone: the search clones the state for
/// every expansion and rollout.
///
/// # Example
///
/// ```rust
/// use engine_core::{ActionList, Domain};
///
/// /// Players alternately add 1 or 2; whoever reaches 5 wins.
/// #[derive(Debug, Clone)]
/// struct RaceToFive {
///     total: i32,
///     to_move: usize,
/// }
///
/// impl Domain for RaceToFive {
///     type Action = i32;
///
///     fn current_player(&self) -> usize {
///         self.to_move
///     }
///     fn is_terminal(&self) -> bool {
///         self.total >= 5
///     }
///     fn winner(&self) -> Option<usize> {
///         self.is_terminal().then(|| 1 - self.to_move)
///     }
///     fn apply_action(&mut self, action: &i32, _sampled: bool) {
///         self.total += action;
///         self.to_move = 1 - self.to_move;
///     }
///     fn legal_actions(&self, _sample: bool) -> ActionList<i32> {
///         if self.is_terminal() {
///             ActionList::empty()
///         } else {
///             ActionList::new(vec![1, 2])
///         }
///     }
///     fn state_key(&self) -> Vec<i32> {
///         vec![self.total, self.to_move as i32]
///     }
/// }
///
/// let mut game = RaceToFive { total: 4, to_move: 0 };
/// game.apply_action(&1, false);
/// assert_eq!(game.winner(), Some(0));
/// ```
pub trait Domain: Clone + Debug + Send + Sync + 'static {
    /// Action type. Compared for equality when matching a sampled companion
    /// state's actions against a node's actions.
    type Action: Clone + Debug + Eq + Hash + Send + Sync + 'static;

    /// Index of the player to move, in `0..max_players`.
    fn current_player(&self) -> usize;

    fn is_terminal(&self) -> bool;

    /// Winning player once terminal, `None` while running or for a draw.
    fn winner(&self) -> Option<usize>;

    /// Reward vector of a finished game, one entry per player.
    ///
    /// The default is `1.0` for the winner and `0.0` for everyone else, and
    /// `None` when there is no winner. Domains with draws or graded outcomes
    /// override this.
    fn reward(&self, max_players: usize) -> Option<Vec<f64>> {
        let winner = self.winner()?;
        if winner >= max_players {
            return None;
        }
        let mut reward = vec![0.0; max_players];
        reward[winner] = 1.0;
        Some(reward)
    }

    /// Apply an action. `sampled` is set when the action was drawn at random
    /// (rollouts, chance outcomes) rather than chosen by the tree.
    fn apply_action(&mut self, action: &Self::Action, sampled: bool);

    /// Enumerate actions. With `sample` the domain may return a cheaper or
    /// partial list suited to random play; without it the list must be
    /// exhaustive and in a stable order.
    fn legal_actions(&self, sample: bool) -> ActionList<Self::Action>;

    /// Draw the next action for random play.
    fn sample_next_action(&self, rng: &mut ChaCha20Rng) -> Option<Self::Action> {
        self.legal_actions(true).choose(rng)
    }

    /// Advance by one random step, returning the action applied.
    fn run_one_random_step(&mut self, rng: &mut ChaCha20Rng) -> Option<Self::Action> {
        let action = self.sample_next_action(rng)?;
        self.apply_action(&action, true);
        Some(action)
    }

    /// Fingerprint of the state. Equal fingerprints are treated as the same
    /// node in the transposition table.
    fn state_key(&self) -> Vec<i32>;

    /// Fingerprint of the belief this state was reached under, if tracked.
    fn belief_key(&self) -> Option<Vec<i32>> {
        None
    }

    /// Whether the next transition is decided by chance rather than a player.
    fn is_chance_node(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[derive(Debug, Clone)]
    struct Countdown {
        remaining: i32,
        to_move: usize,
    }

    impl Domain for Countdown {
        type Action = i32;

        fn current_player(&self) -> usize {
            self.to_move
        }

        fn is_terminal(&self) -> bool {
            self.remaining <= 0
        }

        fn winner(&self) -> Option<usize> {
            self.is_terminal().then_some(1 - self.to_move)
        }

        fn apply_action(&mut self, action: &i32, _sampled: bool) {
            self.remaining -= action;
            self.to_move = 1 - self.to_move;
        }

        fn legal_actions(&self, _sample: bool) -> ActionList<i32> {
            if self.is_terminal() {
                ActionList::empty()
            } else {
                ActionList::new(vec![1, 2, 3])
            }
        }

        fn state_key(&self) -> Vec<i32> {
            vec![self.remaining, self.to_move as i32]
        }
    }

    #[test]
    fn test_default_reward_is_one_hot() {
        let game = Countdown {
            remaining: 0,
            to_move: 1,
        };
        assert_eq!(game.reward(4), Some(vec![1.0, 0.0, 0.0, 0.0]));
    }

    #[test]
    fn test_reward_none_while_running() {
        let game = Countdown {
            remaining: 3,
            to_move: 0,
        };
        assert_eq!(game.reward(2), None);
    }

    #[test]
    fn test_random_play_reaches_terminal() {
        let mut rng = ChaCha20Rng::seed_from_u64(42);
        let mut game = Countdown {
            remaining: 10,
            to_move: 0,
        };

        let mut steps = 0;
        while game.run_one_random_step(&mut rng).is_some() {
            steps += 1;
            assert!(steps <= 10);
        }

        assert!(game.is_terminal());
        assert!(game.winner().is_some());
    }

    #[test]
    fn test_choose_respects_zero_weights() {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let list = ActionList::with_probabilities(vec!['a', 'b', 'c'], vec![0.0, 1.0, 0.0]);

        for _ in 0..200 {
            assert_eq!(list.choose(&mut rng), Some('b'));
        }
    }

    #[test]
    fn test_choose_weighted_distribution() {
        let mut rng = ChaCha20Rng::seed_from_u64(42);
        let list = ActionList::with_probabilities(vec![0, 1, 2], vec![0.6, 0.3, 0.1]);

        let mut counts = [0u32; 3];
        for _ in 0..2000 {
            counts[list.choose_index(&mut rng).unwrap()] += 1;
        }

        assert!(counts[0] > counts[1]);
        assert!(counts[1] > counts[2]);
    }

    #[test]
    fn test_choose_empty() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let list: ActionList<u8> = ActionList::empty();
        assert_eq!(list.choose(&mut rng), None);
    }

    #[test]
    fn test_probability_defaults_to_one() {
        let list: ActionList<u8> = [3u8, 4, 5].into_iter().collect();
        assert_eq!(list.len(), 3);
        assert!((list.probability(1) - 1.0).abs() < 1e-12);
        assert_eq!(list.probabilities_or_ones(), vec![1.0; 3]);
        assert_eq!(list.position(&5), Some(2));
        assert!(!list.contains(&9));
    }
}
