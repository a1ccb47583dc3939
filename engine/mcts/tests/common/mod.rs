//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use engine_core::{
    ActionList, Belief, DeterminizationSampler, Domain, DomainFactory, DomainSample,
};
use mcts::{NodeKey, Tree, TreeNode};
use rand::Rng;
use rand_chacha::ChaCha20Rng;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

/// Number of distinct hidden cards.
pub const CARDS: u8 = 3;

/// What the searcher believes about the opponent's card.
#[derive(Debug, Clone, PartialEq)]
pub struct CardBelief {
    pub weights: [f64; CARDS as usize],
}

impl CardBelief {
    pub fn new(weights: [f64; CARDS as usize]) -> Self {
        Self { weights }
    }

    pub fn probability(&self, card: u8) -> f64 {
        let total: f64 = self.weights.iter().sum();
        self.weights[card as usize] / total
    }
}

impl Belief for CardBelief {
    fn fingerprint(&self) -> Vec<i32> {
        self.weights.iter().map(|w| (w * 1000.0).round() as i32).collect()
    }
}

/// The searcher (player 0) names the opponent's hidden card and wins on a
/// correct guess. The card is only known in sampled states.
#[derive(Debug, Clone, PartialEq)]
pub struct Guess {
    pub card: Option<u8>,
    pub guess: Option<u8>,
    pub belief: CardBelief,
}

impl Domain for Guess {
    type Action = u8;

    fn current_player(&self) -> usize {
        0
    }

    fn is_terminal(&self) -> bool {
        self.guess.is_some()
    }

    fn winner(&self) -> Option<usize> {
        match (self.card, self.guess) {
            (Some(card), Some(guess)) => Some(if card == guess { 0 } else { 1 }),
            _ => None,
        }
    }

    fn apply_action(&mut self, action: &u8, _sampled: bool) {
        if self.guess.is_none() {
            self.guess = Some(*action);
        }
    }

    fn legal_actions(&self, _sample: bool) -> ActionList<u8> {
        if self.is_terminal() {
            ActionList::empty()
        } else {
            (0..CARDS).collect()
        }
    }

    fn state_key(&self) -> Vec<i32> {
        vec![self.guess.map_or(-1, i32::from)]
    }

    fn belief_key(&self) -> Option<Vec<i32>> {
        Some(self.belief.fingerprint())
    }
}

#[derive(Debug, Clone)]
pub struct GuessFactory {
    pub belief: CardBelief,
}

impl GuessFactory {
    pub fn new(weights: [f64; CARDS as usize]) -> Self {
        Self {
            belief: CardBelief::new(weights),
        }
    }
}

impl DomainFactory for GuessFactory {
    type Domain = Guess;
    type Belief = CardBelief;

    fn new_domain(&self) -> Guess {
        Guess {
            card: None,
            guess: None,
            belief: self.belief.clone(),
        }
    }

    fn domain_from_state(&self, state: &[i32]) -> Guess {
        let guess = state.first().copied().filter(|&g| g >= 0).map(|g| g as u8);
        Guess {
            card: None,
            guess,
            belief: self.belief.clone(),
        }
    }

    fn belief(&self) -> Option<&CardBelief> {
        Some(&self.belief)
    }

    fn observe(&mut self, domain: &Guess) {
        self.belief = domain.belief.clone();
    }

    fn max_players(&self) -> usize {
        2
    }

    fn determinization_sampler(&self) -> Option<Arc<dyn DeterminizationSampler<Self>>> {
        Some(Arc::new(CardSampler))
    }
}

/// Deals the hidden card from the belief.
pub struct CardSampler;

impl DeterminizationSampler<GuessFactory> for CardSampler {
    fn sample_observable_state(
        &self,
        current: &Guess,
        factory: &GuessFactory,
        rng: &mut ChaCha20Rng,
    ) -> Option<DomainSample<Guess>> {
        let belief = &factory.belief;
        let mut r = rng.gen::<f64>();
        let mut card = CARDS - 1;
        for c in 0..CARDS {
            let p = belief.probability(c);
            if r < p {
                card = c;
                break;
            }
            r -= p;
        }
        let mut sample = current.clone();
        sample.card = Some(card);
        Some(DomainSample::new(sample, belief.probability(card)))
    }
}

/// Every node reachable from the root through cached edges.
pub fn reachable<A>(tree: &Tree<A>) -> Vec<Arc<TreeNode<A>>> {
    let mut seen: HashSet<NodeKey> = HashSet::new();
    let mut queue = VecDeque::from([Arc::clone(tree.root())]);
    let mut nodes = Vec::new();
    seen.insert(tree.root().key().clone());

    while let Some(node) = queue.pop_front() {
        if let Some(edges) = node.edges() {
            for key in edges.children() {
                if seen.insert(key.clone()) {
                    if let Some(child) = tree.get(key) {
                        queue.push_back(child);
                    }
                }
            }
        }
        nodes.push(node);
    }
    nodes
}

/// Whether any virtual loss is still held anywhere in the tree.
pub fn leaked_virtual_loss<A>(tree: &Tree<A>) -> bool {
    reachable(tree).iter().any(|node| {
        node.virtual_loss() != 0
            || node.edges().is_some_and(|edges| {
                edges
                    .action_snapshots(node.current_player())
                    .iter()
                    .any(|s| s.virtual_loss != 0)
            })
    })
}
