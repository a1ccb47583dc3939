//! Pig dice race for the MCTS engine
//!
//! Two players race to a target score. On their turn a player either holds,
//! banking the turn total, or rolls a die: a 1 wipes the turn total and passes
//! the turn, any other face adds to it. The die roll is an explicit chance
//! node, so this domain exercises the engine's stochastic transitions.
//!
//! # Usage
//!
//! ```rust
//! use engine_core::{Domain, DomainFactory};
//! use games_pig::{PigAction, PigFactory};
//!
//! let factory = PigFactory::new(20);
//! let mut game = factory.new_domain();
//! game.apply_action(&PigAction::Roll, false);
//!
//! // The die decides what happens next
//! assert!(game.is_chance_node());
//! assert_eq!(game.legal_actions(false).len(), 6);
//! ```

use engine_core::{ActionList, Domain, DomainFactory, NoBelief};

/// Target used by [`PigFactory::default`].
pub const DEFAULT_TARGET: u16 = 20;

const FACES: u8 = 6;

/// Pig action: a player decision or a die face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PigAction {
    Roll,
    Hold,
    /// Outcome of a roll, 1 to 6.
    Face(u8),
}

/// Pig game state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pig {
    scores: [u16; 2],
    turn_total: u16,
    /// Player to move: 0 or 1
    player: u8,
    /// A roll was requested and the die has not been cast yet
    rolling: bool,
    target: u16,
}

impl Pig {
    pub fn new(target: u16) -> Self {
        Self {
            scores: [0; 2],
            turn_total: 0,
            player: 0,
            rolling: false,
            target: target.max(1),
        }
    }

    pub fn scores(&self) -> [u16; 2] {
        self.scores
    }

    pub fn turn_total(&self) -> u16 {
        self.turn_total
    }

    pub fn target(&self) -> u16 {
        self.target
    }

    fn pass_turn(&mut self) {
        self.turn_total = 0;
        self.player = 1 - self.player;
    }
}

impl Domain for Pig {
    type Action = PigAction;

    fn current_player(&self) -> usize {
        self.player as usize
    }

    fn is_terminal(&self) -> bool {
        self.scores.iter().any(|&s| s >= self.target)
    }

    fn winner(&self) -> Option<usize> {
        self.scores.iter().position(|&s| s >= self.target)
    }

    fn apply_action(&mut self, action: &PigAction, _sampled: bool) {
        if self.is_terminal() {
            return;
        }
        match (*action, self.rolling) {
            (PigAction::Roll, false) => self.rolling = true,
            (PigAction::Hold, false) => {
                self.scores[self.player as usize] += self.turn_total;
                if !self.is_terminal() {
                    self.pass_turn();
                } else {
                    self.turn_total = 0;
                }
            }
            (PigAction::Face(1), true) => {
                self.rolling = false;
                self.pass_turn();
            }
            (PigAction::Face(face), true) if face <= FACES => {
                self.rolling = false;
                self.turn_total += face as u16;
            }
            // Out of turn, ignored
            _ => {}
        }
    }

    fn legal_actions(&self, _sample: bool) -> ActionList<PigAction> {
        if self.is_terminal() {
            ActionList::empty()
        } else if self.rolling {
            let faces = (1..=FACES).map(PigAction::Face).collect();
            ActionList::with_probabilities(faces, vec![1.0 / FACES as f64; FACES as usize])
        } else if self.turn_total == 0 {
            // Holding on nothing only passes the turn
            ActionList::new(vec![PigAction::Roll])
        } else {
            ActionList::new(vec![PigAction::Roll, PigAction::Hold])
        }
    }

    fn state_key(&self) -> Vec<i32> {
        vec![
            self.scores[0] as i32,
            self.scores[1] as i32,
            self.turn_total as i32,
            self.player as i32,
            self.rolling as i32,
            self.target as i32,
        ]
    }

    fn is_chance_node(&self) -> bool {
        self.rolling && !self.is_terminal()
    }
}

/// Builds Pig positions for a fixed target.
#[derive(Debug, Clone, Copy)]
pub struct PigFactory {
    target: u16,
}

impl PigFactory {
    pub fn new(target: u16) -> Self {
        Self { target }
    }
}

impl Default for PigFactory {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET)
    }
}

impl DomainFactory for PigFactory {
    type Domain = Pig;
    type Belief = NoBelief;

    fn new_domain(&self) -> Pig {
        Pig::new(self.target)
    }

    fn domain_from_state(&self, state: &[i32]) -> Pig {
        let field = |i: usize| state.get(i).copied().unwrap_or(0).max(0);
        Pig {
            scores: [field(0) as u16, field(1) as u16],
            turn_total: field(2) as u16,
            player: field(3).min(1) as u8,
            rolling: field(4) != 0,
            target: state.get(5).map_or(self.target, |&t| t.max(1) as u16),
        }
    }

    fn max_players(&self) -> usize {
        2
    }
}
