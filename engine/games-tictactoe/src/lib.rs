//! TicTacToe domain for the MCTS engine
//!
//! This crate is the fully observable reference domain: a small, exhaustively
//! solvable game used to check that the search finds forced wins and blocks,
//! and to benchmark the engine.
//!
//! # Usage
//!
//! ```rust
//! use engine_core::{Domain, DomainFactory};
//! use games_tictactoe::{Action, TicTacToeFactory};
//!
//! let factory = TicTacToeFactory;
//! let mut game = factory.new_domain();
//! game.apply_action(&Action::Place(4), false);
//!
//! assert_eq!(game.current_player(), 1);
//! assert_eq!(game.legal_actions(false).len(), 8);
//! ```

use engine_core::{ActionList, Domain, DomainFactory, NoBelief};

/// Winning positions (rows, columns, diagonals)
const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8], // rows
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8], // columns
    [0, 4, 8],
    [2, 4, 6], // diagonals
];

/// TicTacToe game state
///
/// Represents the complete state of a TicTacToe game including the board,
/// current player, and winner information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct State {
    /// Board representation: 0=empty, 1=X, 2=O
    board: [u8; 9],
    /// Current player: 1=X, 2=O
    current_player: u8,
    /// Winner: 0=none/ongoing, 1=X, 2=O, 3=draw
    winner: u8,
}

impl State {
    /// Create a new initial game state
    pub fn new() -> Self {
        Self {
            board: [0; 9],
            current_player: 1, // X goes first
            winner: 0,
        }
    }

    /// Build a position from a board string, row by row: `X`, `O`, anything
    /// else is empty. The player to move is inferred from the piece counts.
    ///
    /// ```rust
    /// use games_tictactoe::State;
    ///
    /// let state = State::from_board("XX.OO....");
    /// assert_eq!(state.legal_moves().len(), 5);
    /// ```
    pub fn from_board(board: &str) -> Self {
        let mut cells = [0u8; 9];
        for (cell, c) in cells.iter_mut().zip(board.chars()) {
            *cell = match c {
                'X' | 'x' => 1,
                'O' | 'o' => 2,
                _ => 0,
            };
        }
        Self::from_cells(cells)
    }

    fn from_cells(board: [u8; 9]) -> Self {
        let xs = board.iter().filter(|&&c| c == 1).count();
        let os = board.iter().filter(|&&c| c == 2).count();
        Self {
            board,
            current_player: if xs > os { 2 } else { 1 },
            winner: Self::check_winner(&board),
        }
    }

    pub fn board(&self) -> &[u8; 9] {
        &self.board
    }

    /// Check if the game is over
    pub fn is_done(&self) -> bool {
        self.winner != 0
    }

    /// Get legal moves (empty positions)
    pub fn legal_moves(&self) -> Vec<u8> {
        if self.is_done() {
            return Vec::new();
        }

        (0..9u8)
            .filter(|&pos| self.board[pos as usize] == 0)
            .collect()
    }

    /// Make a move and return the new state
    pub fn make_move(&self, position: u8) -> State {
        if self.is_done() || position >= 9 || self.board[position as usize] != 0 {
            return *self; // Invalid move, return unchanged state
        }

        let mut new_state = *self;
        new_state.board[position as usize] = self.current_player;

        // Check for winner
        new_state.winner = Self::check_winner(&new_state.board);

        // Switch player if game not over
        if new_state.winner == 0 {
            new_state.current_player = if self.current_player == 1 { 2 } else { 1 };
        }

        new_state
    }

    /// Check for winner on the board
    fn check_winner(board: &[u8; 9]) -> u8 {
        for line in &LINES {
            let [a, b, c] = *line;
            if board[a] != 0 && board[a] == board[b] && board[b] == board[c] {
                return board[a]; // Return the winning player
            }
        }

        // Check for draw (board full but no winner)
        if board.iter().all(|&cell| cell != 0) {
            return 3; // Draw
        }

        0 // Game ongoing
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

/// TicTacToe action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Place a piece at the given position (0-8)
    Place(u8),
}

impl Action {
    /// Get the position for this action
    pub fn position(&self) -> u8 {
        match self {
            Action::Place(pos) => *pos,
        }
    }
}

impl Domain for State {
    type Action = Action;

    /// 0 for X, 1 for O.
    fn current_player(&self) -> usize {
        (self.current_player - 1) as usize
    }

    fn is_terminal(&self) -> bool {
        self.is_done()
    }

    fn winner(&self) -> Option<usize> {
        match self.winner {
            1 => Some(0),
            2 => Some(1),
            _ => None,
        }
    }

    /// One point to the winner, half a point each for a draw.
    fn reward(&self, max_players: usize) -> Option<Vec<f64>> {
        let mut reward = vec![0.0; max_players];
        match self.winner {
            0 => return None,
            3 => {
                for r in reward.iter_mut().take(2) {
                    *r = 0.5;
                }
            }
            w => {
                let slot = reward.get_mut((w - 1) as usize)?;
                *slot = 1.0;
            }
        }
        Some(reward)
    }

    fn apply_action(&mut self, action: &Action, _sampled: bool) {
        *self = self.make_move(action.position());
    }

    fn legal_actions(&self, _sample: bool) -> ActionList<Action> {
        self.legal_moves().into_iter().map(Action::Place).collect()
    }

    fn state_key(&self) -> Vec<i32> {
        self.board.iter().map(|&c| c as i32).collect()
    }
}

/// Builds TicTacToe positions. Nothing is hidden, so no belief is tracked.
#[derive(Debug, Clone, Copy, Default)]
pub struct TicTacToeFactory;

impl DomainFactory for TicTacToeFactory {
    type Domain = State;
    type Belief = NoBelief;

    fn new_domain(&self) -> State {
        State::new()
    }

    fn domain_from_state(&self, state: &[i32]) -> State {
        let mut board = [0u8; 9];
        for (cell, &v) in board.iter_mut().zip(state) {
            *cell = v.clamp(0, 2) as u8;
        }
        State::from_cells(board)
    }

    fn max_players(&self) -> usize {
        2
    }
}
