//! Many workers, one tree.

mod common;

use engine_config::{SelectionConfig, SelectionParams, UpdateConfig, UpdateParams};
use engine_core::{Domain, DomainFactory};
use games_tictactoe::{Action, State, TicTacToeFactory};
use mcts::{ActionCriterion, Mcts, MctsConfig, NodeKey, Seeder};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn threaded(n_threads: usize, n_iterations: u32) -> MctsConfig {
    MctsConfig::for_testing()
        .with_threads(n_threads)
        .with_iterations(n_iterations)
}

#[test]
fn test_iteration_count_is_exact() {
    for n_threads in [2, 4, 8] {
        let mut mcts = Mcts::new(threaded(n_threads, 1_000), TicTacToeFactory).unwrap();
        mcts.new_tree(&State::new()).unwrap();

        let summary = mcts.run().unwrap();
        assert_eq!(summary.iterations, 1_000);
        assert_eq!(mcts.stats().unwrap().root_visits, 1_000);

        let child_visits: u32 = mcts.ranked_actions().unwrap().iter().map(|r| r.visits).sum();
        assert_eq!(child_visits, 1_000);
    }
}

#[test]
fn test_no_virtual_loss_left_behind() {
    let mut mcts = Mcts::new(threaded(8, 5_000), TicTacToeFactory).unwrap();
    mcts.new_tree(&State::new()).unwrap();
    mcts.run().unwrap();

    assert!(!common::leaked_virtual_loss(mcts.tree().unwrap()));
}

#[test]
fn test_no_virtual_loss_left_behind_action_indexed() {
    let config = threaded(8, 5_000)
        .with_afterstates(false)
        .with_selection(SelectionConfig::UctAction(SelectionParams::default()))
        .with_update(UpdateConfig::Action(UpdateParams::default()));
    let mut mcts = Mcts::new(config, TicTacToeFactory).unwrap();
    mcts.new_tree(&State::new()).unwrap();
    mcts.run().unwrap();

    assert!(!common::leaked_virtual_loss(mcts.tree().unwrap()));
}

#[test]
fn test_transpositions_share_one_node() {
    let mut mcts = Mcts::new(threaded(8, 20_000), TicTacToeFactory).unwrap();
    mcts.new_tree(&State::new()).unwrap();
    mcts.run().unwrap();
    let tree = mcts.tree().unwrap();

    // Every inserted node hangs off an expanded parent, and there are no
    // more nodes than legal positions
    assert_eq!(common::reachable(tree).len(), tree.len());
    assert!(tree.len() <= 5_478);

    // X0 O4 X8 and X8 O4 X0 lead to the same node
    let via = |moves: [u8; 3]| {
        let mut state = State::new();
        for m in moves {
            state.apply_action(&Action::Place(m), false);
        }
        tree.get(&NodeKey::of(&state))
    };
    let a = via([0, 4, 8]).unwrap();
    let b = via([8, 4, 0]).unwrap();
    assert!(Arc::ptr_eq(&a, &b));

    // Both parents list the shared child
    let parent = |first: u8| {
        let state = State::new().make_move(first).make_move(4);
        tree.get(&NodeKey::of(&state)).unwrap()
    };
    let parent_a = parent(0);
    let parent_b = parent(8);
    let edges_a = parent_a.edges().unwrap();
    let edges_b = parent_b.edges().unwrap();
    assert!(edges_a.child_index(a.key()).is_some());
    assert!(edges_b.child_index(a.key()).is_some());
}

#[test]
fn test_repeated_searches_reuse_pool() {
    let mut mcts = Mcts::new(threaded(4, 500), TicTacToeFactory).unwrap();
    let mut state = State::new();

    // Self-play a full game, one search per move
    while !state.is_terminal() {
        mcts.new_tree(&state).unwrap();
        let summary = mcts.run().unwrap();
        assert_eq!(summary.iterations, 500);
        assert!(!common::leaked_virtual_loss(mcts.tree().unwrap()));

        let action = mcts.best_action(ActionCriterion::MostVisited).unwrap();
        assert!(state.legal_actions(false).contains(&action));
        state.apply_action(&action, false);
    }
    assert!(state.reward(2).is_some());
}

/// Counts seeding calls and prefers the centre.
struct CentreSeeder {
    calls: AtomicUsize,
}

impl Seeder<TicTacToeFactory> for CentreSeeder {
    fn seed(&self, _domain: &State, actions: &[Action]) -> Option<Vec<f64>> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let raw: Vec<f64> = actions
            .iter()
            .map(|a| if a.position() == 4 { 5.0 } else { 1.0 })
            .collect();
        let total: f64 = raw.iter().sum();
        Some(raw.into_iter().map(|p| p / total).collect())
    }
}

#[test]
fn test_seeding_runs_beside_search() {
    let seeder = Arc::new(CentreSeeder {
        calls: AtomicUsize::new(0),
    });
    let config = threaded(4, 2_000)
        .with_selection(SelectionConfig::Puct(SelectionParams::default()))
        .with_seeding(true);
    let mut mcts = Mcts::new(config, TicTacToeFactory)
        .unwrap()
        .with_seeder(seeder.clone());
    assert!(mcts.config().seeding);

    mcts.new_tree(&State::new()).unwrap();
    mcts.run().unwrap();

    assert!(seeder.calls.load(Ordering::Relaxed) > 0);
    let root = mcts.tree().unwrap().root();
    assert!(root.is_evaluated());
    let priors = root.edges().unwrap().priors();
    assert!((priors[4] - 5.0 / 13.0).abs() < 1e-9);
    assert!(!common::leaked_virtual_loss(mcts.tree().unwrap()));
}

#[test]
fn test_factory_roundtrip_for_every_reached_node() {
    let mut mcts = Mcts::new(threaded(4, 2_000), TicTacToeFactory).unwrap();
    mcts.new_tree(&State::new()).unwrap();
    mcts.run().unwrap();

    let factory = TicTacToeFactory;
    for node in common::reachable(mcts.tree().unwrap()) {
        let state = factory.domain_from_state(node.key().state());
        assert_eq!(NodeKey::of(&state), *node.key());
    }
}
