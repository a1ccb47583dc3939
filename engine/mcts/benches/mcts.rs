//! MCTS benchmarks for performance profiling.
//!
//! Run with: `cargo bench -p mcts`
//!
//! These benchmarks measure:
//! - Full searches with varying iteration counts
//! - Thread scaling on a shared tree
//! - Search from different game states (opening, midgame, near-terminal)
//! - Statistics modes and selection policies
//! - A stochastic domain with chance nodes

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use engine_config::{SelectionConfig, SelectionParams, UpdateConfig, UpdateParams};
use engine_core::DomainFactory;
use games_pig::PigFactory;
use games_tictactoe::{State, TicTacToeFactory};
use mcts::{ActionCriterion, Mcts, MctsConfig};

/// Run one full decision and return the chosen action index.
fn search<F: DomainFactory>(config: MctsConfig, factory: F, root: &F::Domain) -> usize {
    let mut mcts = Mcts::new(config, factory).unwrap();
    mcts.new_tree(root).unwrap();
    mcts.run().unwrap();
    mcts.best_action_index(ActionCriterion::MostVisited).unwrap()
}

// =============================================================================
// Full Search Benchmarks
// =============================================================================

fn bench_search_iterations(c: &mut Criterion) {
    let mut group = c.benchmark_group("mcts_search_iterations");

    for iterations in [100, 400, 1600, 6400] {
        group.throughput(Throughput::Elements(iterations as u64));
        group.bench_with_input(
            BenchmarkId::new("tictactoe", iterations),
            &iterations,
            |b, &iterations| {
                let config = MctsConfig::for_testing().with_iterations(iterations);
                b.iter(|| black_box(search(config.clone(), TicTacToeFactory, &State::new())));
            },
        );
    }

    group.finish();
}

fn bench_thread_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("mcts_thread_scaling");
    let iterations = 4_000;
    group.throughput(Throughput::Elements(iterations as u64));

    for threads in [1, 2, 4, 8] {
        group.bench_with_input(BenchmarkId::new("threads", threads), &threads, |b, &threads| {
            let config = MctsConfig::for_testing()
                .with_iterations(iterations)
                .with_threads(threads);
            b.iter(|| black_box(search(config.clone(), TicTacToeFactory, &State::new())));
        });
    }

    group.finish();
}

fn bench_game_phases(c: &mut Criterion) {
    let mut group = c.benchmark_group("mcts_game_phases");
    let config = MctsConfig::for_testing().with_iterations(800);

    let positions = [
        ("opening", State::new()),
        ("midgame", State::from_board("X...O..X.")),
        ("endgame", State::from_board("XOX.OXO..")),
    ];
    for (phase, root) in positions {
        group.bench_function(phase, |b| {
            b.iter(|| black_box(search(config.clone(), TicTacToeFactory, &root)));
        });
    }

    group.finish();
}

// =============================================================================
// Configuration Benchmarks
// =============================================================================

fn bench_policies(c: &mut Criterion) {
    let mut group = c.benchmark_group("mcts_policies");
    let params = SelectionParams::default();
    let base = MctsConfig::for_testing().with_iterations(1_000);

    let configs = [
        ("uct_state", base.clone()),
        (
            "uct_action",
            base.clone()
                .with_afterstates(false)
                .with_selection(SelectionConfig::UctAction(params.clone()))
                .with_update(UpdateConfig::Action(UpdateParams::default())),
        ),
        (
            "puct",
            base.clone()
                .with_selection(SelectionConfig::Puct(params.clone())),
        ),
        (
            "expected_return",
            base.clone().with_update(UpdateConfig::State(UpdateParams {
                expected_return: true,
                ..UpdateParams::default()
            })),
        ),
        ("rollouts_x4", base.clone().with_rollouts(4, true)),
    ];

    for (name, config) in configs {
        group.bench_function(name, |b| {
            b.iter(|| black_box(search(config.clone(), TicTacToeFactory, &State::new())));
        });
    }

    group.finish();
}

fn bench_chance_nodes(c: &mut Criterion) {
    let mut group = c.benchmark_group("mcts_chance_nodes");
    let factory = PigFactory::new(20);
    let root = factory.domain_from_state(&[8, 12, 5, 0, 0, 20]);

    group.bench_function("pig", |b| {
        let config = MctsConfig::for_testing().with_iterations(1_000);
        b.iter(|| black_box(search(config.clone(), factory, &root)));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_search_iterations,
    bench_thread_scaling,
    bench_game_phases,
    bench_policies,
    bench_chance_nodes,
);
criterion_main!(benches);
