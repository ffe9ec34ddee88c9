use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use rand::rngs::SmallRng;
use rand::SeedableRng;

use lineup_optimizer::simulation::NoPlayLog;
use lineup_optimizer::{
    GameSimulator, Hitter, InMemoryResultSink, PermutationSearchCoordinator, Roster, SearchConfig, SeasonEvaluator,
};

fn bench_season_evaluation(c: &mut Criterion) {
    let roster = Roster::sample_2021().unwrap();
    let order: Vec<&Hitter> = roster.hitters().iter().collect();
    let evaluator = SeasonEvaluator::new(GameSimulator::default(), 144);

    let mut group = c.benchmark_group("season");
    group.throughput(Throughput::Elements(144));
    group.bench_function("evaluate_144_games", |b| {
        let mut rng = SmallRng::seed_from_u64(2021);
        b.iter(|| {
            evaluator
                .evaluate(&order, 0, &mut rng, &mut NoPlayLog)
                .unwrap()
        });
    });
    group.bench_function("evaluate_144_games_with_log", |b| {
        let mut rng = SmallRng::seed_from_u64(2021);
        b.iter(|| {
            let mut log = Vec::with_capacity(144 * 40);
            evaluator.evaluate(&order, 0, &mut rng, &mut log).unwrap()
        });
    });
    group.finish();
}

fn bench_small_search(c: &mut Criterion) {
    // First four hitters of the sample roster: 24 orderings.
    let roster = Roster::new(Roster::sample_2021().unwrap().hitters()[..4].to_vec()).unwrap();
    let config = SearchConfig {
        games_per_season: 50,
        worker_pool_size: 4,
        seed: Some(7),
        ..SearchConfig::default()
    };

    let mut group = c.benchmark_group("search");
    group.throughput(Throughput::Elements(24));
    group.sample_size(20);
    group.bench_function("four_hitters_50_games", |b| {
        b.iter(|| {
            let sink = Arc::new(InMemoryResultSink::new());
            PermutationSearchCoordinator::new(roster.clone(), config.clone(), sink)
                .unwrap()
                .run()
                .unwrap()
        });
    });
    group.finish();
}

criterion_group!(benches, bench_season_evaluation, bench_small_search);
criterion_main!(benches);
