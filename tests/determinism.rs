//! Reproducibility guarantees.

use std::sync::Arc;

use lineup_optimizer::simulation::BattingOrder;
use lineup_optimizer::{
    BaseState, DoublePlayRule, Event, GameSimulator, Hitter, Horizon, InMemoryResultSink, PermutationSearchCoordinator,
    ResultReader, Roster, ScriptedDraws, SearchConfig,
};

fn singles_hitter(name: &str, pace: f64) -> Hitter {
    // Draws below 0.5 are singles, the rest are outs.
    Hitter::builder(name)
        .plate_appearances(100)
        .at_bats(100)
        .hits(50)
        .pace(pace)
        .build()
}

#[test]
fn test_three_singles_at_full_pace_score_one_run() {
    let hitter = singles_hitter("Rabbit", 1.0);
    let order = BattingOrder::new(&[&hitter]).unwrap();
    let sim = GameSimulator::new(Horizon::HalfInning, DoublePlayRule::default());

    // single, single + roll, single + roll, then three outs
    let mut draws = ScriptedDraws::new(vec![0.1, 0.1, 0.1, 0.1, 0.1, 0.9, 0.9, 0.9]);
    let mut log = Vec::new();
    let score = sim.play(&order, 0, &mut draws, &mut log).unwrap();

    assert_eq!(score, 1);
    assert_eq!(draws.consumed(), 8);
    let scores: Vec<u32> = log.iter().map(|e| e.score).collect();
    assert_eq!(scores, [0, 0, 1, 1, 1, 1]);
}

#[test]
fn test_base_state_replay_is_identical() {
    let a = singles_hitter("A", 0.6);
    let b = singles_hitter("B", 0.2);
    let events = [
        (Event::Single, &a),
        (Event::Walk, &b),
        (Event::Double, &a),
        (Event::Out, &b),
        (Event::Single, &a),
        (Event::HomeRun, &b),
        (Event::Out, &a),
    ];
    let script = vec![0.55, 0.1, 0.7, 0.3, 0.05, 0.9];

    let replay = || {
        let mut state = BaseState::new();
        let mut draws = ScriptedDraws::new(script.clone());
        let mut trace = Vec::new();
        for (event, batter) in events {
            let t = state.apply(event, batter, &mut draws).unwrap();
            trace.push((t, state.score(), state.outs(), state.occupied_count()));
        }
        trace
    };

    assert_eq!(replay(), replay());
}

#[test]
fn test_game_log_replays_byte_for_byte() {
    let roster = Roster::sample_2021().unwrap();
    let hitters: Vec<&Hitter> = roster.hitters().iter().collect();
    let order = BattingOrder::new(&hitters).unwrap();
    let sim = GameSimulator::new(Horizon::FULL_GAME, DoublePlayRule { enabled: true, rate: 0.5 });
    let script: Vec<f64> = (0..97).map(|i| f64::from(i * 37 % 97) / 97.0).collect();

    let run = || {
        let mut draws = ScriptedDraws::new(script.clone());
        let mut log = Vec::new();
        let score = sim.play(&order, 11, &mut draws, &mut log).unwrap();
        (score, serde_json::to_vec(&log).unwrap())
    };

    let (score_a, bytes_a) = run();
    let (score_b, bytes_b) = run();
    assert_eq!(score_a, score_b);
    assert_eq!(bytes_a, bytes_b);
}

fn results_for(workers: usize) -> (Vec<(String, f64)>, String) {
    let roster = Roster::new(Roster::sample_2021().unwrap().hitters()[..4].to_vec()).unwrap();
    let config = SearchConfig {
        games_per_season: 15,
        worker_pool_size: workers,
        queue_capacity: 1,
        seed: Some(99),
        ..SearchConfig::default()
    };
    let sink = Arc::new(InMemoryResultSink::new());
    let report = PermutationSearchCoordinator::new(roster, config, sink.clone())
        .unwrap()
        .run()
        .unwrap();

    let mut rows: Vec<(String, f64)> = sink
        .top_results(usize::MAX)
        .unwrap()
        .into_iter()
        .map(|r| (r.lineup, r.average_score))
        .collect();
    rows.sort_by(|x, y| x.0.cmp(&y.0));
    (rows, report.best.unwrap().lineup)
}

#[test]
fn test_search_result_does_not_depend_on_worker_count() {
    let (single, best_single) = results_for(1);
    let (many, best_many) = results_for(4);

    assert_eq!(single.len(), 24);
    assert_eq!(single, many);
    assert_eq!(best_single, best_many);
}
