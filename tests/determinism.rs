mod common;

use common::*;
use mapforge::optimizer::{self, NullReporter, SearchContext};
use mapforge::operators::Mutate;
use serde_json::json;

#[test]
fn test_encoder_is_deterministic() {
    let mut a = rich_problem();
    let mut b = rich_problem();
    let mapping = a.initial().clone();
    let first = a.code_table(&mapping).unwrap();
    let second = a.code_table(&mapping).unwrap();
    let other = b.code_table(&mapping).unwrap();
    assert_eq!(first, second);
    assert_eq!(first, other);
}

#[test]
fn test_incremental_encoding_matches_full_encoding() {
    let mut problem = rich_problem();
    let mut rng = fastrand::Rng::with_seed(5);
    let mut mapping = problem.initial().clone();
    problem.evaluate(&mapping).unwrap();
    for _ in 0..40 {
        problem.operator().mutate(&mut mapping, &mut rng).unwrap();
        problem.evaluate(&mapping).unwrap();
    }
    let incremental = problem.code_table(&mapping).unwrap();
    let full = rich_problem().code_table(&mapping).unwrap();
    assert_eq!(incremental, full);
}

fn annealing() -> serde_json::Value {
    json!({
        "algorithm": "simulated_annealing",
        "t_max": 0.5,
        "t_min": 0.001,
        "steps": 400,
        "update_interval": 10,
        "report_interval": 100
    })
}

#[test]
fn test_same_seed_same_annealing_run() {
    let run = || {
        let config = rich_config().solver(annealing()).build();
        let solver = config.solver.clone();
        let mut problem = build_problem(config, rich_corpus(2024), rich_assets());
        let mut ctx = SearchContext::new(Some(99), None);
        optimizer::optimize(&mut problem, &solver, &mut ctx, &NullReporter).unwrap()
    };
    let (a, b) = (run(), run());
    assert_eq!(a.mapping, b.mapping);
    assert_eq!(a.score, b.score);
    assert_eq!(a.steps, b.steps);
    let steps = |r: &mapforge::optimizer::OptimizationResult| {
        r.trajectory.iter().map(|p| (p.step, p.score)).collect::<Vec<_>>()
    };
    assert_eq!(steps(&a), steps(&b));
    assert_eq!(a.run_id, b.run_id);
}

#[test]
fn test_same_seed_same_genetic_run() {
    let run = || {
        let config = rich_config()
            .solver(json!({ "algorithm": "genetic", "population_size": 6, "generations": 8 }))
            .build();
        let solver = config.solver.clone();
        let mut problem = build_problem(config, rich_corpus(2024), rich_assets());
        let mut ctx = SearchContext::new(Some(3), None);
        optimizer::optimize(&mut problem, &solver, &mut ctx, &NullReporter).unwrap()
    };
    let (a, b) = (run(), run());
    assert_eq!(a.mapping, b.mapping);
    assert_eq!(a.score, b.score);
}

#[test]
fn test_batch_scoring_is_thread_count_independent() {
    let mut problem = rich_problem();
    let mapping = problem.initial().clone();
    let pool = rayon::ThreadPoolBuilder::new().num_threads(1).build().unwrap();
    let single = pool.install(|| rich_problem().evaluate_from_scratch(&mapping).unwrap());
    let many = problem.evaluate_from_scratch(&mapping).unwrap();
    assert_eq!(single.loss.to_bits(), many.loss.to_bits());
}
