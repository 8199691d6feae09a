mod common;

use common::*;
use mapforge::config::GeneticConfig;
use mapforge::optimizer::{GeneticAlgorithm, Message, Optimizer, SearchContext};
use serde_json::json;

fn genetic(population: usize, generations: usize) -> serde_json::Value {
    json!({
        "algorithm": "genetic",
        "population_size": population,
        "generations": generations,
        "report_interval": 5
    })
}

#[test]
fn test_tiny_corpus_reaches_zero_duplication() {
    let mut problem = tiny_problem(genetic(8, 20));
    let reporter = RecordingReporter::default();
    let mut ctx = SearchContext::new(Some(5), None);
    let solver = tiny_config().solver(genetic(8, 20)).build().solver;
    let result = mapforge::optimizer::optimize(&mut problem, &solver, &mut ctx, &reporter).unwrap();

    assert_eq!(result.score, 0.0);
    assert_ne!(result.rendered["X"], result.rendered["Y"]);
    assert_eq!(result.steps, 20);
}

#[test]
fn test_best_individual_survives_every_generation() {
    let config = rich_config().solver(genetic(12, 30)).build();
    let solver = config.solver.clone();
    let mut problem = build_problem(config, rich_corpus(8), rich_assets());
    let initial = problem.initial().clone();
    let start = problem.evaluate(&initial).unwrap().loss;

    let reporter = RecordingReporter::default();
    let mut ctx = SearchContext::new(Some(99), None);
    let result = mapforge::optimizer::optimize(&mut problem, &solver, &mut ctx, &reporter).unwrap();

    assert!(result.score <= start);
    assert_non_increasing(&reporter.progress_bests());
    assert_eq!(reporter.progress_bests().len(), 6);
    let better = reporter.better_scores();
    for pair in better.windows(2) {
        assert!(pair[1] < pair[0]);
    }
    let trajectory: Vec<f64> = result.trajectory.iter().map(|p| p.score).collect();
    assert_non_increasing(&trajectory);

    let rescored = problem.evaluate_from_scratch(&result.mapping).unwrap();
    assert!((rescored.loss - result.score).abs() < 1e-9);
    assert!(problem.operator().constraints().is_satisfied(&result.mapping));
}

#[test]
fn test_timing_is_reported_after_first_generation() {
    let mut problem = tiny_problem(genetic(4, 3));
    let reporter = RecordingReporter::default();
    let mut ctx = SearchContext::new(Some(1), None);
    GeneticAlgorithm::new(GeneticConfig {
        population_size: 4,
        generations: 3,
        report_interval: 1,
        ..Default::default()
    })
    .optimize(&mut problem, &mut ctx, &reporter)
    .unwrap();

    let elapsed = reporter
        .messages()
        .iter()
        .filter(|m| matches!(m, Message::Elapsed { .. }))
        .count();
    assert_eq!(elapsed, 1);
}

#[test]
fn test_reporter_can_stop_the_run() {
    let config = rich_config().solver(genetic(8, 500)).build();
    let solver = config.solver.clone();
    let mut problem = build_problem(config, rich_corpus(3), rich_assets());
    let reporter = RecordingReporter::stopping_after(1);
    let mut ctx = SearchContext::new(Some(3), None);
    let result = mapforge::optimizer::optimize(&mut problem, &solver, &mut ctx, &reporter).unwrap();
    // the first progress report lands on generation 5
    assert_eq!(result.steps, 5);
}
