mod common;

use common::*;
use mapforge::config::{AnnealingConfig, CoolingShape};
use mapforge::optimizer::anneal::Schedule;
use mapforge::optimizer::{Message, Optimizer, SearchContext, SimulatedAnnealing};
use serde_json::json;

fn fixed_schedule(steps: usize) -> serde_json::Value {
    json!({
        "algorithm": "simulated_annealing",
        "t_max": 1.0,
        "t_min": 0.01,
        "steps": steps,
        "update_interval": 10,
        "report_interval": 50
    })
}

#[test]
fn test_tiny_corpus_reaches_zero_duplication() {
    let mut problem = tiny_problem(fixed_schedule(200));
    let initial = problem.initial().clone();
    assert!(problem.evaluate(&initial).unwrap().loss > 0.0);

    let reporter = RecordingReporter::default();
    let mut ctx = SearchContext::new(Some(7), None);
    let result = mapforge::optimizer::optimize(
        &mut problem,
        &tiny_config().solver(fixed_schedule(200)).build().solver,
        &mut ctx,
        &reporter,
    )
    .unwrap();

    assert_eq!(result.score, 0.0);
    assert_ne!(result.rendered["X"], result.rendered["Y"]);
    let duplication = result.metric.characters_full.as_ref().and_then(|m| m.duplication);
    assert_eq!(duplication, Some(0.0));
    assert!(matches!(reporter.messages().last(), Some(Message::Finished { .. })));
}

#[test]
fn test_best_score_never_increases() {
    let config = rich_config().solver(fixed_schedule(600)).build();
    let solver = config.solver.clone();
    let mut problem = build_problem(config, rich_corpus(11), rich_assets());
    let reporter = RecordingReporter::default();
    let mut ctx = SearchContext::new(Some(21), None);
    let result = mapforge::optimizer::optimize(&mut problem, &solver, &mut ctx, &reporter).unwrap();

    let better = reporter.better_scores();
    for pair in better.windows(2) {
        assert!(pair[1] < pair[0]);
    }
    assert_non_increasing(&reporter.progress_bests());
    let trajectory: Vec<f64> = result.trajectory.iter().map(|p| p.score).collect();
    assert_non_increasing(&trajectory);
    assert_eq!(trajectory.last().copied(), Some(result.score));
    assert_eq!(result.steps, 600);

    // the returned best is what the mapping actually scores
    let rescored = problem.evaluate_from_scratch(&result.mapping).unwrap();
    assert!((rescored.loss - result.score).abs() < 1e-9);
}

#[test]
fn test_late_improvements_are_flagged_for_saving() {
    let mut problem = tiny_problem(fixed_schedule(200));
    let config = AnnealingConfig {
        t_max: Some(1.0),
        t_min: Some(0.01),
        steps: 200,
        report_after: 0.0,
        ..Default::default()
    };
    let reporter = RecordingReporter::default();
    let mut ctx = SearchContext::new(Some(7), None);
    SimulatedAnnealing::new(config)
        .optimize(&mut problem, &mut ctx, &reporter)
        .unwrap();
    for m in reporter.messages() {
        if let Message::BetterSolution { step, save, .. } = m {
            assert_eq!(save, step > 1);
        }
    }
}

#[test]
fn test_autotune_emits_trials_then_parameters() {
    let mut problem = tiny_problem(json!({ "algorithm": "simulated_annealing", "steps": 50 }));
    let reporter = RecordingReporter::default();
    let mut ctx = SearchContext::new(Some(3), None);
    let sa = SimulatedAnnealing::new(AnnealingConfig {
        steps: 50,
        ..Default::default()
    });
    let schedule = sa.schedule(&mut problem, &mut ctx, &reporter).unwrap();
    assert!(schedule.t_max > 0.0 && schedule.t_min > 0.0);
    assert!(schedule.t_min <= schedule.t_max);

    let messages = reporter.messages();
    match messages.last() {
        Some(Message::Parameters { t_max, t_min }) => {
            assert_eq!(*t_max, schedule.t_max);
            assert_eq!(*t_min, schedule.t_min);
        }
        other => panic!("expected parameters last, got {:?}", other),
    }
    assert!(messages.iter().all(|m| matches!(
        m,
        Message::TrialMax { .. } | Message::TrialMin { .. } | Message::Parameters { .. }
    )));
}

#[test]
fn test_reporter_can_stop_the_run() {
    let config = rich_config().solver(fixed_schedule(10_000)).build();
    let solver = config.solver.clone();
    let mut problem = build_problem(config, rich_corpus(1), rich_assets());
    let reporter = RecordingReporter::stopping_after(2);
    let mut ctx = SearchContext::new(Some(1), None);
    let result = mapforge::optimizer::optimize(&mut problem, &solver, &mut ctx, &reporter).unwrap();
    // stopped at the second progress report
    assert_eq!(result.steps, 50);
}

#[test]
fn test_time_budget_is_respected() {
    let config = rich_config().solver(fixed_schedule(1_000_000)).build();
    let solver = config.solver.clone();
    let mut problem = build_problem(config, rich_corpus(1), rich_assets());
    let mut ctx = SearchContext::new(Some(1), Some(std::time::Duration::ZERO));
    let result = mapforge::optimizer::optimize(
        &mut problem,
        &solver,
        &mut ctx,
        &mapforge::optimizer::NullReporter,
    )
    .unwrap();
    assert_eq!(result.steps, 0);
    assert_eq!(result.mapping, *problem.initial());
}

#[test]
fn test_linear_schedule_ends_at_t_min() {
    let s = Schedule {
        t_max: 4.0,
        t_min: 1.0,
        steps: 4,
        cooling: CoolingShape::Linear,
    };
    let temps: Vec<f64> = (0..=4).map(|i| s.temperature(i)).collect();
    assert_eq!(temps, vec![4.0, 3.25, 2.5, 1.75, 1.0]);
}
