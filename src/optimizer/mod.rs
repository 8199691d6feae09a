pub mod anneal;
pub mod context;
pub mod genetic;
pub mod reporter;
pub mod timer;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

pub use self::anneal::SimulatedAnnealing;
pub use self::context::SearchContext;
pub use self::genetic::GeneticAlgorithm;
pub use self::reporter::{Message, NullReporter, Reporter, TracingReporter};
pub use self::timer::Timer;

use crate::config::SolverConfig;
use crate::encoder::Encoder;
use crate::error::ForgeResult;
use crate::mapping::ElementMapping;
use crate::objective::{Metric, Objective};
use crate::problem::{Evaluation, Problem};
use crate::prism::Prism;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    pub step: usize,
    pub elapsed_secs: f64,
    /// Best score so far.
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub mapping: ElementMapping,
    /// The best mapping written back as `name -> keys`.
    pub rendered: BTreeMap<String, String>,
    pub metric: Metric,
    pub score: f64,
    pub trajectory: Vec<TrajectoryPoint>,
    pub steps: usize,
    pub elapsed_secs: f64,
    #[serde(default)]
    pub run_id: Option<String>,
}

/// A search strategy over element mappings.
pub trait Optimizer {
    fn optimize<E: Encoder, O: Objective>(
        &self,
        problem: &mut Problem<E, O>,
        ctx: &mut SearchContext,
        reporter: &dyn Reporter,
    ) -> ForgeResult<OptimizationResult>;
}

/// Best-so-far bookkeeping shared by both strategies. The tracked score
/// only ever goes down.
pub(crate) struct Incumbent {
    mapping: ElementMapping,
    evaluation: Evaluation,
    trajectory: Vec<TrajectoryPoint>,
}

impl Incumbent {
    pub fn new(mapping: ElementMapping, evaluation: Evaluation, elapsed_secs: f64) -> Self {
        let trajectory = vec![TrajectoryPoint {
            step: 0,
            elapsed_secs,
            score: evaluation.loss,
        }];
        Self {
            mapping,
            evaluation,
            trajectory,
        }
    }

    pub fn loss(&self) -> f64 {
        self.evaluation.loss
    }

    pub fn mapping(&self) -> &ElementMapping {
        &self.mapping
    }

    pub fn evaluation(&self) -> &Evaluation {
        &self.evaluation
    }

    /// Takes the candidate if it is strictly better.
    pub fn offer(
        &mut self,
        step: usize,
        mapping: &ElementMapping,
        evaluation: &Evaluation,
        elapsed_secs: f64,
    ) -> bool {
        if evaluation.loss >= self.evaluation.loss {
            return false;
        }
        self.mapping.clone_from(mapping);
        self.evaluation = evaluation.clone();
        self.trajectory.push(TrajectoryPoint {
            step,
            elapsed_secs,
            score: evaluation.loss,
        });
        true
    }

    pub fn better_solution(&self, prism: &Prism, step: usize, save: bool) -> Message {
        Message::BetterSolution {
            step,
            score: self.evaluation.loss,
            metric: self.evaluation.metric.clone(),
            mapping: prism.render(&self.mapping),
            save,
        }
    }

    pub fn into_result(mut self, prism: &Prism, steps: usize, elapsed_secs: f64) -> OptimizationResult {
        self.trajectory.push(TrajectoryPoint {
            step: steps,
            elapsed_secs,
            score: self.evaluation.loss,
        });
        OptimizationResult {
            rendered: prism.render(&self.mapping),
            mapping: self.mapping,
            metric: self.evaluation.metric,
            score: self.evaluation.loss,
            trajectory: self.trajectory,
            steps,
            elapsed_secs,
            run_id: None,
        }
    }
}

/// Runs the configured solver and posts the final code table.
pub fn optimize<E: Encoder, O: Objective>(
    problem: &mut Problem<E, O>,
    solver: &SolverConfig,
    ctx: &mut SearchContext,
    reporter: &dyn Reporter,
) -> ForgeResult<OptimizationResult> {
    let mut result = match solver {
        SolverConfig::SimulatedAnnealing(config) => {
            SimulatedAnnealing::new(config.clone()).optimize(problem, ctx, reporter)?
        }
        SolverConfig::Genetic(config) => {
            GeneticAlgorithm::new(config.clone()).optimize(problem, ctx, reporter)?
        }
    };
    result.run_id = problem.run_id().map(|id| id.hash.clone());

    let table = problem.code_table(&result.mapping)?;
    reporter.post(&Message::Finished {
        score: result.score,
        metric: result.metric.clone(),
        table,
    });
    info!(
        "Search finished after {} steps in {:.2}s, best {:.6}",
        result.steps, result.elapsed_secs, result.score
    );
    Ok(result)
}
