use fastrand::Rng;
use tracing::{debug, info};

use super::{Incumbent, Message, OptimizationResult, Optimizer, Reporter, SearchContext};
use crate::config::GeneticConfig;
use crate::consts::{DEFAULT_REPORT_AFTER, ROULETTE_EPSILON};
use crate::encoder::Encoder;
use crate::error::ForgeResult;
use crate::mapping::ElementMapping;
use crate::objective::Objective;
use crate::operators::{Crossover, Mutate};
use crate::problem::{Evaluation, Problem};

#[derive(Debug, Clone)]
struct Individual {
    mapping: ElementMapping,
    evaluation: Evaluation,
}

/// Fitness-proportionate draw; `weights` must be non-negative.
fn roulette(weights: &[f64], rng: &mut Rng) -> usize {
    let total: f64 = weights.iter().sum();
    let mut roll = rng.f64() * total;
    for (i, w) in weights.iter().enumerate() {
        roll -= w;
        if roll < 0.0 {
            return i;
        }
    }
    weights.len() - 1
}

fn rank(population: &mut [Individual]) {
    population.sort_by(|a, b| a.evaluation.loss.total_cmp(&b.evaluation.loss));
}

pub struct GeneticAlgorithm {
    config: GeneticConfig,
}

impl GeneticAlgorithm {
    pub fn new(config: GeneticConfig) -> Self {
        Self { config }
    }

    /// The initial mapping plus mutants of it, ranked best first.
    fn seed_population<E: Encoder, O: Objective>(
        &self,
        problem: &mut Problem<E, O>,
        rng: &mut Rng,
    ) -> ForgeResult<Vec<Individual>> {
        let initial = problem.initial().clone();
        let evaluation = problem.evaluate(&initial)?;
        let mut population = Vec::with_capacity(self.config.population_size * 2);
        population.push(Individual {
            mapping: initial.clone(),
            evaluation,
        });
        while population.len() < self.config.population_size {
            let mut mapping = initial.clone();
            for _ in 0..=rng.usize(..4) {
                problem.operator().mutate(&mut mapping, rng)?;
            }
            let evaluation = problem.evaluate(&mapping)?;
            population.push(Individual {
                mapping,
                evaluation,
            });
        }
        rank(&mut population);
        Ok(population)
    }

    fn breed<E: Encoder, O: Objective>(
        &self,
        problem: &mut Problem<E, O>,
        population: &[Individual],
        weights: &[f64],
        rng: &mut Rng,
    ) -> ForgeResult<Individual> {
        let a = roulette(weights, rng);
        let mut child = if rng.f64() < self.config.crossover_rate {
            let b = roulette(weights, rng);
            // population is ranked, so the lower index is the fitter parent
            let (primary, secondary) = (a.min(b), a.max(b));
            problem.operator().crossover(
                &population[primary].mapping,
                &population[secondary].mapping,
                rng,
            )
        } else {
            population[a].mapping.clone()
        };
        if rng.f64() < self.config.mutation_rate {
            problem.operator().mutate(&mut child, rng)?;
        }
        let evaluation = problem.evaluate(&child)?;
        Ok(Individual {
            mapping: child,
            evaluation,
        })
    }
}

impl Optimizer for GeneticAlgorithm {
    fn optimize<E: Encoder, O: Objective>(
        &self,
        problem: &mut Problem<E, O>,
        ctx: &mut SearchContext,
        reporter: &dyn Reporter,
    ) -> ForgeResult<OptimizationResult> {
        let size = self.config.population_size;
        let generations = self.config.generations;
        info!(
            "Genetic search: population {}, {} generations",
            size, generations
        );

        let mut population = self.seed_population(problem, &mut ctx.rng)?;
        let mut incumbent = Incumbent::new(
            population[0].mapping.clone(),
            population[0].evaluation.clone(),
            ctx.timer.elapsed().as_secs_f64(),
        );
        let mut done = 0;

        for generation in 1..=generations {
            if ctx.timer.should_stop() {
                info!("Stopping at generation {} of {}", generation, generations);
                break;
            }
            let worst = population[population.len() - 1].evaluation.loss;
            let weights: Vec<f64> = population
                .iter()
                .map(|i| worst - i.evaluation.loss + ROULETTE_EPSILON)
                .collect();

            let mut offspring = Vec::with_capacity(size);
            while offspring.len() < size {
                offspring.push(self.breed(problem, &population, &weights, &mut ctx.rng)?);
            }
            // survivors come from parents and offspring together, so the
            // best individual is never lost
            population.extend(offspring);
            rank(&mut population);
            population.truncate(size);
            done = generation;

            if generation == 1 {
                let micros = ctx.timer.elapsed().as_secs_f64() * 1e6;
                reporter.post(&Message::Elapsed {
                    micros_per_step: micros / (2 * size) as f64,
                });
            }

            let leader = &population[0];
            let elapsed = ctx.timer.elapsed().as_secs_f64();
            if incumbent.offer(generation, &leader.mapping, &leader.evaluation, elapsed) {
                let save = generation as f64 / generations as f64 > DEFAULT_REPORT_AFTER;
                debug!("Generation {}: best {:.6}", generation, incumbent.loss());
                if !reporter.post(&incumbent.better_solution(problem.prism(), generation, save)) {
                    ctx.timer.cancel();
                }
            }
            if generation % self.config.report_interval == 0 {
                let mean = population.iter().map(|i| i.evaluation.loss).sum::<f64>() / size as f64;
                let keep_going = reporter.post(&Message::Progress {
                    step: generation,
                    total: generations,
                    percent: generation as f64 / generations as f64 * 100.0,
                    temperature: None,
                    accept_rate: None,
                    improve_rate: None,
                    current: mean,
                    best: incumbent.loss(),
                });
                if !keep_going {
                    ctx.timer.cancel();
                }
            }
        }

        let elapsed = ctx.timer.elapsed().as_secs_f64();
        Ok(incumbent.into_result(problem.prism(), done, elapsed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roulette_never_picks_zero_weight() {
        let mut rng = Rng::with_seed(11);
        let weights = [0.0, 1.0, 0.0, 3.0];
        let mut counts = [0usize; 4];
        for _ in 0..4000 {
            counts[roulette(&weights, &mut rng)] += 1;
        }
        assert_eq!(counts[0], 0);
        assert_eq!(counts[2], 0);
        assert!(counts[3] > counts[1] * 2);
    }

    #[test]
    fn test_equal_weights_are_uniform_enough() {
        let mut rng = Rng::with_seed(5);
        let weights = [ROULETTE_EPSILON; 3];
        let mut counts = [0usize; 3];
        for _ in 0..3000 {
            counts[roulette(&weights, &mut rng)] += 1;
        }
        assert!(counts.iter().all(|&c| c > 800));
    }
}
