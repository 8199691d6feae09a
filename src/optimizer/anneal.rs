use fastrand::Rng;
use strum_macros::Display;
use tracing::{debug, info, warn};

use super::{Incumbent, Message, OptimizationResult, Optimizer, Reporter, SearchContext};
use crate::config::{AnnealingConfig, CoolingShape};
use crate::consts::{
    MAX_TUNING_ROUNDS, TUNING_BATCH_SIZE, TUNING_HIGH_ACCEPTANCE, TUNING_LOW_IMPROVEMENT,
};
use crate::encoder::Encoder;
use crate::error::{ForgeError, ForgeResult};
use crate::mapping::ElementMapping;
use crate::objective::Objective;
use crate::operators::Mutate;
use crate::problem::Problem;

/// Metropolis criterion: improvements always pass, a worsening of `delta`
/// passes with probability `exp(-delta / temperature)`.
#[inline(always)]
pub fn metropolis_accept(delta: f64, temperature: f64, rng: &mut Rng) -> bool {
    delta <= 0.0 || rng.f64() < (-delta / temperature).exp()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Schedule {
    pub t_max: f64,
    pub t_min: f64,
    pub steps: usize,
    pub cooling: CoolingShape,
}

impl Schedule {
    pub fn temperature(&self, step: usize) -> f64 {
        let progress = step as f64 / self.steps as f64;
        match self.cooling {
            CoolingShape::Exponential => self.t_max * (self.t_min / self.t_max).powf(progress),
            CoolingShape::Linear => self.t_max + (self.t_min - self.t_max) * progress,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum AnnealingState {
    Initializing,
    Annealing,
    Terminated,
}

struct TrialOutcome {
    candidate: ElementMapping,
    accept_rate: f64,
    improve_rate: f64,
}

pub struct SimulatedAnnealing {
    config: AnnealingConfig,
}

impl SimulatedAnnealing {
    pub fn new(config: AnnealingConfig) -> Self {
        Self { config }
    }

    /// The configured schedule, or a tuned one when either temperature is
    /// missing.
    pub fn schedule<E: Encoder, O: Objective>(
        &self,
        problem: &mut Problem<E, O>,
        ctx: &mut SearchContext,
        reporter: &dyn Reporter,
    ) -> ForgeResult<Schedule> {
        let (t_max, t_min) = match (self.config.t_max, self.config.t_min) {
            (Some(t_max), Some(t_min)) => (t_max, t_min),
            _ => self.autotune(problem, ctx, reporter)?,
        };
        Ok(Schedule {
            t_max,
            t_min,
            steps: self.config.steps,
            cooling: self.config.cooling,
        })
    }

    /// Runs `steps` Metropolis steps at a fixed temperature.
    fn trial_run<E: Encoder, O: Objective>(
        problem: &mut Problem<E, O>,
        from: ElementMapping,
        temperature: f64,
        steps: usize,
        rng: &mut Rng,
    ) -> ForgeResult<TrialOutcome> {
        let mut candidate = from;
        let mut energy = problem.evaluate(&candidate)?.loss;
        let mut next = candidate.clone();
        let (mut accepts, mut improves) = (0usize, 0usize);
        for _ in 0..steps {
            next.clone_from(&candidate);
            problem.operator().mutate(&mut next, rng)?;
            let next_energy = problem.evaluate(&next)?.loss;
            let delta = next_energy - energy;
            if metropolis_accept(delta, temperature, rng) {
                accepts += 1;
                if delta < 0.0 {
                    improves += 1;
                }
                std::mem::swap(&mut candidate, &mut next);
                energy = next_energy;
            }
        }
        Ok(TrialOutcome {
            candidate,
            accept_rate: accepts as f64 / steps as f64,
            improve_rate: improves as f64 / steps as f64,
        })
    }

    /// Picks `t_max` where nearly every proposal is accepted and `t_min`
    /// where almost none improves, by halving or doubling a guess derived
    /// from the mean score change of random mutations.
    pub fn autotune<E: Encoder, O: Objective>(
        &self,
        problem: &mut Problem<E, O>,
        ctx: &mut SearchContext,
        reporter: &dyn Reporter,
    ) -> ForgeResult<(f64, f64)> {
        let batch = TUNING_BATCH_SIZE;
        let initial = problem.initial().clone();
        let energy = problem.evaluate(&initial)?.loss;

        let mut sum_delta = 0.0;
        let mut next = initial.clone();
        for _ in 0..batch {
            next.clone_from(&initial);
            problem.operator().mutate(&mut next, &mut ctx.rng)?;
            sum_delta += (problem.evaluate(&next)?.loss - energy).abs();
        }
        let mut guess = sum_delta / batch as f64;
        if !(guess.is_finite() && guess > 0.0) {
            warn!("Random mutations do not change the score, tuning from T = 1");
            guess = 1.0;
        }
        debug!("Initial temperature guess {:.3e}", guess);

        let mut temperature = guess;
        let mut trial = Self::trial_run(problem, initial.clone(), temperature, batch, &mut ctx.rng)?;
        let mut rounds = 0;
        while trial.accept_rate > TUNING_HIGH_ACCEPTANCE
            && rounds < MAX_TUNING_ROUNDS
            && !ctx.timer.should_stop()
        {
            temperature /= 2.0;
            trial = Self::trial_run(problem, trial.candidate, temperature, batch, &mut ctx.rng)?;
            reporter.post(&Message::TrialMax {
                temperature,
                accept_rate: trial.accept_rate,
            });
            rounds += 1;
        }
        while trial.accept_rate < TUNING_HIGH_ACCEPTANCE
            && rounds < MAX_TUNING_ROUNDS
            && !ctx.timer.should_stop()
        {
            temperature *= 2.0;
            trial = Self::trial_run(problem, trial.candidate, temperature, batch, &mut ctx.rng)?;
            reporter.post(&Message::TrialMax {
                temperature,
                accept_rate: trial.accept_rate,
            });
            rounds += 1;
        }
        let t_max = temperature;

        let mut improve_rate = trial.improve_rate;
        let mut candidate = initial;
        temperature = guess;
        rounds = 0;
        while improve_rate > TUNING_LOW_IMPROVEMENT
            && rounds < MAX_TUNING_ROUNDS
            && !ctx.timer.should_stop()
        {
            temperature /= 2.0;
            let trial = Self::trial_run(problem, candidate, temperature, batch, &mut ctx.rng)?;
            candidate = trial.candidate;
            improve_rate = trial.improve_rate;
            reporter.post(&Message::TrialMin {
                temperature,
                improve_rate,
            });
            rounds += 1;
        }
        let t_min = temperature.min(t_max);

        reporter.post(&Message::Parameters { t_max, t_min });
        Ok((t_max, t_min))
    }

    pub fn solve_with<E: Encoder, O: Objective>(
        &self,
        problem: &mut Problem<E, O>,
        schedule: Schedule,
        ctx: &mut SearchContext,
        reporter: &dyn Reporter,
    ) -> ForgeResult<OptimizationResult> {
        let update_interval = self.config.update_interval.max(1);
        let report_interval = self.config.report_interval.max(1);
        let mut state = AnnealingState::Initializing;
        debug!("Annealing: {}", state);

        let initial = problem.initial().clone();
        if !problem.operator().constraints().is_satisfied(&initial) {
            return Err(ForgeError::Config(
                "the initial mapping violates the configured constraints".into(),
            ));
        }
        let baseline = problem.evaluate(&initial)?;
        let mut current = initial.clone();
        let mut current_loss = baseline.loss;
        let mut incumbent = Incumbent::new(initial, baseline, ctx.timer.elapsed().as_secs_f64());
        let mut next = current.clone();

        state = AnnealingState::Annealing;
        debug!("Annealing: {} from {:.6}", state, current_loss);
        let (mut accepts, mut improves, mut window) = (0usize, 0usize, 0usize);
        let mut temperature = schedule.t_max;
        let mut steps_done = 0;

        for step in 0..schedule.steps {
            if ctx.timer.should_stop() {
                info!("Stopping at step {} of {}", step, schedule.steps);
                break;
            }
            if step % update_interval == 0 {
                temperature = schedule.temperature(step);
            }
            if step % report_interval == 0 {
                let rate = |n: usize| if window == 0 { 0.0 } else { n as f64 / window as f64 };
                let keep_going = reporter.post(&Message::Progress {
                    step,
                    total: schedule.steps,
                    percent: step as f64 / schedule.steps as f64 * 100.0,
                    temperature: Some(temperature),
                    accept_rate: Some(rate(accepts)),
                    improve_rate: Some(rate(improves)),
                    current: current_loss,
                    best: incumbent.loss(),
                });
                (accepts, improves, window) = (0, 0, 0);
                if !keep_going {
                    ctx.timer.cancel();
                    break;
                }
            }
            if step == update_interval {
                let micros = ctx.timer.elapsed().as_secs_f64() * 1e6;
                reporter.post(&Message::Elapsed {
                    micros_per_step: micros / step as f64,
                });
            }

            next.clone_from(&current);
            problem.operator().mutate(&mut next, &mut ctx.rng)?;
            let evaluation = problem.evaluate(&next)?;
            let delta = evaluation.loss - current_loss;
            window += 1;
            steps_done = step + 1;
            if metropolis_accept(delta, temperature, &mut ctx.rng) {
                accepts += 1;
                if delta < 0.0 {
                    improves += 1;
                }
                std::mem::swap(&mut current, &mut next);
                current_loss = evaluation.loss;
                let elapsed = ctx.timer.elapsed().as_secs_f64();
                if incumbent.offer(steps_done, &current, &evaluation, elapsed) {
                    let progress = step as f64 / schedule.steps as f64;
                    let save = progress > self.config.report_after;
                    if !reporter.post(&incumbent.better_solution(problem.prism(), steps_done, save)) {
                        ctx.timer.cancel();
                    }
                }
            }
        }

        state = AnnealingState::Terminated;
        debug!("Annealing: {} after {} steps", state, steps_done);
        reporter.post(&Message::Progress {
            step: steps_done,
            total: schedule.steps,
            percent: steps_done as f64 / schedule.steps as f64 * 100.0,
            temperature: Some(schedule.t_min),
            accept_rate: None,
            improve_rate: None,
            current: current_loss,
            best: incumbent.loss(),
        });
        let elapsed = ctx.timer.elapsed().as_secs_f64();
        Ok(incumbent.into_result(problem.prism(), steps_done, elapsed))
    }
}

impl Optimizer for SimulatedAnnealing {
    fn optimize<E: Encoder, O: Objective>(
        &self,
        problem: &mut Problem<E, O>,
        ctx: &mut SearchContext,
        reporter: &dyn Reporter,
    ) -> ForgeResult<OptimizationResult> {
        let schedule = self.schedule(problem, ctx, reporter)?;
        info!(
            "Annealing {} steps from T = {:.3e} to {:.3e} ({})",
            schedule.steps, schedule.t_max, schedule.t_min, schedule.cooling
        );
        self.solve_with(problem, schedule, ctx, reporter)
    }
}
