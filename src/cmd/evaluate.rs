use crate::reports;
use clap::Args;
use mapforge::error::ForgeResult;
use mapforge::problem::Problem;

#[derive(Args, Debug, Clone)]
pub struct EvaluateArgs {
    /// Rows of the code table to print
    #[arg(short, long, default_value_t = 20)]
    pub top: usize,
}

/// Scores the mapping given in the config without searching.
pub fn run(args: EvaluateArgs, mut problem: Problem) -> ForgeResult<()> {
    let initial = problem.initial().clone();
    let evaluation = problem.evaluate_from_scratch(&initial)?;
    reports::print_metric(&evaluation.metric, evaluation.loss);

    let table = problem.code_table(&initial)?;
    reports::print_code_table(&table, args.top);
    Ok(())
}
