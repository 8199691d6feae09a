use crate::reports;
use clap::Args;
use mapforge::config::{Config, SearchParams};
use mapforge::error::{ForgeError, ForgeResult};
use mapforge::optimizer::{self, SearchContext, TracingReporter};
use mapforge::problem::{CodeTableEntry, Problem};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    #[command(flatten)]
    pub params: SearchParams,

    /// Directory for result.json, codes.tsv and the updated config.json
    #[arg(short, long, default_value = "output")]
    pub output: PathBuf,
}

pub fn write_code_table(path: &Path, rows: &[CodeTableEntry]) -> ForgeResult<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_path(path)?;
    for row in rows {
        writer.write_record([
            row.name.as_str(),
            row.full.as_str(),
            row.short.as_str(),
            &row.frequency.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn run(args: SearchArgs, config: &Config, mut problem: Problem) -> ForgeResult<()> {
    if args.params.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(args.params.threads)
            .build_global()
            .map_err(|e| ForgeError::Config(format!("cannot size the thread pool: {}", e)))?;
    }
    info!(
        "🔥 Searching with {} threads, seed {}",
        rayon::current_num_threads(),
        args.params
            .seed
            .map(|s| s.to_string())
            .unwrap_or_else(|| "random".into())
    );

    let mut ctx = SearchContext::from_params(&args.params);
    let result = optimizer::optimize(&mut problem, &config.solver, &mut ctx, &TracingReporter)?;

    fs::create_dir_all(&args.output)?;
    serde_json::to_writer_pretty(File::create(args.output.join("result.json"))?, &result)?;

    let mut updated = config.clone();
    updated.form.mapping = result.rendered.clone();
    serde_json::to_writer_pretty(File::create(args.output.join("config.json"))?, &updated)?;

    let table = problem.code_table(&result.mapping)?;
    write_code_table(&args.output.join("codes.tsv"), &table)?;
    info!("💾 Results written to {}", args.output.display());

    reports::print_summary(&result);
    reports::print_metric(&result.metric, result.score);
    Ok(())
}
