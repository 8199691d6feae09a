use clap::{Parser, Subcommand};
use mapforge::config::Config;
use mapforge::error::ForgeResult;
use mapforge::loader;
use mapforge::problem::ProblemBuildParams;
use std::path::PathBuf;
use std::process;
use tracing::{error, info, Level};

mod cmd;
mod reports;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(global = true, short, long, default_value = "config.json")]
    config: PathBuf,

    /// Characters and words to encode (name, sequence, frequency[, level])
    #[arg(global = true, short, long, default_value = "elements.tsv")]
    elements: PathBuf,

    #[arg(global = true, long)]
    key_distribution: Option<PathBuf>,

    #[arg(global = true, long)]
    pair_equivalence: Option<PathBuf>,

    #[arg(global = true, long, default_value_t = false)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Search(cmd::search::SearchArgs),
    Evaluate(cmd::evaluate::EvaluateArgs),
}

fn run(cli: Cli) -> ForgeResult<()> {
    info!("📂 Loading config: {}", cli.config.display());
    let config = Config::load_from_file(&cli.config)?;

    info!("📂 Loading elements: {}", cli.elements.display());
    let codables = loader::load_codables(&cli.elements)?;
    let assets = loader::load_assets(
        cli.key_distribution.as_deref(),
        cli.pair_equivalence.as_deref(),
    )?;

    let problem = ProblemBuildParams::builder()
        .config(config.clone())
        .codables(codables)
        .assets(assets)
        .build()
        .build_problem()?;

    match cli.command {
        Commands::Search(args) => cmd::search::run(args, &config, problem),
        Commands::Evaluate(args) => cmd::evaluate::run(args, problem),
    }
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.debug { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        if e.is_setup_error() {
            error!("❌ Setup failed: {}", e);
            process::exit(2);
        }
        error!("❌ Search aborted: {}", e);
        process::exit(1);
    }
}
