use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

/// Environment variable holding the log filter (e.g. `PLQ_LOG=debug`)
const LOG_ENV_VAR: &str = "PLQ_LOG";

#[derive(Parser)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about = "Run Prolog goals against a fact base", long_about = None)]
struct Cli {
    /// Config file (overrides PLQ_CONFIG and the default lookup)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GoalArgs {
    /// Knowledge base: Prolog source (.pl) or JSON facts ({"facts": [...]})
    #[arg(long)]
    kb: PathBuf,

    /// Goal as a JSON term or JSON array of terms
    #[arg(long)]
    goal: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a goal to exhaustion and print every solution
    Run {
        #[command(flatten)]
        goal: GoalArgs,

        /// Run on a worker and wait for the handle
        #[arg(long = "async")]
        run_async: bool,

        /// Abort after this many solutions
        #[arg(long)]
        limit: Option<usize>,

        /// Output results as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Pull solutions one at a time
    Iterate {
        #[command(flatten)]
        goal: GoalArgs,

        /// Stop after this many solutions
        #[arg(long)]
        take: Option<usize>,

        /// Discard this many solutions first
        #[arg(long, default_value_t = 0)]
        skip: usize,
    },

    /// Show the effective configuration
    Config {
        /// Write the effective configuration to this file
        #[arg(long)]
        save: Option<PathBuf>,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            goal,
            run_async,
            limit,
            json,
        } => {
            let options = commands::run::RunOptions {
                run_async,
                limit: limit.or(config.query.solution_limit),
                json,
            };
            let exit_code = commands::run::execute(&goal.kb, &goal.goal, &config, options)?;
            if exit_code != 0 {
                std::process::exit(exit_code);
            }
        }
        Commands::Iterate { goal, take, skip } => {
            commands::iterate::execute(&goal.kb, &goal.goal, take, skip)?;
        }
        Commands::Config { save } => {
            commands::config::execute(&config, save.as_deref())?;
        }
    }

    Ok(())
}
