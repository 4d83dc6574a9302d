use std::error::Error;

use clap::{Parser, Subcommand};
use commands::{
    plan::{self, PlanArgs},
    run::{self, RunArgs},
    search_path::{self, SearchPathArgs},
};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "xsweep", about = "Explicit-combination sweeper")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the override batches a sweep would launch.
    Plan(PlanArgs),
    /// Run a single job, or every job of the configured sweep with `--multirun`.
    Run(RunArgs),
    /// List config search path entries and the sweeper options they provide.
    SearchPath(SearchPathArgs),
}

/// `RUST_LOG` overrides the default `info` filter.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<(), Box<dyn Error>> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Command::Plan(args) => plan::run(&args),
        Command::Run(args) => run::run(&args),
        Command::SearchPath(args) => search_path::run(&args),
    }
}
