use std::error::Error;

use clap::Args;
use xsweep_core::OverrideBatch;
use xsweep_exp::ExplicitSweeper;
use xsweep_host::SweeperRegistry;

use super::config::{compose_config, sweeper_config, ConfigArgs};

#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
    /// Print the batches as a JSON array instead of one job per line.
    #[arg(long)]
    pub json: bool,
    /// Overrides appended to every job.
    #[arg(value_name = "OVERRIDES")]
    pub overrides: Vec<String>,
}

pub fn run(args: &PlanArgs) -> Result<(), Box<dyn Error>> {
    let batches = plan_batches(args)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&batches)?);
    } else {
        for batch in &batches {
            println!("{}", batch.join(" "));
        }
    }
    Ok(())
}

pub fn plan_batches(args: &PlanArgs) -> Result<Vec<OverrideBatch>, Box<dyn Error>> {
    let config = compose_config(&args.config)?;
    // Only checks that the configured target is a known sweeper.
    SweeperRegistry::with_builtin().instantiate_from_config(&config)?;
    let sweeper = ExplicitSweeper::from_config(sweeper_config(&config)?);
    Ok(sweeper.plan(&args.overrides)?)
}
