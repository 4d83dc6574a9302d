use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use clap::Args;
use serde_json::Value;
use tracing::{info, warn};
use xsweep_core::{JobStatus, Launcher, SweepContext};
use xsweep_exp::{to_canonical_json_bytes, SweepReport};
use xsweep_host::{BasicLauncher, DryRunLauncher, LauncherConfig, SweeperRegistry};

use super::config::{compose_config, task_name, ConfigArgs};

/// File the multirun report is written to, inside the sweep directory.
pub const REPORT_FILE: &str = "sweep_report.json";

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
    /// Launch every job of the configured sweep instead of a single run.
    #[arg(long, short = 'm')]
    pub multirun: bool,
    /// Plan and record jobs without executing the launcher command.
    #[arg(long)]
    pub dry_run: bool,
    /// Root directory for job working directories.
    #[arg(long)]
    pub sweep_dir: Option<PathBuf>,
    /// Overrides passed to the single job, or appended to every sweep job.
    #[arg(value_name = "OVERRIDES")]
    pub overrides: Vec<String>,
}

fn default_sweep_dir(multirun: bool) -> PathBuf {
    let root = if multirun { "multirun" } else { "outputs" };
    PathBuf::from(root).join(Local::now().format("%Y-%m-%d/%H-%M-%S").to_string())
}

fn launcher(args: &RunArgs, config: &Value) -> Result<Box<dyn Launcher>, Box<dyn Error>> {
    if args.dry_run {
        return Ok(Box::new(DryRunLauncher));
    }
    let settings = LauncherConfig::from_config(config)?;
    Ok(Box::new(BasicLauncher::from_config(&settings)?))
}

pub fn run(args: &RunArgs) -> Result<(), Box<dyn Error>> {
    let report = execute(args)?;
    let failed = report.failed_jobs();
    if failed > 0 {
        return Err(format!("{failed} of {} jobs failed", report.jobs.len()).into());
    }
    Ok(())
}

/// Runs the command and returns what was launched; multirun reports are also
/// persisted under the sweep directory.
pub fn execute(args: &RunArgs) -> Result<SweepReport, Box<dyn Error>> {
    let config = compose_config(&args.config)?;
    let sweep_dir = args
        .sweep_dir
        .clone()
        .unwrap_or_else(|| default_sweep_dir(args.multirun));
    let context = SweepContext::new(&sweep_dir, task_name(&args.config));
    let mut launcher = launcher(args, &config)?;

    if !args.multirun {
        let job = launcher.launch_job(&context, &args.overrides, 0)?;
        if let JobStatus::Failed { exit_code } = job.status {
            warn!("run exited with {:?}", exit_code);
        }
        return Ok(SweepReport::from_returns(context.task_name, vec![job])?);
    }

    let mut sweeper = SweeperRegistry::with_builtin().instantiate_from_config(&config)?;
    sweeper.setup(context.clone(), &config, launcher)?;
    let returns = sweeper.sweep(&args.overrides)?;
    let report = SweepReport::from_returns(context.task_name, returns)?;
    persist_report(&sweep_dir, &report)?;
    info!(
        "Sweep finished: {} jobs, {} failed, plan {}",
        report.jobs.len(),
        report.failed_jobs(),
        report.plan_hash
    );
    Ok(report)
}

fn persist_report(sweep_dir: &Path, report: &SweepReport) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(sweep_dir)?;
    let bytes = to_canonical_json_bytes(report)?;
    fs::write(sweep_dir.join(REPORT_FILE), bytes)?;
    Ok(())
}
