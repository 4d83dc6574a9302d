use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use xsweep_core::{
    Combination, ErrorInfo, JobReturn, JobStatus, Launcher, OverrideBatch, SweepContext,
    SweepError, Sweeper, DEFAULT_SEED_KEY,
};

use crate::config::{SeedSpec, SweeperConfig, SWEEPER_SECTION};
use crate::expand::expand;
use crate::formatter::format_job;
use crate::hash::stable_hash_string;

/// Expands, formats and appends `extra_overrides` to every job.
///
/// Command-line overrides come after the job's own keys, so they win on
/// collision when the host applies the batch.
pub fn run_sweep<S: AsRef<str>>(
    combinations: &[Combination],
    seeds: Option<&[Value]>,
    seed_key: &str,
    extra_overrides: &[S],
) -> Result<Vec<OverrideBatch>, SweepError> {
    let jobs = expand(combinations, seeds, seed_key)?;
    Ok(jobs
        .iter()
        .map(|job| {
            let mut batch = format_job(job);
            batch.extend(extra_overrides.iter().map(|arg| arg.as_ref().to_string()));
            batch
        })
        .collect())
}

/// Sweeper that runs exactly the configured combinations, optionally
/// replicated across seeds. Never builds a Cartesian product.
pub struct ExplicitSweeper {
    combinations: Vec<Combination>,
    seeds: Option<SeedSpec>,
    seed_key: String,
    context: Option<SweepContext>,
    launcher: Option<Box<dyn Launcher>>,
}

impl Default for ExplicitSweeper {
    fn default() -> Self {
        Self::new(Vec::new(), None, DEFAULT_SEED_KEY)
    }
}

impl std::fmt::Debug for ExplicitSweeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExplicitSweeper")
            .field("combinations", &self.combinations.len())
            .field("seeds", &self.seeds)
            .field("seed_key", &self.seed_key)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

impl ExplicitSweeper {
    /// Creates a sweeper with constructor-supplied settings. Settings left
    /// empty here are filled from the configuration during `setup`.
    pub fn new(
        combinations: Vec<Combination>,
        seeds: Option<SeedSpec>,
        seed_key: impl Into<String>,
    ) -> Self {
        Self {
            combinations,
            seeds,
            seed_key: seed_key.into(),
            context: None,
            launcher: None,
        }
    }

    /// Builds a sweeper from a parsed configuration section.
    pub fn from_config(config: SweeperConfig) -> Self {
        let seed_key = config.seed_key().to_string();
        Self::new(config.combinations, config.seeds, seed_key)
    }

    pub fn combinations(&self) -> &[Combination] {
        &self.combinations
    }

    pub fn seed_key(&self) -> &str {
        &self.seed_key
    }

    pub fn resolved_seeds(&self) -> Option<Vec<Value>> {
        self.seeds
            .as_ref()
            .map(SeedSpec::resolve)
            .filter(|seeds| !seeds.is_empty())
    }

    /// Produces the ordered override batches without launching anything.
    pub fn plan<S: AsRef<str>>(&self, arguments: &[S]) -> Result<Vec<OverrideBatch>, SweepError> {
        let seeds = self.resolved_seeds();
        let batches = run_sweep(
            &self.combinations,
            seeds.as_deref(),
            &self.seed_key,
            arguments,
        )?;
        match &seeds {
            Some(seeds) => info!(
                "ExplicitSweeper: {} combinations × {} seeds = {} jobs",
                self.combinations.len(),
                seeds.len(),
                batches.len()
            ),
            None => info!("ExplicitSweeper: Launching {} jobs", batches.len()),
        }
        for (idx, batch) in batches.iter().enumerate() {
            info!("Job {}: {}", idx, batch.join(" "));
        }
        Ok(batches)
    }

    fn absorb_config(&mut self, config: SweeperConfig) {
        if self.combinations.is_empty() && !config.combinations.is_empty() {
            info!("Loaded {} combinations from config", config.combinations.len());
            self.combinations = config.combinations.clone();
        }
        if self.seeds.is_none() {
            if let Some(seeds) = &config.seeds {
                info!("Loaded seeds from config: {:?}", seeds);
                self.seeds = Some(seeds.clone());
            }
        }
        if matches!(config.seed_key.as_deref(), Some(key) if !key.is_empty()) {
            self.seed_key = config.seed_key().to_string();
        }
        if config.max_batch_size.is_some() || config.params.is_some() {
            warn!("ExplicitSweeper ignores max_batch_size and params");
        }
    }
}

impl Sweeper for ExplicitSweeper {
    fn setup(
        &mut self,
        context: SweepContext,
        config: &Value,
        launcher: Box<dyn Launcher>,
    ) -> Result<(), SweepError> {
        if let Some(section) = config.get(SWEEPER_SECTION) {
            self.absorb_config(SweeperConfig::from_section(section)?);
        }
        self.context = Some(context);
        self.launcher = Some(launcher);
        Ok(())
    }

    fn sweep(&mut self, arguments: &[String]) -> Result<Vec<JobReturn>, SweepError> {
        let batches = self.plan(arguments)?;
        let (Some(context), Some(launcher)) = (self.context.as_ref(), self.launcher.as_mut())
        else {
            return Err(SweepError::Launch(
                ErrorInfo::new("xsweep.sweeper.not_setup", "sweep called before setup")
                    .with_hint("call Sweeper::setup with a launcher first"),
            ));
        };
        launcher.launch(context, &batches, 0)
    }
}

/// Reproducibility record of one multirun invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    pub task_name: String,
    pub plan_hash: String,
    pub jobs: Vec<JobReturn>,
}

impl SweepReport {
    /// Builds a report; the plan hash covers the ordered override batches.
    pub fn from_returns(task_name: impl Into<String>, jobs: Vec<JobReturn>) -> Result<Self, SweepError> {
        let batches: Vec<&OverrideBatch> = jobs.iter().map(|job| &job.overrides).collect();
        let plan_hash = stable_hash_string(&batches)?;
        Ok(Self {
            task_name: task_name.into(),
            plan_hash,
            jobs,
        })
    }

    pub fn failed_jobs(&self) -> usize {
        self.jobs
            .iter()
            .filter(|job| matches!(job.status, JobStatus::Failed { .. }))
            .count()
    }
}
