#![deny(missing_docs)]
#![doc = "Core types, traits and the override grammar for the explicit sweeper."]

use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod errors;
pub mod grammar;

pub use errors::{ErrorInfo, SweepError};
pub use grammar::{
    merge_overrides, parse_override, parse_overrides, render_override, render_value, Override,
    OverridePrefix,
};

/// Ordered mapping from parameter path to value, as written by the user.
pub type Combination = IndexMap<String, Value>;

/// Ordered `key=value` strings handed to a launcher for one job.
pub type OverrideBatch = Vec<String>;

/// Seed key used when none is configured.
pub const DEFAULT_SEED_KEY: &str = "seed";

/// A single unit of work produced by expanding one combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    /// Position of the source combination in the configured list.
    pub combination_index: usize,
    /// Seed injected into `params`, if seed expansion is active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<Value>,
    /// Parameters in override order: combination keys first, seed key last.
    pub params: IndexMap<String, Value>,
}

/// Directory layout for the jobs of one multirun invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepContext {
    /// Root directory shared by every job of the sweep.
    pub sweep_dir: PathBuf,
    /// Name of the task being swept, used in reports and logs.
    pub task_name: String,
}

impl SweepContext {
    /// Creates a context rooted at `sweep_dir`.
    pub fn new(sweep_dir: impl Into<PathBuf>, task_name: impl Into<String>) -> Self {
        Self {
            sweep_dir: sweep_dir.into(),
            task_name: task_name.into(),
        }
    }

    /// Working directory of the job with the given index.
    pub fn job_dir(&self, job_idx: usize) -> PathBuf {
        self.sweep_dir.join(job_idx.to_string())
    }
}

/// Outcome of a single job as observed by the launcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum JobStatus {
    /// The job ran to completion with a zero exit status.
    Completed,
    /// The job ran and exited unsuccessfully.
    Failed {
        /// Process exit code, when the platform reports one.
        exit_code: Option<i32>,
    },
    /// The job was planned but not executed.
    DryRun,
}

/// What a launcher reports back for each job it was handed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobReturn {
    /// Index of the job within the sweep.
    pub job_idx: usize,
    /// Overrides the job was launched with.
    pub overrides: OverrideBatch,
    /// Working directory assigned to the job.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
    /// Final job status.
    pub status: JobStatus,
}

/// Host-provided job launcher.
pub trait Launcher: Send {
    /// Launches one job with the given overrides.
    fn launch_job(
        &mut self,
        context: &SweepContext,
        overrides: &[String],
        job_idx: usize,
    ) -> Result<JobReturn, SweepError>;

    /// Launches every batch in order, numbering jobs from `initial_job_idx`.
    fn launch(
        &mut self,
        context: &SweepContext,
        job_overrides: &[OverrideBatch],
        initial_job_idx: usize,
    ) -> Result<Vec<JobReturn>, SweepError> {
        job_overrides
            .iter()
            .enumerate()
            .map(|(offset, batch)| self.launch_job(context, batch, initial_job_idx + offset))
            .collect()
    }
}

/// A pluggable strategy turning a sweep definition into launched jobs.
pub trait Sweeper: Send {
    /// Receives the composed configuration, sweep directory context and
    /// launcher before any job is planned.
    fn setup(
        &mut self,
        context: SweepContext,
        config: &Value,
        launcher: Box<dyn Launcher>,
    ) -> Result<(), SweepError>;

    /// Plans the sweep, appends `arguments` to every job and launches it.
    fn sweep(&mut self, arguments: &[String]) -> Result<Vec<JobReturn>, SweepError>;
}
