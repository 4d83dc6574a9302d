use std::fs;
use std::process::Command;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use xsweep_core::{ErrorInfo, JobReturn, JobStatus, Launcher, SweepContext, SweepError};
use xsweep_exp::to_yaml_string;

/// Config section holding launcher settings.
pub const LAUNCHER_SECTION: &str = "launcher";
/// File written into every job directory with the job's overrides.
pub const OVERRIDES_FILE: &str = "overrides.yaml";

/// Launcher settings read from the composed config.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LauncherConfig {
    /// Program and leading arguments; overrides are appended per job.
    #[serde(default)]
    pub command: Vec<String>,
}

impl LauncherConfig {
    pub fn from_config(config: &Value) -> Result<Self, SweepError> {
        match config.get(LAUNCHER_SECTION) {
            None | Some(Value::Null) => Ok(Self::default()),
            Some(section) => serde_json::from_value(section.clone()).map_err(|err| {
                SweepError::Serde(
                    ErrorInfo::new("xsweep.config.launcher_section", err.to_string())
                        .with_context("section", LAUNCHER_SECTION),
                )
            }),
        }
    }
}

fn io_error(err: std::io::Error, path: &std::path::Path) -> SweepError {
    SweepError::Launch(
        ErrorInfo::new("xsweep.launcher.io", err.to_string())
            .with_context("path", path.display().to_string()),
    )
}

fn empty_command() -> SweepError {
    SweepError::Config(
        ErrorInfo::new("xsweep.launcher.empty_command", "launcher command is empty")
            .with_hint("set launcher.command to the program to run per job"),
    )
}

/// Runs one process per job, sequentially, inside the job's directory.
#[derive(Debug, Clone)]
pub struct BasicLauncher {
    command: Vec<String>,
}

impl BasicLauncher {
    pub fn new(command: Vec<String>) -> Result<Self, SweepError> {
        if command.is_empty() {
            return Err(empty_command());
        }
        Ok(Self { command })
    }

    pub fn from_config(config: &LauncherConfig) -> Result<Self, SweepError> {
        Self::new(config.command.clone())
    }
}

impl Launcher for BasicLauncher {
    fn launch_job(
        &mut self,
        context: &SweepContext,
        overrides: &[String],
        job_idx: usize,
    ) -> Result<JobReturn, SweepError> {
        let job_dir = context.job_dir(job_idx);
        fs::create_dir_all(&job_dir).map_err(|err| io_error(err, &job_dir))?;
        let overrides_path = job_dir.join(OVERRIDES_FILE);
        fs::write(&overrides_path, to_yaml_string(&overrides)?)
            .map_err(|err| io_error(err, &overrides_path))?;

        info!("Launching job {}: {}", job_idx, overrides.join(" "));
        let Some((program, leading)) = self.command.split_first() else {
            return Err(empty_command());
        };
        let status = Command::new(program)
            .args(leading)
            .args(overrides)
            .current_dir(&job_dir)
            .env("XSWEEP_JOB_IDX", job_idx.to_string())
            .env("XSWEEP_TASK_NAME", &context.task_name)
            .status()
            .map_err(|err| {
                SweepError::Launch(
                    ErrorInfo::new("xsweep.launcher.spawn", err.to_string())
                        .with_context("program", program.clone())
                        .with_context("job", job_idx.to_string()),
                )
            })?;
        let status = if status.success() {
            JobStatus::Completed
        } else {
            warn!("Job {} exited with {}", job_idx, status);
            JobStatus::Failed {
                exit_code: status.code(),
            }
        };
        Ok(JobReturn {
            job_idx,
            overrides: overrides.to_vec(),
            working_dir: Some(job_dir),
            status,
        })
    }
}

/// Records jobs without executing anything.
#[derive(Debug, Clone, Default)]
pub struct DryRunLauncher;

impl Launcher for DryRunLauncher {
    fn launch_job(
        &mut self,
        context: &SweepContext,
        overrides: &[String],
        job_idx: usize,
    ) -> Result<JobReturn, SweepError> {
        info!("[dry-run] job {}: {}", job_idx, overrides.join(" "));
        Ok(JobReturn {
            job_idx,
            overrides: overrides.to_vec(),
            working_dir: Some(context.job_dir(job_idx)),
            status: JobStatus::DryRun,
        })
    }
}
